//! Need category scoring
//!
//! # Algorithm
//! For each taxonomy category (except OTHER):
//! - first primary (strong) pattern hit: +[`PRIMARY_FIRST`], each further
//!   primary hit: +[`PRIMARY_EXTRA`], primary total capped at [`PRIMARY_CAP`]
//! - each secondary (weak) hit: +[`SECONDARY_EACH`], capped at
//!   [`SECONDARY_CAP`]
//! - amount inside the category's typical range, with any other evidence:
//!   +[`AMOUNT_BONUS`]
//! - each exclusion hit: −[`EXCLUSION_PENALTY`]
//!
//! The sum is clamped to [0, 1]; a category fires at or above
//! [`CATEGORY_DETECTION_THRESHOLD`]. Choosing among firing categories is the
//! resolver's job.

use crate::extractors::lexicon::Lexicon;
use crate::scoring::{Score, CATEGORY_DETECTION_THRESHOLD};
use crate::types::{CategoryScore, NeedCategory, Transcript};
use once_cell::sync::Lazy;
use tracing::debug;

pub const SOURCE: &str = "category";

pub const PRIMARY_FIRST: f32 = 0.50;
pub const PRIMARY_EXTRA: f32 = 0.10;
pub const PRIMARY_CAP: f32 = 0.80;
pub const SECONDARY_EACH: f32 = 0.12;
pub const SECONDARY_CAP: f32 = 0.36;
pub const AMOUNT_BONUS: f32 = 0.10;
pub const EXCLUSION_PENALTY: f32 = 0.35;

/// Pattern profile of one category
pub struct CategoryProfile {
    pub category: NeedCategory,
    pub primary: Lexicon,
    pub secondary: Lexicon,
    pub exclusions: Lexicon,
    /// Typical requested amount range (inclusive)
    pub amount_range: (f64, f64),
}

impl CategoryProfile {
    fn new(
        category: NeedCategory,
        primary: &[&'static str],
        secondary: &[&'static str],
        exclusions: &[&'static str],
        amount_range: (f64, f64),
    ) -> Self {
        Self {
            category,
            primary: Lexicon::new(primary),
            secondary: Lexicon::new(secondary),
            exclusions: Lexicon::new(exclusions),
            amount_range,
        }
    }

    /// Score this category against a normalized transcript
    pub fn score(&self, text: &str, amount: Option<f64>) -> f32 {
        let primary_hits = self.primary.hits(text).len();
        let secondary_hits = self.secondary.hits(text).len();
        let exclusion_hits = self.exclusions.hits(text).len();

        let mut score = Score::new();
        if primary_hits > 0 {
            let primary = PRIMARY_FIRST + PRIMARY_EXTRA * (primary_hits - 1) as f32;
            score.add(primary.min(PRIMARY_CAP));
        }
        score.add((SECONDARY_EACH * secondary_hits as f32).min(SECONDARY_CAP));

        let (low, high) = self.amount_range;
        let has_evidence = primary_hits + secondary_hits > 0;
        if has_evidence && amount.is_some_and(|a| a >= low && a <= high) {
            score.add(AMOUNT_BONUS);
        }
        score.add(-(EXCLUSION_PENALTY * exclusion_hits as f32));
        score.value()
    }
}

/// Category profiles in priority order (OTHER has none)
pub static PROFILES: Lazy<Vec<CategoryProfile>> = Lazy::new(|| {
    use NeedCategory::*;
    vec![
        CategoryProfile::new(
            Safety,
            &[
                "domestic violence", "domestic abuse", "abusive", "abuser", "restraining order",
                "protective order", "fleeing", "hits me", "beats me", "beat me",
                "threatened to kill", "stalking", "trafficking", "unsafe at home",
            ],
            &["scared", "afraid", "safe place", "police", "escape", "leave him", "leave her", "bruises"],
            &["safety deposit", "safety glasses", "safety course"],
            (100.0, 5_000.0),
        ),
        CategoryProfile::new(
            Medical,
            &[
                "medical", "hospital", "surgery", "doctor", "prescription", "prescriptions",
                "medication", "medicine", "chemo", "chemotherapy", "cancer", "treatment",
                "dialysis", "insulin", "dental", "dentist", "emergency room", "ambulance",
            ],
            &[
                "sick", "illness", "diagnosed", "pain", "health", "copay", "clinic", "injury",
                "injured", "pregnant", "pregnancy", "therapy",
            ],
            &["medical assistant", "vet bill", "veterinarian"],
            (50.0, 50_000.0),
        ),
        CategoryProfile::new(
            Housing,
            &[
                "rent", "eviction", "evicted", "landlord", "mortgage", "housing", "apartment",
                "security deposit", "foreclosure", "homeless", "shelter", "motel", "lease",
            ],
            &["move", "moving", "place to stay", "roof", "house", "home", "room", "behind on"],
            &["rental car", "rent a car", "car rental"],
            (300.0, 10_000.0),
        ),
        CategoryProfile::new(
            Utilities,
            &[
                "electric bill", "electricity", "power bill", "gas bill", "water bill", "utility",
                "utilities", "shut off", "shutoff", "disconnection", "disconnect notice",
                "heating", "light bill",
            ],
            &["power", "lights", "heat", "water", "gas", "internet", "phone bill"],
            &["gas money", "gas for my car", "gas station", "gas tank"],
            (50.0, 2_000.0),
        ),
        CategoryProfile::new(
            Food,
            &["food", "groceries", "grocery", "hungry", "meals", "food stamps", "snap benefits", "formula", "haven't eaten"],
            &["eat", "eating", "pantry", "lunch", "dinner", "starving"],
            &["food service", "fast food job"],
            (20.0, 1_000.0),
        ),
        CategoryProfile::new(
            Childcare,
            &["childcare", "child care", "daycare", "day care", "babysitter", "babysitting", "nanny", "after school program"],
            &["kids", "children", "baby", "diapers", "school supplies"],
            &[],
            (50.0, 3_000.0),
        ),
        CategoryProfile::new(
            Transportation,
            &[
                "car repair", "car payment", "transmission", "bus pass", "transportation",
                "car broke down", "my car broke", "tires", "auto repair", "vehicle",
            ],
            &["car", "gas money", "uber", "ride", "commute", "mechanic", "bus"],
            &["car seat", "rental car"],
            (100.0, 8_000.0),
        ),
        CategoryProfile::new(
            Employment,
            &[
                "lost my job", "laid off", "unemployed", "job training", "work uniform",
                "work boots", "work tools", "certification", "job interview",
            ],
            &["job", "work", "hours cut", "fired", "paycheck", "income"],
            &[],
            (50.0, 3_000.0),
        ),
        CategoryProfile::new(
            Education,
            &["tuition", "school fees", "college", "textbooks", "books for school", "university", "course fees", "ged"],
            &["school", "student", "degree", "semester", "classes"],
            &["school supplies"],
            (100.0, 20_000.0),
        ),
        CategoryProfile::new(
            Legal,
            &["lawyer", "attorney", "legal fees", "court fees", "bail", "custody", "immigration", "legal aid"],
            &["court", "case", "judge", "hearing", "ticket"],
            &[],
            (100.0, 15_000.0),
        ),
        CategoryProfile::new(
            Funeral,
            &["funeral", "burial", "cremation", "memorial service", "passed away", "casket", "headstone"],
            &["died", "death", "passing", "obituary"],
            &[],
            (500.0, 15_000.0),
        ),
    ]
});

/// Profile of a category (None for OTHER)
pub fn profile(category: NeedCategory) -> Option<&'static CategoryProfile> {
    PROFILES.iter().find(|p| p.category == category)
}

/// Score every category profile, in priority order
pub fn score_categories(transcript: &Transcript, amount: Option<f64>) -> Vec<CategoryScore> {
    let text = transcript.normalized();
    let scores: Vec<CategoryScore> = PROFILES
        .iter()
        .map(|profile| {
            let score = profile.score(text, amount);
            CategoryScore {
                category: profile.category,
                score,
                fired: score >= CATEGORY_DETECTION_THRESHOLD,
            }
        })
        .collect();

    debug!(
        fired = scores.iter().filter(|s| s.fired).count(),
        "Categories scored"
    );
    scores
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fired(text: &str, amount: Option<f64>) -> Vec<NeedCategory> {
        score_categories(&Transcript::new(text), amount)
            .into_iter()
            .filter(|s| s.fired)
            .map(|s| s.category)
            .collect()
    }

    fn score_of(text: &str, amount: Option<f64>, category: NeedCategory) -> f32 {
        score_categories(&Transcript::new(text), amount)
            .into_iter()
            .find(|s| s.category == category)
            .map(|s| s.score)
            .unwrap()
    }

    #[test]
    fn test_every_category_but_other_has_a_profile() {
        for category in NeedCategory::ALL {
            assert_eq!(profile(category).is_some(), category != NeedCategory::Other);
        }
    }

    #[test]
    fn test_primary_hit_fires() {
        assert_eq!(fired("I need help with rent", None), vec![NeedCategory::Housing]);
        assert_eq!(fired("my kid needs daycare", None), vec![NeedCategory::Childcare]);
    }

    #[test]
    fn test_amount_bonus_requires_evidence() {
        let with_amount = score_of("I need help with rent", Some(1200.0), NeedCategory::Housing);
        let without = score_of("I need help with rent", None, NeedCategory::Housing);
        assert!((with_amount - without - AMOUNT_BONUS).abs() < 1e-6);
        assert_eq!(score_of("hello", Some(1200.0), NeedCategory::Housing), 0.0);
    }

    #[test]
    fn test_secondary_alone_does_not_fire() {
        assert!(fired("the kids and the baby", None).is_empty());
        let s = score_of("the kids and the baby", None, NeedCategory::Childcare);
        assert!(s > 0.0 && s < CATEGORY_DETECTION_THRESHOLD);
    }

    #[test]
    fn test_exclusion_penalty() {
        assert!(!fired("I need a rental car", None).contains(&NeedCategory::Housing));
        assert!(!fired("I need gas money for work", None).contains(&NeedCategory::Utilities));
    }

    #[test]
    fn test_multiple_categories_can_fire() {
        let f = fired("my landlord wants rent and I also need surgery", None);
        assert!(f.contains(&NeedCategory::Housing));
        assert!(f.contains(&NeedCategory::Medical));
    }

    #[test]
    fn test_scores_are_bounded() {
        let text = "rent eviction evicted landlord mortgage housing apartment lease motel \
                    move moving house home room";
        let s = score_of(text, Some(1000.0), NeedCategory::Housing);
        assert!(s <= 1.0);
        assert!(s >= CATEGORY_DETECTION_THRESHOLD);
    }
}
