//! Property tests for the extraction pipeline

use intake_common::config::IntakeConfig;
use intake_extract::resolver::{CategoryResolver, PriorityTable};
use intake_extract::scoring::urgency_level_for;
use intake_extract::{CaseExtractor, CategoryScore, NeedCategory, Transcript};
use once_cell::sync::Lazy;
use proptest::prelude::*;

static EXTRACTOR: Lazy<CaseExtractor> =
    Lazy::new(|| CaseExtractor::new(&IntakeConfig::default()).unwrap());

/// Fragments that exercise every extractor and most corrections
const FRAGMENTS: &[&str] = &[
    "my name is Sarah Johnson",
    "I'm Dana",
    "I need $2,500 for rent",
    "fifteen hundred dollars",
    "between $200 and $400",
    "$15 per hour",
    "$250,000",
    "I make $3,000 a month",
    "short 800 for rent",
    "due tomorrow",
    "eviction notice",
    "no rush",
    "not urgent",
    "urgent emergency",
    "sleeping in my car",
    "my husband is in the ICU",
    "my ex is abusive",
    "it's for my mother",
    "the money is for my neighbor",
    "I work at Brookside",
    "groceries",
    "electric bill shut off",
    "car repair",
    "Thanks, Lena",
    "",
];

fn transcript_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec(prop::sample::select(FRAGMENTS), 0..8).prop_map(|parts| parts.join(" "))
}

proptest! {
    #[test]
    fn prop_amount_null_or_in_bounds(text in transcript_strategy()) {
        let out = EXTRACTOR.extract(&text);
        if let Some(amount) = out.amount {
            prop_assert!((1.0..=100_000.0).contains(&amount), "amount {}", amount);
        }
    }

    #[test]
    fn prop_arbitrary_text_never_fails(text in ".{0,200}") {
        let out = EXTRACTOR.extract(&text);
        prop_assert!(out.confidence.name >= 0.0 && out.confidence.name <= 1.0);
        prop_assert!(out.confidence.category >= 0.0 && out.confidence.category <= 1.0);
    }

    #[test]
    fn prop_deterministic(text in transcript_strategy()) {
        let a = serde_json::to_string(&EXTRACTOR.extract(&text)).unwrap();
        let b = serde_json::to_string(&EXTRACTOR.extract(&text)).unwrap();
        prop_assert_eq!(a, b);
    }

    #[test]
    fn prop_corrections_idempotent(text in transcript_strategy()) {
        let transcript = Transcript::new(text);
        let once = EXTRACTOR.extract_transcript(&transcript);
        let twice = EXTRACTOR.corrections().run(&transcript, &once);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn prop_urgency_mapping_monotonic(a in 0.0f32..=1.0, b in 0.0f32..=1.0) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(urgency_level_for(lo) <= urgency_level_for(hi));
    }

    #[test]
    fn prop_single_category_wins_regardless_of_table(
        index in 0usize..11,
        score in 0.45f32..=1.0,
        weight in 0.0f32..=1.0,
    ) {
        let category = NeedCategory::ALL[index];
        let table = PriorityTable::new(vec![(category, weight)]);
        let scores: Vec<CategoryScore> = NeedCategory::ALL[..11]
            .iter()
            .map(|c| CategoryScore {
                category: *c,
                score: if *c == category { score } else { 0.1 },
                fired: *c == category,
            })
            .collect();
        let resolution = CategoryResolver::new(table).resolve(&scores);
        prop_assert_eq!(resolution.category, category);
    }

    #[test]
    fn prop_urgency_change_has_provenance(text in transcript_strategy()) {
        let transcript = Transcript::new(text);
        let base = EXTRACTOR.extract_base(&transcript);
        let out = EXTRACTOR.corrections().run(&transcript, &base);
        if out.urgency != base.urgency {
            prop_assert!(out.provenance.iter().any(|p| p.field == intake_extract::Field::Urgency));
        }
    }
}
