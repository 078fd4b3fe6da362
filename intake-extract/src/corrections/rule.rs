//! Declarative correction rules
//!
//! A [`Rule`] is a data record: evidence to look for, phrases that block it,
//! rules it yields to, a protection policy, and the adjustment it makes.
//! The guard is derived from those parts in a fixed order:
//!
//! 1. Protection markers (for rules with [`ProtectionPolicy::BlockWhenProtected`])
//! 2. Blocker phrases
//! 3. Own evidence
//! 4. State precondition of the adjustment (e.g. "urgency below HIGH")
//! 5. Yielded evidence: the rule stands down if the evidence of any rule it
//!    yields to holds on the state it would produce
//!
//! Step 4 makes every rule idempotent: once applied, the precondition no
//! longer holds.

use crate::corrections::{protection, record, CorrectionError, CorrectionModule, Direction};
use crate::extractors::amount::{parse_amount_text, stated_only_as_income};
use crate::extractors::lexicon::Lexicon;
use crate::extractors::name::{plausible_name, title_case};
use crate::extractors::relationship::classify_person;
use crate::extractors::urgency::score_without;
use crate::scoring::{
    bounded_confidence, crossed_boundaries, urgency_ceiling, urgency_floor, AmountBounds,
    CATEGORY_RECOVERY_THRESHOLD, URGENCY_CRITICAL_THRESHOLD,
};
use crate::types::{ExtractionResult, Field, NeedCategory, Relationship, Transcript, UrgencyLevel};
use regex::Regex;
use tracing::info;

/// Whether protection markers suppress a rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtectionPolicy {
    /// Fires regardless of protection markers
    Ignore,
    /// Refuses to fire while any protection marker is present
    BlockWhenProtected,
}

/// What a rule looks for
#[derive(Debug, Clone)]
pub enum Evidence {
    /// Any phrase present in the normalized transcript
    Phrases(Lexicon),
    /// Any phrase present, and urgency scored without these phrases stays
    /// below CRITICAL
    IntensityOnly(Lexicon),
    /// Regex over the normalized transcript; a `value` group is the proposed value
    Pattern(Regex),
    /// Regex over the case-preserving transcript; a `value` group is the proposed value
    CasedPattern(Regex),
    /// Any protection marker present
    ProtectionMarker,
    /// The current name directly follows a match of the cue regex
    NameAfterCue(Regex),
    /// Every mention of the current amount sits next to income language
    AmountStatedAsIncome,
    /// OTHER was chosen while some category scored at or above the recovery threshold
    SubThresholdCategory,
}

impl Evidence {
    /// True when the evidence holds for this transcript and state
    pub fn matches(&self, transcript: &Transcript, result: &ExtractionResult) -> bool {
        match self {
            Evidence::Phrases(lexicon) => lexicon.any(transcript.normalized()),
            Evidence::IntensityOnly(lexicon) => {
                lexicon.any(transcript.normalized())
                    && score_without(transcript, lexicon) < URGENCY_CRITICAL_THRESHOLD
            }
            Evidence::Pattern(regex) => regex.is_match(transcript.normalized()),
            Evidence::CasedPattern(regex) => regex.is_match(transcript.cleaned()),
            Evidence::ProtectionMarker => protection::is_protected(transcript),
            Evidence::NameAfterCue(cue) => result
                .name
                .as_deref()
                .is_some_and(|name| name_follows_cue(cue, transcript.normalized(), name)),
            Evidence::AmountStatedAsIncome => result
                .amount
                .is_some_and(|amount| stated_only_as_income(transcript, amount)),
            Evidence::SubThresholdCategory => {
                result.category == NeedCategory::Other && best_sub_threshold(result).is_some()
            }
        }
    }

    /// Values captured by the `value` group, in transcript order
    pub fn captures(&self, transcript: &Transcript) -> Vec<String> {
        let (regex, text) = match self {
            Evidence::Pattern(regex) => (regex, transcript.normalized()),
            Evidence::CasedPattern(regex) => (regex, transcript.cleaned()),
            _ => return Vec::new(),
        };
        regex
            .captures_iter(text)
            .filter_map(|caps| caps.name("value").map(|m| m.as_str().to_string()))
            .collect()
    }

    /// Short description of what matched, for provenance
    pub fn describe(&self, transcript: &Transcript) -> String {
        match self {
            Evidence::Phrases(lexicon) => lexicon
                .first(transcript.normalized())
                .map(|p| format!("matched \"{}\"", p))
                .unwrap_or_default(),
            Evidence::IntensityOnly(lexicon) => lexicon
                .first(transcript.normalized())
                .map(|p| {
                    format!(
                        "matched \"{}\", {:.2} without intensity words",
                        p,
                        score_without(transcript, lexicon)
                    )
                })
                .unwrap_or_default(),
            Evidence::ProtectionMarker => protection::detect(transcript)
                .iter()
                .map(|m| m.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            Evidence::NameAfterCue(_) => "name appears as a place or employer".to_string(),
            Evidence::AmountStatedAsIncome => "amount only stated as income".to_string(),
            Evidence::Pattern(_) | Evidence::CasedPattern(_) | Evidence::SubThresholdCategory => {
                String::new()
            }
        }
    }
}

fn name_follows_cue(cue: &Regex, text: &str, name: &str) -> bool {
    let name = name.to_lowercase();
    cue.find_iter(text).any(|m| {
        let rest = &text[m.end()..];
        rest.starts_with(&name)
            && !rest[name.len()..]
                .chars()
                .next()
                .is_some_and(|c| c.is_alphanumeric())
    })
}

/// Highest-scoring category that did not fire but reached the recovery
/// threshold (earliest in priority order on ties)
fn best_sub_threshold(result: &ExtractionResult) -> Option<(NeedCategory, f32)> {
    result
        .category_scores
        .iter()
        .filter(|s| !s.fired && s.score >= CATEGORY_RECOVERY_THRESHOLD)
        .fold(None, |best: Option<(NeedCategory, f32)>, s| match best {
            Some((_, score)) if score >= s.score => best,
            _ => Some((s.category, s.score)),
        })
}

/// The change a rule makes to its field
#[derive(Debug, Clone, PartialEq)]
pub enum Adjustment {
    /// Raise urgency to at least this level
    RaiseUrgencyTo(UrgencyLevel),
    /// Raise urgency to the highest floor among the protection markers present
    RaiseUrgencyToProtectionFloor,
    /// Lower urgency to at most this level
    CapUrgencyAt(UrgencyLevel),
    /// Move category to a higher-priority category
    SetCategory(NeedCategory),
    /// Replace OTHER with the best sub-threshold category
    RecoverCategory,
    ClearName,
    /// Fill an empty name from the evidence capture
    NameFromCapture,
    ClearAmount,
    /// Fill an empty amount from the evidence capture
    AmountFromCapture(AmountBounds),
    /// Replace `myself` with the relationship of the captured person
    RelationshipFromCapture,
}

impl Adjustment {
    /// Field the adjustment writes
    pub fn field(&self) -> Field {
        match self {
            Adjustment::RaiseUrgencyTo(_)
            | Adjustment::RaiseUrgencyToProtectionFloor
            | Adjustment::CapUrgencyAt(_) => Field::Urgency,
            Adjustment::SetCategory(_) | Adjustment::RecoverCategory => Field::Category,
            Adjustment::ClearName | Adjustment::NameFromCapture => Field::Name,
            Adjustment::ClearAmount | Adjustment::AmountFromCapture(_) => Field::Amount,
            Adjustment::RelationshipFromCapture => Field::Relationship,
        }
    }

    /// Direction the adjustment moves its field
    pub fn direction(&self) -> Direction {
        match self {
            Adjustment::RaiseUrgencyTo(_)
            | Adjustment::RaiseUrgencyToProtectionFloor
            | Adjustment::SetCategory(_) => Direction::Escalate,
            Adjustment::CapUrgencyAt(_) => Direction::DeEscalate,
            Adjustment::RecoverCategory
            | Adjustment::NameFromCapture
            | Adjustment::AmountFromCapture(_) => Direction::Fill,
            Adjustment::ClearName | Adjustment::ClearAmount => Direction::Clear,
            Adjustment::RelationshipFromCapture => Direction::Replace,
        }
    }
}

/// A proposed state, without provenance
struct Proposal {
    next: ExtractionResult,
    detail: String,
}

/// Declarative correction rule
#[derive(Debug, Clone)]
pub struct Rule {
    pub id: &'static str,
    pub order: u32,
    pub evidence: Evidence,
    pub blockers: Option<Lexicon>,
    pub yields_to: Vec<&'static str>,
    pub protection: ProtectionPolicy,
    pub adjustment: Adjustment,
    /// Confidence change applied to the owned field (bounded)
    pub confidence_delta: f32,
    pub rationale: &'static str,
    /// Evidence of the rules in `yields_to`, resolved by the registry
    pub(crate) yielded: Vec<Evidence>,
}

impl Rule {
    pub fn new(
        id: &'static str,
        order: u32,
        evidence: Evidence,
        adjustment: Adjustment,
        rationale: &'static str,
    ) -> Self {
        let protection = if adjustment.direction().is_reductive() {
            ProtectionPolicy::BlockWhenProtected
        } else {
            ProtectionPolicy::Ignore
        };
        Self {
            id,
            order,
            evidence,
            blockers: None,
            yields_to: Vec::new(),
            protection,
            adjustment,
            confidence_delta: 0.0,
            rationale,
            yielded: Vec::new(),
        }
    }

    /// Phrases that stop the rule from firing
    pub fn blocked_by(mut self, phrases: &[&'static str]) -> Self {
        self.blockers = Some(Lexicon::new(phrases));
        self
    }

    /// Rules whose evidence makes this rule stand down
    pub fn yields_to(mut self, ids: &[&'static str]) -> Self {
        self.yields_to = ids.to_vec();
        self
    }

    pub fn with_confidence_delta(mut self, delta: f32) -> Self {
        self.confidence_delta = delta;
        self
    }

    pub fn with_protection(mut self, policy: ProtectionPolicy) -> Self {
        self.protection = policy;
        self
    }

    fn propose(&self, transcript: &Transcript, result: &ExtractionResult) -> Option<Proposal> {
        let field = self.adjustment.field();
        let mut next = result.clone();
        let confidence = bounded_confidence(result.confidence.get(field), self.confidence_delta);
        let mut detail = self.evidence.describe(transcript);

        match &self.adjustment {
            Adjustment::RaiseUrgencyTo(level) => {
                if result.urgency >= *level {
                    return None;
                }
                next.urgency = *level;
                next.urgency_score = result.urgency_score.max(urgency_floor(*level));
            }
            Adjustment::RaiseUrgencyToProtectionFloor => {
                let floor = protection::urgency_floor(transcript)?;
                if result.urgency >= floor {
                    return None;
                }
                next.urgency = floor;
                next.urgency_score = result.urgency_score.max(urgency_floor(floor));
            }
            Adjustment::CapUrgencyAt(level) => {
                if result.urgency <= *level {
                    return None;
                }
                next.urgency = *level;
                next.urgency_score = result.urgency_score.min(urgency_ceiling(*level));
            }
            Adjustment::SetCategory(category) => {
                // Declaration order is priority order: only move up
                if *category >= result.category {
                    return None;
                }
                next.category = *category;
            }
            Adjustment::RecoverCategory => {
                if result.category != NeedCategory::Other {
                    return None;
                }
                let (category, score) = best_sub_threshold(result)?;
                next.category = category;
                detail = format!(
                    "{} scored {:.2}, at or above recovery threshold {:.3}",
                    category, score, CATEGORY_RECOVERY_THRESHOLD
                );
            }
            Adjustment::ClearName => {
                result.name.as_ref()?;
                next.name = None;
            }
            Adjustment::NameFromCapture => {
                if result.name.is_some() {
                    return None;
                }
                let name = self
                    .evidence
                    .captures(transcript)
                    .into_iter()
                    .find(|c| plausible_name(c))?;
                next.name = Some(title_case(&name));
            }
            Adjustment::ClearAmount => {
                result.amount?;
                next.amount = None;
            }
            Adjustment::AmountFromCapture(bounds) => {
                if result.amount.is_some() {
                    return None;
                }
                let amount = self
                    .evidence
                    .captures(transcript)
                    .iter()
                    .filter_map(|c| parse_amount_text(c))
                    .find(|a| bounds.contains(*a))?;
                next.amount = Some(amount);
            }
            Adjustment::RelationshipFromCapture => {
                if result.relationship != Relationship::Myself {
                    return None;
                }
                let relationship = self
                    .evidence
                    .captures(transcript)
                    .iter()
                    .filter_map(|c| classify_person(c))
                    .next()?;
                next.relationship = relationship;
            }
        }

        let field_confidence = match self.adjustment.direction() {
            Direction::Clear => 0.0,
            _ => confidence,
        };
        next.confidence = next.confidence.with(field, field_confidence);
        Some(Proposal { next, detail })
    }
}

impl CorrectionModule for Rule {
    fn id(&self) -> &str {
        self.id
    }

    fn order(&self) -> u32 {
        self.order
    }

    fn field(&self) -> Field {
        self.adjustment.field()
    }

    fn direction(&self) -> Direction {
        self.adjustment.direction()
    }

    fn rationale(&self) -> &str {
        self.rationale
    }

    fn guard(&self, transcript: &Transcript, result: &ExtractionResult) -> bool {
        if self.protection == ProtectionPolicy::BlockWhenProtected
            && protection::is_protected(transcript)
        {
            return false;
        }
        if self
            .blockers
            .as_ref()
            .is_some_and(|b| b.any(transcript.normalized()))
        {
            return false;
        }
        if !self.evidence.matches(transcript, result) {
            return false;
        }
        let Some(proposal) = self.propose(transcript, result) else {
            return false;
        };
        !self
            .yielded
            .iter()
            .any(|e| e.matches(transcript, &proposal.next))
    }

    fn apply(
        &self,
        transcript: &Transcript,
        result: &ExtractionResult,
    ) -> Result<ExtractionResult, CorrectionError> {
        let field = self.adjustment.field();
        let Proposal { next, mut detail } =
            self.propose(transcript, result)
                .ok_or_else(|| CorrectionError::MissingEvidence {
                    rule: self.id.to_string(),
                })?;

        if field == Field::Urgency {
            let crossed = crossed_boundaries(result.urgency_score, next.urgency_score);
            for boundary in &crossed {
                info!(
                    rule = self.id,
                    boundary = %boundary,
                    from = result.urgency_score,
                    to = next.urgency_score,
                    "Urgency score crossed boundary"
                );
            }
            let scores = format!("score {:.2} -> {:.2}", result.urgency_score, next.urgency_score);
            detail = [detail, scores]
                .into_iter()
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join("; ");
        }

        match field {
            Field::Name => info!(rule = self.id, field = %field, "Correction applied"),
            _ => info!(
                rule = self.id,
                field = %field,
                before = %result.display_value(field),
                after = %next.display_value(field),
                "Correction applied"
            ),
        }

        let before = result.display_value(field);
        let after = next.display_value(field);
        Ok(record(next, self, before, after, detail))
    }
}
