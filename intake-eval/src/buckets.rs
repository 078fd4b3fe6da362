//! Failure bucketizer
//!
//! Every field that is not a strict match lands in exactly one bucket.
//! Aggregates carry counts and a handful of case ids, never transcript text.

use crate::comparator::{CaseOutcome, Comparator, FieldStatus};
use crate::dataset::GoldenCase;
use intake_extract::extractors::amount::amount_mentions;
use intake_extract::{ExtractionResult, Field, NeedCategory, Transcript};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Case ids kept per bucket
pub const MAX_EXAMPLES: usize = 5;

/// Failure taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureBucket {
    /// Some other specific category won
    CategoryWrong,
    /// The expected category fired but lost the priority resolution
    CategoryPriorityViolated,
    /// OTHER was returned where a specific category was expected
    CategoryTooGeneric,
    AmountMissing,
    /// The expected amount was mentioned but another one was chosen
    AmountWrongSelection,
    /// The extracted amount is off by more than the tolerance
    AmountOutsideTolerance,
    UrgencyOverAssessed,
    UrgencyUnderAssessed,
    NameWrong,
    NameMissing,
    RelationshipWrong,
}

impl FailureBucket {
    pub const ALL: [FailureBucket; 11] = [
        FailureBucket::CategoryWrong,
        FailureBucket::CategoryPriorityViolated,
        FailureBucket::CategoryTooGeneric,
        FailureBucket::AmountMissing,
        FailureBucket::AmountWrongSelection,
        FailureBucket::AmountOutsideTolerance,
        FailureBucket::UrgencyOverAssessed,
        FailureBucket::UrgencyUnderAssessed,
        FailureBucket::NameWrong,
        FailureBucket::NameMissing,
        FailureBucket::RelationshipWrong,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FailureBucket::CategoryWrong => "category_wrong",
            FailureBucket::CategoryPriorityViolated => "category_priority_violated",
            FailureBucket::CategoryTooGeneric => "category_too_generic",
            FailureBucket::AmountMissing => "amount_missing",
            FailureBucket::AmountWrongSelection => "amount_wrong_selection",
            FailureBucket::AmountOutsideTolerance => "amount_outside_tolerance",
            FailureBucket::UrgencyOverAssessed => "urgency_over_assessed",
            FailureBucket::UrgencyUnderAssessed => "urgency_under_assessed",
            FailureBucket::NameWrong => "name_wrong",
            FailureBucket::NameMissing => "name_missing",
            FailureBucket::RelationshipWrong => "relationship_wrong",
        }
    }
}

impl fmt::Display for FailureBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify every non-matching field of one case
pub fn classify(
    case: &GoldenCase,
    result: &ExtractionResult,
    outcome: &CaseOutcome,
    comparator: &Comparator,
) -> Vec<FailureBucket> {
    let expected = &case.expected;
    let failed = |field: Field| {
        outcome
            .status(field)
            .is_some_and(|s| s != FieldStatus::Match)
    };
    let mut buckets = Vec::new();

    if failed(Field::Name) {
        let bucket = match (&result.name, expected.name.as_ref().and_then(|n| n.as_ref())) {
            (None, Some(_)) => FailureBucket::NameMissing,
            _ => FailureBucket::NameWrong,
        };
        buckets.push(bucket);
    }

    if failed(Field::Amount) {
        let wanted = expected.goal_amount.flatten();
        let bucket = match (result.amount, wanted) {
            (None, _) => FailureBucket::AmountMissing,
            (Some(_), None) => FailureBucket::AmountWrongSelection,
            (Some(_), Some(want)) => {
                let transcript = Transcript::new(case.transcript_text.as_str());
                let mentioned = amount_mentions(&transcript)
                    .iter()
                    .any(|m| comparator.amounts_match(Some(m.value), Some(want)));
                if mentioned {
                    FailureBucket::AmountWrongSelection
                } else {
                    FailureBucket::AmountOutsideTolerance
                }
            }
        };
        buckets.push(bucket);
    }

    if failed(Field::Category) {
        let wanted = expected.category.flatten();
        let lost_resolution = wanted.is_some_and(|w| {
            result
                .category_scores
                .iter()
                .any(|s| s.category == w && s.fired)
        });
        let bucket = if result.category == NeedCategory::Other {
            FailureBucket::CategoryTooGeneric
        } else if lost_resolution {
            FailureBucket::CategoryPriorityViolated
        } else {
            FailureBucket::CategoryWrong
        };
        buckets.push(bucket);
    }

    if failed(Field::Urgency) {
        if let Some(want) = expected.urgency_level.flatten() {
            buckets.push(if result.urgency > want {
                FailureBucket::UrgencyOverAssessed
            } else {
                FailureBucket::UrgencyUnderAssessed
            });
        }
    }

    if failed(Field::Relationship) {
        buckets.push(FailureBucket::RelationshipWrong);
    }

    buckets
}

/// Count and example ids of one bucket
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BucketSummary {
    pub count: usize,
    /// First case ids (sorted), at most [`MAX_EXAMPLES`]
    pub examples: Vec<String>,
}

/// Aggregate per-case buckets
///
/// `cases` must already be sorted by id so that the examples are stable.
/// Every bucket of the taxonomy appears in the output, zero or not.
pub fn aggregate<'a>(
    cases: impl IntoIterator<Item = (&'a str, &'a [FailureBucket])>,
) -> BTreeMap<String, BucketSummary> {
    let mut tally: BTreeMap<FailureBucket, BucketSummary> = FailureBucket::ALL
        .iter()
        .map(|b| (*b, BucketSummary::default()))
        .collect();

    for (id, buckets) in cases {
        for bucket in buckets {
            let summary = tally.entry(*bucket).or_default();
            summary.count += 1;
            if summary.examples.len() < MAX_EXAMPLES {
                summary.examples.push(id.to_string());
            }
        }
    }

    tally
        .into_iter()
        .map(|(b, s)| (b.as_str().to_string(), s))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::ExpectedFields;
    use intake_extract::{CategoryScore, UrgencyLevel};

    fn run(expected: ExpectedFields, transcript: &str, result: ExtractionResult) -> Vec<FailureBucket> {
        let case = GoldenCase {
            id: "c".to_string(),
            transcript_text: transcript.to_string(),
            expected,
        };
        let comparator = Comparator::new(0.05);
        let outcome = comparator.compare(&case, &result);
        classify(&case, &result, &outcome, &comparator)
    }

    #[test]
    fn test_amount_buckets() {
        let expected = ExpectedFields {
            goal_amount: Some(Some(500.0)),
            ..Default::default()
        };
        let text = "I make $2,000 a month and need $500 for rent";

        let missing = run(expected.clone(), text, ExtractionResult::default());
        assert_eq!(missing, vec![FailureBucket::AmountMissing]);

        let wrong = run(
            expected.clone(),
            text,
            ExtractionResult {
                amount: Some(2000.0),
                ..Default::default()
            },
        );
        assert_eq!(wrong, vec![FailureBucket::AmountWrongSelection]);

        let off = run(
            expected,
            "I need about $650",
            ExtractionResult {
                amount: Some(650.0),
                ..Default::default()
            },
        );
        assert_eq!(off, vec![FailureBucket::AmountOutsideTolerance]);
    }

    #[test]
    fn test_category_buckets() {
        let expected = ExpectedFields {
            category: Some(Some(NeedCategory::Medical)),
            ..Default::default()
        };

        let generic = run(expected.clone(), "", ExtractionResult::default());
        assert_eq!(generic, vec![FailureBucket::CategoryTooGeneric]);

        let lost = run(
            expected.clone(),
            "",
            ExtractionResult {
                category: NeedCategory::Housing,
                category_scores: vec![
                    CategoryScore { category: NeedCategory::Medical, score: 0.5, fired: true },
                    CategoryScore { category: NeedCategory::Housing, score: 0.8, fired: true },
                ],
                ..Default::default()
            },
        );
        assert_eq!(lost, vec![FailureBucket::CategoryPriorityViolated]);

        let wrong = run(
            expected,
            "",
            ExtractionResult {
                category: NeedCategory::Food,
                ..Default::default()
            },
        );
        assert_eq!(wrong, vec![FailureBucket::CategoryWrong]);
    }

    #[test]
    fn test_urgency_and_name_buckets() {
        let buckets = run(
            ExpectedFields {
                name: Some(Some("Dana".to_string())),
                urgency_level: Some(Some(UrgencyLevel::Low)),
                ..Default::default()
            },
            "",
            ExtractionResult {
                urgency: UrgencyLevel::High,
                ..Default::default()
            },
        );
        assert_eq!(
            buckets,
            vec![FailureBucket::NameMissing, FailureBucket::UrgencyOverAssessed]
        );
    }

    #[test]
    fn test_aggregate_keeps_every_bucket() {
        let a = [FailureBucket::NameWrong];
        let b = [FailureBucket::NameWrong, FailureBucket::AmountMissing];
        let tally = aggregate(vec![("a", &a[..]), ("b", &b[..])]);

        assert_eq!(tally.len(), FailureBucket::ALL.len());
        assert_eq!(tally["name_wrong"].count, 2);
        assert_eq!(tally["name_wrong"].examples, vec!["a", "b"]);
        assert_eq!(tally["amount_missing"].count, 1);
        assert_eq!(tally["relationship_wrong"].count, 0);
    }
}
