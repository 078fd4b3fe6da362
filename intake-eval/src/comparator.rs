//! Expected vs extracted comparison
//!
//! Amounts compare with a relative tolerance; every other field compares
//! exactly. Near misses (urgency one level off, a name differing only in
//! case/punctuation or missing tokens) fail strict but pass acceptable.

use crate::dataset::GoldenCase;
use intake_extract::{ExtractionResult, Field, UrgencyLevel};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-field comparison result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldStatus {
    Match,
    NearMiss,
    Mismatch,
}

/// Comparison of one case (ids and statuses only)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseOutcome {
    pub id: String,
    /// Status per checked field, keyed by field name
    pub fields: BTreeMap<String, FieldStatus>,
    pub strict_pass: bool,
    pub acceptable_pass: bool,
}

impl CaseOutcome {
    pub fn status(&self, field: Field) -> Option<FieldStatus> {
        self.fields.get(field.as_str()).copied()
    }
}

/// True when `actual` is within `tolerance` (relative) of `expected`
pub fn within_tolerance(actual: f64, expected: f64, tolerance: f64) -> bool {
    if expected == 0.0 {
        return actual == 0.0;
    }
    (actual - expected).abs() / expected.abs() <= tolerance + f64::EPSILON
}

/// Lowercase, punctuation stripped, whitespace collapsed
fn name_key(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect::<String>()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn name_status(actual: Option<&str>, expected: Option<&str>) -> FieldStatus {
    match (actual, expected) {
        (None, None) => FieldStatus::Match,
        (Some(a), Some(e)) if a == e => FieldStatus::Match,
        (Some(a), Some(e)) => {
            let (a, e) = (name_key(a), name_key(e));
            let expected_tokens: Vec<&str> = e.split_whitespace().collect();
            let subset = !a.is_empty() && a.split_whitespace().all(|t| expected_tokens.contains(&t));
            if a == e || subset {
                FieldStatus::NearMiss
            } else {
                FieldStatus::Mismatch
            }
        }
        _ => FieldStatus::Mismatch,
    }
}

fn urgency_status(actual: UrgencyLevel, expected: Option<UrgencyLevel>) -> FieldStatus {
    match expected {
        Some(e) if e == actual => FieldStatus::Match,
        Some(e) if e.distance(actual) == 1 => FieldStatus::NearMiss,
        _ => FieldStatus::Mismatch,
    }
}

fn exact<T: PartialEq>(actual: Option<T>, expected: Option<T>) -> FieldStatus {
    if actual == expected {
        FieldStatus::Match
    } else {
        FieldStatus::Mismatch
    }
}

/// Field comparator
#[derive(Debug, Clone, Copy)]
pub struct Comparator {
    amount_tolerance: f64,
}

impl Comparator {
    pub fn new(amount_tolerance: f64) -> Self {
        Self { amount_tolerance }
    }

    pub fn amount_tolerance(&self) -> f64 {
        self.amount_tolerance
    }

    /// Amount equality under the relative tolerance (null matches only null)
    pub fn amounts_match(&self, actual: Option<f64>, expected: Option<f64>) -> bool {
        match (actual, expected) {
            (None, None) => true,
            (Some(a), Some(e)) => within_tolerance(a, e, self.amount_tolerance),
            _ => false,
        }
    }

    /// Compare every field the case checks
    pub fn compare(&self, case: &GoldenCase, result: &ExtractionResult) -> CaseOutcome {
        let expected = &case.expected;
        let mut fields = BTreeMap::new();

        if let Some(name) = &expected.name {
            fields.insert(
                Field::Name,
                name_status(result.name.as_deref(), name.as_deref()),
            );
        }
        if let Some(amount) = expected.goal_amount {
            let status = if self.amounts_match(result.amount, amount) {
                FieldStatus::Match
            } else {
                FieldStatus::Mismatch
            };
            fields.insert(Field::Amount, status);
        }
        if let Some(category) = expected.category {
            fields.insert(Field::Category, exact(Some(result.category), category));
        }
        if let Some(urgency) = expected.urgency_level {
            fields.insert(Field::Urgency, urgency_status(result.urgency, urgency));
        }
        if let Some(relationship) = expected.beneficiary_relationship {
            fields.insert(
                Field::Relationship,
                exact(Some(result.relationship), relationship),
            );
        }

        let strict_pass = fields.values().all(|s| *s == FieldStatus::Match);
        let acceptable_pass = fields.values().all(|s| *s != FieldStatus::Mismatch);
        CaseOutcome {
            id: case.id.clone(),
            fields: fields
                .into_iter()
                .map(|(f, s)| (f.as_str().to_string(), s))
                .collect(),
            strict_pass,
            acceptable_pass,
        }
    }
}
