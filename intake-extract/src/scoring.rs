//! Shared scoring constants and threshold mapping
//!
//! Every extractor and correction rule reasons about the same boundaries,
//! declared once here.
//!
//! # Urgency boundaries
//!
//! | Score      | Level    |
//! |------------|----------|
//! | ≥ 0.77     | CRITICAL |
//! | ≥ 0.47     | HIGH     |
//! | ≥ 0.15     | MEDIUM   |
//! | otherwise  | LOW      |

use crate::types::UrgencyLevel;
use intake_common::config::ExtractionConfig;
use serde::Serialize;
use std::fmt;

/// Lowest score mapped to CRITICAL
pub const URGENCY_CRITICAL_THRESHOLD: f32 = 0.77;

/// Lowest score mapped to HIGH
pub const URGENCY_HIGH_THRESHOLD: f32 = 0.47;

/// Lowest score mapped to MEDIUM
pub const URGENCY_MEDIUM_THRESHOLD: f32 = 0.15;

/// Gap kept below a boundary when a score is capped under it
const BOUNDARY_MARGIN: f32 = 0.01;

/// Minimum category score for a category to fire
pub const CATEGORY_DETECTION_THRESHOLD: f32 = 0.45;

/// Minimum sub-threshold score a fallback category may be recovered from
pub const CATEGORY_RECOVERY_THRESHOLD: f32 = CATEGORY_DETECTION_THRESHOLD / 2.0;

/// Lowest confidence a correction may leave on a populated field
pub const CONFIDENCE_FLOOR: f32 = 0.10;

/// Largest confidence change a single correction may make
pub const MAX_CONFIDENCE_DELTA: f32 = 0.30;

/// Default smallest accepted amount (inclusive)
pub const DEFAULT_AMOUNT_MIN: f64 = 1.0;

/// Default largest accepted amount (inclusive)
pub const DEFAULT_AMOUNT_MAX: f64 = 100_000.0;

/// Clamp to [0, 1], mapping NaN to 0
pub fn clamp_unit(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Additive score, bounded to [0, 1] when read
///
/// Weights (positive or negative) accumulate unbounded so that the order of
/// hits does not matter; only the final value is clamped.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Score {
    raw: f32,
}

impl Score {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, weight: f32) {
        self.raw += weight;
    }

    pub fn value(&self) -> f32 {
        clamp_unit(self.raw)
    }
}

/// Map a continuous urgency score onto its ordinal level
pub fn urgency_level_for(score: f32) -> UrgencyLevel {
    let score = clamp_unit(score);
    if score >= URGENCY_CRITICAL_THRESHOLD {
        UrgencyLevel::Critical
    } else if score >= URGENCY_HIGH_THRESHOLD {
        UrgencyLevel::High
    } else if score >= URGENCY_MEDIUM_THRESHOLD {
        UrgencyLevel::Medium
    } else {
        UrgencyLevel::Low
    }
}

/// Lowest score that maps to `level`
pub fn urgency_floor(level: UrgencyLevel) -> f32 {
    match level {
        UrgencyLevel::Low => 0.0,
        UrgencyLevel::Medium => URGENCY_MEDIUM_THRESHOLD,
        UrgencyLevel::High => URGENCY_HIGH_THRESHOLD,
        UrgencyLevel::Critical => URGENCY_CRITICAL_THRESHOLD,
    }
}

/// Highest score (with margin) that still maps to `level`
pub fn urgency_ceiling(level: UrgencyLevel) -> f32 {
    match level {
        UrgencyLevel::Low => URGENCY_MEDIUM_THRESHOLD - BOUNDARY_MARGIN,
        UrgencyLevel::Medium => URGENCY_HIGH_THRESHOLD - BOUNDARY_MARGIN,
        UrgencyLevel::High => URGENCY_CRITICAL_THRESHOLD - BOUNDARY_MARGIN,
        UrgencyLevel::Critical => 1.0,
    }
}

/// Named urgency boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UrgencyBoundary {
    Medium,
    High,
    Critical,
}

impl UrgencyBoundary {
    pub const ALL: [UrgencyBoundary; 3] = [
        UrgencyBoundary::Medium,
        UrgencyBoundary::High,
        UrgencyBoundary::Critical,
    ];

    pub fn threshold(self) -> f32 {
        match self {
            UrgencyBoundary::Medium => URGENCY_MEDIUM_THRESHOLD,
            UrgencyBoundary::High => URGENCY_HIGH_THRESHOLD,
            UrgencyBoundary::Critical => URGENCY_CRITICAL_THRESHOLD,
        }
    }
}

impl fmt::Display for UrgencyBoundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UrgencyBoundary::Medium => "MEDIUM",
            UrgencyBoundary::High => "HIGH",
            UrgencyBoundary::Critical => "CRITICAL",
        };
        write!(f, "{}@{:.2}", name, self.threshold())
    }
}

/// Boundaries a score change crosses, in ascending threshold order
pub fn crossed_boundaries(before: f32, after: f32) -> Vec<UrgencyBoundary> {
    let (before, after) = (clamp_unit(before), clamp_unit(after));
    UrgencyBoundary::ALL
        .into_iter()
        .filter(|b| (before >= b.threshold()) != (after >= b.threshold()))
        .collect()
}

/// Apply a correction's confidence change
///
/// The delta is limited to ±[`MAX_CONFIDENCE_DELTA`] and the result kept in
/// [[`CONFIDENCE_FLOOR`], 1.0].
pub fn bounded_confidence(current: f32, delta: f32) -> f32 {
    let delta = delta.clamp(-MAX_CONFIDENCE_DELTA, MAX_CONFIDENCE_DELTA);
    (clamp_unit(current) + delta).clamp(CONFIDENCE_FLOOR, 1.0)
}

/// Inclusive bounds for an accepted amount
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmountBounds {
    pub min: f64,
    pub max: f64,
}

impl AmountBounds {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, amount: f64) -> bool {
        amount.is_finite() && amount >= self.min && amount <= self.max
    }
}

impl Default for AmountBounds {
    fn default() -> Self {
        Self::new(DEFAULT_AMOUNT_MIN, DEFAULT_AMOUNT_MAX)
    }
}

impl From<&ExtractionConfig> for AmountBounds {
    fn from(config: &ExtractionConfig) -> Self {
        Self::new(config.amount_min, config.amount_max)
    }
}
