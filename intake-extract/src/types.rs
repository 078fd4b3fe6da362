//! Core data model for case extraction
//!
//! The extraction result is built once by the base layer and then replaced,
//! never mutated in place, by each correction stage. Every field change past
//! the base layer is recorded as a [`CorrectionApplication`].

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Transcript
// ============================================================================

/// Immutable transcript with its derived views
///
/// - `raw`: text exactly as received from transcription
/// - `cleaned`: typographic punctuation folded to ASCII, whitespace collapsed,
///   case preserved (used where capitalisation carries meaning)
/// - `normalized`: `cleaned` lower-cased (used by every pattern extractor)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcript {
    raw: String,
    cleaned: String,
    normalized: String,
}

impl Transcript {
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let cleaned = clean_text(&raw);
        let normalized = cleaned.to_lowercase();
        Self {
            raw,
            cleaned,
            normalized,
        }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn cleaned(&self) -> &str {
        &self.cleaned
    }

    pub fn normalized(&self) -> &str {
        &self.normalized
    }

    /// True when nothing but whitespace was received
    pub fn is_empty(&self) -> bool {
        self.normalized.is_empty()
    }

    /// True when the cleaned text mixes upper and lower case letters
    ///
    /// All-lowercase or all-caps transcripts carry no capitalisation signal.
    pub fn has_casing(&self) -> bool {
        let upper = self.cleaned.chars().any(|c| c.is_uppercase());
        let lower = self.cleaned.chars().any(|c| c.is_lowercase());
        upper && lower
    }
}

fn clean_text(raw: &str) -> String {
    let folded: String = raw
        .chars()
        .map(|c| match c {
            '\u{2018}' | '\u{2019}' | '\u{02BC}' | '\u{2032}' => '\'',
            '\u{201C}' | '\u{201D}' | '\u{2033}' => '"',
            '\u{2010}' | '\u{2011}' | '\u{2012}' | '\u{2013}' | '\u{2014}' => '-',
            '\u{00A0}' | '\u{2007}' | '\u{202F}' => ' ',
            other => other,
        })
        .collect();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ============================================================================
// Field vocabularies
// ============================================================================

/// Extracted case field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Name,
    Amount,
    Category,
    Urgency,
    Relationship,
}

impl Field {
    pub const ALL: [Field; 5] = [
        Field::Name,
        Field::Amount,
        Field::Category,
        Field::Urgency,
        Field::Relationship,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::Amount => "amount",
            Field::Category => "category",
            Field::Urgency => "urgency",
            Field::Relationship => "relationship",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Need category taxonomy
///
/// Declaration order is the priority order used for tie-breaking:
/// SAFETY first, OTHER last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NeedCategory {
    Safety,
    Medical,
    Housing,
    Utilities,
    Food,
    Childcare,
    Transportation,
    Employment,
    Education,
    Legal,
    Funeral,
    Other,
}

impl NeedCategory {
    pub const ALL: [NeedCategory; 12] = [
        NeedCategory::Safety,
        NeedCategory::Medical,
        NeedCategory::Housing,
        NeedCategory::Utilities,
        NeedCategory::Food,
        NeedCategory::Childcare,
        NeedCategory::Transportation,
        NeedCategory::Employment,
        NeedCategory::Education,
        NeedCategory::Legal,
        NeedCategory::Funeral,
        NeedCategory::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            NeedCategory::Safety => "SAFETY",
            NeedCategory::Medical => "MEDICAL",
            NeedCategory::Housing => "HOUSING",
            NeedCategory::Utilities => "UTILITIES",
            NeedCategory::Food => "FOOD",
            NeedCategory::Childcare => "CHILDCARE",
            NeedCategory::Transportation => "TRANSPORTATION",
            NeedCategory::Employment => "EMPLOYMENT",
            NeedCategory::Education => "EDUCATION",
            NeedCategory::Legal => "LEGAL",
            NeedCategory::Funeral => "FUNERAL",
            NeedCategory::Other => "OTHER",
        }
    }
}

impl fmt::Display for NeedCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordinal urgency level (LOW < MEDIUM < HIGH < CRITICAL)
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UrgencyLevel {
    #[default]
    Low,
    Medium,
    High,
    Critical,
}

impl UrgencyLevel {
    pub const ALL: [UrgencyLevel; 4] = [
        UrgencyLevel::Low,
        UrgencyLevel::Medium,
        UrgencyLevel::High,
        UrgencyLevel::Critical,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            UrgencyLevel::Low => "LOW",
            UrgencyLevel::Medium => "MEDIUM",
            UrgencyLevel::High => "HIGH",
            UrgencyLevel::Critical => "CRITICAL",
        }
    }

    /// Position on the ordinal scale (LOW = 0)
    pub fn rank(self) -> u8 {
        self as u8
    }

    /// Number of ordinal steps between two levels
    pub fn distance(self, other: UrgencyLevel) -> u8 {
        self.rank().abs_diff(other.rank())
    }
}

impl fmt::Display for UrgencyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who the requested help is for
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Relationship {
    #[default]
    Myself,
    FamilyMember,
    Other,
}

impl Relationship {
    pub fn as_str(self) -> &'static str {
        match self {
            Relationship::Myself => "myself",
            Relationship::FamilyMember => "family_member",
            Relationship::Other => "other",
        }
    }
}

impl fmt::Display for Relationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Candidates
// ============================================================================

/// One extractor's proposal for a field
///
/// Created once per extractor call and never mutated. A `None` value with
/// confidence 0 means "nothing matched; use the documented default".
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate<T> {
    pub field: Field,
    pub value: Option<T>,
    /// Confidence in [0.0, 1.0]
    pub confidence: f32,
    /// Label of the pattern that produced the value
    pub matched_pattern: Option<String>,
    /// Extractor that produced the candidate
    pub source: &'static str,
}

impl<T> Candidate<T> {
    /// Candidate carrying a value (confidence clamped to [0, 1])
    pub fn found(
        field: Field,
        value: T,
        confidence: f32,
        matched_pattern: impl Into<String>,
        source: &'static str,
    ) -> Self {
        Self {
            field,
            value: Some(value),
            confidence: crate::scoring::clamp_unit(confidence),
            matched_pattern: Some(matched_pattern.into()),
            source,
        }
    }

    /// Candidate for a field where nothing matched
    pub fn missing(field: Field, source: &'static str) -> Self {
        Self {
            field,
            value: None,
            confidence: 0.0,
            matched_pattern: None,
            source,
        }
    }

    pub fn is_missing(&self) -> bool {
        self.value.is_none()
    }
}

// ============================================================================
// Extraction result
// ============================================================================

/// Confidence per extracted field, each in [0.0, 1.0]
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldConfidence {
    pub name: f32,
    pub amount: f32,
    pub category: f32,
    pub urgency: f32,
    pub relationship: f32,
}

impl FieldConfidence {
    pub fn get(&self, field: Field) -> f32 {
        match field {
            Field::Name => self.name,
            Field::Amount => self.amount,
            Field::Category => self.category,
            Field::Urgency => self.urgency,
            Field::Relationship => self.relationship,
        }
    }

    /// Copy with one field's confidence replaced
    pub fn with(mut self, field: Field, value: f32) -> Self {
        let value = crate::scoring::clamp_unit(value);
        match field {
            Field::Name => self.name = value,
            Field::Amount => self.amount = value,
            Field::Category => self.category = value,
            Field::Urgency => self.urgency = value,
            Field::Relationship => self.relationship = value,
        }
        self
    }
}

/// Score a category reached in the base layer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CategoryScore {
    pub category: NeedCategory,
    pub score: f32,
    /// Score cleared the detection threshold
    pub fired: bool,
}

/// One field change applied after the base layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrectionApplication {
    pub rule_id: String,
    pub field: Field,
    pub before: String,
    pub after: String,
    pub reason: String,
}

impl fmt::Display for CorrectionApplication {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {} -> {} ({})",
            self.rule_id, self.field, self.before, self.after, self.reason
        )
    }
}

/// Aggregated case state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    pub name: Option<String>,
    pub amount: Option<f64>,
    pub category: NeedCategory,
    pub urgency: UrgencyLevel,
    /// Continuous score behind `urgency`
    pub urgency_score: f32,
    pub relationship: Relationship,
    pub confidence: FieldConfidence,
    /// Every taxonomy category the base layer scored, in priority order
    pub category_scores: Vec<CategoryScore>,
    pub provenance: Vec<CorrectionApplication>,
}

impl Default for ExtractionResult {
    /// Result for a transcript where nothing matched
    fn default() -> Self {
        Self {
            name: None,
            amount: None,
            category: NeedCategory::Other,
            urgency: UrgencyLevel::Low,
            urgency_score: 0.0,
            relationship: Relationship::Myself,
            confidence: FieldConfidence::default(),
            category_scores: Vec::new(),
            provenance: Vec::new(),
        }
    }
}

impl ExtractionResult {
    /// Display form of a field's current value, `null` when absent
    pub fn display_value(&self, field: Field) -> String {
        match field {
            Field::Name => self.name.clone().unwrap_or_else(|| "null".to_string()),
            Field::Amount => self
                .amount
                .map(|a| format!("{:.2}", a))
                .unwrap_or_else(|| "null".to_string()),
            Field::Category => self.category.to_string(),
            Field::Urgency => self.urgency.to_string(),
            Field::Relationship => self.relationship.to_string(),
        }
    }

    /// Score the base layer gave a category (0.0 when unscored)
    pub fn category_score(&self, category: NeedCategory) -> f32 {
        self.category_scores
            .iter()
            .find(|s| s.category == category)
            .map(|s| s.score)
            .unwrap_or(0.0)
    }

    /// Provenance rendered as human-readable lines
    pub fn provenance_lines(&self) -> Vec<String> {
        self.provenance.iter().map(|p| p.to_string()).collect()
    }

    /// True when `other` differs from `self` in anything except `field`
    ///
    /// The owned field's confidence, the urgency score (owned by the urgency
    /// field) and the provenance trail are not compared.
    pub fn differs_outside(&self, other: &ExtractionResult, field: Field) -> bool {
        Field::ALL
            .iter()
            .filter(|f| **f != field)
            .any(|f| {
                self.display_value(*f) != other.display_value(*f)
                    || self.confidence.get(*f) != other.confidence.get(*f)
            })
            || (field != Field::Urgency && self.urgency_score != other.urgency_score)
            || self.category_scores != other.category_scores
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transcript_views() {
        let t = Transcript::new("  My  name\u{2019}s\tSarah \u{2014} I NEED help\n");
        assert_eq!(t.cleaned(), "My name's Sarah - I NEED help");
        assert_eq!(t.normalized(), "my name's sarah - i need help");
        assert!(t.has_casing());
        assert!(!t.is_empty());
    }

    #[test]
    fn test_casing_signal() {
        assert!(!Transcript::new("my name is sarah").has_casing());
        assert!(!Transcript::new("MY NAME IS SARAH").has_casing());
        assert!(Transcript::new("   ").is_empty());
    }

    #[test]
    fn test_urgency_ordering() {
        assert!(UrgencyLevel::Low < UrgencyLevel::Medium);
        assert!(UrgencyLevel::High < UrgencyLevel::Critical);
        assert_eq!(UrgencyLevel::Low.distance(UrgencyLevel::High), 2);
        assert_eq!(UrgencyLevel::Critical.distance(UrgencyLevel::High), 1);
    }

    #[test]
    fn test_wire_spellings() {
        assert_eq!(
            serde_json::to_string(&NeedCategory::Transportation).unwrap(),
            "\"TRANSPORTATION\""
        );
        assert_eq!(
            serde_json::to_string(&UrgencyLevel::Critical).unwrap(),
            "\"CRITICAL\""
        );
        assert_eq!(
            serde_json::to_string(&Relationship::FamilyMember).unwrap(),
            "\"family_member\""
        );
        let parsed: Relationship = serde_json::from_str("\"other\"").unwrap();
        assert_eq!(parsed, Relationship::Other);
    }

    #[test]
    fn test_candidate_confidence_clamped() {
        let c = Candidate::found(Field::Amount, 10.0, 1.7, "currency", "amount");
        assert_eq!(c.confidence, 1.0);
        let c = Candidate::found(Field::Amount, 10.0, -0.2, "currency", "amount");
        assert_eq!(c.confidence, 0.0);
        let m: Candidate<f64> = Candidate::missing(Field::Amount, "amount");
        assert!(m.is_missing());
        assert_eq!(m.confidence, 0.0);
    }

    #[test]
    fn test_provenance_line_format() {
        let entry = CorrectionApplication {
            rule_id: "urgency.deadline_escalation".to_string(),
            field: Field::Urgency,
            before: "MEDIUM".to_string(),
            after: "HIGH".to_string(),
            reason: "near-term deadline".to_string(),
        };
        assert_eq!(
            entry.to_string(),
            "[urgency.deadline_escalation] urgency: MEDIUM -> HIGH (near-term deadline)"
        );
    }

    #[test]
    fn test_differs_outside_ignores_owned_field() {
        let base = ExtractionResult::default();
        let mut changed = base.clone();
        changed.urgency = UrgencyLevel::High;
        changed.urgency_score = 0.5;
        changed.confidence = changed.confidence.with(Field::Urgency, 0.6);
        assert!(!base.differs_outside(&changed, Field::Urgency));
        assert!(base.differs_outside(&changed, Field::Category));
    }
}
