//! Correction layer
//!
//! An ordered chain of guarded modules runs over the base extraction result.
//! Each module owns one field, may adjust it when its evidence is present,
//! and records every change as a [`CorrectionApplication`].
//!
//! # Contracts
//! - **Protection first:** modules that lower or clear a field refuse to fire
//!   when a protection marker (domestic violence, imminent eviction, medical
//!   emergency, utility shutoff) is present.
//! - **Idempotence:** after a module fires, its own guard is false on the
//!   resulting state.
//! - **Monotonicity:** a module moves its field in one direction only.
//!   Opposing modules on one field must be coordinated through `yields_to`
//!   (checked when the registry is built).
//! - **Isolation:** a module that errors or panics is skipped and the chain
//!   continues with the unmodified result.

pub mod builtin;
pub mod pipeline;
pub mod protection;
pub mod registry;
pub mod rule;

use crate::types::{CorrectionApplication, ExtractionResult, Field, Transcript};
use serde::Serialize;
use thiserror::Error;

pub use pipeline::CorrectionPipeline;
pub use protection::ProtectionMarker;
pub use registry::{RegistryError, RuleRegistry};
pub use rule::{Adjustment, Evidence, ProtectionPolicy, Rule};

/// Direction a module moves its field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Raise an ordinal field (urgency, category priority)
    Escalate,
    /// Lower an ordinal field
    DeEscalate,
    /// Populate an empty field
    Fill,
    /// Empty a populated field
    Clear,
    /// Swap one value for another of equal standing
    Replace,
}

impl Direction {
    /// True for the direction pairs that can undo each other
    pub fn opposes(self, other: Direction) -> bool {
        matches!(
            (self, other),
            (Direction::Escalate, Direction::DeEscalate)
                | (Direction::DeEscalate, Direction::Escalate)
                | (Direction::Fill, Direction::Clear)
                | (Direction::Clear, Direction::Fill)
        )
    }

    /// Directions that lower or remove a value, blocked by protection markers
    pub fn is_reductive(self) -> bool {
        matches!(self, Direction::DeEscalate | Direction::Clear)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Escalate => "escalate",
            Direction::DeEscalate => "de_escalate",
            Direction::Fill => "fill",
            Direction::Clear => "clear",
            Direction::Replace => "replace",
        }
    }
}

/// Correction module failure
#[derive(Debug, Error)]
pub enum CorrectionError {
    /// Guard passed but the evidence needed by `apply` was not found
    #[error("rule {rule}: evidence not found at apply time")]
    MissingEvidence { rule: String },

    /// Module changed a field it does not own
    #[error("rule {rule}: changed fields outside {field}")]
    FieldOwnership { rule: String, field: Field },

    /// Module-specific failure
    #[error("rule {rule}: {reason}")]
    Failed { rule: String, reason: String },
}

/// A guarded correction over one field
///
/// Declarative [`Rule`]s implement this trait; hand-written modules can join
/// the same ordered chain through [`RuleRegistry::with_module`].
///
/// # Example
/// ```rust,ignore
/// struct UppercaseName;
///
/// impl CorrectionModule for UppercaseName {
///     fn id(&self) -> &str { "name.uppercase" }
///     fn order(&self) -> u32 { 200 }
///     fn field(&self) -> Field { Field::Name }
///     fn direction(&self) -> Direction { Direction::Replace }
///     fn rationale(&self) -> &str { "display names are upper-cased" }
///
///     fn guard(&self, _t: &Transcript, r: &ExtractionResult) -> bool {
///         r.name.as_ref().is_some_and(|n| n != &n.to_uppercase())
///     }
///
///     fn apply(&self, _t: &Transcript, r: &ExtractionResult)
///         -> Result<ExtractionResult, CorrectionError>
///     {
///         let before = r.name.clone().unwrap_or_default();
///         let after = before.to_uppercase();
///         let mut next = r.clone();
///         next.name = Some(after.clone());
///         Ok(record(next, self, before, after, "upper-cased".into()))
///     }
/// }
/// ```
pub trait CorrectionModule: Send + Sync {
    /// Stable identifier, recorded in provenance
    fn id(&self) -> &str;

    /// Position in the chain (ascending)
    fn order(&self) -> u32;

    /// The single field this module may change
    fn field(&self) -> Field;

    /// Direction this module moves its field
    fn direction(&self) -> Direction;

    /// Human-readable reason recorded with every change
    fn rationale(&self) -> &str;

    /// True when the module should fire on this state
    fn guard(&self, transcript: &Transcript, result: &ExtractionResult) -> bool;

    /// Produce the corrected result (a new value; `result` is untouched)
    ///
    /// # Errors
    /// Returns `CorrectionError` when the correction cannot be made; the
    /// pipeline skips the module and keeps `result`.
    fn apply(
        &self,
        transcript: &Transcript,
        result: &ExtractionResult,
    ) -> Result<ExtractionResult, CorrectionError>;
}

/// Append a provenance entry for a module's change
pub fn record(
    mut next: ExtractionResult,
    module: &dyn CorrectionModule,
    before: String,
    after: String,
    detail: String,
) -> ExtractionResult {
    let reason = if detail.is_empty() {
        module.rationale().to_string()
    } else {
        format!("{}; {}", module.rationale(), detail)
    };
    next.provenance.push(CorrectionApplication {
        rule_id: module.id().to_string(),
        field: module.field(),
        before,
        after,
        reason,
    });
    next
}
