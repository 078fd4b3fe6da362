//! intake-extract: transcript → structured case fields
//!
//! # Architecture
//! - **Base extractors:** one pure function per field, each producing a
//!   confidence-scored candidate from the transcript
//! - **Scoring:** shared thresholds mapping continuous scores onto levels
//! - **Category resolver:** priority-weighted choice among firing categories
//! - **Corrections:** ordered registry of guarded override rules, each
//!   appending provenance
//!
//! [`CaseExtractor`] wires the layers together and never fails: any input,
//! including an empty string, yields a fully-shaped [`ExtractionResult`].

pub mod corrections;
pub mod engine;
pub mod extractors;
pub mod resolver;
pub mod scoring;
pub mod types;

pub use crate::engine::CaseExtractor;
pub use crate::types::{
    Candidate, CategoryScore, CorrectionApplication, ExtractionResult, Field, FieldConfidence,
    NeedCategory, Relationship, Transcript, UrgencyLevel,
};
