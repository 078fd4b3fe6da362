//! Extraction engine
//!
//! Runs the base extractors, resolves the category, then hands the
//! aggregated state to the correction pipeline.

use crate::corrections::{CorrectionPipeline, RegistryError, RuleRegistry};
use crate::extractors::{
    extract_amount, extract_name, extract_relationship, extract_urgency, score_categories,
};
use crate::resolver::CategoryResolver;
use crate::scoring::AmountBounds;
use crate::types::{
    CorrectionApplication, ExtractionResult, Field, FieldConfidence, Transcript, UrgencyLevel,
};
use intake_common::config::IntakeConfig;
use tracing::debug;

/// Provenance id for the resolver's choice between competing categories
pub const RESOLVER_ID: &str = "category.priority_resolver";

/// Transcript → structured case fields
#[derive(Debug)]
pub struct CaseExtractor {
    bounds: AmountBounds,
    resolver: CategoryResolver,
    corrections: CorrectionPipeline,
}

impl CaseExtractor {
    /// Build from configuration
    ///
    /// # Errors
    /// Fails when the configured rule set does not validate (unknown disabled
    /// id, uncoordinated opposing rules).
    pub fn new(config: &IntakeConfig) -> Result<Self, RegistryError> {
        let bounds = AmountBounds::from(&config.extraction);
        let registry = RuleRegistry::builtin(&config.rules, bounds)?;
        Ok(Self::with_parts(
            bounds,
            CategoryResolver::default(),
            CorrectionPipeline::new(registry),
        ))
    }

    pub fn with_parts(
        bounds: AmountBounds,
        resolver: CategoryResolver,
        corrections: CorrectionPipeline,
    ) -> Self {
        Self {
            bounds,
            resolver,
            corrections,
        }
    }

    pub fn corrections(&self) -> &CorrectionPipeline {
        &self.corrections
    }

    /// Extract case fields from raw transcript text
    pub fn extract(&self, text: &str) -> ExtractionResult {
        self.extract_transcript(&Transcript::new(text))
    }

    pub fn extract_transcript(&self, transcript: &Transcript) -> ExtractionResult {
        let base = self.extract_base(transcript);
        self.corrections.run(transcript, &base)
    }

    /// Base layer only: extractors and resolver, no corrections
    pub fn extract_base(&self, transcript: &Transcript) -> ExtractionResult {
        if transcript.is_empty() {
            debug!("Empty transcript, returning defaults");
            return ExtractionResult::default();
        }

        let name = extract_name(transcript);
        let amount = extract_amount(transcript, self.bounds);
        let urgency = extract_urgency(transcript);
        let relationship = extract_relationship(transcript);
        let category_scores = score_categories(transcript, amount.value);
        let resolution = self.resolver.resolve(&category_scores);

        let (urgency_level, urgency_score) = urgency
            .value
            .map(|r| (r.level, r.score))
            .unwrap_or((UrgencyLevel::Low, 0.0));

        let mut result = ExtractionResult {
            name: name.value,
            amount: amount.value,
            category: resolution.category,
            urgency: urgency_level,
            urgency_score,
            relationship: relationship.value.unwrap_or_default(),
            confidence: FieldConfidence {
                name: name.confidence,
                amount: amount.confidence,
                category: resolution.confidence,
                urgency: urgency.confidence,
                relationship: relationship.confidence,
            },
            category_scores,
            provenance: Vec::new(),
        };

        if resolution.contenders > 1 {
            result.provenance.push(CorrectionApplication {
                rule_id: RESOLVER_ID.to_string(),
                field: Field::Category,
                before: format!("{} candidates", resolution.contenders),
                after: resolution.category.to_string(),
                reason: resolution.rationale,
            });
        }

        debug!(
            category = %result.category,
            urgency = %result.urgency,
            has_name = result.name.is_some(),
            has_amount = result.amount.is_some(),
            "Base extraction complete"
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{NeedCategory, Relationship};

    fn extractor() -> CaseExtractor {
        CaseExtractor::new(&IntakeConfig::default()).unwrap()
    }

    #[test]
    fn test_empty_transcript_defaults() {
        let out = extractor().extract("   ");
        assert_eq!(out, ExtractionResult::default());
    }

    #[test]
    fn test_resolver_choice_recorded() {
        let out = extractor().extract_base(&Transcript::new(
            "My landlord gave me an eviction notice for rent and I also need groceries and food for the kids",
        ));
        assert_eq!(out.category, NeedCategory::Housing);
        assert_eq!(out.provenance.len(), 1);
        assert_eq!(out.provenance[0].rule_id, RESOLVER_ID);
    }

    #[test]
    fn test_unknown_disabled_rule_is_config_error() {
        let mut config = IntakeConfig::default();
        config.rules.disabled.push("urgency.unknown".to_string());
        assert!(CaseExtractor::new(&config).is_err());
    }

    #[test]
    fn test_relationship_defaults_to_myself() {
        let out = extractor().extract("Need help with a bill");
        assert_eq!(out.relationship, Relationship::Myself);
    }
}
