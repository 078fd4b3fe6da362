//! Correction pipeline
//!
//! Runs the registry's modules once, in order, over the base result.

use crate::corrections::{CorrectionError, CorrectionModule, RuleRegistry};
use crate::types::{ExtractionResult, Transcript};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, warn};

/// Single-pass chain of correction modules
#[derive(Debug)]
pub struct CorrectionPipeline {
    registry: RuleRegistry,
}

enum Step {
    Skipped,
    Applied(ExtractionResult),
    Failed(CorrectionError),
}

impl CorrectionPipeline {
    pub fn new(registry: RuleRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &RuleRegistry {
        &self.registry
    }

    /// Apply every module whose guard holds, in order
    ///
    /// Each module sees the output of the modules before it. A module that
    /// returns an error, panics, or touches a field it does not own is
    /// skipped and the chain continues with the state it was given.
    pub fn run(&self, transcript: &Transcript, base: &ExtractionResult) -> ExtractionResult {
        let mut current = base.clone();

        for module in self.registry.modules() {
            let module = module.as_ref();
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                step(module, transcript, &current)
            }));

            match outcome {
                Ok(Step::Skipped) => {}
                Ok(Step::Applied(next)) => {
                    if next.differs_outside(&current, module.field()) {
                        let err = CorrectionError::FieldOwnership {
                            rule: module.id().to_string(),
                            field: module.field(),
                        };
                        warn!(rule = module.id(), error = %err, "Correction skipped");
                        continue;
                    }
                    debug!(rule = module.id(), field = %module.field(), "Correction fired");
                    current = next;
                }
                Ok(Step::Failed(err)) => {
                    warn!(rule = module.id(), error = %err, "Correction skipped");
                }
                Err(payload) => {
                    warn!(
                        rule = module.id(),
                        panic = %panic_message(payload.as_ref()),
                        "Correction panicked, skipped"
                    );
                }
            }
        }

        current
    }
}

fn step(
    module: &dyn CorrectionModule,
    transcript: &Transcript,
    current: &ExtractionResult,
) -> Step {
    if !module.guard(transcript, current) {
        return Step::Skipped;
    }
    match module.apply(transcript, current) {
        Ok(next) => Step::Applied(next),
        Err(err) => Step::Failed(err),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corrections::builtin::{builtin_rules, HEDGE_CAP, PROTECTION_FLOOR};
    use crate::corrections::{record, Direction};
    use crate::scoring::AmountBounds;
    use crate::types::{Field, UrgencyLevel};

    fn builtin() -> CorrectionPipeline {
        CorrectionPipeline::new(
            RuleRegistry::from_rules(builtin_rules(AmountBounds::default()), &[]).unwrap(),
        )
    }

    fn urgent(level: UrgencyLevel, score: f32) -> ExtractionResult {
        ExtractionResult {
            urgency: level,
            urgency_score: score,
            ..ExtractionResult::default()
        }
    }

    #[derive(Clone, Copy)]
    enum Misbehaviour {
        Errors,
        Panics,
        TouchesAmount,
    }

    struct Faulty {
        id: &'static str,
        order: u32,
        kind: Misbehaviour,
    }

    impl CorrectionModule for Faulty {
        fn id(&self) -> &str {
            self.id
        }
        fn order(&self) -> u32 {
            self.order
        }
        fn field(&self) -> Field {
            Field::Name
        }
        fn direction(&self) -> Direction {
            Direction::Replace
        }
        fn rationale(&self) -> &str {
            "faulty"
        }
        fn guard(&self, _: &Transcript, _: &ExtractionResult) -> bool {
            true
        }
        fn apply(
            &self,
            _: &Transcript,
            r: &ExtractionResult,
        ) -> Result<ExtractionResult, CorrectionError> {
            match self.kind {
                Misbehaviour::Errors => Err(CorrectionError::Failed {
                    rule: self.id.to_string(),
                    reason: "boom".to_string(),
                }),
                Misbehaviour::Panics => panic!("module exploded"),
                Misbehaviour::TouchesAmount => {
                    let mut next = r.clone();
                    next.amount = Some(1.0);
                    Ok(record(next, self, "null".into(), "1.00".into(), String::new()))
                }
            }
        }
    }

    #[test]
    fn test_faulty_modules_are_isolated() {
        let registry = RuleRegistry::from_rules(builtin_rules(AmountBounds::default()), &[])
            .unwrap()
            .with_module(
                Box::new(Faulty { id: "test.errors", order: 1, kind: Misbehaviour::Errors }),
                &[],
            )
            .unwrap()
            .with_module(
                Box::new(Faulty { id: "test.panics", order: 2, kind: Misbehaviour::Panics }),
                &[],
            )
            .unwrap()
            .with_module(
                Box::new(Faulty {
                    id: "test.touches_amount",
                    order: 3,
                    kind: Misbehaviour::TouchesAmount,
                }),
                &[],
            )
            .unwrap();
        let pipeline = CorrectionPipeline::new(registry);

        let t = Transcript::new("my husband is in the ICU");
        let out = pipeline.run(&t, &urgent(UrgencyLevel::Medium, 0.2));

        // Later modules still ran
        assert_eq!(out.urgency, UrgencyLevel::Critical);
        assert_eq!(out.amount, None);
        assert_eq!(out.provenance.len(), 1);
        assert_eq!(out.provenance[0].rule_id, PROTECTION_FLOOR);
    }

    #[test]
    fn test_notice_blocks_hedge_cap() {
        let t = Transcript::new(
            "I got an eviction notice, the deadline is friday, but no rush if you can't",
        );
        let out = builtin().run(&t, &urgent(UrgencyLevel::High, 0.6));
        assert!(out.urgency >= UrgencyLevel::High);
        assert!(out.provenance.iter().all(|p| p.rule_id != HEDGE_CAP));
    }

    #[test]
    fn test_hedge_cap_fires_without_deadline() {
        let t = Transcript::new("honestly no rush on this, it would be nice to fix the car");
        let out = builtin().run(&t, &urgent(UrgencyLevel::High, 0.5));
        assert_eq!(out.urgency, UrgencyLevel::Medium);
        assert!(out.urgency_score < 0.47);
        let entry = out.provenance.iter().find(|p| p.rule_id == HEDGE_CAP).unwrap();
        assert_eq!(entry.before, "HIGH");
        assert_eq!(entry.after, "MEDIUM");
    }

    #[test]
    fn test_each_rule_fires_at_most_once() {
        let pipeline = builtin();
        let t = Transcript::new(
            "Not urgent but it's for my son. I work at Walmart and we need 600 for rent. Thanks, Dana",
        );
        let base = ExtractionResult {
            name: Some("Walmart".to_string()),
            urgency: UrgencyLevel::High,
            urgency_score: 0.5,
            ..ExtractionResult::default()
        };
        let once = pipeline.run(&t, &base);
        let twice = pipeline.run(&t, &once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_modules_see_previous_output() {
        let t = Transcript::new("I work at Walmart and need 600 for rent. Thanks, Dana");
        let base = ExtractionResult {
            name: Some("Walmart".to_string()),
            ..ExtractionResult::default()
        };
        let out = builtin().run(&t, &base);
        assert_eq!(out.name.as_deref(), Some("Dana"));
        assert_eq!(out.amount, Some(600.0));
        let ids: Vec<&str> = out.provenance.iter().map(|p| p.rule_id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "name.place_or_employer_filter",
                "name.sign_off_recovery",
                "amount.contextual_recovery"
            ]
        );
    }
}
