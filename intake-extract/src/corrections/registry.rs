//! Correction module registry
//!
//! Holds the ordered chain and validates it when built:
//! unique ids, unique orders, known yield targets, and coordination between
//! opposing modules on the same field.

use crate::corrections::builtin::builtin_rules;
use crate::corrections::rule::Rule;
use crate::corrections::CorrectionModule;
use crate::scoring::AmountBounds;
use crate::types::Field;
use intake_common::config::RulesConfig;
use std::collections::HashSet;
use thiserror::Error;
use tracing::{debug, info};

/// Registry validation failure
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("duplicate correction id: {0}")]
    DuplicateId(String),

    #[error("correction order {order} used by both {first} and {second}")]
    DuplicateOrder {
        order: u32,
        first: String,
        second: String,
    },

    /// Two modules move one field in opposite directions and neither yields
    #[error("{first} and {second} move {field} in opposite directions without a yield")]
    UncoordinatedConflict {
        first: String,
        second: String,
        field: Field,
    },

    /// A disabled id that names no correction
    #[error("unknown correction id: {0}")]
    UnknownRule(String),

    #[error("{rule} yields to unknown correction {target}")]
    UnknownYield { rule: String, target: String },
}

/// Ordered, validated chain of correction modules
pub struct RuleRegistry {
    modules: Vec<Box<dyn CorrectionModule>>,
    /// Yield pairs `(yielding, target)` among registered modules
    yields: HashSet<(String, String)>,
}

impl std::fmt::Debug for RuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleRegistry")
            .field("modules", &self.ids())
            .finish()
    }
}

impl RuleRegistry {
    /// Registry with no modules
    pub fn empty() -> Self {
        Self {
            modules: Vec::new(),
            yields: HashSet::new(),
        }
    }

    /// Built-in rules minus those disabled in configuration
    pub fn builtin(config: &RulesConfig, bounds: AmountBounds) -> Result<Self, RegistryError> {
        Self::from_rules(builtin_rules(bounds), &config.disabled)
    }

    /// Validate and order declarative rules
    ///
    /// Disabled ids must name a rule. Yields pointing at a disabled rule are
    /// dropped; yields pointing at an id that never existed are errors.
    pub fn from_rules(rules: Vec<Rule>, disabled: &[String]) -> Result<Self, RegistryError> {
        let known: HashSet<&str> = rules.iter().map(|r| r.id).collect();
        if let Some(unknown) = disabled.iter().find(|d| !known.contains(d.as_str())) {
            return Err(RegistryError::UnknownRule(unknown.clone()));
        }

        for rule in &rules {
            if let Some(target) = rule.yields_to.iter().find(|t| !known.contains(**t)) {
                return Err(RegistryError::UnknownYield {
                    rule: rule.id.to_string(),
                    target: target.to_string(),
                });
            }
        }

        let enabled: Vec<Rule> = rules
            .into_iter()
            .filter(|r| {
                let off = disabled.iter().any(|d| d == r.id);
                if off {
                    info!(rule = r.id, "Correction disabled by configuration");
                }
                !off
            })
            .collect();

        let mut resolved = Vec::with_capacity(enabled.len());
        for rule in &enabled {
            let mut rule = rule.clone();
            rule.yielded = enabled
                .iter()
                .filter(|other| rule.yields_to.contains(&other.id))
                .map(|other| other.evidence.clone())
                .collect();
            resolved.push(rule);
        }

        let mut registry = Self::empty();
        for rule in resolved {
            let yields: Vec<String> = rule
                .yields_to
                .iter()
                .filter(|t| enabled.iter().any(|r| r.id == **t))
                .map(|t| t.to_string())
                .collect();
            registry.insert(Box::new(rule), yields)?;
        }

        debug!(count = registry.len(), "Correction registry built");
        Ok(registry)
    }

    /// Add a hand-written module
    ///
    /// `yields_to` names the registered modules whose changes this module
    /// defers to. Hand-written modules must coordinate with any opposing
    /// module in the same way rules do.
    pub fn with_module(
        mut self,
        module: Box<dyn CorrectionModule>,
        yields_to: &[&str],
    ) -> Result<Self, RegistryError> {
        let yields = yields_to.iter().map(|t| t.to_string()).collect::<Vec<_>>();
        if let Some(target) = yields.iter().find(|t| !self.contains(t)) {
            return Err(RegistryError::UnknownYield {
                rule: module.id().to_string(),
                target: target.clone(),
            });
        }
        self.insert(module, yields)?;
        Ok(self)
    }

    fn insert(
        &mut self,
        module: Box<dyn CorrectionModule>,
        yields_to: Vec<String>,
    ) -> Result<(), RegistryError> {
        let id = module.id().to_string();
        if self.contains(&id) {
            return Err(RegistryError::DuplicateId(id));
        }
        if let Some(existing) = self.modules.iter().find(|m| m.order() == module.order()) {
            return Err(RegistryError::DuplicateOrder {
                order: module.order(),
                first: existing.id().to_string(),
                second: id,
            });
        }
        for target in yields_to {
            self.yields.insert((id.clone(), target));
        }
        for existing in &self.modules {
            if existing.field() == module.field()
                && existing.direction().opposes(module.direction())
                && !self.coordinated(existing.id(), &id)
            {
                return Err(RegistryError::UncoordinatedConflict {
                    first: existing.id().to_string(),
                    second: id,
                    field: module.field(),
                });
            }
        }

        let position = self
            .modules
            .partition_point(|m| m.order() < module.order());
        self.modules.insert(position, module);
        Ok(())
    }

    fn coordinated(&self, a: &str, b: &str) -> bool {
        self.yields.contains(&(a.to_string(), b.to_string()))
            || self.yields.contains(&(b.to_string(), a.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.modules.iter().any(|m| m.id() == id)
    }

    /// Modules in chain order
    pub fn modules(&self) -> &[Box<dyn CorrectionModule>] {
        &self.modules
    }

    pub fn ids(&self) -> Vec<&str> {
        self.modules.iter().map(|m| m.id()).collect()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}
