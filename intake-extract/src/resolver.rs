//! Category conflict resolution
//!
//! When several categories clear the detection threshold, each gets
//! `weighted = match_score × priority` from a total-order priority table and
//! the maximum wins. Ties go to the category declared first in the table.
//! A single firing category is returned as-is, whatever the table says.

use crate::types::{CategoryScore, NeedCategory};
use serde::Serialize;
use tracing::debug;

/// Priority weight per category, in declaration (tie-break) order
#[derive(Debug, Clone, PartialEq)]
pub struct PriorityTable {
    entries: Vec<(NeedCategory, f32)>,
}

impl Default for PriorityTable {
    /// SAFETY highest, OTHER lowest
    fn default() -> Self {
        Self::new(vec![
            (NeedCategory::Safety, 1.00),
            (NeedCategory::Medical, 0.95),
            (NeedCategory::Housing, 0.90),
            (NeedCategory::Utilities, 0.85),
            (NeedCategory::Food, 0.80),
            (NeedCategory::Childcare, 0.75),
            (NeedCategory::Transportation, 0.70),
            (NeedCategory::Employment, 0.65),
            (NeedCategory::Education, 0.60),
            (NeedCategory::Legal, 0.55),
            (NeedCategory::Funeral, 0.50),
            (NeedCategory::Other, 0.10),
        ])
    }
}

impl PriorityTable {
    pub fn new(entries: Vec<(NeedCategory, f32)>) -> Self {
        Self { entries }
    }

    /// Priority weight (0.0 for categories missing from the table)
    pub fn priority(&self, category: NeedCategory) -> f32 {
        self.entries
            .iter()
            .find(|(c, _)| *c == category)
            .map(|(_, p)| *p)
            .unwrap_or(0.0)
    }

    /// Declaration index (categories missing from the table sort last)
    pub fn position(&self, category: NeedCategory) -> usize {
        self.entries
            .iter()
            .position(|(c, _)| *c == category)
            .unwrap_or(usize::MAX)
    }
}

/// Resolver decision
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resolution {
    pub category: NeedCategory,
    /// Match score of the chosen category (0.0 for the fallback)
    pub confidence: f32,
    pub rationale: String,
    /// Number of categories that fired
    pub contenders: usize,
}

/// Priority-weighted category chooser
#[derive(Debug, Clone, Default)]
pub struct CategoryResolver {
    table: PriorityTable,
}

impl CategoryResolver {
    pub fn new(table: PriorityTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &PriorityTable {
        &self.table
    }

    /// Pick one category from the scored set
    ///
    /// Only entries with `fired == true` are considered.
    pub fn resolve(&self, scores: &[CategoryScore]) -> Resolution {
        let fired: Vec<&CategoryScore> = scores.iter().filter(|s| s.fired).collect();

        let resolution = match fired.as_slice() {
            [] => Resolution {
                category: NeedCategory::Other,
                confidence: 0.0,
                rationale: "no category cleared the detection threshold".to_string(),
                contenders: 0,
            },
            [only] => Resolution {
                category: only.category,
                confidence: only.score,
                rationale: format!("{} was the only category detected", only.category),
                contenders: 1,
            },
            many => {
                let weighted = |s: &CategoryScore| s.score * self.table.priority(s.category);
                let mut ranked: Vec<&CategoryScore> = many.to_vec();
                ranked.sort_by(|a, b| {
                    weighted(*b)
                        .total_cmp(&weighted(*a))
                        .then_with(|| {
                            self.table
                                .position(a.category)
                                .cmp(&self.table.position(b.category))
                        })
                });
                let winner = ranked[0];
                let runner_up = ranked[1];
                Resolution {
                    category: winner.category,
                    confidence: winner.score,
                    rationale: format!(
                        "{} ({:.2}×{:.2}={:.3}) over {} ({:.2}×{:.2}={:.3})",
                        winner.category,
                        winner.score,
                        self.table.priority(winner.category),
                        weighted(winner),
                        runner_up.category,
                        runner_up.score,
                        self.table.priority(runner_up.category),
                        weighted(runner_up),
                    ),
                    contenders: many.len(),
                }
            }
        };

        debug!(
            category = resolution.category.as_str(),
            contenders = resolution.contenders,
            "Category resolved"
        );
        resolution
    }
}
