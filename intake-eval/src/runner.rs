//! Suite runner
//!
//! Cases are independent, so each suite fans out over a rayon parallel
//! iterator; aggregation sorts by case id afterwards. The baseline guard runs
//! once, before any case is processed.

use crate::baseline::BaselineGuard;
use crate::buckets::classify;
use crate::comparator::Comparator;
use crate::dataset::{load_dataset, Dataset};
use crate::error::{EvalError, Result};
use crate::report::{CaseRecord, EvaluationReport};
use intake_common::config::{IntakeConfig, SuiteConfig};
use intake_extract::{CaseExtractor, Transcript};
use rayon::prelude::*;
use tracing::{debug, info, warn};

/// Progressive run options (CLI flags over config)
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Halt on optional suite failures and on regressions
    pub stop_on_regression: bool,
    /// Last suite to run (inclusive)
    pub max_suite: Option<String>,
}

/// Outcome of one suite within a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuiteStatus {
    Passed,
    FailedRequired,
    FailedOptional,
    Regressed,
}

/// Everything a run produced
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub reports: Vec<EvaluationReport>,
    pub statuses: Vec<(String, SuiteStatus)>,
    /// Suite that stopped the run, if any
    pub halted_at: Option<String>,
}

impl RunSummary {
    /// True when no required suite missed its thresholds and the run was not halted
    pub fn all_required_met(&self) -> bool {
        self.halted_at.is_none()
            && !self
                .statuses
                .iter()
                .any(|(_, s)| *s == SuiteStatus::FailedRequired)
    }
}

pub struct SuiteRunner {
    config: IntakeConfig,
    extractor: CaseExtractor,
    comparator: Comparator,
}

impl SuiteRunner {
    pub fn new(config: IntakeConfig) -> Result<Self> {
        let extractor = CaseExtractor::new(&config)?;
        let comparator = Comparator::new(config.evaluation.amount_tolerance);
        Ok(Self {
            config,
            extractor,
            comparator,
        })
    }

    pub fn config(&self) -> &IntakeConfig {
        &self.config
    }

    pub fn extractor(&self) -> &CaseExtractor {
        &self.extractor
    }

    pub fn verify_baseline(&self) -> Result<()> {
        BaselineGuard::from_config(&self.config.evaluation).verify()?;
        Ok(())
    }

    /// Run every case of a dataset and build the suite report
    pub fn evaluate(&self, suite: &SuiteConfig, dataset: &Dataset) -> EvaluationReport {
        let records: Vec<CaseRecord> = dataset
            .cases
            .par_iter()
            .map(|case| {
                let transcript = Transcript::new(case.transcript_text.as_str());
                let result = self.extractor.extract_transcript(&transcript);
                let outcome = self.comparator.compare(case, &result);
                let buckets = classify(case, &result, &outcome, &self.comparator);
                debug!(case = %case.id, strict = outcome.strict_pass, "Case evaluated");
                CaseRecord {
                    outcome,
                    confidence: result.confidence,
                    buckets,
                }
            })
            .collect();

        EvaluationReport::build(suite, dataset.skipped.len(), records)
    }

    /// Load, evaluate, diff against the reference, write the artifacts
    fn run_suite(&self, suite: &SuiteConfig) -> Result<EvaluationReport> {
        let evaluation = &self.config.evaluation;
        let dataset_name = suite.dataset_name();
        let dataset = load_dataset(
            dataset_name,
            &evaluation.dataset_path(dataset_name),
            evaluation.load_mode,
        )?;
        info!(suite = %suite.name, cases = dataset.len(), "Running suite");

        let mut report = self.evaluate(suite, &dataset);

        let reference = EvaluationReport::reference_path(&evaluation.reports_dir, &suite.name);
        if reference.exists() {
            match EvaluationReport::import_json(&reference) {
                Ok(previous) => report.find_regressions(&previous),
                Err(e) => warn!(suite = %suite.name, error = %e, "Reference report unreadable, skipping regression check"),
            }
        }
        report.export_json(EvaluationReport::artifact_path(&evaluation.reports_dir, &suite.name))?;
        if report.is_clean() {
            report.export_json(&reference)?;
            debug!(suite = %suite.name, "Reference report updated");
        }

        info!(
            suite = %suite.name,
            strict = report.strict_pass_rate,
            acceptable = report.acceptable_pass_rate,
            regressions = report.regressions.len(),
            passed = report.passed,
            "Suite finished"
        );
        Ok(report)
    }

    /// Run a single dataset
    ///
    /// Uses the suite configured for that dataset name, or a required suite
    /// with default thresholds when none is configured.
    pub fn run_dataset(&self, name: &str) -> Result<EvaluationReport> {
        self.verify_baseline()?;
        let suite = self
            .config
            .evaluation
            .suites
            .iter()
            .find(|s| s.name == name || s.dataset_name() == name)
            .cloned()
            .unwrap_or_else(|| ad_hoc_suite(name));
        self.run_suite(&suite)
    }

    /// Ordered suites up to `max_suite`
    fn planned_suites(&self, max_suite: Option<&str>) -> Result<Vec<SuiteConfig>> {
        let mut suites = self.config.evaluation.suites.clone();
        suites.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.name.cmp(&b.name)));

        if let Some(max) = max_suite {
            let last = suites
                .iter()
                .position(|s| s.name == max)
                .ok_or_else(|| EvalError::UnknownDataset(max.to_string()))?;
            suites.truncate(last + 1);
        }
        Ok(suites)
    }

    /// Run suites in order, halting per the suite flags and options
    pub fn run_progressive(&self, options: &RunOptions) -> Result<RunSummary> {
        let suites = self.planned_suites(options.max_suite.as_deref())?;
        self.verify_baseline()?;

        let stop_on_regression = options.stop_on_regression || self.config.evaluation.stop_on_regression;
        let mut summary = RunSummary {
            reports: Vec::new(),
            statuses: Vec::new(),
            halted_at: None,
        };

        for suite in &suites {
            let report = self.run_suite(suite)?;

            let status = if !report.passed && suite.required {
                SuiteStatus::FailedRequired
            } else if !report.passed {
                SuiteStatus::FailedOptional
            } else if report.has_regressions() {
                SuiteStatus::Regressed
            } else {
                SuiteStatus::Passed
            };

            let halt = match status {
                SuiteStatus::Passed => false,
                SuiteStatus::FailedRequired => true,
                SuiteStatus::FailedOptional => {
                    warn!(suite = %suite.name, "Optional suite below thresholds");
                    stop_on_regression
                }
                SuiteStatus::Regressed => {
                    warn!(suite = %suite.name, regressions = report.regressions.len(), "Suite has regressions");
                    stop_on_regression
                }
            };
            // A failing optional suite can also carry regressions
            let halt = halt || (stop_on_regression && report.has_regressions());

            summary.statuses.push((suite.name.clone(), status));
            summary.reports.push(report);

            if halt {
                warn!(suite = %suite.name, status = ?status, "Halting progressive run");
                summary.halted_at = Some(suite.name.clone());
                break;
            }
        }

        Ok(summary)
    }
}

fn ad_hoc_suite(name: &str) -> SuiteConfig {
    let defaults = IntakeConfig::default();
    let template = defaults.evaluation.suites.first();
    SuiteConfig {
        name: name.to_string(),
        dataset: None,
        order: 0,
        min_strict_pass: template.map(|s| s.min_strict_pass).unwrap_or(0.9),
        min_acceptable_pass: template.map(|s| s.min_acceptable_pass).unwrap_or(0.95),
        required: true,
    }
}
