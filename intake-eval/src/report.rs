//! Suite reports
//!
//! A report is rebuilt on every run and written as pretty JSON to
//! `<reports_dir>/<suite>.json`. Regressions are measured against
//! `<reports_dir>/<suite>.reference.json`, which only a clean run (thresholds
//! met, no regressions) replaces, so a regression keeps failing until it is
//! fixed. Reports carry case ids, per-field status and confidence only.

use crate::buckets::{aggregate, BucketSummary, FailureBucket};
use crate::comparator::{CaseOutcome, FieldStatus};
use crate::error::{EvalError, Result};
use chrono::{DateTime, Utc};
use intake_common::config::SuiteConfig;
use intake_extract::{Field, FieldConfidence};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Per-case entry of a report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseRecord {
    #[serde(flatten)]
    pub outcome: CaseOutcome,
    pub confidence: FieldConfidence,
    #[serde(default)]
    pub buckets: Vec<FailureBucket>,
}

/// Thresholds a suite was judged against
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Thresholds {
    pub min_strict_pass: f64,
    pub min_acceptable_pass: f64,
    pub required: bool,
}

impl From<&SuiteConfig> for Thresholds {
    fn from(suite: &SuiteConfig) -> Self {
        Self {
            min_strict_pass: suite.min_strict_pass,
            min_acceptable_pass: suite.min_acceptable_pass,
            required: suite.required,
        }
    }
}

/// Aggregated result of one suite
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationReport {
    pub suite: String,
    pub dataset: String,
    pub generated_at: DateTime<Utc>,
    pub case_count: usize,
    /// Dataset lines skipped in bulk mode
    #[serde(default)]
    pub skipped_lines: usize,
    pub strict_pass_rate: f64,
    pub acceptable_pass_rate: f64,
    /// Strict pass rate per field, over the cases that check the field
    pub per_field_pass_rate: BTreeMap<String, f64>,
    pub failure_buckets: BTreeMap<String, BucketSummary>,
    /// Cases that strictly passed in the previous report and fail now
    #[serde(default)]
    pub regressions: Vec<String>,
    pub thresholds: Thresholds,
    pub passed: bool,
    pub cases: Vec<CaseRecord>,
}

fn rate(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64
    }
}

impl EvaluationReport {
    /// Aggregate case records (sorted by id here)
    pub fn build(
        suite: &SuiteConfig,
        skipped_lines: usize,
        mut cases: Vec<CaseRecord>,
    ) -> Self {
        cases.sort_by(|a, b| a.outcome.id.cmp(&b.outcome.id));
        let total = cases.len();

        let strict = cases.iter().filter(|c| c.outcome.strict_pass).count();
        let acceptable = cases.iter().filter(|c| c.outcome.acceptable_pass).count();

        let per_field_pass_rate = Field::ALL
            .iter()
            .filter_map(|field| {
                let statuses: Vec<FieldStatus> =
                    cases.iter().filter_map(|c| c.outcome.status(*field)).collect();
                if statuses.is_empty() {
                    return None;
                }
                let matched = statuses.iter().filter(|s| **s == FieldStatus::Match).count();
                Some((field.as_str().to_string(), rate(matched, statuses.len())))
            })
            .collect();

        let failure_buckets = aggregate(
            cases
                .iter()
                .map(|c| (c.outcome.id.as_str(), c.buckets.as_slice())),
        );

        let thresholds = Thresholds::from(suite);
        let mut report = Self {
            suite: suite.name.clone(),
            dataset: suite.dataset_name().to_string(),
            generated_at: Utc::now(),
            case_count: total,
            skipped_lines,
            strict_pass_rate: rate(strict, total),
            acceptable_pass_rate: rate(acceptable, total),
            per_field_pass_rate,
            failure_buckets,
            regressions: Vec::new(),
            thresholds,
            passed: false,
            cases,
        };
        report.passed = report.meets_thresholds();
        report
    }

    pub fn meets_thresholds(&self) -> bool {
        self.strict_pass_rate >= self.thresholds.min_strict_pass
            && self.acceptable_pass_rate >= self.thresholds.min_acceptable_pass
    }

    /// Record cases that strictly passed in `previous` and fail now
    pub fn find_regressions(&mut self, previous: &EvaluationReport) {
        let passed_before: HashSet<&str> = previous
            .cases
            .iter()
            .filter(|c| c.outcome.strict_pass)
            .map(|c| c.outcome.id.as_str())
            .collect();

        self.regressions = self
            .cases
            .iter()
            .filter(|c| !c.outcome.strict_pass && passed_before.contains(c.outcome.id.as_str()))
            .map(|c| c.outcome.id.clone())
            .collect();
    }

    pub fn has_regressions(&self) -> bool {
        !self.regressions.is_empty()
    }

    /// Thresholds met with nothing regressed
    pub fn is_clean(&self) -> bool {
        self.passed && !self.has_regressions()
    }

    /// Artifact location for a suite
    pub fn artifact_path(reports_dir: &Path, suite: &str) -> PathBuf {
        reports_dir.join(format!("{}.json", suite))
    }

    /// Last clean report of a suite, the regression reference
    pub fn reference_path(reports_dir: &Path, suite: &str) -> PathBuf {
        reports_dir.join(format!("{}.reference.json", suite))
    }

    /// Export report to JSON file
    pub fn export_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir).map_err(|e| EvalError::io(dir, e))?;
            }
        }
        let json = serde_json::to_string_pretty(self).map_err(|e| EvalError::Report(e.to_string()))?;
        let mut file = File::create(path).map_err(|e| EvalError::io(path, e))?;
        file.write_all(json.as_bytes()).map_err(|e| EvalError::io(path, e))?;
        Ok(())
    }

    /// Import report from JSON file
    pub fn import_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| EvalError::io(path, e))?;
        serde_json::from_reader(file)
            .map_err(|e| EvalError::Report(format!("{}: {}", path.display(), e)))
    }
}

/// Console formatting for reports
pub struct ReportFormatter;

impl ReportFormatter {
    /// One-line suite verdict
    ///
    /// Example: `[✓] core: strict 95.0% (min 90.0%), acceptable 100.0% (min 95.0%), 20 cases`
    pub fn format_suite_line(report: &EvaluationReport) -> String {
        let symbol = if report.passed {
            "✓"
        } else if report.thresholds.required {
            "✗"
        } else {
            "⚠"
        };
        format!(
            "[{}] {}: strict {:.1}% (min {:.1}%), acceptable {:.1}% (min {:.1}%), {} cases",
            symbol,
            report.suite,
            report.strict_pass_rate * 100.0,
            report.thresholds.min_strict_pass * 100.0,
            report.acceptable_pass_rate * 100.0,
            report.thresholds.min_acceptable_pass * 100.0,
            report.case_count
        )
    }

    /// Per-field pass rates
    pub fn format_field_rates(report: &EvaluationReport) -> String {
        let mut output = String::new();
        output.push_str("  Field pass rates:\n");
        for (field, rate) in &report.per_field_pass_rate {
            output.push_str(&format!("    {:<13} {:5.1}%\n", field, rate * 100.0));
        }
        output
    }

    /// Non-empty failure buckets table
    pub fn format_buckets(report: &EvaluationReport) -> String {
        let mut rows: Vec<(&String, &BucketSummary)> = report
            .failure_buckets
            .iter()
            .filter(|(_, s)| s.count > 0)
            .collect();
        if rows.is_empty() {
            return "  No failures\n".to_string();
        }
        rows.sort_by(|a, b| b.1.count.cmp(&a.1.count).then_with(|| a.0.cmp(b.0)));

        let mut output = String::new();
        output.push_str("  Failure buckets:\n");
        for (bucket, summary) in rows {
            output.push_str(&format!(
                "    {:<27} {:3}  {}\n",
                bucket,
                summary.count,
                summary.examples.join(", ")
            ));
        }
        output
    }

    pub fn format_regressions(report: &EvaluationReport) -> String {
        if report.regressions.is_empty() {
            return String::new();
        }
        format!(
            "  Regressions ({}): {}\n",
            report.regressions.len(),
            report.regressions.join(", ")
        )
    }

    /// Full console block for one suite
    pub fn format_report(report: &EvaluationReport) -> String {
        let mut output = String::new();
        output.push_str(&Self::format_suite_line(report));
        output.push('\n');
        if report.skipped_lines > 0 {
            output.push_str(&format!("  Skipped dataset lines: {}\n", report.skipped_lines));
        }
        output.push_str(&Self::format_field_rates(report));
        output.push_str(&Self::format_buckets(report));
        output.push_str(&Self::format_regressions(report));
        output
    }
}
