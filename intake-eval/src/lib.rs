//! intake-eval: regression-guarded evaluation harness
//!
//! # Flow
//! 1. Verify the protected baseline dataset against its checksum sidecar
//! 2. Load each suite's golden cases (JSON lines)
//! 3. Run the full extraction pipeline per case, in parallel
//! 4. Compare against expected fields, bucket the failures
//! 5. Build a report, diff it against the previous artifact, write it out
//!
//! The progressive runner walks the configured suites from smallest to
//! hardest and stops at the first required suite below its thresholds.

pub mod baseline;
pub mod buckets;
pub mod comparator;
pub mod dataset;
pub mod error;
pub mod report;
pub mod runner;

pub use baseline::{BaselineChecksum, BaselineGuard};
pub use buckets::FailureBucket;
pub use comparator::{CaseOutcome, Comparator, FieldStatus};
pub use dataset::{Dataset, ExpectedFields, GoldenCase};
pub use error::{EvalError, Result};
pub use report::{EvaluationReport, ReportFormatter};
pub use runner::{RunOptions, RunSummary, SuiteRunner, SuiteStatus};
