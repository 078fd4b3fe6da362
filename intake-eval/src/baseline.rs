//! Baseline integrity guard
//!
//! The protected dataset is pinned by a sidecar file holding its sha256,
//! case count and approval time on a single line:
//!
//! ```text
//! 3f1c...e9 24 2026-10-16T09:12:44Z
//! ```
//!
//! Any change to the dataset (one byte is enough) fails verification until
//! it is re-approved with a reason, which appends to an approvals log next
//! to the sidecar.

use crate::error::{EvalError, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use intake_common::config::EvaluationConfig;
use sha2::{Digest, Sha256};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Approvals log file name (sidecar directory)
pub const APPROVALS_LOG: &str = "baseline_approvals.log";

/// Hex sha256 of raw dataset bytes
pub fn content_checksum(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Number of non-blank lines
pub fn count_cases(bytes: &[u8]) -> usize {
    String::from_utf8_lossy(bytes)
        .lines()
        .filter(|l| !l.trim().is_empty())
        .count()
}

/// Approved checksum of the protected dataset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaselineChecksum {
    pub hash: String,
    pub case_count: usize,
    pub timestamp: DateTime<Utc>,
}

impl BaselineChecksum {
    /// Checksum of dataset bytes, stamped now
    pub fn compute(bytes: &[u8]) -> Self {
        Self {
            hash: content_checksum(bytes),
            case_count: count_cases(bytes),
            timestamp: Utc::now(),
        }
    }

    /// Parse a sidecar line
    pub fn parse(line: &str) -> std::result::Result<Self, String> {
        let parts: Vec<&str> = line.split_whitespace().collect();
        let [hash, count, timestamp] = parts.as_slice() else {
            return Err(format!("expected 3 fields, found {}", parts.len()));
        };

        if hash.len() != 64 || !hash.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(format!("invalid sha256 '{}'", hash));
        }
        let case_count = count
            .parse::<usize>()
            .map_err(|e| format!("invalid case count '{}': {}", count, e))?;
        let timestamp = DateTime::parse_from_rfc3339(timestamp)
            .map_err(|e| format!("invalid timestamp '{}': {}", timestamp, e))?
            .with_timezone(&Utc);

        Ok(Self {
            hash: hash.to_ascii_lowercase(),
            case_count,
            timestamp,
        })
    }

    /// Sidecar line (no trailing newline)
    pub fn to_line(&self) -> String {
        format!(
            "{} {} {}",
            self.hash,
            self.case_count,
            self.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true)
        )
    }
}

/// Verifies and re-approves the protected dataset
#[derive(Debug, Clone)]
pub struct BaselineGuard {
    dataset: String,
    dataset_path: PathBuf,
    sidecar_path: PathBuf,
}

impl BaselineGuard {
    pub fn new(
        dataset: impl Into<String>,
        dataset_path: impl Into<PathBuf>,
        sidecar_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            dataset: dataset.into(),
            dataset_path: dataset_path.into(),
            sidecar_path: sidecar_path.into(),
        }
    }

    pub fn from_config(config: &EvaluationConfig) -> Self {
        Self::new(
            config.baseline.dataset.clone(),
            config.dataset_path(&config.baseline.dataset),
            config.baseline_sidecar_path(),
        )
    }

    pub fn dataset(&self) -> &str {
        &self.dataset
    }

    pub fn sidecar_path(&self) -> &Path {
        &self.sidecar_path
    }

    /// Approvals log path (same directory as the sidecar)
    pub fn approvals_log_path(&self) -> PathBuf {
        self.sidecar_path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(APPROVALS_LOG)
    }

    fn read_dataset(&self) -> Result<Vec<u8>> {
        if !self.dataset_path.exists() {
            return Err(EvalError::UnknownDataset(format!(
                "{} ({} not found)",
                self.dataset,
                self.dataset_path.display()
            )));
        }
        fs::read(&self.dataset_path).map_err(|e| EvalError::io(&self.dataset_path, e))
    }

    /// Currently approved checksum, if a sidecar exists
    pub fn approved(&self) -> Result<Option<BaselineChecksum>> {
        if !self.sidecar_path.exists() {
            return Ok(None);
        }
        let content =
            fs::read_to_string(&self.sidecar_path).map_err(|e| EvalError::io(&self.sidecar_path, e))?;
        let line = content.lines().find(|l| !l.trim().is_empty()).unwrap_or("");
        BaselineChecksum::parse(line)
            .map(Some)
            .map_err(|reason| EvalError::MalformedSidecar {
                path: self.sidecar_path.clone(),
                reason,
            })
    }

    /// Recompute the dataset checksum and compare it to the sidecar
    ///
    /// # Errors
    /// `MissingBaseline` without a sidecar, `BaselineMismatch` when hash or
    /// case count differ.
    pub fn verify(&self) -> Result<BaselineChecksum> {
        let approved = self
            .approved()?
            .ok_or_else(|| EvalError::MissingBaseline(self.sidecar_path.clone()))?;
        let bytes = self.read_dataset()?;
        let actual_hash = content_checksum(&bytes);
        let actual_count = count_cases(&bytes);

        if actual_hash != approved.hash || actual_count != approved.case_count {
            return Err(EvalError::BaselineMismatch {
                dataset: self.dataset.clone(),
                expected_hash: approved.hash,
                expected_count: approved.case_count,
                actual_hash,
                actual_count,
            });
        }

        debug!(
            dataset = %self.dataset,
            hash = %approved.hash,
            cases = approved.case_count,
            "Baseline verified"
        );
        Ok(approved)
    }

    /// Pin the current dataset content
    ///
    /// Writes the sidecar through a temp file + rename and appends
    /// `<timestamp> <dataset> <old-hash|-> <new-hash> <cases> <reason>` to the
    /// approvals log.
    pub fn approve(&self, reason: &str) -> Result<BaselineChecksum> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(intake_common::Error::InvalidInput(
                "baseline approval requires a non-empty reason".to_string(),
            )
            .into());
        }

        let previous = match self.approved() {
            Ok(previous) => previous,
            // A corrupt sidecar is replaced, not preserved
            Err(EvalError::MalformedSidecar { .. }) => None,
            Err(e) => return Err(e),
        };
        let bytes = self.read_dataset()?;
        let checksum = BaselineChecksum::compute(&bytes);

        if let Some(dir) = self.sidecar_path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir).map_err(|e| EvalError::io(dir, e))?;
            }
        }
        let tmp = self.sidecar_path.with_extension("sha256.tmp");
        fs::write(&tmp, format!("{}\n", checksum.to_line())).map_err(|e| EvalError::io(&tmp, e))?;
        fs::rename(&tmp, &self.sidecar_path).map_err(|e| EvalError::io(&self.sidecar_path, e))?;

        let old_hash = previous
            .as_ref()
            .map(|p| p.hash.clone())
            .unwrap_or_else(|| "-".to_string());
        let log_path = self.approvals_log_path();
        let mut log = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .map_err(|e| EvalError::io(&log_path, e))?;
        writeln!(
            log,
            "{} {} {} {} {} {}",
            checksum.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
            self.dataset,
            old_hash,
            checksum.hash,
            checksum.case_count,
            reason.replace('\n', " ")
        )
        .map_err(|e| EvalError::io(&log_path, e))?;

        warn!(
            dataset = %self.dataset,
            old_hash = %old_hash,
            new_hash = %checksum.hash,
            cases = checksum.case_count,
            reason = %reason,
            "Baseline approved"
        );
        Ok(checksum)
    }
}
