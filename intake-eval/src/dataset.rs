//! Golden dataset loading
//!
//! One JSON object per line:
//!
//! ```text
//! {"id": "core-001", "transcriptText": "...", "expected": {"name": "Sarah Johnson", "goalAmount": 2500}}
//! ```
//!
//! Keys of `expected` are optional. An absent key is not checked; an
//! explicit `null` expects no value.

use crate::error::{EvalError, Result};
use intake_common::config::LoadMode;
use intake_extract::{NeedCategory, Relationship, UrgencyLevel};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, warn};

/// Labeled transcript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoldenCase {
    pub id: String,
    pub transcript_text: String,
    #[serde(default)]
    pub expected: ExpectedFields,
}

/// Expected values; outer `None` = not checked, `Some(None)` = expect null
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ExpectedFields {
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub name: Option<Option<String>>,

    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub category: Option<Option<NeedCategory>>,

    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub urgency_level: Option<Option<UrgencyLevel>>,

    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub goal_amount: Option<Option<f64>>,

    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub beneficiary_relationship: Option<Option<Relationship>>,
}

/// A key that is present (even as `null`) becomes `Some`
fn present<'de, T, D>(deserializer: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Line skipped in bulk mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedLine {
    pub line: usize,
    pub reason: String,
}

/// Loaded dataset
#[derive(Debug, Clone)]
pub struct Dataset {
    pub name: String,
    pub cases: Vec<GoldenCase>,
    pub skipped: Vec<SkippedLine>,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }
}

/// Read a dataset file
///
/// # Errors
/// `UnknownDataset` when the file does not exist, `Io` when it cannot be
/// read, `MalformedLine` for the first bad line in strict mode.
pub fn load_dataset(name: &str, path: &Path, mode: LoadMode) -> Result<Dataset> {
    if !path.exists() {
        return Err(EvalError::UnknownDataset(format!(
            "{} ({} not found)",
            name,
            path.display()
        )));
    }
    let content = std::fs::read_to_string(path).map_err(|e| EvalError::io(path, e))?;
    parse_dataset(name, &content, mode)
}

/// Parse dataset text
pub fn parse_dataset(name: &str, content: &str, mode: LoadMode) -> Result<Dataset> {
    let mut cases = Vec::new();
    let mut skipped = Vec::new();
    let mut seen = HashSet::new();

    for (index, raw) in content.lines().enumerate() {
        let line = index + 1;
        if raw.trim().is_empty() {
            continue;
        }

        match parse_line(raw, &seen) {
            Ok(case) => {
                seen.insert(case.id.clone());
                cases.push(case);
            }
            Err(reason) => match mode {
                LoadMode::Strict => return Err(EvalError::MalformedLine { line, reason }),
                LoadMode::Bulk => {
                    warn!(dataset = name, line, reason = %reason, "Skipping malformed dataset line");
                    skipped.push(SkippedLine { line, reason });
                }
            },
        }
    }

    debug!(
        dataset = name,
        cases = cases.len(),
        skipped = skipped.len(),
        "Dataset loaded"
    );
    Ok(Dataset {
        name: name.to_string(),
        cases,
        skipped,
    })
}

fn parse_line(raw: &str, seen: &HashSet<String>) -> std::result::Result<GoldenCase, String> {
    let case: GoldenCase = serde_json::from_str(raw).map_err(|e| e.to_string())?;
    if case.id.trim().is_empty() {
        return Err("empty id".to_string());
    }
    if seen.contains(&case.id) {
        return Err(format!("duplicate id '{}'", case.id));
    }
    Ok(case)
}
