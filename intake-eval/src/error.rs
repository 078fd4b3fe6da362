//! Evaluation harness errors

use intake_extract::corrections::RegistryError;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, EvalError>;

#[derive(Debug, Error)]
pub enum EvalError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Dataset line that failed to parse or validate (1-based)
    #[error("line {line}: {reason}")]
    MalformedLine { line: usize, reason: String },

    #[error(
        "baseline sidecar {0} not found; review the dataset and run \
         `intake-eval approve-baseline --reason <text>` to create it"
    )]
    MissingBaseline(PathBuf),

    /// Protected dataset no longer matches its approved checksum
    #[error(
        "baseline dataset '{dataset}' changed: approved {expected_hash} ({expected_count} cases), \
         found {actual_hash} ({actual_count} cases); review the change and run \
         `intake-eval approve-baseline --reason <text>`"
    )]
    BaselineMismatch {
        dataset: String,
        expected_hash: String,
        expected_count: usize,
        actual_hash: String,
        actual_count: usize,
    },

    #[error("malformed baseline sidecar {path}: {reason}")]
    MalformedSidecar { path: PathBuf, reason: String },

    #[error("unknown dataset or suite: {0}")]
    UnknownDataset(String),

    #[error("report error: {0}")]
    Report(String),

    #[error("correction rules: {0}")]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Common(#[from] intake_common::Error),
}

impl EvalError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        EvalError::Io {
            path: path.into(),
            source,
        }
    }
}
