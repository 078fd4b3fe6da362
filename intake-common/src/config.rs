//! Configuration loading and resolution
//!
//! # Resolution priority
//!
//! 1. Command-line argument (`--config`)
//! 2. Environment variable (`INTAKE_CONFIG`)
//! 3. `./intake.toml` in the working directory
//! 4. Platform config directory (`<config_dir>/intake/config.toml`)
//! 5. Built-in defaults (code constants)
//!
//! An explicitly requested file (tiers 1-2) must exist. A missing discovered
//! file (tiers 3-4) is not an error: the built-in defaults are used and a
//! warning is logged. Configuration is resolved once at startup.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit configuration file
pub const CONFIG_ENV_VAR: &str = "INTAKE_CONFIG";

/// File name looked up in the working directory
pub const LOCAL_CONFIG_FILE: &str = "intake.toml";

/// Top-level configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IntakeConfig {
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Extraction bounds
    #[serde(default)]
    pub extraction: ExtractionConfig,

    /// Correction rule toggles
    #[serde(default)]
    pub rules: RulesConfig,

    /// Evaluation harness settings
    #[serde(default)]
    pub evaluation: EvaluationConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Extraction settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Smallest amount accepted as a request (inclusive)
    #[serde(default = "default_amount_min")]
    pub amount_min: f64,

    /// Largest amount accepted as a request (inclusive)
    #[serde(default = "default_amount_max")]
    pub amount_max: f64,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            amount_min: default_amount_min(),
            amount_max: default_amount_max(),
        }
    }
}

/// Correction rule toggles
///
/// Every built-in rule is active unless its id is listed in `disabled`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RulesConfig {
    /// Rule ids to switch off
    #[serde(default)]
    pub disabled: Vec<String>,
}

/// How the dataset loader treats malformed lines
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadMode {
    /// Skip the line and warn
    #[default]
    Bulk,
    /// Fail the whole load
    Strict,
}

/// Evaluation harness settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationConfig {
    /// Directory holding `<dataset>.jsonl` files
    #[serde(default = "default_datasets_dir")]
    pub datasets_dir: PathBuf,

    /// Directory receiving JSON report artifacts
    #[serde(default = "default_reports_dir")]
    pub reports_dir: PathBuf,

    /// Relative tolerance for amount comparison (0.05 = 5%)
    #[serde(default = "default_amount_tolerance")]
    pub amount_tolerance: f64,

    /// Malformed-line handling
    #[serde(default)]
    pub load_mode: LoadMode,

    /// Halt on optional suite failures and on regressions
    #[serde(default)]
    pub stop_on_regression: bool,

    /// Protected baseline dataset
    #[serde(default)]
    pub baseline: BaselineConfig,

    /// Suites run by `run-progressive`
    #[serde(default = "default_suites")]
    pub suites: Vec<SuiteConfig>,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            datasets_dir: default_datasets_dir(),
            reports_dir: default_reports_dir(),
            amount_tolerance: default_amount_tolerance(),
            load_mode: LoadMode::default(),
            stop_on_regression: false,
            baseline: BaselineConfig::default(),
            suites: default_suites(),
        }
    }
}

impl EvaluationConfig {
    /// Path of a named dataset inside `datasets_dir`
    pub fn dataset_path(&self, dataset: &str) -> PathBuf {
        self.datasets_dir.join(format!("{}.jsonl", dataset))
    }

    /// Path of the baseline checksum sidecar
    ///
    /// Defaults to `<datasets_dir>/<dataset>.jsonl.sha256`.
    pub fn baseline_sidecar_path(&self) -> PathBuf {
        match &self.baseline.sidecar {
            Some(path) => path.clone(),
            None => self
                .datasets_dir
                .join(format!("{}.jsonl.sha256", self.baseline.dataset)),
        }
    }

    /// Look up a suite by name
    pub fn suite(&self, name: &str) -> Option<&SuiteConfig> {
        self.suites.iter().find(|s| s.name == name)
    }
}

/// Protected baseline dataset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaselineConfig {
    /// Dataset name guarded by the checksum sidecar
    #[serde(default = "default_baseline_dataset")]
    pub dataset: String,

    /// Sidecar path override
    #[serde(default)]
    pub sidecar: Option<PathBuf>,
}

impl Default for BaselineConfig {
    fn default() -> Self {
        Self {
            dataset: default_baseline_dataset(),
            sidecar: None,
        }
    }
}

/// One suite of the progressive runner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuiteConfig {
    /// Suite name (also the report file stem)
    pub name: String,

    /// Dataset name; defaults to the suite name
    #[serde(default)]
    pub dataset: Option<String>,

    /// Position in the run (ascending = smaller/easier first)
    #[serde(default)]
    pub order: u32,

    /// Minimum fraction of strictly passing cases
    #[serde(default = "default_min_strict_pass")]
    pub min_strict_pass: f64,

    /// Minimum fraction of acceptably passing cases
    #[serde(default = "default_min_acceptable_pass")]
    pub min_acceptable_pass: f64,

    /// A required suite below threshold halts the run
    #[serde(default = "default_required")]
    pub required: bool,
}

impl SuiteConfig {
    /// Dataset name this suite evaluates
    pub fn dataset_name(&self) -> &str {
        self.dataset.as_deref().unwrap_or(&self.name)
    }
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_amount_min() -> f64 {
    1.0
}

fn default_amount_max() -> f64 {
    100_000.0
}

fn default_datasets_dir() -> PathBuf {
    PathBuf::from("datasets")
}

fn default_reports_dir() -> PathBuf {
    PathBuf::from("reports")
}

fn default_amount_tolerance() -> f64 {
    0.05
}

fn default_baseline_dataset() -> String {
    "core".to_string()
}

fn default_min_strict_pass() -> f64 {
    0.8
}

fn default_min_acceptable_pass() -> f64 {
    0.9
}

fn default_required() -> bool {
    true
}

fn default_suites() -> Vec<SuiteConfig> {
    vec![
        SuiteConfig {
            name: "core".to_string(),
            dataset: None,
            order: 0,
            min_strict_pass: 0.9,
            min_acceptable_pass: 0.95,
            required: true,
        },
        SuiteConfig {
            name: "extended".to_string(),
            dataset: None,
            order: 1,
            min_strict_pass: 0.75,
            min_acceptable_pass: 0.85,
            required: true,
        },
        SuiteConfig {
            name: "hard".to_string(),
            dataset: None,
            order: 2,
            min_strict_pass: 0.5,
            min_acceptable_pass: 0.65,
            required: false,
        },
    ]
}

impl IntakeConfig {
    /// Parse configuration from TOML text and validate it
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: IntakeConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn load_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    /// Check value ranges and cross-field consistency
    pub fn validate(&self) -> Result<()> {
        let extraction = &self.extraction;
        if !(extraction.amount_min > 0.0 && extraction.amount_min < extraction.amount_max) {
            return Err(Error::Config(format!(
                "amount bounds must satisfy 0 < amount_min < amount_max (got {} and {})",
                extraction.amount_min, extraction.amount_max
            )));
        }

        let evaluation = &self.evaluation;
        if !(0.0..1.0).contains(&evaluation.amount_tolerance) {
            return Err(Error::Config(format!(
                "amount_tolerance must be in [0, 1) (got {})",
                evaluation.amount_tolerance
            )));
        }

        let mut names = HashSet::new();
        for suite in &evaluation.suites {
            if !names.insert(suite.name.as_str()) {
                return Err(Error::Config(format!("duplicate suite name '{}'", suite.name)));
            }
            for (label, value) in [
                ("min_strict_pass", suite.min_strict_pass),
                ("min_acceptable_pass", suite.min_acceptable_pass),
            ] {
                if !(0.0..=1.0).contains(&value) {
                    return Err(Error::Config(format!(
                        "suite '{}': {} must be in [0, 1] (got {})",
                        suite.name, label, value
                    )));
                }
            }
        }

        Ok(())
    }
}

/// Where the active configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// `--config` argument
    CommandLine(PathBuf),
    /// `INTAKE_CONFIG` environment variable
    Environment(PathBuf),
    /// Discovered file (working directory or platform config dir)
    Discovered(PathBuf),
    /// No file; built-in defaults
    Defaults,
}

impl ConfigSource {
    /// File the configuration was read from
    pub fn path(&self) -> Option<&Path> {
        match self {
            ConfigSource::CommandLine(path)
            | ConfigSource::Environment(path)
            | ConfigSource::Discovered(path) => Some(path),
            ConfigSource::Defaults => None,
        }
    }

    /// Log where the configuration came from
    ///
    /// Call after the tracing subscriber is installed.
    pub fn log(&self) {
        match self.path() {
            Some(path) => info!("Loaded configuration from {}", path.display()),
            None => warn!("No configuration file found, using built-in defaults"),
        }
    }
}

/// Configuration file resolver following the priority order above
pub struct ConfigResolver {
    cli_path: Option<PathBuf>,
}

impl ConfigResolver {
    /// Create a resolver with an optional `--config` argument
    pub fn new(cli_path: Option<PathBuf>) -> Self {
        Self { cli_path }
    }

    /// Determine which configuration source applies
    pub fn resolve(&self) -> ConfigSource {
        // Priority 1: Command-line argument
        if let Some(path) = &self.cli_path {
            return ConfigSource::CommandLine(path.clone());
        }

        // Priority 2: Environment variable
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            if !path.trim().is_empty() {
                return ConfigSource::Environment(PathBuf::from(path));
            }
        }

        // Priority 3: Working directory
        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            return ConfigSource::Discovered(local);
        }

        // Priority 4: Platform config directory
        if let Some(path) = dirs::config_dir().map(|d| d.join("intake").join("config.toml")) {
            if path.exists() {
                return ConfigSource::Discovered(path);
            }
        }

        // Priority 5: Built-in defaults
        ConfigSource::Defaults
    }

    /// Resolve and load the configuration
    ///
    /// Logs nothing; the caller reports the source with
    /// [`ConfigSource::log`] once logging is initialized.
    pub fn load(&self) -> Result<(IntakeConfig, ConfigSource)> {
        let source = self.resolve();
        let config = match &source {
            ConfigSource::CommandLine(path) | ConfigSource::Environment(path) => {
                if !path.exists() {
                    return Err(Error::Config(format!(
                        "Config file not found: {}",
                        path.display()
                    )));
                }
                IntakeConfig::load_file(path)?
            }
            ConfigSource::Discovered(path) => IntakeConfig::load_file(path)?,
            ConfigSource::Defaults => IntakeConfig::default(),
        };
        Ok((config, source))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = IntakeConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.evaluation.amount_tolerance, 0.05);
        assert_eq!(config.evaluation.load_mode, LoadMode::Bulk);
        assert_eq!(config.evaluation.baseline.dataset, "core");
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = IntakeConfig::from_toml_str("").unwrap();
        assert_eq!(config.extraction.amount_max, 100_000.0);
        assert_eq!(config.evaluation.suites.len(), 3);
        assert!(config.rules.disabled.is_empty());
    }

    #[test]
    fn test_partial_toml_keeps_other_defaults() {
        let config = IntakeConfig::from_toml_str(
            r#"
            [rules]
            disabled = ["urgency.hedge_cap"]

            [evaluation]
            load_mode = "strict"
            amount_tolerance = 0.1
            "#,
        )
        .unwrap();

        assert_eq!(config.rules.disabled, vec!["urgency.hedge_cap".to_string()]);
        assert_eq!(config.evaluation.load_mode, LoadMode::Strict);
        assert_eq!(config.evaluation.amount_tolerance, 0.1);
        assert_eq!(config.evaluation.datasets_dir, PathBuf::from("datasets"));
    }

    #[test]
    fn test_invalid_tolerance_rejected() {
        let err = IntakeConfig::from_toml_str("[evaluation]\namount_tolerance = 1.5\n").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_inverted_amount_bounds_rejected() {
        let result = IntakeConfig::from_toml_str(
            "[extraction]\namount_min = 500.0\namount_max = 10.0\n",
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_duplicate_suite_names_rejected() {
        let result = IntakeConfig::from_toml_str(
            r#"
            [[evaluation.suites]]
            name = "core"

            [[evaluation.suites]]
            name = "core"
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_suite_dataset_defaults_to_name() {
        let config = IntakeConfig::from_toml_str(
            r#"
            [[evaluation.suites]]
            name = "smoke"
            required = false

            [[evaluation.suites]]
            name = "nightly"
            dataset = "extended"
            order = 3
            "#,
        )
        .unwrap();

        let smoke = config.evaluation.suite("smoke").unwrap();
        assert_eq!(smoke.dataset_name(), "smoke");
        assert!(!smoke.required);
        assert_eq!(smoke.min_strict_pass, 0.8);

        let nightly = config.evaluation.suite("nightly").unwrap();
        assert_eq!(nightly.dataset_name(), "extended");
        assert_eq!(nightly.order, 3);
        assert!(nightly.required);
    }

    #[test]
    fn test_sidecar_path_derivation() {
        let mut evaluation = EvaluationConfig::default();
        assert_eq!(
            evaluation.baseline_sidecar_path(),
            PathBuf::from("datasets/core.jsonl.sha256")
        );
        assert_eq!(evaluation.dataset_path("hard"), PathBuf::from("datasets/hard.jsonl"));

        evaluation.baseline.sidecar = Some(PathBuf::from("/tmp/core.sum"));
        assert_eq!(evaluation.baseline_sidecar_path(), PathBuf::from("/tmp/core.sum"));
    }
}
