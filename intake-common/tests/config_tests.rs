//! Integration tests for configuration resolution
//!
//! Covers the resolution priority (CLI → ENV → discovered → defaults) and
//! graceful degradation when no file exists.
//!
//! Note: Uses serial_test crate to prevent ENV variable race conditions.
//! Tests that manipulate INTAKE_CONFIG are marked with #[serial].

use intake_common::config::{ConfigResolver, ConfigSource, LoadMode, CONFIG_ENV_VAR};
use serial_test::serial;
use std::env;
use std::fs;
use tempfile::TempDir;

fn write_config(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

#[test]
#[serial]
fn test_cli_argument_wins_over_environment() {
    let dir = TempDir::new().unwrap();
    let cli = write_config(&dir, "cli.toml", "[logging]\nlevel = \"debug\"\n");
    let envp = write_config(&dir, "env.toml", "[logging]\nlevel = \"warn\"\n");
    env::set_var(CONFIG_ENV_VAR, &envp);

    let resolver = ConfigResolver::new(Some(cli.clone()));
    let (config, source) = resolver.load().unwrap();

    assert_eq!(source, ConfigSource::CommandLine(cli));
    assert_eq!(config.logging.level, "debug");

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_environment_variable_used_without_cli() {
    let dir = TempDir::new().unwrap();
    let envp = write_config(
        &dir,
        "env.toml",
        "[evaluation]\nload_mode = \"strict\"\n",
    );
    env::set_var(CONFIG_ENV_VAR, &envp);

    let (config, source) = ConfigResolver::new(None).load().unwrap();

    assert_eq!(source, ConfigSource::Environment(envp));
    assert_eq!(config.evaluation.load_mode, LoadMode::Strict);

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_explicit_missing_file_is_an_error() {
    env::remove_var(CONFIG_ENV_VAR);
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("nope.toml");

    let result = ConfigResolver::new(Some(missing)).load();
    assert!(result.is_err(), "explicitly requested config must exist");
}

#[test]
#[serial]
fn test_unparseable_file_is_an_error() {
    env::remove_var(CONFIG_ENV_VAR);
    let dir = TempDir::new().unwrap();
    let bad = write_config(&dir, "bad.toml", "[evaluation\nthis is not toml");

    let result = ConfigResolver::new(Some(bad)).load();
    assert!(result.is_err());
}

#[test]
#[serial]
fn test_blank_environment_variable_is_ignored() {
    env::set_var(CONFIG_ENV_VAR, "   ");

    let source = ConfigResolver::new(None).resolve();
    assert!(
        !matches!(source, ConfigSource::Environment(_)),
        "blank INTAKE_CONFIG must not be treated as a path"
    );

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_source_names_the_file_read() {
    env::remove_var(CONFIG_ENV_VAR);
    let dir = TempDir::new().unwrap();
    let cli = write_config(&dir, "cli.toml", "");

    let (_, source) = ConfigResolver::new(Some(cli.clone())).load().unwrap();
    assert_eq!(source.path(), Some(cli.as_path()));
    assert_eq!(ConfigSource::Defaults.path(), None);

    source.log();
    ConfigSource::Defaults.log();
}
