//! Harness tests against temporary dataset directories

use intake_common::config::{IntakeConfig, LoadMode, SuiteConfig};
use intake_eval::baseline::APPROVALS_LOG;
use intake_eval::{BaselineGuard, EvalError, EvaluationReport, RunOptions, SuiteRunner, SuiteStatus};
use serde_json::json;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const SARAH: &str = "My name is Sarah Johnson and I need $2500 for rent due tomorrow";

fn passing_line(id: &str) -> String {
    json!({
        "id": id,
        "transcriptText": SARAH,
        "expected": {"name": "Sarah Johnson", "goalAmount": 2500, "category": "HOUSING"}
    })
    .to_string()
}

fn failing_line(id: &str) -> String {
    json!({
        "id": id,
        "transcriptText": "I need help with groceries this week",
        "expected": {"name": "Nobody Atall"}
    })
    .to_string()
}

fn write_dataset(dir: &Path, name: &str, lines: &[String]) {
    fs::write(dir.join(format!("{}.jsonl", name)), lines.join("\n") + "\n").unwrap();
}

fn suite(name: &str, order: u32, min: f64, required: bool) -> SuiteConfig {
    SuiteConfig {
        name: name.to_string(),
        dataset: None,
        order,
        min_strict_pass: min,
        min_acceptable_pass: min,
        required,
    }
}

fn config(root: &TempDir, suites: Vec<SuiteConfig>) -> IntakeConfig {
    let mut config = IntakeConfig::default();
    config.evaluation.datasets_dir = root.path().join("datasets");
    config.evaluation.reports_dir = root.path().join("reports");
    config.evaluation.suites = suites;
    fs::create_dir_all(&config.evaluation.datasets_dir).unwrap();
    config
}

fn approve(config: &IntakeConfig) {
    BaselineGuard::from_config(&config.evaluation)
        .approve("test fixture")
        .unwrap();
}

#[test]
fn test_one_byte_change_fails_baseline() {
    let root = TempDir::new().unwrap();
    let config = config(&root, vec![suite("core", 0, 0.5, true)]);
    let datasets = &config.evaluation.datasets_dir;
    write_dataset(datasets, "core", &[passing_line("c1"), passing_line("c2")]);
    approve(&config);

    let guard = BaselineGuard::from_config(&config.evaluation);
    assert!(guard.verify().is_ok());

    let path = datasets.join("core.jsonl");
    let mut bytes = fs::read(&path).unwrap();
    let pos = bytes.iter().position(|b| *b == b'2').unwrap();
    bytes[pos] = b'3';
    fs::write(&path, bytes).unwrap();

    let err = guard.verify().unwrap_err();
    assert!(matches!(err, EvalError::BaselineMismatch { expected_count: 2, actual_count: 2, .. }));
    assert!(err.to_string().contains("approve-baseline"));

    // Fails before any case runs or report is written
    let runner = SuiteRunner::new(config.clone()).unwrap();
    assert!(matches!(
        runner.run_progressive(&RunOptions::default()),
        Err(EvalError::BaselineMismatch { .. })
    ));
    assert!(!config.evaluation.reports_dir.exists());
}

#[test]
fn test_missing_sidecar_is_an_error() {
    let root = TempDir::new().unwrap();
    let config = config(&root, vec![suite("core", 0, 0.5, true)]);
    write_dataset(&config.evaluation.datasets_dir, "core", &[passing_line("c1")]);

    let err = SuiteRunner::new(config).unwrap().run_dataset("core").unwrap_err();
    assert!(matches!(err, EvalError::MissingBaseline(_)));
}

#[test]
fn test_approval_is_logged() {
    let root = TempDir::new().unwrap();
    let config = config(&root, vec![suite("core", 0, 0.5, true)]);
    let datasets = config.evaluation.datasets_dir.clone();
    write_dataset(&datasets, "core", &[passing_line("c1")]);
    let guard = BaselineGuard::from_config(&config.evaluation);

    assert!(guard.approve("   ").is_err());
    assert!(!guard.sidecar_path().exists());

    let first = guard.approve("initial set").unwrap();
    write_dataset(&datasets, "core", &[passing_line("c1"), passing_line("c2")]);
    let second = guard.approve("added c2").unwrap();

    assert_eq!(second.case_count, 2);
    assert_eq!(guard.verify().unwrap().hash, second.hash);

    let log = fs::read_to_string(datasets.join(APPROVALS_LOG)).unwrap();
    let lines: Vec<&str> = log.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].contains(" core - ") && lines[0].ends_with("initial set"));
    assert!(lines[1].contains(&format!("{} {} 2 added c2", first.hash, second.hash)));
}

#[test]
fn test_progressive_halts_on_required_failure() {
    let root = TempDir::new().unwrap();
    let config = config(
        &root,
        vec![
            suite("extended", 1, 1.0, true),
            suite("core", 0, 1.0, true),
            suite("hard", 2, 0.0, false),
        ],
    );
    let datasets = &config.evaluation.datasets_dir;
    write_dataset(datasets, "core", &[passing_line("c1"), passing_line("c2")]);
    write_dataset(datasets, "extended", &[passing_line("e1"), failing_line("e2")]);
    write_dataset(datasets, "hard", &[failing_line("h1")]);
    approve(&config);

    let summary = SuiteRunner::new(config.clone())
        .unwrap()
        .run_progressive(&RunOptions::default())
        .unwrap();

    assert_eq!(
        summary.statuses,
        vec![
            ("core".to_string(), SuiteStatus::Passed),
            ("extended".to_string(), SuiteStatus::FailedRequired),
        ]
    );
    assert_eq!(summary.halted_at.as_deref(), Some("extended"));
    assert!(!summary.all_required_met());

    let extended = &summary.reports[1];
    assert_eq!(extended.strict_pass_rate, 0.5);
    assert_eq!(extended.failure_buckets["name_missing"].examples, vec!["e2"]);

    let reports = &config.evaluation.reports_dir;
    assert!(reports.join("core.json").exists());
    assert!(reports.join("extended.json").exists());
    assert!(!reports.join("hard.json").exists());
    assert!(reports.join("core.reference.json").exists());
    assert!(!reports.join("extended.reference.json").exists());
}

#[test]
fn test_optional_failure_halts_only_when_asked() {
    let root = TempDir::new().unwrap();
    let config = config(
        &root,
        vec![
            suite("core", 0, 1.0, true),
            suite("hard", 1, 1.0, false),
            suite("extended", 2, 0.0, true),
        ],
    );
    let datasets = &config.evaluation.datasets_dir;
    write_dataset(datasets, "core", &[passing_line("c1")]);
    write_dataset(datasets, "hard", &[failing_line("h1")]);
    write_dataset(datasets, "extended", &[passing_line("e1")]);
    approve(&config);
    let runner = SuiteRunner::new(config).unwrap();

    let relaxed = runner.run_progressive(&RunOptions::default()).unwrap();
    assert_eq!(relaxed.statuses.len(), 3);
    assert_eq!(relaxed.statuses[1].1, SuiteStatus::FailedOptional);
    assert!(relaxed.all_required_met());

    let strict = runner
        .run_progressive(&RunOptions {
            stop_on_regression: true,
            ..Default::default()
        })
        .unwrap();
    assert_eq!(strict.statuses.len(), 2);
    assert_eq!(strict.halted_at.as_deref(), Some("hard"));
    assert!(!strict.all_required_met());
}

#[test]
fn test_max_suite_limits_run() {
    let root = TempDir::new().unwrap();
    let config = config(&root, vec![suite("core", 0, 0.5, true), suite("extended", 1, 0.5, true)]);
    write_dataset(&config.evaluation.datasets_dir, "core", &[passing_line("c1")]);
    approve(&config);
    let runner = SuiteRunner::new(config).unwrap();

    let summary = runner
        .run_progressive(&RunOptions {
            max_suite: Some("core".to_string()),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(summary.reports.len(), 1);

    let unknown = runner.run_progressive(&RunOptions {
        max_suite: Some("nope".to_string()),
        ..Default::default()
    });
    assert!(matches!(unknown, Err(EvalError::UnknownDataset(_))));
}

#[test]
fn test_regression_persists_until_fixed() {
    let root = TempDir::new().unwrap();
    let config = config(&root, vec![suite("core", 0, 0.0, true), suite("extended", 1, 0.0, true)]);
    let datasets = config.evaluation.datasets_dir.clone();
    write_dataset(&datasets, "core", &[passing_line("c1")]);
    write_dataset(&datasets, "extended", &[passing_line("e1"), passing_line("e2")]);
    approve(&config);
    let runner = SuiteRunner::new(config.clone()).unwrap();

    let first = runner.run_dataset("extended").unwrap();
    assert!(first.regressions.is_empty());

    // e2 now expects a different name
    let e2 = json!({
        "id": "e2",
        "transcriptText": SARAH,
        "expected": {"name": "Maria Gomez"}
    })
    .to_string();
    write_dataset(&datasets, "extended", &[passing_line("e1"), e2]);

    let second = runner.run_dataset("extended").unwrap();
    assert_eq!(second.regressions, vec!["e2"]);

    let reports = &config.evaluation.reports_dir;
    let stored =
        EvaluationReport::import_json(EvaluationReport::artifact_path(reports, "extended")).unwrap();
    assert_eq!(stored.regressions, vec!["e2"]);
    let reference =
        EvaluationReport::import_json(EvaluationReport::reference_path(reports, "extended")).unwrap();
    assert!(reference.cases.iter().all(|c| c.outcome.strict_pass));

    // Rerunning does not clear the regression
    let summary = runner
        .run_progressive(&RunOptions {
            stop_on_regression: true,
            ..Default::default()
        })
        .unwrap();
    assert_eq!(summary.halted_at.as_deref(), Some("extended"));
    assert_eq!(summary.reports[1].regressions, vec!["e2"]);
    assert_eq!(runner.run_dataset("extended").unwrap().regressions, vec!["e2"]);

    // Fixing the case clears it
    write_dataset(&datasets, "extended", &[passing_line("e1"), passing_line("e2")]);
    assert!(runner.run_dataset("extended").unwrap().regressions.is_empty());
}

#[test]
fn test_bulk_mode_counts_skipped_lines() {
    let root = TempDir::new().unwrap();
    let mut config = config(&root, vec![suite("core", 0, 0.5, true)]);
    write_dataset(
        &config.evaluation.datasets_dir,
        "core",
        &[passing_line("c1"), "{not json".to_string()],
    );
    approve(&config);

    let report = SuiteRunner::new(config.clone()).unwrap().run_dataset("core").unwrap();
    assert_eq!(report.case_count, 1);
    assert_eq!(report.skipped_lines, 1);
    assert!(report.passed);

    config.evaluation.load_mode = LoadMode::Strict;
    let err = SuiteRunner::new(config).unwrap().run_dataset("core").unwrap_err();
    assert!(matches!(err, EvalError::MalformedLine { line: 2, .. }));
}

#[test]
fn test_report_carries_no_transcript_text() {
    let root = TempDir::new().unwrap();
    let config = config(&root, vec![suite("core", 0, 0.5, true)]);
    write_dataset(&config.evaluation.datasets_dir, "core", &[passing_line("c1"), failing_line("c2")]);
    approve(&config);

    SuiteRunner::new(config.clone()).unwrap().run_dataset("core").unwrap();
    let json = fs::read_to_string(config.evaluation.reports_dir.join("core.json")).unwrap();
    assert!(!json.contains("rent due tomorrow"));
    assert!(!json.contains("Sarah"));
}
