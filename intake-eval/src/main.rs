//! Intake evaluation CLI
//!
//! **Usage:**
//! ```bash
//! intake-eval run --dataset core
//! intake-eval run-progressive [--stop-on-regression] [--max-suite hard] [--verbose]
//! intake-eval approve-baseline --reason "added 4 rent cases"
//! intake-eval extract [--file transcript.txt] ["transcript text"]
//! ```
//!
//! Exit codes: 0 when every required threshold is met, 1 when one is missed
//! (or the run halted), 2 on a harness error.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use intake_common::config::{ConfigResolver, IntakeConfig};
use intake_common::logging::init_tracing;
use intake_eval::{BaselineGuard, ReportFormatter, RunOptions, SuiteRunner};
use intake_extract::CaseExtractor;
use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;

/// Transcript extraction evaluation harness
#[derive(Parser, Debug)]
#[clap(name = "intake-eval", version)]
#[clap(about = "Evaluate transcript field extraction against golden datasets")]
struct Args {
    /// Config file (overrides INTAKE_CONFIG and discovery)
    #[clap(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Debug logging and full per-suite reports
    #[clap(long, short, global = true)]
    verbose: bool,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Evaluate one dataset
    Run {
        #[clap(long, value_name = "NAME")]
        dataset: String,
    },

    /// Evaluate the configured suites in order
    RunProgressive {
        /// Halt on optional suite failures and on regressions
        #[clap(long)]
        stop_on_regression: bool,

        /// Last suite to run
        #[clap(long, value_name = "NAME")]
        max_suite: Option<String>,
    },

    /// Pin the current content of the protected dataset
    ApproveBaseline {
        #[clap(long)]
        reason: String,
    },

    /// Extract fields from one transcript and print the result JSON
    Extract {
        #[clap(long, value_name = "FILE", conflicts_with = "text")]
        file: Option<PathBuf>,

        /// Transcript text (stdin when neither this nor --file is given)
        text: Option<String>,
    },
}

/// Process exit status
enum Outcome {
    Met,
    Missed,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let config = match ConfigResolver::new(args.config.clone()).load() {
        Ok((config, source)) => {
            init_tracing(if args.verbose { "debug" } else { config.logging.level.as_str() });
            source.log();
            config
        }
        Err(e) => {
            init_tracing("info");
            error!("Configuration error: {}", e);
            return ExitCode::from(2);
        }
    };

    match run(args, config) {
        Ok(Outcome::Met) => ExitCode::SUCCESS,
        Ok(Outcome::Missed) => ExitCode::from(1),
        Err(e) => {
            error!("{:#}", e);
            ExitCode::from(2)
        }
    }
}

fn run(args: Args, config: IntakeConfig) -> Result<Outcome> {
    match args.command {
        Command::Run { dataset } => {
            let runner = SuiteRunner::new(config)?;
            let report = runner.run_dataset(&dataset)?;
            println!("{}", ReportFormatter::format_report(&report));
            Ok(if report.passed || !report.thresholds.required {
                Outcome::Met
            } else {
                Outcome::Missed
            })
        }

        Command::RunProgressive {
            stop_on_regression,
            max_suite,
        } => {
            let runner = SuiteRunner::new(config)?;
            let summary = runner.run_progressive(&RunOptions {
                stop_on_regression,
                max_suite,
            })?;

            for report in &summary.reports {
                if args.verbose {
                    println!("{}", ReportFormatter::format_report(report));
                } else {
                    println!("{}", ReportFormatter::format_suite_line(report));
                }
            }
            if let Some(suite) = &summary.halted_at {
                println!("Halted at suite '{}'", suite);
            }

            Ok(if summary.all_required_met() {
                Outcome::Met
            } else {
                Outcome::Missed
            })
        }

        Command::ApproveBaseline { reason } => {
            let guard = BaselineGuard::from_config(&config.evaluation);
            let checksum = guard.approve(&reason)?;
            println!(
                "Approved '{}': {} ({} cases)",
                guard.dataset(),
                checksum.hash,
                checksum.case_count
            );
            Ok(Outcome::Met)
        }

        Command::Extract { file, text } => {
            let transcript = match (file, text) {
                (Some(path), _) => std::fs::read_to_string(&path)
                    .with_context(|| format!("reading {}", path.display()))?,
                (None, Some(text)) => text,
                (None, None) => {
                    let mut buf = String::new();
                    std::io::stdin()
                        .read_to_string(&mut buf)
                        .context("reading transcript from stdin")?;
                    buf
                }
            };
            let extractor = CaseExtractor::new(&config)?;
            let result = extractor.extract(&transcript);
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(Outcome::Met)
        }
    }
}
