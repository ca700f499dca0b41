//! apiconform CLI - contract-conformance tests for a JSON:API service

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, ValueEnum};
use tracing::info;

use apiconform_core::{Config, FailureType, RunReport, Verdict, VerdictPolicy, VerdictStatus};
use apiconform_runner::{Driver, RunContext, RunOptions, Session, resolve};

#[derive(Parser)]
#[command(name = "apiconform")]
#[command(about = "Check a JSON:API service against its Swagger/OpenAPI document")]
#[command(version)]
struct Cli {
    /// Configuration file (JSON, or TOML with a .toml extension)
    config: PathBuf,

    /// Swagger 2 / OpenAPI 3 document (YAML or JSON)
    openapi: PathBuf,

    /// Debug logging
    #[arg(long)]
    debug: bool,

    /// Output format
    #[arg(long, default_value = "terminal")]
    output: OutputFormat,

    /// Strict mode (warnings fail the run). Use --strict false to disable.
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    strict: bool,

    /// Failure type to leave out of the verdict, e.g. status_not_declared (repeatable)
    #[arg(long = "ignore", value_name = "FAILURE_TYPE", value_parser = parse_failure_type)]
    ignore: Vec<FailureType>,

    /// Test runner arguments: -f/--failfast and test name filters
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    runner_args: Vec<String>,
}

#[derive(Clone, Copy, ValueEnum, PartialEq, Eq)]
enum OutputFormat {
    Terminal,
    Json,
    Silent,
}

fn parse_failure_type(s: &str) -> Result<FailureType, String> {
    serde_json::from_value(serde_json::Value::String(s.to_string()))
        .map_err(|_| format!("unknown failure type '{s}'"))
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.debug);

    match run(&cli) {
        Ok(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(3)
        }
    }
}

fn init_logging(debug: bool) {
    let level = if debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .with_target(false)
        .init();
}

fn run(cli: &Cli) -> Result<i32> {
    let config = Config::load(&cli.config)
        .with_context(|| format!("loading config {}", cli.config.display()))?;

    let document = resolve(&cli.openapi)
        .with_context(|| format!("resolving API document {}", cli.openapi.display()))?;
    info!(
        dialect = %document.dialect,
        schemas = document.schemas.len(),
        operations = document.operations.len(),
        "API document resolved"
    );

    let session = Session::open(&config).context("opening HTTP session")?;
    info!(base_url = %session.base_url(), "testing");

    let options = RunOptions::from_args(&cli.runner_args);
    let report = Driver::new(RunContext {
        session: &session,
        document: &document,
        cases: &config.test_cases,
        options,
    })
    .run();
    session.close();

    let policy = VerdictPolicy {
        strict: cli.strict,
        ignore_failure_types: cli.ignore.clone(),
        ..Default::default()
    };
    let verdict = policy.verdict(&report);

    match cli.output {
        OutputFormat::Terminal => print_terminal(&report, &policy, &verdict),
        OutputFormat::Json => {
            let json_output = serde_json::json!({
                "verdict": {
                    "status": verdict.status.to_string(),
                    "exit_code": verdict.exit_code,
                    "reason": verdict.reason,
                },
                "stats": {
                    "total": report.total,
                    "passed": report.passed,
                    "failed": report.failed,
                    "errored": report.errored,
                    "stopped_early": report.stopped_early,
                },
                "failures": policy.filter(&report),
                "outcomes": report.outcomes,
            });
            println!("{}", serde_json::to_string_pretty(&json_output)?);
        }
        OutputFormat::Silent => {}
    }

    Ok(verdict.exit_code)
}

fn print_terminal(report: &RunReport, policy: &VerdictPolicy, verdict: &Verdict) {
    let mut printed_header = false;
    for outcome in &report.outcomes {
        let shown: Vec<_> = outcome
            .failures
            .iter()
            .filter(|f| {
                f.severity >= policy.min_severity
                    && !policy.ignore_failure_types.contains(&f.failure_type)
            })
            .collect();
        if shown.is_empty() {
            continue;
        }
        if !printed_header {
            println!("Failures:");
            printed_header = true;
        }
        println!(
            "  {} {} ({}, {} = {})",
            outcome.status, outcome.test, outcome.label, outcome.case, outcome.value
        );
        for f in shown {
            println!("    [{}] {}: {}", f.severity, f.failure_type, f.message);
            if let Some(url) = &f.url {
                println!("         GET {url}");
            }
        }
    }

    let icon = if verdict.status == VerdictStatus::Pass {
        "PASS"
    } else {
        "FAIL"
    };
    println!("\n{icon}: {}", verdict.reason);
    println!(
        "  Sub-cases: {} total, {} passed, {} failed, {} errored",
        report.total, report.passed, report.failed, report.errored
    );
    println!("  Exit code: {}", verdict.exit_code);
}
