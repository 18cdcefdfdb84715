//! Replication health audit CLI.
#![forbid(unsafe_code)]

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use replcheck::render::{render_json, render_table};
use replcheck::{AliasTable, Auditor, ThreadSleeper};
use replcheck_common::config::parse_duration;
use replcheck_common::{
    AuditConfig, HttpFetcher, LogConfig, Sourced, TransportOptions, Verdict, init_logging,
};
use tracing::{error, info, warn};

/// Exit code when the run aborted before producing a verdict.
const ABORT_EXIT_CODE: u8 = 3;

#[derive(Parser)]
#[command(
    name = "replcheck",
    version,
    about = "Audit replication health of a stratum 0 / stratum 1 repository"
)]
struct Cli {
    /// Repository URL, e.g. http://cvmfs.example.org/cvmfs/repo.example.org
    url: String,

    /// Keep assessing until every reachable endpoint serves this revision
    #[arg(short = 'w', long, value_name = "REVISION")]
    wait_revision: Option<u64>,

    /// Print the assessment as JSON
    #[arg(long)]
    json: bool,

    /// Per-request timeout (e.g. 5s, 1500ms)
    #[arg(long, value_parser = duration_arg)]
    timeout: Option<Duration>,

    /// Pause between wait attempts
    #[arg(long, value_parser = duration_arg)]
    interval: Option<Duration>,

    /// Config file (defaults to $XDG_CONFIG_HOME/replcheck/config.toml)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Print the effective configuration to stderr before running
    #[arg(long)]
    show_config: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn duration_arg(value: &str) -> Result<Duration, String> {
    parse_duration(value).ok_or_else(|| format!("invalid duration '{value}'"))
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let (mut log_config, log_env_errors) = LogConfig::from_env("warn");
    if cli.verbose {
        log_config = log_config.with_level("debug");
    }
    let _logging_guards = match init_logging(&log_config) {
        Ok(guards) => Some(guards),
        Err(e) => {
            eprintln!("replcheck: logging disabled: {e}");
            None
        }
    };
    for problem in &log_env_errors {
        warn!("ignoring environment setting: {problem}");
    }

    match run(cli) {
        Ok(verdict) => ExitCode::from(verdict.code() as u8),
        Err(e) => {
            error!("{e:#}");
            eprintln!("replcheck: {e:#}");
            ExitCode::from(ABORT_EXIT_CODE)
        }
    }
}

fn run(cli: Cli) -> Result<Verdict> {
    let (mut config, env_errors) =
        AuditConfig::load(cli.config.as_deref()).context("failed to load configuration")?;
    for problem in &env_errors {
        warn!("ignoring environment setting: {problem}");
    }
    if let Some(timeout) = cli.timeout {
        config.timeout = Sourced::from_cli(timeout);
    }
    if let Some(interval) = cli.interval {
        config.wait_interval = Sourced::from_cli(interval);
    }
    if cli.show_config {
        for line in config.describe() {
            eprintln!("{line}");
        }
    }

    let fetcher = HttpFetcher::new(&TransportOptions {
        timeout: config.timeout.value,
        user_agent: config.user_agent.value.clone(),
        ..TransportOptions::default()
    });
    let auditor = Auditor::new(fetcher)
        .with_aliases(AliasTable::new(config.aliases.clone()))
        .with_staleness_window(config.staleness_window_secs.value);

    let outcome = auditor
        .wait_for_revision(
            &cli.url,
            cli.wait_revision,
            config.wait_interval.value,
            &ThreadSleeper,
        )
        .with_context(|| format!("assessment of {} aborted", cli.url))?;

    if let Some(target) = cli.wait_revision {
        info!(
            target,
            attempts = outcome.attempts,
            reached = outcome.target_reached,
            "wait finished"
        );
    }

    let assessment = &outcome.assessment;
    let output = if cli.json {
        render_json(assessment).context("failed to serialize assessment")?
    } else {
        render_table(assessment)
    };
    print!("{output}");
    if cli.json {
        println!();
    }

    Ok(assessment.verdict)
}
