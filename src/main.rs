use anyhow::{anyhow, Result};
use chrono::Utc;
use clap::Parser;
use serde::Serialize;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod archive;
mod cli;
mod config;
mod fetch;
mod fingerprint;
mod monitor;
mod normalize;
mod notify;
mod report;
mod util;

use archive::{Archive, SnapshotStamp};
use cli::{Command, HistoryArgs, ReportArgs, RootArgs, RunArgs};
use config::{resolve_config, resolve_run_config};
use fetch::{FileFetcher, HttpFetcher};
use fingerprint::Fingerprint;
use monitor::{Monitor, RunError};
use util::display_path;

/// Exit status for configuration and other non-run failures.
const EXIT_USAGE: u8 = 2;

fn main() -> ExitCode {
    let args = RootArgs::parse();
    init_tracing(args.verbose);

    let result = match args.command {
        Command::Run(args) => cmd_run(args),
        Command::Report(args) => cmd_report(args),
        Command::History(args) => cmd_history(args),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            let code = err
                .downcast_ref::<RunError>()
                .map(RunError::exit_code)
                .unwrap_or(EXIT_USAGE);
            ExitCode::from(code)
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn cmd_run(args: RunArgs) -> Result<()> {
    let config = resolve_run_config(&args.config, args.email, args.ticket)?;

    let notifiers = notify::build_notifiers(&config, notify::env_lookup);
    let outcome = match &args.source_file {
        Some(path) => Monitor::new(&config, FileFetcher::new(path), notifiers).run_once()?,
        None => Monitor::new(
            &config,
            HttpFetcher::new(config.source_url.clone(), config.fetch_timeout),
            notifiers,
        )
        .run_once()?,
    };

    let cwd = std::env::current_dir().ok();
    let report = display_path(&outcome.report_path, cwd.as_deref());
    if outcome.changed {
        let stamp = outcome
            .snapshot
            .map(|stamp| stamp.to_string())
            .unwrap_or_default();
        println!(
            "Change detected; archived snapshot {stamp} ({} notification(s) sent). Report: {report}",
            outcome.notified
        );
    } else {
        println!("No change ({}). Report: {report}", outcome.fingerprint);
    }
    Ok(())
}

fn cmd_report(args: ReportArgs) -> Result<()> {
    let config = resolve_config(&args.config)?;
    let archive = Archive::open(config.data_dir.clone());
    if archive.load_latest_text()?.is_empty() && archive.list_all()?.is_empty() {
        return Err(anyhow!(
            "archive {} is empty; run `pagewatch run` first",
            config.data_dir.display()
        ));
    }
    monitor::rebuild_report(
        &archive,
        &config.source_url,
        &config.report_path,
        Utc::now(),
    )?;
    println!("Report: {}", config.report_path.display());
    Ok(())
}

#[derive(Serialize)]
struct HistoryEntry {
    timestamp: SnapshotStamp,
    fingerprint: Fingerprint,
    lines: usize,
}

fn cmd_history(args: HistoryArgs) -> Result<()> {
    let config = resolve_config(&args.config)?;
    let archive = Archive::open(config.data_dir.clone());
    let entries: Vec<HistoryEntry> = archive
        .list_all()?
        .into_iter()
        .map(|snapshot| HistoryEntry {
            timestamp: snapshot.stamp,
            fingerprint: snapshot.fingerprint(),
            lines: snapshot.text.lines().count(),
        })
        .collect();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }
    if entries.is_empty() {
        println!(
            "No snapshots archived in {}.",
            archive.paths().snapshots_dir().display()
        );
        return Ok(());
    }
    for entry in &entries {
        println!(
            "{}  {}  {} line(s)",
            entry.timestamp, entry.fingerprint, entry.lines
        );
    }
    Ok(())
}
