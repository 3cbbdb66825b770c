//! CLI argument parsing for the page monitor.
//!
//! Each subcommand is one invocation; scheduling is left to cron or CI.
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Root CLI entrypoint.
#[derive(Parser, Debug)]
#[command(
    name = "pagewatch",
    version,
    about = "Watch one web page, archive content changes, and publish an HTML diff report",
    after_help = "Commands:\n  run       Fetch, compare, archive on change, rebuild the report\n  report    Rebuild the report from the archive without fetching\n  history   List archived snapshots\n\nExamples:\n  pagewatch run\n  pagewatch run --url https://example.org/events --email\n  pagewatch run --source-file saved.html --data-dir /tmp/watch\n  pagewatch history --json",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    /// Log at debug level (RUST_LOG takes precedence)
    #[arg(long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    Run(RunArgs),
    Report(ReportArgs),
    History(HistoryArgs),
}

/// Settings shared by every subcommand; flags override the config file.
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// JSON config file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Page to monitor
    #[arg(long, value_name = "URL")]
    pub url: Option<String>,

    /// Directory holding latest.* and snapshots/
    #[arg(long, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Output path of the rendered report
    #[arg(long, value_name = "PATH")]
    pub report: Option<PathBuf>,

    /// Fetch timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout_secs: Option<u64>,
}

/// One monitoring pass.
#[derive(Parser, Debug)]
#[command(about = "Fetch the page, archive a snapshot on change, and rebuild the report")]
pub struct RunArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Read markup from a local file instead of fetching the URL
    #[arg(long, value_name = "PATH")]
    pub source_file: Option<PathBuf>,

    /// Send an email when a change is detected
    #[arg(long)]
    pub email: bool,

    /// Open an issue-tracker ticket when a change is detected
    #[arg(long)]
    pub ticket: bool,
}

#[derive(Parser, Debug)]
#[command(about = "Rebuild the report from the archive without fetching")]
pub struct ReportArgs {
    #[command(flatten)]
    pub config: ConfigArgs,
}

#[derive(Parser, Debug)]
#[command(about = "List archived snapshots, oldest first")]
pub struct HistoryArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Emit machine-readable JSON output
    #[arg(long)]
    pub json: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        RootArgs::command().debug_assert();
    }

    #[test]
    fn run_flags_parse() {
        let args = RootArgs::parse_from([
            "pagewatch",
            "run",
            "--source-file",
            "page.html",
            "--data-dir",
            "/tmp/watch",
            "--email",
            "--verbose",
        ]);
        assert!(args.verbose);
        let Command::Run(run) = args.command else {
            panic!("expected run command");
        };
        assert_eq!(run.source_file, Some(PathBuf::from("page.html")));
        assert_eq!(run.config.data_dir, Some(PathBuf::from("/tmp/watch")));
        assert!(run.email);
        assert!(!run.ticket);
    }
}
