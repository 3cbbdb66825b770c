//! Shared test infrastructure for integration tests.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// One row of `pagewatch history --json`.
#[derive(Debug, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: String,
    pub fingerprint: String,
    pub lines: usize,
}

/// Scratch workspace with a local source page, data dir and report path.
pub struct PageFixture {
    pub temp_dir: TempDir,
}

/// Captured result of one `pagewatch` invocation.
#[derive(Debug)]
pub struct RunResult {
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl From<Output> for RunResult {
    fn from(output: Output) -> Self {
        Self {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }
}

impl PageFixture {
    pub fn create() -> Self {
        Self {
            temp_dir: TempDir::new().expect("create temp dir"),
        }
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn source_path(&self) -> PathBuf {
        self.root().join("page.html")
    }

    pub fn data_dir(&self) -> PathBuf {
        self.root().join("data")
    }

    pub fn report_path(&self) -> PathBuf {
        self.root().join("docs/index.html")
    }

    /// Replace the markup served to the next run.
    pub fn serve(&self, markup: &str) {
        std::fs::write(self.source_path(), markup).expect("write source page");
    }

    fn command(&self, subcommand: &str) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_pagewatch"));
        cmd.arg(subcommand)
            .arg("--data-dir")
            .arg(self.data_dir())
            .arg("--report")
            .arg(self.report_path())
            .env("RUST_LOG", "warn")
            .current_dir(self.root());
        cmd
    }

    /// `pagewatch run` against the local source page.
    pub fn run(&self) -> RunResult {
        self.command("run")
            .arg("--source-file")
            .arg(self.source_path())
            .output()
            .expect("spawn pagewatch run")
            .into()
    }

    pub fn report(&self) -> RunResult {
        self.command("report")
            .output()
            .expect("spawn pagewatch report")
            .into()
    }

    pub fn history(&self) -> Vec<HistoryEntry> {
        let result: RunResult = self
            .command("history")
            .arg("--json")
            .output()
            .expect("spawn pagewatch history")
            .into();
        assert_eq!(result.code, Some(0), "history failed: {}", result.stderr);
        serde_json::from_str(&result.stdout).expect("parse history json")
    }

    pub fn read_report(&self) -> String {
        std::fs::read_to_string(self.report_path()).expect("read report")
    }
}
