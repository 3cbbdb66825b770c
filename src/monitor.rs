//! One monitoring pass: fetch, normalize, compare, then archive/report/notify.
//!
//! Stages run strictly in order. Only fetching fails on external state; it
//! aborts before anything on disk is touched. Archive and report writes are
//! fatal, notifications never are.
use crate::archive::{Archive, ArchiveError, Snapshot, SnapshotStamp};
use crate::config::MonitorConfig;
use crate::fetch::{FetchError, Fetcher};
use crate::fingerprint::Fingerprint;
use crate::normalize::{normalize, NormalizedDocument};
use crate::notify::{Notification, Notifier};
use crate::report::{self, Baseline, ReportError, ReportInput};
use chrono::{DateTime, Utc};
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStage {
    Fetching,
    Normalizing,
    Comparing,
    Archiving,
    Reporting,
    Notifying,
    Done,
}

impl RunStage {
    pub fn as_str(self) -> &'static str {
        match self {
            RunStage::Fetching => "fetching",
            RunStage::Normalizing => "normalizing",
            RunStage::Comparing => "comparing",
            RunStage::Archiving => "archiving",
            RunStage::Reporting => "reporting",
            RunStage::Notifying => "notifying",
            RunStage::Done => "done",
        }
    }
}

impl fmt::Display for RunStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn enter(stage: RunStage) {
    tracing::debug!(stage = %stage, "run stage");
}

/// Fatal run failures, one per stage that can abort.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),
    #[error("archive failed: {0}")]
    Archive(#[from] ArchiveError),
    #[error(transparent)]
    Report(#[from] ReportError),
}

impl RunError {
    /// Process exit status for this failure.
    pub fn exit_code(&self) -> u8 {
        match self {
            RunError::Fetch(_) => 1,
            RunError::Archive(_) | RunError::Report(_) => 2,
        }
    }
}

/// Summary of a successful pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub changed: bool,
    pub fingerprint: Fingerprint,
    /// Snapshot archived by this pass, if the content changed.
    pub snapshot: Option<SnapshotStamp>,
    /// Notifiers that delivered successfully.
    pub notified: usize,
    pub report_path: PathBuf,
}

pub struct Monitor<F> {
    fetcher: F,
    archive: Archive,
    report_path: PathBuf,
    notifiers: Vec<Box<dyn Notifier>>,
}

impl<F: Fetcher> Monitor<F> {
    pub fn new(config: &MonitorConfig, fetcher: F, notifiers: Vec<Box<dyn Notifier>>) -> Self {
        Self {
            fetcher,
            archive: Archive::open(config.data_dir.clone()),
            report_path: config.report_path.clone(),
            notifiers,
        }
    }

    pub fn run_once(&self) -> Result<RunOutcome, RunError> {
        self.run_at(Utc::now())
    }

    /// Run one pass, stamping snapshots and the report with `now`.
    pub fn run_at(&self, now: DateTime<Utc>) -> Result<RunOutcome, RunError> {
        let source = self.fetcher.source();

        enter(RunStage::Fetching);
        let raw = self.fetcher.fetch()?;

        enter(RunStage::Normalizing);
        let current = normalize(&raw);
        let fingerprint = current.fingerprint();
        tracing::debug!(
            raw_bytes = raw.len(),
            lines = current.text.lines().count(),
            %fingerprint,
            "page normalized"
        );

        enter(RunStage::Comparing);
        let _lock = self.archive.lock()?;
        let previous_text = self.archive.load_latest_text()?;
        let previous = Fingerprint::of_previous(&previous_text);
        let changed = previous.as_ref() != Some(&fingerprint);

        if !changed {
            tracing::info!(%fingerprint, "no change detected");
            enter(RunStage::Reporting);
            self.write_report(&source, &current, &fingerprint, Baseline::Unchanged, now)?;
            enter(RunStage::Done);
            return Ok(RunOutcome {
                changed: false,
                fingerprint,
                snapshot: None,
                notified: 0,
                report_path: self.report_path.clone(),
            });
        }

        tracing::info!(
            %fingerprint,
            first_capture = previous.is_none(),
            "change detected"
        );
        enter(RunStage::Archiving);
        let snapshot = Snapshot::new(now, &current);
        self.archive.set_latest(&snapshot.text, &snapshot.raw_markup)?;
        self.archive.append(&snapshot)?;

        enter(RunStage::Reporting);
        self.write_report(
            &source,
            &current,
            &fingerprint,
            Baseline::from_previous(&previous_text),
            now,
        )?;

        enter(RunStage::Notifying);
        let notification = Notification::page_changed(&source, now, &current.text, &previous_text);
        let notified = self.notify_all(&notification);

        enter(RunStage::Done);
        Ok(RunOutcome {
            changed: true,
            fingerprint,
            snapshot: Some(snapshot.stamp),
            notified,
            report_path: self.report_path.clone(),
        })
    }

    fn write_report(
        &self,
        source: &str,
        current: &NormalizedDocument,
        fingerprint: &Fingerprint,
        baseline: Baseline<'_>,
        now: DateTime<Utc>,
    ) -> Result<(), RunError> {
        let history = self.archive.list_all()?;
        let html = report::render(
            &ReportInput {
                source_url: source,
                current,
                current_fingerprint: fingerprint,
                baseline,
                history: &history,
            },
            now,
        );
        report::write_report(&self.report_path, &html)?;
        Ok(())
    }

    fn notify_all(&self, notification: &Notification) -> usize {
        let mut delivered = 0;
        for notifier in &self.notifiers {
            match notifier.notify(notification) {
                Ok(()) => delivered += 1,
                Err(err) => {
                    tracing::error!(notifier = notifier.name(), error = %err, "notification failed")
                }
            }
        }
        delivered
    }
}

/// Rebuild the report from archived state alone.
///
/// The latest pointer is the current content; the snapshot before the newest
/// one is the diff baseline.
pub fn rebuild_report(
    archive: &Archive,
    source: &str,
    report_path: &Path,
    now: DateTime<Utc>,
) -> Result<(), RunError> {
    let history = archive.list_all()?;
    let current = NormalizedDocument {
        text: archive.load_latest_text()?,
        raw_markup: archive.load_latest_markup()?,
    };
    let fingerprint = current.fingerprint();
    let baseline = match history.iter().rev().nth(1) {
        Some(previous) => Baseline::from_previous(&previous.text),
        None => Baseline::Initial,
    };
    let html = report::render(
        &ReportInput {
            source_url: source,
            current: &current,
            current_fingerprint: &fingerprint,
            baseline,
            history: &history,
        },
        now,
    );
    report::write_report(report_path, &html)?;
    Ok(())
}

#[cfg(test)]
#[path = "monitor_tests.rs"]
mod tests;
