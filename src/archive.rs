//! Append-only snapshot archive backed by the filesystem.
//!
//! Each detected change lands as an immutable `<stamp>.txt`/`<stamp>.html`
//! pair. The `latest.*` pointer files mirror the newest pair and are the
//! comparison baseline for the next run.
mod lock;
mod paths;

pub use lock::RunLock;
pub use paths::ArchivePaths;

use crate::fingerprint::Fingerprint;
use crate::normalize::NormalizedDocument;
use crate::util::write_atomic;
use chrono::{DateTime, NaiveDateTime, SubsecRound, Utc};
use serde::{Serialize, Serializer};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Filesystem failure while reading or writing archive state.
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("write {}: {source}", .path.display())]
    Write { path: PathBuf, source: io::Error },
    #[error("read {}: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("archive {} is locked by another run", .path.display())]
    Locked { path: PathBuf },
}

/// Second-precision UTC timestamp naming one snapshot pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SnapshotStamp(NaiveDateTime);

impl SnapshotStamp {
    const FORMAT: &'static str = "%Y%m%d-%H%M%S";

    /// Stamp for `at`, dropping sub-second precision.
    pub fn from_datetime(at: DateTime<Utc>) -> Self {
        Self(at.trunc_subsecs(0).naive_utc())
    }

    /// Parse a snapshot file stem such as `20250105-143000`.
    pub fn parse(stem: &str) -> Option<Self> {
        NaiveDateTime::parse_from_str(stem, Self::FORMAT)
            .ok()
            .map(Self)
    }

    pub fn to_datetime(self) -> DateTime<Utc> {
        self.0.and_utc()
    }
}

impl fmt::Display for SnapshotStamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(Self::FORMAT))
    }
}

impl Serialize for SnapshotStamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One detected content state, written exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub stamp: SnapshotStamp,
    pub text: String,
    pub raw_markup: String,
}

impl Snapshot {
    pub fn new(at: DateTime<Utc>, document: &NormalizedDocument) -> Self {
        Self {
            stamp: SnapshotStamp::from_datetime(at),
            text: document.text.clone(),
            raw_markup: document.raw_markup.clone(),
        }
    }
}

/// Archived snapshot as read back for reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchivedSnapshot {
    pub stamp: SnapshotStamp,
    pub text: String,
}

impl ArchivedSnapshot {
    /// Recomputed from the stored text on every call.
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::of(&self.text)
    }
}

/// Snapshot archive rooted at a data directory.
#[derive(Debug, Clone)]
pub struct Archive {
    paths: ArchivePaths,
}

impl Archive {
    pub fn open(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            paths: ArchivePaths::new(data_dir.into()),
        }
    }

    pub fn paths(&self) -> &ArchivePaths {
        &self.paths
    }

    /// Take the advisory run lock for this archive.
    pub fn lock(&self) -> Result<RunLock, ArchiveError> {
        lock::acquire(&self.paths.lock_path())
    }

    /// Text of the newest snapshot, or an empty string before the first run.
    pub fn load_latest_text(&self) -> Result<String, ArchiveError> {
        read_optional(&self.paths.latest_text_path())
    }

    /// Filtered markup of the newest snapshot, or an empty string before the first run.
    pub fn load_latest_markup(&self) -> Result<String, ArchiveError> {
        read_optional(&self.paths.latest_markup_path())
    }

    /// Write the immutable file pair for `snapshot`.
    ///
    /// A second snapshot within the same second overwrites the first.
    pub fn append(&self, snapshot: &Snapshot) -> Result<(), ArchiveError> {
        let dir = self.paths.snapshots_dir();
        fs::create_dir_all(&dir).map_err(|source| ArchiveError::Write {
            path: dir.clone(),
            source,
        })?;
        write_plain(
            &self.paths.snapshot_text_path(&snapshot.stamp),
            &snapshot.text,
        )?;
        write_plain(
            &self.paths.snapshot_markup_path(&snapshot.stamp),
            &snapshot.raw_markup,
        )?;
        tracing::info!(stamp = %snapshot.stamp, "snapshot archived");
        Ok(())
    }

    /// Overwrite the `latest.*` pointer files.
    pub fn set_latest(&self, text: &str, raw_markup: &str) -> Result<(), ArchiveError> {
        for (path, contents) in [
            (self.paths.latest_text_path(), text),
            (self.paths.latest_markup_path(), raw_markup),
        ] {
            write_atomic(&path, contents.as_bytes())
                .map_err(|source| ArchiveError::Write { path, source })?;
        }
        Ok(())
    }

    /// Every archived snapshot, ascending by parsed timestamp.
    ///
    /// Text files whose stem is not a snapshot timestamp are skipped.
    pub fn list_all(&self) -> Result<Vec<ArchivedSnapshot>, ArchiveError> {
        let dir = self.paths.snapshots_dir();
        let read_err = |source| ArchiveError::Read {
            path: dir.clone(),
            source,
        };
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(read_err(err)),
        };

        let mut snapshots = Vec::new();
        for entry in entries {
            let path = entry.map_err(read_err)?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("txt") {
                continue;
            }
            let stem = path.file_stem().and_then(|stem| stem.to_str());
            let Some(stamp) = stem.and_then(SnapshotStamp::parse) else {
                tracing::warn!(path = %path.display(), "skipping unrecognized snapshot file");
                continue;
            };
            let text = fs::read_to_string(&path).map_err(|source| ArchiveError::Read {
                path: path.clone(),
                source,
            })?;
            snapshots.push(ArchivedSnapshot { stamp, text });
        }
        snapshots.sort_by_key(|snapshot| snapshot.stamp);
        Ok(snapshots)
    }
}

fn read_optional(path: &Path) -> Result<String, ArchiveError> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(text),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(String::new()),
        Err(source) => Err(ArchiveError::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn write_plain(path: &Path, contents: &str) -> Result<(), ArchiveError> {
    fs::write(path, contents.as_bytes()).map_err(|source| ArchiveError::Write {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
#[path = "archive_tests.rs"]
mod tests;
