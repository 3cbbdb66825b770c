//! Typed paths into the archive layout.
//!
//! ```text
//! <data_dir>/
//!   latest.txt              normalized text of the newest snapshot
//!   latest.html             filtered markup of the newest snapshot
//!   .lock                   advisory run lock
//!   snapshots/
//!     YYYYMMDD-HHMMSS.txt
//!     YYYYMMDD-HHMMSS.html
//! ```
use super::SnapshotStamp;
use std::path::PathBuf;

/// Convenience wrapper for locating archive files under a data directory.
#[derive(Debug, Clone)]
pub struct ArchivePaths {
    root: PathBuf,
}

impl ArchivePaths {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn latest_text_path(&self) -> PathBuf {
        self.root.join("latest.txt")
    }

    pub fn latest_markup_path(&self) -> PathBuf {
        self.root.join("latest.html")
    }

    pub fn lock_path(&self) -> PathBuf {
        self.root.join(".lock")
    }

    /// Return the `snapshots/` directory path.
    pub fn snapshots_dir(&self) -> PathBuf {
        self.root.join("snapshots")
    }

    pub fn snapshot_text_path(&self, stamp: &SnapshotStamp) -> PathBuf {
        self.snapshots_dir().join(format!("{stamp}.txt"))
    }

    pub fn snapshot_markup_path(&self, stamp: &SnapshotStamp) -> PathBuf {
        self.snapshots_dir().join(format!("{stamp}.html"))
    }
}
