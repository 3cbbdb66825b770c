//! Advisory lock held for the duration of one run.
//!
//! The scheduler is expected to never overlap runs; the lock turns an
//! accidental overlap into a fast failure instead of interleaved writes.
//! `flock` locks are released by the kernel when the descriptor closes, so a
//! crashed run never leaves a stale lock behind.
use super::ArchiveError;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::Path;

/// Exclusive run lock; released on drop.
#[derive(Debug)]
pub struct RunLock {
    _file: File,
}

pub(super) fn acquire(path: &Path) -> Result<RunLock, ArchiveError> {
    let write_err = |source| ArchiveError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(write_err)?;
    }
    let mut file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(path)
        .map_err(write_err)?;
    try_lock_exclusive(&file).map_err(|err| {
        if is_contended(&err) {
            ArchiveError::Locked {
                path: path.to_path_buf(),
            }
        } else {
            write_err(err)
        }
    })?;
    file.set_len(0).map_err(write_err)?;
    writeln!(file, "{}", std::process::id()).map_err(write_err)?;
    tracing::debug!(path = %path.display(), "run lock acquired");
    Ok(RunLock { _file: file })
}

#[cfg(unix)]
fn try_lock_exclusive(file: &File) -> std::io::Result<()> {
    use std::os::unix::io::AsRawFd;
    // SAFETY: the descriptor is owned by `file` and stays open for the call.
    let rc = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
    if rc == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}

#[cfg(not(unix))]
fn try_lock_exclusive(_file: &File) -> std::io::Result<()> {
    Ok(())
}

#[cfg(unix)]
fn is_contended(err: &std::io::Error) -> bool {
    err.raw_os_error() == Some(libc::EWOULDBLOCK)
}

#[cfg(not(unix))]
fn is_contended(_err: &std::io::Error) -> bool {
    false
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_fails_until_first_is_dropped() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("data/.lock");

        let held = acquire(&path).expect("first lock");
        assert!(path.is_file());
        let err = acquire(&path).expect_err("second lock must fail");
        assert!(matches!(err, ArchiveError::Locked { .. }), "{err}");

        drop(held);
        acquire(&path).expect("lock after release");
    }
}
