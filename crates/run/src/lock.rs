// SPDX-License-Identifier: MIT

//! Filesystem run lock, one per work tree.
//!
//! The marker file's absence is the only authoritative "idle" signal, so
//! the lock is a real file created with `O_CREAT|O_EXCL` rather than an
//! advisory lock that would silently vanish with a crashed holder. The
//! marker records the owning pid and acquisition time; staleness is
//! reported but never auto-cleared — clearing a stale lock is an explicit
//! operator action.

use chrono::{DateTime, Utc};
use nix::errno::Errno;
use nix::sys::signal::kill;
use nix::unistd::Pid;
use sluice_core::{Clock, WorkTree};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LockError {
    #[error("lock file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed lock marker {path}")]
    Malformed { path: PathBuf },
}

/// Recorded holder of the lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockOwner {
    pub pid: u32,
    pub acquired_at: DateTime<Utc>,
}

impl LockOwner {
    /// Whether the owning process still exists.
    pub fn alive(&self) -> bool {
        pid_alive(self.pid)
    }
}

/// Probe a pid with signal 0. EPERM means the process exists but belongs
/// to someone else, which still counts as alive.
pub fn pid_alive(pid: u32) -> bool {
    match kill(Pid::from_raw(pid as i32), None) {
        Ok(()) => true,
        Err(Errno::EPERM) => true,
        Err(_) => false,
    }
}

/// Mutual exclusion for pipeline runs on one work tree.
pub struct RunLock {
    path: PathBuf,
}

impl RunLock {
    pub fn new(tree: &WorkTree) -> Self {
        Self { path: tree.lock_path() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Atomically create the marker. Returns `None` when a run is already
    /// active; two concurrent acquisitions cannot both succeed.
    pub fn try_acquire<C: Clock>(&self, clock: &C) -> Result<Option<RunLockGuard>, LockError> {
        let io_err = |source| LockError::Io { path: self.path.clone(), source };
        match std::fs::OpenOptions::new().write(true).create_new(true).open(&self.path) {
            Ok(mut file) => {
                writeln!(file, "{} {}", std::process::id(), clock.timestamp().to_rfc3339())
                    .map_err(io_err)?;
                tracing::debug!(path = %self.path.display(), "run lock acquired");
                Ok(Some(RunLockGuard { path: self.path.clone(), released: false }))
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(None),
            Err(e) => Err(io_err(e)),
        }
    }

    /// Read-only busy check.
    pub fn is_held(&self) -> bool {
        self.path.exists()
    }

    /// Parse the recorded owner. `None` when the lock is not held.
    pub fn owner(&self) -> Result<Option<LockOwner>, LockError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(LockError::Io { path: self.path.clone(), source }),
        };
        let malformed = || LockError::Malformed { path: self.path.clone() };
        let mut fields = raw.split_whitespace();
        let pid = fields.next().and_then(|f| f.parse().ok()).ok_or_else(malformed)?;
        let acquired_at = fields
            .next()
            .and_then(|f| DateTime::parse_from_rfc3339(f).ok())
            .ok_or_else(malformed)?
            .with_timezone(&Utc);
        Ok(Some(LockOwner { pid, acquired_at }))
    }

    /// Remove the marker regardless of owner. Used only by the explicit
    /// unlock operation; returns whether a marker was removed.
    pub fn force_release(&self) -> Result<bool, LockError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(LockError::Io { path: self.path.clone(), source }),
        }
    }
}

/// Holds the lock for one run; releases it on every exit path.
#[must_use = "dropping the guard releases the lock"]
pub struct RunLockGuard {
    path: PathBuf,
    released: bool,
}

impl RunLockGuard {
    /// Explicit release for the happy path. Idempotent if the marker is
    /// already gone.
    pub fn release(mut self) -> Result<(), LockError> {
        self.released = true;
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(LockError::Io { path: self.path.clone(), source }),
        }
    }
}

impl Drop for RunLockGuard {
    fn drop(&mut self) {
        if !self.released {
            let _ = std::fs::remove_file(&self.path);
            tracing::debug!(path = %self.path.display(), "run lock released on drop");
        }
    }
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
