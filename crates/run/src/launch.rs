// SPDX-License-Identifier: MIT

//! Detached job launcher.
//!
//! The trigger handler must return as soon as the job is underway, so the
//! job runs as a separate process in its own process group: it survives
//! the handler's exit and whatever session (e.g. the hosting server's
//! hook invocation) delivered the trigger. Standard output and error are
//! bound to the per-project run log; stdin is the null device. The
//! standard library opens its descriptors close-on-exec, so the child
//! starts with nothing else inherited — in particular no open sockets
//! belonging to the process that ran the hook.

use std::ffi::OsStr;
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("failed to open run log {path}: {source}")]
    OpenLog {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to detach {program}: {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Spawn `program args` detached, logging to `log_path`. Returns the
/// child pid without waiting for it.
///
/// A spawn failure here is the last chance to tell the triggering side
/// anything, so callers must surface it on their own error stream.
pub fn launch_detached(
    program: &Path,
    args: &[impl AsRef<OsStr>],
    cwd: &Path,
    log_path: &Path,
) -> Result<u32, LaunchError> {
    let log = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .mode(0o644)
        .open(log_path)
        .map_err(|source| LaunchError::OpenLog { path: log_path.to_path_buf(), source })?;
    let log_for_stderr = log
        .try_clone()
        .map_err(|source| LaunchError::OpenLog { path: log_path.to_path_buf(), source })?;

    let child = Command::new(program)
        .args(args)
        .current_dir(cwd)
        .process_group(0)
        .stdin(Stdio::null())
        .stdout(Stdio::from(log))
        .stderr(Stdio::from(log_for_stderr))
        .spawn()
        .map_err(|source| LaunchError::Spawn { program: program.to_path_buf(), source })?;

    let pid = child.id();
    tracing::info!(pid, program = %program.display(), log = %log_path.display(), "job detached");
    Ok(pid)
}

#[cfg(test)]
#[path = "launch_tests.rs"]
mod tests;
