// SPDX-License-Identifier: MIT

//! Work-tree model.
//!
//! A `WorkTree` is the checked-out repository a pipeline run mutates. All
//! derived paths (metadata directory, lock marker, log file) hang off its
//! root so that one value carries everything a run needs to know about
//! where it operates.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable the hook mechanism sets to the metadata directory.
pub const GIT_DIR_ENV_VAR: &str = "GIT_DIR";

/// Environment variable the installed hook scripts export with the bare
/// repository's path, so trigger handlers can classify the pushed
/// revision (the work tree lags behind the bare until the next pull).
pub const BARE_DIR_ENV_VAR: &str = "SLUICE_BARE_DIR";

/// File name of the run-in-progress marker, kept inside the metadata
/// directory so staging the whole tree can never commit a held lock.
const LOCK_FILE_NAME: &str = "sluice-run.lock";

/// Suffix stripped from the directory basename to form the project name.
const WORK_SUFFIX: &str = ".work";

#[derive(Debug, Error)]
pub enum WorkTreeError {
    #[error("{GIT_DIR_ENV_VAR} is not set; not invoked from a repository hook?")]
    MissingGitDir,
    #[error("cannot resolve work tree from {git_dir}")]
    BadGitDir { git_dir: PathBuf },
}

/// A checked-out repository plus its derived paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkTree {
    root: PathBuf,
}

impl WorkTree {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Derive the work tree from a hook's metadata directory path: the
    /// work tree is the parent of the `.git` directory the hook exported.
    pub fn from_git_dir(git_dir: &Path) -> Result<Self, WorkTreeError> {
        let absolute = std::path::absolute(git_dir)
            .map_err(|_| WorkTreeError::BadGitDir { git_dir: git_dir.to_path_buf() })?;
        let root = absolute
            .parent()
            .ok_or_else(|| WorkTreeError::BadGitDir { git_dir: git_dir.to_path_buf() })?;
        Ok(Self::new(root))
    }

    /// Derive the work tree from the hook environment (`$GIT_DIR`).
    pub fn from_env() -> Result<Self, WorkTreeError> {
        let git_dir = std::env::var(GIT_DIR_ENV_VAR).map_err(|_| WorkTreeError::MissingGitDir)?;
        Self::from_git_dir(Path::new(&git_dir))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Version-control metadata directory.
    pub fn git_dir(&self) -> PathBuf {
        self.root.join(".git")
    }

    pub fn index_file(&self) -> PathBuf {
        self.git_dir().join("index")
    }

    pub fn object_dir(&self) -> PathBuf {
        self.git_dir().join("objects")
    }

    /// Run-lock marker path.
    pub fn lock_path(&self) -> PathBuf {
        self.git_dir().join(LOCK_FILE_NAME)
    }

    /// Project name: the directory basename with a trailing `.work` stripped.
    pub fn project_name(&self) -> &str {
        let name = self.root.file_name().and_then(|n| n.to_str()).unwrap_or("repo");
        name.strip_suffix(WORK_SUFFIX).unwrap_or(name)
    }

    /// Per-project run log, next to the work tree.
    pub fn log_path(&self) -> PathBuf {
        let log_name = format!("{}.log", self.project_name());
        match self.root.parent() {
            Some(parent) => parent.join(log_name),
            None => PathBuf::from(log_name),
        }
    }
}

#[cfg(test)]
#[path = "worktree_tests.rs"]
mod tests;
