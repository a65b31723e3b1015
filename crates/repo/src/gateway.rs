// SPDX-License-Identifier: MIT

//! Subprocess gateway to the version-control system.
//!
//! Every invocation receives an explicit working directory and, when the
//! caller operates on a specific work tree, an explicit set of repository
//! environment variables. Nothing here mutates ambient process state, so
//! the gateway is safe to use from several call sites at once.

use sluice_core::WorkTree;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_REMOTE: &str = "origin";
pub const DEFAULT_BRANCH: &str = "master";

/// A failed interaction with the underlying tool.
///
/// Fatal for the current run unless the caller explicitly recovers
/// (setup rollback is the one place that does).
#[derive(Debug, Error)]
pub enum GitError {
    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("`{command}` exited with status {code}: {stderr}")]
    Exit { command: String, code: i32, stderr: String },
    #[error("unexpected output from `{command}`")]
    MalformedOutput { command: String },
}

/// Repository environment passed explicitly to each subprocess.
///
/// The detached job process operates outside the metadata directory's
/// default assumptions, so all four derived variables are spelled out.
#[derive(Debug, Clone)]
pub struct RepoEnv {
    pub git_dir: PathBuf,
    pub work_tree: PathBuf,
    pub index_file: PathBuf,
    pub object_dir: PathBuf,
}

impl RepoEnv {
    /// The variables that redirect repository discovery.
    pub const VAR_NAMES: [&'static str; 4] =
        ["GIT_DIR", "GIT_WORK_TREE", "GIT_INDEX_FILE", "GIT_OBJECT_DIRECTORY"];

    pub fn for_work_tree(tree: &WorkTree) -> Self {
        Self {
            git_dir: tree.git_dir(),
            work_tree: tree.root().to_path_buf(),
            index_file: tree.index_file(),
            object_dir: tree.object_dir(),
        }
    }

    fn apply(&self, command: &mut tokio::process::Command) {
        command
            .env("GIT_DIR", &self.git_dir)
            .env("GIT_WORK_TREE", &self.work_tree)
            .env("GIT_INDEX_FILE", &self.index_file)
            .env("GIT_OBJECT_DIRECTORY", &self.object_dir);
    }

    /// The variables as key/value pairs, for diagnostic snapshots.
    pub fn as_pairs(&self) -> Vec<(String, String)> {
        vec![
            ("GIT_DIR".to_string(), self.git_dir.display().to_string()),
            ("GIT_WORK_TREE".to_string(), self.work_tree.display().to_string()),
            ("GIT_INDEX_FILE".to_string(), self.index_file.display().to_string()),
            ("GIT_OBJECT_DIRECTORY".to_string(), self.object_dir.display().to_string()),
        ]
    }
}

/// Driver for `git` and its large-object extension subcommands.
pub struct Git {
    cwd: PathBuf,
    repo_env: Option<RepoEnv>,
}

impl Git {
    /// Gateway without repository environment (init, clone).
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self { cwd: cwd.into(), repo_env: None }
    }

    /// Gateway bound to one work tree's repository environment.
    pub fn for_work_tree(tree: &WorkTree) -> Self {
        Self { cwd: tree.root().to_path_buf(), repo_env: Some(RepoEnv::for_work_tree(tree)) }
    }

    pub fn repo_env(&self) -> Option<&RepoEnv> {
        self.repo_env.as_ref()
    }

    /// Run one git invocation, capturing output.
    ///
    /// Returns trimmed stdout on success; a non-zero exit becomes
    /// [`GitError::Exit`] with captured stderr.
    async fn run(&self, args: &[&str]) -> Result<String, GitError> {
        let command_line = format!("git {}", args.join(" "));
        tracing::debug!(command = %command_line, cwd = %self.cwd.display(), "running");

        let mut command = tokio::process::Command::new("git");
        command.args(args).current_dir(&self.cwd);
        match &self.repo_env {
            Some(env) => env.apply(&mut command),
            // Without a bound repository environment, discovery must
            // start from `cwd`, not from variables a hook exported.
            None => {
                for key in RepoEnv::VAR_NAMES {
                    command.env_remove(key);
                }
            }
        }

        let output = command
            .output()
            .await
            .map_err(|source| GitError::Spawn { command: command_line.clone(), source })?;

        if !output.status.success() {
            return Err(GitError::Exit {
                command: command_line,
                code: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    pub async fn init_bare(&self, path: &Path) -> Result<(), GitError> {
        self.run(&["init", "--bare", "--quiet", &path.display().to_string()]).await?;
        Ok(())
    }

    pub async fn clone(&self, source: &Path, dest: &Path) -> Result<(), GitError> {
        self.run(&[
            "clone",
            "--quiet",
            &source.display().to_string(),
            &dest.display().to_string(),
        ])
        .await?;
        Ok(())
    }

    pub async fn config(&self, key: &str, value: &str) -> Result<(), GitError> {
        self.run(&["config", key, value]).await?;
        Ok(())
    }

    /// Pin the checked-out branch name regardless of the host's
    /// `init.defaultBranch` setting.
    pub async fn set_head_branch(&self, branch: &str) -> Result<(), GitError> {
        self.run(&["symbolic-ref", "HEAD", &format!("refs/heads/{branch}")]).await?;
        Ok(())
    }

    pub async fn pull(&self, remote: &str, branch: &str) -> Result<(), GitError> {
        self.run(&["pull", "--quiet", remote, branch]).await?;
        Ok(())
    }

    pub async fn push(&self, remote: &str, branch: &str) -> Result<(), GitError> {
        self.run(&["push", "--quiet", remote, branch]).await?;
        Ok(())
    }

    pub async fn add_all(&self) -> Result<(), GitError> {
        self.run(&["add", "."]).await?;
        Ok(())
    }

    pub async fn commit(&self, message: &str) -> Result<(), GitError> {
        self.run(&["commit", "--quiet", "-m", message]).await?;
        Ok(())
    }

    /// True when `status --porcelain` reports nothing to commit.
    pub async fn is_clean(&self) -> Result<bool, GitError> {
        Ok(self.run(&["status", "--porcelain"]).await?.is_empty())
    }

    /// Author name and subject line of a revision, NUL-separated so
    /// authors with spaces parse unambiguously.
    pub async fn commit_author_and_message(&self, rev: &str) -> Result<(String, String), GitError> {
        let raw = self.run(&["show", "-s", "--format=%an%x00%s", rev]).await?;
        match raw.split_once('\0') {
            Some((author, message)) => Ok((author.to_string(), message.to_string())),
            None => Err(GitError::MalformedOutput { command: format!("git show -s {rev}") }),
        }
    }

    pub async fn short_hash(&self, rev: &str) -> Result<String, GitError> {
        self.run(&["rev-parse", "--short", rev]).await
    }

    /// `git <filter> init` — prepare the large-object extension.
    pub async fn lob_init(&self, filter: &str) -> Result<(), GitError> {
        self.run(&[filter, "init"]).await?;
        Ok(())
    }

    /// `git <filter> pull` — fetch large objects from the store.
    pub async fn lob_pull(&self, filter: &str) -> Result<(), GitError> {
        self.run(&[filter, "pull"]).await?;
        Ok(())
    }

    /// `git <filter> push` — upload large objects to the store.
    pub async fn lob_push(&self, filter: &str) -> Result<(), GitError> {
        self.run(&[filter, "push"]).await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "gateway_tests.rs"]
mod tests;
