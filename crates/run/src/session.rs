// SPDX-License-Identifier: MIT

//! One end-to-end pipeline run.
//!
//! Phases: pull → acquire lock → engine → route new large files → commit
//! → large-object push → metadata push. The lock is held as a guard from
//! just before the engine starts until the run ends, so every exit path,
//! including engine failure, leaves the work tree unlocked. There are no
//! retries; a failed run waits for the next trigger.

use crate::lock::{LockError, RunLock};
use sluice_core::{Config, SystemClock, WorkTree};
use sluice_repo::{
    append_routes, current_routes, Git, GitError, LargeFileScan, DEFAULT_BRANCH, DEFAULT_REMOTE,
};
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Where a run currently is, stamped into logs and errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    Pulling,
    LockedRunning,
    Committing,
    Pushing,
    Done,
    Failed,
}

sluice_core::simple_display! {
    RunPhase {
        Idle => "idle",
        Pulling => "pulling",
        LockedRunning => "locked-running",
        Committing => "committing",
        Pushing => "pushing",
        Done => "done",
        Failed => "failed",
    }
}

/// Engine failure with a diagnostic snapshot of the repository
/// environment the engine saw.
#[derive(Debug)]
pub struct EngineFailure {
    pub command: String,
    pub code: i32,
    pub env: Vec<(String, String)>,
}

impl fmt::Display for EngineFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "`{}` exited with status {}", self.command, self.code)?;
        if !self.env.is_empty() {
            write!(f, "; repository environment:")?;
            for (key, value) in &self.env {
                write!(f, " {key}={value}")?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("a run is already in progress for {}", work_tree.display())]
    Busy { work_tree: PathBuf },
    #[error("git operation failed while {phase}: {source}")]
    Git {
        phase: RunPhase,
        #[source]
        source: GitError,
    },
    #[error("failed to start pipeline engine `{command}`: {source}")]
    EngineSpawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("pipeline engine failed: {0}")]
    Engine(EngineFailure),
    #[error(transparent)]
    Lock(#[from] LockError),
    #[error("route bookkeeping failed: {0}")]
    Routes(#[from] std::io::Error),
}

/// Orchestrates one pipeline run over a work tree.
pub struct RunSession<'a> {
    config: &'a Config,
    work_tree: WorkTree,
    git: Git,
}

impl<'a> RunSession<'a> {
    pub fn new(config: &'a Config, work_tree: WorkTree) -> Self {
        let git = Git::for_work_tree(&work_tree);
        Self { config, work_tree, git }
    }

    pub async fn execute(&self) -> Result<(), SessionError> {
        let project = self.work_tree.project_name().to_string();
        let filter = &self.config.routes.filter;
        let at = |phase| move |source| SessionError::Git { phase, source };

        tracing::info!(%project, phase = %RunPhase::Pulling, "starting pipeline run");
        self.git.pull(DEFAULT_REMOTE, DEFAULT_BRANCH).await.map_err(at(RunPhase::Pulling))?;
        self.git.lob_pull(filter).await.map_err(at(RunPhase::Pulling))?;

        let lock = RunLock::new(&self.work_tree);
        let guard = lock
            .try_acquire(&SystemClock)?
            .ok_or_else(|| SessionError::Busy { work_tree: self.work_tree.root().to_path_buf() })?;

        // From here the guard releases the lock on every exit path.
        tracing::info!(phase = %RunPhase::LockedRunning, "lock acquired, invoking engine");
        self.run_engine(&project).await?;

        tracing::info!(phase = %RunPhase::Committing, "engine finished, reconciling work tree");
        self.route_new_products()?;
        self.git.add_all().await.map_err(at(RunPhase::Committing))?;
        if self.git.is_clean().await.map_err(at(RunPhase::Committing))? {
            tracing::info!("engine produced no changes, skipping commit");
        } else {
            self.git.commit(&self.config.commit.message).await.map_err(at(RunPhase::Committing))?;
        }

        // Large objects go first so every reference the metadata push
        // publishes is already resolvable from the store.
        tracing::info!(phase = %RunPhase::Pushing, "pushing large objects, then commits");
        self.git.lob_push(filter).await.map_err(at(RunPhase::Pushing))?;
        self.git.push(DEFAULT_REMOTE, DEFAULT_BRANCH).await.map_err(at(RunPhase::Pushing))?;

        guard.release()?;
        tracing::info!(%project, phase = %RunPhase::Done, "pipeline run complete");
        Ok(())
    }

    /// Scan the engine's products directory and route large files that
    /// are not yet going through the large-object store.
    fn route_new_products(&self) -> std::io::Result<()> {
        let root = self.work_tree.root();
        let attributes_path = root.join(".gitattributes");
        let current = current_routes(&attributes_path)?;
        let ignore: Vec<String> = current
            .iter()
            .filter_map(|p| Path::new(p).file_name())
            .filter_map(|n| n.to_str())
            .map(str::to_string)
            .collect();

        let products_root = root.join(&self.config.engine.products_dir);
        let mut new_patterns = BTreeSet::new();
        for path in LargeFileScan::new(&products_root, ignore, self.config.routes.threshold_bytes)
        {
            if let Ok(rel) = path.strip_prefix(root) {
                new_patterns.insert(rel.to_string_lossy().into_owned());
            }
        }

        let added = append_routes(&attributes_path, &new_patterns, &self.config.routes.filter)?;
        if added > 0 {
            tracing::info!(added, "routed new large files through the store");
        }
        Ok(())
    }

    /// Invoke the external pipeline engine with inherited stdio, so its
    /// output lands in the run log alongside ours.
    async fn run_engine(&self, project: &str) -> Result<(), SessionError> {
        let engine = &self.config.engine;
        let mut args = vec![
            "run".to_string(),
            "--reporter".to_string(),
            "web".to_string(),
            "--reporter-url".to_string(),
            self.config.reporter_url(project),
            "--runner".to_string(),
            engine.runner.clone(),
            "-n".to_string(),
            engine.jobs.to_string(),
        ];
        if engine.grid_runners.contains(&engine.runner) {
            args.push("--partition".to_string());
            args.push(engine.partition.clone());
        }

        let mut command = tokio::process::Command::new(&engine.command);
        command.args(&args).current_dir(self.work_tree.root());
        command.stdin(std::process::Stdio::null());
        if let Some(repo_env) = self.git.repo_env() {
            for (key, value) in repo_env.as_pairs() {
                command.env(key, value);
            }
        }

        let status = command
            .status()
            .await
            .map_err(|source| SessionError::EngineSpawn { command: engine.command.clone(), source })?;
        if status.success() {
            return Ok(());
        }

        let mut env = self.git.repo_env().map(|e| e.as_pairs()).unwrap_or_default();
        env.push(("cwd".to_string(), self.work_tree.root().display().to_string()));
        Err(SessionError::Engine(EngineFailure {
            command: format!("{} {}", engine.command, args.join(" ")),
            code: status.code().unwrap_or(-1),
            env,
        }))
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
