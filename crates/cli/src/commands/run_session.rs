// SPDX-License-Identifier: MIT

//! `sluice run-session` - the detached job process.
//!
//! The launcher bound our stdout/stderr to the per-project run log
//! before exec, so everything the session and the engine print lands
//! there. The log file is synced to disk before the process exits.

use anyhow::Result;
use clap::Args;
use sluice_core::{Config, WorkTree};
use sluice_run::RunSession;
use std::io::Write;
use std::path::PathBuf;

#[derive(Args)]
pub struct RunSessionArgs {
    /// Work tree this run operates on
    #[arg(long)]
    pub work_tree: PathBuf,
}

pub async fn run_session(config: &Config, args: RunSessionArgs) -> Result<()> {
    let tree = WorkTree::new(&args.work_tree);
    let log_path = tree.log_path();

    let result = RunSession::new(config, tree).execute().await;
    if let Err(e) = &result {
        tracing::error!(error = %e, "pipeline run failed");
    }

    let _ = std::io::stdout().flush();
    if let Ok(log) = std::fs::OpenOptions::new().append(true).open(&log_path) {
        let _ = log.sync_all();
    }

    result.map_err(Into::into)
}
