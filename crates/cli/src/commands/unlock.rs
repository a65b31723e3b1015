// SPDX-License-Identifier: MIT

//! `sluice unlock` - remove a stale run lock.
//!
//! Staleness is never cleared automatically; this is the explicit
//! operator action. Without `--force` the lock is only removed when its
//! owner process is verifiably gone.

use anyhow::{bail, Result};
use clap::Args;
use sluice_core::{Config, WorkTree};
use sluice_run::{LockError, RunLock};
use std::path::PathBuf;

#[derive(Args)]
pub struct UnlockArgs {
    /// Work tree whose lock to remove
    #[arg(long, default_value = ".")]
    pub work_tree: PathBuf,

    /// Remove the lock even if the owning process is still alive
    #[arg(long)]
    pub force: bool,
}

pub fn unlock(_config: &Config, args: UnlockArgs) -> Result<()> {
    let tree = WorkTree::new(&args.work_tree);
    let lock = RunLock::new(&tree);

    match lock.owner() {
        Ok(None) => {
            println!("{}: no lock held", tree.project_name());
            return Ok(());
        }
        Ok(Some(owner)) if owner.alive() && !args.force => {
            bail!(
                "run lock for {} is held by live process {} (started {}); \
                 use --force to remove it anyway",
                tree.project_name(),
                owner.pid,
                owner.acquired_at,
            );
        }
        Ok(Some(_)) => {}
        Err(LockError::Malformed { path }) if args.force => {
            tracing::warn!(path = %path.display(), "removing malformed lock marker");
        }
        Err(LockError::Malformed { path }) => {
            bail!(
                "lock marker {} is malformed; use --force to remove it",
                path.display()
            );
        }
        Err(e) => return Err(e.into()),
    }

    if lock.force_release()? {
        println!("{}: lock removed", tree.project_name());
    } else {
        println!("{}: no lock held", tree.project_name());
    }
    Ok(())
}
