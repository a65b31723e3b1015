// SPDX-License-Identifier: MIT

//! `sluice update` / `sluice post-receive` - trigger entry points.
//!
//! Both handlers start by letting the system's own autocommit through,
//! otherwise every completed run would trigger the next one. They look at
//! different revisions: `update` fires mid-push while the run still holds
//! the lock, so it classifies the work tree's HEAD (the freshly created
//! autocommit); `post-receive` fires after the refs moved and classifies
//! the pushed tip in the bare repository, because the work tree lags
//! behind it until the next run pulls.

use anyhow::{bail, Context, Result};
use clap::Args;
use sluice_core::{worktree::BARE_DIR_ENV_VAR, Config, WorkTree};
use sluice_repo::Git;
use sluice_run::{is_autocommit, launch_detached, RunLock};

#[derive(Args)]
pub struct HookArgs {
    /// Ref arguments forwarded by the hook mechanism (unused)
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub refs: Vec<String>,
}

pub async fn update(config: &Config, _args: HookArgs) -> Result<()> {
    let tree = WorkTree::from_env()?;
    let git = Git::for_work_tree(&tree);
    if is_autocommit(&git, "HEAD", &config.commit).await? {
        return Ok(());
    }
    ensure_idle(config, &tree)
}

pub async fn post_receive(config: &Config, _args: HookArgs) -> Result<()> {
    let tree = WorkTree::from_env()?;
    // The bare's HEAD tracks master, which the push just moved.
    let trigger_git = match std::env::var(BARE_DIR_ENV_VAR) {
        Ok(bare_dir) => Git::new(bare_dir),
        Err(_) => Git::for_work_tree(&tree),
    };
    if is_autocommit(&trigger_git, "HEAD", &config.commit).await? {
        return Ok(());
    }
    ensure_idle(config, &tree)?;

    let url = config.reporter_url(tree.project_name());
    println!("Launching pipeline run: {url}");

    let binary = std::env::current_exe().context("cannot locate own binary")?;
    let args = ["run-session", "--work-tree"];
    let work_tree_arg = tree.root().display().to_string();
    let full_args: Vec<&str> = args.iter().copied().chain([work_tree_arg.as_str()]).collect();
    launch_detached(&binary, &full_args, tree.root(), &tree.log_path())
        .context("failed to detach pipeline run")?;
    Ok(())
}

/// Reject the trigger when a run is already active, pointing the user at
/// the status URL. Busy pushes are rejected, never queued.
fn ensure_idle(config: &Config, tree: &WorkTree) -> Result<()> {
    let lock = RunLock::new(tree);
    if lock.is_held() {
        let url = config.reporter_url(tree.project_name());
        println!("ERROR - the current run isn't finished. Check its status at {url}");
        bail!("a run is already in progress for {}", tree.project_name());
    }
    Ok(())
}
