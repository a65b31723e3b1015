// SPDX-License-Identifier: MIT

//! `sluice status` - report whether a run is active for a work tree.

use crate::output::format_or_json;
use anyhow::Result;
use clap::Args;
use serde_json::json;
use sluice_core::{Config, WorkTree};
use sluice_run::RunLock;
use std::path::PathBuf;

#[derive(Args)]
pub struct StatusArgs {
    /// Work tree to inspect
    #[arg(long, default_value = ".")]
    pub work_tree: PathBuf,

    /// Emit machine-readable JSON
    #[arg(long)]
    pub json: bool,
}

pub fn status(config: &Config, args: StatusArgs) -> Result<()> {
    let tree = WorkTree::new(&args.work_tree);
    let project = tree.project_name().to_string();
    let url = config.reporter_url(&project);
    let lock = RunLock::new(&tree);

    let Some(owner) = lock.owner()? else {
        return format_or_json(
            args.json,
            &json!({ "project": project, "running": false }),
            || println!("{project}: idle"),
        );
    };

    let alive = owner.alive();
    format_or_json(
        args.json,
        &json!({
            "project": project,
            "running": true,
            "pid": owner.pid,
            "acquired_at": owner.acquired_at.to_rfc3339(),
            "owner_alive": alive,
            "log": tree.log_path(),
            "reporter_url": url,
        }),
        || {
            println!("{project}: run in progress (pid {}, since {})", owner.pid, owner.acquired_at);
            if !alive {
                println!("  owner process is gone; the lock looks stale (see `sluice unlock`)");
            }
            println!("  log: {}", tree.log_path().display());
            println!("  status: {url}");
        },
    )
}
