// SPDX-License-Identifier: MIT

//! `sluice setup` - create a pipeline repository pair.

use anyhow::Result;
use clap::Args;
use sluice_core::Config;
use sluice_run::{setup_repo, SetupOptions};
use std::path::PathBuf;

#[derive(Args)]
pub struct SetupArgs {
    /// Where to create the work tree; the bare repo lands next to it as `<dir>.git`
    #[arg(short, long)]
    pub dir: PathBuf,

    /// Main pipeline to scaffold the tree for
    #[arg(short, long)]
    pub pipeline: String,

    /// Additional optional pipelines
    #[arg(short = 'A', long = "append")]
    pub extra_pipelines: Vec<String>,

    /// On failure, keep the partially created repositories for inspection
    #[arg(long)]
    pub keep_partial: bool,
}

pub async fn setup(config: &Config, args: SetupArgs) -> Result<()> {
    let opts = SetupOptions {
        repo_path: args.dir,
        pipeline: args.pipeline,
        extra_pipelines: args.extra_pipelines,
        keep_partial: args.keep_partial,
    };
    setup_repo(config, &opts).await?;
    println!("Created pipeline repository at {}", opts.repo_path.display());
    Ok(())
}
