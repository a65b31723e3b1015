// SPDX-License-Identifier: MIT

//! `sluice spew-config` - print the effective or default configuration.

use anyhow::Result;
use clap::Args;
use sluice_core::Config;

#[derive(Args)]
pub struct SpewConfigArgs {
    /// Print the built-in defaults instead of the discovered configuration
    #[arg(short, long)]
    pub defaults: bool,

    /// Emit JSON instead of TOML
    #[arg(long)]
    pub json: bool,
}

pub fn spew_config(config: &Config, args: SpewConfigArgs) -> Result<()> {
    let defaults;
    let config = if args.defaults {
        defaults = Config::default();
        &defaults
    } else {
        config
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(config)?);
    } else {
        print!("{}", toml::to_string_pretty(config)?);
    }
    Ok(())
}
