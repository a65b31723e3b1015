// SPDX-License-Identifier: MIT

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! `sluice` - set up and manage hook-triggered pipeline repositories

mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use sluice_core::Config;

#[derive(Parser)]
#[command(name = "sluice", version, about = "Set up and manage pipeline-run repositories")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a pipeline repository
    Setup(commands::setup::SetupArgs),
    /// Pre-push trigger handler (installed as the update hook)
    Update(commands::hooks::HookArgs),
    /// Post-push trigger handler (installed as the post-receive hook)
    PostReceive(commands::hooks::HookArgs),
    /// Detached pipeline run (invoked by the launcher)
    #[command(hide = true)]
    RunSession(commands::run_session::RunSessionArgs),
    /// Report whether a run is active for a work tree
    Status(commands::status::StatusArgs),
    /// Remove a stale run lock
    Unlock(commands::unlock::UnlockArgs),
    /// Print the effective or default configuration
    SpewConfig(commands::spew_config::SpewConfigArgs),
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("SLUICE_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run().await {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            std::process::ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load()?;
    match cli.command {
        Command::Setup(args) => commands::setup::setup(&config, args).await,
        Command::Update(args) => commands::hooks::update(&config, args).await,
        Command::PostReceive(args) => commands::hooks::post_receive(&config, args).await,
        Command::RunSession(args) => commands::run_session::run_session(&config, args).await,
        Command::Status(args) => commands::status::status(&config, args),
        Command::Unlock(args) => commands::unlock::unlock(&config, args),
        Command::SpewConfig(args) => commands::spew_config::spew_config(&config, args),
    }
}
