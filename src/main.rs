//! termshield - safety checks for agent proposed terminal commands
//!
//! Thin binary entry point that delegates to the handlers in `cli`.

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;

mod cli;
mod main_helpers;

use cli::{AnalyzeCommandOptions, Cli, Commands};
use main_helpers::{initialize_tracing, load_config};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Cli::parse();

    initialize_tracing().ok();

    let manager = load_config(args.config.as_deref())?;
    let config = &manager.config().terminal;

    match args.command {
        Commands::Analyze {
            command,
            workspace_folders,
            policy,
            chat_session_id,
        } => {
            cli::handle_analyze_command(
                config,
                AnalyzeCommandOptions {
                    command,
                    workspace_folders,
                    policy,
                    chat_session_id,
                },
                args.json,
            )
            .await
        }
        Commands::Rewrite { command } => cli::handle_rewrite_command(config, &command, args.json).await,
        Commands::SubCommands { command } => {
            cli::handle_sub_commands_command(config, &command, args.json).await
        }
        Commands::FileWrites { command } => {
            cli::handle_file_writes_command(config, &command, args.json).await
        }
    }
}
