//! Command line arguments for the `termshield` binary

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use termshield_config::BlockDetectedFileWrites;
use termshield_core::OperatingSystem;

#[derive(Debug, Parser)]
#[command(name = "termshield")]
#[command(about = "Check terminal commands proposed by an agent before they run")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file to layer over the user configuration
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Rewrite a command line and decide whether it can be auto approved
    ///
    /// Exits with status 0 when the command may run without confirmation
    /// and 2 when at least one file write needs the user's approval.
    ///
    /// Examples:
    ///   termshield analyze "echo hi > notes.txt" --cwd /workspace --workspace-folder /workspace
    ///   termshield analyze "Get-Date && Get-Date > now.txt" --shell pwsh --os windows
    Analyze {
        #[command(flatten)]
        command: CommandArgs,

        /// Workspace folder a write may land in (can be repeated)
        #[arg(long = "workspace-folder", value_name = "PATH_OR_URI")]
        workspace_folders: Vec<String>,

        /// Override the configured file write policy
        #[arg(long, value_name = "POLICY")]
        policy: Option<BlockDetectedFileWrites>,

        /// Chat session the command belongs to
        #[arg(long)]
        chat_session_id: Option<String>,
    },

    /// Apply the command line rewriters and print the result
    Rewrite {
        #[command(flatten)]
        command: CommandArgs,
    },

    /// List every simple command contained in a command line
    SubCommands {
        #[command(flatten)]
        command: CommandArgs,
    },

    /// List the output redirection targets of a command line
    FileWrites {
        #[command(flatten)]
        command: CommandArgs,
    },
}

/// Options shared by every subcommand
#[derive(Debug, Clone, Args)]
pub struct CommandArgs {
    /// Command line to inspect
    pub command_line: String,

    /// Shell executable the command would run in
    #[arg(long, default_value = "bash")]
    pub shell: String,

    /// Operating system of the terminal (defaults to the host)
    #[arg(long)]
    pub os: Option<OperatingSystem>,

    /// Working directory, as a path or a URI
    #[arg(long, value_name = "PATH_OR_URI")]
    pub cwd: Option<String>,
}

impl CommandArgs {
    pub fn os(&self) -> OperatingSystem {
        self.os.unwrap_or_default()
    }
}
