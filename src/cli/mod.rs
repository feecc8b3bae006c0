//! Subcommand handlers for the `termshield` binary

use std::process::ExitCode;

use anyhow::{Context, Result};
use serde::Serialize;
use termshield_config::{BlockDetectedFileWrites, TerminalSafetyConfig};
use termshield_core::{
    CommandLineRewriteOptions, CommandLineRewriterChain, ShellLanguage, TerminalCommandRequest,
    TerminalCommandSafety, TreeSitterCommandParser, WriteTargetResolver,
};
use url::Url;

use crate::main_helpers::parse_location;

pub mod args;

pub use args::{Cli, CommandArgs, Commands};

/// Exit status when a command needs the user's approval
const EXIT_BLOCKED: u8 = 2;

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{json}");
    Ok(())
}

fn cwd(command: &CommandArgs) -> Result<Option<Url>> {
    command
        .cwd
        .as_deref()
        .map(parse_location)
        .transpose()
        .context("Invalid --cwd")
}

fn language(command: &CommandArgs) -> ShellLanguage {
    ShellLanguage::for_shell(&command.shell, command.os())
}

pub struct AnalyzeCommandOptions {
    pub command: CommandArgs,
    pub workspace_folders: Vec<String>,
    pub policy: Option<BlockDetectedFileWrites>,
    pub chat_session_id: Option<String>,
}

pub async fn handle_analyze_command(
    config: &TerminalSafetyConfig,
    options: AnalyzeCommandOptions,
    json: bool,
) -> Result<ExitCode> {
    let mut config = config.clone();
    if let Some(policy) = options.policy {
        config.block_detected_file_writes = policy;
    }

    let workspace_folders = options
        .workspace_folders
        .iter()
        .map(|folder| {
            parse_location(folder).with_context(|| format!("Invalid --workspace-folder {folder}"))
        })
        .collect::<Result<Vec<_>>>()?;

    let request = TerminalCommandRequest {
        command_line: options.command.command_line.clone(),
        shell: options.command.shell.clone(),
        os: options.command.os(),
        cwd: cwd(&options.command)?,
        workspace_folders,
        chat_session_id: options.chat_session_id,
    };
    tracing::debug!(
        policy = %config.block_detected_file_writes,
        shell = %request.shell,
        os = %request.os,
        workspace_folders = request.workspace_folders.len(),
        "analyzing command line"
    );

    let safety = TerminalCommandSafety::new(&config);
    let prepared = safety
        .prepare(&request)
        .await
        .context("Failed to analyze command line")?;

    if json {
        print_json(&prepared)?;
    } else {
        println!("command: {}", prepared.command_line());
        for rewrite in &prepared.rewrites {
            println!("rewrite: {} ({})", rewrite.rewriter, rewrite.reasoning);
        }
        for disclaimer in &prepared.analysis.disclaimers {
            println!("write: {disclaimer}");
        }
        let verdict = if prepared.analysis.is_auto_approve_allowed {
            "allowed"
        } else {
            "requires approval"
        };
        println!("auto approve: {verdict}");
    }

    Ok(if prepared.analysis.is_auto_approve_allowed {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(EXIT_BLOCKED)
    })
}

pub async fn handle_rewrite_command(
    config: &TerminalSafetyConfig,
    command: &CommandArgs,
    json: bool,
) -> Result<ExitCode> {
    let parser = std::sync::Arc::new(TreeSitterCommandParser::from_config(config));
    let chain = CommandLineRewriterChain::standard(parser);
    let rewrite = chain
        .rewrite(&CommandLineRewriteOptions {
            command_line: command.command_line.clone(),
            cwd: cwd(command)?,
            shell: command.shell.clone(),
            os: command.os(),
        })
        .await;

    if json {
        print_json(&rewrite)?;
    } else {
        println!("{}", rewrite.command_line);
    }
    Ok(ExitCode::SUCCESS)
}

pub async fn handle_sub_commands_command(
    config: &TerminalSafetyConfig,
    command: &CommandArgs,
    json: bool,
) -> Result<ExitCode> {
    let parser = TreeSitterCommandParser::from_config(config);
    let sub_commands = parser
        .extract_sub_commands(language(command), &command.command_line)
        .await
        .context("Failed to parse command line")?;

    if json {
        print_json(&sub_commands)?;
    } else {
        for sub_command in &sub_commands {
            println!("{sub_command}");
        }
    }
    Ok(ExitCode::SUCCESS)
}

pub async fn handle_file_writes_command(
    config: &TerminalSafetyConfig,
    command: &CommandArgs,
    json: bool,
) -> Result<ExitCode> {
    let parser = TreeSitterCommandParser::from_config(config);
    let resolver = WriteTargetResolver::new(&config.null_devices);
    let language = language(command);
    let cwd = cwd(command)?;

    let targets: Vec<_> = parser
        .get_file_writes(language, &command.command_line)
        .await
        .context("Failed to parse command line")?
        .iter()
        .map(|raw| resolver.resolve(raw, language, cwd.as_ref()))
        .collect();

    if json {
        print_json(&targets)?;
    } else {
        for target in &targets {
            let location = target.location.as_ref().map_or("-", Url::as_str);
            println!("{}\t{}\t{location}", target.kind, target.raw);
        }
    }
    Ok(ExitCode::SUCCESS)
}
