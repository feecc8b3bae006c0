//! Entry point used by the terminal tool before a command is run.
//!
//! ```text
//! request -> rewriter chain -> file write analysis -> PreparedCommand
//! ```

use std::sync::Arc;

use serde::Serialize;
use url::Url;
use uuid::Uuid;

use termshield_config::{BlockDetectedFileWrites, TerminalSafetyConfig};

use crate::command_safety::file_write_analyzer::{
    AnalysisResult, CommandLineFileWriteAnalyzer, FileWriteAnalysisOptions,
};
use crate::command_safety::rewriter::{
    AppliedRewrite, CommandLineRewriteOptions, CommandLineRewriterChain,
};
use crate::command_safety::shell_parser::TreeSitterCommandParser;
use crate::command_safety::write_target::WriteTargetResolver;
use crate::error::ParserResult;
use crate::shell::{OperatingSystem, ShellLanguage};

/// A command the agent wants to run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalCommandRequest {
    pub command_line: String,
    pub shell: String,
    pub os: OperatingSystem,
    pub cwd: Option<Url>,
    pub workspace_folders: Vec<Url>,
    pub chat_session_id: Option<String>,
}

/// A command after rewriting, with its file write analysis
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreparedCommand {
    pub terminal_tool_session_id: String,
    /// Links the command between the tool and the terminal host
    pub terminal_command_id: String,
    pub original: String,
    /// Set only when a rewriter changed the command line
    pub tool_edited: Option<String>,
    pub rewrites: Vec<AppliedRewrite>,
    pub language: ShellLanguage,
    pub analysis: AnalysisResult,
}

impl PreparedCommand {
    /// Command line that should actually be executed
    pub fn command_line(&self) -> &str {
        self.tool_edited.as_deref().unwrap_or(&self.original)
    }

    /// All disclaimers joined for display, if any
    pub fn disclaimer(&self) -> Option<String> {
        (!self.analysis.disclaimers.is_empty()).then(|| self.analysis.disclaimers.join(" "))
    }
}

pub struct TerminalCommandSafety {
    parser: Arc<TreeSitterCommandParser>,
    rewriters: CommandLineRewriterChain,
    file_writes: CommandLineFileWriteAnalyzer,
    policy: BlockDetectedFileWrites,
}

impl TerminalCommandSafety {
    pub fn new(config: &TerminalSafetyConfig) -> Self {
        Self::with_parser(Arc::new(TreeSitterCommandParser::from_config(config)), config)
    }

    pub fn with_parser(parser: Arc<TreeSitterCommandParser>, config: &TerminalSafetyConfig) -> Self {
        Self {
            rewriters: CommandLineRewriterChain::standard(Arc::clone(&parser)),
            file_writes: CommandLineFileWriteAnalyzer::new(
                Arc::clone(&parser),
                WriteTargetResolver::new(&config.null_devices),
            ),
            parser,
            policy: config.block_detected_file_writes,
        }
    }

    pub fn parser(&self) -> &Arc<TreeSitterCommandParser> {
        &self.parser
    }

    pub fn policy(&self) -> BlockDetectedFileWrites {
        self.policy
    }

    pub fn rewriters(&self) -> &CommandLineRewriterChain {
        &self.rewriters
    }

    /// Rewrite the command line, then analyze what will actually run.
    pub async fn prepare(&self, request: &TerminalCommandRequest) -> ParserResult<PreparedCommand> {
        let terminal_tool_session_id = Uuid::new_v4().to_string();
        let terminal_command_id = format!("tool-{}", Uuid::new_v4());
        let language = ShellLanguage::for_shell(&request.shell, request.os);

        let rewrite = self
            .rewriters
            .rewrite(&CommandLineRewriteOptions {
                command_line: request.command_line.clone(),
                cwd: request.cwd.clone(),
                shell: request.shell.clone(),
                os: request.os,
            })
            .await;

        let analysis = self
            .file_writes
            .analyze(
                &FileWriteAnalysisOptions {
                    command_line: rewrite.command_line.clone(),
                    cwd: request.cwd.clone(),
                    shell: request.shell.clone(),
                    os: request.os,
                    language,
                    terminal_tool_session_id: terminal_tool_session_id.clone(),
                    chat_session_id: request.chat_session_id.clone(),
                },
                self.policy,
                &request.workspace_folders,
            )
            .await?;

        let tool_edited = (rewrite.command_line != request.command_line).then_some(rewrite.command_line);
        Ok(PreparedCommand {
            terminal_tool_session_id,
            terminal_command_id,
            original: request.command_line.clone(),
            tool_edited,
            rewrites: rewrite.applied,
            language,
            analysis,
        })
    }
}
