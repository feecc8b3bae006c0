//! Safety checks for terminal commands proposed by coding agents.
//!
//! Command lines are parsed with tree-sitter (bash and PowerShell), rewritten
//! where the agent's phrasing would misbehave in the target shell, and
//! analyzed for file writes so a host can decide whether the command may run
//! without asking the user.
//!
//! ```no_run
//! use termshield_config::TerminalSafetyConfig;
//! use termshield_core::{OperatingSystem, TerminalCommandRequest, TerminalCommandSafety};
//!
//! # async fn run() -> Result<(), termshield_core::CommandParserError> {
//! let safety = TerminalCommandSafety::new(&TerminalSafetyConfig::default());
//! let prepared = safety
//!     .prepare(&TerminalCommandRequest {
//!         command_line: "echo hello > out.txt".into(),
//!         shell: "/bin/bash".into(),
//!         os: OperatingSystem::Linux,
//!         cwd: url::Url::parse("file:///workspace").ok(),
//!         workspace_folders: vec![],
//!         chat_session_id: None,
//!     })
//!     .await?;
//! assert!(!prepared.analysis.is_auto_approve_allowed);
//! # Ok(())
//! # }
//! ```

pub mod command_safety;
pub mod error;
pub mod grammar;
pub mod shell;

pub use command_safety::{
    AnalysisResult, BlockReason, CommandLineFileWriteAnalyzer, CommandLineRewriteOptions,
    CommandLineRewriter, CommandLineRewriterChain, FileWriteAnalysisOptions, FileWriteAssessment,
    PreparedCommand, RewriteResult, SyntaxCapture, TerminalCommandRequest, TerminalCommandSafety,
    TreeSitterCommandParser, WriteTarget, WriteTargetKind, WriteTargetResolver,
};
pub use error::{CommandParserError, ParserResult};
pub use grammar::{BundledGrammars, CacheStats, GrammarLibrary, QueryKind, SyntaxTreeCache};
pub use shell::{OperatingSystem, ShellLanguage, is_powershell};
