//! Command safety checks for terminal commands proposed by an agent.
//!
//! - [`shell_parser`]: grammar-backed extraction of sub-commands, chain
//!   operators and redirection targets
//! - [`rewriter`]: command line rewrites applied before execution
//! - [`write_target`]: literal vs dynamic classification of write targets
//! - [`file_write_analyzer`]: auto approval policy for file writes
//! - [`terminal_tool`]: the combined pipeline

pub mod file_write_analyzer;
pub mod rewriter;
pub mod shell_parser;
pub mod terminal_tool;
pub mod write_target;

pub use file_write_analyzer::{
    AnalysisResult, BlockReason, CommandLineFileWriteAnalyzer, FileWriteAnalysisOptions,
    FileWriteAssessment, is_within_folder,
};
pub use rewriter::{
    AppliedRewrite, CdPrefixRewriter, ChainRewrite, CommandLineRewriteOptions, CommandLineRewriter,
    CommandLineRewriterChain, PwshChainOperatorRewriter, RewriteResult,
};
pub use shell_parser::{SyntaxCapture, TreeSitterCommandParser};
pub use terminal_tool::{PreparedCommand, TerminalCommandRequest, TerminalCommandSafety};
pub use write_target::{WriteTarget, WriteTargetKind, WriteTargetResolver};
