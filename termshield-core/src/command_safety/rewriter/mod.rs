//! Command line rewriters applied before a command is analyzed or run.
//!
//! Each rewriter sees the output of the previous one. A rewriter that has
//! nothing to do (or fails) returns `None` and the line passes through.

mod cd_prefix;
mod pwsh_chain_operator;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use url::Url;

use crate::command_safety::shell_parser::TreeSitterCommandParser;
use crate::shell::OperatingSystem;

pub use cd_prefix::CdPrefixRewriter;
pub use pwsh_chain_operator::PwshChainOperatorRewriter;

/// Input to a single rewrite step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLineRewriteOptions {
    pub command_line: String,
    pub cwd: Option<Url>,
    /// Shell executable path or name
    pub shell: String,
    pub os: OperatingSystem,
}

/// A rewrite that changed the command line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RewriteResult {
    pub rewritten: String,
    pub reasoning: String,
}

#[async_trait]
pub trait CommandLineRewriter: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    async fn rewrite(&self, options: &CommandLineRewriteOptions) -> Option<RewriteResult>;
}

/// Record of one rewrite applied by a [`CommandLineRewriterChain`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedRewrite {
    pub rewriter: String,
    pub reasoning: String,
}

/// Final command line after every rewriter has run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainRewrite {
    pub command_line: String,
    pub applied: Vec<AppliedRewrite>,
}

/// Ordered list of rewriters
pub struct CommandLineRewriterChain {
    rewriters: Vec<Box<dyn CommandLineRewriter>>,
}

impl CommandLineRewriterChain {
    pub fn new(rewriters: Vec<Box<dyn CommandLineRewriter>>) -> Self {
        Self { rewriters }
    }

    /// Redundant `cd` removal followed by PowerShell `&&` rewriting.
    pub fn standard(parser: Arc<TreeSitterCommandParser>) -> Self {
        Self::new(vec![
            Box::new(CdPrefixRewriter),
            Box::new(PwshChainOperatorRewriter::new(parser)),
        ])
    }

    pub fn len(&self) -> usize {
        self.rewriters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rewriters.is_empty()
    }

    pub async fn rewrite(&self, options: &CommandLineRewriteOptions) -> ChainRewrite {
        let mut current = options.clone();
        let mut applied = Vec::new();

        for rewriter in &self.rewriters {
            let Some(result) = rewriter.rewrite(&current).await else {
                continue;
            };
            tracing::info!(
                rewriter = rewriter.name(),
                reasoning = %result.reasoning,
                "command line rewritten"
            );
            applied.push(AppliedRewrite {
                rewriter: rewriter.name().to_owned(),
                reasoning: result.reasoning,
            });
            current.command_line = result.rewritten;
        }

        ChainRewrite {
            command_line: current.command_line,
            applied,
        }
    }
}

impl std::fmt::Debug for CommandLineRewriterChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.rewriters.iter().map(|rewriter| rewriter.name()))
            .finish()
    }
}
