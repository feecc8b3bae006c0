//! Grammar loading and syntax tree caching for shell command lines.

pub mod cache;
mod queries;

use async_trait::async_trait;
use tree_sitter::Language;

use crate::error::ParserResult;
use crate::shell::ShellLanguage;

pub use cache::{CacheStats, SyntaxTreeCache};
pub use queries::QueryKind;

/// Source of shell grammars.
///
/// Loading may be slow (or fail) for hosts that ship grammars separately, so
/// it is asynchronous and fallible. Callers are expected to load each grammar
/// at most once.
#[async_trait]
pub trait GrammarLibrary: Send + Sync {
    async fn load(&self, language: ShellLanguage) -> ParserResult<Language>;
}

/// Grammars compiled into the binary
#[derive(Debug, Default, Clone, Copy)]
pub struct BundledGrammars;

#[async_trait]
impl GrammarLibrary for BundledGrammars {
    async fn load(&self, language: ShellLanguage) -> ParserResult<Language> {
        let grammar: Language = match language {
            ShellLanguage::Bash => tree_sitter_bash::LANGUAGE.into(),
            ShellLanguage::PowerShell => tree_sitter_powershell::LANGUAGE.into(),
        };
        tracing::debug!(language = %language, abi = grammar.abi_version(), "loaded bundled grammar");
        Ok(grammar)
    }
}
