use thiserror::Error;

use crate::grammar::QueryKind;
use crate::shell::ShellLanguage;

/// Failures raised while loading grammars or querying command lines.
#[derive(Debug, Error)]
pub enum CommandParserError {
    #[error("failed to load the {language} grammar: {source}")]
    LanguageLoad {
        language: ShellLanguage,
        #[source]
        source: tree_sitter::LanguageError,
    },
    #[error("{language} grammar is unavailable: {reason}")]
    GrammarUnavailable {
        language: ShellLanguage,
        reason: String,
    },
    #[error("failed to compile the {kind} query for {language}: {source}")]
    QueryCompile {
        language: ShellLanguage,
        kind: QueryKind,
        #[source]
        source: tree_sitter::QueryError,
    },
    #[error("the {language} parser produced no syntax tree")]
    ParseFailed { language: ShellLanguage },
}

impl CommandParserError {
    pub const fn language(&self) -> ShellLanguage {
        match self {
            Self::LanguageLoad { language, .. }
            | Self::GrammarUnavailable { language, .. }
            | Self::QueryCompile { language, .. }
            | Self::ParseFailed { language } => *language,
        }
    }
}

pub type ParserResult<T> = Result<T, CommandParserError>;
