use std::fmt;

use crate::shell::ShellLanguage;

/// Named queries run against parsed command lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKind {
    /// Every simple command, in source order
    SubCommands,
    /// Every `&&` token, whatever the grammar labelled it
    DoubleAmpersand,
    /// Redirections that may write to a file
    FileWrites,
}

impl QueryKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SubCommands => "sub-commands",
            Self::DoubleAmpersand => "double-ampersand",
            Self::FileWrites => "file-writes",
        }
    }

    /// Candidate sources, most precise first.
    ///
    /// Node names differ between grammar releases, so the first candidate that
    /// compiles against the loaded grammar wins.
    pub(crate) const fn sources(self, language: ShellLanguage) -> &'static [&'static str] {
        match (self, language) {
            (Self::SubCommands, _) => &["(command) @command"],
            (Self::DoubleAmpersand, _) => &[
                "([(_) \"&&\"] @double.ampersand (#eq? @double.ampersand \"&&\"))",
                "((_) @double.ampersand (#eq? @double.ampersand \"&&\"))",
            ],
            (Self::FileWrites, ShellLanguage::Bash) => &["(file_redirect) @redirect"],
            (Self::FileWrites, ShellLanguage::PowerShell) => &["(redirection) @redirect"],
        }
    }
}

impl fmt::Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
