//! Shell dialect and host operating system detection.

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static POWERSHELL_EXECUTABLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:powershell|pwsh)(?:-preview)?$").expect("valid PowerShell executable pattern")
});

/// Grammar used to parse a command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShellLanguage {
    Bash,
    PowerShell,
}

impl ShellLanguage {
    pub const fn id(self) -> &'static str {
        match self {
            Self::Bash => "bash",
            Self::PowerShell => "powershell",
        }
    }

    /// Pick the grammar for a shell executable path.
    pub fn for_shell(shell: &str, os: OperatingSystem) -> Self {
        if is_powershell(shell, os) {
            Self::PowerShell
        } else {
            Self::Bash
        }
    }
}

impl fmt::Display for ShellLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for ShellLanguage {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "bash" | "sh" | "zsh" => Ok(Self::Bash),
            "powershell" | "pwsh" => Ok(Self::PowerShell),
            other => Err(format!("unsupported shell language '{other}'")),
        }
    }
}

/// Operating system of the machine the terminal runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperatingSystem {
    Windows,
    Macintosh,
    Linux,
}

impl OperatingSystem {
    pub const fn current() -> Self {
        if cfg!(windows) {
            Self::Windows
        } else if cfg!(target_os = "macos") {
            Self::Macintosh
        } else {
            Self::Linux
        }
    }

    pub const fn is_windows(self) -> bool {
        matches!(self, Self::Windows)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Windows => "windows",
            Self::Macintosh => "macintosh",
            Self::Linux => "linux",
        }
    }
}

impl Default for OperatingSystem {
    fn default() -> Self {
        Self::current()
    }
}

impl fmt::Display for OperatingSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperatingSystem {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "windows" | "win32" => Ok(Self::Windows),
            "macintosh" | "macos" | "darwin" => Ok(Self::Macintosh),
            "linux" => Ok(Self::Linux),
            other => Err(format!("unsupported operating system '{other}'")),
        }
    }
}

/// Whether `shell` names a PowerShell executable.
///
/// Only the basename is inspected. On Windows the comparison ignores case and
/// a trailing `.exe`.
pub fn is_powershell(shell: &str, os: OperatingSystem) -> bool {
    let shell = shell.trim();
    if os.is_windows() {
        let basename = shell.rsplit(['\\', '/']).next().unwrap_or(shell);
        let lowered = basename.to_ascii_lowercase();
        let stem = lowered.strip_suffix(".exe").unwrap_or(&lowered);
        POWERSHELL_EXECUTABLE.is_match(stem)
    } else {
        let basename = shell.rsplit('/').next().unwrap_or(shell);
        POWERSHELL_EXECUTABLE.is_match(basename)
    }
}
