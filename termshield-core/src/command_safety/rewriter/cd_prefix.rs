use async_trait::async_trait;
use once_cell::sync::Lazy;
use percent_encoding::percent_decode_str;
use regex::Regex;
use url::Url;

use super::{CommandLineRewriteOptions, CommandLineRewriter, RewriteResult};
use crate::shell::{OperatingSystem, is_powershell};

const REASONING: &str = "Removed redundant cd command";

static BASH_CD_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^cd (?<dir>[^\s]+) &&\s+(?<suffix>.+)$").expect("valid bash cd prefix pattern")
});

static PWSH_CD_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(?:cd(?: /d)?|Set-Location(?: -Path)?) (?<dir>[^\s]+) ?(?:&&|;)\s+(?<suffix>.+)$",
    )
    .expect("valid PowerShell cd prefix pattern")
});

/// Drops a leading `cd <dir> &&` when `<dir>` is already the working directory.
///
/// PowerShell also accepts `cd /d`, `Set-Location`, `Set-Location -Path` and
/// `;` as the separator.
#[derive(Debug, Default, Clone, Copy)]
pub struct CdPrefixRewriter;

#[async_trait]
impl CommandLineRewriter for CdPrefixRewriter {
    fn name(&self) -> &'static str {
        "CdPrefixRewriter"
    }

    async fn rewrite(&self, options: &CommandLineRewriteOptions) -> Option<RewriteResult> {
        let cwd = options.cwd.as_ref()?;
        let pattern = if is_powershell(&options.shell, options.os) {
            &*PWSH_CD_PREFIX
        } else {
            &*BASH_CD_PREFIX
        };

        let captures = pattern.captures(options.command_line.trim())?;
        let dir = captures.name("dir")?.as_str();
        let suffix = captures.name("suffix")?.as_str();

        if comparable_dir(dir, options.os) != comparable_cwd(cwd, options.os) {
            return None;
        }

        Some(RewriteResult {
            rewritten: suffix.to_owned(),
            reasoning: REASONING.to_owned(),
        })
    }
}

fn comparable_dir(dir: &str, os: OperatingSystem) -> String {
    let unquoted = dir
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .or_else(|| dir.strip_prefix('\'').and_then(|rest| rest.strip_suffix('\'')))
        .unwrap_or(dir);
    normalize(unquoted, os)
}

fn comparable_cwd(cwd: &Url, os: OperatingSystem) -> String {
    let decoded = percent_decode_str(cwd.path()).decode_utf8_lossy();
    let path = if os.is_windows() {
        // `/c:/workspace` is the URL form of `c:\workspace`.
        match decoded.strip_prefix('/') {
            Some(rest) if has_drive_prefix(rest) => rest.to_owned(),
            _ => decoded.into_owned(),
        }
    } else {
        decoded.into_owned()
    };
    normalize(&path, os)
}

fn normalize(path: &str, os: OperatingSystem) -> String {
    if os.is_windows() {
        let forward = path.replace('\\', "/");
        let trimmed = trim_trailing_separators(&forward);
        trimmed.to_lowercase()
    } else {
        trim_trailing_separators(path).to_owned()
    }
}

fn trim_trailing_separators(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() && path.starts_with('/') {
        "/"
    } else {
        trimmed
    }
}

fn has_drive_prefix(path: &str) -> bool {
    let bytes = path.as_bytes();
    matches!(bytes, [letter, b':', ..] if letter.is_ascii_alphabetic())
}
