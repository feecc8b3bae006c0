//! Classification of redirection targets into literal paths and everything else.
//!
//! Shell semantics are not evaluated. Anything whose meaning depends on the
//! environment (variables, globs, substitutions, home directory expansion...)
//! is [`WriteTargetKind::Dynamic`] and is never treated as provably safe.

use once_cell::sync::Lazy;
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use regex::Regex;
use serde::Serialize;
use url::Url;

use termshield_config::NullDeviceConfig;

use crate::shell::ShellLanguage;

/// Characters escaped when a literal segment is placed into a URL path
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}')
    .add(b'/')
    .add(b'\\')
    .add(b'^')
    .add(b'|')
    .add(b'[')
    .add(b']');

static DRIVE_ABSOLUTE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z]:/").expect("valid drive pattern"));

/// `env:PATH`, `C:file`, `HKLM:` and other provider-qualified paths
static PROVIDER_QUALIFIED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_.-]*:").expect("valid provider pattern"));

/// First path segment of a Windows file URL (`c:` or `c%3A`)
static DRIVE_SEGMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z](?::|%3[aA])$").expect("valid drive segment pattern"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum WriteTargetKind {
    /// Literal path resolved against the working directory
    LiteralRelative,
    /// Literal absolute path
    LiteralAbsolute,
    /// Output is discarded
    NullDevice,
    /// Depends on shell evaluation, or cannot be resolved
    Dynamic,
}

impl WriteTargetKind {
    pub const fn is_literal(self) -> bool {
        matches!(self, Self::LiteralRelative | Self::LiteralAbsolute)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LiteralRelative => "literalRelative",
            Self::LiteralAbsolute => "literalAbsolute",
            Self::NullDevice => "nullDevice",
            Self::Dynamic => "dynamic",
        }
    }
}

impl std::fmt::Display for WriteTargetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One classified redirection target.
///
/// `raw` keeps the token exactly as written (quotes included) for display.
/// `location` is set only for literal kinds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WriteTarget {
    pub raw: String,
    pub kind: WriteTargetKind,
    pub location: Option<Url>,
}

impl WriteTarget {
    fn unresolved(raw: &str, kind: WriteTargetKind) -> Self {
        Self {
            raw: raw.to_owned(),
            kind,
            location: None,
        }
    }

    fn literal(raw: &str, kind: WriteTargetKind, location: Option<Url>) -> Self {
        match location {
            Some(location) => Self {
                raw: raw.to_owned(),
                kind,
                location: Some(location),
            },
            None => Self::unresolved(raw, WriteTargetKind::Dynamic),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Quote {
    Single,
    Double,
}

/// Resolves raw redirection tokens into [`WriteTarget`]s
#[derive(Debug, Clone)]
pub struct WriteTargetResolver {
    bash_null_devices: Vec<String>,
    powershell_null_devices: Vec<String>,
}

impl Default for WriteTargetResolver {
    fn default() -> Self {
        Self::new(&NullDeviceConfig::default())
    }
}

impl WriteTargetResolver {
    pub fn new(null_devices: &NullDeviceConfig) -> Self {
        Self {
            bash_null_devices: null_devices.bash.clone(),
            powershell_null_devices: null_devices.powershell.clone(),
        }
    }

    /// Classify `raw` and, for literal paths, resolve it to a URL.
    ///
    /// Relative paths need `cwd`; without one they are dynamic. Absolute paths
    /// take the scheme and authority of `cwd` (or `file:` when there is none).
    pub fn resolve(&self, raw: &str, language: ShellLanguage, cwd: Option<&Url>) -> WriteTarget {
        let token = raw.trim();
        let (unquoted, quote) = strip_matching_quotes(token);

        if self.is_null_device(unquoted, language, quote) {
            return WriteTarget::unresolved(raw, WriteTargetKind::NullDevice);
        }
        if unquoted.is_empty() || unquoted.contains(['"', '\'']) {
            return WriteTarget::unresolved(raw, WriteTargetKind::Dynamic);
        }
        if (quote != Some(Quote::Single) && has_expansion(unquoted))
            || has_unresolvable_path(unquoted, language, quote)
        {
            return WriteTarget::unresolved(raw, WriteTargetKind::Dynamic);
        }

        match language {
            ShellLanguage::Bash => {
                let path = match quote {
                    Some(Quote::Single) => unquoted.to_owned(),
                    Some(Quote::Double) => unescape_double_quoted(unquoted),
                    None => unescape_bare(unquoted),
                };
                resolve_posix(raw, &path, cwd)
            }
            ShellLanguage::PowerShell => {
                let path = unquoted.replace('\\', "/");
                resolve_powershell(raw, &path, cwd)
            }
        }
    }

    /// Variable spellings such as `$null` only count when written unquoted;
    /// `'$null'` names a file.
    fn is_null_device(&self, token: &str, language: ShellLanguage, quote: Option<Quote>) -> bool {
        match language {
            ShellLanguage::Bash => self.bash_null_devices.iter().any(|device| device == token),
            ShellLanguage::PowerShell => self
                .powershell_null_devices
                .iter()
                .filter(|device| quote.is_none() || !device.starts_with('$'))
                .any(|device| device.eq_ignore_ascii_case(token)),
        }
    }
}

fn strip_matching_quotes(token: &str) -> (&str, Option<Quote>) {
    for (quote_char, quote) in [('\'', Quote::Single), ('"', Quote::Double)] {
        if let Some(inner) = token
            .strip_prefix(quote_char)
            .and_then(|rest| rest.strip_suffix(quote_char))
        {
            return (inner, Some(quote));
        }
    }
    (token, None)
}

/// Whether the token expands at run time in a way single quotes disable
/// (`$`, backticks, `<(`/`>(` and `{...}`).
fn has_expansion(token: &str) -> bool {
    if token.contains(['$', '`']) || token.contains("<(") || token.contains(">(") {
        return true;
    }
    token
        .find('{')
        .and_then(|open| token.get(open..))
        .is_some_and(|rest| rest.contains('}'))
}

/// Path shapes whose location is decided when the path is used.
///
/// PowerShell strips quotes before handing the path to its provider, which
/// still expands `~` and resolves `env:`, `HKLM:` or drive-relative `C:file`,
/// so quoting does not make these literal there.
fn has_unresolvable_path(token: &str, language: ShellLanguage, quote: Option<Quote>) -> bool {
    match language {
        // Quoted bash words get neither tilde nor glob expansion.
        ShellLanguage::Bash => {
            quote.is_none() && (token.starts_with('~') || token.contains(['*', '?', '[']))
        }
        ShellLanguage::PowerShell => {
            let forward = token.replace('\\', "/");
            token.starts_with('~')
                || (PROVIDER_QUALIFIED.is_match(&forward) && !DRIVE_ABSOLUTE.is_match(&forward))
        }
    }
}

fn unescape_bare(token: &str) -> String {
    let mut unescaped = String::with_capacity(token.len());
    let mut chars = token.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            if let Some(escaped) = chars.next() {
                unescaped.push(escaped);
            }
        } else {
            unescaped.push(ch);
        }
    }
    unescaped
}

fn unescape_double_quoted(token: &str) -> String {
    let mut unescaped = String::with_capacity(token.len());
    let mut chars = token.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '\\'
            && let Some(&next) = chars.peek()
            && matches!(next, '$' | '`' | '"' | '\\' | '\n')
        {
            unescaped.push(next);
            chars.next();
            continue;
        }
        unescaped.push(ch);
    }
    unescaped
}

fn resolve_posix(raw: &str, path: &str, cwd: Option<&Url>) -> WriteTarget {
    if path.starts_with('/') {
        let location = base_url(cwd).map(|base| with_joined_path(base, &[], 0, path));
        return WriteTarget::literal(raw, WriteTargetKind::LiteralAbsolute, location);
    }
    resolve_relative(raw, path, cwd)
}

fn resolve_powershell(raw: &str, path: &str, cwd: Option<&Url>) -> WriteTarget {
    if let Some(unc) = path.strip_prefix("//") {
        let (host, rest) = unc.split_once('/').unwrap_or((unc, ""));
        let location = Url::parse(&format!("file://{host}/"))
            .ok()
            .filter(|url| url.host_str().is_some())
            .map(|base| with_joined_path(base, &[], 0, rest));
        return WriteTarget::literal(raw, WriteTargetKind::LiteralAbsolute, location);
    }
    if DRIVE_ABSOLUTE.is_match(path) {
        let (drive, rest) = path.split_at(2);
        let location = base_url(cwd)
            .map(|base| with_joined_path(base, &[drive.to_owned()], 1, rest));
        return WriteTarget::literal(raw, WriteTargetKind::LiteralAbsolute, location);
    }
    if path.starts_with('/') {
        let location = base_url(cwd).map(|base| with_joined_path(base, &[], 0, path));
        return WriteTarget::literal(raw, WriteTargetKind::LiteralAbsolute, location);
    }
    resolve_relative(raw, path, cwd)
}

fn resolve_relative(raw: &str, path: &str, cwd: Option<&Url>) -> WriteTarget {
    let Some(cwd) = cwd.filter(|cwd| !cwd.cannot_be_a_base()) else {
        return WriteTarget::unresolved(raw, WriteTargetKind::Dynamic);
    };

    let base_segments: Vec<String> = cwd
        .path()
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(str::to_owned)
        .collect();
    let floor = usize::from(
        base_segments
            .first()
            .is_some_and(|first| DRIVE_SEGMENT.is_match(first)),
    );

    let location = Some(with_joined_path(cwd.clone(), &base_segments, floor, path));
    WriteTarget::literal(raw, WriteTargetKind::LiteralRelative, location)
}

/// Scheme and authority of `cwd`, or `file:///` without one
fn base_url(cwd: Option<&Url>) -> Option<Url> {
    match cwd {
        Some(cwd) if !cwd.cannot_be_a_base() => Some(cwd.clone()),
        Some(_) => None,
        None => Url::parse("file:///").ok(),
    }
}

/// Lexically join `path` onto `base_segments` (already URL-encoded) and
/// install the result as the path of `url`.
///
/// `.` is dropped and `..` pops a segment, never below `floor`.
fn with_joined_path(mut url: Url, base_segments: &[String], floor: usize, path: &str) -> Url {
    let mut segments: Vec<String> = base_segments.to_vec();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.len() > floor {
                    segments.pop();
                }
            }
            segment => segments.push(utf8_percent_encode(segment, PATH_SEGMENT).to_string()),
        }
    }

    url.set_path(&format!("/{}", segments.join("/")));
    url.set_query(None);
    url.set_fragment(None);
    url
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn url(value: &str) -> Url {
        Url::parse(value).unwrap()
    }

    fn resolve(raw: &str, language: ShellLanguage, cwd: Option<&str>) -> WriteTarget {
        let cwd = cwd.map(url);
        WriteTargetResolver::default().resolve(raw, language, cwd.as_ref())
    }

    #[test]
    fn relative_paths_join_onto_cwd() {
        let target = resolve("out/file.txt", ShellLanguage::Bash, Some("file:///workspace"));
        assert_eq!(target.kind, WriteTargetKind::LiteralRelative);
        assert_eq!(
            target.location.map(String::from),
            Some("file:///workspace/out/file.txt".into())
        );
    }

    #[test]
    fn dot_segments_are_normalized() {
        let target = resolve("./a/../../file.txt", ShellLanguage::Bash, Some("file:///workspace/project"));
        assert_eq!(
            target.location.map(String::from),
            Some("file:///workspace/file.txt".into())
        );

        let target = resolve("../../../../x", ShellLanguage::Bash, Some("file:///a"));
        assert_eq!(target.location.map(String::from), Some("file:///x".into()));
    }

    #[test]
    fn relative_without_cwd_is_dynamic() {
        let target = resolve("file.txt", ShellLanguage::Bash, None);
        assert_eq!(target.kind, WriteTargetKind::Dynamic);
        assert_eq!(target.location, None);
    }

    #[test]
    fn absolute_paths_use_cwd_authority() {
        let target = resolve(
            "/home/user/out.log",
            ShellLanguage::Bash,
            Some("vscode-remote://ssh-remote+box/home/user/project"),
        );
        assert_eq!(target.kind, WriteTargetKind::LiteralAbsolute);
        assert_eq!(
            target.location.map(String::from),
            Some("vscode-remote://ssh-remote+box/home/user/out.log".into())
        );

        let target = resolve("/tmp/out.log", ShellLanguage::Bash, None);
        assert_eq!(target.location.map(String::from), Some("file:///tmp/out.log".into()));
    }

    #[test]
    fn quotes_are_stripped_but_raw_is_kept() {
        let target = resolve("\"my file.txt\"", ShellLanguage::Bash, Some("file:///w"));
        assert_eq!(target.raw, "\"my file.txt\"");
        assert_eq!(target.kind, WriteTargetKind::LiteralRelative);
        assert_eq!(target.location.map(String::from), Some("file:///w/my%20file.txt".into()));

        let target = resolve("'$HOME'", ShellLanguage::Bash, Some("file:///w"));
        assert_eq!(target.kind, WriteTargetKind::LiteralRelative);
        assert_eq!(target.location.map(String::from), Some("file:///w/$HOME".into()));
    }

    #[test]
    fn partial_quoting_is_dynamic() {
        for raw in ["a\"b\"", "'a'b", "\"a'"] {
            assert_eq!(
                resolve(raw, ShellLanguage::Bash, Some("file:///w")).kind,
                WriteTargetKind::Dynamic,
                "{raw}"
            );
        }
    }

    #[test]
    fn shell_expansions_are_dynamic() {
        for raw in [
            "$HOME/file.txt",
            "${OUT}",
            "$(mktemp)",
            "`mktemp`",
            "\"$OUT\"",
            "~/file.txt",
            "*.log",
            "file?.txt",
            "[ab].txt",
            "{a,b}.txt",
            ">(tee x)",
        ] {
            assert_eq!(
                resolve(raw, ShellLanguage::Bash, Some("file:///w")).kind,
                WriteTargetKind::Dynamic,
                "{raw}"
            );
        }

        // Quoted globs are literal in bash.
        assert_eq!(
            resolve("\"*.log\"", ShellLanguage::Bash, Some("file:///w")).kind,
            WriteTargetKind::LiteralRelative
        );
    }

    #[test]
    fn null_devices() {
        assert_eq!(resolve("/dev/null", ShellLanguage::Bash, None).kind, WriteTargetKind::NullDevice);
        assert_eq!(resolve("'/dev/null'", ShellLanguage::Bash, None).kind, WriteTargetKind::NullDevice);
        assert_eq!(resolve("/dev/tty", ShellLanguage::Bash, None).kind, WriteTargetKind::LiteralAbsolute);
        assert_eq!(resolve("$NULL", ShellLanguage::PowerShell, None).kind, WriteTargetKind::NullDevice);
        assert_eq!(resolve("nul", ShellLanguage::PowerShell, None).kind, WriteTargetKind::NullDevice);
        // bash only matches exactly
        assert_eq!(resolve("$null", ShellLanguage::Bash, None).kind, WriteTargetKind::Dynamic);
    }

    #[test]
    fn powershell_paths() {
        let cwd = Some("file:///c%3A/workspace");

        let target = resolve(r"out\file.txt", ShellLanguage::PowerShell, cwd);
        assert_eq!(target.kind, WriteTargetKind::LiteralRelative);
        assert_eq!(
            target.location.map(String::from),
            Some("file:///c%3A/workspace/out/file.txt".into())
        );

        let target = resolve(r"..\..\..\x.txt", ShellLanguage::PowerShell, cwd);
        assert_eq!(target.location.map(String::from), Some("file:///c%3A/x.txt".into()));

        let target = resolve(r"C:\temp\x.txt", ShellLanguage::PowerShell, cwd);
        assert_eq!(target.kind, WriteTargetKind::LiteralAbsolute);
        assert_eq!(target.location.map(String::from), Some("file:///C:/temp/x.txt".into()));

        let target = resolve(r"\\server\share\x.txt", ShellLanguage::PowerShell, cwd);
        assert_eq!(target.kind, WriteTargetKind::LiteralAbsolute);
        assert_eq!(target.location.map(String::from), Some("file://server/share/x.txt".into()));

        for raw in ["env:OUT", "C:file.txt", "$env:TEMP\\x", "`$x"] {
            assert_eq!(
                resolve(raw, ShellLanguage::PowerShell, cwd).kind,
                WriteTargetKind::Dynamic,
                "{raw}"
            );
        }
    }

    #[test]
    fn powershell_quoting_keeps_provider_paths_dynamic() {
        let cwd = Some("file:///c%3A/workspace");
        for raw in [
            r"'~\secret.txt'",
            "\"~/secret.txt\"",
            "'C:evil.txt'",
            "'env:X'",
            r"'HKLM:\Software\x'",
        ] {
            let target = resolve(raw, ShellLanguage::PowerShell, cwd);
            assert_eq!(target.kind, WriteTargetKind::Dynamic, "{raw}");
            assert_eq!(target.location, None, "{raw}");
        }

        // Single quotes still make `$` literal.
        let target = resolve("'$x.txt'", ShellLanguage::PowerShell, cwd);
        assert_eq!(target.kind, WriteTargetKind::LiteralRelative);
        assert_eq!(
            target.location.map(String::from),
            Some("file:///c%3A/workspace/$x.txt".into())
        );

        let target = resolve(r"'C:\temp\x.txt'", ShellLanguage::PowerShell, cwd);
        assert_eq!(target.kind, WriteTargetKind::LiteralAbsolute);
    }

    #[test]
    fn quoted_null_variable_names_a_file() {
        let cwd = Some("file:///c%3A/workspace");
        let target = resolve("'$null'", ShellLanguage::PowerShell, cwd);
        assert_eq!(target.kind, WriteTargetKind::LiteralRelative);
        assert_eq!(
            target.location.map(String::from),
            Some("file:///c%3A/workspace/$null".into())
        );

        assert_eq!(resolve("'NUL'", ShellLanguage::PowerShell, cwd).kind, WriteTargetKind::NullDevice);
        assert_eq!(resolve("$null", ShellLanguage::PowerShell, cwd).kind, WriteTargetKind::NullDevice);
    }

    #[test]
    fn bash_escapes_are_removed() {
        let target = resolve(r"my\ file.txt", ShellLanguage::Bash, Some("file:///w"));
        assert_eq!(target.location.map(String::from), Some("file:///w/my%20file.txt".into()));
    }
}
