//! Policy evaluation for file writes found in a command line.
//!
//! Every output redirection is resolved to a [`WriteTarget`] and checked
//! against the configured [`BlockDetectedFileWrites`] policy. The command may
//! be auto approved only when every target is allowed; each target gets one
//! disclaimer either way.

use std::fmt;
use std::sync::Arc;

use percent_encoding::percent_decode_str;
use serde::Serialize;
use url::Url;

use termshield_config::BlockDetectedFileWrites;

use crate::command_safety::shell_parser::TreeSitterCommandParser;
use crate::command_safety::write_target::{WriteTarget, WriteTargetKind, WriteTargetResolver};
use crate::error::ParserResult;
use crate::shell::{OperatingSystem, ShellLanguage};

/// Input to a single analysis
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileWriteAnalysisOptions {
    pub command_line: String,
    pub cwd: Option<Url>,
    pub shell: String,
    pub os: OperatingSystem,
    pub language: ShellLanguage,
    pub terminal_tool_session_id: String,
    pub chat_session_id: Option<String>,
}

/// Why a write target blocks auto approval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum BlockReason {
    /// Policy is `all`
    AllWritesBlocked,
    /// Target is not a literal path
    DynamicTarget,
    /// No workspace folder contains the target
    OutsideWorkspace,
    /// There is no workspace to compare against
    NoWorkspaceFolders,
}

impl BlockReason {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AllWritesBlocked => "all file writes require approval",
            Self::DynamicTarget => "target could not be resolved to a literal path",
            Self::OutsideWorkspace => "outside the workspace",
            Self::NoWorkspaceFolders => "no workspace folders are open",
        }
    }
}

impl fmt::Display for BlockReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decision for one write target
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileWriteAssessment {
    pub target: WriteTarget,
    pub allowed: bool,
    pub reason: Option<BlockReason>,
}

impl FileWriteAssessment {
    pub fn disclaimer(&self) -> String {
        match self.reason {
            None => format!("File write operations detected: `{}`", self.target.raw),
            Some(reason) => format!(
                "File write operations detected that cannot be auto approved: `{}` ({reason})",
                self.target.raw
            ),
        }
    }
}

/// Outcome of analyzing one command line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub is_auto_approve_allowed: bool,
    /// One entry per write target, in extraction order
    pub disclaimers: Vec<String>,
    pub file_writes: Vec<FileWriteAssessment>,
}

impl AnalysisResult {
    fn no_writes() -> Self {
        Self {
            is_auto_approve_allowed: true,
            disclaimers: Vec::new(),
            file_writes: Vec::new(),
        }
    }
}

pub struct CommandLineFileWriteAnalyzer {
    parser: Arc<TreeSitterCommandParser>,
    resolver: WriteTargetResolver,
}

impl CommandLineFileWriteAnalyzer {
    pub fn new(parser: Arc<TreeSitterCommandParser>, resolver: WriteTargetResolver) -> Self {
        Self { parser, resolver }
    }

    /// Analyze the file writes of `options.command_line`.
    ///
    /// Parser failures are returned as errors; callers must treat them as
    /// "not auto approvable".
    pub async fn analyze(
        &self,
        options: &FileWriteAnalysisOptions,
        policy: BlockDetectedFileWrites,
        workspace_folders: &[Url],
    ) -> ParserResult<AnalysisResult> {
        let raw_targets = self
            .parser
            .get_file_writes(options.language, &options.command_line)
            .await?;
        if raw_targets.is_empty() {
            tracing::debug!(
                session = %options.terminal_tool_session_id,
                "no file writes detected"
            );
            return Ok(AnalysisResult::no_writes());
        }

        let file_writes: Vec<FileWriteAssessment> = raw_targets
            .iter()
            .map(|raw| {
                let target = self
                    .resolver
                    .resolve(raw, options.language, options.cwd.as_ref());
                let reason = block_reason(&target, policy, workspace_folders, options.os);
                tracing::debug!(
                    session = %options.terminal_tool_session_id,
                    raw = %target.raw,
                    kind = ?target.kind,
                    location = ?target.location.as_ref().map(Url::as_str),
                    reason = ?reason,
                    "assessed file write"
                );
                FileWriteAssessment {
                    target,
                    allowed: reason.is_none(),
                    reason,
                }
            })
            .collect();

        let is_auto_approve_allowed = file_writes.iter().all(|write| write.allowed);
        let disclaimers = file_writes.iter().map(FileWriteAssessment::disclaimer).collect();

        tracing::info!(
            session = %options.terminal_tool_session_id,
            chat_session = options.chat_session_id.as_deref().unwrap_or_default(),
            policy = %policy,
            writes = file_writes.len(),
            auto_approve_allowed = is_auto_approve_allowed,
            "file write analysis complete"
        );

        Ok(AnalysisResult {
            is_auto_approve_allowed,
            disclaimers,
            file_writes,
        })
    }
}

/// `None` when the target is allowed under `policy`
fn block_reason(
    target: &WriteTarget,
    policy: BlockDetectedFileWrites,
    workspace_folders: &[Url],
    os: OperatingSystem,
) -> Option<BlockReason> {
    if target.kind == WriteTargetKind::NullDevice {
        return None;
    }

    match policy {
        BlockDetectedFileWrites::Never => None,
        BlockDetectedFileWrites::All => Some(BlockReason::AllWritesBlocked),
        BlockDetectedFileWrites::OutsideWorkspace => {
            if workspace_folders.is_empty() {
                return Some(BlockReason::NoWorkspaceFolders);
            }
            let Some(location) = target.location.as_ref().filter(|_| target.kind.is_literal())
            else {
                return Some(BlockReason::DynamicTarget);
            };
            if workspace_folders
                .iter()
                .any(|folder| is_within_folder(location, folder, os))
            {
                None
            } else {
                Some(BlockReason::OutsideWorkspace)
            }
        }
    }
}

/// Whether `target` is `folder` or lies beneath it.
///
/// Scheme, host and port must match. Paths are compared after percent
/// decoding, on whole segments, and without case on Windows.
pub fn is_within_folder(target: &Url, folder: &Url, os: OperatingSystem) -> bool {
    if !target.scheme().eq_ignore_ascii_case(folder.scheme()) || target.port() != folder.port() {
        return false;
    }
    let same_host = match (target.host_str(), folder.host_str()) {
        (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
        (None, None) => true,
        _ => false,
    };
    if !same_host {
        return false;
    }

    let target_path = comparable_path(target, os);
    let folder_path = comparable_path(folder, os);
    let folder_path = folder_path.trim_end_matches('/');

    target_path == folder_path
        || target_path
            .strip_prefix(folder_path)
            .is_some_and(|rest| rest.starts_with('/'))
}

fn comparable_path(url: &Url, os: OperatingSystem) -> String {
    let decoded = percent_decode_str(url.path()).decode_utf8_lossy();
    if os.is_windows() {
        decoded.to_lowercase()
    } else {
        decoded.into_owned()
    }
}
