use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{defaults, null_devices};

/// Terminal command safety configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TerminalSafetyConfig {
    /// Whether commands that write to files may still be auto approved
    #[serde(default)]
    pub block_detected_file_writes: BlockDetectedFileWrites,

    /// Idle window (milliseconds) after which parsed command lines are dropped
    #[serde(default = "default_syntax_tree_cache_idle_ms")]
    pub syntax_tree_cache_idle_ms: u64,

    /// Write targets that discard output and never count as file writes
    #[serde(default)]
    pub null_devices: NullDeviceConfig,
}

impl Default for TerminalSafetyConfig {
    fn default() -> Self {
        Self {
            block_detected_file_writes: BlockDetectedFileWrites::default(),
            syntax_tree_cache_idle_ms: default_syntax_tree_cache_idle_ms(),
            null_devices: NullDeviceConfig::default(),
        }
    }
}

impl TerminalSafetyConfig {
    pub fn syntax_tree_cache_idle(&self) -> Duration {
        Duration::from_millis(self.syntax_tree_cache_idle_ms)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.syntax_tree_cache_idle_ms == 0 {
            return Err("terminal.syntax_tree_cache_idle_ms must be greater than zero".to_string());
        }

        for (shell, entries) in [
            ("bash", &self.null_devices.bash),
            ("powershell", &self.null_devices.powershell),
        ] {
            if entries.iter().any(|entry| entry.trim().is_empty()) {
                return Err(format!(
                    "terminal.null_devices.{shell} must not contain empty entries"
                ));
            }
        }

        Ok(())
    }
}

/// Policy applied to file writes detected in a command line.
///
/// Serialized with the same spelling as the editor setting
/// (`never`, `outsideWorkspace`, `all`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum BlockDetectedFileWrites {
    /// Detected writes never block auto approval
    Never,
    /// Writes block auto approval unless they provably land inside a workspace folder
    #[default]
    OutsideWorkspace,
    /// Every detected write blocks auto approval
    All,
}

impl BlockDetectedFileWrites {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Never => "never",
            Self::OutsideWorkspace => "outsideWorkspace",
            Self::All => "all",
        }
    }
}

impl fmt::Display for BlockDetectedFileWrites {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BlockDetectedFileWrites {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "never" => Ok(Self::Never),
            "outsideWorkspace" | "outside-workspace" | "outside_workspace" => {
                Ok(Self::OutsideWorkspace)
            }
            "all" => Ok(Self::All),
            other => Err(format!(
                "unknown file write policy '{other}' (expected never, outsideWorkspace or all)"
            )),
        }
    }
}

/// Null-device spellings per shell dialect
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct NullDeviceConfig {
    /// Matched exactly against bash write targets
    #[serde(default = "default_bash_null_devices")]
    pub bash: Vec<String>,

    /// Matched case-insensitively against PowerShell write targets
    #[serde(default = "default_powershell_null_devices")]
    pub powershell: Vec<String>,
}

impl Default for NullDeviceConfig {
    fn default() -> Self {
        Self {
            bash: default_bash_null_devices(),
            powershell: default_powershell_null_devices(),
        }
    }
}

fn default_syntax_tree_cache_idle_ms() -> u64 {
    defaults::SYNTAX_TREE_CACHE_IDLE_MS
}

fn default_bash_null_devices() -> Vec<String> {
    null_devices::BASH.iter().map(|s| (*s).into()).collect()
}

fn default_powershell_null_devices() -> Vec<String> {
    null_devices::POWERSHELL.iter().map(|s| (*s).into()).collect()
}
