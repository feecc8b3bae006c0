use serde::{Deserialize, Serialize};

use crate::core::terminal::TerminalSafetyConfig;

/// Raised when a configuration deserializes but violates an invariant.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Root of `termshield.toml`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct TermshieldConfig {
    /// Terminal command safety settings
    #[serde(default)]
    pub terminal: TerminalSafetyConfig,
}

impl TermshieldConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.terminal.validate().map_err(ConfigError::Invalid)
    }
}
