//! Configuration loader components for termshield.
//!
//! The crate owns the `[terminal]` section of `termshield.toml`: the
//! `block_detected_file_writes` policy, the per-shell null-device spellings and
//! the idle window of the syntax tree cache. [`ConfigManager`] resolves the
//! effective configuration from the user and workspace layers.

pub mod constants;
pub mod core;
pub mod loader;

pub use core::terminal::{BlockDetectedFileWrites, NullDeviceConfig, TerminalSafetyConfig};
pub use loader::layers::{ConfigLayerEntry, ConfigLayerSource, ConfigLayerStack};
pub use loader::{ConfigError, ConfigManager, TermshieldConfig, merge_toml_values};
