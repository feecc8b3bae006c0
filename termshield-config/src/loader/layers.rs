use std::path::PathBuf;

use toml::Value as TomlValue;

use crate::loader::merge_toml_values;

/// Source of a configuration layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigLayerSource {
    /// User configuration (`~/.termshield/termshield.toml`)
    User { file: PathBuf },
    /// Workspace configuration (`termshield.toml` in the workspace root)
    Workspace { file: PathBuf },
    /// Explicit file passed through `TERMSHIELD_CONFIG_PATH` or `--config`
    Explicit { file: PathBuf },
}

impl ConfigLayerSource {
    pub fn file(&self) -> &PathBuf {
        match self {
            Self::User { file } | Self::Workspace { file } | Self::Explicit { file } => file,
        }
    }
}

/// A single layer of configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigLayerEntry {
    pub source: ConfigLayerSource,
    pub config: TomlValue,
}

impl ConfigLayerEntry {
    pub fn new(source: ConfigLayerSource, config: TomlValue) -> Self {
        Self { source, config }
    }
}

/// Configuration layers, ordered from lowest to highest precedence.
#[derive(Debug, Clone, Default)]
pub struct ConfigLayerStack {
    layers: Vec<ConfigLayerEntry>,
}

impl ConfigLayerStack {
    pub fn push(&mut self, layer: ConfigLayerEntry) {
        self.layers.push(layer);
    }

    /// Merge all layers into a single effective configuration.
    pub fn effective_config(&self) -> TomlValue {
        let mut merged = TomlValue::Table(toml::Table::new());
        for layer in &self.layers {
            merge_toml_values(&mut merged, &layer.config);
        }
        merged
    }

    pub fn layers(&self) -> &[ConfigLayerEntry] {
        &self.layers
    }
}
