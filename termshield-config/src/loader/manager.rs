use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::constants::paths;
use crate::loader::config::TermshieldConfig;
use crate::loader::layers::{ConfigLayerEntry, ConfigLayerSource, ConfigLayerStack};

/// Configuration manager for loading and validating configurations
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config: TermshieldConfig,
    config_path: Option<PathBuf>,
    workspace_root: Option<PathBuf>,
    layer_stack: ConfigLayerStack,
}

impl ConfigManager {
    /// Load configuration from the default locations
    pub fn load() -> Result<Self> {
        if let Ok(config_path) = std::env::var(paths::CONFIG_PATH_ENV) {
            let trimmed = config_path.trim();
            if !trimmed.is_empty() {
                return Self::load_from_file(trimmed).with_context(|| {
                    format!(
                        "Failed to load configuration from {}={}",
                        paths::CONFIG_PATH_ENV,
                        trimmed
                    )
                });
            }
        }

        if let Ok(workspace_path) = std::env::var(paths::WORKSPACE_ENV) {
            let trimmed = workspace_path.trim();
            if !trimmed.is_empty() {
                return Self::load_from_workspace(trimmed).with_context(|| {
                    format!(
                        "Failed to load configuration from {}={}",
                        paths::WORKSPACE_ENV,
                        trimmed
                    )
                });
            }
        }

        Self::load_from_workspace(std::env::current_dir()?)
    }

    /// Load configuration for a workspace using the user's home directory
    pub fn load_from_workspace(workspace: impl AsRef<Path>) -> Result<Self> {
        Self::load_from_workspace_with_home(workspace, dirs::home_dir())
    }

    /// Load configuration for a workspace with an explicit home directory.
    ///
    /// Layers, lowest precedence first: `<home>/.termshield/termshield.toml`,
    /// then `<workspace>/termshield.toml`.
    pub fn load_from_workspace_with_home(
        workspace: impl AsRef<Path>,
        home: Option<PathBuf>,
    ) -> Result<Self> {
        let workspace_root = workspace.as_ref().to_path_buf();
        let mut layer_stack = ConfigLayerStack::default();

        Self::push_user_layer(&mut layer_stack, home.as_deref())?;

        let workspace_config_path = workspace_root.join(paths::CONFIG_FILE_NAME);
        if workspace_config_path.exists() {
            let toml = Self::load_toml_from_file(&workspace_config_path)?;
            layer_stack.push(ConfigLayerEntry::new(
                ConfigLayerSource::Workspace {
                    file: workspace_config_path,
                },
                toml,
            ));
        }

        Self::from_layers(layer_stack, Some(workspace_root))
    }

    /// Load configuration from a specific file, layered over the user config
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut layer_stack = ConfigLayerStack::default();

        Self::push_user_layer(&mut layer_stack, dirs::home_dir().as_deref())?;

        let toml = Self::load_toml_from_file(path)?;
        layer_stack.push(ConfigLayerEntry::new(
            ConfigLayerSource::Explicit {
                file: path.to_path_buf(),
            },
            toml,
        ));

        let workspace_root = path.parent().map(Path::to_path_buf);
        Self::from_layers(layer_stack, workspace_root)
    }

    fn push_user_layer(layer_stack: &mut ConfigLayerStack, home: Option<&Path>) -> Result<()> {
        let Some(home) = home else {
            return Ok(());
        };

        let user_config_path = home
            .join(paths::HOME_CONFIG_DIR)
            .join(paths::CONFIG_FILE_NAME);
        if user_config_path.exists() {
            let toml = Self::load_toml_from_file(&user_config_path)?;
            layer_stack.push(ConfigLayerEntry::new(
                ConfigLayerSource::User {
                    file: user_config_path,
                },
                toml,
            ));
        }
        Ok(())
    }

    fn from_layers(layer_stack: ConfigLayerStack, workspace_root: Option<PathBuf>) -> Result<Self> {
        if layer_stack.layers().is_empty() {
            let config = TermshieldConfig::default();
            config
                .validate()
                .context("Default configuration failed validation")?;

            return Ok(Self {
                config,
                config_path: None,
                workspace_root,
                layer_stack,
            });
        }

        let effective_toml = layer_stack.effective_config();
        let config: TermshieldConfig = effective_toml
            .try_into()
            .context("Failed to deserialize effective configuration")?;

        config
            .validate()
            .context("Configuration failed validation")?;

        let config_path = layer_stack
            .layers()
            .last()
            .map(|layer| layer.source.file().clone());

        tracing::debug!(
            layers = layer_stack.layers().len(),
            config_path = ?config_path,
            policy = %config.terminal.block_detected_file_writes,
            "loaded termshield configuration"
        );

        Ok(Self {
            config,
            config_path,
            workspace_root,
            layer_stack,
        })
    }

    fn load_toml_from_file(path: &Path) -> Result<toml::Value> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let value: toml::Value = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(value)
    }

    pub fn config(&self) -> &TermshieldConfig {
        &self.config
    }

    /// Highest-precedence file that contributed to the configuration
    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    pub fn workspace_root(&self) -> Option<&Path> {
        self.workspace_root.as_deref()
    }

    pub fn layer_stack(&self) -> &ConfigLayerStack {
        &self.layer_stack
    }
}
