use std::path::Path;

use anyhow::{Context, Result, anyhow};
use termshield_config::ConfigManager;
use url::Url;

/// Install the stderr subscriber. `RUST_LOG` wins; otherwise only warnings
/// and errors are printed so stdout stays machine readable.
pub(crate) fn initialize_tracing() -> Result<()> {
    use tracing_subscriber::prelude::*;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .context("Failed to initialize tracing subscriber")
}

/// Load the explicit config file when given, otherwise the default layers.
pub(crate) fn load_config(path: Option<&Path>) -> Result<ConfigManager> {
    match path {
        Some(path) => ConfigManager::load_from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display())),
        None => ConfigManager::load(),
    }
}

/// Accept either a URI (`file:///w`, `vscode-remote://host/w`) or a local path.
///
/// Single letter schemes are treated as Windows drives, not URIs.
pub(crate) fn parse_location(value: &str) -> Result<Url> {
    if let Ok(url) = Url::parse(value)
        && url.scheme().len() > 1
    {
        return Ok(url);
    }

    let path = Path::new(value);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .context("Failed to resolve the current directory")?
            .join(path)
    };
    Url::from_file_path(&absolute)
        .map_err(|()| anyhow!("cannot convert {} to a file URI", absolute.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uris_are_kept_verbatim() {
        assert_eq!(
            parse_location("vscode-remote://ssh-remote+box/home/user").unwrap().as_str(),
            "vscode-remote://ssh-remote+box/home/user"
        );
        assert_eq!(
            parse_location("file:///c%3A/workspace").unwrap().as_str(),
            "file:///c%3A/workspace"
        );
    }

    #[cfg(unix)]
    #[test]
    fn absolute_paths_become_file_uris() {
        assert_eq!(
            parse_location("/workspace/project").unwrap().as_str(),
            "file:///workspace/project"
        );
    }

    #[cfg(unix)]
    #[test]
    fn relative_paths_are_resolved_against_the_current_directory() {
        let url = parse_location("project").unwrap();
        assert_eq!(url.scheme(), "file");
        assert!(url.path().ends_with("/project"));
    }
}
