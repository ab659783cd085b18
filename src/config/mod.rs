mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    let default_paths = [
        "./reelforge.toml",
        "~/.config/reelforge/config.toml",
        "/etc/reelforge/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            return load_config(path);
        }
    }

    Ok(Config::default())
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if config.storage.artifact_dir.as_os_str().is_empty() {
        anyhow::bail!("Artifact directory cannot be empty");
    }

    if config.tools.timeout_secs == Some(0) {
        anyhow::bail!("Tool timeout cannot be 0 (omit it to disable the limit)");
    }

    if !config.storage.upload_dir.exists() {
        tracing::warn!("Upload directory does not exist: {:?}", config.storage.upload_dir);
    }

    config
        .defaults
        .resolve()
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid [defaults]: {}", e))?;

    Ok(())
}
