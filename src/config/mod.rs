mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Deepest downward BDMV search accepted from configuration.
pub const MAX_BDMV_SEARCH_DEPTH: usize = 8;

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
        "./bdscan.toml",
        "~/.config/bdscan/config.toml",
        "/etc/bdscan/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            tracing::debug!("Using config file {:?}", path);
            return load_config(path);
        }
    }

    Ok(Config::default())
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if config.scan.bdmv_search_depth > MAX_BDMV_SEARCH_DEPTH {
        anyhow::bail!(
            "scan.bdmv_search_depth {} exceeds the maximum of {}",
            config.scan.bdmv_search_depth,
            MAX_BDMV_SEARCH_DEPTH
        );
    }

    let min = config.filter.min_playlist_length_secs;
    if min.is_nan() || min < 0.0 {
        anyhow::bail!("filter.min_playlist_length_secs must be a non-negative number");
    }

    Ok(())
}
