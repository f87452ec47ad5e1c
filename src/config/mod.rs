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
        "./config.toml",
        "./vidstream.toml",
        "~/.config/vidstream/config.toml",
        "/etc/vidstream/config.toml",
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
    if config.server.port == 0 {
        anyhow::bail!("Server port cannot be 0");
    }

    if config.storage.max_upload_mb == 0 {
        anyhow::bail!("storage.max_upload_mb must be greater than 0");
    }

    if config.storage.video_dir == config.storage.hls_dir {
        anyhow::bail!(
            "storage.video_dir and storage.hls_dir must differ (both {:?})",
            config.storage.video_dir
        );
    }

    if config.transcode.segment_seconds == 0 {
        anyhow::bail!("transcode.segment_seconds must be greater than 0");
    }

    if config.transcode.timeout_secs == 0 {
        anyhow::bail!("transcode.timeout_secs must be greater than 0");
    }

    if let Some(ref path) = config.transcode.ffmpeg_path {
        if !path.exists() {
            tracing::warn!("Configured ffmpeg path does not exist: {:?}", path);
        }
    }

    Ok(())
}
