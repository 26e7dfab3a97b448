use anyhow::{Context, Result};
use std::path::PathBuf;

/// Overrides the config directory, mainly for tests.
pub const CONFIG_DIR_ENV: &str = "REELCLIP_CONFIG_DIR";

/// Get the reelclip config directory
pub fn reelclip_config_dir() -> Result<PathBuf> {
    let config_dir = match std::env::var_os(CONFIG_DIR_ENV) {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => dirs::config_dir()
            .context("Unable to determine user config directory")?
            .join("reelclip"),
    };

    std::fs::create_dir_all(&config_dir)
        .with_context(|| format!("creating config directory at {}", config_dir.display()))?;

    Ok(config_dir)
}

/// Get the directory WhisperX transcripts are cached in
pub fn transcript_cache_dir() -> Result<PathBuf> {
    let cache_dir = dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("~/.cache"))
        .join("reelclip")
        .join("transcripts");

    std::fs::create_dir_all(&cache_dir)
        .with_context(|| format!("creating cache directory at {}", cache_dir.display()))?;

    Ok(cache_dir)
}
