use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tidemark_config::TidemarkConfig;

pub const CONFIG_FILE: &str = "tidemark.json";

/// Load tidemark.json config from current directory.
pub fn load_config() -> Result<TidemarkConfig> {
    let path = PathBuf::from(CONFIG_FILE);
    if !path.exists() {
        anyhow::bail!("tidemark.json not found. Run 'tidemark init' first.");
    }

    let content = fs::read_to_string(&path).context("read tidemark.json")?;
    let config: TidemarkConfig = serde_json::from_str(&content).context("parse tidemark.json")?;
    Ok(config)
}

/// Load config from a specific path.
pub fn load_config_from_path(path: PathBuf) -> Result<TidemarkConfig> {
    if !path.exists() {
        anyhow::bail!("tidemark.json not found at: {}", path.display());
    }

    let content = fs::read_to_string(&path).context("read tidemark.json")?;
    let config: TidemarkConfig = serde_json::from_str(&content).context("parse tidemark.json")?;
    Ok(config)
}

/// Load config from project root, with fallback to defaults.
pub fn load_config_or_default(project_root: Option<PathBuf>) -> Result<TidemarkConfig> {
    let config_path = if let Some(root) = project_root {
        root.join(CONFIG_FILE)
    } else {
        PathBuf::from(CONFIG_FILE)
    };

    if config_path.exists() {
        load_config_from_path(config_path)
    } else {
        Ok(TidemarkConfig::default())
    }
}
