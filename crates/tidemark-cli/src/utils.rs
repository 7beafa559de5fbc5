use std::collections::BTreeSet;
use std::fs;

use anyhow::{Context, Result};
use chrono::Utc;
use colored::Colorize;
use tidemark_config::{FileFormat, TidemarkConfig};
use tidemark_loader::{MigrationRegistry, StepLoader};

pub use tidemark_loader::load_config;

/// Discover every step file under the migrations directory.
pub fn load_registry(config: &TidemarkConfig) -> Result<(StepLoader, MigrationRegistry)> {
    let mut loader = StepLoader::new();
    let mut registry = MigrationRegistry::new();
    loader
        .load_from_directories(&[config.migrations_dir()], &mut registry)
        .context("load step files")?;
    for skipped in loader.skipped() {
        eprintln!("{} {}", "warning:".bright_yellow(), skipped);
    }
    Ok((loader, registry))
}

/// Connection names: every subdirectory of the migrations directory plus
/// every connection that has registered steps, sorted.
pub fn connection_names(
    config: &TidemarkConfig,
    registry: &MigrationRegistry,
) -> Result<Vec<String>> {
    let mut names: BTreeSet<String> = registry.connections().map(str::to_string).collect();
    let dir = config.migrations_dir();
    if dir.exists() {
        for entry in fs::read_dir(dir).context("read migrations directory")? {
            let entry = entry.context("read directory entry")?;
            if entry.file_type().context("read file type")?.is_dir() {
                names.insert(entry.file_name().to_string_lossy().into_owned());
            }
        }
    }
    Ok(names.into_iter().collect())
}

/// Keep only `only` when given, failing if it is not a known connection.
pub fn select_connections(names: Vec<String>, only: Option<&str>) -> Result<Vec<String>> {
    match only {
        None => Ok(names),
        Some(name) if names.iter().any(|n| n == name) => Ok(vec![name.to_string()]),
        Some(name) => anyhow::bail!("unknown connection: {name}"),
    }
}

/// `<timestamp>_<name>.<ext>`, the timestamp being the current UTC time.
pub fn step_filename(name: &str, format: FileFormat) -> String {
    let timestamp = Utc::now().format("%Y%m%d%H%M%S");
    format!("{timestamp}_{name}.{}", format.extension())
}
