use std::fs;

use anyhow::{Context, Result, bail};
use colored::Colorize;
use tidemark_config::FileFormat;
use tidemark_loader::StepFile;

use crate::utils::{load_config, load_registry, step_filename};

pub fn cmd_new(connection: String, name: String, format: Option<FileFormat>) -> Result<()> {
    if name.is_empty() || name.contains(['/', '\\']) {
        bail!("invalid step name: '{name}'");
    }
    let config = load_config()?;
    let (mut loader, mut registry) = load_registry(&config)?;

    let dir = config.connection_dir(&connection);
    if !dir.exists() {
        fs::create_dir_all(&dir).context("create connection directory")?;
    }

    let format = format.unwrap_or(config.step_format());
    let path = dir.join(step_filename(&name, format));
    if path.exists() {
        bail!("step file already exists: {}", path.display());
    }

    let step = StepFile {
        name: Some(name.clone()),
        up: Some(Vec::new()),
        down: Some(Vec::new()),
        ..Default::default()
    };
    let text = step
        .render(format)
        .map_err(anyhow::Error::msg)
        .context("serialize step file")?;
    fs::write(&path, text).with_context(|| format!("write step file: {}", path.display()))?;

    let version = loader.register_file(&mut registry, &path, &connection)?;

    println!("{} {}", "Created step:".bright_green(), path.display());
    println!(
        "  {} {}",
        "Connection:".cyan(),
        connection.bright_white()
    );
    println!(
        "  {} {}",
        "Version:".cyan(),
        version.to_string().bright_magenta()
    );
    Ok(())
}
