use anyhow::Result;
use colored::Colorize;
use tidemark_config::TidemarkConfig;
use tidemark_core::Version;
use tidemark_runtime::{Backend, DatabaseError, SeaOrmBackend, VersionStore};

use crate::utils::{connection_names, load_config, load_registry};

async fn stored_version(
    config: &TidemarkConfig,
    connection: &str,
) -> Result<Version, DatabaseError> {
    let backend = SeaOrmBackend::connect(config, [connection]).await?;
    let mut store = VersionStore::new(config.version_table());
    store.ensure_schema(&backend, connection).await?;
    let mut tx = backend.begin(connection).await?;
    let version = store.current_version(tx.as_mut()).await;
    tx.rollback().await?;
    version
}

pub async fn cmd_status() -> Result<()> {
    let config = load_config()?;
    let (_, registry) = load_registry(&config)?;
    let names = connection_names(&config, &registry)?;

    println!("{}", "Configuration:".bright_cyan().bold());
    println!(
        "  {} {}",
        "Migrations directory:".cyan(),
        format!("{}", config.migrations_dir().display()).bright_white()
    );
    println!(
        "  {} {}",
        "Version table:".cyan(),
        config.version_table().bright_white()
    );
    println!("  {} {:?}", "Step format:".cyan(), config.step_format());
    println!();

    println!(
        "{} {}",
        "Connections:".bright_cyan().bold(),
        names.len().to_string().bright_yellow()
    );
    for name in &names {
        let latest = registry.latest_version(name);
        println!("  {} {}", "-".bright_white(), name.bright_green());
        println!(
            "    {} {}",
            "Latest version:".cyan(),
            latest.to_string().bright_magenta()
        );

        if config.connection_url(name).is_none() {
            println!(
                "    {} {}",
                "Current version:".cyan(),
                "no database configured".bright_black()
            );
            continue;
        }
        match stored_version(&config, name).await {
            Ok(current) => {
                println!(
                    "    {} {}",
                    "Current version:".cyan(),
                    current.to_string().bright_magenta()
                );
                let pending = latest.saturating_sub(current);
                let pending = if pending == 0 {
                    "up to date".bright_green()
                } else {
                    pending.to_string().bright_yellow()
                };
                println!("    {} {}", "Pending:".cyan(), pending);
            }
            Err(err) => println!(
                "    {} {}",
                "Current version:".cyan(),
                err.to_string().bright_red()
            ),
        }
    }
    Ok(())
}
