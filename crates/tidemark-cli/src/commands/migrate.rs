use anyhow::{Context, Result, bail};
use colored::Colorize;
use tidemark_core::{ErrorList, Version};
use tidemark_runtime::{MigrateError, MigrationEngine, Outcome, SeaOrmBackend};

use crate::utils::{connection_names, load_config, load_registry, select_connections};

#[derive(Debug, Clone, Default)]
pub struct MigrateArgs {
    pub version: Option<Version>,
    pub up: bool,
    pub down: bool,
    pub dry_run: bool,
    pub connection: Option<String>,
}

/// Target for one connection given its stored and latest versions.
///
/// `--up` stops at the latest registered step and `--down` at 0.
fn target_version(args: &MigrateArgs, current: Version, latest: Version) -> Option<Version> {
    if args.up {
        Some(current.saturating_add(1).min(latest.max(current)))
    } else if args.down {
        Some(current.saturating_sub(1))
    } else {
        args.version
    }
}

fn print_errors(errors: &ErrorList) {
    for record in errors.iter() {
        println!("    {} {}", "-".bright_red(), record.to_string().red());
    }
}

pub async fn cmd_migrate(args: MigrateArgs) -> Result<()> {
    let config = load_config()?;
    let (_, registry) = load_registry(&config)?;
    let names = select_connections(
        connection_names(&config, &registry)?,
        args.connection.as_deref(),
    )?;
    if names.is_empty() {
        println!("{}", "No connections found.".bright_yellow());
        return Ok(());
    }

    let backend = SeaOrmBackend::connect(&config, names.iter().map(String::as_str))
        .await
        .context("connect to databases")?;
    let mut engine = MigrationEngine::new(backend, registry, config.version_table());

    let mut failed = 0usize;
    for name in &names {
        let latest = engine.registry().latest_version(name);
        let target = if args.up || args.down {
            let current = engine
                .current_version(name)
                .await
                .with_context(|| format!("read current version of '{name}'"))?;
            target_version(&args, current, latest)
        } else {
            args.version
        };

        match engine.migrate(name, target, args.dry_run).await {
            Ok(Outcome::Applied(version)) => println!(
                "{} {} {}",
                name.bright_cyan().bold(),
                "migrated to version".bright_green(),
                version.to_string().bright_magenta()
            ),
            Ok(Outcome::DryRun(version)) => println!(
                "{} {} {}",
                name.bright_cyan().bold(),
                "dry run succeeded for version".bright_green(),
                version.to_string().bright_magenta()
            ),
            Ok(Outcome::DryRunFailed) => {
                failed += 1;
                println!(
                    "{} {}",
                    name.bright_cyan().bold(),
                    "dry run failed:".bright_red()
                );
                print_errors(engine.errors());
            }
            Err(MigrateError::Aggregate { errors, .. }) => {
                failed += 1;
                println!(
                    "{} {}",
                    name.bright_cyan().bold(),
                    "migration failed:".bright_red()
                );
                print_errors(&errors);
            }
        }
    }

    if failed > 0 {
        bail!("{failed} connection(s) failed to migrate");
    }
    Ok(())
}
