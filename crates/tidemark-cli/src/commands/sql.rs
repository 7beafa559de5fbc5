use anyhow::Result;
use colored::Colorize;
use tidemark_core::{ChangeSet, Direction};
use tidemark_loader::{MigrationRegistry, RegisteredStep};
use tidemark_query::DatabaseBackend;
use tidemark_runtime::ChangeProcessor;

use crate::utils::{connection_names, load_config, load_registry, select_connections};

/// Statements one step executes on the way up, or the reason it cannot be
/// rendered.
fn step_sql(
    processor: &ChangeProcessor,
    backend: DatabaseBackend,
    step: &RegisteredStep,
) -> Result<Vec<String>, String> {
    let direction = Direction::Up;
    let hooks = [
        step.hooks.pre_hook(direction),
        step.hooks.main_hook(direction),
        step.hooks.post_hook(direction),
    ];
    let mut statements = Vec::new();
    for hook in hooks.into_iter().flatten() {
        let mut changes = ChangeSet::new();
        step.step
            .run(hook, direction, &mut changes)
            .map_err(|e| format!("{hook} hook failed: {e}"))?;
        for change in changes.iter() {
            let rendered = processor
                .render(backend, change)
                .map_err(|e| e.to_string())?;
            statements.extend(rendered);
        }
    }
    Ok(statements)
}

fn emit_sql(registry: &MigrationRegistry, connection: &str, backend: DatabaseBackend) {
    let processor = ChangeProcessor::new();
    let steps = registry.steps_for(connection);
    println!(
        "{} {} ({} {})",
        "Connection:".bright_cyan().bold(),
        connection.bright_green(),
        steps.len().to_string().bright_yellow(),
        "steps".bright_white()
    );
    if steps.is_empty() {
        println!("  {}", "No steps registered.".bright_white());
        return;
    }

    for step in steps {
        println!(
            "  {} {}",
            format!("{}.", step.version).bright_magenta().bold(),
            step.name.bright_white()
        );
        match step_sql(&processor, backend, step) {
            Ok(statements) if statements.is_empty() => {
                println!("     {}", "(no statements)".bright_black())
            }
            Ok(statements) => {
                for sql in statements {
                    println!("     {};", sql.trim());
                }
            }
            Err(reason) => println!("     {}", reason.bright_red()),
        }
    }
}

pub fn cmd_sql(connection: Option<String>, backend: DatabaseBackend) -> Result<()> {
    let config = load_config()?;
    let (_, registry) = load_registry(&config)?;
    let names = select_connections(
        connection_names(&config, &registry)?,
        connection.as_deref(),
    )?;

    println!(
        "{} {}",
        "Backend:".bright_cyan().bold(),
        backend.to_string().bright_white()
    );
    for name in &names {
        println!();
        emit_sql(&registry, name, backend);
    }
    Ok(())
}
