use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tidemark_config::FileFormat;
use tidemark_core::Version;
use tidemark_query::DatabaseBackend;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod commands;
mod utils;
use commands::{MigrateArgs, cmd_init, cmd_migrate, cmd_new, cmd_sql, cmd_status};

/// tidemark command-line interface.
#[derive(Parser, Debug)]
#[command(name = "tidemark", author, version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// SQL dialect to render statements for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum SqlBackend {
    #[default]
    Postgres,
    Mysql,
    Sqlite,
}

impl From<SqlBackend> for DatabaseBackend {
    fn from(backend: SqlBackend) -> Self {
        match backend {
            SqlBackend::Postgres => DatabaseBackend::Postgres,
            SqlBackend::Mysql => DatabaseBackend::MySql,
            SqlBackend::Sqlite => DatabaseBackend::Sqlite,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Initialize tidemark.json with defaults.
    Init,
    /// Scaffold a new step file for a connection.
    New {
        /// Connection the step belongs to.
        connection: String,
        /// Step name, used in the file name.
        #[arg(short = 'n', long = "name")]
        name: String,
        /// File format; defaults to `stepFormat` from tidemark.json.
        #[arg(short = 'f', long = "format", value_enum)]
        format: Option<FileFormat>,
    },
    /// Apply or revert steps on every connection.
    Migrate {
        /// Target version; defaults to the latest registered step.
        version: Option<Version>,
        /// Move one step up from the current version.
        #[arg(long, conflicts_with_all = ["down", "version"])]
        up: bool,
        /// Move one step down from the current version.
        #[arg(long, conflicts_with = "version")]
        down: bool,
        /// Run every step, then roll back.
        #[arg(long)]
        dry_run: bool,
        /// Only migrate this connection.
        #[arg(short = 'c', long = "connection")]
        connection: Option<String>,
    },
    /// Show stored and latest versions per connection.
    Status,
    /// Show the SQL each step executes on the way up.
    Sql {
        #[arg(short = 'c', long = "connection")]
        connection: Option<String>,
        #[arg(short = 'b', long = "backend", value_enum, default_value_t)]
        backend: SqlBackend,
    },
}

/// Initializes tracing; `RUST_LOG` overrides the default `warn` level.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Commands::Init => cmd_init(),
        Commands::New {
            connection,
            name,
            format,
        } => cmd_new(connection, name, format),
        Commands::Migrate {
            version,
            up,
            down,
            dry_run,
            connection,
        } => {
            cmd_migrate(MigrateArgs {
                version,
                up,
                down,
                dry_run,
                connection,
            })
            .await
        }
        Commands::Status => cmd_status().await,
        Commands::Sql {
            connection,
            backend,
        } => cmd_sql(connection, backend.into()),
    }
}
