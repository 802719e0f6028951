//! de-assistant CLI Entry Point
//!
//! Subcommands:
//! - `test-connection` - check the configured database answers `select 1`
//! - `tables` - list base tables
//! - `head` - preview the first rows of a table
//! - `query` - run ad-hoc SQL
//! - `serve` - start the HTTP API and front end
//!
//! Results go to stdout, logs and errors to stderr. Exit code 0 on success,
//! 1 on failure.

use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use de_assistant::config::{self, ChatSettings, ServerSettings};
use de_assistant::server::{self, AppState};
use de_assistant::table::TextTable;
use de_assistant::{operations, PostgresConnector, QueryOutput};

/// Data Engineer Assistant CLI for PostgreSQL
#[derive(Parser)]
#[command(name = "de-assistant")]
#[command(about = "Data Engineer Assistant CLI for PostgreSQL")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that the configured database accepts connections
    TestConnection,

    /// List base tables as (schema, table) pairs
    Tables {
        /// Schema name (default: all user schemas)
        #[arg(long)]
        schema: Option<String>,

        /// Include pg_catalog and information_schema
        #[arg(long)]
        include_system: bool,
    },

    /// Show the first rows of a table
    Head {
        /// Table name
        table: String,

        /// Schema name (default: public)
        #[arg(long)]
        schema: Option<String>,

        /// Number of rows to show
        #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(i64).range(1..))]
        limit: i64,
    },

    /// Run an SQL statement
    Query {
        /// SQL to run
        sql: String,

        /// Limit rows by wrapping the query
        #[arg(long, value_parser = clap::value_parser!(i64).range(1..))]
        limit: Option<i64>,
    },

    /// Start the HTTP API and static front end
    Serve {
        /// Bind host (default: APP_HOST or 0.0.0.0)
        #[arg(long)]
        host: Option<String>,

        /// Bind port (default: APP_PORT or 8000)
        #[arg(long)]
        port: Option<u16>,
    },
}

fn init_tracing(default_directive: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // .env first so a RUST_LOG set there reaches the filter.
    config::load_dotenv();
    // Keep one-shot commands quiet unless RUST_LOG says otherwise.
    init_tracing(if matches!(cli.command, Commands::Serve { .. }) { "info" } else { "warn" });

    match run(cli.command).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Commands) -> anyhow::Result<ExitCode> {
    let connector = PostgresConnector;

    match command {
        Commands::TestConnection => {
            let params = config::load_config()?;
            let check = operations::test_connection(&connector, &params).await;
            if check.ok {
                println!("{}", check.message);
                Ok(ExitCode::SUCCESS)
            } else {
                eprintln!("{}", check.message);
                Ok(ExitCode::FAILURE)
            }
        }
        Commands::Tables { schema, include_system } => {
            let params = config::load_config()?;
            let tables = operations::list_tables(&connector, &params, include_system, schema.as_deref()).await?;
            print!("{}", TextTable::from(tables.as_slice()).render());
            Ok(ExitCode::SUCCESS)
        }
        Commands::Head { table, schema, limit } => {
            let params = config::load_config()?;
            let result = operations::fetch_head(&connector, &params, &table, schema.as_deref(), limit).await?;
            print!("{}", TextTable::from(&result).render());
            Ok(ExitCode::SUCCESS)
        }
        Commands::Query { sql, limit } => {
            let params = config::load_config()?;
            match operations::run_query(&connector, &params, &sql, limit).await? {
                QueryOutput::Rows(result) => print!("{}", TextTable::from(&result).render()),
                QueryOutput::Command(outcome) => {
                    println!("Query executed. No rows returned.");
                    println!("{}", outcome.status);
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Serve { host, port } => {
            let mut settings = ServerSettings::from_env()?;
            if let Some(host) = host {
                settings.host = host;
            }
            if let Some(port) = port {
                settings.port = port;
            }

            let state = AppState::new(connector, settings.static_dir.clone())
                .with_env_url(config::database_url())
                .with_chat_settings(ChatSettings::from_env());

            let addr = settings.bind_addr();
            server::serve(state, &addr)
                .await
                .with_context(|| format!("server on {addr} failed"))?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
