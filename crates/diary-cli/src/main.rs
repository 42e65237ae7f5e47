use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{Local, Utc};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use diary_cli::commands::{dump, report, status, track, util};
use diary_cli::{Cli, Commands, Config};
use diary_core::Tracker;
use diary_db::Database;

/// Load config and open database, ensuring the parent directory exists.
fn open_database(config_path: Option<&Path>) -> Result<(Database, Config)> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }

    let db = Database::open(&config.database_path)
        .with_context(|| format!("failed to open {}", config.database_path.display()))?;
    Ok((db, config))
}

fn track_stdin(db: Database, config: &Config) -> Result<()> {
    let mut tracker =
        Tracker::open(db, config.classifier).context("failed to load persisted counters")?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start event loop")?;

    runtime.block_on(async {
        let stdin = tokio::io::BufReader::new(tokio::io::stdin());
        let interrupted = async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::warn!(error = %err, "cannot listen for interrupts");
                std::future::pending::<()>().await;
            }
        };
        track::run(stdin, &mut tracker, interrupted).await
    })?;
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays machine-readable.
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    match &cli.command {
        Some(Commands::Track) => {
            let (db, config) = open_database(cli.config.as_deref())?;
            track_stdin(db, &config)?;
        }
        Some(Commands::Report { json, at }) => {
            let (db, config) = open_database(cli.config.as_deref())?;
            let at = at.as_deref().map(util::parse_datetime).transpose()?;
            let now = at.unwrap_or_else(Utc::now).with_timezone(&Local);
            report::run(&mut io::stdout().lock(), &db, &now, &config.aggregation, *json)?;
        }
        Some(Commands::Status) => {
            let (db, config) = open_database(cli.config.as_deref())?;
            status::run(
                &mut io::stdout().lock(),
                &db,
                &config.database_path,
                &Local::now(),
            )?;
        }
        Some(Commands::Entries) => {
            let (db, _config) = open_database(cli.config.as_deref())?;
            dump::entries(&db, &mut io::stdout().lock())?;
        }
        Some(Commands::Errors) => {
            let (db, _config) = open_database(cli.config.as_deref())?;
            dump::errors(&db, &mut io::stdout().lock())?;
        }
        None => {
            use clap::CommandFactory;
            Cli::command().print_help()?;
            println!();
        }
    }

    Ok(())
}
