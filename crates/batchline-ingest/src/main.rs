//! Batchline Ingest - Person import runner

use anyhow::Result;
use batchline_common::logging::{init_logging, LogConfig, LogLevel};
use batchline_ingest::{log_summary, run_import, succeeded, ImportOptions};
use batchline_server::config::{Config, ImportConfig, StoreKind};
use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "batchline-ingest")]
#[command(author, version, about = "Batchline person import runner")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Parser, Debug)]
enum Command {
    /// Import persons from a CSV file
    Run {
        /// Input CSV file
        #[arg(short, long)]
        input: PathBuf,

        /// Records per transaction
        #[arg(long, default_value_t = 10)]
        chunk_size: usize,

        /// Faulty records tolerated before the job fails
        #[arg(long, default_value_t = 10)]
        skip_limit: u64,

        /// Header lines to ignore
        #[arg(long, default_value_t = 1)]
        lines_to_skip: usize,

        /// Person store backend (memory or postgres)
        #[arg(long, default_value = "memory")]
        store: StoreKind,

        /// PostgreSQL connection URL
        #[arg(long, env = "DATABASE_URL")]
        database_url: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    let log_config = LogConfig::builder()
        .level(log_level)
        .log_file_prefix("batchline-ingest".to_string())
        .build();

    // Environment variables override the values set above
    let log_config = log_config.merge_env()?;

    let _guard = init_logging(&log_config)?;

    match cli.command {
        Command::Run {
            input,
            chunk_size,
            skip_limit,
            lines_to_skip,
            store,
            database_url,
        } => {
            let defaults = Config::default();
            let mut database = defaults.database;
            if let Some(url) = database_url {
                database.url = url;
            }

            let options = ImportOptions {
                import: ImportConfig {
                    input_path: input,
                    chunk_size,
                    skip_limit,
                    lines_to_skip,
                    ..defaults.import
                },
                store,
                database,
            };

            let execution = run_import(&options).await?;
            log_summary(&execution);

            if !succeeded(&execution) {
                error!(status = %execution.status, "Import did not complete");
                std::process::exit(1);
            }
        },
    }

    info!("Ingestion complete");
    Ok(())
}
