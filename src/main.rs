//! Command line front-end for the shelf library pipeline.
//!
//! Stores and the remote catalog are replaced by JSON files, so the pipeline
//! can be exercised against fixtures without a device. `run` writes the
//! reconciled language table and any scanned books back to their files.

mod commands;
mod error;
mod input;
mod render;
mod store;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "shelf", version, about = "Library reconciliation pipeline")]
struct Cli {
    /// Explicit configuration file (TOML, YAML or JSON).
    #[arg(long, global = true, env = "SHELF_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

/// JSON fixtures for each pipeline input. Missing files count as empty.
#[derive(Args, Debug, Default)]
struct InputArgs {
    /// Catalog document: `{"books": [...]}`.
    #[arg(long)]
    catalog: Option<PathBuf>,
    /// Books on disk: `[{"book": {...}, "path": "..."}]`.
    #[arg(long)]
    books: Option<PathBuf>,
    /// Active downloads: `[{"download_id": 1, "book": {...}, ...}]`.
    #[arg(long)]
    downloads: Option<PathBuf>,
    /// Language table: `[{"code": "eng", "active": true}]`. Updated by `run`.
    #[arg(long)]
    languages: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Build the sectioned library list once and print it.
    Sections {
        #[command(flatten)]
        inputs: InputArgs,
        #[arg(long, default_value = "")]
        filter: String,
        /// unknown, can-write-large-files or cannot-write-large-files.
        #[arg(long, default_value = "unknown")]
        capability: String,
    },
    /// Reconcile the language table against the catalog and print it.
    Languages {
        #[command(flatten)]
        inputs: InputArgs,
    },
    /// Run a full library session until the catalog has settled.
    Run {
        #[command(flatten)]
        inputs: InputArgs,
        #[arg(long, default_value = "")]
        filter: String,
        #[arg(long, default_value = "unknown")]
        capability: String,
        /// Pretend the active connection is not Wi-Fi.
        #[arg(long)]
        metered: bool,
        /// Scan the configured directories before printing.
        #[arg(long)]
        rescan: bool,
        /// How long to wait for the pipeline to settle, in milliseconds.
        #[arg(long, default_value_t = 5000)]
        timeout_ms: u64,
    },
    /// Print the effective configuration as JSON.
    Config,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.config.as_deref();
    let result = match cli.command {
        Command::Sections { inputs, filter, capability } => {
            commands::sections(&inputs, &filter, &capability).await
        },
        Command::Languages { inputs } => commands::languages(config, &inputs).await,
        Command::Run { inputs, filter, capability, metered, rescan, timeout_ms } => {
            let run = commands::RunArgs { filter, capability, metered, rescan, timeout_ms };
            commands::run(config, &inputs, run).await
        },
        Command::Config => commands::config(config),
    };

    match result {
        Ok(output) => {
            print!("{output}");
            ExitCode::SUCCESS
        },
        Err(error) => {
            eprintln!("{error:?}");
            ExitCode::FAILURE
        },
    }
}
