//! Command-line interface for stream-ingest
//!
//! # Usage Examples
//!
//! ```bash
//! # Consume a JSONL file with a checkpoint every 100 records
//! stream-ingest consume \
//!   --config stream.toml \
//!   --schema events.yaml \
//!   --commit-every 100
//!
//! # Resume from the stored checkpoint, stop after 10k records
//! stream-ingest consume \
//!   --config stream.toml \
//!   --schema events.yaml \
//!   --resume --max-records 10000
//!
//! # Replay from an explicit offset without touching the checkpoint
//! stream-ingest consume \
//!   --config stream.toml \
//!   --schema events.yaml \
//!   --from-offset 42
//!
//! # Inspect the stored checkpoint for the configured partition
//! stream-ingest show-checkpoint --config stream.toml
//! ```

use anyhow::Context;
use clap::{Parser, Subcommand};
use ingest_core::{Schema, StreamConfig};
use std::path::PathBuf;
use stream_ingest::consume::{self, ConsumeOpts};

#[derive(Parser)]
#[command(name = "stream-ingest")]
#[command(about = "Consume external append-only streams into schema-typed records")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Consume a stream and decode records against a schema
    Consume {
        /// Stream configuration file (TOML)
        #[arg(long, value_name = "PATH", env = "STREAM_INGEST_CONFIG")]
        config: PathBuf,

        /// Schema file (YAML)
        #[arg(long, value_name = "PATH", env = "STREAM_INGEST_SCHEMA")]
        schema: PathBuf,

        /// Stop after this many records (default: run until the stream drains)
        #[arg(long)]
        max_records: Option<u64>,

        /// Commit a checkpoint every N records, and once more on exit
        #[arg(long)]
        commit_every: Option<u64>,

        /// Start consuming at an explicit offset
        #[arg(long, conflicts_with = "resume")]
        from_offset: Option<i64>,

        /// Start consuming just past the stored checkpoint
        #[arg(long)]
        resume: bool,
    },

    /// Print the stored checkpoint for the configured stream partition
    ShowCheckpoint {
        /// Stream configuration file (TOML)
        #[arg(long, value_name = "PATH", env = "STREAM_INGEST_CONFIG")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Consume {
            config,
            schema,
            max_records,
            commit_every,
            from_offset,
            resume,
        } => {
            let stream_config = StreamConfig::from_toml_file(&config)
                .with_context(|| format!("failed to load stream config from {config:?}"))?;
            let schema = Schema::from_yaml_file(&schema)
                .with_context(|| format!("failed to load schema from {schema:?}"))?;

            let registry = stream_ingest::builtin_registry();
            let opts = ConsumeOpts {
                max_records,
                commit_every,
                from_offset,
                resume,
            };
            let summary = consume::run(&registry, &stream_config, &schema, &opts).await?;
            println!(
                "consumed {} records from {}/{} (last offset: {})",
                summary.records,
                stream_config.stream,
                stream_config.partition,
                summary
                    .last_offset
                    .map(|o| o.to_string())
                    .unwrap_or_else(|| "none".to_string())
            );
        }

        Commands::ShowCheckpoint { config } => {
            let stream_config = StreamConfig::from_toml_file(&config)
                .with_context(|| format!("failed to load stream config from {config:?}"))?;
            match consume::load_checkpoint(&stream_config).await? {
                Some(offset) => println!(
                    "{}/{}: last committed offset {offset}",
                    stream_config.stream, stream_config.partition
                ),
                None => println!(
                    "{}/{}: no checkpoint stored",
                    stream_config.stream, stream_config.partition
                ),
            }
        }
    }

    Ok(())
}
