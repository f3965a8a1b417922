//! Operational CLI for the trading-memory graph.
//!
//! Health probing, export/import, and export-file validation against a
//! running Helix instance. Retrieval and ingestion stay library-only; the
//! agent layer drives those.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tradegraph_backend::{
    export_incremental, export_snapshot, import_export, read_export_file, write_export_file,
    GraphStore, HelixClient, HelixConfig,
};

#[derive(Parser)]
#[command(name = "tradegraph", about = "Trading-memory graph operations")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Probe the graph store and report latency.
    Health,
    /// Export the graph to a JSON file.
    Export {
        #[arg(long)]
        output: PathBuf,
        /// Only export records changed since this RFC 3339 timestamp.
        #[arg(long)]
        since: Option<String>,
        /// Source label stamped into the export document.
        #[arg(long, default_value = "tradegraph")]
        source: String,
    },
    /// Import an export file into the graph store.
    Import {
        #[arg(long)]
        input: PathBuf,
        #[arg(long, default_value_t = 100)]
        batch_size: usize,
    },
    /// Validate an export file without importing it.
    ValidateExport {
        #[arg(long)]
        input: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("tradegraph_backend=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let client = HelixClient::new(HelixConfig::from_env());

    match cli.command {
        Command::Health => {
            let status = client.health_check().await;
            if status.healthy {
                info!(latency_ms = status.latency_ms, "graph store healthy");
                println!("healthy ({:.1} ms)", status.latency_ms);
            } else {
                bail!(
                    "graph store unhealthy: {}",
                    status.error.unwrap_or_else(|| "unknown error".to_string())
                );
            }
        }
        Command::Export {
            output,
            since,
            source,
        } => {
            let export = match since {
                Some(raw) => {
                    let since = chrono::DateTime::parse_from_rfc3339(&raw)
                        .context("--since must be an RFC 3339 timestamp")?
                        .with_timezone(&chrono::Utc);
                    export_incremental(&client, &source, since).await?
                }
                None => export_snapshot(&client, &source).await?,
            };
            write_export_file(&export, &output)?;
            println!(
                "exported {} nodes, {} edges to {}",
                export.metadata.node_count,
                export.metadata.edge_count,
                output.display()
            );
        }
        Command::Import { input, batch_size } => {
            let export = read_export_file(&input)?;
            let result = import_export(&client, &export, batch_size).await?;
            println!(
                "imported {} nodes, {} edges ({} skipped)",
                result.nodes_imported,
                result.edges_imported,
                result.nodes_skipped + result.edges_skipped
            );
            for error in &result.errors {
                eprintln!("  {error}");
            }
        }
        Command::ValidateExport { input } => match read_export_file(&input) {
            Ok(export) => println!(
                "valid export: version {}, {} nodes, {} edges",
                export.version, export.metadata.node_count, export.metadata.edge_count
            ),
            Err(err) => bail!("invalid export: {err}"),
        },
    }
    Ok(())
}
