mod cli;
mod commands;

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use schnitt_chunkers::ChunkerRegistry;
use schnitt_core::config::load_dotenv;
use schnitt_core::ChunkerConfig;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::cli::{CliArgs, Command};

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout stays valid JSON
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let args = CliArgs::parse();

    load_dotenv();
    let config = ChunkerConfig::from_env();
    config.log_summary();

    let registry = Arc::new(ChunkerRegistry::with_defaults());

    match args.command {
        Command::List => {
            print!("{}", commands::render_listing(&registry));
        }
        Command::Chunk(chunk_args) => {
            let cancel = CancellationToken::new();
            let on_interrupt = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("interrupt received, cancelling");
                    on_interrupt.cancel();
                }
            });

            let result = commands::chunk_file(registry, &chunk_args, &config, cancel).await?;
            println!("{}", commands::render(&result, chunk_args.pretty)?);
        }
    }

    Ok(())
}
