use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Structure-aware text segmentation.
///
/// Splits source files into bounded chunks along the boundaries of their
/// format and prints the result as JSON.
#[derive(Parser, Debug)]
#[command(name = "schnitt", about = "Structure-aware text segmentation", version)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Chunk a file and print the result as JSON
    Chunk(ChunkArgs),

    /// List registered segmenters in dispatch order
    List,
}

#[derive(clap::Args, Debug)]
pub struct ChunkArgs {
    /// File to segment
    pub path: PathBuf,

    /// MIME type hint (e.g. text/x-sql)
    #[arg(long)]
    pub mime: Option<String>,

    /// Language or filename hint (defaults to the path)
    #[arg(long)]
    pub language: Option<String>,

    /// Byte cap per chunk (overrides CHUNK_MAX_SIZE; 0 = default)
    #[arg(long)]
    pub max_chunk_size: Option<usize>,

    /// Pretty-print the JSON output
    #[arg(long)]
    pub pretty: bool,
}
