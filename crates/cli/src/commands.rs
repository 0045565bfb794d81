use std::fmt::Write as _;
use std::sync::Arc;

use anyhow::{Context, Result};
use schnitt_chunkers::ChunkerRegistry;
use schnitt_core::{ChunkOptions, ChunkResult, ChunkerConfig};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::cli::ChunkArgs;

/// Merge configured defaults with command-line overrides.
pub fn build_options(args: &ChunkArgs, config: &ChunkerConfig) -> ChunkOptions {
    let mut opts = config.to_options();
    opts.mime_type = args.mime.clone().unwrap_or_default();
    opts.language = args
        .language
        .clone()
        .unwrap_or_else(|| args.path.to_string_lossy().into_owned());
    if let Some(max) = args.max_chunk_size {
        opts.max_chunk_size = max;
    }
    opts
}

/// Read `args.path` and segment it on the blocking pool.
///
/// Invalid UTF-8 is replaced rather than rejected; cancelling `cancel`
/// aborts the run with `ChunkError::Cancelled`.
pub async fn chunk_file(
    registry: Arc<ChunkerRegistry>,
    args: &ChunkArgs,
    config: &ChunkerConfig,
    cancel: CancellationToken,
) -> Result<ChunkResult> {
    let bytes = tokio::fs::read(&args.path)
        .await
        .with_context(|| format!("failed to read {}", args.path.display()))?;
    let content = String::from_utf8_lossy(&bytes).into_owned();
    let opts = build_options(args, config);
    debug!(
        path = %args.path.display(),
        bytes = content.len(),
        mime_type = %opts.mime_type,
        language = %opts.language,
        "chunking file"
    );

    let result = tokio::task::spawn_blocking(move || registry.chunk(&cancel, &content, &opts))
        .await
        .context("chunking task panicked")??;

    info!(
        chunker = %result.chunker_used,
        chunks = result.total_chunks,
        warnings = result.warnings.len(),
        "chunked {}",
        args.path.display()
    );
    Ok(result)
}

pub fn render(result: &ChunkResult, pretty: bool) -> Result<String> {
    let json = if pretty {
        serde_json::to_string_pretty(result)
    } else {
        serde_json::to_string(result)
    };
    json.context("failed to serialize chunk result")
}

/// One line per segmenter: priority, name, and a marker for the fallback.
pub fn render_listing(registry: &ChunkerRegistry) -> String {
    let mut out = String::new();
    for info in registry.list() {
        let marker = if info.fallback { "  (fallback)" } else { "" };
        let _ = writeln!(out, "{:>4}  {}{}", info.priority, info.name, marker);
    }
    out
}
