use std::sync::Arc;
use std::thread;

use schnitt_chunkers::{ChunkerRegistry, FallbackChunker, SqlChunker};
use schnitt_core::{ChunkError, ChunkOptions};
use tokio_util::sync::CancellationToken;

use crate::helpers::{run, SAMPLES};

#[test]
fn test_concurrent_callers_share_one_registry() {
    let registry = Arc::new(ChunkerRegistry::with_defaults());
    let expected: Vec<_> = SAMPLES.iter().map(|s| run(&registry, s, 90)).collect();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                SAMPLES
                    .iter()
                    .map(|s| run(&registry, s, 90))
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), expected);
    }
}

#[test]
fn test_registration_while_reading() {
    let registry = Arc::new(ChunkerRegistry::new());
    registry.set_fallback(Arc::new(FallbackChunker::new()));

    let reader = {
        let registry = Arc::clone(&registry);
        thread::spawn(move || {
            for _ in 0..200 {
                let result = registry
                    .chunk(
                        &CancellationToken::new(),
                        "SELECT 1;",
                        &ChunkOptions::for_language("q.sql"),
                    )
                    .unwrap();
                assert!(result.chunker_used == "sql" || result.chunker_used == "fallback");
            }
        })
    };
    registry.register(Arc::new(SqlChunker::new()));
    reader.join().unwrap();

    assert_eq!(registry.get("", "q.sql").unwrap().name(), "sql");
}

#[tokio::test]
async fn test_blocking_tasks_resolve_per_format() {
    let registry = Arc::new(ChunkerRegistry::with_defaults());
    let mut tasks = Vec::new();
    for sample in SAMPLES {
        let registry = Arc::clone(&registry);
        tasks.push(tokio::task::spawn_blocking(move || {
            (sample.chunker, run(&registry, sample, 0).chunker_used)
        }));
    }
    for task in tasks {
        let (expected, used) = task.await.unwrap();
        assert_eq!(used, expected);
    }
}

#[test]
fn test_cancelled_token_surfaces_through_registry() {
    let registry = ChunkerRegistry::with_defaults();
    let cancel = CancellationToken::new();
    cancel.cancel();
    for sample in SAMPLES {
        let err = registry
            .chunk(&cancel, sample.text, &sample.options(0))
            .unwrap_err();
        assert!(err.is_cancelled(), "{} ignored cancellation", sample.chunker);
    }
}

#[test]
fn test_unknown_format_goes_to_fallback() {
    let registry = ChunkerRegistry::with_defaults();
    let opts = ChunkOptions::for_mime("application/x-unknown");
    let result = registry
        .chunk(&CancellationToken::new(), "opaque payload", &opts)
        .unwrap();
    assert_eq!(result.chunker_used, "fallback");
    assert_eq!(result.total_chunks, 1);
}

#[test]
fn test_empty_registry_reports_no_chunker() {
    let registry = ChunkerRegistry::new();
    let opts = ChunkOptions::for_mime("text/x-cobol");
    let err = registry
        .chunk(&CancellationToken::new(), "IDENTIFICATION DIVISION.", &opts)
        .unwrap_err();
    match err {
        ChunkError::NoChunker { mime_type, language } => {
            assert_eq!(mime_type, "text/x-cobol");
            assert!(language.is_empty());
        }
        other => panic!("unexpected error: {other}"),
    }
}
