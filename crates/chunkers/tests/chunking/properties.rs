use schnitt_chunkers::ChunkerRegistry;
use schnitt_core::{ChunkOptions, WarningCode};
use tokio_util::sync::CancellationToken;

use crate::helpers::{run, SAMPLES};

#[test]
fn test_samples_resolve_to_expected_chunker() {
    let registry = ChunkerRegistry::with_defaults();
    for sample in SAMPLES {
        let resolved = registry.get(sample.mime_type, sample.language).unwrap();
        assert_eq!(resolved.name(), sample.chunker, "hint {:?}", sample.language);
        assert_eq!(run(&registry, sample, 0).chunker_used, sample.chunker);
    }
}

#[test]
fn test_offsets_are_monotonic_and_bounded() {
    let registry = ChunkerRegistry::with_defaults();
    for max in [0, 80, 200] {
        for sample in SAMPLES {
            let result = run(&registry, sample, max);
            assert_eq!(result.original_size, sample.text.len());
            assert_eq!(result.total_chunks, result.chunks.len());
            assert!(result.total_chunks > 0, "{} produced nothing", sample.chunker);

            let mut last_start = 0;
            for (i, c) in result.chunks.iter().enumerate() {
                assert_eq!(c.index, i, "{}", sample.chunker);
                assert!(c.start_offset >= last_start, "{} offsets go backwards", sample.chunker);
                assert!(c.end_offset <= result.original_size);
                assert_eq!(c.end_offset - c.start_offset, c.content.len());
                assert!(!c.content.trim().is_empty());
                assert_eq!(c.content.trim(), c.content);
                assert!(c.metadata.token_estimate > 0);
                last_start = c.start_offset;
            }
        }
    }
}

#[test]
fn test_content_matches_source_bytes() {
    let registry = ChunkerRegistry::with_defaults();
    // sql offsets address the grouped layout, not the input
    for sample in SAMPLES.iter().filter(|s| s.chunker != "sql") {
        let result = run(&registry, sample, 120);
        for c in &result.chunks {
            assert_eq!(
                &sample.text[c.start_offset..c.end_offset],
                c.content,
                "{}",
                sample.chunker
            );
        }
    }
}

#[test]
fn test_identical_input_gives_identical_result() {
    let registry = ChunkerRegistry::with_defaults();
    for sample in SAMPLES {
        let first = run(&registry, sample, 100);
        let second = run(&registry, sample, 100);
        assert_eq!(first, second, "{}", sample.chunker);
    }
}

#[test]
fn test_empty_input_for_every_chunker() {
    let registry = ChunkerRegistry::with_defaults();
    for sample in SAMPLES {
        let result = registry
            .chunk(&CancellationToken::new(), "", &sample.options(0))
            .unwrap();
        assert_eq!(result.total_chunks, 0);
        assert!(result.chunks.is_empty());
        assert_eq!(result.original_size, 0);
        assert_eq!(result.chunker_used, sample.chunker);
    }
}

#[test]
fn test_size_bound_holds_except_for_flagged_atoms() {
    let registry = ChunkerRegistry::with_defaults();
    for max in [40, 64, 150] {
        for sample in SAMPLES {
            let result = run(&registry, sample, max);
            for c in &result.chunks {
                if c.len() <= max {
                    continue;
                }
                assert!(
                    result.warnings.iter().any(|w| {
                        w.code == WarningCode::OversizedAtomicComponent
                            && w.offset == c.start_offset
                    }),
                    "{} emitted {} bytes over cap {} without a warning",
                    sample.chunker,
                    c.len(),
                    max
                );
            }
        }
    }
}

#[test]
fn test_zero_cap_uses_default() {
    let registry = ChunkerRegistry::with_defaults();
    for sample in SAMPLES {
        let defaulted = run(&registry, sample, 0);
        let explicit = registry
            .chunk(
                &CancellationToken::new(),
                sample.text,
                &ChunkOptions {
                    max_chunk_size: schnitt_core::DEFAULT_MAX_CHUNK_SIZE,
                    ..sample.options(0)
                },
            )
            .unwrap();
        assert_eq!(defaulted, explicit, "{}", sample.chunker);
    }
}
