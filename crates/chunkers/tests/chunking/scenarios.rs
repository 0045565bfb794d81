use schnitt_chunkers::{ChunkerRegistry, DockerfileChunker, LatexChunker, SqlChunker};
use schnitt_chunkers::Chunker;
use schnitt_core::{ChunkOptions, WarningCode};
use tokio_util::sync::CancellationToken;

#[test]
fn test_sql_table_group_and_standalone_function() {
    let sql = "CREATE TABLE t (id INT); INSERT INTO t VALUES (1); \
               CREATE FUNCTION f() RETURNS INT AS $$ BEGIN RETURN 1; END; $$;";
    let result = SqlChunker::new()
        .chunk(&CancellationToken::new(), sql, &ChunkOptions::for_language("sql"))
        .unwrap();

    assert_eq!(result.total_chunks, 2);
    let table = result.chunks[0].metadata.sql().unwrap();
    assert_eq!(table.object_type, "TABLE");
    assert_eq!(table.table_name, "t");
    assert!(result.chunks[0].content.contains("INSERT INTO t VALUES (1);"));

    let func = result.chunks[1].metadata.sql().unwrap();
    assert_eq!(func.object_type, "FUNCTION");
    assert_eq!(func.procedure_name, "f");
    assert!(result.chunks[1].content.contains("RETURN 1; END; $$;"));
}

#[test]
fn test_two_build_stages_second_gets_ordinal_name() {
    let dockerfile = "FROM node:20 AS deps\nRUN npm ci\n\nFROM nginx:alpine\nCOPY --from=deps /app /usr/share/nginx/html\n";
    let result = DockerfileChunker::new()
        .chunk(&CancellationToken::new(), dockerfile, &ChunkOptions::for_language("Dockerfile"))
        .unwrap();

    assert_eq!(result.total_chunks, 2);
    assert_eq!(result.chunks[0].metadata.build().unwrap().stage_name, "deps");
    let second = result.chunks[1].metadata.build().unwrap();
    assert_eq!(second.stage_name, "stage2");
    assert_eq!(second.base_image, "nginx:alpine");
}

#[test]
fn test_nested_headings_build_section_path_and_reset() {
    let tex = "\\section{A}\na\n\\subsection{B}\nb\n\\subsubsection{C}\nc\n\\section{D}\nd\n";
    let result = LatexChunker::new()
        .chunk(&CancellationToken::new(), tex, &ChunkOptions::for_language("doc.tex"))
        .unwrap();

    let paths: Vec<String> = result
        .chunks
        .iter()
        .map(|c| c.metadata.document().unwrap().section_path.clone())
        .collect();
    assert_eq!(paths, vec!["A", "A > B", "A > B > C", "D"]);
}

#[test]
fn test_unbalanced_braces_degrade_with_warnings() {
    let registry = ChunkerRegistry::with_defaults();
    let cases = [
        ("main.tf", "resource \"a\" \"b\" {\n  x = 1\n", WarningCode::HclParseError),
        ("api.proto", "message M {\n  string id = 1;\n", WarningCode::ProtobufParseError),
        ("schema.graphql", "type Q {\n  id: ID\n", WarningCode::GraphqlUnbalancedBraces),
    ];
    for (hint, text, code) in cases {
        let result = registry
            .chunk(&CancellationToken::new(), text, &ChunkOptions::for_language(hint))
            .unwrap();
        assert!(result.total_chunks >= 1, "{hint}");
        assert!(!result.warnings.is_empty(), "{hint}");
        assert!(result.has_warning(code), "{hint}");
    }
}

#[test]
fn test_oversized_unit_without_boundaries_stays_whole() {
    let registry = ChunkerRegistry::with_defaults();
    let text = format!("locals {{ blob = \"{}\" }}", "x".repeat(300));
    let opts = ChunkOptions::for_language("main.tf").with_max_chunk_size(100);
    let result = registry
        .chunk(&CancellationToken::new(), &text, &opts)
        .unwrap();

    assert_eq!(result.total_chunks, 1);
    assert_eq!(result.chunks[0].content, text);
    assert!(result.chunks[0].len() > 100);
    assert!(result.has_warning(WarningCode::OversizedAtomicComponent));
}
