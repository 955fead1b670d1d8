//! Builds real snapshots from the sample corpus with the hash embedder and
//! checks the full query path against the individual stages.

use std::path::{Path, PathBuf};
use tempfile::TempDir;

use hybridrag_core::config::{EmbeddingProviderKind, Settings, VectorIndexKind};
use hybridrag_core::vector_math::{dot, normalized};
use hybridrag_core::{DenseRetriever, Embedder, LexicalRetriever, MetadataTable, Reranker, Result};
use hybridrag_embed::HashEmbedder;
use hybridrag_pipeline::{build_indexes, rrf_fuse, QueryPipeline, RetrievalContext, PLACEHOLDER_SCORE};
use hybridrag_text::Bm25Retriever;
use hybridrag_vector::VectorIndexReader;

fn fixture() -> PathBuf { PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/sample_docs.jsonl") }

fn settings(dim: usize) -> Settings {
    let mut s = Settings::default();
    s.embedding.provider = EmbeddingProviderKind::Hash;
    s.embedding.dim = dim;
    s.embedding.batch_size = 4;
    // 6 vectors is far below the IVF-PQ training threshold.
    s.vector_index.kind = VectorIndexKind::IvfPq;
    s.vector_index.m = 8;
    s
}

async fn build(base: &Path, s: &Settings) -> MetadataTable {
    let table = MetadataTable::load_jsonl(&fixture()).expect("fixture");
    let embedder = HashEmbedder::new(s.embedding.dim);
    let mut progress = Vec::new();
    let report = build_indexes(table.records(), &embedder, s, base, |done| progress.push(done)).await.expect("build");
    assert_eq!(progress, vec![4, 6], "two embedding batches");
    assert_eq!(report.manifest.strategy, VectorIndexKind::Flat);
    assert_eq!(report.manifest.count, 6);
    assert_eq!(report.bm25_docs, 6);
    table
}

#[tokio::test]
async fn snapshot_round_trip_and_fused_results_match_stages() {
    let tmp = TempDir::new().unwrap();
    let s = settings(256);
    let table = build(tmp.path(), &s).await;

    let ctx = RetrievalContext::load(&s, tmp.path()).await.expect("context");
    assert_eq!(ctx.metadata.len(), 6);
    let pipeline = QueryPipeline::new(ctx, None, &s);

    let query = "Hybrid search fuses dense and sparse BM25 results";
    let results = pipeline.query(query).await.expect("query");

    // Recompute every stage independently.
    let embedder = HashEmbedder::new(256);
    let qv = embedder.embed(&[query.to_string()]).await.unwrap().remove(0);
    let reader = VectorIndexReader::open(&s.index_dir_path(tmp.path())).await.unwrap();
    let rows = reader.search(&qv, s.retrieval.top_m).await.unwrap();
    let dense: Vec<String> = rows.iter().map(|h| table.doc_id(h.row).unwrap().to_string()).collect();

    let mut brute: Vec<(usize, f32)> = table
        .records()
        .iter()
        .enumerate()
        .map(|(i, r)| (i, dot(&normalized(&embedder.embed_one(&r.text)), &normalized(&qv))))
        .collect();
    brute.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap());
    assert_eq!(rows[0].row, brute[0].0, "index top hit equals exhaustive scan");
    assert!((rows[0].score - brute[0].1).abs() < 1e-4);

    let bm25 = Bm25Retriever::open(&s.bm25_index_path(tmp.path())).unwrap();
    let sparse: Vec<String> = bm25.search(query, s.retrieval.top_m).unwrap().into_iter().map(|h| h.doc_id).collect();
    assert_eq!(sparse.first().map(String::as_str), Some("doc_000006"));

    let expected: Vec<String> = rrf_fuse(&[dense, sparse], s.fusion.k).doc_ids().take(s.retrieval.top_k).map(str::to_string).collect();
    let got: Vec<String> = results.iter().map(|r| r.document.doc_id.clone()).collect();
    assert_eq!(got, expected);
    assert_eq!(results[0].document.doc_id, "doc_000006");
    assert_eq!(results[0].document.title, "Hybrid Search");
    assert!(results.iter().all(|r| r.score == PLACEHOLDER_SCORE));
}

#[tokio::test]
async fn punctuated_query_without_lexical_hits_follows_dense_order() {
    let tmp = TempDir::new().unwrap();
    let s = settings(256);
    let table = build(tmp.path(), &s).await;

    let query = "What is ColBERT?";
    let bm25 = Bm25Retriever::open(&s.bm25_index_path(tmp.path())).unwrap();
    let sparse: Vec<String> = bm25.search(query, s.retrieval.top_m).unwrap().into_iter().map(|h| h.doc_id).collect();
    assert!(sparse.is_empty(), "whitespace tokens keep the '?' so nothing matches: {sparse:?}");

    let embedder = HashEmbedder::new(256);
    let qv = embedder.embed(&[query.to_string()]).await.unwrap().remove(0);
    let reader = VectorIndexReader::open(&s.index_dir_path(tmp.path())).await.unwrap();
    let dense: Vec<String> = reader.search(&qv, s.retrieval.top_m).await.unwrap().iter().map(|h| table.doc_id(h.row).unwrap().to_string()).collect();

    let ctx = RetrievalContext::load(&s, tmp.path()).await.expect("context");
    let results = QueryPipeline::new(ctx, None, &s).query(query).await.expect("query");
    let got: Vec<String> = results.iter().map(|r| r.document.doc_id.clone()).collect();
    assert_eq!(got, dense);
}

/// Prefers passages mentioning "RAG".
struct KeywordReranker;

impl Reranker for KeywordReranker {
    fn name(&self) -> &str { "keyword" }
    fn score(&self, _q: &str, passages: &[String]) -> Result<Vec<f32>> {
        Ok(passages.iter().map(|p| p.split_whitespace().filter(|t| *t == "RAG").count() as f32).collect())
    }
}

#[tokio::test]
async fn reranker_output_replaces_fusion_order() {
    let tmp = TempDir::new().unwrap();
    let mut s = settings(128);
    s.reranker.reranker_k = 2;
    build(tmp.path(), &s).await;

    let ctx = RetrievalContext::load(&s, tmp.path()).await.expect("context");
    let pipeline = QueryPipeline::new(ctx, Some(Box::new(KeywordReranker)), &s);
    let results = pipeline.query("Dense retrieval with embeddings").await.expect("query");

    assert_eq!(results.len(), 2);
    let mut top: Vec<&str> = results.iter().map(|r| r.document.doc_id.as_str()).collect();
    top.sort();
    assert_eq!(top, vec!["doc_000003", "doc_000005"]);
    assert!(results.iter().all(|r| r.score == 1.0));
}

#[tokio::test]
async fn query_against_missing_snapshot_fails_at_load() {
    let tmp = TempDir::new().unwrap();
    let s = settings(64);
    let err = RetrievalContext::load(&s, tmp.path()).await.err().expect("must fail");
    assert!(matches!(err, hybridrag_core::Error::IndexLoad(_)), "got {err:?}");
}
