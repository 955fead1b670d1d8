//! Query orchestration: embed → dense + sparse → RRF → materialize →
//! rerank (or fallback truncation).

use std::cmp::Ordering;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use hybridrag_core::config::{RerankerKind, Settings};
use hybridrag_core::{Document, Error, MetadataTable, Reranker, Result, RowHit, ScoredDocument};

use crate::context::RetrievalContext;
use crate::fusion::{rrf_fuse, FusedRanking};
use crate::select::{init_reranker, reranker_override_from_env};

/// Score given to every result when no reranker ran.
pub const PLACEHOLDER_SCORE: f32 = 1.0;

pub struct QueryPipeline {
    context: RetrievalContext,
    reranker: Option<Arc<dyn Reranker>>,
    top_m: usize,
    top_k: usize,
    fusion_k: u32,
    reranker_k: usize,
}

impl QueryPipeline {
    pub fn new(context: RetrievalContext, reranker: Option<Box<dyn Reranker>>, settings: &Settings) -> Self {
        Self {
            context,
            reranker: reranker.map(Arc::from),
            top_m: settings.retrieval.top_m,
            top_k: settings.retrieval.top_k,
            fusion_k: settings.fusion.k,
            reranker_k: settings.reranker.reranker_k,
        }
    }

    /// Loads the context and resolves the reranker once for the pipeline's lifetime.
    pub async fn from_settings(settings: &Settings, base_dir: &Path, runtime_override: Option<RerankerKind>) -> Result<Self> {
        settings.validate()?;
        let context = RetrievalContext::load(settings, base_dir).await?;
        let reranker = init_reranker(settings, runtime_override);
        Ok(Self::new(context, reranker, settings))
    }

    pub fn reranker_name(&self) -> Option<&str> { self.reranker.as_deref().map(|r| r.name()) }

    /// Runs one query. Reranker inference runs on the blocking thread pool so
    /// concurrent queries keep the async workers.
    pub async fn query(&self, query: &str) -> Result<Vec<ScoredDocument>> {
        let started = Instant::now();

        let t = Instant::now();
        let query_vec = self
            .context
            .embedder
            .embed(&[query.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::provider(self.context.embedder.model_id(), None, "empty embedding response"))?;
        debug!(elapsed_ms = t.elapsed().as_millis() as u64, "embed");

        let t = Instant::now();
        let rows = self.context.dense.search(&query_vec, self.top_m).await?;
        let dense_ids = dense_doc_ids(&rows, &self.context.metadata);
        debug!(elapsed_ms = t.elapsed().as_millis() as u64, hits = dense_ids.len(), "dense search");

        let t = Instant::now();
        let sparse_ids: Vec<String> = self.context.lexical.search(query, self.top_m)?.into_iter().map(|h| h.doc_id).collect();
        debug!(elapsed_ms = t.elapsed().as_millis() as u64, hits = sparse_ids.len(), "sparse search");

        let fused = rrf_fuse(&[dense_ids, sparse_ids], self.fusion_k);
        let docs = materialize(&fused, &self.context.metadata);
        debug!(fused = fused.len(), materialized = docs.len(), "fusion");

        let results = match &self.reranker {
            Some(reranker) => {
                let t = Instant::now();
                let (reranker, query, k) = (Arc::clone(reranker), query.to_string(), self.reranker_k);
                let out = tokio::task::spawn_blocking(move || rerank_documents(reranker.as_ref(), &query, docs, k))
                    .await
                    .map_err(|e| Error::Operation(format!("rerank task failed: {e}")))??;
                debug!(elapsed_ms = t.elapsed().as_millis() as u64, reranker = self.reranker_name(), "rerank");
                out
            }
            None => fallback_order(docs, self.top_k),
        };

        info!(results = results.len(), elapsed_ms = started.elapsed().as_millis() as u64, "query done");
        Ok(results)
    }
}

/// Maps vector rows to document ids in rank order. Chunks of one document
/// stay at their own ranks; dedup happens at materialization. Rows outside
/// the metadata table are dropped.
pub fn dense_doc_ids(rows: &[RowHit], metadata: &MetadataTable) -> Vec<String> {
    rows.iter().filter_map(|h| metadata.doc_id(h.row)).map(str::to_string).collect()
}

/// Resolves fused ids to documents in fused order. Ids unknown to the
/// metadata table are skipped.
pub fn materialize(fused: &FusedRanking, metadata: &MetadataTable) -> Vec<Document> {
    fused
        .doc_ids()
        .filter_map(|id| {
            let doc = metadata.document(id);
            if doc.is_none() { debug!(doc_id = id, "fused id missing from metadata"); }
            doc
        })
        .collect()
}

/// Scores `docs` against `query`, sorts descending (ties keep input order)
/// and keeps `k`. An empty candidate list never reaches the reranker.
pub fn rerank_documents(reranker: &dyn Reranker, query: &str, docs: Vec<Document>, k: usize) -> Result<Vec<ScoredDocument>> {
    if docs.is_empty() { return Ok(Vec::new()); }
    let passages: Vec<String> = docs.iter().map(|d| d.text.clone()).collect();
    let scores = reranker.score(query, &passages)?;
    if scores.len() != docs.len() {
        return Err(Error::provider(reranker.name(), None, format!("expected {} scores, got {}", docs.len(), scores.len())));
    }
    let mut scored: Vec<ScoredDocument> = scores.into_iter().zip(docs).map(|(score, document)| ScoredDocument { score, document }).collect();
    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    scored.truncate(k);
    Ok(scored)
}

/// Fusion order truncated to `top_k`, every score set to [`PLACEHOLDER_SCORE`].
pub fn fallback_order(docs: Vec<Document>, top_k: usize) -> Vec<ScoredDocument> {
    docs.into_iter().take(top_k).map(|document| ScoredDocument { score: PLACEHOLDER_SCORE, document }).collect()
}

/// One-shot entry point: loads everything from `settings` (paths relative to
/// the working directory), honours the `RERANKER` override and runs `query`.
pub async fn query_system(query: &str, settings: &Settings) -> Result<Vec<ScoredDocument>> {
    let base_dir = std::env::current_dir().map_err(|e| Error::Configuration(format!("cannot read current dir: {e}")))?;
    let runtime_override = reranker_override_from_env()?;
    let pipeline = QueryPipeline::from_settings(settings, &base_dir, runtime_override).await?;
    pipeline.query(query).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use hybridrag_core::MetadataRecord;

    fn table() -> MetadataTable {
        MetadataTable::from_records(vec![
            MetadataRecord::new("a", "A", "alpha chunk 0"),
            MetadataRecord::new("b", "B", "beta"),
            MetadataRecord::new("a", "A", "alpha chunk 1"),
        ])
    }

    #[test]
    fn dense_rows_keep_every_chunk_in_rank_order() {
        let rows = vec![RowHit { row: 2, score: 0.9 }, RowHit { row: 1, score: 0.8 }, RowHit { row: 0, score: 0.7 }, RowHit { row: 9, score: 0.1 }];
        assert_eq!(dense_doc_ids(&rows, &table()), vec!["a".to_string(), "b".to_string(), "a".to_string()]);
    }

    #[test]
    fn materialize_skips_unknown_ids_and_uses_first_record() {
        let fused = rrf_fuse(&[vec!["ghost", "a", "b"]], 60);
        let docs = materialize(&fused, &table());
        let ids: Vec<&str> = docs.iter().map(|d| d.doc_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(docs[0].text, "alpha chunk 0");
    }

    #[test]
    fn fallback_uses_placeholder_scores() {
        let docs: Vec<Document> = (0..5).map(|i| Document { doc_id: format!("d{i}"), title: String::new(), text: String::new() }).collect();
        let out = fallback_order(docs, 3);
        assert_eq!(out.len(), 3);
        assert!(out.iter().all(|s| s.score == PLACEHOLDER_SCORE));
        assert_eq!(out[2].document.doc_id, "d2");
    }
}
