//! Offline snapshot build: embed every record, then write the vector and
//! BM25 indexes from the same record order.

use std::path::Path;
use tracing::info;

use hybridrag_core::config::Settings;
use hybridrag_core::{Embedder, Error, MetadataRecord, Result};
use hybridrag_embed::MAX_BATCH;
use hybridrag_text::build_bm25_index;
use hybridrag_vector::{build_vector_index, IndexManifest};

#[derive(Debug, Clone)]
pub struct BuildReport {
    pub manifest: IndexManifest,
    pub bm25_docs: usize,
}

/// Embeds `texts` in chunks of `batch_size`; `on_batch` receives the number
/// of texts finished so far.
pub async fn embed_in_batches(embedder: &dyn Embedder, texts: &[String], batch_size: usize, mut on_batch: impl FnMut(usize)) -> Result<Vec<Vec<f32>>> {
    let batch_size = batch_size.clamp(1, MAX_BATCH);
    let mut out = Vec::with_capacity(texts.len());
    for chunk in texts.chunks(batch_size) {
        let vectors = embedder.embed(chunk).await?;
        if vectors.len() != chunk.len() {
            return Err(Error::provider(embedder.model_id(), None, format!("expected {} embeddings, got {}", chunk.len(), vectors.len())));
        }
        out.extend(vectors);
        on_batch(out.len());
    }
    Ok(out)
}

pub async fn build_indexes(records: &[MetadataRecord], embedder: &dyn Embedder, settings: &Settings, base_dir: &Path, on_batch: impl FnMut(usize)) -> Result<BuildReport> {
    settings.validate()?;
    let texts: Vec<String> = records.iter().map(|r| r.text.clone()).collect();
    let vectors = embed_in_batches(embedder, &texts, settings.embedding.batch_size, on_batch).await?;

    let manifest = build_vector_index(&settings.index_dir_path(base_dir), records, &vectors, &settings.vector_index).await?;
    let bm25_docs = build_bm25_index(&settings.bm25_index_path(base_dir), records)?;
    info!(records = records.len(), strategy = %manifest.strategy, "indexes built");
    Ok(BuildReport { manifest, bm25_docs })
}
