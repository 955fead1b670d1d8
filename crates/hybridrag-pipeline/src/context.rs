use std::path::Path;
use std::sync::Arc;
use tracing::info;

use hybridrag_core::config::Settings;
use hybridrag_core::{DenseRetriever, Embedder, LexicalRetriever, MetadataTable, Result};
use hybridrag_embed::build_embedder;
use hybridrag_text::Bm25Retriever;
use hybridrag_vector::VectorIndexReader;

/// Everything a query reads. Loaded once and shared read-only.
#[derive(Clone)]
pub struct RetrievalContext {
    pub embedder: Arc<dyn Embedder>,
    pub dense: Arc<dyn DenseRetriever>,
    pub lexical: Arc<dyn LexicalRetriever>,
    pub metadata: Arc<MetadataTable>,
}

impl RetrievalContext {
    pub fn new(embedder: Arc<dyn Embedder>, dense: Arc<dyn DenseRetriever>, lexical: Arc<dyn LexicalRetriever>, metadata: Arc<MetadataTable>) -> Self {
        Self { embedder, dense, lexical, metadata }
    }

    /// Opens both snapshots; relative paths resolve against `base_dir`.
    pub async fn load(settings: &Settings, base_dir: &Path) -> Result<Self> {
        let embedder = build_embedder(&settings.embedding)?;
        let reader = VectorIndexReader::open(&settings.index_dir_path(base_dir)).await?;
        let metadata = reader.metadata();
        let lexical = Bm25Retriever::open(&settings.bm25_index_path(base_dir))?;
        info!(rows = metadata.len(), docs = metadata.distinct_documents(), model = embedder.model_id(), "retrieval context ready");
        Ok(Self::new(embedder, Arc::new(reader), Arc::new(lexical), metadata))
    }
}
