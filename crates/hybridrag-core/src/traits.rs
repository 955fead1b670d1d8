use async_trait::async_trait;

use crate::error::Result;
use crate::types::{RowHit, SearchHit};

/// Turns texts into fixed-dimension vectors, one per input, in input order.
#[async_trait]
pub trait Embedder: Send + Sync {
    fn model_id(&self) -> &str;
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Nearest-neighbour search over a read-only vector snapshot.
#[async_trait]
pub trait DenseRetriever: Send + Sync {
    /// Returns at most `top_m` rows, best first.
    async fn search(&self, query_vec: &[f32], top_m: usize) -> Result<Vec<RowHit>>;
}

/// Term-matching search over a read-only lexical snapshot.
pub trait LexicalRetriever: Send + Sync {
    /// Returns at most `top_k` hits with strictly positive scores, best first.
    fn search(&self, query: &str, top_k: usize) -> Result<Vec<SearchHit>>;
}

/// Second-stage relevance model.
pub trait Reranker: Send + Sync {
    fn name(&self) -> &str;
    /// One score per passage, same order, higher is more relevant.
    fn score(&self, query: &str, passages: &[String]) -> Result<Vec<f32>>;
}
