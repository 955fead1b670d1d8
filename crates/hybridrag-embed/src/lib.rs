//! hybridrag-embed
//!
//! Embedding providers: the remote Voyage-compatible client used in
//! production and a deterministic hash embedder for offline runs and tests.

pub mod hash;
pub mod remote;

use std::sync::Arc;
use tracing::info;

use hybridrag_core::config::{EmbeddingProviderKind, EmbeddingSettings};
use hybridrag_core::{Embedder, Result};

pub use hash::HashEmbedder;
pub use remote::{RemoteEmbedder, MAX_BATCH};

/// True when `APP_USE_FAKE_EMBEDDINGS` is `1` or `true`.
pub fn fake_embeddings_requested() -> bool {
    std::env::var("APP_USE_FAKE_EMBEDDINGS").ok().map(|v| v == "1" || v.eq_ignore_ascii_case("true")).unwrap_or(false)
}

pub fn build_embedder(settings: &EmbeddingSettings) -> Result<Arc<dyn Embedder>> {
    if fake_embeddings_requested() || settings.provider == EmbeddingProviderKind::Hash {
        info!(dim = settings.dim, "using hash embedder");
        return Ok(Arc::new(HashEmbedder::new(settings.dim)));
    }
    info!(model = %settings.model, endpoint = %settings.base_url, "using remote embedder");
    Ok(Arc::new(RemoteEmbedder::from_settings(settings)?))
}
