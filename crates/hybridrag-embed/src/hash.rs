use async_trait::async_trait;
use std::hash::{Hash, Hasher};
use twox_hash::XxHash64;

use hybridrag_core::vector_math::l2_normalize;
use hybridrag_core::{Embedder, Result};

/// Deterministic offline embedder: each whitespace token is hashed into one
/// bucket of a `dim`-wide vector, which is then L2-normalized.
pub struct HashEmbedder { dim: usize, model_id: String }

impl HashEmbedder {
    pub fn new(dim: usize) -> Self { Self { dim: dim.max(1), model_id: format!("hash-{}", dim.max(1)) } }

    pub fn dim(&self) -> usize { self.dim }

    pub fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dim];
        for (i, token) in text.split_whitespace().enumerate() {
            let mut hasher = XxHash64::with_seed(0);
            token.hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h as usize) % self.dim;
            let val = (((h >> 32) as u32) as f32) / (u32::MAX as f32);
            v[idx] += val + (i as f32 % 3.0) * 0.01;
        }
        l2_normalize(&mut v);
        v
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    fn model_id(&self) -> &str { &self.model_id }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}
