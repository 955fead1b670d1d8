//! Configuration loader, typed settings and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env vars
//! (`__` separates nesting levels, e.g. `APP_RETRIEVAL__TOP_K=5`). Missing keys
//! take the defaults of [`Settings`]. Paths support `~` and `${VAR}`.

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{Error, Result};

pub struct Config {
    figment: Figment,
    base_dir: PathBuf,
}

impl Config {
    /// Loads configuration files from the current directory.
    pub fn load() -> Result<Self> {
        let cwd = env::current_dir().map_err(|e| Error::Configuration(format!("cannot read current dir: {e}")))?;
        Self::load_from(&cwd)
    }

    pub fn load_from(dir: &Path) -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::new().merge(Toml::file(dir.join("config.toml")));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file(dir.join("config.dev.toml"))),
            "prod" | "production" => figment = figment.merge(Toml::file(dir.join("config.prod.toml"))),
            "test" | "testing" => figment = figment.merge(Toml::file(dir.join("config.test.toml"))),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        Ok(Self { figment, base_dir: dir.to_path_buf() })
    }

    pub fn from_figment(figment: Figment, base_dir: impl Into<PathBuf>) -> Self {
        Self { figment, base_dir: base_dir.into() }
    }

    pub fn get<T>(&self, key: &str) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| Error::Configuration(format!("Failed to get '{key}': {e}")))
    }

    /// Extracts and validates the full settings tree.
    pub fn settings(&self) -> Result<Settings> {
        let settings: Settings = self
            .figment
            .extract()
            .map_err(|e| Error::Configuration(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn base_dir(&self) -> &Path { &self.base_dir }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub index_dir: String,
    pub bm25_index_path: String,
    pub embedding: EmbeddingSettings,
    pub retrieval: RetrievalSettings,
    pub fusion: FusionSettings,
    #[serde(alias = "faiss")]
    pub vector_index: VectorIndexSettings,
    pub reranker: RerankerSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            index_dir: "index".to_string(),
            bm25_index_path: "index_bm25".to_string(),
            embedding: EmbeddingSettings::default(),
            retrieval: RetrievalSettings::default(),
            fusion: FusionSettings::default(),
            vector_index: VectorIndexSettings::default(),
            reranker: RerankerSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingProviderKind {
    #[default]
    Voyage,
    Hash,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub provider: EmbeddingProviderKind,
    pub model: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    pub batch_size: usize,
    pub base_url: String,
    pub timeout_secs: u64,
    /// Output dimension of the offline hash provider.
    pub dim: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: EmbeddingProviderKind::Voyage,
            model: "voyage-context-3".to_string(),
            api_key_env: "VOYAGE_API_KEY".to_string(),
            batch_size: 16,
            base_url: "https://api.voyageai.com/v1/embeddings".to_string(),
            timeout_secs: 30,
            dim: 1024,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub top_m: usize,
    pub top_k: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self { Self { top_m: 50, top_k: 20 } }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionSettings {
    pub k: u32,
}

impl Default for FusionSettings {
    fn default() -> Self { Self { k: 60 } }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VectorIndexKind {
    Flat,
    Hnsw,
    #[default]
    IvfPq,
}

impl std::fmt::Display for VectorIndexKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self { Self::Flat => "flat", Self::Hnsw => "hnsw", Self::IvfPq => "ivf_pq" };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorIndexSettings {
    #[serde(rename = "type")]
    pub kind: VectorIndexKind,
    pub nlist: usize,
    pub m: usize,
    pub nbits: usize,
    pub nprobe: usize,
    pub hnsw_m: usize,
    pub ef_construction: usize,
    pub ef_search: usize,
}

impl Default for VectorIndexSettings {
    fn default() -> Self {
        Self { kind: VectorIndexKind::IvfPq, nlist: 4096, m: 32, nbits: 8, nprobe: 16, hnsw_m: 32, ef_construction: 200, ef_search: 128 }
    }
}

impl VectorIndexSettings {
    /// Minimum vector count for stable IVF-PQ training: `max(4 * nlist, 2^nbits)`.
    pub fn min_training_vectors(&self) -> usize {
        std::cmp::max(self.nlist.saturating_mul(4), 1usize << self.nbits.min(31))
    }
}

/// Which second-stage model reorders the fused candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RerankerKind {
    #[serde(rename = "colbert", alias = "late_interaction")]
    LateInteraction,
    #[serde(rename = "crossencoder", alias = "cross_encoder", alias = "cross_attention")]
    CrossAttention,
    #[serde(rename = "none")]
    None,
}

impl FromStr for RerankerKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "colbert" | "late_interaction" | "late-interaction" => Ok(Self::LateInteraction),
            "crossencoder" | "cross_encoder" | "cross-encoder" | "cross_attention" => Ok(Self::CrossAttention),
            "none" | "off" | "" => Ok(Self::None),
            other => Err(Error::Configuration(format!("unknown reranker type '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RerankerSettings {
    pub enabled: bool,
    #[serde(rename = "type")]
    pub kind: Option<RerankerKind>,
    pub colbert_model: String,
    pub cross_encoder_model: String,
    pub reranker_k: usize,
    pub device: Option<String>,
    pub max_query_len: usize,
    pub max_doc_len: usize,
}

impl Default for RerankerSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            kind: None,
            colbert_model: "colbert-ir/colbertv2.0".to_string(),
            cross_encoder_model: "cross-encoder/ms-marco-MiniLM-L-6-v2".to_string(),
            reranker_k: 10,
            device: None,
            max_query_len: 64,
            max_doc_len: 180,
        }
    }
}

/// `[CLS]`, the query/passage marker and `[SEP]` frame every reranker input.
pub const RERANK_FRAMING_TOKENS: usize = 3;

impl Settings {
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("retrieval.top_m", self.retrieval.top_m),
            ("retrieval.top_k", self.retrieval.top_k),
            ("embedding.batch_size", self.embedding.batch_size),
            ("embedding.dim", self.embedding.dim),
            ("vector_index.nlist", self.vector_index.nlist),
            ("vector_index.m", self.vector_index.m),
            ("vector_index.nprobe", self.vector_index.nprobe),
            ("vector_index.hnsw_m", self.vector_index.hnsw_m),
            ("vector_index.ef_construction", self.vector_index.ef_construction),
            ("vector_index.ef_search", self.vector_index.ef_search),
            ("reranker.reranker_k", self.reranker.reranker_k),
        ];
        if let Some((key, _)) = positive.iter().find(|(_, v)| *v == 0) {
            return Err(Error::Configuration(format!("{key} must be greater than zero")));
        }
        for (key, len) in [("reranker.max_query_len", self.reranker.max_query_len), ("reranker.max_doc_len", self.reranker.max_doc_len)] {
            if len < RERANK_FRAMING_TOKENS {
                return Err(Error::Configuration(format!("{key} must be at least {RERANK_FRAMING_TOKENS}, got {len}")));
            }
        }
        if !(1..=16).contains(&self.vector_index.nbits) {
            return Err(Error::Configuration(format!("vector_index.nbits must be in 1..=16, got {}", self.vector_index.nbits)));
        }
        if self.embedding.model.trim().is_empty() {
            return Err(Error::Configuration("embedding.model must not be empty".to_string()));
        }
        if self.embedding.provider == EmbeddingProviderKind::Voyage && self.embedding.api_key_env.trim().is_empty() {
            return Err(Error::Configuration("embedding.api_key_env must name an environment variable".to_string()));
        }
        Ok(())
    }

    /// Resolves the active reranker: disabled → none; otherwise runtime
    /// override, then configured type, then the pairwise model.
    pub fn resolve_reranker(&self, runtime_override: Option<RerankerKind>) -> RerankerKind {
        if !self.reranker.enabled {
            return RerankerKind::None;
        }
        runtime_override.or(self.reranker.kind).unwrap_or(RerankerKind::CrossAttention)
    }

    pub fn index_dir_path(&self, base: &Path) -> PathBuf { resolve_with_base(base, &self.index_dir) }

    pub fn bm25_index_path(&self, base: &Path) -> PathBuf { resolve_with_base(base, &self.bm25_index_path) }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::providers::Serialized;

    #[test]
    fn defaults_are_valid() {
        let s = Settings::default();
        s.validate().expect("defaults validate");
        assert_eq!(s.retrieval.top_m, 50);
        assert_eq!(s.retrieval.top_k, 20);
        assert_eq!(s.fusion.k, 60);
        assert_eq!(s.reranker.reranker_k, 10);
    }

    #[test]
    fn zero_top_k_is_rejected() {
        let mut s = Settings::default();
        s.retrieval.top_k = 0;
        let err = s.validate().expect_err("zero top_k");
        assert!(matches!(err, Error::Configuration(msg) if msg.contains("retrieval.top_k")));
    }

    #[test]
    fn max_len_below_framing_tokens_is_rejected() {
        let mut s = Settings::default();
        s.reranker.max_query_len = 2;
        let err = s.validate().expect_err("max_query_len 2");
        assert!(matches!(err, Error::Configuration(msg) if msg.contains("reranker.max_query_len")));

        let mut s = Settings::default();
        s.reranker.max_doc_len = 0;
        let err = s.validate().expect_err("max_doc_len 0");
        assert!(matches!(err, Error::Configuration(msg) if msg.contains("reranker.max_doc_len")));

        s.reranker.max_doc_len = 3;
        assert!(s.validate().is_ok());
    }

    #[test]
    fn nbits_out_of_range_is_rejected() {
        let mut s = Settings::default();
        s.vector_index.nbits = 17;
        assert!(s.validate().is_err());
    }

    #[test]
    fn min_training_vectors_uses_larger_bound() {
        let mut v = VectorIndexSettings { nlist: 100, nbits: 8, ..VectorIndexSettings::default() };
        assert_eq!(v.min_training_vectors(), 400);
        v.nlist = 10;
        assert_eq!(v.min_training_vectors(), 256);
    }

    #[test]
    fn reranker_resolution_priority() {
        let mut s = Settings::default();
        assert_eq!(s.resolve_reranker(Some(RerankerKind::LateInteraction)), RerankerKind::None);

        s.reranker.enabled = true;
        assert_eq!(s.resolve_reranker(None), RerankerKind::CrossAttention);

        s.reranker.kind = Some(RerankerKind::LateInteraction);
        assert_eq!(s.resolve_reranker(None), RerankerKind::LateInteraction);
        assert_eq!(s.resolve_reranker(Some(RerankerKind::CrossAttention)), RerankerKind::CrossAttention);
        assert_eq!(s.resolve_reranker(Some(RerankerKind::None)), RerankerKind::None);
    }

    #[test]
    fn reranker_kind_parses_aliases() {
        assert_eq!("ColBERT".parse::<RerankerKind>().expect("colbert"), RerankerKind::LateInteraction);
        assert_eq!("crossencoder".parse::<RerankerKind>().expect("ce"), RerankerKind::CrossAttention);
        assert_eq!("none".parse::<RerankerKind>().expect("none"), RerankerKind::None);
        assert!("bm25".parse::<RerankerKind>().is_err());
    }

    #[test]
    fn figment_overrides_merge_into_defaults() {
        let figment = Figment::new().merge(Serialized::default("retrieval.top_k", 5)).merge(Serialized::default("reranker.type", "colbert"));
        let settings = Config::from_figment(figment, ".").settings().expect("settings");
        assert_eq!(settings.retrieval.top_k, 5);
        assert_eq!(settings.retrieval.top_m, 50);
        assert_eq!(settings.reranker.kind, Some(RerankerKind::LateInteraction));
    }

    #[test]
    fn resolve_with_base_keeps_absolute_paths() {
        let base = Path::new("/srv/app");
        assert_eq!(resolve_with_base(base, "index"), PathBuf::from("/srv/app/index"));
        assert_eq!(resolve_with_base(base, "/data/index"), PathBuf::from("/data/index"));
    }
}
