use thiserror::Error;

/// Failure taxonomy shared by every stage of the retrieval pipeline.
///
/// `RerankerInit` is the only recoverable kind: the pipeline falls back to
/// another reranker (or to fusion order) instead of failing the query.
#[derive(Debug, Error)]
pub enum Error {
    /// Missing credential, missing or invalid configuration value.
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// An embedding or reranker backend answered with an error.
    #[error(
        "{provider} returned an error (status {}): {body}",
        .status.map_or_else(|| "n/a".to_string(), |s| s.to_string())
    )]
    Provider {
        provider: String,
        status: Option<u16>,
        body: String,
    },

    /// The request never produced a usable response (connect, timeout, decode).
    #[error("Transport failure: {0}")]
    Transport(String),

    /// Missing, corrupt or mismatched index/metadata snapshot.
    #[error("Index load failed: {0}")]
    IndexLoad(String),

    #[error("Reranker init failed: {0}")]
    RerankerInit(String),

    #[error("Operation failed: {0}")]
    Operation(String),
}

impl Error {
    pub fn provider(provider: impl Into<String>, status: Option<u16>, body: impl Into<String>) -> Self {
        Self::Provider { provider: provider.into(), status, body: body.into() }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
