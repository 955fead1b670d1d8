//! hybridrag-pipeline
//!
//! Hybrid retrieval orchestration. `fusion` holds Reciprocal Rank Fusion,
//! `pipeline` the per-query state machine, `select` reranker resolution and
//! `indexer` the offline snapshot build.

pub mod context;
pub mod fusion;
pub mod indexer;
pub mod pipeline;
pub mod select;

pub use context::RetrievalContext;
pub use fusion::{rrf_fuse, FusedEntry, FusedRanking, DEFAULT_RRF_K};
pub use indexer::{build_indexes, embed_in_batches, BuildReport};
pub use pipeline::{query_system, QueryPipeline, PLACEHOLDER_SCORE};
pub use select::{init_reranker, init_reranker_with, reranker_override_from_env};
