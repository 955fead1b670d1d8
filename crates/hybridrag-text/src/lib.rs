//! hybridrag-text
//!
//! Tantivy-based BM25 lexical retrieval. `index` builds the on-disk snapshot,
//! `search` serves read-only queries against it.

pub mod index;
pub mod search;
pub mod tantivy_utils;

pub use index::build_bm25_index;
pub use search::Bm25Retriever;
