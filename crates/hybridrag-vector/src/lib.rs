//! hybridrag-vector
//!
//! LanceDB-backed dense retrieval: `index_build` writes a snapshot
//! (`meta.jsonl` + `vectors` table + `index.json`), `search` opens it
//! read-only and answers inner-product queries on unit vectors.

pub mod index_build;
pub mod manifest;
pub mod schema;
pub mod search;
pub mod table;

pub use index_build::{build_vector_index, effective_strategy};
pub use manifest::IndexManifest;
pub use search::VectorIndexReader;
