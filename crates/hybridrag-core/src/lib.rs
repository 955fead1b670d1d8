#![deny(warnings)]
#![deny(dead_code)]
#![deny(unused_variables)]
#![deny(unused_imports)]

pub mod config;
pub mod error;
pub mod metadata;
pub mod traits;
pub mod types;
pub mod vector_math;

pub use error::{Error, Result};
pub use metadata::MetadataTable;
pub use traits::{DenseRetriever, Embedder, LexicalRetriever, Reranker};
pub use types::{Document, MetadataRecord, RowHit, ScoredDocument, SearchHit, SourceKind};
