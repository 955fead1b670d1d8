//! Domain types passed between the retrieval stages.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A retrievable passage as returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub doc_id: String,
    pub title: String,
    pub text: String,
}

/// One line of `meta.jsonl`.
///
/// - `doc_id`: stable identity; several rows may share it when a document was
///   split into chunks
/// - `title`/`text`: the passage payload
/// - `extra`: chunk-specific fields (`chunk_id`, `context`, ...) kept opaque
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataRecord {
    pub doc_id: String,
    #[serde(default)]
    pub title: String,
    pub text: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MetadataRecord {
    pub fn new(doc_id: impl Into<String>, title: impl Into<String>, text: impl Into<String>) -> Self {
        Self { doc_id: doc_id.into(), title: title.into(), text: text.into(), extra: Map::new() }
    }

    pub fn to_document(&self) -> Document {
        Document { doc_id: self.doc_id.clone(), title: self.title.clone(), text: self.text.clone() }
    }
}

/// Indicates which retriever produced a candidate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SourceKind {
    Dense,
    Sparse,
}

/// Raw vector-index hit: `row` is the position in the metadata table and
/// `score` the inner-product similarity of unit vectors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RowHit {
    pub row: usize,
    pub score: f32,
}

/// A candidate keyed by document id. `score` is only comparable with hits
/// of the same `source`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub doc_id: String,
    pub score: f32,
    pub source: SourceKind,
}

/// Final pipeline output, highest score first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredDocument {
    pub score: f32,
    pub document: Document,
}
