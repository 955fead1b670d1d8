use std::fs;
use std::path::Path;
use tantivy::collector::TopDocs;
use tantivy::query::{BooleanQuery, Occur, Query, TermQuery};
use tantivy::schema::{Field, IndexRecordOption, Value};
use tantivy::{Index, IndexReader, TantivyDocument, Term};
use tracing::info;

use hybridrag_core::{Error, LexicalRetriever, Result, SearchHit, SourceKind};

use crate::tantivy_utils::{register_tokenizer, tokenize, DOC_IDS_FILE, ROW_FIELD, TANTIVY_DIR, TEXT_FIELD};

fn load_err(e: impl std::fmt::Display) -> Error { Error::IndexLoad(format!("bm25 index: {e}")) }

/// Read-only BM25 retriever: Tantivy index plus the row → doc_id array.
pub struct Bm25Retriever {
	reader: IndexReader,
	row_field: Field,
	text_field: Field,
	doc_ids: Vec<String>,
}

impl Bm25Retriever {
	pub fn open(dir: &Path) -> Result<Self> {
		let index = Index::open_in_dir(dir.join(TANTIVY_DIR)).map_err(load_err)?;
		register_tokenizer(&index).map_err(load_err)?;
		let schema = index.schema();
		let row_field = schema.get_field(ROW_FIELD).map_err(load_err)?;
		let text_field = schema.get_field(TEXT_FIELD).map_err(load_err)?;

		let raw = fs::read_to_string(dir.join(DOC_IDS_FILE)).map_err(load_err)?;
		let doc_ids: Vec<String> = serde_json::from_str(&raw).map_err(load_err)?;

		let reader = index.reader().map_err(load_err)?;
		let num_docs = reader.searcher().num_docs();
		if num_docs != doc_ids.len() as u64 {
			return Err(Error::IndexLoad(format!("bm25 index has {num_docs} docs but doc_ids has {}", doc_ids.len())));
		}
		info!(docs = num_docs, path = %dir.display(), "bm25 index loaded");
		Ok(Self { reader, row_field, text_field, doc_ids })
	}

	pub fn len(&self) -> usize { self.doc_ids.len() }

	pub fn is_empty(&self) -> bool { self.doc_ids.is_empty() }

	fn build_query(&self, query: &str) -> Option<BooleanQuery> {
		let clauses: Vec<(Occur, Box<dyn Query>)> = tokenize(query)
			.into_iter()
			.map(|tok| {
				let term = Term::from_field_text(self.text_field, tok);
				(Occur::Should, Box::new(TermQuery::new(term, IndexRecordOption::WithFreqs)) as Box<dyn Query>)
			})
			.collect();
		if clauses.is_empty() { None } else { Some(BooleanQuery::new(clauses)) }
	}
}

impl LexicalRetriever for Bm25Retriever {
	fn search(&self, query: &str, top_k: usize) -> Result<Vec<SearchHit>> {
		let Some(q) = self.build_query(query) else { return Ok(Vec::new()) };
		if top_k == 0 || self.doc_ids.is_empty() { return Ok(Vec::new()); }

		let searcher = self.reader.searcher();
		let top_docs = searcher.search(&q, &TopDocs::with_limit(top_k)).map_err(|e| Error::Operation(format!("bm25 search: {e}")))?;
		let mut hits = Vec::with_capacity(top_docs.len());
		for (score, addr) in top_docs {
			if score <= 0.0 { continue; }
			let doc: TantivyDocument = searcher.doc(addr).map_err(|e| Error::Operation(format!("bm25 fetch: {e}")))?;
			let row = doc.get_first(self.row_field).and_then(|v| v.as_u64()).ok_or_else(|| Error::IndexLoad("bm25 document without row".to_string()))?;
			let doc_id = self.doc_ids.get(row as usize).ok_or_else(|| Error::IndexLoad(format!("bm25 row {row} out of range")))?;
			hits.push(SearchHit { doc_id: doc_id.clone(), score, source: SourceKind::Sparse });
		}
		Ok(hits)
	}
}
