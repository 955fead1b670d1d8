use std::fs;
use std::path::Path;
use tantivy::{doc, Index, IndexWriter};
use tracing::info;

use hybridrag_core::{Error, MetadataRecord, Result};

use crate::tantivy_utils::{build_schema, register_tokenizer, DOC_IDS_FILE, ROW_FIELD, TANTIVY_DIR, TEXT_FIELD};

fn op_err(e: impl std::fmt::Display) -> Error { Error::Operation(format!("bm25 build: {e}")) }

/// Builds the lexical snapshot under `dir`, replacing any previous one.
/// Row `i` is `records[i]`; `doc_ids.json` keeps the parallel id array.
pub fn build_bm25_index(dir: &Path, records: &[MetadataRecord]) -> Result<usize> {
	let index_dir = dir.join(TANTIVY_DIR);
	if index_dir.exists() { fs::remove_dir_all(&index_dir).map_err(op_err)?; }
	fs::create_dir_all(&index_dir).map_err(op_err)?;

	let schema = build_schema();
	let index = Index::create_in_dir(&index_dir, schema.clone()).map_err(op_err)?;
	register_tokenizer(&index).map_err(op_err)?;
	let row_field = schema.get_field(ROW_FIELD).map_err(op_err)?;
	let text_field = schema.get_field(TEXT_FIELD).map_err(op_err)?;

	let mut index_writer: IndexWriter = index.writer_with_num_threads(1, 50_000_000).map_err(op_err)?;
	for (row, rec) in records.iter().enumerate() {
		index_writer.add_document(doc!(row_field => row as u64, text_field => rec.text.clone())).map_err(op_err)?;
	}
	index_writer.commit().map_err(op_err)?;

	let doc_ids: Vec<&str> = records.iter().map(|r| r.doc_id.as_str()).collect();
	let json = serde_json::to_string(&doc_ids).map_err(op_err)?;
	fs::write(dir.join(DOC_IDS_FILE), json).map_err(op_err)?;

	info!(docs = records.len(), path = %dir.display(), "bm25 index built");
	Ok(records.len())
}
