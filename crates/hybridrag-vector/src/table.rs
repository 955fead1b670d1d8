//! LanceDB connection and vector table writes.

use arrow_array::{FixedSizeListArray, Int64Array, RecordBatch, RecordBatchIterator};
use arrow_schema::ArrowError;
use lancedb::{connect, Connection, Table};
use std::path::Path;
use std::sync::Arc;

use hybridrag_core::{Error, Result};

use crate::schema::{build_arrow_schema, TABLE_NAME};

const WRITE_BATCH: usize = 1000;

pub async fn open_db(dir: &Path) -> Result<Connection> {
	connect(dir.to_string_lossy().as_ref()).execute().await.map_err(|e| Error::IndexLoad(format!("cannot open lancedb at {}: {e}", dir.display())))
}

pub async fn open_vectors(conn: &Connection) -> Result<Table> {
	conn.open_table(TABLE_NAME).execute().await.map_err(|e| Error::IndexLoad(format!("cannot open table '{TABLE_NAME}': {e}")))
}

fn to_record_batch(offset: usize, vectors: &[Vec<f32>], dim: i32) -> std::result::Result<RecordBatch, ArrowError> {
	let rows: Vec<i64> = (offset..offset + vectors.len()).map(|r| r as i64).collect();
	let values = vectors.iter().map(|v| Some(v.iter().map(|&x| Some(x)).collect::<Vec<_>>()));
	RecordBatch::try_new(build_arrow_schema(dim), vec![
		Arc::new(Int64Array::from(rows)),
		Arc::new(FixedSizeListArray::from_iter_primitive::<arrow_array::types::Float32Type, _, _>(values, dim)),
	])
}

/// Creates the `vectors` table with one row per vector; `row_id` is the
/// position in `vectors`. Expects a fresh database directory.
pub async fn write_vectors(conn: &Connection, vectors: &[Vec<f32>], dim: usize) -> Result<Table> {
	let dim = i32::try_from(dim).map_err(|_| Error::Configuration(format!("vector dimension {dim} too large")))?;
	let batches: Vec<std::result::Result<RecordBatch, ArrowError>> = vectors
		.chunks(WRITE_BATCH)
		.enumerate()
		.map(|(i, chunk)| to_record_batch(i * WRITE_BATCH, chunk, dim))
		.collect();
	let reader = Box::new(RecordBatchIterator::new(batches.into_iter(), build_arrow_schema(dim)));
	conn.create_table(TABLE_NAME, reader).execute().await.map_err(|e| Error::Operation(format!("cannot create table '{TABLE_NAME}': {e}")))
}
