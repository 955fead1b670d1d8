use arrow_array::{Array, Float32Array, Int64Array};
use async_trait::async_trait;
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase, Select};
use lancedb::{DistanceType, Table};
use std::cmp::Ordering;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use hybridrag_core::config::VectorIndexKind;
use hybridrag_core::vector_math::normalized;
use hybridrag_core::{DenseRetriever, Error, MetadataTable, Result, RowHit};

use crate::manifest::{checksum, IndexManifest};
use crate::schema::{LANCE_DIR, MANIFEST_FILE, META_FILE, ROW_ID};
use crate::table::{open_db, open_vectors};

/// Read-only view over a built vector snapshot and its metadata table.
pub struct VectorIndexReader {
	table: Table,
	manifest: IndexManifest,
	metadata: Arc<MetadataTable>,
}

impl VectorIndexReader {
	/// Opens and cross-checks a snapshot. Any disagreement between manifest,
	/// metadata and table is an `IndexLoad` error.
	pub async fn open(index_dir: &Path) -> Result<Self> {
		let manifest = IndexManifest::read(&index_dir.join(MANIFEST_FILE))?;

		let meta_path = index_dir.join(META_FILE);
		let meta_bytes = fs::read(&meta_path).map_err(|e| Error::IndexLoad(format!("cannot read metadata {}: {e}", meta_path.display())))?;
		if checksum(&meta_bytes) != manifest.meta_checksum {
			return Err(Error::IndexLoad(format!("{} does not match the manifest checksum", meta_path.display())));
		}
		let metadata = MetadataTable::load_jsonl(&meta_path)?;

		let conn = open_db(&index_dir.join(LANCE_DIR)).await?;
		let table = open_vectors(&conn).await?;
		let rows = table.count_rows(None).await.map_err(|e| Error::IndexLoad(format!("cannot count vectors: {e}")))?;

		if rows != metadata.len() || rows != manifest.count {
			return Err(Error::IndexLoad(format!(
				"snapshot mismatch: {rows} vectors, {} metadata records, manifest count {}",
				metadata.len(),
				manifest.count
			)));
		}
		info!(rows, dim = manifest.dim, strategy = %manifest.strategy, path = %index_dir.display(), "vector index loaded");
		Ok(Self { table, manifest, metadata: Arc::new(metadata) })
	}

	pub fn manifest(&self) -> &IndexManifest { &self.manifest }

	pub fn metadata(&self) -> Arc<MetadataTable> { Arc::clone(&self.metadata) }

	pub fn dim(&self) -> usize { self.manifest.dim }
}

#[async_trait]
impl DenseRetriever for VectorIndexReader {
	async fn search(&self, query_vec: &[f32], top_m: usize) -> Result<Vec<RowHit>> {
		if query_vec.len() != self.manifest.dim {
			return Err(Error::Configuration(format!("query dimension {} does not match index dimension {}", query_vec.len(), self.manifest.dim)));
		}
		if top_m == 0 || self.manifest.count == 0 { return Ok(Vec::new()); }

		let query_err = |e: lancedb::Error| Error::Operation(format!("vector search failed: {e}"));
		let mut query = self
			.table
			.vector_search(normalized(query_vec))
			.map_err(query_err)?
			.distance_type(DistanceType::Dot)
			.select(Select::columns(&[ROW_ID]))
			.limit(top_m);
		query = match self.manifest.strategy {
			VectorIndexKind::Flat => query.bypass_vector_index(),
			VectorIndexKind::Hnsw => query.ef(self.manifest.params.ef_search),
			VectorIndexKind::IvfPq => query.nprobes(self.manifest.params.nprobe),
		};

		let mut stream = query.execute().await.map_err(query_err)?;
		let mut hits = Vec::new();
		while let Some(batch) = stream.try_next().await.map_err(query_err)? {
			let rows = batch
				.column_by_name(ROW_ID)
				.and_then(|c| c.as_any().downcast_ref::<Int64Array>())
				.ok_or_else(|| Error::IndexLoad("vector table has no row_id column".to_string()))?;
			let distances = batch
				.column_by_name("_distance")
				.and_then(|c| c.as_any().downcast_ref::<Float32Array>())
				.ok_or_else(|| Error::Operation("vector search returned no _distance column".to_string()))?;
			for i in 0..batch.num_rows() {
				if rows.is_null(i) { continue; }
				// Dot distance is 1 - <q, v>.
				hits.push(RowHit { row: rows.value(i) as usize, score: 1.0 - distances.value(i) });
			}
		}
		hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
		hits.truncate(top_m);
		Ok(hits)
	}
}
