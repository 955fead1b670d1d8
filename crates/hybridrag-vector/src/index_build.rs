//! Vector snapshot builder.
//!
//! Writes `meta.jsonl`, the LanceDB `vectors` table and the `index.json`
//! manifest under one directory. Vectors are L2-normalized before they are
//! stored, and IVF-PQ quietly degrades to a flat scan when there are too few
//! vectors to train it.

use chrono::Utc;
use lancedb::index::vector::{IvfHnswSqIndexBuilder, IvfPqIndexBuilder};
use lancedb::index::Index;
use lancedb::{DistanceType, Table};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

use hybridrag_core::config::{VectorIndexKind, VectorIndexSettings};
use hybridrag_core::vector_math::normalized;
use hybridrag_core::{Error, MetadataRecord, MetadataTable, Result};

use crate::manifest::{checksum, IndexManifest};
use crate::schema::{LANCE_DIR, MANIFEST_FILE, META_FILE, VECTOR};
use crate::table::{open_db, write_vectors};

/// Picks the strategy that will actually be built for `count` vectors.
pub fn effective_strategy(params: &VectorIndexSettings, count: usize) -> VectorIndexKind {
	match params.kind {
		VectorIndexKind::IvfPq if count < params.min_training_vectors() => VectorIndexKind::Flat,
		kind => kind,
	}
}

fn validate_inputs(records: &[MetadataRecord], vectors: &[Vec<f32>], params: &VectorIndexSettings) -> Result<usize> {
	if records.len() != vectors.len() {
		return Err(Error::Configuration(format!("{} metadata records but {} vectors", records.len(), vectors.len())));
	}
	let dim = vectors.first().map(Vec::len).ok_or_else(|| Error::Configuration("no vectors to index".to_string()))?;
	if dim == 0 {
		return Err(Error::Configuration("vectors must have a non-zero dimension".to_string()));
	}
	if let Some((row, v)) = vectors.iter().enumerate().find(|(_, v)| v.len() != dim) {
		return Err(Error::Configuration(format!("vector {row} has dimension {} (expected {dim})", v.len())));
	}
	if params.kind == VectorIndexKind::IvfPq && dim % params.m != 0 {
		return Err(Error::Configuration(format!("dimension {dim} is not divisible by m={}", params.m)));
	}
	Ok(dim)
}

async fn create_ann_index(table: &Table, strategy: VectorIndexKind, params: &VectorIndexSettings) -> Result<()> {
	let index = match strategy {
		VectorIndexKind::Flat => return Ok(()),
		VectorIndexKind::Hnsw => Index::IvfHnswSq(
			IvfHnswSqIndexBuilder::default()
				.distance_type(DistanceType::Dot)
				.num_partitions(1)
				.num_edges(params.hnsw_m as u32)
				.ef_construction(params.ef_construction as u32),
		),
		VectorIndexKind::IvfPq => Index::IvfPq(
			IvfPqIndexBuilder::default()
				.distance_type(DistanceType::Dot)
				.num_partitions(params.nlist as u32)
				.num_sub_vectors(params.m as u32)
				.num_bits(params.nbits as u32),
		),
	};
	table
		.create_index(&[VECTOR], index)
		.execute()
		.await
		.map_err(|e| Error::Operation(format!("cannot build {strategy} index: {e}")))
}

/// Builds a fresh snapshot in `index_dir`, replacing any previous one.
pub async fn build_vector_index(index_dir: &Path, records: &[MetadataRecord], vectors: &[Vec<f32>], params: &VectorIndexSettings) -> Result<IndexManifest> {
	let dim = validate_inputs(records, vectors, params)?;
	let count = vectors.len();

	let strategy = effective_strategy(params, count);
	if strategy != params.kind {
		warn!(
			count,
			required = params.min_training_vectors(),
			nlist = params.nlist,
			nbits = params.nbits,
			"too few vectors to train ivf_pq; falling back to flat"
		);
	}

	fs::create_dir_all(index_dir).map_err(|e| Error::Operation(format!("cannot create {}: {e}", index_dir.display())))?;
	let lance_dir = index_dir.join(LANCE_DIR);
	if lance_dir.exists() {
		fs::remove_dir_all(&lance_dir).map_err(|e| Error::Operation(format!("cannot clear {}: {e}", lance_dir.display())))?;
	}

	let meta_path = index_dir.join(META_FILE);
	MetadataTable::write_jsonl(&meta_path, records)?;
	let meta_bytes = fs::read(&meta_path).map_err(|e| Error::Operation(e.to_string()))?;

	let unit: Vec<Vec<f32>> = vectors.iter().map(|v| normalized(v)).collect();
	let conn = open_db(&lance_dir).await?;
	let table = write_vectors(&conn, &unit, dim).await?;
	create_ann_index(&table, strategy, params).await?;

	let manifest = IndexManifest {
		strategy,
		requested_strategy: params.kind,
		dim,
		count,
		params: params.clone(),
		meta_checksum: checksum(&meta_bytes),
		built_at: Utc::now().to_rfc3339(),
	};
	manifest.write(&index_dir.join(MANIFEST_FILE))?;
	info!(count, dim, %strategy, path = %index_dir.display(), "vector index built");
	Ok(manifest)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn ivf_pq_falls_back_below_training_threshold() {
		let params = VectorIndexSettings { kind: VectorIndexKind::IvfPq, nlist: 100, nbits: 8, ..VectorIndexSettings::default() };
		assert_eq!(effective_strategy(&params, 399), VectorIndexKind::Flat);
		assert_eq!(effective_strategy(&params, 400), VectorIndexKind::IvfPq);

		let hnsw = VectorIndexSettings { kind: VectorIndexKind::Hnsw, ..VectorIndexSettings::default() };
		assert_eq!(effective_strategy(&hnsw, 3), VectorIndexKind::Hnsw);
	}

	#[test]
	fn mismatched_inputs_are_rejected() {
		let params = VectorIndexSettings { kind: VectorIndexKind::Flat, ..VectorIndexSettings::default() };
		let recs = vec![MetadataRecord::new("a", "", "x")];
		assert!(validate_inputs(&recs, &[], &params).is_err());
		assert!(validate_inputs(&recs, &[vec![]], &params).is_err());

		let recs2 = vec![MetadataRecord::new("a", "", "x"), MetadataRecord::new("b", "", "y")];
		assert!(validate_inputs(&recs2, &[vec![1.0, 0.0], vec![1.0]], &params).is_err());

		let pq = VectorIndexSettings { kind: VectorIndexKind::IvfPq, m: 3, ..VectorIndexSettings::default() };
		assert!(matches!(validate_inputs(&recs, &[vec![1.0; 8]], &pq), Err(Error::Configuration(_))));
	}
}
