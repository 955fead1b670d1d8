use std::fs;
use tempfile::TempDir;

use hybridrag_core::config::{VectorIndexKind, VectorIndexSettings};
use hybridrag_core::{DenseRetriever, Error, MetadataRecord};
use hybridrag_vector::{build_vector_index, IndexManifest, VectorIndexReader};

/// Deterministic, mostly distinct vectors.
fn vectors(n: usize, dim: usize) -> Vec<Vec<f32>> {
	(0..n).map(|i| (0..dim).map(|j| (((i * 31 + j * 17) % 13) as f32 - 6.0) + if j == i % dim { 10.0 } else { 0.0 }).collect()).collect()
}

fn records(n: usize) -> Vec<MetadataRecord> {
	(0..n).map(|i| MetadataRecord::new(format!("doc_{i:03}"), format!("Doc {i}"), format!("text {i}"))).collect()
}

#[tokio::test]
async fn ivf_pq_request_with_few_vectors_builds_flat() {
	let tmp = TempDir::new().unwrap();
	let params = VectorIndexSettings { kind: VectorIndexKind::IvfPq, nlist: 100, m: 4, nbits: 8, ..VectorIndexSettings::default() };

	let manifest = build_vector_index(tmp.path(), &records(50), &vectors(50, 8), &params).await.expect("build");
	assert_eq!(manifest.strategy, VectorIndexKind::Flat);
	assert_eq!(manifest.requested_strategy, VectorIndexKind::IvfPq);
	assert_eq!(manifest.count, 50);
	assert_eq!(manifest.dim, 8);

	let on_disk = IndexManifest::read(&tmp.path().join("index.json")).expect("manifest");
	assert_eq!(on_disk, manifest);
}

#[tokio::test]
async fn flat_search_finds_the_query_vector_itself() {
	let tmp = TempDir::new().unwrap();
	let params = VectorIndexSettings { kind: VectorIndexKind::Flat, ..VectorIndexSettings::default() };
	let vecs = vectors(20, 8);
	build_vector_index(tmp.path(), &records(20), &vecs, &params).await.expect("build");

	let reader = VectorIndexReader::open(tmp.path()).await.expect("open");
	assert_eq!(reader.dim(), 8);
	assert_eq!(reader.metadata().len(), 20);

	// Scaling the query must not change the ranking: both sides are normalized.
	let query: Vec<f32> = vecs[7].iter().map(|x| x * 3.5).collect();
	let hits = reader.search(&query, 5).await.expect("search");
	assert_eq!(hits.len(), 5);
	assert_eq!(hits[0].row, 7);
	assert!((hits[0].score - 1.0).abs() < 1e-4, "self-similarity of unit vectors is 1, got {}", hits[0].score);
	assert!(hits.windows(2).all(|w| w[0].score >= w[1].score));
	assert_eq!(reader.metadata().doc_id(hits[0].row), Some("doc_007"));
}

/// Pseudo-random vectors with no repeats, for the trained index kinds.
fn spread(n: usize, dim: usize) -> Vec<Vec<f32>> {
	let mut state: u64 = 0x9e37_79b9_7f4a_7c15;
	(0..n)
		.map(|_| {
			(0..dim)
				.map(|_| {
					state ^= state << 13;
					state ^= state >> 7;
					state ^= state << 17;
					(state % 2001) as f32 / 1000.0 - 1.0
				})
				.collect()
		})
		.collect()
}

async fn assert_finds_itself(reader: &VectorIndexReader, vecs: &[Vec<f32>], row: usize) {
	let hits = reader.search(&vecs[row], 10).await.expect("search");
	assert!(!hits.is_empty());
	assert!(hits.windows(2).all(|w| w[0].score >= w[1].score));
	assert!(hits.iter().any(|h| h.row == row), "row {row} missing from {hits:?}");
}

#[tokio::test]
async fn hnsw_index_is_built_and_searched() {
	let tmp = TempDir::new().unwrap();
	let params = VectorIndexSettings { kind: VectorIndexKind::Hnsw, hnsw_m: 16, ef_construction: 100, ef_search: 64, ..VectorIndexSettings::default() };
	let vecs = spread(300, 16);

	let manifest = build_vector_index(tmp.path(), &records(300), &vecs, &params).await.expect("build");
	assert_eq!(manifest.strategy, VectorIndexKind::Hnsw);
	assert_eq!(manifest.requested_strategy, VectorIndexKind::Hnsw);

	let reader = VectorIndexReader::open(tmp.path()).await.expect("open");
	assert_eq!(reader.manifest().strategy, VectorIndexKind::Hnsw);
	for row in [0, 42, 299] {
		assert_finds_itself(&reader, &vecs, row).await;
	}
}

#[tokio::test]
async fn ivf_pq_above_training_threshold_is_built_and_searched() {
	let tmp = TempDir::new().unwrap();
	// threshold is max(4 * 2, 2^8) = 256
	let params = VectorIndexSettings { kind: VectorIndexKind::IvfPq, nlist: 2, m: 4, nbits: 8, nprobe: 2, ..VectorIndexSettings::default() };
	let vecs = spread(300, 16);

	let manifest = build_vector_index(tmp.path(), &records(300), &vecs, &params).await.expect("build");
	assert_eq!(manifest.strategy, VectorIndexKind::IvfPq);
	assert_eq!(manifest.count, 300);

	let reader = VectorIndexReader::open(tmp.path()).await.expect("open");
	assert_eq!(reader.manifest().strategy, VectorIndexKind::IvfPq);
	for row in [3, 150, 298] {
		assert_finds_itself(&reader, &vecs, row).await;
	}
}

#[tokio::test]
async fn query_dimension_mismatch_is_a_configuration_error() {
	let tmp = TempDir::new().unwrap();
	let params = VectorIndexSettings { kind: VectorIndexKind::Flat, ..VectorIndexSettings::default() };
	build_vector_index(tmp.path(), &records(4), &vectors(4, 8), &params).await.expect("build");
	let reader = VectorIndexReader::open(tmp.path()).await.expect("open");

	let err = reader.search(&[1.0, 0.0], 3).await.unwrap_err();
	assert!(matches!(err, Error::Configuration(_)), "got {err:?}");
}

#[tokio::test]
async fn edited_metadata_refuses_to_load() {
	let tmp = TempDir::new().unwrap();
	let params = VectorIndexSettings { kind: VectorIndexKind::Flat, ..VectorIndexSettings::default() };
	build_vector_index(tmp.path(), &records(4), &vectors(4, 8), &params).await.expect("build");

	let meta = tmp.path().join("meta.jsonl");
	let mut content = fs::read_to_string(&meta).unwrap();
	content.push_str("{\"doc_id\":\"extra\",\"text\":\"appended\"}\n");
	fs::write(&meta, content).unwrap();

	let err = VectorIndexReader::open(tmp.path()).await.err().expect("must fail");
	assert!(matches!(err, Error::IndexLoad(_)), "got {err:?}");
}

#[tokio::test]
async fn manifest_count_mismatch_refuses_to_load() {
	let tmp = TempDir::new().unwrap();
	let params = VectorIndexSettings { kind: VectorIndexKind::Flat, ..VectorIndexSettings::default() };
	let mut manifest = build_vector_index(tmp.path(), &records(4), &vectors(4, 8), &params).await.expect("build");
	manifest.count = 5;
	manifest.write(&tmp.path().join("index.json")).unwrap();

	assert!(matches!(VectorIndexReader::open(tmp.path()).await, Err(Error::IndexLoad(_))));
}

#[tokio::test]
async fn missing_snapshot_refuses_to_load() {
	let tmp = TempDir::new().unwrap();
	assert!(matches!(VectorIndexReader::open(tmp.path()).await, Err(Error::IndexLoad(_))));
}
