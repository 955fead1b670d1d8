//! `index.json`: what was built, from what, and when.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use hybridrag_core::config::{VectorIndexKind, VectorIndexSettings};
use hybridrag_core::{Error, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexManifest {
	/// Strategy actually built; differs from `requested_strategy` after a fallback.
	pub strategy: VectorIndexKind,
	pub requested_strategy: VectorIndexKind,
	pub dim: usize,
	pub count: usize,
	pub params: VectorIndexSettings,
	/// blake3 of the `meta.jsonl` bytes.
	pub meta_checksum: String,
	pub built_at: String,
}

impl IndexManifest {
	pub fn read(path: &Path) -> Result<Self> {
		let raw = fs::read_to_string(path).map_err(|e| Error::IndexLoad(format!("cannot read manifest {}: {e}", path.display())))?;
		serde_json::from_str(&raw).map_err(|e| Error::IndexLoad(format!("invalid manifest {}: {e}", path.display())))
	}

	pub fn write(&self, path: &Path) -> Result<()> {
		let json = serde_json::to_string_pretty(self).map_err(|e| Error::Operation(e.to_string()))?;
		fs::write(path, json).map_err(|e| Error::Operation(format!("cannot write manifest {}: {e}", path.display())))
	}
}

pub fn checksum(bytes: &[u8]) -> String { blake3::hash(bytes).to_hex().to_string() }
