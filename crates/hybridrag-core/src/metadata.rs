//! Ordered metadata table backing the vector index.
//!
//! Row `i` of the table describes row `i` of the vector index. The table is
//! loaded once from `meta.jsonl` and never mutated afterwards.

use std::collections::HashMap;
use std::fs;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::error::{Error, Result};
use crate::types::{Document, MetadataRecord};

#[derive(Debug, Clone, Default)]
pub struct MetadataTable {
    records: Vec<MetadataRecord>,
    first_row_by_doc_id: HashMap<String, usize>,
}

impl MetadataTable {
    pub fn from_records(records: Vec<MetadataRecord>) -> Self {
        let mut first_row_by_doc_id = HashMap::with_capacity(records.len());
        for (row, rec) in records.iter().enumerate() {
            first_row_by_doc_id.entry(rec.doc_id.clone()).or_insert(row);
        }
        Self { records, first_row_by_doc_id }
    }

    /// Reads newline-delimited JSON records. Blank lines are skipped; any
    /// unparsable line fails the whole load.
    pub fn load_jsonl(path: &Path) -> Result<Self> {
        let file = fs::File::open(path)
            .map_err(|e| Error::IndexLoad(format!("cannot open metadata {}: {}", path.display(), e)))?;
        let mut records = Vec::new();
        for (lineno, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|e| Error::IndexLoad(format!("{}:{}: {}", path.display(), lineno + 1, e)))?;
            if line.trim().is_empty() { continue; }
            let rec: MetadataRecord = serde_json::from_str(&line)
                .map_err(|e| Error::IndexLoad(format!("{}:{}: invalid record: {}", path.display(), lineno + 1, e)))?;
            records.push(rec);
        }
        Ok(Self::from_records(records))
    }

    pub fn write_jsonl(path: &Path, records: &[MetadataRecord]) -> Result<()> {
        let file = fs::File::create(path)
            .map_err(|e| Error::Operation(format!("cannot create {}: {}", path.display(), e)))?;
        let mut out = BufWriter::new(file);
        for rec in records {
            let line = serde_json::to_string(rec).map_err(|e| Error::Operation(e.to_string()))?;
            writeln!(out, "{line}").map_err(|e| Error::Operation(e.to_string()))?;
        }
        out.flush().map_err(|e| Error::Operation(e.to_string()))
    }

    pub fn len(&self) -> usize { self.records.len() }

    pub fn is_empty(&self) -> bool { self.records.is_empty() }

    pub fn records(&self) -> &[MetadataRecord] { &self.records }

    pub fn get(&self, row: usize) -> Option<&MetadataRecord> { self.records.get(row) }

    pub fn doc_id(&self, row: usize) -> Option<&str> { self.records.get(row).map(|r| r.doc_id.as_str()) }

    /// Resolves a document id to its first record in table order.
    pub fn document(&self, doc_id: &str) -> Option<Document> {
        self.first_row_by_doc_id.get(doc_id).map(|&row| self.records[row].to_document())
    }

    /// Number of distinct document ids.
    pub fn distinct_documents(&self) -> usize { self.first_row_by_doc_id.len() }
}
