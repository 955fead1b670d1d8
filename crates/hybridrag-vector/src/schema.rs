use arrow_schema::{DataType, Field, Schema};
use std::sync::Arc;

pub const TABLE_NAME: &str = "vectors";
pub const ROW_ID: &str = "row_id";
pub const VECTOR: &str = "vector";

pub const LANCE_DIR: &str = "lancedb";
pub const META_FILE: &str = "meta.jsonl";
pub const MANIFEST_FILE: &str = "index.json";

pub fn build_arrow_schema(dim: i32) -> Arc<Schema> {
	Arc::new(Schema::new(vec![
		Field::new(ROW_ID, DataType::Int64, false),
		Field::new(VECTOR, DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), dim), true),
	]))
}
