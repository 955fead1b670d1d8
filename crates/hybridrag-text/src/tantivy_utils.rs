use tantivy::schema::{IndexRecordOption, Schema, TextFieldIndexing, TextOptions, FAST, INDEXED, STORED};
use tantivy::tokenizer::{RegexTokenizer, TextAnalyzer};
use tantivy::Index;

/// Tokenizer name used by the `text` field at build and query time.
pub const TOKENIZER: &str = "ws_exact";
pub const ROW_FIELD: &str = "row";
pub const TEXT_FIELD: &str = "text";

pub const TANTIVY_DIR: &str = "tantivy";
pub const DOC_IDS_FILE: &str = "doc_ids.json";

pub fn build_schema() -> Schema {
	let mut schema_builder = Schema::builder();
	let _row_field = schema_builder.add_u64_field(ROW_FIELD, INDEXED | STORED | FAST);
	let text_field_indexing = TextFieldIndexing::default().set_tokenizer(TOKENIZER).set_index_option(IndexRecordOption::WithFreqs);
	let text_options = TextOptions::default().set_indexing_options(text_field_indexing);
	let _text_field = schema_builder.add_text_field(TEXT_FIELD, text_options);
	schema_builder.build()
}

/// Runs of non-whitespace (Unicode `White_Space`), case preserved, no
/// stemming, no stop words.
pub fn analyzer() -> tantivy::Result<TextAnalyzer> {
	Ok(TextAnalyzer::builder(RegexTokenizer::new(r"\S+")?).build())
}

pub fn register_tokenizer(index: &Index) -> tantivy::Result<()> {
	index.tokenizers().register(TOKENIZER, analyzer()?);
	Ok(())
}

/// Query-side tokenization; splits on the same characters as [`analyzer`].
pub fn tokenize(text: &str) -> Vec<&str> { text.split(char::is_whitespace).filter(|t| !t.is_empty()).collect() }
