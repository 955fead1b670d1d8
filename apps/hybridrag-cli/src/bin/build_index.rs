use std::{env, path::PathBuf};
use hybridrag_core::config::Config;
use hybridrag_core::MetadataTable;
use hybridrag_embed::build_embedder;
use hybridrag_pipeline::build_indexes;
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))).with_writer(std::io::stderr).init();
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 || args[1].starts_with('-') {
        eprintln!("Usage: {} <docs.jsonl>", args.first().map(String::as_str).unwrap_or("hybridrag-build-index"));
        eprintln!("Each line: {{\"doc_id\": ..., \"title\": ..., \"text\": ...}}");
        std::process::exit(1);
    }
    let docs_path = PathBuf::from(&args[1]);
    let config = Config::load().map_err(|e| { eprintln!("Error loading config: {}", e); e })?;
    let settings = config.settings()?;
    let base_dir = config.base_dir();

    println!("Hybrid index builder\n====================");
    println!("Documents: {}", docs_path.display());
    println!("Vector index: {}", settings.index_dir_path(base_dir).display());
    println!("BM25 index:   {}", settings.bm25_index_path(base_dir).display());
    let table = MetadataTable::load_jsonl(&docs_path)?;
    if table.is_empty() { anyhow::bail!("no records in {}", docs_path.display()); }
    println!("Loaded {} records ({} distinct documents)", table.len(), table.distinct_documents());

    let embedder = build_embedder(&settings.embedding)?;
    let pb = ProgressBar::new(table.len() as u64);
    pb.set_style(ProgressStyle::default_bar().template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} embedded ({percent}%)")?.progress_chars("#>-"));
    let report = build_indexes(table.records(), embedder.as_ref(), &settings, base_dir, |done| pb.set_position(done as u64)).await?;
    pb.finish_and_clear();

    println!("\n✅ Indexing completed successfully!");
    println!("📊 Vector index: {} vectors, dim {}, strategy {} (requested {})", report.manifest.count, report.manifest.dim, report.manifest.strategy, report.manifest.requested_strategy);
    println!("📊 BM25 index: {} documents", report.bm25_docs);
    println!("\n💡 To query, use: cargo run --bin hybridrag-query '<query>'");
    Ok(())
}
