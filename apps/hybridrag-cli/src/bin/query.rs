use std::env;
use hybridrag_core::config::{Config, RerankerKind};
use hybridrag_pipeline::{reranker_override_from_env, QueryPipeline};
use tracing_subscriber::EnvFilter;

const PREVIEW_CHARS: usize = 120;

fn usage(program: &str) -> ! {
    eprintln!("Usage: {} \"<query>\" [--reranker colbert|crossencoder|none] [--json]", program);
    eprintln!("Example: {} 'hybrid search with bm25' --reranker colbert", program);
    std::process::exit(1);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))).with_writer(std::io::stderr).init();
    let args: Vec<String> = env::args().collect();
    let program = args.first().cloned().unwrap_or_else(|| "hybridrag-query".to_string());
    let mut query = None; let mut reranker: Option<RerankerKind> = None; let mut json = false;
    let mut i = 1; while i < args.len() { match args[i].as_str() {
        "--json" => json = true,
        "--reranker" => { match args.get(i + 1) { Some(v) => { reranker = Some(v.parse()?); i += 1; } None => { eprintln!("Error: --reranker requires a value"); usage(&program); } } }
        "-h" | "--help" => usage(&program),
        a if !a.starts_with('-') && query.is_none() => query = Some(a.to_string()),
        other => { eprintln!("Error: unexpected argument '{}'", other); usage(&program); } } i += 1; }
    let Some(query) = query else { usage(&program) };

    let config = Config::load().map_err(|e| { eprintln!("Error loading config: {}", e); e })?;
    let settings = config.settings()?;
    // Flag wins over the RERANKER environment variable.
    let runtime_override = match reranker { Some(kind) => Some(kind), None => reranker_override_from_env()? };
    let pipeline = QueryPipeline::from_settings(&settings, config.base_dir(), runtime_override).await?;
    let results = pipeline.query(&query).await?;

    if json { println!("{}", serde_json::to_string_pretty(&results)?); return Ok(()); }
    println!("🔍 Query: {}  (reranker: {})", query, pipeline.reranker_name().unwrap_or("none"));
    if results.is_empty() { println!("No results."); }
    for r in &results {
        let preview: String = r.document.text.chars().take(PREVIEW_CHARS).collect::<String>().replace('\n', " ");
        println!("{:.4}\t{}\t{}", r.score, r.document.doc_id, preview);
    }
    Ok(())
}
