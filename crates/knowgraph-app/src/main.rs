//! knowgraph binary - composition root.
//!
//! 1. Parse arguments and load configuration from TOML
//! 2. Build the embedding provider and the requested retriever
//! 3. Ingest the corpus
//! 4. Run the subcommand and print JSON on stdout
//!
//! Logs go to stderr so stdout stays machine-readable.

mod cli;
mod corpus;

use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use serde_json::json;

use knowgraph_core::config::EmbeddingConfig;
use knowgraph_core::{KnowgraphConfig, KnowgraphError, MetadataFilter, Result};
use knowgraph_graph::{GraphIndex, IngestReport, Retriever};
use knowgraph_vector::{EmbeddingProvider, MockEmbedding};

use cli::{CliArgs, Command, CorpusArgs, InitArgs, QueryArgs, SnapshotArgs};
use corpus::load_corpus;

/// Build the configured embedding provider.
fn build_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    match config.provider.as_str() {
        "mock" => Ok(Arc::new(MockEmbedding::with_dimensions(config.dimensions))),
        "onnx" => onnx_embedder(config),
        other => Err(KnowgraphError::Config(format!(
            "unknown embedding provider '{}'",
            other
        ))),
    }
}

#[cfg(feature = "onnx")]
fn onnx_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    let provider = knowgraph_vector::OnnxEmbeddingProvider::from_directory(Path::new(&config.model_dir))?;
    tracing::info!(model_dir = %config.model_dir, "ONNX embedding provider loaded");
    Ok(Arc::new(provider))
}

#[cfg(not(feature = "onnx"))]
fn onnx_embedder(_config: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    Err(KnowgraphError::Config(
        "embedding provider 'onnx' requires building with the `onnx` feature".to_string(),
    ))
}

fn parse_filter(conditions: &[String]) -> Result<Option<MetadataFilter>> {
    let mut filter = MetadataFilter::new();
    for expr in conditions {
        let (key, value) = MetadataFilter::parse_condition(expr)?;
        filter = filter.require(key, value);
    }
    Ok((!filter.is_empty()).then_some(filter))
}

fn print_failures(report: &IngestReport) {
    for failure in &report.failed {
        eprintln!(
            "skipped document {} (source {}): {}",
            failure.index, failure.source, failure.error
        );
    }
}

/// Ingest the corpus into a fresh graph index.
fn build_graph(corpus: &CorpusArgs, config: &KnowgraphConfig) -> Result<(GraphIndex, IngestReport)> {
    let documents = load_corpus(&corpus.corpus)?;
    let mut index = GraphIndex::from_config(config, build_embedder(&config.embedding)?);
    let report = index.ingest(documents)?;
    print_failures(&report);
    Ok((index, report))
}

fn run_query(args: &QueryArgs, config: &KnowgraphConfig) -> Result<()> {
    let filter = parse_filter(&args.filters)?;
    let documents = load_corpus(&args.corpus.corpus)?;

    let mut retriever = Retriever::from_config(
        args.mode.into(),
        config,
        build_embedder(&config.embedding)?,
    );
    let report = retriever.ingest(documents)?;
    print_failures(&report);

    let k = args.k.unwrap_or(config.query.default_k);
    let mut results = retriever.query(&args.text, k, filter.as_ref())?;
    if let Some(top_k) = args.rerank_top_k(config.query.rerank_top_k) {
        results = retriever.rerank(&args.text, results, top_k)?;
    }
    tracing::info!(
        mode = retriever.kind().as_str(),
        results = results.len(),
        "Query complete"
    );

    println!("{}", serde_json::to_string_pretty(&results)?);
    Ok(())
}

fn run_stats(args: &CorpusArgs, config: &KnowgraphConfig) -> Result<()> {
    let (index, report) = build_graph(args, config)?;
    let output = json!({
        "ingest": report,
        "graph": index.stats(),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn run_snapshot(args: &SnapshotArgs, config: &KnowgraphConfig) -> Result<()> {
    let (mut index, _report) = build_graph(&args.corpus, config)?;
    let snapshot = index.snapshot(args.query.as_deref(), args.max_nodes)?;
    let rendered = snapshot.to_json()?;
    match &args.output {
        Some(path) => {
            write_output(path, &rendered)?;
            tracing::info!(
                path = %path.display(),
                nodes = snapshot.nodes.len(),
                edges = snapshot.edges.len(),
                "Snapshot written"
            );
        }
        None => println!("{}", rendered),
    }
    Ok(())
}

fn run_init(args: &InitArgs, path: &Path) -> Result<()> {
    if path.exists() && !args.force {
        return Err(KnowgraphError::Config(format!(
            "{} already exists, pass --force to overwrite",
            path.display()
        )));
    }
    KnowgraphConfig::default().save(path)
}

fn write_output(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, content)?;
    Ok(())
}

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config.
    let config_file = args.resolve_config_path();
    let config = KnowgraphConfig::load_or_default(&config_file);

    // Tracing.
    let level = args.resolve_log_level(&config.general.log_level);
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&level)),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Starting knowgraph v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(path = %config_file.display(), "Configuration loaded");
    config.validate()?;

    match &args.command {
        Command::Query(query) => run_query(query, &config)?,
        Command::Stats(corpus) => run_stats(corpus, &config)?,
        Command::Snapshot(snapshot) => run_snapshot(snapshot, &config)?,
        Command::Init(init) => run_init(init, &config_file)?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_filter() {
        assert!(parse_filter(&[]).unwrap().is_none());
        let filter = parse_filter(&["lang=en".to_string()]).unwrap().unwrap();
        let mut metadata = knowgraph_core::Metadata::new();
        metadata.insert("lang".to_string(), "en".to_string());
        assert!(filter.matches(&metadata));
        assert!(parse_filter(&["nonsense".to_string()]).is_err());
    }

    #[test]
    fn test_build_embedder() {
        let mut config = EmbeddingConfig::default();
        config.dimensions = 32;
        assert_eq!(build_embedder(&config).unwrap().dimensions(), 32);

        config.provider = "remote".to_string();
        assert!(matches!(build_embedder(&config), Err(KnowgraphError::Config(_))));
    }

    #[test]
    fn test_write_output_creates_parent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("snapshot.json");
        write_output(&path, "{}").unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), "{}");
    }

    #[test]
    fn test_init_writes_loadable_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".knowgraph").join("config.toml");
        run_init(&InitArgs { force: false }, &path).unwrap();
        let loaded = KnowgraphConfig::load(&path).unwrap();
        assert_eq!(loaded.query.rerank_top_k, KnowgraphConfig::default().query.rerank_top_k);

        assert!(matches!(
            run_init(&InitArgs { force: false }, &path),
            Err(KnowgraphError::Config(_))
        ));
        assert!(run_init(&InitArgs { force: true }, &path).is_ok());
    }

    #[test]
    fn test_build_graph_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "Alice met Bob in Paris.").unwrap();
        std::fs::write(dir.path().join("b.txt"), "Bob visited Paris with Carol.").unwrap();

        let corpus = CorpusArgs {
            corpus: dir.path().to_path_buf(),
        };
        let (index, report) = build_graph(&corpus, &KnowgraphConfig::default()).unwrap();
        assert_eq!(report.ingested, 2);
        assert_eq!(index.stats().nodes, 4);
    }
}
