//! CLI argument definitions for the knowgraph binary.
//!
//! Uses `clap` with derive macros for ergonomic argument parsing.
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use knowgraph_graph::RetrieverKind;

/// knowgraph - build a knowledge graph from a corpus and query it.
#[derive(Parser, Debug)]
#[command(name = "knowgraph", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Ingest a corpus and print the documents retrieved for a query.
    Query(QueryArgs),
    /// Ingest a corpus and print graph statistics.
    Stats(CorpusArgs),
    /// Ingest a corpus and export a graph snapshot.
    Snapshot(SnapshotArgs),
    /// Write a default configuration file to the config path.
    Init(InitArgs),
}

#[derive(Args, Debug)]
pub struct CorpusArgs {
    /// JSONL file of documents, or a directory of .txt/.md files.
    #[arg(long = "corpus")]
    pub corpus: PathBuf,
}

#[derive(Args, Debug)]
pub struct QueryArgs {
    #[command(flatten)]
    pub corpus: CorpusArgs,

    /// Number of documents to return (defaults to `query.default_k`).
    #[arg(short = 'k')]
    pub k: Option<usize>,

    /// Metadata condition `key=value`; repeat to require several.
    #[arg(long = "filter")]
    pub filters: Vec<String>,

    /// Retrieval strategy.
    #[arg(long = "mode", value_enum, default_value_t = Mode::Graph)]
    pub mode: Mode,

    /// Rerank the results, keeping this many (defaults to `query.rerank_top_k`).
    #[arg(long = "rerank", num_args = 0..=1)]
    pub rerank: Option<Option<usize>>,

    /// Query text.
    pub text: String,
}

#[derive(Args, Debug)]
pub struct SnapshotArgs {
    #[command(flatten)]
    pub corpus: CorpusArgs,

    /// Highlight nodes relative to this query.
    #[arg(long = "query")]
    pub query: Option<String>,

    /// Maximum number of nodes to export.
    #[arg(long = "max-nodes", default_value_t = 50)]
    pub max_nodes: usize,

    /// Write JSON here instead of stdout.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Overwrite an existing configuration file.
    #[arg(long = "force")]
    pub force: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Graph,
    Vector,
    Hybrid,
}

impl From<Mode> for RetrieverKind {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Graph => RetrieverKind::Graph,
            Mode::Vector => RetrieverKind::Vector,
            Mode::Hybrid => RetrieverKind::Hybrid,
        }
    }
}

impl QueryArgs {
    /// How many results to keep after reranking, or `None` to skip reranking.
    ///
    /// Priority: --rerank value > config file value.
    pub fn rerank_top_k(&self, config_top_k: usize) -> Option<usize> {
        self.rerank.map(|top_k| top_k.unwrap_or(config_top_k))
    }
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > KNOWGRAPH_CONFIG env var > platform default (~/.knowgraph/config.toml).
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("KNOWGRAPH_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Resolve the log level.
    ///
    /// Priority: --log-level flag > config file value.
    pub fn resolve_log_level(&self, config_level: &str) -> String {
        self.log_level
            .clone()
            .unwrap_or_else(|| config_level.to_string())
    }
}

/// Default config file path for the current platform.
fn default_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    if let Ok(home) = std::env::var("USERPROFILE") {
        return PathBuf::from(home).join(".knowgraph").join("config.toml");
    }
    #[cfg(not(target_os = "windows"))]
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".knowgraph").join("config.toml");
    }
    PathBuf::from("config.toml")
}
