//! Corpus loading: JSONL records or a directory of text files.

use std::path::Path;

use tracing::info;

use knowgraph_core::{Document, DocumentInput, KnowgraphError, Result};

const TEXT_EXTENSIONS: [&str; 2] = ["txt", "md"];

/// Load every document under `path`.
///
/// A directory yields one document per `.txt` / `.md` file, in file-name
/// order, with the file name as `source`. Any other path is read as JSON
/// Lines, one [`DocumentInput`] per non-blank line.
pub fn load_corpus(path: &Path) -> Result<Vec<Document>> {
    let documents = if path.is_dir() {
        load_directory(path)?
    } else {
        load_jsonl(&std::fs::read_to_string(path)?)?
    };
    info!(path = %path.display(), documents = documents.len(), "Corpus loaded");
    Ok(documents)
}

fn load_directory(dir: &Path) -> Result<Vec<Document>> {
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_text = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| TEXT_EXTENSIONS.contains(&e));
        if path.is_file() && is_text {
            paths.push(path);
        }
    }
    paths.sort();

    let mut documents = Vec::with_capacity(paths.len());
    for path in paths {
        let text = std::fs::read_to_string(&path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        documents.push(Document::new(text).with_source(name));
    }
    Ok(documents)
}

fn load_jsonl(content: &str) -> Result<Vec<Document>> {
    let mut inputs = Vec::new();
    for (line_number, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let input: DocumentInput = serde_json::from_str(line).map_err(|e| {
            KnowgraphError::Serialization(format!("line {}: {}", line_number + 1, e))
        })?;
        inputs.push(input);
    }
    inputs
        .into_iter()
        .enumerate()
        .map(|(index, input)| input.into_document(index))
        .collect()
}
