//! ONNX Runtime-backed sentence-transformer embeddings.

use std::path::Path;
use std::sync::Mutex;

use ort::session::Session;
use ort::value::TensorRef;
use tokenizers::Tokenizer;
use tracing::info;

use crate::embedding::EmbeddingProvider;
use crate::error::EmbeddingError;
use crate::similarity::normalize;

/// Embedding provider running a sentence-transformer model (e.g.
/// all-MiniLM-L6-v2) through ONNX Runtime.
///
/// Expects a model directory containing:
/// - `model.onnx`: the sentence-transformer ONNX export
/// - `tokenizer.json`: the HuggingFace fast-tokenizer file
///
/// The model should accept `input_ids`, `attention_mask`, and
/// `token_type_ids` as i64 inputs and produce token-level embeddings.
/// Masked mean pooling produces a single vector per input.
pub struct OnnxEmbeddingProvider {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
    dimensions: usize,
}

impl std::fmt::Debug for OnnxEmbeddingProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxEmbeddingProvider")
            .field("dimensions", &self.dimensions)
            .finish()
    }
}

impl OnnxEmbeddingProvider {
    /// Load a sentence-transformer model from the given directory.
    pub fn from_directory(model_dir: &Path) -> Result<Self, EmbeddingError> {
        Self::from_files(
            &model_dir.join("model.onnx"),
            &model_dir.join("tokenizer.json"),
        )
    }

    /// Load from explicit model and tokenizer file paths.
    pub fn from_files(model_path: &Path, tokenizer_path: &Path) -> Result<Self, EmbeddingError> {
        if !model_path.exists() {
            return Err(EmbeddingError::ModelUnavailable(format!(
                "ONNX model not found at {}",
                model_path.display()
            )));
        }
        if !tokenizer_path.exists() {
            return Err(EmbeddingError::ModelUnavailable(format!(
                "tokenizer not found at {}",
                tokenizer_path.display()
            )));
        }

        let session = Session::builder()
            .map_err(|e| EmbeddingError::ModelUnavailable(format!("session builder: {}", e)))?
            .with_intra_threads(1)
            .map_err(|e| EmbeddingError::ModelUnavailable(format!("set threads: {}", e)))?
            .commit_from_file(model_path)
            .map_err(|e| EmbeddingError::ModelUnavailable(format!("load model: {}", e)))?;

        // Output is [batch, seq_len, hidden_dim]; fall back to MiniLM's 384.
        let dimensions = session
            .outputs()
            .first()
            .and_then(|out| out.dtype().tensor_shape())
            .and_then(|shape| shape.last().copied())
            .map(|d| if d > 0 { d as usize } else { 384 })
            .unwrap_or(384);

        let tokenizer = Tokenizer::from_file(tokenizer_path)
            .map_err(|e| EmbeddingError::ModelUnavailable(format!("load tokenizer: {}", e)))?;

        info!(
            model = %model_path.display(),
            dimensions,
            "Loaded ONNX embedding model"
        );

        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
            dimensions,
        })
    }
}

impl EmbeddingProvider for OnnxEmbeddingProvider {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if text.is_empty() {
            return Err(EmbeddingError::EmptyInput);
        }

        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| EmbeddingError::Inference(format!("tokenization: {}", e)))?;

        let input_ids: Vec<i64> = encoding.get_ids().iter().map(|&id| id as i64).collect();
        let attention_mask: Vec<i64> = encoding
            .get_attention_mask()
            .iter()
            .map(|&m| m as i64)
            .collect();
        let token_type_ids: Vec<i64> = encoding.get_type_ids().iter().map(|&t| t as i64).collect();
        let seq_len = input_ids.len();

        let to_array = |values: Vec<i64>, name: &str| {
            ndarray::Array2::from_shape_vec((1, seq_len), values)
                .map_err(|e| EmbeddingError::Inference(format!("{} array: {}", name, e)))
        };
        let ids_array = to_array(input_ids, "input_ids")?;
        let mask_array = to_array(attention_mask.clone(), "attention_mask")?;
        let type_array = to_array(token_type_ids, "token_type_ids")?;

        let ids_ref = TensorRef::from_array_view(&ids_array)
            .map_err(|e| EmbeddingError::Inference(format!("input_ids tensor: {}", e)))?;
        let mask_ref = TensorRef::from_array_view(&mask_array)
            .map_err(|e| EmbeddingError::Inference(format!("attention_mask tensor: {}", e)))?;
        let type_ref = TensorRef::from_array_view(&type_array)
            .map_err(|e| EmbeddingError::Inference(format!("token_type_ids tensor: {}", e)))?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| EmbeddingError::Inference(format!("session lock poisoned: {}", e)))?;
        let outputs = session
            .run(ort::inputs![ids_ref, mask_ref, type_ref])
            .map_err(|e| EmbeddingError::Inference(format!("ONNX inference: {}", e)))?;

        let (shape, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| EmbeddingError::Inference(format!("extract embeddings: {}", e)))?;

        let hidden_dim = match shape.iter().copied().collect::<Vec<i64>>().as_slice() {
            [.., _, last] => *last as usize,
            other => {
                return Err(EmbeddingError::Inference(format!(
                    "unexpected output shape: {:?}",
                    other
                )))
            }
        };
        if hidden_dim != self.dimensions {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.dimensions,
                actual: hidden_dim,
            });
        }

        // Mean pooling over the sequence, masked by attention_mask.
        let mut pooled = vec![0.0f32; hidden_dim];
        let mut count = 0.0f32;
        for (tok_idx, &mask_val) in attention_mask.iter().enumerate() {
            if mask_val > 0 {
                let offset = tok_idx * hidden_dim;
                for (dim, slot) in pooled.iter_mut().enumerate() {
                    *slot += data[offset + dim];
                }
                count += 1.0;
            }
        }
        if count > 0.0 {
            for val in &mut pooled {
                *val /= count;
            }
        }

        Ok(normalize(pooled))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
