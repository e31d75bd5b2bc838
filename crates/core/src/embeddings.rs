use crate::error::EmbeddingError;
use tracing::warn;

const DEFAULT: usize = 128;

pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = DEFAULT;

/// Longest input, in characters, handed to an embedding backend. Longer
/// input is truncated with a warning rather than rejected.
pub const DEFAULT_MAX_INPUT_CHARS: usize = 2_000;

/// Maps text to a fixed-length vector. Vectors are only comparable when they
/// come from embedders reporting the same `model_id`.
pub trait TextEmbedder: Send + Sync {
    fn model_id(&self) -> &str;

    fn dimensions(&self) -> usize;

    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        texts.iter().map(|text| self.embed(text)).collect()
    }
}

/// Cuts `text` to at most `max_chars` characters, logging when it does.
pub fn truncate_for_model<'a>(text: &'a str, max_chars: usize, model_id: &str) -> &'a str {
    match text.char_indices().nth(max_chars) {
        Some((byte_end, _)) => {
            warn!(
                model = model_id,
                max_chars,
                original_chars = text.chars().count(),
                "embedding input truncated"
            );
            &text[..byte_end]
        }
        None => text,
    }
}

/// Hashed character-trigram embedder. Deterministic and needs no model files.
#[derive(Debug, Clone, Copy)]
pub struct CharacterNgramEmbedder {
    pub dimensions: usize,
    pub max_input_chars: usize,
}

impl Default for CharacterNgramEmbedder {
    fn default() -> Self {
        Self {
            dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
            max_input_chars: DEFAULT_MAX_INPUT_CHARS,
        }
    }
}

impl CharacterNgramEmbedder {
    fn vectorize(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0f32; self.dimensions.max(1)];
        let lowered = text.to_lowercase();
        let chars: Vec<char> = lowered.chars().collect();

        if chars.is_empty() {
            return vector;
        }

        for window in chars.windows(3) {
            let token = window.iter().collect::<String>();
            let mut hash = 1469598103934665603u64;
            for byte in token.bytes() {
                hash ^= byte as u64;
                hash = hash.wrapping_mul(1099511628211);
            }
            let bucket = (hash % vector.len() as u64) as usize;
            vector[bucket] += 1.0;
        }

        let magnitude = vector.iter().map(|value| value * value).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for value in &mut vector {
                *value /= magnitude;
            }
        }

        vector
    }
}

impl TextEmbedder for CharacterNgramEmbedder {
    fn model_id(&self) -> &str {
        "char-trigram-fnv"
    }

    fn dimensions(&self) -> usize {
        self.dimensions.max(1)
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let text = truncate_for_model(text, self.max_input_chars, self.model_id());
        Ok(self.vectorize(text))
    }
}

#[cfg(feature = "fastembed")]
pub use local::FastEmbedEmbedder;

#[cfg(feature = "fastembed")]
mod local {
    use super::{truncate_for_model, TextEmbedder, DEFAULT_MAX_INPUT_CHARS};
    use crate::error::EmbeddingError;
    use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
    use std::path::PathBuf;
    use std::sync::Mutex;

    fn resolve_model(name: &str) -> Result<EmbeddingModel, EmbeddingError> {
        match name {
            "all-minilm-l6-v2" | "AllMiniLML6V2" => Ok(EmbeddingModel::AllMiniLML6V2),
            "bge-small-en-v1.5" | "BGESmallENV15" => Ok(EmbeddingModel::BGESmallENV15),
            other => Err(EmbeddingError::Unavailable(format!(
                "unknown embedding model '{other}', supported: all-minilm-l6-v2, bge-small-en-v1.5"
            ))),
        }
    }

    /// Sentence-transformer embeddings computed locally through ONNX runtime.
    pub struct FastEmbedEmbedder {
        model: Mutex<TextEmbedding>,
        model_id: String,
        dimensions: usize,
        max_input_chars: usize,
    }

    impl FastEmbedEmbedder {
        pub fn new(model_name: &str, cache_dir: Option<PathBuf>) -> Result<Self, EmbeddingError> {
            let mut init = InitOptions::new(resolve_model(model_name)?);
            if let Some(dir) = cache_dir {
                init = init.with_cache_dir(dir);
            }

            let model = TextEmbedding::try_new(init)
                .map_err(|error| EmbeddingError::Unavailable(error.to_string()))?;

            let probe = model
                .embed(vec!["dimension probe"], None)
                .map_err(|error| EmbeddingError::Unavailable(error.to_string()))?;
            let dimensions = probe
                .first()
                .map(Vec::len)
                .ok_or_else(|| EmbeddingError::Unavailable("empty probe embedding".to_string()))?;

            Ok(Self {
                model: Mutex::new(model),
                model_id: model_name.to_string(),
                dimensions,
                max_input_chars: DEFAULT_MAX_INPUT_CHARS,
            })
        }

        pub fn with_max_input_chars(mut self, max_input_chars: usize) -> Self {
            self.max_input_chars = max_input_chars;
            self
        }
    }

    impl TextEmbedder for FastEmbedEmbedder {
        fn model_id(&self) -> &str {
            &self.model_id
        }

        fn dimensions(&self) -> usize {
            self.dimensions
        }

        fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
            self.embed_batch(&[text])?
                .into_iter()
                .next()
                .ok_or_else(|| EmbeddingError::Backend("no embedding returned".to_string()))
        }

        fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            let inputs: Vec<String> = texts
                .iter()
                .map(|text| truncate_for_model(text, self.max_input_chars, &self.model_id).to_string())
                .collect();

            let model = self
                .model
                .lock()
                .map_err(|error| EmbeddingError::Backend(format!("model lock poisoned: {error}")))?;
            let vectors = model
                .embed(inputs, None)
                .map_err(|error| EmbeddingError::Backend(error.to_string()))?;

            if let Some(bad) = vectors.iter().find(|vector| vector.len() != self.dimensions) {
                return Err(EmbeddingError::DimensionMismatch {
                    expected: self.dimensions,
                    actual: bad.len(),
                });
            }
            Ok(vectors)
        }
    }

}
