//! Sentence embedding backends

use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use tracing::info;

use crate::config::EmbeddingConfig;
use crate::types::{AppError, AppResult};

/// Dimension used by the hashing embedder, matching MiniLM's output size
pub const HASHING_DIMENSION: usize = 384;

pub trait Embedder: Send + Sync {
    /// Embed each text, preserving order
    fn embed(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>>;

    fn dimension(&self) -> usize;

    fn name(&self) -> &str;

    fn embed_one(&self, text: &str) -> AppResult<Vec<f32>> {
        self.embed(&[text.to_string()])?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Embedding("Embedder returned no vector".to_string()))
    }
}

/// Local ONNX sentence-transformer model
pub struct FastEmbedder {
    model: TextEmbedding,
    name: String,
    dimension: usize,
}

impl FastEmbedder {
    pub fn new(name: &str, config: &EmbeddingConfig) -> AppResult<Self> {
        let (model_kind, dimension) = Self::resolve(name)?;

        info!(model = name, cache_dir = %config.cache_dir.display(), "Loading embedding model");
        let options = InitOptions::new(model_kind)
            .with_cache_dir(config.cache_dir.clone())
            .with_show_download_progress(true);
        let model = TextEmbedding::try_new(options)
            .map_err(|e| AppError::Embedding(format!("Failed to load {}: {}", name, e)))?;

        Ok(Self {
            model,
            name: name.to_string(),
            dimension,
        })
    }

    fn resolve(name: &str) -> AppResult<(EmbeddingModel, usize)> {
        let normalized = name.trim().to_ascii_lowercase();
        let normalized = normalized
            .strip_prefix("sentence-transformers/")
            .or_else(|| normalized.strip_prefix("baai/"))
            .unwrap_or(&normalized);
        match normalized {
            "all-minilm-l6-v2" => Ok((EmbeddingModel::AllMiniLML6V2, 384)),
            "bge-small-en-v1.5" => Ok((EmbeddingModel::BGESmallENV15, 384)),
            "bge-base-en-v1.5" => Ok((EmbeddingModel::BGEBaseENV15, 768)),
            _ => Err(AppError::Config(format!("Unknown embedding model: {}", name))),
        }
    }
}

impl Embedder for FastEmbedder {
    fn embed(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        self.model
            .embed(texts.to_vec(), None)
            .map_err(|e| AppError::Embedding(e.to_string()))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Offline bag-of-words embedder using feature hashing.
///
/// Vectors are L2-normalised, so squared Euclidean distance ranks the same
/// way cosine similarity does.
pub struct HashingEmbedder {
    dimension: usize,
}

impl HashingEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    fn bucket(token: &str, dimension: usize) -> usize {
        // FNV-1a
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in token.bytes() {
            hash ^= byte as u64;
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
        (hash % dimension as u64) as usize
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let token = token.to_lowercase();
            vector[Self::bucket(&token, self.dimension)] += 1.0;
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|v| *v /= norm);
        }
        vector
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(HASHING_DIMENSION)
    }
}

impl Embedder for HashingEmbedder {
    fn embed(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        "hashing"
    }
}

/// Pick the embedding backend named in the configuration
pub fn embedder_from_config(config: &EmbeddingConfig) -> AppResult<Box<dyn Embedder>> {
    match config.model.trim().to_ascii_lowercase().as_str() {
        "hashing" => Ok(Box::new(HashingEmbedder::default())),
        _ => Ok(Box::new(FastEmbedder::new(&config.model, config)?)),
    }
}
