use rayon::prelude::*;

use crate::config::PipelineConfig;
use crate::error::{FaqbotError, Result};

/// Maps text to a fixed-length vector. Implementations are loaded once and shared
/// across requests; the same text must always map to the same vector.
pub trait EmbeddingProvider: Send + Sync {
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|text| self.embed(text)).collect()
    }
}

impl EmbeddingProvider for Box<dyn EmbeddingProvider> {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        (**self).embed(text)
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        (**self).embed_batch(texts)
    }
}

/// Bag-of-tokens feature hashing. Needs no model files, so it backs the CLI and
/// tests; identical texts embed identically and score 1.0 against each other.
#[derive(Debug, Clone)]
pub struct HashEmbeddingProvider {
    dim: usize,
}

impl HashEmbeddingProvider {
    pub fn new(dim: usize) -> Self {
        Self { dim: dim.max(8) }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }
}

impl Default for HashEmbeddingProvider {
    fn default() -> Self {
        Self { dim: 768 }
    }
}

impl EmbeddingProvider for HashEmbeddingProvider {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut v = vec![0.0f32; self.dim];

        for token in text
            .to_ascii_lowercase()
            .split(|c: char| !c.is_ascii_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let mut h: u64 = 1469598103934665603;
            for b in token.as_bytes() {
                h ^= *b as u64;
                h = h.wrapping_mul(1099511628211);
            }
            v[(h as usize) % self.dim] += 1.0;
        }

        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut v {
                *x /= norm;
            }
        }

        Ok(v)
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts.par_iter().map(|text| self.embed(text)).collect()
    }
}

/// Embedder selected by `config`: the transformer model when `model_path` and
/// `tokenizer_path` are both set, the hashing provider when neither is.
pub fn make_embedder(config: &PipelineConfig) -> Result<Box<dyn EmbeddingProvider>> {
    match (&config.model_path, &config.tokenizer_path) {
        (Some(model), Some(tokenizer)) => load_model(model, tokenizer),
        (None, None) => Ok(Box::new(HashEmbeddingProvider::new(config.embedding_dim))),
        _ => Err(FaqbotError::Config(
            "model_path and tokenizer_path must both be set".into(),
        )),
    }
}

#[cfg(feature = "minilm")]
fn load_model(
    model: &std::path::Path,
    tokenizer: &std::path::Path,
) -> Result<Box<dyn EmbeddingProvider>> {
    Ok(Box::new(crate::minilm::MiniLmEmbeddingProvider::load(
        model, tokenizer,
    )?))
}

#[cfg(not(feature = "minilm"))]
fn load_model(
    model: &std::path::Path,
    _tokenizer: &std::path::Path,
) -> Result<Box<dyn EmbeddingProvider>> {
    Err(FaqbotError::Config(format!(
        "cannot load {}: built without the `minilm` feature",
        model.display()
    )))
}
