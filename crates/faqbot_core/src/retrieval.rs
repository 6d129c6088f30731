use tracing::debug;

use crate::embed::EmbeddingProvider;
use crate::error::{FaqbotError, Result};
use crate::model::RankedMatch;

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || b.is_empty() || a.len() != b.len() {
        return 0.0;
    }

    let (dot, na, nb) = a
        .iter()
        .zip(b.iter())
        .fold((0.0f32, 0.0f32, 0.0f32), |(d, aa, bb), (x, y)| {
            (d + (x * y), aa + (x * x), bb + (y * y))
        });

    if na == 0.0 || nb == 0.0 {
        0.0
    } else {
        dot / (na.sqrt() * nb.sqrt())
    }
}

/// Orders scores descending; equal scores keep corpus order.
pub fn order_by_score(scores: impl IntoIterator<Item = f32>) -> Vec<RankedMatch> {
    let mut ranked: Vec<RankedMatch> = scores
        .into_iter()
        .enumerate()
        .map(|(index, score)| RankedMatch { index, score })
        .collect();
    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
    ranked
}

/// Top entry of an already ranked list, if it reaches `threshold`.
pub fn best_of(ranked: &[RankedMatch], threshold: f32) -> Option<RankedMatch> {
    ranked.first().copied().filter(|m| m.score >= threshold)
}

pub fn first_k(ranked: &[RankedMatch], k: usize) -> Vec<RankedMatch> {
    ranked.iter().take(k).copied().collect()
}

pub trait Ranker: Send + Sync {
    /// Every corpus entry, by descending similarity to `query`.
    fn rank(&self, query: &str, corpus: &[String]) -> Result<Vec<RankedMatch>>;

    fn best_match(
        &self,
        query: &str,
        corpus: &[String],
        threshold: f32,
    ) -> Result<Option<RankedMatch>> {
        Ok(best_of(&self.rank(query, corpus)?, threshold))
    }

    fn top_k(&self, query: &str, corpus: &[String], k: usize) -> Result<Vec<RankedMatch>> {
        let mut ranked = self.rank(query, corpus)?;
        ranked.truncate(k);
        Ok(ranked)
    }
}

/// Cosine similarity over vectors from an [`EmbeddingProvider`]. The query is embedded
/// once and the corpus in a single batch per call.
#[derive(Debug, Clone)]
pub struct SemanticRanker<E> {
    embedder: E,
}

impl<E: EmbeddingProvider> SemanticRanker<E> {
    pub fn new(embedder: E) -> Self {
        Self { embedder }
    }

    pub fn embedder(&self) -> &E {
        &self.embedder
    }
}

impl<E: EmbeddingProvider> Ranker for SemanticRanker<E> {
    fn rank(&self, query: &str, corpus: &[String]) -> Result<Vec<RankedMatch>> {
        if corpus.is_empty() {
            return Ok(Vec::new());
        }

        let query_embedding = self.embedder.embed(query)?;
        let corpus_embeddings = self.embedder.embed_batch(corpus)?;
        if corpus_embeddings.len() != corpus.len() {
            return Err(FaqbotError::EmbeddingOracleFailure(format!(
                "expected {} corpus vectors, got {}",
                corpus.len(),
                corpus_embeddings.len()
            )));
        }
        if let Some(bad) = corpus_embeddings
            .iter()
            .find(|v| v.len() != query_embedding.len())
        {
            return Err(FaqbotError::EmbeddingOracleFailure(format!(
                "dimension mismatch: query has {}, corpus entry has {}",
                query_embedding.len(),
                bad.len()
            )));
        }

        let scores: Vec<f32> = corpus_embeddings
            .iter()
            .map(|v| cosine_similarity(&query_embedding, v))
            .collect();
        if let Some(index) = scores.iter().position(|s| !s.is_finite()) {
            return Err(FaqbotError::EmbeddingOracleFailure(format!(
                "non-finite similarity for corpus entry {index}"
            )));
        }

        let ranked = order_by_score(scores);
        debug!(
            query,
            candidates = ranked.len(),
            top_score = ranked.first().map(|m| m.score),
            "ranked corpus"
        );
        Ok(ranked)
    }
}
