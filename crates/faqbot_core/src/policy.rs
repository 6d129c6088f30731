use tracing::info;

use crate::config::PipelineConfig;
use crate::error::{FaqbotError, Result};
use crate::model::{FaqRecord, Outcome, Resolution};
use crate::retrieval::{best_of, first_k, Ranker};

pub const DEFAULT_THRESHOLD: f32 = 0.65;
pub const DEFAULT_SUGGESTION_COUNT: usize = 3;
pub const DEFAULT_SUGGESTION_FLOOR: f32 = 0.1;

pub const EMPTY_KNOWLEDGE_ANSWER: &str =
    "Sorry, I don't have enough knowledge to answer that yet.";
pub const SUGGESTION_PREAMBLE: &str = "I'm not 100% sure, but did you mean one of these?";
pub const NO_MATCH_ANSWER: &str =
    "Sorry, I couldn't find any answer related to that. Can you try rephrasing?";

/// FAQ a ranker index points at; an index outside the snapshot is an oracle fault.
pub(crate) fn faq_at(faqs: &[FaqRecord], index: usize) -> Result<&FaqRecord> {
    faqs.get(index).ok_or_else(|| {
        FaqbotError::EmbeddingOracleFailure(format!(
            "ranker returned index {index} for {} faqs",
            faqs.len()
        ))
    })
}

/// Chooses between a direct answer, suggestions and an apology from ranked FAQs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolutionPolicy {
    pub threshold: f32,
    pub suggestion_count: usize,
    pub suggestion_floor: f32,
}

impl Default for ResolutionPolicy {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            suggestion_count: DEFAULT_SUGGESTION_COUNT,
            suggestion_floor: DEFAULT_SUGGESTION_FLOOR,
        }
    }
}

impl ResolutionPolicy {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            threshold: config.threshold,
            suggestion_count: config.suggestion_count,
            suggestion_floor: config.suggestion_floor,
        }
    }

    /// Resolves `query` against one snapshot of `faqs`. The corpus is built from
    /// that snapshot and indexes returned by the ranker refer back into it.
    pub fn resolve<R>(&self, ranker: &R, query: &str, faqs: &[FaqRecord]) -> Result<Resolution>
    where
        R: Ranker + ?Sized,
    {
        if faqs.is_empty() {
            return Ok(Resolution::new(
                EMPTY_KNOWLEDGE_ANSWER,
                0.0,
                Outcome::EmptyKnowledge,
            ));
        }

        let corpus: Vec<String> = faqs.iter().map(FaqRecord::corpus_text).collect();
        let ranked = ranker.rank(query, &corpus)?;

        if let Some(hit) = best_of(&ranked, self.threshold) {
            let faq = faq_at(faqs, hit.index)?;
            info!(faq_id = %faq.id, score = hit.score, "direct hit");
            return Ok(
                Resolution::new(faq.answer.clone(), hit.score, Outcome::DirectHit)
                    .with_faq_id(faq.id.clone()),
            );
        }

        let suggestions: Vec<_> = first_k(&ranked, self.suggestion_count)
            .into_iter()
            .filter(|m| m.score > self.suggestion_floor)
            .collect();

        let Some(top) = suggestions.first() else {
            info!("no suggestion above floor");
            return Ok(Resolution::new(NO_MATCH_ANSWER, 0.0, Outcome::NoMatch));
        };

        let list = suggestions
            .iter()
            .map(|m| faq_at(faqs, m.index).map(|faq| format!("- {}", faq.question)))
            .collect::<Result<Vec<_>>>()?
            .join("\n");
        info!(
            suggestions = suggestions.len(),
            score = top.score,
            "fallback suggestions"
        );
        Ok(Resolution::new(
            format!("{SUGGESTION_PREAMBLE}\n\n{list}"),
            top.score,
            Outcome::Suggestions,
        ))
    }
}
