use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{FaqbotError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaqRecord {
    pub id: String,
    pub question: String,
    pub answer: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FaqRecord {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            question: question.into(),
            answer: answer.into(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Rejects a blank question or answer.
    pub fn validate(&self) -> Result<()> {
        require_text("question", &self.question)?;
        require_text("answer", &self.answer)
    }

    /// Text this record contributes to a ranking corpus.
    pub fn corpus_text(&self) -> String {
        format!("{} {}", self.question, self.answer)
    }
}

/// Partial update applied by `KnowledgeStore::update_faq`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FaqPatch {
    pub question: Option<String>,
    pub answer: Option<String>,
}

impl FaqPatch {
    pub fn is_empty(&self) -> bool {
        self.question.is_none() && self.answer.is_none()
    }

    /// An empty patch, or a field set to blank text, is `InvalidInput`.
    pub fn validate(&self) -> Result<()> {
        if self.is_empty() {
            return Err(FaqbotError::InvalidInput(
                "update needs a question or an answer".into(),
            ));
        }
        if let Some(question) = &self.question {
            require_text("question", question)?;
        }
        if let Some(answer) = &self.answer {
            require_text("answer", answer)?;
        }
        Ok(())
    }

    pub fn apply(&self, record: &mut FaqRecord) {
        if let Some(question) = &self.question {
            record.question = question.clone();
        }
        if let Some(answer) = &self.answer {
            record.answer = answer.clone();
        }
        record.updated_at = Utc::now();
    }
}

fn require_text(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(FaqbotError::InvalidInput(format!("{field} must not be blank")));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryLogEntry {
    pub id: String,
    pub query: String,
    pub response: String,
    pub score: f32,
    pub timestamp: DateTime<Utc>,
}

impl QueryLogEntry {
    pub fn new(query: impl Into<String>, response: impl Into<String>, score: f32) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            query: query.into(),
            response: response.into(),
            score,
            timestamp: Utc::now(),
        }
    }
}

/// Position into the corpus snapshot a ranking was computed over, with its score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankedMatch {
    pub index: usize,
    pub score: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Greeting,
    EmptyKnowledge,
    DirectHit,
    Suggestions,
    NoMatch,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    pub answer: String,
    pub confidence: f32,
    pub outcome: Outcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub faq_id: Option<String>,
}

impl Resolution {
    pub fn new(answer: impl Into<String>, confidence: f32, outcome: Outcome) -> Self {
        Self {
            answer: answer.into(),
            confidence: confidence.clamp(0.0, 1.0),
            outcome,
            faq_id: None,
        }
    }

    pub fn with_faq_id(mut self, id: impl Into<String>) -> Self {
        self.faq_id = Some(id.into());
        self
    }
}
