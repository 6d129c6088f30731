use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{FaqbotError, Result};
use crate::greeting::default_greetings;
use crate::normalize::DEFAULT_CUSTOM_WORDS;
use crate::policy::{DEFAULT_SUGGESTION_COUNT, DEFAULT_SUGGESTION_FLOOR, DEFAULT_THRESHOLD};

pub const DEFAULT_EMBEDDING_DIM: usize = 768;
pub const DEFAULT_STORE_PATH: &str = "data/db.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Minimum score for a direct hit.
    pub threshold: f32,
    pub suggestion_count: usize,
    /// Suggestions must score strictly above this.
    pub suggestion_floor: f32,
    pub greetings: BTreeMap<String, String>,
    pub custom_words: Vec<String>,
    pub dictionary_path: Option<PathBuf>,
    /// Vector length of the hashing embedder; a loaded model sets its own.
    pub embedding_dim: usize,
    /// Safetensors weights of a sentence-embedding model. Set together with
    /// `tokenizer_path`; when both are unset the hashing embedder is used.
    pub model_path: Option<PathBuf>,
    pub tokenizer_path: Option<PathBuf>,
    pub store_path: PathBuf,
    pub admin_username: String,
    pub admin_password: String,
    pub admin_token: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            suggestion_count: DEFAULT_SUGGESTION_COUNT,
            suggestion_floor: DEFAULT_SUGGESTION_FLOOR,
            greetings: default_greetings(),
            custom_words: DEFAULT_CUSTOM_WORDS.iter().map(|w| w.to_string()).collect(),
            dictionary_path: None,
            embedding_dim: DEFAULT_EMBEDDING_DIM,
            model_path: None,
            tokenizer_path: None,
            store_path: PathBuf::from(DEFAULT_STORE_PATH),
            admin_username: "admin".into(),
            admin_password: "admin123".into(),
            admin_token: "faqbot-admin-token".into(),
        }
    }
}

impl PipelineConfig {
    /// Reads a TOML file; a missing path yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => {
                let contents = fs::read_to_string(path).map_err(|err| {
                    FaqbotError::Config(format!("read {}: {err}", path.display()))
                })?;
                Self::from_toml(&contents)?
            }
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|err| FaqbotError::Config(err.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        if !(-1.0..=1.0).contains(&self.threshold) {
            return Err(FaqbotError::Config(format!(
                "threshold must be within [-1, 1], got {}",
                self.threshold
            )));
        }
        if !(-1.0..=1.0).contains(&self.suggestion_floor) {
            return Err(FaqbotError::Config(format!(
                "suggestion_floor must be within [-1, 1], got {}",
                self.suggestion_floor
            )));
        }
        if self.suggestion_count == 0 {
            return Err(FaqbotError::Config("suggestion_count must be >= 1".into()));
        }
        if self.embedding_dim < 8 {
            return Err(FaqbotError::Config("embedding_dim must be >= 8".into()));
        }
        Ok(())
    }
}
