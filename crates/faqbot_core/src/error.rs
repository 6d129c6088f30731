use std::io;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FaqbotError {
    #[error("knowledge store unavailable: {0}")]
    KnowledgeStoreUnavailable(String),

    #[error("embedding oracle failure: {0}")]
    EmbeddingOracleFailure(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, FaqbotError>;
