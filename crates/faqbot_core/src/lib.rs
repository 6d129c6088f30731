pub mod admin;
pub mod config;
pub mod embed;
pub mod error;
pub mod eval;
pub mod greeting;
pub mod logger;
#[cfg(feature = "minilm")]
pub mod minilm;
pub mod model;
pub mod normalize;
pub mod pipeline;
pub mod policy;
pub mod retrieval;
pub mod seed;
pub mod store;

pub use admin::AdminGateway;
pub use config::{PipelineConfig, DEFAULT_EMBEDDING_DIM, DEFAULT_STORE_PATH};
pub use embed::{make_embedder, EmbeddingProvider, HashEmbeddingProvider};
pub use error::{FaqbotError, Result};
pub use eval::{
    evaluate_cases, read_eval_cases, CaseExpectation, EvalCase, EvalOutcome, EvalSummary,
    DEFAULT_REQUIRED_PASS_RATE,
};
pub use greeting::{default_greetings, GreetingTable};
pub use logger::QueryLogger;
#[cfg(feature = "minilm")]
pub use minilm::MiniLmEmbeddingProvider;
pub use model::{FaqPatch, FaqRecord, Outcome, QueryLogEntry, RankedMatch, Resolution};
pub use normalize::{SpellCorrector, DEFAULT_CUSTOM_WORDS};
pub use pipeline::{QueryPipeline, ScoredFaq};
pub use policy::{
    ResolutionPolicy, DEFAULT_SUGGESTION_COUNT, DEFAULT_SUGGESTION_FLOOR, DEFAULT_THRESHOLD,
};
pub use retrieval::{cosine_similarity, Ranker, SemanticRanker};
pub use seed::{read_seed_file, seed_store, SeedFaq, SeedReport};
pub use store::{suggested_questions, JsonFileStore, KnowledgeStore, MemoryStore};
