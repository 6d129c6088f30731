use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use faqbot_core::DEFAULT_REQUIRED_PASS_RATE;

#[derive(Debug, Parser)]
#[command(name = "faqbot", version, about = "Answer student questions from a curated FAQ set")]
pub struct Cli {
    /// TOML file with pipeline settings.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// JSON knowledge store; overrides `store_path` from the config file.
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,

    /// Direct-hit threshold; overrides the config file.
    #[arg(long, global = true)]
    pub threshold: Option<f32>,

    /// Safetensors weights of a sentence-embedding model (needs --tokenizer-path).
    #[arg(long, global = true)]
    pub model_path: Option<PathBuf>,

    /// tokenizer.json matching --model-path.
    #[arg(long, global = true)]
    pub tokenizer_path: Option<PathBuf>,

    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Answer a question and record it in the query log.
    Chat { query: String },
    /// Show how every FAQ scores against a question.
    Scores { query: String },
    /// List questions to offer as conversation starters.
    Suggest {
        #[arg(long, default_value_t = 5)]
        limit: usize,
    },
    /// Print the query log.
    Logs,
    /// Exchange admin credentials for a token.
    Login {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
    },
    /// Manage FAQ entries.
    #[command(subcommand)]
    Faq(FaqCommand),
    /// Import FAQs from a JSONL or `question | answer` file.
    Seed {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        token: Option<String>,
    },
    /// Run labelled cases through the pipeline.
    Eval {
        #[arg(long)]
        cases: PathBuf,
        #[arg(long, default_value_t = DEFAULT_REQUIRED_PASS_RATE)]
        min_pass_rate: f32,
    },
}

#[derive(Debug, Subcommand)]
pub enum FaqCommand {
    /// Print every FAQ in store order.
    List,
    /// Add a question and its answer.
    Add {
        #[arg(long)]
        question: String,
        #[arg(long)]
        answer: String,
        #[arg(long)]
        token: Option<String>,
    },
    /// Replace the question and/or answer of an existing FAQ.
    Update {
        id: String,
        #[arg(long)]
        question: Option<String>,
        #[arg(long)]
        answer: Option<String>,
        #[arg(long)]
        token: Option<String>,
    },
    /// Remove a FAQ by id.
    Delete {
        id: String,
        #[arg(long)]
        token: Option<String>,
    },
}
