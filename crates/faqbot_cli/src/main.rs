mod cli;
mod output;

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use faqbot_core::{
    evaluate_cases, read_eval_cases, read_seed_file, seed_store, suggested_questions,
    AdminGateway, FaqPatch, FaqRecord, FaqbotError, JsonFileStore, KnowledgeStore,
    PipelineConfig, QueryPipeline,
};
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands, FaqCommand};

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .ok();
}

fn load_config(cli: &Cli) -> Result<PipelineConfig> {
    let mut config = PipelineConfig::load(cli.config.as_deref()).context("load config")?;
    if let Some(store) = &cli.store {
        config.store_path = store.clone();
    }
    if let Some(threshold) = cli.threshold {
        config.threshold = threshold;
    }
    if let Some(model_path) = &cli.model_path {
        config.model_path = Some(model_path.clone());
    }
    if let Some(tokenizer_path) = &cli.tokenizer_path {
        config.tokenizer_path = Some(tokenizer_path.clone());
    }
    config.validate()?;
    Ok(config)
}

fn open_store(config: &PipelineConfig) -> Result<Arc<dyn KnowledgeStore>> {
    let store = JsonFileStore::open(&config.store_path).context("open knowledge store")?;
    Ok(Arc::new(store))
}

fn build_pipeline(config: &PipelineConfig) -> Result<QueryPipeline> {
    QueryPipeline::from_config(config, open_store(config)?).context("build query pipeline")
}

fn authorize(gateway: &AdminGateway, token: Option<&str>) -> Result<()> {
    gateway
        .authorize(token)
        .context("admin token required for FAQ changes (pass --token)")
}

fn run_faq(
    cli: &Cli,
    command: &FaqCommand,
    store: &dyn KnowledgeStore,
    gateway: &AdminGateway,
) -> Result<()> {
    match command {
        FaqCommand::List => output::print_faqs(cli.output, &store.get_all_faqs()?),
        FaqCommand::Add {
            question,
            answer,
            token,
        } => {
            authorize(gateway, token.as_deref())?;
            let faq = store.add_faq(FaqRecord::new(question.as_str(), answer.as_str()))?;
            output::print_faq(cli.output, &faq)
        }
        FaqCommand::Update {
            id,
            question,
            answer,
            token,
        } => {
            authorize(gateway, token.as_deref())?;
            let patch = FaqPatch {
                question: question.clone(),
                answer: answer.clone(),
            };
            match store.update_faq(id, &patch)? {
                Some(faq) => output::print_faq(cli.output, &faq),
                None => bail!(FaqbotError::NotFound(format!("faq {id}"))),
            }
        }
        FaqCommand::Delete { id, token } => {
            authorize(gateway, token.as_deref())?;
            if !store.delete_faq(id)? {
                bail!(FaqbotError::NotFound(format!("faq {id}")));
            }
            output::print_status(cli.output, "deleted", id)
        }
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let config = load_config(&cli)?;
    let gateway = AdminGateway::from_config(&config);

    match &cli.command {
        Commands::Chat { query } => {
            output::print_resolution(cli.output, &build_pipeline(&config)?.answer(query)?)
        }
        Commands::Scores { query } => {
            output::print_scores(cli.output, &build_pipeline(&config)?.scores(query)?)
        }
        Commands::Suggest { limit } => {
            let store = open_store(&config)?;
            output::print_questions(cli.output, &suggested_questions(store.as_ref(), *limit)?)
        }
        Commands::Logs => output::print_logs(cli.output, &open_store(&config)?.query_logs()?),
        Commands::Login { username, password } => {
            let token = gateway.login(username, password)?;
            output::print_status(cli.output, "token", token)
        }
        Commands::Faq(command) => {
            run_faq(&cli, command, open_store(&config)?.as_ref(), &gateway)
        }
        Commands::Seed { input, token } => {
            authorize(&gateway, token.as_deref())?;
            let items =
                read_seed_file(input).with_context(|| format!("read {}", input.display()))?;
            let store = open_store(&config)?;
            output::print_seed(cli.output, &seed_store(store.as_ref(), items)?)
        }
        Commands::Eval {
            cases,
            min_pass_rate,
        } => {
            let pipeline = build_pipeline(&config)?;
            let cases =
                read_eval_cases(cases).with_context(|| format!("read {}", cases.display()))?;
            let summary = evaluate_cases(&pipeline, &cases)?;
            output::print_eval(cli.output, &summary, *min_pass_rate)
        }
    }
}

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
