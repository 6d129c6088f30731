use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde::Deserialize;
use tracing::info;

use crate::error::{FaqbotError, Result};
use crate::model::FaqRecord;
use crate::store::KnowledgeStore;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SeedFaq {
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct SeedReport {
    pub added: usize,
    pub skipped: usize,
}

/// Reads `{"question", "answer"}` JSON lines.
pub fn read_seed_jsonl(path: &Path) -> Result<Vec<SeedFaq>> {
    let file = File::open(path)?;
    let mut out = Vec::new();

    for line in BufReader::new(file).lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        out.push(serde_json::from_str(&line)?);
    }

    Ok(out)
}

/// Parses `question | answer` lines; blank lines are ignored.
pub fn parse_pipe_separated(text: &str) -> Result<Vec<SeedFaq>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'|')
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .quoting(false)
        .from_reader(text.as_bytes());

    let mut out = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record.map_err(|err| FaqbotError::InvalidInput(err.to_string()))?;
        if record.iter().all(str::is_empty) {
            continue;
        }
        match (record.get(0), record.get(1)) {
            (Some(question), Some(answer)) if !question.is_empty() && !answer.is_empty() => {
                out.push(SeedFaq {
                    question: question.to_string(),
                    answer: answer.to_string(),
                })
            }
            _ => {
                return Err(FaqbotError::InvalidInput(format!(
                    "record {}: expected 'question | answer'",
                    line + 1
                )))
            }
        }
    }
    Ok(out)
}

/// Reads JSONL when the extension is `.jsonl` or `.json`, pipe-separated text otherwise.
pub fn read_seed_file(path: &Path) -> Result<Vec<SeedFaq>> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("jsonl") | Some("json") => read_seed_jsonl(path),
        _ => parse_pipe_separated(&std::fs::read_to_string(path)?),
    }
}

/// Adds every FAQ whose question is not already stored (case-insensitive).
pub fn seed_store(store: &dyn KnowledgeStore, items: Vec<SeedFaq>) -> Result<SeedReport> {
    let mut existing: HashSet<String> = store
        .get_all_faqs()?
        .into_iter()
        .map(|f| f.question.trim().to_lowercase())
        .collect();

    let mut report = SeedReport::default();
    for item in items {
        if item.question.trim().is_empty() || item.answer.trim().is_empty() {
            report.skipped += 1;
            continue;
        }
        if !existing.insert(item.question.trim().to_lowercase()) {
            report.skipped += 1;
            continue;
        }
        store.add_faq(FaqRecord::new(item.question, item.answer))?;
        report.added += 1;
    }

    info!(added = report.added, skipped = report.skipped, "seeded knowledge store");
    Ok(report)
}
