use std::io::{self, Write};

use anyhow::Result;
use faqbot_core::{EvalSummary, FaqRecord, QueryLogEntry, Resolution, ScoredFaq, SeedReport};
use serde::Serialize;
use serde_json::json;

use crate::cli::OutputFormat;

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let mut out = io::stdout();
    serde_json::to_writer_pretty(&mut out, value)?;
    writeln!(out)?;
    Ok(())
}

fn outcome_name<T: Serialize>(value: &T) -> String {
    serde_json::to_value(value)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default()
}

pub fn print_resolution(format: OutputFormat, r: &Resolution) -> Result<()> {
    if format == OutputFormat::Json {
        return print_json(r);
    }
    let mut out = io::stdout();
    write!(
        out,
        "outcome={} confidence={:.4}",
        outcome_name(&r.outcome),
        r.confidence
    )?;
    if let Some(id) = &r.faq_id {
        write!(out, " faq_id={id}")?;
    }
    writeln!(out)?;
    writeln!(out, "{}", r.answer)?;
    Ok(())
}

pub fn print_scores(format: OutputFormat, scores: &[ScoredFaq]) -> Result<()> {
    if format == OutputFormat::Json {
        return print_json(scores);
    }
    let mut out = io::stdout();
    for s in scores {
        writeln!(
            out,
            "score={:.4} faq_id={} question={}",
            s.score, s.faq_id, s.question
        )?;
    }
    Ok(())
}

pub fn print_questions(format: OutputFormat, questions: &[String]) -> Result<()> {
    if format == OutputFormat::Json {
        return print_json(questions);
    }
    let mut out = io::stdout();
    for q in questions {
        writeln!(out, "{q}")?;
    }
    Ok(())
}

pub fn print_faqs(format: OutputFormat, faqs: &[FaqRecord]) -> Result<()> {
    if format == OutputFormat::Json {
        return print_json(faqs);
    }
    let mut out = io::stdout();
    for f in faqs {
        writeln!(out, "id={} question={} answer={}", f.id, f.question, f.answer)?;
    }
    Ok(())
}

pub fn print_faq(format: OutputFormat, faq: &FaqRecord) -> Result<()> {
    print_faqs(format, std::slice::from_ref(faq))
}

pub fn print_logs(format: OutputFormat, logs: &[QueryLogEntry]) -> Result<()> {
    if format == OutputFormat::Json {
        return print_json(logs);
    }
    let mut out = io::stdout();
    for l in logs {
        writeln!(
            out,
            "timestamp={} score={:.4} query={} response={}",
            l.timestamp.to_rfc3339(),
            l.score,
            l.query,
            l.response.replace('\n', "\\n")
        )?;
    }
    Ok(())
}

pub fn print_status(format: OutputFormat, key: &str, value: &str) -> Result<()> {
    if format == OutputFormat::Json {
        return print_json(&json!({ key: value, "status": "success" }));
    }
    writeln!(io::stdout(), "status=success {key}={value}")?;
    Ok(())
}

pub fn print_seed(format: OutputFormat, report: &SeedReport) -> Result<()> {
    if format == OutputFormat::Json {
        return print_json(report);
    }
    writeln!(
        io::stdout(),
        "added={} skipped={}",
        report.added,
        report.skipped
    )?;
    Ok(())
}

pub fn print_eval(format: OutputFormat, summary: &EvalSummary, required: f32) -> Result<()> {
    let meets = summary.meets(required);
    if format == OutputFormat::Json {
        return print_json(&json!({
            "summary": summary,
            "required_pass_rate": required,
            "meets_threshold": meets,
        }));
    }
    let mut out = io::stdout();
    writeln!(
        out,
        "total={} passed={} failed={} pass_rate={:.4} required={:.4} meets_threshold={}",
        summary.total, summary.passed, summary.failed, summary.pass_rate, required, meets
    )?;
    for o in &summary.outcomes {
        writeln!(
            out,
            "case={} passed={} outcome={} faq_id={} confidence={:.4} latency={:.1}ms",
            o.case_id,
            o.passed,
            outcome_name(&o.actual),
            o.actual_faq_id.as_deref().unwrap_or("null"),
            o.confidence,
            o.latency_ms
        )?;
    }
    Ok(())
}
