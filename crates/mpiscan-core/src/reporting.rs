//! Result aggregation and report rendering.
//!
//! A [`ResultSet`] is normalized once (`aggregate`) and then rendered as
//! compact JSON, the same shape that `load_result_set` reads back, or as
//! Markdown for humans.

use serde_json::Value;
use std::path::Path;

use crate::domain::{Result, ResultSet, RunOutput};
use crate::driver::ensure_regular_file;

/// Key omitted from Markdown bullet lists.
pub const HIDDEN_KEY: &str = "_";

/// Supported report formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Json,
    Markdown,
}

impl ReportFormat {
    /// `json` or `md`; anything else is not a format.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "json" => Some(ReportFormat::Json),
            "md" => Some(ReportFormat::Markdown),
            _ => None,
        }
    }
}

/// Normalize captured output and drop outcomes with nothing to show.
///
/// Text that parses as a JSON object becomes structured output. Outcomes
/// without output (failed, timed out, empty) are removed; implementations
/// stay listed even when all their outcomes are gone.
pub fn aggregate(mut results: ResultSet) -> ResultSet {
    for outcomes in results.values_mut() {
        for outcome in outcomes.iter_mut() {
            outcome.out = outcome.out.take().map(RunOutput::normalize);
        }
        outcomes.retain(|o| o.has_output());
    }
    results
}

/// Serialize the result set as compact JSON.
pub fn render_json(results: &ResultSet) -> Result<String> {
    Ok(serde_json::to_string(results)?)
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Render one heading per implementation and one subheading per version.
/// Text output goes in a fenced block, structured output becomes a
/// `* key = value` list.
pub fn render_markdown(results: &ResultSet) -> String {
    let mut out = String::new();
    for (name, outcomes) in results {
        out.push_str(&format!("# {}\n\n", name));
        for outcome in outcomes {
            out.push_str(&format!("## {}\n\n", outcome.version));
            match &outcome.out {
                Some(RunOutput::Text(text)) => {
                    out.push_str(&format!("```\n{}\n```\n", text));
                }
                Some(RunOutput::Structured(map)) => {
                    let lines: Vec<String> = map
                        .iter()
                        .filter(|(key, _)| key.as_str() != HIDDEN_KEY)
                        .map(|(key, value)| format!("* {} = {}", key, display_value(value)))
                        .collect();
                    out.push_str(&lines.join("\n"));
                    out.push_str("\n\n");
                }
                None => {}
            }
        }
    }
    out
}

/// Aggregate and render in the named format. Unknown formats yield an
/// empty report.
pub fn render_report(results: ResultSet, format: &str) -> Result<String> {
    let results = aggregate(results);
    match ReportFormat::parse(format) {
        Some(ReportFormat::Json) => render_json(&results),
        Some(ReportFormat::Markdown) => Ok(render_markdown(&results)),
        None => Ok(String::new()),
    }
}

/// Load a result set previously written as JSON.
pub fn load_result_set(path: &Path) -> Result<ResultSet> {
    ensure_regular_file(path)?;
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Write a rendered report.
pub fn write_report(path: &Path, report: &str) -> Result<()> {
    std::fs::write(path, report)?;
    Ok(())
}
