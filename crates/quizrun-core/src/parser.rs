//! JSON question bank parser.
//!
//! Turns JSON documents into raw question records, finds bank files under a
//! directory, and reports problems for the `validate` command.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::Value;

use crate::bank::QuestionBank;
use crate::model::QuestionId;

/// Parse a JSON document into raw records. The top level must be an array.
///
/// Every bank, whether read from disk or fetched over HTTP, goes through here
/// before normalization.
pub fn parse_records(content: &str) -> Result<Vec<Value>> {
    let value: Value = serde_json::from_str(content).context("invalid JSON")?;
    match value {
        Value::Array(records) => Ok(records),
        other => anyhow::bail!(
            "expected a JSON array of questions, found {}",
            json_kind(&other)
        ),
    }
}

/// Every `.json` file under `dir`, recursively, sorted by path.
pub fn find_bank_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    collect_json_files(dir, &mut paths)?;
    paths.sort();
    Ok(paths)
}

fn collect_json_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
    {
        let path = entry?.path();
        if path.is_dir() {
            collect_json_files(&path, out)?;
        } else if path.extension().is_some_and(|ext| ext == "json") {
            out.push(path);
        }
    }
    Ok(())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// A problem found while validating raw records.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    /// Position of the record in the file.
    pub position: usize,
    /// Raw id, if the record had one.
    pub id: Option<QuestionId>,
    pub message: String,
}

/// Check raw records for issues that normalization would skip or paper over.
pub fn validate_records(records: &[Value]) -> Vec<ValidationWarning> {
    let normalized = QuestionBank::normalize(records);
    let mut warnings: Vec<ValidationWarning> = normalized
        .rejected
        .iter()
        .map(|r| ValidationWarning {
            position: r.position,
            id: r.id.clone(),
            message: format!("skipped: {}", r.reason),
        })
        .collect();

    let rejected: HashSet<usize> = normalized.rejected.iter().map(|r| r.position).collect();
    let mut seen = HashSet::new();
    for (position, record) in records.iter().enumerate() {
        if rejected.contains(&position) {
            continue;
        }
        let raw_id = match record.get("id") {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(QuestionId::new(s.trim())),
            Some(Value::Number(n)) => Some(QuestionId::new(n.to_string())),
            _ => None,
        };
        match &raw_id {
            Some(id) if !seen.insert(id.clone()) => warnings.push(ValidationWarning {
                position,
                id: raw_id.clone(),
                message: format!("duplicate id `{id}` will be re-keyed"),
            }),
            None => warnings.push(ValidationWarning {
                position,
                id: None,
                message: "no id; one will be derived from the question text".into(),
            }),
            _ => {}
        }
        if record.get("explanation").and_then(Value::as_str).is_none() {
            warnings.push(ValidationWarning {
                position,
                id: raw_id,
                message: "no explanation provided".into(),
            });
        }
    }

    warnings.sort_by_key(|w| w.position);
    warnings
}
