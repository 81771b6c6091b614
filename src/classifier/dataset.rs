//! Labelled rewrite examples for training
//!
//! Two input formats are accepted, picked by file extension:
//! - `.json`: an array of objects with `code_before`, `code_after` and
//!   `error_introduced` (0/1 or a boolean)
//! - anything else: CSV with a header row naming the same three columns.
//!   Fields follow RFC 4180 quoting, so snippets may span lines.

use std::fs;
use std::path::Path;

use serde_json::Value;

use crate::error::{RefactorError, Result};

/// Columns every dataset must provide.
pub const REQUIRED_COLUMNS: [&str; 3] = ["code_before", "code_after", "error_introduced"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainingExample {
    pub code_before: String,
    pub code_after: String,
    pub error_introduced: bool,
}

pub fn load_dataset(path: &Path) -> Result<Vec<TrainingExample>> {
    if !path.is_file() {
        return Err(RefactorError::Dataset(format!(
            "data file not found at {}",
            path.display()
        )));
    }
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));
    let text = fs::read_to_string(path)?;
    if is_json {
        parse_json(&text)
    } else {
        parse_csv(&text)
    }
}

fn parse_label(raw: &str, row: usize) -> Result<bool> {
    match raw.trim() {
        "0" => Ok(false),
        "1" => Ok(true),
        other => Err(RefactorError::Dataset(format!(
            "row {}: error_introduced must be 0 or 1, got '{}'",
            row, other
        ))),
    }
}

pub fn parse_csv(text: &str) -> Result<Vec<TrainingExample>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(text.as_bytes());

    let headers = reader.headers()?.clone();
    let column = |name: &str| headers.iter().position(|h| h.trim() == name);
    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|c| column(c).is_none())
        .map(|c| c.to_string())
        .collect();
    let (Some(before), Some(after), Some(label)) = (
        column("code_before"),
        column("code_after"),
        column("error_introduced"),
    ) else {
        return Err(RefactorError::DatasetSchema { missing });
    };

    let mut examples = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record?;
        let row = index + 1;
        let field = |i: usize| record.get(i).unwrap_or_default().to_string();
        examples.push(TrainingExample {
            code_before: field(before),
            code_after: field(after),
            error_introduced: parse_label(&field(label), row)?,
        });
    }
    Ok(examples)
}

pub fn parse_json(text: &str) -> Result<Vec<TrainingExample>> {
    let value: Value = serde_json::from_str(text)?;
    let Value::Array(rows) = value else {
        return Err(RefactorError::Dataset(
            "JSON dataset must be an array of objects".into(),
        ));
    };

    let mut examples = Vec::with_capacity(rows.len());
    for (index, row) in rows.iter().enumerate() {
        let row_number = index + 1;
        let Value::Object(fields) = row else {
            return Err(RefactorError::Dataset(format!(
                "row {}: expected an object",
                row_number
            )));
        };
        let missing: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .filter(|c| !fields.contains_key(**c))
            .map(|c| c.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(RefactorError::DatasetSchema { missing });
        }

        let text_field = |name: &str| match &fields[name] {
            Value::String(s) => Ok(s.clone()),
            _ => Err(RefactorError::Dataset(format!(
                "row {}: {} must be a string",
                row_number, name
            ))),
        };
        let error_introduced = match &fields["error_introduced"] {
            Value::Bool(b) => *b,
            Value::Number(n) => parse_label(&n.to_string(), row_number)?,
            Value::String(s) => parse_label(s, row_number)?,
            other => parse_label(&other.to_string(), row_number)?,
        };
        examples.push(TrainingExample {
            code_before: text_field("code_before")?,
            code_after: text_field("code_after")?,
            error_introduced,
        });
    }
    Ok(examples)
}
