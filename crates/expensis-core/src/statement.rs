//! Loading statements from JSON and CSV files.
//!
//! Records come back as raw JSON objects so they go through the same
//! validation as statements posted to the API.

use std::path::{Path, PathBuf};

use serde_json::{Map, Number, Value};
use thiserror::Error;

use crate::fields::FieldConcept;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("could not read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("unsupported statement format: {0} (expected .json or .csv)")]
    UnsupportedFormat(String),
    #[error("invalid JSON statement: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid CSV statement: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON statement must be an array of transactions")]
    NotArray,
    #[error("CSV statement needs a header row and at least one data row")]
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementFormat {
    Json,
    Csv,
}

impl StatementFormat {
    /// Pick a format from the file extension, case-insensitively.
    pub fn from_path(path: &Path) -> Result<Self, LoadError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "json" => Ok(StatementFormat::Json),
            "csv" => Ok(StatementFormat::Csv),
            _ => Err(LoadError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

pub fn load_statement(path: &Path) -> Result<Vec<Value>, LoadError> {
    let format = StatementFormat::from_path(path)?;
    let content = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let records = parse_statement(&content, format)?;
    tracing::debug!(path = %path.display(), records = records.len(), "statement loaded");
    Ok(records)
}

pub fn parse_statement(content: &str, format: StatementFormat) -> Result<Vec<Value>, LoadError> {
    match format {
        StatementFormat::Json => match serde_json::from_str(content)? {
            Value::Array(records) => Ok(records),
            _ => Err(LoadError::NotArray),
        },
        StatementFormat::Csv => parse_csv(content),
    }
}

/// Headers are lowercased with stray quotes removed; numeric values in an
/// amount column become JSON numbers, everything else stays a string.
fn parse_csv(content: &str) -> Result<Vec<Value>, LoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.replace('"', "").to_lowercase())
        .collect();
    if headers.iter().all(|h| h.is_empty()) {
        return Err(LoadError::Empty);
    }

    let amount_columns: Vec<bool> = headers
        .iter()
        .map(|h| FieldConcept::Amount.aliases().contains(&h.as_str()))
        .collect();

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        if row.iter().all(|v| v.is_empty()) {
            continue;
        }

        let mut record = Map::new();
        for (i, header) in headers.iter().enumerate() {
            let raw = row.get(i).unwrap_or("");
            let value = if amount_columns[i] {
                numeric(raw).unwrap_or_else(|| Value::String(raw.to_string()))
            } else {
                Value::String(raw.to_string())
            };
            record.insert(header.clone(), value);
        }
        records.push(Value::Object(record));
    }

    if records.is_empty() {
        return Err(LoadError::Empty);
    }
    Ok(records)
}

fn numeric(raw: &str) -> Option<Value> {
    let n: f64 = raw.parse().ok()?;
    Number::from_f64(n).map(Value::Number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn csv_with_quotes_and_amounts() {
        let content = "\"Дата\",\"Сумма\",\"Операция\",\"Детали\"\n\
                       2024-01-15,-1500,Покупка,\"Ашан, Москва\"\n\
                       2024-01-17,50000,Поступление,Зарплата\n\n";
        let records = parse_statement(content, StatementFormat::Csv).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["сумма"], Value::from(-1500.0));
        assert_eq!(records[0]["детали"], "Ашан, Москва");
        assert_eq!(records[1]["операция"], "Поступление");
    }

    #[test]
    fn non_numeric_amount_stays_text() {
        let content = "date,amount,operation,details\n2024-01-15,1 500 руб,Buy,Shop\n";
        let records = parse_statement(content, StatementFormat::Csv).unwrap();
        assert_eq!(records[0]["amount"], "1 500 руб");
    }

    #[test]
    fn header_only_csv_is_rejected() {
        let err = parse_statement("date,amount\n", StatementFormat::Csv).unwrap_err();
        assert!(matches!(err, LoadError::Empty));
        let err = parse_statement("", StatementFormat::Csv).unwrap_err();
        assert!(matches!(err, LoadError::Empty));
    }

    #[test]
    fn json_must_be_an_array() {
        let err = parse_statement(r#"{"statement": []}"#, StatementFormat::Json).unwrap_err();
        assert!(matches!(err, LoadError::NotArray));

        let records =
            parse_statement(r#"[{"дата": "2024-01-15", "сумма": -1500}]"#, StatementFormat::Json)
                .unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn format_follows_extension() {
        assert_eq!(
            StatementFormat::from_path(Path::new("jan.CSV")).unwrap(),
            StatementFormat::Csv
        );
        assert!(matches!(
            StatementFormat::from_path(Path::new("jan.xlsx")),
            Err(LoadError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn load_from_disk() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"[{{"date": "2024-01-15", "amount": 10}}]"#).unwrap();
        let records = load_statement(file.path()).unwrap();
        assert_eq!(records[0]["amount"], 10);
    }
}
