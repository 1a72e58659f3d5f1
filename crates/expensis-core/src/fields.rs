//! Tolerant field-name matching shared by both pipelines.
//!
//! Statements arrive with Russian or English keys in arbitrary casing, and
//! model replies are no more consistent. Every place that reads a transaction
//! field goes through [`find`] so the accepted spellings live in one table.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

use crate::Transaction;

/// A logical transaction field, independent of how the source spells it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldConcept {
    Date,
    Amount,
    Operation,
    Details,
}

impl FieldConcept {
    pub const ALL: [FieldConcept; 4] = [
        FieldConcept::Date,
        FieldConcept::Amount,
        FieldConcept::Operation,
        FieldConcept::Details,
    ];

    /// Accepted spellings, in priority order.
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            FieldConcept::Date => &["дата", "date"],
            FieldConcept::Amount => &["сумма", "amount"],
            FieldConcept::Operation => &["операция", "operation", "operationType", "operation_type"],
            FieldConcept::Details => &["детали", "details", "описание", "description"],
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            FieldConcept::Date => "date",
            FieldConcept::Amount => "amount",
            FieldConcept::Operation => "operation",
            FieldConcept::Details => "details",
        }
    }
}

static NUMERIC_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[+-]?(\d+\.?\d*|\.\d+)([eE][+-]?\d+)?").unwrap());

/// Find the value for `concept`: exact alias keys first, then a
/// case-insensitive pass. `null` values count as absent.
pub fn find(record: &Map<String, Value>, concept: FieldConcept) -> Option<&Value> {
    let aliases = concept.aliases();

    for alias in aliases {
        if let Some(value) = record.get(*alias)
            && !value.is_null()
        {
            return Some(value);
        }
    }

    for alias in aliases {
        let wanted = alias.to_lowercase();
        let hit = record
            .iter()
            .find(|(key, value)| !value.is_null() && key.to_lowercase() == wanted);
        if let Some((_, value)) = hit {
            return Some(value);
        }
    }

    None
}

/// Whether any key names `concept`, including keys that merely contain an
/// alias (`"Дата операции"` names the date). Used by the statement probe.
pub fn mentions(record: &Map<String, Value>, concept: FieldConcept) -> bool {
    record.keys().any(|key| {
        let key = key.to_lowercase();
        concept
            .aliases()
            .iter()
            .any(|alias| key.contains(&alias.to_lowercase()))
    })
}

/// Concepts the record does not mention at all.
pub fn missing_concepts(record: &Map<String, Value>) -> Vec<FieldConcept> {
    FieldConcept::ALL
        .into_iter()
        .filter(|concept| !mentions(record, *concept))
        .collect()
}

/// Coerce a JSON value to an amount.
///
/// Numbers pass through. Strings are read the way a lenient float parser
/// reads them: the leading numeric prefix wins, so `"1500 руб"` is 1500.
/// Grouping spaces are dropped and a lone comma is a decimal separator.
/// Anything unparseable is 0.
pub fn coerce_amount(value: &Value) -> f64 {
    let amount = match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => parse_amount_str(s),
        _ => 0.0,
    };
    if amount.is_finite() { amount } else { 0.0 }
}

fn parse_amount_str(raw: &str) -> f64 {
    let mut cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == '\u{2212}' { '-' } else { c })
        .collect();

    if cleaned.contains(',') {
        if cleaned.contains('.') {
            cleaned = cleaned.replace(',', "");
        } else {
            cleaned = cleaned.replace(',', ".");
        }
    }

    NUMERIC_PREFIX
        .find(&cleaned)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .unwrap_or(0.0)
}

/// Render a scalar as text; containers and `null` become "".
pub fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}

/// Whether a key names `concept` at all, even when its value is `null`.
pub fn has_key(record: &Map<String, Value>, concept: FieldConcept) -> bool {
    concept.aliases().iter().any(|alias| {
        let wanted = alias.to_lowercase();
        record.keys().any(|key| key.to_lowercase() == wanted)
    })
}

/// A usable date: a non-blank string or a number.
fn date_of(record: &Map<String, Value>) -> Option<String> {
    match find(record, FieldConcept::Date)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn field_text(record: &Map<String, Value>, concept: FieldConcept) -> String {
    find(record, concept).map(text_of).unwrap_or_default()
}

/// Build a transaction from any record, defaulting whatever is missing.
///
/// Used for caller-supplied statements where every position must survive,
/// because derived data refers to transactions by index.
pub fn transaction_from_record(record: &Value) -> Transaction {
    let Some(map) = record.as_object() else {
        return Transaction::default();
    };

    Transaction {
        date: field_text(map, FieldConcept::Date),
        amount: find(map, FieldConcept::Amount)
            .map(coerce_amount)
            .unwrap_or(0.0),
        operation_type: field_text(map, FieldConcept::Operation),
        details: field_text(map, FieldConcept::Details),
    }
}

/// Normalize model-extracted entries, dropping any without a date-like or an
/// amount field. An amount key holding `null` still counts and reads as 0.
pub fn normalize_extracted(entries: &[Value]) -> Vec<Transaction> {
    entries
        .iter()
        .filter_map(|entry| {
            let map = entry.as_object()?;
            let date = date_of(map)?;
            if !has_key(map, FieldConcept::Amount) {
                return None;
            }
            let amount = find(map, FieldConcept::Amount)
                .map(coerce_amount)
                .unwrap_or(0.0);
            Some(Transaction {
                date,
                amount,
                operation_type: field_text(map, FieldConcept::Operation),
                details: field_text(map, FieldConcept::Details),
            })
        })
        .collect()
}
