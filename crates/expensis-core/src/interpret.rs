//! Pull JSON out of free-text model replies.
//!
//! Models wrap JSON in prose and code fences no matter how firmly the prompt
//! asks for a bare array. The strict functions here report why nothing usable
//! was found; the `*_or_empty` variants never fail and yield an empty value,
//! which callers must read as "no data".

use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum InterpretError {
    #[error("no JSON {0} found in reply")]
    NotFound(&'static str),
    #[error("JSON {shape} in reply did not parse: {source}")]
    Malformed {
        shape: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// The top-level JSON shape a caller expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Array,
    Object,
}

impl Shape {
    fn delimiters(self) -> (char, char) {
        match self {
            Shape::Array => ('[', ']'),
            Shape::Object => ('{', '}'),
        }
    }

    fn name(self) -> &'static str {
        match self {
            Shape::Array => "array",
            Shape::Object => "object",
        }
    }

    fn accepts(self, value: &Value) -> bool {
        match self {
            Shape::Array => value.is_array(),
            Shape::Object => value.is_object(),
        }
    }
}

/// Locate and parse the first JSON value of `shape` in `reply`.
///
/// The greedy span (first opener to last closer) is tried first since it is
/// what a well-behaved reply with trailing prose looks like. If that fails,
/// each balanced span starting at an opener is tried in order.
pub fn locate(reply: &str, shape: Shape) -> Result<Value, InterpretError> {
    let (open, close) = shape.delimiters();
    let mut first_error = None;

    if let Some(span) = greedy_span(reply, open, close) {
        match serde_json::from_str::<Value>(span) {
            Ok(value) if shape.accepts(&value) => return Ok(value),
            Ok(_) => {}
            Err(e) => first_error = Some(e),
        }
    }

    for span in balanced_spans(reply, open, close) {
        if let Ok(value) = serde_json::from_str::<Value>(span)
            && shape.accepts(&value)
        {
            return Ok(value);
        }
    }

    match first_error {
        Some(source) => Err(InterpretError::Malformed {
            shape: shape.name(),
            source,
        }),
        None => Err(InterpretError::NotFound(shape.name())),
    }
}

pub fn json_array(reply: &str) -> Result<Vec<Value>, InterpretError> {
    match locate(reply, Shape::Array)? {
        Value::Array(items) => Ok(items),
        _ => Err(InterpretError::NotFound("array")),
    }
}

pub fn json_object(reply: &str) -> Result<Map<String, Value>, InterpretError> {
    match locate(reply, Shape::Object)? {
        Value::Object(map) => Ok(map),
        _ => Err(InterpretError::NotFound("object")),
    }
}

/// Lenient [`json_array`]: logs and returns an empty vector on failure.
pub fn json_array_or_empty(reply: &str) -> Vec<Value> {
    json_array(reply).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "model reply had no usable array");
        Vec::new()
    })
}

/// Lenient [`json_object`]: logs and returns an empty map on failure.
pub fn json_object_or_empty(reply: &str) -> Map<String, Value> {
    json_object(reply).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "model reply had no usable object");
        Map::new()
    })
}

fn greedy_span(text: &str, open: char, close: char) -> Option<&str> {
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    (end > start).then(|| &text[start..=end])
}

/// Every span that starts at `open` and ends at its matching `close`,
/// ignoring delimiters inside JSON strings. Spans come out in start order.
fn balanced_spans(text: &str, open: char, close: char) -> impl Iterator<Item = &str> {
    text.char_indices()
        .filter(move |(_, c)| *c == open)
        .filter_map(move |(start, _)| {
            let mut depth = 0usize;
            let mut in_string = false;
            let mut escaped = false;

            for (offset, c) in text[start..].char_indices() {
                if in_string {
                    if escaped {
                        escaped = false;
                    } else if c == '\\' {
                        escaped = true;
                    } else if c == '"' {
                        in_string = false;
                    }
                    continue;
                }

                if c == '"' {
                    in_string = true;
                } else if c == open {
                    depth += 1;
                } else if c == close {
                    depth -= 1;
                    if depth == 0 {
                        let end = start + offset + c.len_utf8();
                        return Some(&text[start..end]);
                    }
                }
            }
            None
        })
}
