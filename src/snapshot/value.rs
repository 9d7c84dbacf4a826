//! Parameter values and text coercion
//!
//! A parameter's kind is fixed when the value is first read from a snapshot.
//! Edits arrive as text and are coerced back to that kind on save.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A recorded parameter value.
///
/// Variant order matters for deserialization: integers are tried before floats
/// and integer lists before float lists, so `3` stays an `Int` and `3.0` a `Float`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    IntSequence(Vec<i64>),
    FloatSequence(Vec<f64>),
    Text(String),
    /// Anything else the host wrote (ramps, nested blocks); carried through untouched
    Other(serde_json::Value),
}

/// The kind tag consulted when edited text is committed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Bool,
    Int,
    Float,
    IntSequence,
    FloatSequence,
    Text,
    Other,
}

impl ParamValue {
    pub fn kind(&self) -> ParamKind {
        match self {
            ParamValue::Bool(_) => ParamKind::Bool,
            ParamValue::Int(_) => ParamKind::Int,
            ParamValue::Float(_) => ParamKind::Float,
            ParamValue::IntSequence(_) => ParamKind::IntSequence,
            ParamValue::FloatSequence(_) => ParamKind::FloatSequence,
            ParamValue::Text(_) => ParamKind::Text,
            ParamValue::Other(_) => ParamKind::Other,
        }
    }

    /// Numeric vectors get their labels from per-component parameters
    pub fn is_numeric_sequence(&self) -> bool {
        matches!(self, ParamValue::IntSequence(_) | ParamValue::FloatSequence(_))
    }

    /// Number of components for sequences, `None` for scalars
    pub fn sequence_len(&self) -> Option<usize> {
        match self {
            ParamValue::IntSequence(values) => Some(values.len()),
            ParamValue::FloatSequence(values) => Some(values.len()),
            _ => None,
        }
    }

    /// Text shown in the parameter table
    pub fn display_text(&self) -> String {
        self.to_string()
    }

    /// Coerce edited text back to this value's kind.
    ///
    /// Never fails: text that does not parse as the original kind is kept as `Text`.
    pub fn coerce_text(&self, text: &str) -> ParamValue {
        let coerced = match self {
            ParamValue::Bool(_) => Some(ParamValue::Bool(parse_truthy(text))),
            ParamValue::Int(_) => text.trim().parse::<i64>().ok().map(ParamValue::Int),
            ParamValue::Float(_) => text.trim().parse::<f64>().ok().map(ParamValue::Float),
            ParamValue::IntSequence(original) => {
                parse_numbers(text, original.len()).and_then(|values| {
                    if original.is_empty() {
                        Some(ParamValue::FloatSequence(values))
                    } else {
                        values
                            .into_iter()
                            .map(truncate_to_int)
                            .collect::<Option<Vec<i64>>>()
                            .map(ParamValue::IntSequence)
                    }
                })
            }
            ParamValue::FloatSequence(original) => {
                parse_numbers(text, original.len()).map(ParamValue::FloatSequence)
            }
            ParamValue::Text(_) => None,
            ParamValue::Other(_) => serde_json::from_str(text).ok().map(ParamValue::Other),
        };

        coerced.unwrap_or_else(|| ParamValue::Text(text.to_string()))
    }
}

/// Truncate toward zero, or `None` when the value has no `i64` equivalent
fn truncate_to_int(value: f64) -> Option<i64> {
    let truncated = value.trunc();
    // `i64::MAX as f64` rounds up to 2^63, which is already out of range
    if truncated.is_finite() && truncated >= i64::MIN as f64 && truncated < i64::MAX as f64 {
        Some(truncated as i64)
    } else {
        None
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Bool(true) => write!(f, "True"),
            ParamValue::Bool(false) => write!(f, "False"),
            ParamValue::Int(value) => write!(f, "{}", value),
            ParamValue::Float(value) => write!(f, "{:?}", value),
            ParamValue::IntSequence(values) => {
                let parts: Vec<String> = values.iter().map(|v| v.to_string()).collect();
                write!(f, "[{}]", parts.join(", "))
            }
            ParamValue::FloatSequence(values) => {
                let parts: Vec<String> = values.iter().map(|v| format!("{:?}", v)).collect();
                write!(f, "[{}]", parts.join(", "))
            }
            ParamValue::Text(value) => write!(f, "{}", value),
            ParamValue::Other(value) => write!(f, "{}", value),
        }
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Int(value)
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Float(value)
    }
}

impl From<Vec<f64>> for ParamValue {
    fn from(values: Vec<f64>) -> Self {
        ParamValue::FloatSequence(values)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Text(value.to_string())
    }
}

fn parse_truthy(text: &str) -> bool {
    matches!(text.trim().to_lowercase().as_str(), "1" | "true" | "yes")
}

/// Parse `[1, 2, 3]`, `(1, 2, 3)` or a bare number.
///
/// A bare number is repeated `len` times so a single value can fill a vector.
fn parse_numbers(text: &str, len: usize) -> Option<Vec<f64>> {
    let trimmed = text.trim();
    let inner = trimmed
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .or_else(|| trimmed.strip_prefix('(').and_then(|rest| rest.strip_suffix(')')));

    match inner {
        Some(inner) => {
            let mut values = Vec::new();
            let parts: Vec<&str> = inner.split(',').map(str::trim).collect();
            for (index, part) in parts.iter().enumerate() {
                // trailing comma
                if part.is_empty() && index == parts.len() - 1 {
                    continue;
                }
                values.push(part.parse::<f64>().ok()?);
            }
            Some(values)
        }
        None => {
            let scalar = trimmed.parse::<f64>().ok()?;
            Some(vec![scalar; len])
        }
    }
}
