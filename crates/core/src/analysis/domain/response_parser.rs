use serde_json::{Map, Value};

use crate::analysis::domain::error::AnalysisError;
use crate::analysis::domain::mood::Mood;

/// Validated fields of a classifier reply, before session metadata is attached.
#[derive(Clone, Debug, PartialEq)]
pub struct Classification {
    pub mood: Mood,
    pub confidence: u8,
    pub reasoning: Option<String>,
    pub version: Option<String>,
}

/// Parses a classifier reply.
///
/// A body that is not a JSON object is a [`AnalysisError::MalformedPayload`].
/// A missing, unknown, or non-positive field is an
/// [`AnalysisError::InvalidResponse`], regardless of the HTTP status it came with.
pub fn parse_classification(body: &str) -> Result<Classification, AnalysisError> {
    let value: Value = serde_json::from_str(body.trim())
        .map_err(|e| AnalysisError::MalformedPayload(e.to_string()))?;
    let Value::Object(fields) = value else {
        return Err(AnalysisError::MalformedPayload(format!(
            "expected a JSON object, got {}",
            kind(&value)
        )));
    };

    let mood = parse_mood(&fields)?;
    let confidence = parse_confidence(&fields)?;
    let reasoning = optional_string(&fields, "reasoning");
    let version = optional_string(&fields, "version");

    Ok(Classification {
        mood,
        confidence,
        reasoning,
        version,
    })
}

fn parse_mood(fields: &Map<String, Value>) -> Result<Mood, AnalysisError> {
    match fields.get("mood") {
        Some(Value::String(s)) if !s.trim().is_empty() => s
            .parse()
            .map_err(|e| AnalysisError::InvalidResponse(format!("{e}"))),
        Some(Value::Null) | None => Err(AnalysisError::InvalidResponse(
            "missing field 'mood'".to_string(),
        )),
        Some(other) => Err(AnalysisError::InvalidResponse(format!(
            "'mood' must be a non-empty string, got {}",
            kind(other)
        ))),
    }
}

/// Reads a confidence given as a number or a numeric string such as `"82"`
/// or `"82%"`.
pub fn confidence_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn parse_confidence(fields: &Map<String, Value>) -> Result<u8, AnalysisError> {
    let raw = match fields.get("confidence") {
        Some(Value::Null) | None => {
            return Err(AnalysisError::InvalidResponse(
                "missing field 'confidence'".to_string(),
            ))
        }
        Some(value) => confidence_number(value),
    };
    match raw {
        Some(c) if c.is_finite() && c > 0.0 => Ok(c.round().clamp(1.0, 100.0) as u8),
        Some(c) => Err(AnalysisError::InvalidResponse(format!(
            "'confidence' must be positive, got {c}"
        ))),
        None => Err(AnalysisError::InvalidResponse(
            "'confidence' is not a number".to_string(),
        )),
    }
}

fn optional_string(fields: &Map<String, Value>, key: &str) -> Option<String> {
    match fields.get(key) {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
