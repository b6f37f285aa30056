//! Upstream payload decoding.
//!
//! Accepted bodies are a bare JSON array of records or an object with an
//! `items` array. Each record is `{kind, occurredAt, payload}`. Any other
//! shape is a decode failure; nothing here panics on hostile input.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::{Map, Value};
use timeline_core::{Source, TimelineEvent};

/// Why a body could not be decoded.
///
/// Carries only the body size and coarse shape, never body content, so it is
/// safe to log.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{reason} (shape={shape}, body_bytes={body_bytes})")]
pub struct DecodeFailure {
    pub reason: String,
    pub body_bytes: usize,
    pub shape: &'static str,
}

/// Decode one upstream response body into events for `source`, in emission order.
pub fn decode_events(source: Source, body: &[u8]) -> Result<Vec<TimelineEvent>, DecodeFailure> {
    let fail = |reason: String, shape: &'static str| DecodeFailure {
        reason,
        body_bytes: body.len(),
        shape,
    };

    let value: Value =
        serde_json::from_slice(body).map_err(|e| fail(format!("invalid JSON at line {}", e.line()), "invalid_json"))?;
    let shape = shape_of(&value);

    let records = match &value {
        Value::Array(items) => items,
        Value::Object(map) => match map.get("items") {
            Some(Value::Array(items)) => items,
            _ => return Err(fail("object without an items array".to_string(), shape)),
        },
        _ => return Err(fail("expected a list of records".to_string(), shape)),
    };

    records
        .iter()
        .enumerate()
        .map(|(index, record)| {
            decode_record(source, record).map_err(|reason| fail(format!("record {index}: {reason}"), shape))
        })
        .collect()
}

fn decode_record(source: Source, record: &Value) -> Result<TimelineEvent, String> {
    let Value::Object(fields) = record else {
        return Err(format!("expected object, got {}", shape_of(record)));
    };

    let kind = match fields.get("kind") {
        Some(Value::String(kind)) if !kind.trim().is_empty() => kind.clone(),
        Some(_) => return Err("kind must be a non-empty string".to_string()),
        None => return Err("missing kind".to_string()),
    };

    let occurred_at = match fields.get("occurredAt") {
        Some(Value::String(raw)) => {
            parse_timestamp(raw).ok_or_else(|| "occurredAt is not an ISO-8601 timestamp".to_string())?
        }
        Some(_) => return Err("occurredAt must be a string".to_string()),
        None => return Err("missing occurredAt".to_string()),
    };

    let payload = match fields.get("payload") {
        Some(Value::Object(map)) => coerce_payload(map),
        _ => BTreeMap::new(),
    };

    Ok(TimelineEvent {
        source,
        occurred_at,
        kind,
        payload,
    })
}

/// Parse an RFC 3339 timestamp, treating an offset-less timestamp as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

fn coerce_payload(map: &Map<String, Value>) -> BTreeMap<String, String> {
    map.iter()
        .filter_map(|(key, value)| {
            let text = match value {
                Value::Null => return None,
                Value::String(s) => s.clone(),
                Value::Bool(b) => b.to_string(),
                Value::Number(n) => n.to_string(),
                nested @ (Value::Array(_) | Value::Object(_)) => nested.to_string(),
            };
            Some((key.clone(), text))
        })
        .collect()
}

fn shape_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
