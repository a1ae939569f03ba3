//! Submission parsing and validation.
//!
//! A payload is one entry object or an array of them. Each entry is either an
//! envelope `{"sheet": ..., "data": {...}}` or a flat event whose own keys are
//! the fields. The whole payload is validated before anything is ingested.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use eventsink_common::{iso_timestamp, FieldMap, FieldValue, DEFAULT_DOMAIN};

use crate::error::{IngestError, Result};

pub const TIMESTAMP_FIELD: &str = "timestamp";

const SHEET_FIELD: &str = "sheet";
const DATA_FIELD: &str = "data";

/// One parsed entry: the target table and the event's fields.
#[derive(Debug, Clone, PartialEq)]
pub struct IncomingEvent {
    pub domain: String,
    pub fields: FieldMap,
}

impl IncomingEvent {
    pub fn new(domain: impl Into<String>, fields: FieldMap) -> Self {
        Self {
            domain: domain.into(),
            fields,
        }
    }

    /// Set `timestamp` when it is absent, null, or empty. Returns whether it stamped.
    pub fn stamp_timestamp(&mut self, now: DateTime<Utc>) -> bool {
        let missing = self
            .fields
            .get(TIMESTAMP_FIELD)
            .map_or(true, FieldValue::is_blank);
        if missing {
            self.fields.insert(TIMESTAMP_FIELD, iso_timestamp(now));
        }
        missing
    }
}

/// Parse a whole submission. Fails on the first malformed entry without
/// returning any of the others.
pub fn parse_submission(payload: &Value, max_batch: usize) -> Result<Vec<IncomingEvent>> {
    match payload {
        Value::Object(entry) => Ok(vec![parse_entry(0, entry)?]),
        Value::Array(entries) => {
            if entries.len() > max_batch {
                return Err(IngestError::Validation(format!(
                    "batch of {} entries exceeds the limit of {max_batch}",
                    entries.len()
                )));
            }
            entries
                .iter()
                .enumerate()
                .map(|(idx, entry)| match entry {
                    Value::Object(entry) => parse_entry(idx, entry),
                    other => Err(IngestError::Validation(format!(
                        "entry {idx} must be an object, got {}",
                        kind(other)
                    ))),
                })
                .collect()
        }
        other => Err(IngestError::Validation(format!(
            "payload must be an object or an array of objects, got {}",
            kind(other)
        ))),
    }
}

fn parse_entry(idx: usize, entry: &Map<String, Value>) -> Result<IncomingEvent> {
    let domain = match entry.get(SHEET_FIELD) {
        None | Some(Value::Null) => DEFAULT_DOMAIN.to_string(),
        Some(Value::String(sheet)) if sheet.is_empty() => DEFAULT_DOMAIN.to_string(),
        Some(Value::String(sheet)) => sheet.clone(),
        Some(other) => {
            return Err(IngestError::Validation(format!(
                "entry {idx}: sheet must be a string, got {}",
                kind(other)
            )))
        }
    };

    let fields = match entry.get(DATA_FIELD) {
        Some(Value::Object(data)) => FieldMap::from_json_object(data.clone()),
        None | Some(Value::Null) => {
            // Flat shape: the entry is the event, minus its envelope keys.
            let flat: Map<String, Value> = entry
                .iter()
                .filter(|(key, _)| key.as_str() != SHEET_FIELD && key.as_str() != DATA_FIELD)
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect();
            FieldMap::from_json_object(flat)
        }
        Some(other) => {
            return Err(IngestError::Validation(format!(
                "entry {idx}: data must be an object, got {}",
                kind(other)
            )))
        }
    };

    Ok(IncomingEvent::new(domain, fields))
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
