//! The one place event values become cell values.
//!
//! Every row-cell boundary goes through [`cell_for`], and every structured value
//! goes through [`canonical_json`], so the same event always produces the same row.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;

use crate::types::{Cell, FieldValue};

/// Compact JSON with object keys sorted at every depth. Array order is kept.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            out.push('{');
            for (i, (key, inner)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                // Display on a JSON string value gives the escaped, quoted form.
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(inner, out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, inner) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(inner, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

/// Map a field value onto a cell. Scalars pass through; structured values are
/// encoded with [`canonical_json`]; null and empty text become [`Cell::Empty`].
pub fn cell_for(value: &FieldValue) -> Cell {
    match value {
        FieldValue::Null => Cell::Empty,
        FieldValue::Text(s) if s.is_empty() => Cell::Empty,
        FieldValue::Text(s) => Cell::Text(s.clone()),
        FieldValue::Number(n) => Cell::Number(n.clone()),
        FieldValue::Bool(b) => Cell::Bool(*b),
        FieldValue::Structured(v) => Cell::Text(canonical_json(v)),
    }
}

/// ISO-8601 UTC with millisecond precision, e.g. `2026-03-01T12:00:00.000Z`.
pub fn iso_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}
