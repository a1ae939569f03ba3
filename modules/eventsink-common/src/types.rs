use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Number, Value};
use thiserror::Error;

use crate::codec::canonical_json;

// ---------------------------------------------------------------------------
// FieldValue / FieldMap: incoming event fields
// ---------------------------------------------------------------------------

/// One value of an incoming event's field map.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Number(Number),
    Bool(bool),
    /// Arrays and objects. Stored as canonical JSON text.
    Structured(Value),
    Null,
}

impl FieldValue {
    /// Values that project to the empty placeholder cell.
    pub fn is_blank(&self) -> bool {
        match self {
            FieldValue::Null => true,
            FieldValue::Text(s) => s.is_empty(),
            _ => false,
        }
    }
}

impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => FieldValue::Null,
            Value::Bool(b) => FieldValue::Bool(b),
            Value::Number(n) => FieldValue::Number(n),
            Value::String(s) => FieldValue::Text(s),
            structured @ (Value::Array(_) | Value::Object(_)) => FieldValue::Structured(structured),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

/// Ordered key/value association. Key order is the order keys were first seen,
/// which is what schema widening uses to place new columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldMap {
    entries: Vec<(String, FieldValue)>,
}

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a JSON object, keeping its key order. Empty keys are dropped:
    /// they can never name a column.
    pub fn from_json_object(map: serde_json::Map<String, Value>) -> Self {
        map.into_iter()
            .filter(|(key, _)| !key.is_empty())
            .map(|(key, value)| (key, FieldValue::from(value)))
            .collect()
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, value)| value)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Replace the value in place if the key exists, otherwise append it.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<FieldValue>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<FieldValue> {
        let idx = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(idx).1)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, FieldValue)> for FieldMap {
    fn from_iter<T: IntoIterator<Item = (String, FieldValue)>>(iter: T) -> Self {
        let mut map = FieldMap::new();
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}

// ---------------------------------------------------------------------------
// Cell / Row: stored values
// ---------------------------------------------------------------------------

/// One materialized value of a stored row. `Empty` is the single placeholder for
/// missing, null, and empty-string values; stores write it as `""`.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(Number),
    Bool(bool),
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    pub fn to_json(&self) -> Value {
        match self {
            Cell::Empty => Value::String(String::new()),
            Cell::Text(s) => Value::String(s.clone()),
            Cell::Number(n) => Value::Number(n.clone()),
            Cell::Bool(b) => Value::Bool(*b),
        }
    }

    /// Inverse of [`Cell::to_json`]. Structured values read back from a store
    /// are re-encoded canonically so a cell never holds a raw array or object.
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Null => Cell::Empty,
            Value::String(s) if s.is_empty() => Cell::Empty,
            Value::String(s) => Cell::Text(s),
            Value::Number(n) => Cell::Number(n),
            Value::Bool(b) => Cell::Bool(b),
            structured @ (Value::Array(_) | Value::Object(_)) => {
                Cell::Text(canonical_json(&structured))
            }
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Text(s) => f.write_str(s),
            Cell::Number(n) => write!(f, "{n}"),
            Cell::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl Serialize for Cell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Cell {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Cell::from_json)
    }
}

/// A stored row, aligned to its table's header at append time.
pub type Row = Vec<Cell>;

// ---------------------------------------------------------------------------
// Header
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HeaderError {
    #[error("column name must not be empty")]
    EmptyName,

    #[error("duplicate column: {0}")]
    Duplicate(String),
}

/// Ordered column names with stable positions. Columns are only ever pushed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Header {
    columns: Vec<String>,
    positions: HashMap<String, usize>,
}

impl Header {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_columns<I, S>(columns: I) -> Result<Self, HeaderError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut header = Header::new();
        for column in columns {
            header.push(column)?;
        }
        Ok(header)
    }

    /// Append a column and return its position.
    pub fn push(&mut self, name: impl Into<String>) -> Result<usize, HeaderError> {
        let name = name.into();
        if name.is_empty() {
            return Err(HeaderError::EmptyName);
        }
        if self.positions.contains_key(&name) {
            return Err(HeaderError::Duplicate(name));
        }
        let idx = self.columns.len();
        self.positions.insert(name.clone(), idx);
        self.columns.push(name);
        Ok(idx)
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.positions.contains_key(name)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn field_map_keeps_json_key_order() {
        let Value::Object(obj) = json!({"zeta": 1, "alpha": 2, "mid": 3}) else {
            unreachable!()
        };
        let map = FieldMap::from_json_object(obj);
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn field_map_drops_empty_keys() {
        let Value::Object(obj) = json!({"": "x", "a": 1}) else {
            unreachable!()
        };
        let map = FieldMap::from_json_object(obj);
        assert_eq!(map.len(), 1);
        assert!(map.contains_key("a"));
    }

    #[test]
    fn field_map_insert_replaces_in_place() {
        let mut map = FieldMap::new();
        map.insert("a", "1");
        map.insert("b", "2");
        map.insert("a", "3");
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(map.get("a"), Some(&FieldValue::Text("3".into())));
    }

    #[test]
    fn blank_values() {
        assert!(FieldValue::Null.is_blank());
        assert!(FieldValue::Text(String::new()).is_blank());
        assert!(!FieldValue::Bool(false).is_blank());
        assert!(!FieldValue::Number(0i64.into()).is_blank());
    }

    #[test]
    fn empty_cell_materializes_as_empty_string() {
        assert_eq!(Cell::Empty.to_json(), json!(""));
        assert_eq!(serde_json::to_string(&Cell::Empty).unwrap(), "\"\"");
        assert_eq!(Cell::from_json(json!("")), Cell::Empty);
        assert_eq!(Cell::from_json(Value::Null), Cell::Empty);
    }

    #[test]
    fn structured_json_reads_back_as_canonical_text() {
        let cell = Cell::from_json(json!({"b": 1, "a": [true, null]}));
        assert_eq!(cell, Cell::Text(r#"{"a":[true,null],"b":1}"#.into()));
    }

    #[test]
    fn header_rejects_empty_and_duplicate_names() {
        let mut header = Header::from_columns(["timestamp", "action"]).unwrap();
        assert_eq!(header.push(""), Err(HeaderError::EmptyName));
        assert_eq!(
            header.push("action"),
            Err(HeaderError::Duplicate("action".into()))
        );
        assert_eq!(header.push("user_id"), Ok(2));
        assert_eq!(header.position("user_id"), Some(2));
        assert_eq!(header.len(), 3);
    }
}
