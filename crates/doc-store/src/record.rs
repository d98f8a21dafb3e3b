use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Stable identifier for a [`Record`].
///
/// By convention ids encode the record's type as a prefix, e.g.
/// `"shape:xyz"` or `"camera:main"`. The engine treats ids as opaque
/// strings; the prefix is a convention for callers (and snapshot-level
/// migrators) that want to filter by type without parsing the record.
///
/// # Example
///
/// ```
/// use doc_store::RecordId;
///
/// let id = RecordId::new("shape:abc123");
/// assert_eq!(id.type_prefix(), Some("shape"));
/// assert_eq!(id.as_str(), "shape:abc123");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Create an id from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The conventional `"<typeName>:"` prefix, if the id has one.
    #[must_use]
    pub fn type_prefix(&self) -> Option<&str> {
        self.0.split_once(':').map(|(prefix, _)| prefix)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for RecordId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// One identified, typed unit of persisted state.
///
/// A record is an untyped JSON object carrying at least an `id` and a
/// `typeName` field; polymorphic types additionally carry a discriminant
/// field (e.g. a shape's `type`). Migrators read and write individual
/// fields and never interpret the rest of the object, so the engine can
/// carry any record shape the application declares.
///
/// # Example
///
/// ```
/// use doc_store::Record;
/// use serde_json::json;
///
/// let record = Record::from_value(json!({
///     "id": "shape:1",
///     "typeName": "shape",
///     "type": "geo",
///     "props": { "w": 100, "h": 100 },
/// }))
/// .unwrap();
///
/// assert_eq!(record.type_name(), Some("shape"));
/// assert_eq!(record.discriminant("type"), Some("geo"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing JSON object map.
    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// Wrap a JSON value, returning `None` if it is not an object.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    /// The record's `id` field, if present and a string.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.str_field("id")
    }

    /// The record's `typeName` field, if present and a string.
    #[must_use]
    pub fn type_name(&self) -> Option<&str> {
        self.str_field("typeName")
    }

    /// The subtype discriminant stored under `key`, if present and a string.
    #[must_use]
    pub fn discriminant(&self, key: &str) -> Option<&str> {
        self.str_field(key)
    }

    fn str_field(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(Value::as_str)
    }

    /// Get a field value.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Get a mutable field value.
    pub fn get_mut(&mut self, field: &str) -> Option<&mut Value> {
        self.0.get_mut(field)
    }

    /// Set a field, returning the previous value if any.
    pub fn insert(&mut self, field: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(field.into(), value)
    }

    /// Remove a field, returning its value if it was present.
    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.0.remove(field)
    }

    /// Whether the record has a field with this name.
    #[must_use]
    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Borrow the underlying object map.
    #[must_use]
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Mutably borrow the underlying object map.
    pub fn as_map_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.0
    }

    /// Unwrap into a JSON value.
    #[must_use]
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Map<String, Value>> for Record {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        record.into_value()
    }
}
