use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Map, Number, Value};
use uuid::Uuid;

/// Primary key field carried by every stored record
pub const ID_FIELD: &str = "id";

/// Longest field name a stored column can carry (Postgres identifier limit)
pub const MAX_FIELD_NAME_LEN: usize = 63;

/// A single cell of a record. Stored rows only ever hold text, numbers or null.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Number(Number),
    Null,
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Text form used when matching against a search query
    pub fn search_text(&self) -> Option<String> {
        match self {
            FieldValue::Text(s) => Some(s.clone()),
            FieldValue::Number(n) => Some(n.to_string()),
            FieldValue::Null => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Text(s) => Value::String(s.clone()),
            FieldValue::Number(n) => Value::Number(n.clone()),
            FieldValue::Null => Value::Null,
        }
    }
}

impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => FieldValue::Null,
            Value::String(s) => FieldValue::Text(s),
            Value::Number(n) => FieldValue::Number(n),
            // Booleans and nested structures are kept as their JSON text
            Value::Bool(b) => FieldValue::Text(b.to_string()),
            other => FieldValue::Text(other.to_string()),
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

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FieldValue::Text(s) => serializer.serialize_str(s),
            FieldValue::Number(n) => n.serialize(serializer),
            FieldValue::Null => serializer.serialize_unit(),
        }
    }
}

/// Errors that can occur while converting input into a Record
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("Invalid JSON format: {0}")]
    InvalidJson(String),
    #[error("Missing required field: {0}")]
    MissingRequiredField(&'static str),
    #[error("Invalid field name '{0}': must be 1 to 63 bytes")]
    InvalidFieldName(String),
}

/// Field names must be non-empty and fit in a column identifier
pub fn check_field_name(name: &str) -> Result<(), RecordError> {
    if name.is_empty() || name.len() > MAX_FIELD_NAME_LEN {
        return Err(RecordError::InvalidFieldName(name.to_string()));
    }
    Ok(())
}

/// One row of the active table: field names in insertion order mapped to values
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: Vec<(String, FieldValue)>,
}

impl Record {
    /// Create a new empty record
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Parse a raw request body into a record
    pub fn from_json_str(body: &str) -> Result<Self, RecordError> {
        let value: Value =
            serde_json::from_str(body).map_err(|e| RecordError::InvalidJson(e.to_string()))?;
        Self::from_json(value)
    }

    /// Create record from a JSON object; extra fields pass through unchanged
    pub fn from_json(json: Value) -> Result<Self, RecordError> {
        match json {
            Value::Object(map) => {
                for key in map.keys() {
                    check_field_name(key)?;
                }
                Ok(Self::from_stored(map))
            }
            _ => Err(RecordError::InvalidJson("Expected JSON object".to_string())),
        }
    }

    /// Create record from a row the store handed back
    pub fn from_stored(map: Map<String, Value>) -> Self {
        let mut record = Self::new();
        for (key, value) in map {
            record.set(key, FieldValue::from(value));
        }
        record
    }

    /// Get field value
    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|(name, _)| name == key).map(|(_, value)| value)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Set field value, keeping the original position of an existing field
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> &mut Self {
        let key = key.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(name, _)| *name == key) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((key, value)),
        }
        self
    }

    /// Remove field and return its value
    pub fn remove(&mut self, key: &str) -> Option<FieldValue> {
        let index = self.fields.iter().position(|(name, _)| name == key)?;
        Some(self.fields.remove(index).1)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Fields other than the primary key
    pub fn data_fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields().filter(|(name, _)| *name != ID_FIELD)
    }

    // ========================================
    // Identifier handling
    // ========================================

    /// Get record ID, if it carries a usable one
    pub fn id(&self) -> Option<&str> {
        self.get(ID_FIELD)
            .and_then(FieldValue::as_text)
            .filter(|id| !id.trim().is_empty())
    }

    /// Numeric ids become text; null or blank ids are dropped
    fn normalize_id(&mut self) {
        match self.get(ID_FIELD) {
            Some(FieldValue::Number(n)) => {
                let text = n.to_string();
                self.set(ID_FIELD, FieldValue::Text(text));
            }
            Some(FieldValue::Null) => {
                self.remove(ID_FIELD);
            }
            Some(FieldValue::Text(s)) if s.trim().is_empty() => {
                self.remove(ID_FIELD);
            }
            _ => {}
        }
    }

    /// Normalize the id, generating a fresh one when none was supplied
    pub fn with_assigned_id(mut self) -> Self {
        self.normalize_id();
        if !self.contains(ID_FIELD) {
            self.fields.insert(0, (ID_FIELD.to_string(), FieldValue::Text(Uuid::new_v4().to_string())));
        }
        self
    }

    /// Normalize the id and fail if the record does not carry one
    pub fn require_id(mut self) -> Result<Self, RecordError> {
        self.normalize_id();
        if self.contains(ID_FIELD) {
            Ok(self)
        } else {
            Err(RecordError::MissingRequiredField(ID_FIELD))
        }
    }

    // ========================================
    // Serialization
    // ========================================

    /// Convert to a JSON object (all fields)
    pub fn to_json(&self) -> Value {
        Value::Object(self.to_map())
    }

    /// Convert to serde_json::Map
    pub fn to_map(&self) -> Map<String, Value> {
        self.fields.iter().map(|(k, v)| (k.clone(), v.to_json())).collect()
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl From<Map<String, Value>> for Record {
    fn from(map: Map<String, Value>) -> Self {
        Self::from_stored(map)
    }
}

impl<K: Into<String>, V: Into<FieldValue>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Self::new();
        for (key, value) in iter {
            record.set(key, value);
        }
        record
    }
}

impl std::fmt::Display for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Record(id: {:?}, fields: {})", self.id(), self.fields.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_object_and_keeps_field_order() {
        let record =
            Record::from_json_str(r#"{"title":"Abbey Road","artist":"The Beatles","year":1969}"#)
                .unwrap();

        let names: Vec<&str> = record.field_names().collect();
        assert_eq!(names, vec!["title", "artist", "year"]);
        assert_eq!(record.get("year"), Some(&FieldValue::Number(1969.into())));
        assert_eq!(
            serde_json::to_string(&record).unwrap(),
            r#"{"title":"Abbey Road","artist":"The Beatles","year":1969}"#
        );
    }

    #[test]
    fn rejects_non_object_payloads() {
        assert!(matches!(Record::from_json(json!([1, 2])), Err(RecordError::InvalidJson(_))));
        assert!(matches!(Record::from_json_str("{not json"), Err(RecordError::InvalidJson(_))));
    }

    #[test]
    fn booleans_and_nested_values_become_text() {
        let record = Record::from_json(json!({"live": true, "tags": ["rock", "pop"]})).unwrap();
        assert_eq!(record.get("live"), Some(&FieldValue::Text("true".into())));
        assert_eq!(record.get("tags"), Some(&FieldValue::Text(r#"["rock","pop"]"#.into())));
    }

    #[test]
    fn assigns_id_only_when_missing() {
        let generated = Record::from_json(json!({"title": "Help!"})).unwrap().with_assigned_id();
        let id = generated.id().expect("generated id");
        assert!(Uuid::parse_str(id).is_ok());
        assert_eq!(generated.field_names().next(), Some(ID_FIELD));

        let kept = Record::from_json(json!({"id": "abc", "title": "Help!"})).unwrap().with_assigned_id();
        assert_eq!(kept.id(), Some("abc"));

        let blank = Record::from_json(json!({"id": "  "})).unwrap().with_assigned_id();
        assert_ne!(blank.id(), Some("  "));
        assert!(blank.id().is_some());
    }

    #[test]
    fn numeric_ids_are_normalized_to_text() {
        let record = Record::from_json(json!({"id": 42, "title": "Revolver"})).unwrap().require_id().unwrap();
        assert_eq!(record.id(), Some("42"));
        assert_eq!(record.to_json(), json!({"id": "42", "title": "Revolver"}));
    }

    #[test]
    fn require_id_rejects_missing_or_null_id() {
        assert!(matches!(
            Record::from_json(json!({"title": "Let It Be"})).unwrap().require_id(),
            Err(RecordError::MissingRequiredField("id"))
        ));
        assert!(Record::from_json(json!({"id": null})).unwrap().require_id().is_err());
    }

    #[test]
    fn set_replaces_in_place() {
        let mut record: Record = vec![("id", "1"), ("title", "Rubber Soul")].into_iter().collect();
        record.set("title", "Revolver");
        assert_eq!(record.len(), 2);
        assert_eq!(record.get("title").and_then(FieldValue::as_text), Some("Revolver"));
        assert_eq!(record.data_fields().count(), 1);
    }

    #[test]
    fn rejects_field_names_no_column_can_hold() {
        assert!(matches!(
            Record::from_json(json!({"": "blank"})),
            Err(RecordError::InvalidFieldName(name)) if name.is_empty()
        ));
        let with_key = |key: String| {
            let mut map = Map::new();
            map.insert(key, json!("value"));
            Value::Object(map)
        };
        assert!(Record::from_json(with_key("x".repeat(MAX_FIELD_NAME_LEN + 1))).is_err());
        assert!(Record::from_json(with_key("x".repeat(MAX_FIELD_NAME_LEN))).is_ok());
    }

    #[test]
    fn empty_record_serializes_as_empty_object() {
        assert_eq!(serde_json::to_string(&Record::new()).unwrap(), "{}");
    }
}
