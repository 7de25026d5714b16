//! The wire envelope.
//!
//! An envelope is a flat mapping from string keys to primitive values. It is
//! the unit exchanged in both directions; nested data travels as a serialized
//! string field.

use crate::verbs;
use crate::{ProtocolError, ProtocolResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A primitive value carried by an envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    String(String),
    Int(i32),
    Float(f32),
    Bytes(#[serde(with = "base64_bytes")] Vec<u8>),
}

impl Value {
    /// Name of the value type, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::String(_) => "string",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Bytes(_) => "bytes",
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::Float(value)
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Value::Bytes(value)
    }
}

/// String-keyed bag of primitive values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Envelope {
    fields: BTreeMap<String, Value>,
}

impl Envelope {
    /// Create an empty envelope.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an envelope carrying only a verb.
    pub fn with_verb(verb: &str) -> Self {
        Self::new().with(verbs::VERB, verb)
    }

    /// Insert a field. A repeated key replaces the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(key.into(), value.into())
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// The verb of this envelope, if it carries a string `verb` field.
    pub fn verb(&self) -> Option<&str> {
        self.get_str(verbs::VERB)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        match self.fields.get(key) {
            Some(Value::String(s)) => Some(s),
            _ => None,
        }
    }

    pub fn get_i32(&self, key: &str) -> Option<i32> {
        match self.fields.get(key) {
            Some(Value::Int(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn get_f32(&self, key: &str) -> Option<f32> {
        match self.fields.get(key) {
            Some(Value::Float(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn get_bytes(&self, key: &str) -> Option<&[u8]> {
        match self.fields.get(key) {
            Some(Value::Bytes(v)) => Some(v),
            _ => None,
        }
    }

    /// Read a required string field.
    pub fn require_str(&self, key: &'static str) -> ProtocolResult<&str> {
        match self.fields.get(key) {
            Some(Value::String(s)) => Ok(s),
            Some(other) => Err(wrong_type(key, "string", other)),
            None => Err(ProtocolError::MissingField(key)),
        }
    }

    /// Read a required integer field.
    pub fn require_i32(&self, key: &'static str) -> ProtocolResult<i32> {
        match self.fields.get(key) {
            Some(Value::Int(v)) => Ok(*v),
            Some(other) => Err(wrong_type(key, "int", other)),
            None => Err(ProtocolError::MissingField(key)),
        }
    }

    /// Read a required float field.
    pub fn require_f32(&self, key: &'static str) -> ProtocolResult<f32> {
        match self.fields.get(key) {
            Some(Value::Float(v)) => Ok(*v),
            Some(other) => Err(wrong_type(key, "float", other)),
            None => Err(ProtocolError::MissingField(key)),
        }
    }

    /// Read a required byte-sequence field.
    pub fn require_bytes(&self, key: &'static str) -> ProtocolResult<&[u8]> {
        match self.fields.get(key) {
            Some(Value::Bytes(v)) => Ok(v),
            Some(other) => Err(wrong_type(key, "bytes", other)),
            None => Err(ProtocolError::MissingField(key)),
        }
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

fn wrong_type(field: &'static str, expected: &'static str, actual: &Value) -> ProtocolError {
    ProtocolError::WrongType {
        field,
        expected,
        actual: actual.kind(),
    }
}

mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_write_wins() {
        let mut envelope = Envelope::with_verb("first");
        let previous = envelope.insert(verbs::VERB, "second");

        assert_eq!(previous, Some(Value::String("first".to_string())));
        assert_eq!(envelope.verb(), Some("second"));
        assert_eq!(envelope.len(), 1);
    }

    #[test]
    fn test_typed_getters_reject_other_types() {
        let envelope = Envelope::new()
            .with("count", 5)
            .with("score", 7.9f32)
            .with("label", "ok")
            .with("blob", vec![1u8, 2, 3]);

        assert_eq!(envelope.get_i32("count"), Some(5));
        assert_eq!(envelope.get_str("count"), None);
        assert_eq!(envelope.get_f32("score"), Some(7.9));
        assert_eq!(envelope.get_i32("score"), None);
        assert_eq!(envelope.get_str("label"), Some("ok"));
        assert_eq!(envelope.get_bytes("blob"), Some(&[1u8, 2, 3][..]));
    }

    #[test]
    fn test_require_reports_missing_and_wrong_type() {
        let envelope = Envelope::new().with("count", "five");

        assert!(matches!(
            envelope.require_i32("count"),
            Err(ProtocolError::WrongType {
                field: "count",
                expected: "int",
                actual: "string"
            })
        ));
        assert!(matches!(
            envelope.require_str("absent"),
            Err(ProtocolError::MissingField("absent"))
        ));
    }

    #[test]
    fn test_verb_must_be_a_string() {
        let envelope = Envelope::new().with(verbs::VERB, 12);
        assert_eq!(envelope.verb(), None);
    }

    #[test]
    fn test_json_shape_is_tagged() {
        let envelope = Envelope::with_verb("getimageResults").with("imagebytes", vec![0x89u8, b'P']);
        let json = envelope.to_json().unwrap();

        assert!(json.contains(r#""verb":{"type":"string","value":"getimageResults"}"#));
        assert!(json.contains(r#""imagebytes":{"type":"bytes","value":"iVA="}"#));
    }

    #[test]
    fn test_from_json_decodes_bytes_and_floats() {
        let json = r#"{"blob":{"type":"bytes","value":"AQID"},"score":{"type":"float","value":5.5}}"#;
        let envelope = Envelope::from_json(json).unwrap();

        assert_eq!(envelope.get_bytes("blob"), Some(&[1u8, 2, 3][..]));
        assert_eq!(envelope.get_f32("score"), Some(5.5));
    }

    #[test]
    fn test_from_json_rejects_bad_base64() {
        let json = r#"{"blob":{"type":"bytes","value":"!!!"}}"#;
        assert!(Envelope::from_json(json).is_err());
    }
}
