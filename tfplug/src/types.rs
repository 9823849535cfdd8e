//! Core value types for tfplug
//!
//! Terraform hands configuration to providers as dynamically typed objects in
//! which any attribute may be null or not yet known. This module provides the
//! `Dynamic` value model, its msgpack/JSON codecs, attribute paths and
//! diagnostics.

use crate::error::{Result, TfplugError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Marker for values Terraform cannot resolve yet, in the JSON encoding
pub const UNKNOWN_SENTINEL: &str = "74D93920-ED26-11E3-AC10-0800200C9A66";

/// msgpack extension type Terraform uses for unknown values
pub const UNKNOWN_EXT_TYPE: i8 = 0;

const MSGPACK_EXT_STRUCT_NAME: &str = "_ExtStruct";

/// Dynamic represents a Terraform value of any type
#[derive(Debug, Clone, PartialEq)]
pub enum Dynamic {
    Null,
    Bool(bool),
    /// All Terraform numbers are carried as f64
    Number(f64),
    String(String),
    List(Vec<Dynamic>),
    /// Objects and maps share this representation
    Map(BTreeMap<String, Dynamic>),
    /// Value not yet known, e.g. it depends on a resource that is not applied
    Unknown,
}

impl Dynamic {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Dynamic::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Dynamic::Null)
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Dynamic::Unknown)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Dynamic::Null => "null",
            Dynamic::Bool(_) => "bool",
            Dynamic::Number(_) => "number",
            Dynamic::String(_) => "string",
            Dynamic::List(_) => "list",
            Dynamic::Map(_) => "map",
            Dynamic::Unknown => "unknown",
        }
    }
}

impl From<&str> for Dynamic {
    fn from(value: &str) -> Self {
        Dynamic::String(value.to_string())
    }
}

impl From<String> for Dynamic {
    fn from(value: String) -> Self {
        Dynamic::String(value)
    }
}

impl From<bool> for Dynamic {
    fn from(value: bool) -> Self {
        Dynamic::Bool(value)
    }
}

impl Serialize for Dynamic {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            Dynamic::Null => serializer.serialize_unit(),
            Dynamic::Bool(b) => serializer.serialize_bool(*b),
            Dynamic::Number(n) => serializer.serialize_f64(*n),
            Dynamic::String(s) => serializer.serialize_str(s),
            Dynamic::List(items) => items.serialize(serializer),
            Dynamic::Map(entries) => entries.serialize(serializer),
            Dynamic::Unknown if serializer.is_human_readable() => {
                serializer.serialize_str(UNKNOWN_SENTINEL)
            }
            Dynamic::Unknown => serializer.serialize_newtype_struct(
                MSGPACK_EXT_STRUCT_NAME,
                &(UNKNOWN_EXT_TYPE, ExtData(vec![0])),
            ),
        }
    }
}

impl<'de> Deserialize<'de> for Dynamic {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::{Error, MapAccess, SeqAccess, Visitor};
        use std::fmt;

        struct DynamicVisitor {
            human_readable: bool,
        }

        impl DynamicVisitor {
            fn string(&self, value: String) -> Dynamic {
                if self.human_readable && value == UNKNOWN_SENTINEL {
                    Dynamic::Unknown
                } else {
                    Dynamic::String(value)
                }
            }
        }

        impl<'de> Visitor<'de> for DynamicVisitor {
            type Value = Dynamic;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a terraform value")
            }

            fn visit_unit<E: Error>(self) -> std::result::Result<Dynamic, E> {
                Ok(Dynamic::Null)
            }

            fn visit_none<E: Error>(self) -> std::result::Result<Dynamic, E> {
                Ok(Dynamic::Null)
            }

            fn visit_some<D2>(self, inner: D2) -> std::result::Result<Dynamic, D2::Error>
            where
                D2: serde::Deserializer<'de>,
            {
                Dynamic::deserialize(inner)
            }

            fn visit_bool<E: Error>(self, v: bool) -> std::result::Result<Dynamic, E> {
                Ok(Dynamic::Bool(v))
            }

            fn visit_i64<E: Error>(self, v: i64) -> std::result::Result<Dynamic, E> {
                Ok(Dynamic::Number(v as f64))
            }

            fn visit_u64<E: Error>(self, v: u64) -> std::result::Result<Dynamic, E> {
                Ok(Dynamic::Number(v as f64))
            }

            fn visit_f64<E: Error>(self, v: f64) -> std::result::Result<Dynamic, E> {
                Ok(Dynamic::Number(v))
            }

            fn visit_str<E: Error>(self, v: &str) -> std::result::Result<Dynamic, E> {
                Ok(self.string(v.to_string()))
            }

            fn visit_string<E: Error>(self, v: String) -> std::result::Result<Dynamic, E> {
                Ok(self.string(v))
            }

            /// rmp-serde surfaces msgpack extension values as a newtype struct
            /// wrapping `(type, data)`
            fn visit_newtype_struct<D2>(self, inner: D2) -> std::result::Result<Dynamic, D2::Error>
            where
                D2: serde::Deserializer<'de>,
            {
                let (ext_type, _data) = <(i8, ExtData)>::deserialize(inner)?;
                if ext_type == UNKNOWN_EXT_TYPE {
                    Ok(Dynamic::Unknown)
                } else {
                    Err(D2::Error::custom(format!(
                        "unsupported msgpack extension type {}",
                        ext_type
                    )))
                }
            }

            fn visit_seq<A: SeqAccess<'de>>(
                self,
                mut seq: A,
            ) -> std::result::Result<Dynamic, A::Error> {
                let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
                while let Some(item) = seq.next_element()? {
                    items.push(item);
                }
                Ok(Dynamic::List(items))
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                mut map: A,
            ) -> std::result::Result<Dynamic, A::Error> {
                let mut entries = BTreeMap::new();
                while let Some((key, value)) = map.next_entry::<String, Dynamic>()? {
                    entries.insert(key, value);
                }
                Ok(Dynamic::Map(entries))
            }
        }

        let human_readable = deserializer.is_human_readable();
        deserializer.deserialize_any(DynamicVisitor { human_readable })
    }
}

/// Payload of a msgpack extension value
struct ExtData(Vec<u8>);

impl Serialize for ExtData {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_bytes(&self.0)
    }
}

impl<'de> Deserialize<'de> for ExtData {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::{Error, SeqAccess, Visitor};
        use std::fmt;

        struct BytesVisitor;

        impl<'de> Visitor<'de> for BytesVisitor {
            type Value = ExtData;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("extension bytes")
            }

            fn visit_bytes<E: Error>(self, v: &[u8]) -> std::result::Result<ExtData, E> {
                Ok(ExtData(v.to_vec()))
            }

            fn visit_byte_buf<E: Error>(self, v: Vec<u8>) -> std::result::Result<ExtData, E> {
                Ok(ExtData(v))
            }

            fn visit_seq<A: SeqAccess<'de>>(
                self,
                mut seq: A,
            ) -> std::result::Result<ExtData, A::Error> {
                let mut bytes = Vec::new();
                while let Some(byte) = seq.next_element()? {
                    bytes.push(byte);
                }
                Ok(ExtData(bytes))
            }
        }

        deserializer.deserialize_bytes(BytesVisitor)
    }
}

/// DynamicValue is a config or state object exchanged with Terraform
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicValue {
    pub value: Dynamic,
}

impl DynamicValue {
    pub fn new(value: Dynamic) -> Self {
        Self { value }
    }

    pub fn null() -> Self {
        Self::new(Dynamic::Null)
    }

    pub fn unknown() -> Self {
        Self::new(Dynamic::Unknown)
    }

    /// Empty object, the usual starting point for building state
    pub fn object() -> Self {
        Self::new(Dynamic::Map(BTreeMap::new()))
    }

    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<Dynamic>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self::new(Dynamic::Map(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        ))
    }

    pub fn is_null(&self) -> bool {
        self.value.is_null()
    }

    pub fn is_unknown(&self) -> bool {
        self.value.is_unknown()
    }

    /// Terraform's default wire encoding. Unknown values become extension
    /// type 0.
    pub fn encode_msgpack(&self) -> Result<Vec<u8>> {
        rmp_serde::encode::to_vec_named(&self.value)
            .map_err(|e| TfplugError::EncodingError(format!("msgpack encoding failed: {}", e)))
    }

    pub fn decode_msgpack(data: &[u8]) -> Result<Self> {
        if data.is_empty() {
            return Ok(Self::null());
        }

        let value = rmp_serde::decode::from_slice::<Dynamic>(data)
            .map_err(|e| TfplugError::DecodingError(format!("msgpack decoding failed: {}", e)))?;
        Ok(Self { value })
    }

    /// Unknown values become the `UNKNOWN_SENTINEL` string
    pub fn encode_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(&self.value)
            .map_err(|e| TfplugError::EncodingError(format!("json encoding failed: {}", e)))
    }

    pub fn decode_json(data: &[u8]) -> Result<Self> {
        if data.is_empty() {
            return Ok(Self::null());
        }

        let value = serde_json::from_slice(data)
            .map_err(|e| TfplugError::DecodingError(format!("json decoding failed: {}", e)))?;
        Ok(Self { value })
    }

    /// Raw access that keeps null and unknown intact
    pub fn get(&self, path: &AttributePath) -> Result<&Dynamic> {
        let mut current = &self.value;

        for step in &path.steps {
            current = match (current, step) {
                (Dynamic::Map(entries), AttributePathStep::AttributeName(name)) => entries
                    .get(name)
                    .ok_or_else(|| TfplugError::AttributeNotFound(path.to_string()))?,
                (Dynamic::List(items), AttributePathStep::ElementKeyInt(idx)) => usize::try_from(
                    *idx,
                )
                .ok()
                .and_then(|idx| items.get(idx))
                .ok_or_else(|| TfplugError::AttributeNotFound(path.to_string()))?,
                (other, _) => {
                    return Err(TfplugError::TypeMismatch {
                        expected: "map or list".to_string(),
                        actual: other.type_name().to_string(),
                    })
                }
            };
        }

        Ok(current)
    }

    /// Like `get`, but treats a missing attribute as null
    pub fn get_or_null(&self, path: &AttributePath) -> Result<Dynamic> {
        match self.get(path) {
            Ok(value) => Ok(value.clone()),
            Err(TfplugError::AttributeNotFound(_)) => Ok(Dynamic::Null),
            Err(e) => Err(e),
        }
    }

    pub fn get_string(&self, path: &AttributePath) -> Result<String> {
        match self.get(path)? {
            Dynamic::String(s) => Ok(s.clone()),
            other => Err(TfplugError::TypeMismatch {
                expected: "string".to_string(),
                actual: other.type_name().to_string(),
            }),
        }
    }

    pub fn set_string(&mut self, path: &AttributePath, value: impl Into<String>) -> Result<()> {
        self.set(path, Dynamic::String(value.into()))
    }

    /// Sets a value, creating intermediate objects along attribute steps
    pub fn set(&mut self, path: &AttributePath, value: Dynamic) -> Result<()> {
        let Some((last, parents)) = path.steps.split_last() else {
            self.value = value;
            return Ok(());
        };

        if self.value.is_null() {
            self.value = Dynamic::Map(BTreeMap::new());
        }

        let mut current = &mut self.value;
        for step in parents {
            current = match (current, step) {
                (Dynamic::Map(entries), AttributePathStep::AttributeName(name)) => entries
                    .entry(name.clone())
                    .or_insert_with(|| Dynamic::Map(BTreeMap::new())),
                (Dynamic::List(items), AttributePathStep::ElementKeyInt(idx)) => {
                    let len = items.len();
                    usize::try_from(*idx)
                        .ok()
                        .and_then(|idx| items.get_mut(idx))
                        .ok_or_else(|| {
                            TfplugError::Custom(format!(
                                "list index {} out of bounds ({})",
                                idx, len
                            ))
                        })?
                }
                (other, _) => {
                    return Err(TfplugError::TypeMismatch {
                        expected: "map or list".to_string(),
                        actual: other.type_name().to_string(),
                    })
                }
            };
        }

        match (current, last) {
            (Dynamic::Map(entries), AttributePathStep::AttributeName(name)) => {
                entries.insert(name.clone(), value);
                Ok(())
            }
            (Dynamic::List(items), AttributePathStep::ElementKeyInt(idx)) => {
                let len = items.len();
                let slot = usize::try_from(*idx)
                    .ok()
                    .and_then(|idx| items.get_mut(idx))
                    .ok_or_else(|| {
                        TfplugError::Custom(format!("list index {} out of bounds ({})", idx, len))
                    })?;
                *slot = value;
                Ok(())
            }
            (other, _) => Err(TfplugError::TypeMismatch {
                expected: "map or list".to_string(),
                actual: other.type_name().to_string(),
            }),
        }
    }
}

/// AttributePath points at an attribute within a DynamicValue
#[derive(Debug, Clone, PartialEq)]
pub struct AttributePath {
    pub steps: Vec<AttributePathStep>,
}

impl AttributePath {
    pub fn new(name: &str) -> Self {
        Self {
            steps: vec![AttributePathStep::AttributeName(name.to_string())],
        }
    }

    pub fn attribute(mut self, name: &str) -> Self {
        self.steps
            .push(AttributePathStep::AttributeName(name.to_string()));
        self
    }

    pub fn index(mut self, idx: i64) -> Self {
        self.steps.push(AttributePathStep::ElementKeyInt(idx));
        self
    }
}

impl std::fmt::Display for AttributePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, step) in self.steps.iter().enumerate() {
            match step {
                AttributePathStep::AttributeName(name) if i == 0 => write!(f, "{}", name)?,
                AttributePathStep::AttributeName(name) => write!(f, ".{}", name)?,
                AttributePathStep::ElementKeyInt(idx) => write!(f, "[{}]", idx)?,
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttributePathStep {
    AttributeName(String),
    ElementKeyInt(i64),
}

/// Diagnostic is a user-visible error or warning returned to Terraform
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub severity: DiagnosticSeverity,
    pub summary: String,
    pub detail: String,
    pub attribute: Option<AttributePath>,
}

impl Diagnostic {
    pub fn error(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Error,
            summary: summary.into(),
            detail: detail.into(),
            attribute: None,
        }
    }

    pub fn warning(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Warning,
            summary: summary.into(),
            detail: detail.into(),
            attribute: None,
        }
    }

    pub fn with_attribute(mut self, path: AttributePath) -> Self {
        self.attribute = Some(path);
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == DiagnosticSeverity::Error
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticSeverity {
    Error,
    Warning,
}

/// True when any diagnostic in the slice is an error
pub fn has_errors(diagnostics: &[Diagnostic]) -> bool {
    diagnostics.iter().any(Diagnostic::is_error)
}

/// Config represents configuration values
pub type Config = DynamicValue;

/// State represents data source state values
pub type State = DynamicValue;

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;

    #[test]
    fn dynamic_value_string_access() {
        let mut dv = DynamicValue::object();
        dv.set_string(&AttributePath::new("name"), "test").unwrap();

        assert_eq!(dv.get_string(&AttributePath::new("name")).unwrap(), "test");
    }

    #[test]
    fn dynamic_value_nested_access() {
        let mut dv = DynamicValue::null();
        let path = AttributePath::new("config").attribute("endpoint");
        dv.set_string(&path, "https://example.com").unwrap();

        assert_eq!(dv.get_string(&path).unwrap(), "https://example.com");
    }

    #[test]
    fn list_index_access() {
        let dv = DynamicValue::from_pairs([(
            "tags",
            Dynamic::List(vec![Dynamic::from("a"), Dynamic::from("b")]),
        )]);

        let path = AttributePath::new("tags").index(1);
        assert_eq!(dv.get_string(&path).unwrap(), "b");
        assert!(dv.get(&AttributePath::new("tags").index(5)).is_err());
    }

    #[test]
    fn missing_attribute_reads_as_null() {
        let dv = DynamicValue::object();

        assert!(matches!(
            dv.get(&AttributePath::new("token")),
            Err(TfplugError::AttributeNotFound(_))
        ));
        assert_eq!(
            dv.get_or_null(&AttributePath::new("token")).unwrap(),
            Dynamic::Null
        );
    }

    #[test]
    fn get_string_reports_type_mismatch() {
        let dv = DynamicValue::from_pairs([("trace", true)]);

        match dv.get_string(&AttributePath::new("trace")) {
            Err(TfplugError::TypeMismatch { expected, actual }) => {
                assert_eq!(expected, "string");
                assert_eq!(actual, "bool");
            }
            other => panic!("expected type mismatch, got {:?}", other),
        }
    }

    #[test]
    fn msgpack_preserves_null_and_unknown() {
        let mut dv = DynamicValue::object();
        dv.set(&AttributePath::new("token"), Dynamic::Unknown).unwrap();
        dv.set(&AttributePath::new("secret"), Dynamic::Null).unwrap();
        dv.set_string(&AttributePath::new("api_root_url"), "https://example.com")
            .unwrap();

        let decoded = DynamicValue::decode_msgpack(&dv.encode_msgpack().unwrap()).unwrap();

        assert_eq!(decoded, dv);
        assert!(decoded.get(&AttributePath::new("token")).unwrap().is_unknown());
        assert!(decoded.get(&AttributePath::new("secret")).unwrap().is_null());
    }

    #[test]
    fn msgpack_unknown_is_extension_zero() {
        // fixmap{ "token": fixext1(0, 0x00) }
        let bytes = [0x81, 0xa5, b't', b'o', b'k', b'e', b'n', 0xd4, 0x00, 0x00];

        let decoded = DynamicValue::decode_msgpack(&bytes).unwrap();
        assert!(decoded.get(&AttributePath::new("token")).unwrap().is_unknown());

        let encoded = DynamicValue::from_pairs([("token", Dynamic::Unknown)])
            .encode_msgpack()
            .unwrap();
        assert_eq!(encoded, bytes);
    }

    #[test]
    fn msgpack_sentinel_string_stays_a_string() {
        let dv = DynamicValue::from_pairs([("token", UNKNOWN_SENTINEL)]);
        let decoded = DynamicValue::decode_msgpack(&dv.encode_msgpack().unwrap()).unwrap();

        assert_eq!(
            decoded.get_string(&AttributePath::new("token")).unwrap(),
            UNKNOWN_SENTINEL
        );
    }

    #[test]
    fn msgpack_rejects_other_extension_types() {
        let bytes = [0xd4, 0x05, 0x00];
        assert!(matches!(
            DynamicValue::decode_msgpack(&bytes),
            Err(TfplugError::DecodingError(_))
        ));
    }

    #[test]
    fn json_carries_unknown_as_sentinel() {
        let dv = DynamicValue::from_pairs([("token", Dynamic::Unknown), ("secret", Dynamic::Null)]);

        let encoded = dv.encode_json().unwrap();
        assert_eq!(
            String::from_utf8(encoded.clone()).unwrap(),
            format!(r#"{{"secret":null,"token":"{}"}}"#, UNKNOWN_SENTINEL)
        );
        assert_eq!(DynamicValue::decode_json(&encoded).unwrap(), dv);
    }

    #[test]
    fn empty_payloads_decode_as_null() {
        assert!(DynamicValue::decode_msgpack(&[]).unwrap().is_null());
        assert!(DynamicValue::decode_json(&[]).unwrap().is_null());
    }

    #[test]
    fn json_decodes_objects() {
        let dv = DynamicValue::decode_json(br#"{"filter":"web","id":null}"#).unwrap();

        assert_eq!(dv.get_string(&AttributePath::new("filter")).unwrap(), "web");
        assert!(dv.get(&AttributePath::new("id")).unwrap().is_null());
    }

    #[test]
    fn invalid_json_is_a_decoding_error() {
        assert!(matches!(
            DynamicValue::decode_json(b"{not json"),
            Err(TfplugError::DecodingError(_))
        ));
    }

    #[test]
    fn attribute_path_display() {
        let path = AttributePath::new("servers").index(0).attribute("nickname");
        assert_eq!(path.to_string(), "servers[0].nickname");
    }

    #[test]
    fn has_errors_ignores_warnings() {
        let diags = vec![Diagnostic::warning("careful", "")];
        assert!(!has_errors(&diags));

        let diags = vec![
            Diagnostic::warning("careful", ""),
            Diagnostic::error("broken", "details"),
        ];
        assert!(has_errors(&diags));
    }
}
