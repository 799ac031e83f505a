//! serde bridge between [`Element`] trees and JSON / YAML text.

use crate::coercion::non_finite_name;
use crate::error::MappingError;
use crate::nodes::{Element, NodeType};
use crate::value::Value;
use serde::ser::{Error as _, SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

impl Serialize for Element {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self.node_type {
            NodeType::Value => self.value.serialize(serializer),
            NodeType::Array => {
                let mut seq = serializer.serialize_seq(Some(self.children.len()))?;
                for child in &self.children {
                    seq.serialize_element(child)?;
                }
                seq.end()
            }
            NodeType::Object | NodeType::Dictionary => {
                let mut map = serializer.serialize_map(Some(self.children.len()))?;
                for child in &self.children {
                    map.serialize_entry(child.name.as_deref().unwrap_or_default(), child)?;
                }
                map.end()
            }
        }
    }
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Char(c) => serializer.serialize_char(*c),
            Value::I8(n) => serializer.serialize_i8(*n),
            Value::I16(n) => serializer.serialize_i16(*n),
            Value::I32(n) => serializer.serialize_i32(*n),
            Value::I64(n) => serializer.serialize_i64(*n),
            Value::U8(n) => serializer.serialize_u8(*n),
            Value::U16(n) => serializer.serialize_u16(*n),
            Value::U32(n) => serializer.serialize_u32(*n),
            Value::U64(n) => serializer.serialize_u64(*n),
            // Text formats have no literal for these; JSON would write null.
            Value::F32(n) if !n.is_finite() => serializer.serialize_str(non_finite_name(f64::from(*n))),
            Value::F64(n) if !n.is_finite() => serializer.serialize_str(non_finite_name(*n)),
            Value::F32(n) => serializer.serialize_f32(*n),
            Value::F64(n) => serializer.serialize_f64(*n),
            Value::String(s) => serializer.serialize_str(s),
            Value::Enum(value) => serializer.serialize_str(value.name()),
            Value::Node(element) => element.serialize(serializer),
            Value::Instance(instance) => Err(S::Error::custom(format!(
                "an instance of '{}' must be mapped to nodes before it is encoded",
                instance.ty().name()
            ))),
            // Remaining scalars encode through their canonical text form.
            other => serializer.collect_str(other),
        }
    }
}

impl Element {
    /// Encodes the tree as pretty-printed JSON.
    ///
    /// # Errors
    /// Returns [`MappingError::Codec`] if the tree holds unencodable values.
    pub fn to_json(&self) -> Result<String, MappingError> {
        serde_json::to_string_pretty(self).map_err(|e| MappingError::codec("json", e))
    }

    /// Encodes the tree as YAML.
    ///
    /// # Errors
    /// Returns [`MappingError::Codec`] if the tree holds unencodable values.
    pub fn to_yaml(&self) -> Result<String, MappingError> {
        serde_yaml::to_string(self).map_err(|e| MappingError::codec("yaml", e))
    }

    /// Parses JSON text into an unnamed element tree. Objects become object
    /// nodes with named children, arrays become array nodes.
    ///
    /// # Errors
    /// Returns [`MappingError::Codec`] if the text is not valid JSON.
    pub fn from_json(text: &str) -> Result<Element, MappingError> {
        let json: serde_json::Value =
            serde_json::from_str(text).map_err(|e| MappingError::codec("json", e))?;
        Ok(from_json_value(json))
    }
}

fn from_json_value(json: serde_json::Value) -> Element {
    match json {
        serde_json::Value::Null => Element::null(),
        serde_json::Value::Bool(b) => Element::scalar(Value::Bool(b)),
        serde_json::Value::Number(n) => Element::scalar(number(&n)),
        serde_json::Value::String(s) => Element::scalar(Value::String(s)),
        serde_json::Value::Array(items) => {
            Element::array().with_children(items.into_iter().map(from_json_value))
        }
        serde_json::Value::Object(members) => Element::object().with_children(
            members
                .into_iter()
                .map(|(name, value)| from_json_value(value).named(name)),
        ),
    }
}

fn number(n: &serde_json::Number) -> Value {
    if let Some(i) = n.as_i64() {
        Value::I64(i)
    } else if let Some(u) = n.as_u64() {
        Value::U64(u)
    } else {
        Value::F64(n.as_f64().unwrap_or(f64::NAN))
    }
}
