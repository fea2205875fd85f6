use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

use crate::ids::to_hex;

/// String-keyed attribute map; key order is stable so stored documents are deterministic.
pub type Attributes = BTreeMap<String, AttrValue>;

/// Dynamic attribute value, mirroring the OTLP `AnyValue` union.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum AttrValue {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Bytes(Vec<u8>),
    Map(Attributes),
    List(Vec<AttrValue>),
}

impl AttrValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Self::String(s) => Value::String(s.clone()),
            Self::Int(i) => Value::Number((*i).into()),
            Self::Float(f) => Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or_else(|| Value::String(f.to_string())),
            Self::Bool(b) => Value::Bool(*b),
            Self::Bytes(b) => Value::String(to_hex(b)),
            Self::Map(m) => Value::Object(
                m.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            Self::List(items) => Value::Array(items.iter().map(AttrValue::to_json).collect()),
        }
    }

    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Null => Self::String(String::new()),
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => Self::Float(n.as_f64().unwrap_or_default()),
            },
            Value::String(s) => Self::String(s),
            Value::Array(items) => Self::List(items.into_iter().map(Self::from_json).collect()),
            Value::Object(map) => Self::Map(
                map.into_iter()
                    .map(|(k, v)| (k, Self::from_json(v)))
                    .collect(),
            ),
        }
    }
}

impl From<Value> for AttrValue {
    fn from(value: Value) -> Self {
        Self::from_json(value)
    }
}

impl From<AttrValue> for Value {
    fn from(value: AttrValue) -> Self {
        value.to_json()
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for AttrValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// New map holding `base` with `overlay` applied on top. Neither input is modified.
pub fn merge_attributes(base: Option<&Attributes>, overlay: Option<&Attributes>) -> Attributes {
    let mut out = base.cloned().unwrap_or_default();
    if let Some(overlay) = overlay {
        out.extend(overlay.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
    out
}
