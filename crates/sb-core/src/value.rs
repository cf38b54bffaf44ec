use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Plain data crossing the boundary by copy: function arguments, call
/// results, and root-table entries that are not bound host objects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BridgeValue {
    Unit,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<BridgeValue>),
    Map(BTreeMap<String, BridgeValue>),
}

impl BridgeValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Unit => "unit",
            Self::Bool(_) => "boolean",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Array(_) => "array",
            Self::Map(_) => "map",
        }
    }
}

impl From<bool> for BridgeValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for BridgeValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i64> for BridgeValue {
    fn from(value: i64) -> Self {
        Self::Number(value as f64)
    }
}

impl From<&str> for BridgeValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for BridgeValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}
