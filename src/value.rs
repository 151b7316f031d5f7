//! Literal values and deferred expressions.
//!
//! `Value` is the ordered literal structure that resource state and
//! parameter defaults are made of. During the build, variable references
//! inside literals are rewritten into [`DeferredValue`]s; the external
//! state-resolution layer evaluates those at execution time.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The function name of a variable-reference deferred expression.
pub const REF_FUNCTION: &str = "$";

/// The function name of a `lookup` deferred expression.
pub const LOOKUP_FUNCTION: &str = "lookup";

/// A literal value. Maps preserve declaration order.
///
/// Serialized untagged; a deferred expression reads as its
/// `{function, arguments}` map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Deferred(DeferredValue),
    Map(IndexMap<String, Value>),
}

/// A symbolic call standing in for a value resolved only at execution
/// time: a function name plus an ordered argument list.
///
/// Two producers exist at build time: variable references (`"$region"`
/// becomes a single-argument `$` call referencing `region`) and `lookup`
/// directives in structured parameter declarations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeferredValue {
    pub function: String,
    pub arguments: Vec<Value>,
}

impl DeferredValue {
    pub fn new(function: impl Into<String>, arguments: Vec<Value>) -> Self {
        Self {
            function: function.into(),
            arguments,
        }
    }

    /// A deferred reference to the named variable.
    pub fn reference(name: impl Into<String>) -> Self {
        Self {
            function: REF_FUNCTION.to_string(),
            arguments: vec![Value::String(name.into())],
        }
    }

    /// A deferred `lookup` call.
    pub fn lookup(arguments: Vec<Value>) -> Self {
        Self {
            function: LOOKUP_FUNCTION.to_string(),
            arguments,
        }
    }

    /// The referenced variable name, when this is a reference expression.
    pub fn reference_name(&self) -> Option<&str> {
        if self.function == REF_FUNCTION && self.arguments.len() == 1 {
            if let Value::String(name) = &self.arguments[0] {
                return Some(name);
            }
        }
        None
    }
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    /// A short name for the value's shape, used in diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "Null",
            Value::Bool(_) => "Boolean",
            Value::Int(_) => "Integer",
            Value::Float(_) => "Float",
            Value::String(_) => "String",
            Value::List(_) => "List",
            Value::Map(_) => "Map",
            Value::Deferred(_) => "Deferred",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(s) => f.write_str(&s),
            Err(_) => f.write_str(self.kind_name()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}
