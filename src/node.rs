//! The normalized source-node representation.
//!
//! Both front-ends funnel into this one shape: the document front-end's
//! deserializer emits it directly, and the DSL front-end lowers its
//! parsed expression tree onto it. All classification, parameter
//! resolution and state building run against `Node` alone, so the two
//! grammars share the entire builder.

use crate::ast::{FunctionDecl, StepStyle};
use crate::error::BuildError;
use crate::span::Span;
use crate::step::Parameter;
use crate::typesys::TypeHandle;
use crate::value::Value;

/// A map key with its own source span, so diagnostics can point at the
/// offending key rather than the whole entry.
#[derive(Debug, Clone)]
pub struct Key {
    pub name: String,
    pub span: Span,
}

impl Key {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            span: Span::default(),
        }
    }

    pub fn with_span(name: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            span,
        }
    }
}

/// One source node: a span, an optional explicit style tag (set only by
/// the DSL front-end), and the node's shape.
#[derive(Debug, Clone)]
pub struct Node {
    pub span: Span,
    pub style: Option<StepStyle>,
    pub payload: Payload,
}

/// Node shapes. Ordered maps preserve declaration order; duplicate keys
/// are a provider-level error and never reach the builder.
#[derive(Debug, Clone)]
pub enum Payload {
    Map(Vec<(Key, Node)>),
    List(Vec<Node>),
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Null,
    /// A callable function body (handler steps, CRUD functions).
    Body(FunctionDecl),
    /// An already-typed parameter passed through a declaration.
    Param(Parameter),
    /// An already-resolved type handle (explicit `type` property in the
    /// DSL front-end).
    Type(TypeHandle),
}

impl Node {
    pub fn new(payload: Payload) -> Self {
        Self {
            span: Span::default(),
            style: None,
            payload,
        }
    }

    pub fn with_span(payload: Payload, span: Span) -> Self {
        Self {
            span,
            style: None,
            payload,
        }
    }

    pub fn with_style(mut self, style: StepStyle) -> Self {
        self.style = Some(style);
        self
    }

    pub fn map(entries: Vec<(Key, Node)>) -> Self {
        Self::new(Payload::Map(entries))
    }

    pub fn list(items: Vec<Node>) -> Self {
        Self::new(Payload::List(items))
    }

    pub fn str(s: impl Into<String>) -> Self {
        Self::new(Payload::Str(s.into()))
    }

    pub fn int(i: i64) -> Self {
        Self::new(Payload::Int(i))
    }

    pub fn body(decl: FunctionDecl) -> Self {
        Self::new(Payload::Body(decl))
    }

    /// Ordered map entries; empty for non-map nodes.
    pub fn entries(&self) -> &[(Key, Node)] {
        match &self.payload {
            Payload::Map(entries) => entries,
            _ => &[],
        }
    }

    pub fn is_map(&self) -> bool {
        matches!(self.payload, Payload::Map(_))
    }

    pub fn is_body(&self) -> bool {
        matches!(self.payload, Payload::Body(_))
    }

    /// Look up a map entry by key name.
    pub fn get(&self, key: &str) -> Option<&Node> {
        self.entries()
            .iter()
            .find(|(k, _)| k.name == key)
            .map(|(_, v)| v)
    }

    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn as_str(&self) -> Option<&str> {
        match &self.payload {
            Payload::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_body(&self) -> Option<&FunctionDecl> {
        match &self.payload {
            Payload::Body(decl) => Some(decl),
            _ => None,
        }
    }

    /// A short name for the node's shape, used in diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match &self.payload {
            Payload::Map(_) => "Map",
            Payload::List(_) => "List",
            Payload::Str(_) => "String",
            Payload::Int(_) => "Integer",
            Payload::Float(_) => "Float",
            Payload::Bool(_) => "Boolean",
            Payload::Null => "Null",
            Payload::Body(_) => "Function",
            Payload::Param(_) => "Parameter",
            Payload::Type(_) => "Type",
        }
    }

    /// Project this node into a literal [`Value`]. Bodies, parameters and
    /// type handles have no literal form and fail with a shape mismatch
    /// naming `field`.
    pub fn to_value(&self, field: &str) -> Result<Value, BuildError> {
        match &self.payload {
            Payload::Map(entries) => {
                let mut map = indexmap::IndexMap::with_capacity(entries.len());
                for (k, v) in entries {
                    map.insert(k.name.clone(), v.to_value(field)?);
                }
                Ok(Value::Map(map))
            }
            Payload::List(items) => {
                let mut list = Vec::with_capacity(items.len());
                for item in items {
                    list.push(item.to_value(field)?);
                }
                Ok(Value::List(list))
            }
            Payload::Str(s) => Ok(Value::String(s.clone())),
            Payload::Int(i) => Ok(Value::Int(*i)),
            Payload::Float(f) => Ok(Value::Float(*f)),
            Payload::Bool(b) => Ok(Value::Bool(*b)),
            Payload::Null => Ok(Value::Null),
            Payload::Body(_) | Payload::Param(_) | Payload::Type(_) => {
                Err(BuildError::ShapeMismatch {
                    field: field.to_string(),
                    expected: "a literal value",
                    actual: self.kind_name().to_string(),
                })
            }
        }
    }
}
