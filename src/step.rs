//! The normalized step IR.
//!
//! A build turns one source document (or parsed DSL expression) into a
//! tree of [`Step`]s. Steps are immutable once the builder method that
//! created them returns; the tree is owned by whatever the builder
//! protocol produced it into (see [`crate::recorder`] for the reference
//! implementation).

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::crud::CrudHandler;
use crate::typesys::TypeHandle;
use crate::value::Value;

/// The five step kinds. Immutable once classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepKind {
    Workflow,
    Resource,
    Handler,
    Iterator,
    Reference,
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StepKind::Workflow => "workflow",
            StepKind::Resource => "resource",
            StepKind::Handler => "handler",
            StepKind::Iterator => "iterator",
            StepKind::Reference => "reference",
        };
        f.write_str(s)
    }
}

/// A declared input or output of a step.
///
/// Within one step, parameter names are unique. The alias, when present,
/// is the distinct bound name used when the parameter name differs from
/// the attribute it feeds; it always matches the variable-name grammar.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub alias: Option<String>,
    pub ptype: TypeHandle,
    pub value: Option<Value>,
}

impl Parameter {
    pub fn new(name: impl Into<String>, ptype: TypeHandle) -> Self {
        Self {
            name: name.into(),
            alias: None,
            ptype,
            value: None,
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }
}

/// Iteration style of an iterator step.
///
/// When a node declares more than one iteration directive, the directive
/// keys are probed in the declared priority order below and the first
/// present key wins; the rest are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IterationStyle {
    Each,
    EachPair,
    Times,
    Range,
}

impl IterationStyle {
    /// Directive keys in priority order.
    pub const DIRECTIVE_KEYS: [&'static str; 4] = ["each", "eachPair", "times", "range"];

    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "each" => Some(IterationStyle::Each),
            "eachPair" => Some(IterationStyle::EachPair),
            "times" => Some(IterationStyle::Times),
            "range" => Some(IterationStyle::Range),
            _ => None,
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            IterationStyle::Each => "each",
            IterationStyle::EachPair => "eachPair",
            IterationStyle::Times => "times",
            IterationStyle::Range => "range",
        }
    }
}

impl fmt::Display for IterationStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// The unresolved state of a resource step: the resolved object type plus
/// an ordered attribute map whose values may be partially deferred. Every
/// key is a valid attribute name on `state_type`.
#[derive(Debug, Clone)]
pub struct ResourceState {
    pub state_type: TypeHandle,
    pub attributes: IndexMap<String, Value>,
}

/// One node of the normalized workflow tree.
#[derive(Debug)]
pub struct Step {
    /// Last segment of the qualified declaration name.
    pub name: String,
    /// Optional guard expression, evaluated externally before execution.
    pub when: Option<String>,
    pub parameters: Vec<Parameter>,
    pub returns: Vec<Parameter>,
    pub detail: StepDetail,
}

/// Kind-specific payload of a step.
#[derive(Debug)]
pub enum StepDetail {
    Workflow {
        steps: Vec<Step>,
    },
    Resource {
        state: ResourceState,
        external_id: Option<String>,
    },
    Handler {
        handler: CrudHandler,
    },
    Iterator {
        style: IterationStyle,
        over: Value,
        variables: Vec<Parameter>,
        into: Option<String>,
        producer: Option<Box<Step>>,
    },
    Reference {
        target: String,
    },
}

impl Step {
    pub fn kind(&self) -> StepKind {
        match self.detail {
            StepDetail::Workflow { .. } => StepKind::Workflow,
            StepDetail::Resource { .. } => StepKind::Resource,
            StepDetail::Handler { .. } => StepKind::Handler,
            StepDetail::Iterator { .. } => StepKind::Iterator,
            StepDetail::Reference { .. } => StepKind::Reference,
        }
    }

    /// The nested steps of a workflow step, empty for other kinds.
    pub fn steps(&self) -> &[Step] {
        match &self.detail {
            StepDetail::Workflow { steps } => steps,
            _ => &[],
        }
    }
}
