//! Build-time error taxonomy.
//!
//! Every error is raised synchronously while walking the source document,
//! is non-retryable, and is re-wrapped at each enclosing step's boundary
//! with that step's kind, qualified name and source location. The error
//! surfaced to the loader therefore reads as a breadcrumb trail ending at
//! the innermost failing step, with the original cause reachable through
//! `std::error::Error::source`.

use thiserror::Error;

use crate::span::Location;
use crate::step::StepKind;

#[derive(Debug, Error)]
pub enum BuildError {
    /// A field expected to be a map, list, string or function body was
    /// something else.
    #[error("expected {field} to be {expected}, got {actual}")]
    ShapeMismatch {
        field: String,
        expected: &'static str,
        actual: String,
    },

    /// A node could not be classified under any recognized step shape.
    #[error("{location}: '{name}' is not a step: {reason}")]
    NotAStep {
        name: String,
        location: Location,
        reason: String,
    },

    /// A parameter or return declaration did not match any recognized
    /// shape.
    #[error("element '{name}' is not a valid {field} parameter")]
    BadParameter { name: String, field: String },

    /// A mandatory CRUD function was absent from a multi-function block.
    #[error("missing required function '{function}'")]
    MissingRequiredFunction { function: &'static str },

    /// A function block contained a function that is not one of the CRUD
    /// lifecycle names.
    #[error("invalid function '{name}'; expected one of 'create', 'read', 'update', or 'delete'")]
    InvalidFunction { name: String },

    /// A mandatory field or declaration was absent.
    #[error("missing required field '{field}'")]
    MissingRequiredField { field: String },

    /// A type name failed to resolve against the type system.
    #[error("unresolved type '{type_name}'")]
    UnresolvedType { type_name: String },

    /// A type name did not match the type-name grammar.
    #[error("invalid type name '{name}'; a type name must consist of one to many capitalized segments separated by '::'")]
    InvalidTypeName { name: String },

    /// A resource state key or return alias did not match any attribute
    /// on the resolved object type.
    #[error("attribute '{attribute}' not found on type {type_name}")]
    AttributeNotFound {
        type_name: String,
        attribute: String,
    },

    /// Wrapper added at each step's build boundary.
    #[error("failed to build {kind} step '{label}' at {location}: {source}")]
    Step {
        kind: StepKind,
        label: String,
        location: Location,
        #[source]
        source: Box<BuildError>,
    },
}

impl BuildError {
    /// The innermost non-wrapper error in the chain.
    pub fn root_cause(&self) -> &BuildError {
        match self {
            BuildError::Step { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// The label of the innermost step in the chain, if any step boundary
    /// was crossed.
    pub fn innermost_step(&self) -> Option<&str> {
        match self {
            BuildError::Step { label, source, .. } => {
                Some(source.innermost_step().unwrap_or(label))
            }
            _ => None,
        }
    }
}
