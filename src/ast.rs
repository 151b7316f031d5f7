//! Expression types produced by the external DSL parser.
//!
//! The workflow DSL's lexical grammar is parsed elsewhere; what arrives
//! here is an already-evaluated expression tree: step expressions with an
//! explicit style tag, literal property hashes, and function definitions
//! whose bodies are opaque callables into the external evaluator. The
//! lowering in [`crate::frontend::dsl`] maps this tree onto the shared
//! [`Node`](crate::node::Node) representation.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::crud::BodyRef;
use crate::node::{Key, Node};
use crate::span::Span;
use crate::value::Value;

/// The explicit style tag the DSL grammar places on a step expression.
/// Iterator and reference shapes are expressed through properties, not
/// through the tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStyle {
    Workflow,
    Resource,
    Handler,
}

/// A step expression: the DSL's declaration of one workflow step.
#[derive(Debug, Clone)]
pub struct StepExpr {
    /// Qualified declaration name; the builder keeps only the last
    /// `::`-separated segment.
    pub name: String,
    pub style: StepStyle,
    /// Evaluated property hash, in declaration order.
    pub properties: Vec<(Key, Node)>,
    pub definition: Option<Definition>,
    pub span: Span,
}

/// The definition block of a step expression. Interpretation depends on
/// the step style: workflows hold nested declarations, resources hold a
/// literal state hash, handlers hold lifecycle functions or one bare
/// body.
#[derive(Debug, Clone)]
pub enum Definition {
    Block(Vec<BlockItem>),
    Hash(Vec<(Key, Node)>, Span),
    Body(FunctionDecl),
}

/// One statement inside a workflow definition block.
#[derive(Debug, Clone)]
pub enum BlockItem {
    Step(StepExpr),
    Function(FunctionDecl),
}

/// A function definition: formal parameters, an optional declared return
/// structure, and an opaque callable body.
#[derive(Clone)]
pub struct FunctionDecl {
    pub name: String,
    pub formals: Vec<FormalParam>,
    /// Declared return structure as (name, type name) pairs; each member
    /// becomes an output parameter of the enclosing handler step.
    pub returns: Option<Vec<(String, String)>>,
    pub body: BodyRef,
    pub span: Span,
}

impl FunctionDecl {
    pub fn new(name: impl Into<String>, formals: Vec<FormalParam>, body: BodyRef) -> Self {
        Self {
            name: name.into(),
            formals,
            returns: None,
            body,
            span: Span::default(),
        }
    }

    pub fn with_returns(mut self, returns: Vec<(String, String)>) -> Self {
        self.returns = Some(returns);
        self
    }
}

impl fmt::Debug for FunctionDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionDecl")
            .field("name", &self.name)
            .field("formals", &self.formals)
            .field("returns", &self.returns)
            .finish_non_exhaustive()
    }
}

/// A formal parameter of a function definition.
#[derive(Debug, Clone)]
pub struct FormalParam {
    pub name: String,
    /// Declared type name; `None` means unconstrained.
    pub type_name: Option<String>,
    pub default: Option<Value>,
    pub span: Span,
}

impl FormalParam {
    pub fn new(name: impl Into<String>, type_name: Option<&str>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.map(str::to_string),
            default: None,
            span: Span::default(),
        }
    }
}
