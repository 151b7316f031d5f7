//! Lifecycle dispatch for handler steps.
//!
//! A handler step backs its resource lifecycle either with a single `do`
//! body or with a `create`/`read`/`update`/`delete` function set. The
//! bodies themselves run in the external evaluator; this module owns the
//! dispatch object, the required-function validation, and the conversion
//! of control-flow signals into ordinary results at the single-body call
//! boundary.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use thiserror::Error;

use crate::error::BuildError;
use crate::step::Parameter;
use crate::value::Value;

/// Control-flow signal raised from within a handler body in place of a
/// normal return.
#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    /// Continue with the next iteration, yielding this value.
    NextIteration(Value),
    /// Return early with this value.
    Return(Value),
}

impl Signal {
    pub fn into_value(self) -> Value {
        match self {
            Signal::NextIteration(v) => v,
            Signal::Return(v) => v,
        }
    }
}

/// Failure modes of invoking a handler body.
#[derive(Debug, Error)]
pub enum InvokeError {
    /// A control-flow signal that escaped the body. Caught at the
    /// single-body dispatch boundary and converted into the call result.
    #[error("control-flow signal escaped the call boundary")]
    Signal(Signal),
    #[error("{0}")]
    Failed(String),
}

/// The seam to the external evaluator: a callable body taking arguments
/// bound by parameter name.
pub trait BodyFn: Send + Sync {
    fn call(&self, args: &IndexMap<String, Value>) -> Result<Value, InvokeError>;
}

impl<F> BodyFn for F
where
    F: Fn(&IndexMap<String, Value>) -> Result<Value, InvokeError> + Send + Sync,
{
    fn call(&self, args: &IndexMap<String, Value>) -> Result<Value, InvokeError> {
        self(args)
    }
}

/// A shared reference to a callable body.
pub type BodyRef = Arc<dyn BodyFn>;

/// A named, parameterized callable.
#[derive(Clone)]
pub struct Invocable {
    name: String,
    parameters: Vec<Parameter>,
    body: BodyRef,
}

impl Invocable {
    pub fn new(name: impl Into<String>, parameters: Vec<Parameter>, body: BodyRef) -> Self {
        Self {
            name: name.into(),
            parameters,
            body,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn invoke(&self, args: &IndexMap<String, Value>) -> Result<Value, InvokeError> {
        self.body.call(args)
    }
}

impl fmt::Debug for Invocable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invocable")
            .field("name", &self.name)
            .field("parameters", &self.parameters)
            .finish_non_exhaustive()
    }
}

/// The dispatch object backing a handler step.
pub enum CrudHandler {
    /// One callable body; dispatches only the method name `do`.
    Do(Invocable),
    /// The multi-function form. `create`, `read` and `delete` are
    /// mandatory; `update` determines whether 3 or 4 operations exist.
    Crud {
        create: Invocable,
        read: Invocable,
        update: Option<Invocable>,
        delete: Invocable,
    },
}

impl CrudHandler {
    /// Build the multi-function form from named function bodies.
    ///
    /// Function names outside the CRUD set fail with `InvalidFunction`;
    /// a missing `create`, `read` or `delete` fails with
    /// `MissingRequiredFunction` naming the first absent one.
    pub fn from_functions(functions: Vec<Invocable>) -> Result<CrudHandler, BuildError> {
        let mut create = None;
        let mut read = None;
        let mut update = None;
        let mut delete = None;
        for f in functions {
            match f.name() {
                "create" => create = Some(f),
                "read" => read = Some(f),
                "update" => update = Some(f),
                "delete" => delete = Some(f),
                other => {
                    return Err(BuildError::InvalidFunction {
                        name: other.to_string(),
                    })
                }
            }
        }
        match (create, read, delete) {
            (Some(create), Some(read), Some(delete)) => Ok(CrudHandler::Crud {
                create,
                read,
                update,
                delete,
            }),
            (None, _, _) => Err(BuildError::MissingRequiredFunction { function: "create" }),
            (_, None, _) => Err(BuildError::MissingRequiredFunction { function: "read" }),
            (_, _, None) => Err(BuildError::MissingRequiredFunction { function: "delete" }),
        }
    }

    /// The method names this dispatcher handles.
    pub fn operations(&self) -> Vec<&'static str> {
        match self {
            CrudHandler::Do(_) => vec!["do"],
            CrudHandler::Crud { update, .. } => {
                if update.is_some() {
                    vec!["create", "read", "update", "delete"]
                } else {
                    vec!["create", "read", "delete"]
                }
            }
        }
    }

    /// Dispatch a call by method name.
    ///
    /// `None` means "not handled here"; the caller may probe further
    /// method names. For the single-body form, control-flow signals
    /// raised by the body become the call's result, and a trailing
    /// nested-block argument is unsupported.
    pub fn call(
        &self,
        method: &str,
        args: &IndexMap<String, Value>,
        block: Option<&Invocable>,
    ) -> Option<Result<Value, InvokeError>> {
        match self {
            CrudHandler::Do(body) => {
                if method != "do" {
                    return None;
                }
                if block.is_some() {
                    return Some(Err(InvokeError::Failed(format!(
                        "{}: nested blocks are not supported",
                        body.name()
                    ))));
                }
                Some(match body.invoke(args) {
                    Err(InvokeError::Signal(signal)) => Ok(signal.into_value()),
                    other => other,
                })
            }
            CrudHandler::Crud {
                create,
                read,
                update,
                delete,
            } => {
                let f = match method {
                    "create" => create,
                    "read" => read,
                    "update" => update.as_ref()?,
                    "delete" => delete,
                    _ => return None,
                };
                Some(f.invoke(args))
            }
        }
    }
}

impl fmt::Debug for CrudHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CrudHandler::Do(body) => f.debug_tuple("Do").field(&body.name()).finish(),
            CrudHandler::Crud { update, .. } => f
                .debug_struct("Crud")
                .field("update", &update.is_some())
                .finish(),
        }
    }
}
