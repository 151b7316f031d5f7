//! Deferred-value resolution.
//!
//! Walks a literal value under a type constraint, rewriting `$`-sigiled
//! string literals into deferred references and recording each referenced
//! variable as an input parameter of the enclosing step. Type information
//! flows both ways: the constraint narrows as the walk descends into
//! typed members, and a reference under a concrete constraint upgrades
//! the inferred parameter type.

use tracing::trace;

use crate::names::reference_name;
use crate::step::Parameter;
use crate::typesys::{attribute_type, strip_optional, TypeHandle, TypeShape, TypeSystem};
use crate::value::{DeferredValue, Value};

/// Resolve one value under `expected`, appending inferred parameters to
/// `parameters`. Resolution never fails: anything that is not a
/// reference passes through unchanged.
pub(crate) fn resolve(
    ts: &dyn TypeSystem,
    value: Value,
    expected: &TypeHandle,
    parameters: &mut Vec<Parameter>,
) -> Value {
    match value {
        Value::String(s) => match reference_name(&s) {
            Some(name) => {
                trace!(name, r#type = expected.name(), "deferred reference");
                note_parameter(parameters, name, expected);
                Value::Deferred(DeferredValue::reference(name))
            }
            None => Value::String(s),
        },
        Value::Map(map) => {
            let et = strip_optional(expected);
            let shape = et.shape();
            let entries = map
                .into_iter()
                .map(|(k, v)| {
                    let vt = match &shape {
                        TypeShape::Object => attribute_type(&et, &k),
                        TypeShape::Map { value, .. } => Some(value.clone()),
                        TypeShape::Struct(fields) => fields
                            .iter()
                            .find(|(name, _)| *name == k)
                            .map(|(_, t)| t.clone()),
                        _ => None,
                    }
                    .unwrap_or_else(|| ts.any());
                    let v = resolve(ts, v, &vt, parameters);
                    (k, v)
                })
                .collect();
            Value::Map(entries)
        }
        Value::List(items) => {
            let et = strip_optional(expected);
            let shape = et.shape();
            let items = items
                .into_iter()
                .enumerate()
                .map(|(i, v)| {
                    let vt = match &shape {
                        TypeShape::Array(element) => Some(element.clone()),
                        TypeShape::Tuple(elements) => elements.get(i).cloned(),
                        _ => None,
                    }
                    .unwrap_or_else(|| ts.any());
                    resolve(ts, v, &vt, parameters)
                })
                .collect();
            Value::List(items)
        }
        other => other,
    }
}

/// Record `name` as an inferred input parameter. A repeated reference is
/// recorded once; a later occurrence under a concrete constraint upgrades
/// an earlier unconstrained inference.
fn note_parameter(parameters: &mut Vec<Parameter>, name: &str, expected: &TypeHandle) {
    match parameters.iter_mut().find(|p| p.name == name) {
        Some(existing) => {
            if existing.ptype.is_any() && !expected.is_any() {
                existing.ptype = expected.clone();
            }
        }
        None => parameters.push(Parameter::new(name, expected.clone())),
    }
}
