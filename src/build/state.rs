//! Resource type resolution and state building.
//!
//! A resource step's object type comes from, in order: an explicit
//! `type` property, the single key matching the type-name grammar, or
//! the step's own name qualified by the nearest inherited `typespace`.
//! The resolved type is memoized on the step's frame because parameter
//! extraction and state building both need it.

use indexmap::IndexMap;

use crate::build::classify::{type_name_key, STATE_KEY};
use crate::build::{resolve, Compiler};
use crate::error::BuildError;
use crate::names::{is_type_name, is_var_name, leaf_name};
use crate::node::{Node, Payload};
use crate::step::{Parameter, ResourceState};
use crate::typesys::{attribute_type, TypeHandle};

impl Compiler<'_> {
    /// The resolved object type of the resource step at `frame`.
    pub(crate) fn resource_type(
        &mut self,
        frame: usize,
        node: &Node,
    ) -> Result<TypeHandle, BuildError> {
        if let Some(t) = &self.frames[frame].resource_type {
            return Ok(t.clone());
        }
        let t = self.resolve_resource_type(frame, node)?;
        self.frames[frame].resource_type = Some(t.clone());
        Ok(t)
    }

    fn resolve_resource_type(&self, frame: usize, node: &Node) -> Result<TypeHandle, BuildError> {
        if let Some(decl) = node.get("type") {
            return match &decl.payload {
                Payload::Type(t) if t.is_object() => Ok(t.clone()),
                Payload::Type(t) => Err(BuildError::ShapeMismatch {
                    field: "type".to_string(),
                    expected: "an object type",
                    actual: t.name().to_string(),
                }),
                Payload::Str(s) => {
                    if !is_type_name(s) {
                        return Err(BuildError::InvalidTypeName { name: s.clone() });
                    }
                    self.load_object_type(s)
                }
                _ => Err(BuildError::ShapeMismatch {
                    field: "type".to_string(),
                    expected: "a type name or object type",
                    actual: decl.kind_name().to_string(),
                }),
            };
        }
        if let Some(key) = type_name_key(node) {
            return self.load_object_type(key);
        }
        let name = match self.typespace(frame) {
            Some(ts) => format!("{}::{}", ts, leaf_name(&self.frames[frame].name)),
            None => self.frames[frame].name.clone(),
        };
        self.load_object_type(&name)
    }

    fn load_object_type(&self, name: &str) -> Result<TypeHandle, BuildError> {
        match self.ctx.types().load_object_type(name) {
            Some(t) if t.is_object() => Ok(t),
            Some(t) => Err(BuildError::ShapeMismatch {
                field: name.to_string(),
                expected: "an object type",
                actual: t.name().to_string(),
            }),
            None => Err(BuildError::UnresolvedType {
                type_name: name.to_string(),
            }),
        }
    }

    /// Build the step's [`ResourceState`], resolving deferred references
    /// in attribute values and folding inferred inputs into `params`.
    pub(crate) fn build_state(
        &mut self,
        frame: usize,
        node: &Node,
        mut params: Vec<Parameter>,
    ) -> Result<(ResourceState, Vec<Parameter>), BuildError> {
        let state_type = self.resource_type(frame, node)?;
        let mut attributes = IndexMap::new();
        let state = node
            .get(STATE_KEY)
            .or_else(|| type_name_key(node).and_then(|k| node.get(k)));
        let Some(state) = state else {
            return Ok((
                ResourceState {
                    state_type,
                    attributes,
                },
                params,
            ));
        };
        if !state.is_map() {
            return Err(BuildError::ShapeMismatch {
                field: STATE_KEY.to_string(),
                expected: "a map of attribute values",
                actual: state.kind_name().to_string(),
            });
        }
        for (key, value) in state.entries() {
            if !is_var_name(&key.name) {
                return Err(BuildError::ShapeMismatch {
                    field: STATE_KEY.to_string(),
                    expected: "an attribute name",
                    actual: key.name.clone(),
                });
            }
            let at = attribute_type(&state_type, &key.name).ok_or_else(|| {
                BuildError::AttributeNotFound {
                    type_name: state_type.name().to_string(),
                    attribute: key.name.clone(),
                }
            })?;
            let literal = value.to_value(&key.name)?;
            let resolved = resolve::resolve(self.ctx.types(), literal, &at, &mut params);
            attributes.insert(key.name.clone(), resolved);
        }
        Ok((
            ResourceState {
                state_type,
                attributes,
            },
            params,
        ))
    }
}
