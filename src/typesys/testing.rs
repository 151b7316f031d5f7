//! A small in-memory type system for tests.
//!
//! Only what the builder exercises: scalars, optionals, arrays, tuples,
//! homogeneous maps, structs and object types with named attributes.

use std::collections::HashMap;
use std::sync::Arc;

use super::{TypeHandle, TypeInfo, TypeShape, TypeSystem};
use crate::error::BuildError;

struct AnyType;

impl TypeInfo for AnyType {
    fn name(&self) -> &str {
        "Any"
    }

    fn shape(&self) -> TypeShape {
        TypeShape::Any
    }
}

struct ScalarType(String);

impl TypeInfo for ScalarType {
    fn name(&self) -> &str {
        &self.0
    }

    fn shape(&self) -> TypeShape {
        TypeShape::Opaque
    }
}

struct OptionalType {
    name: String,
    inner: TypeHandle,
}

impl TypeInfo for OptionalType {
    fn name(&self) -> &str {
        &self.name
    }

    fn shape(&self) -> TypeShape {
        TypeShape::Optional(self.inner.clone())
    }
}

struct ArrayType {
    name: String,
    element: TypeHandle,
}

impl TypeInfo for ArrayType {
    fn name(&self) -> &str {
        &self.name
    }

    fn shape(&self) -> TypeShape {
        TypeShape::Array(self.element.clone())
    }
}

struct TupleType {
    name: String,
    elements: Vec<TypeHandle>,
}

impl TypeInfo for TupleType {
    fn name(&self) -> &str {
        &self.name
    }

    fn shape(&self) -> TypeShape {
        TypeShape::Tuple(self.elements.clone())
    }
}

struct HashType {
    name: String,
    key: TypeHandle,
    value: TypeHandle,
}

impl TypeInfo for HashType {
    fn name(&self) -> &str {
        &self.name
    }

    fn shape(&self) -> TypeShape {
        TypeShape::Map {
            key: self.key.clone(),
            value: self.value.clone(),
        }
    }
}

struct StructType {
    name: String,
    fields: Vec<(String, TypeHandle)>,
}

impl TypeInfo for StructType {
    fn name(&self) -> &str {
        &self.name
    }

    fn shape(&self) -> TypeShape {
        TypeShape::Struct(self.fields.clone())
    }
}

struct ObjectType {
    name: String,
    attributes: Vec<(String, TypeHandle)>,
}

impl TypeInfo for ObjectType {
    fn name(&self) -> &str {
        &self.name
    }

    fn shape(&self) -> TypeShape {
        TypeShape::Object
    }

    fn member(&self, name: &str) -> Option<TypeHandle> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, t)| t.clone())
    }
}

pub(crate) fn any() -> TypeHandle {
    TypeHandle::new(Arc::new(AnyType))
}

pub(crate) fn scalar(name: &str) -> TypeHandle {
    TypeHandle::new(Arc::new(ScalarType(name.to_string())))
}

pub(crate) fn optional(inner: TypeHandle) -> TypeHandle {
    let name = format!("Optional[{}]", inner.name());
    TypeHandle::new(Arc::new(OptionalType { name, inner }))
}

pub(crate) fn array(element: TypeHandle) -> TypeHandle {
    let name = format!("Array[{}]", element.name());
    TypeHandle::new(Arc::new(ArrayType { name, element }))
}

pub(crate) fn tuple(elements: Vec<TypeHandle>) -> TypeHandle {
    let names: Vec<&str> = elements.iter().map(|t| t.name()).collect();
    let name = format!("Tuple[{}]", names.join(", "));
    TypeHandle::new(Arc::new(TupleType { name, elements }))
}

pub(crate) fn hash(key: TypeHandle, value: TypeHandle) -> TypeHandle {
    let name = format!("Hash[{}, {}]", key.name(), value.name());
    TypeHandle::new(Arc::new(HashType { name, key, value }))
}

pub(crate) fn strukt(fields: Vec<(&str, TypeHandle)>) -> TypeHandle {
    let fields: Vec<(String, TypeHandle)> = fields
        .into_iter()
        .map(|(n, t)| (n.to_string(), t))
        .collect();
    let names: Vec<String> = fields
        .iter()
        .map(|(n, t)| format!("{} => {}", n, t.name()))
        .collect();
    let name = format!("Struct[{{{}}}]", names.join(", "));
    TypeHandle::new(Arc::new(StructType { name, fields }))
}

pub(crate) fn object(name: &str, attributes: Vec<(&str, TypeHandle)>) -> TypeHandle {
    TypeHandle::new(Arc::new(ObjectType {
        name: name.to_string(),
        attributes: attributes
            .into_iter()
            .map(|(n, t)| (n.to_string(), t))
            .collect(),
    }))
}

/// Registry-backed [`TypeSystem`] for tests. `parse_type` resolves against
/// a fixed table of named types; `load_object_type` resolves only the
/// registered object types.
pub(crate) struct TestTypes {
    named: HashMap<String, TypeHandle>,
    objects: HashMap<String, TypeHandle>,
}

impl TestTypes {
    pub(crate) fn new() -> Self {
        let mut named = HashMap::new();
        for n in ["String", "Integer", "Float", "Boolean"] {
            named.insert(n.to_string(), scalar(n));
        }
        named.insert("Any".to_string(), any());
        Self {
            named,
            objects: HashMap::new(),
        }
    }

    /// Register an object type resolvable through both `parse_type` and
    /// `load_object_type`.
    pub(crate) fn with_object(mut self, t: TypeHandle) -> Self {
        self.named.insert(t.name().to_string(), t.clone());
        self.objects.insert(t.name().to_string(), t);
        self
    }
}

impl TypeSystem for TestTypes {
    fn parse_type(&self, source: &str) -> Result<TypeHandle, BuildError> {
        self.named
            .get(source)
            .cloned()
            .ok_or_else(|| BuildError::UnresolvedType {
                type_name: source.to_string(),
            })
    }

    fn load_object_type(&self, name: &str) -> Option<TypeHandle> {
        self.objects.get(name).cloned()
    }

    fn any(&self) -> TypeHandle {
        any()
    }
}
