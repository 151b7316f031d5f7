//! The narrow type-system capability consumed by the builder.
//!
//! The real type system (type parsing, instance checks, coercion) lives
//! outside this crate. The builder only needs three things from it:
//! parsing a type name into an opaque handle, loading an object type by
//! qualified name, and enough structural introspection on a handle to
//! direct deferred-value resolution (named members, element types and so
//! on). Everything here is that seam and nothing more.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::error::BuildError;

#[cfg(test)]
pub(crate) mod testing;

/// Structural classification of a type handle, as far as the builder
/// needs to see it. `Opaque` covers everything the resolver treats as a
/// plain scalar.
#[derive(Debug, Clone)]
pub enum TypeShape {
    /// The unconstrained type. Parameters inferred without a better
    /// constraint get this, and it may later be upgraded.
    Any,
    /// A type with named, typed members reachable via [`TypeHandle::member`].
    Object,
    /// A homogeneous map type.
    Map { key: TypeHandle, value: TypeHandle },
    /// A structured record with per-field types.
    Struct(Vec<(String, TypeHandle)>),
    /// A homogeneous array type.
    Array(TypeHandle),
    /// A tuple with positional member types.
    Tuple(Vec<TypeHandle>),
    /// An optional wrapper around another type.
    Optional(TypeHandle),
    Opaque,
}

/// Introspection interface implemented by the external type system's
/// handles.
pub trait TypeInfo: Send + Sync {
    /// Canonical display name, e.g. `Optional[String]`.
    fn name(&self) -> &str;

    fn shape(&self) -> TypeShape;

    /// Named-member (attribute) lookup for object-shaped types.
    fn member(&self, name: &str) -> Option<TypeHandle> {
        let _ = name;
        None
    }
}

/// An opaque, shared handle to an externally defined type.
#[derive(Clone)]
pub struct TypeHandle(Arc<dyn TypeInfo>);

impl TypeHandle {
    pub fn new(info: Arc<dyn TypeInfo>) -> Self {
        Self(info)
    }

    pub fn name(&self) -> &str {
        self.0.name()
    }

    pub fn shape(&self) -> TypeShape {
        self.0.shape()
    }

    pub fn member(&self, name: &str) -> Option<TypeHandle> {
        self.0.member(name)
    }

    pub fn is_any(&self) -> bool {
        matches!(self.0.shape(), TypeShape::Any)
    }

    pub fn is_object(&self) -> bool {
        matches!(self.0.shape(), TypeShape::Object)
    }
}

impl fmt::Debug for TypeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeHandle({})", self.name())
    }
}

impl fmt::Display for TypeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl PartialEq for TypeHandle {
    fn eq(&self, other: &Self) -> bool {
        self.name() == other.name()
    }
}

/// The capability the external type system provides to a build.
///
/// Attribute and type resolution may be stateful (memoized) on the
/// provider side; a build never shares its type-system handle with
/// another concurrent build.
pub trait TypeSystem {
    /// Parse a type name or type expression into a handle.
    fn parse_type(&self, source: &str) -> Result<TypeHandle, BuildError>;

    /// Load an object type by its qualified name.
    fn load_object_type(&self, name: &str) -> Option<TypeHandle>;

    /// The unconstrained type.
    fn any(&self) -> TypeHandle;
}

/// Strip optional wrappers from a type handle.
pub fn strip_optional(t: &TypeHandle) -> TypeHandle {
    let mut current = t.clone();
    while let TypeShape::Optional(inner) = current.shape() {
        current = inner;
    }
    current
}

/// Look up the type of a (possibly dotted) attribute path on an object
/// type. Each intermediate segment must itself resolve to an object type
/// after one level of optional stripping; dotted lookup through map or
/// array values is not supported.
pub fn attribute_type(tp: &TypeHandle, name: &str) -> Option<TypeHandle> {
    let mut current = tp.clone();
    let segments: Vec<&str> = name.split('.').collect();
    for (i, segment) in segments.iter().enumerate() {
        if !current.is_object() {
            debug!(r#type = current.name(), name = segment, "not an object attribute");
            return None;
        }
        let at = match current.member(segment) {
            Some(at) => at,
            None => {
                debug!(r#type = current.name(), name = segment, "no such attribute");
                return None;
            }
        };
        if i + 1 == segments.len() {
            return Some(at);
        }
        current = strip_optional(&at);
    }
    None
}
