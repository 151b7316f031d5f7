//! Workflow step compilation.
//!
//! This crate turns declarative workflow sources into a normalized tree
//! of typed steps. Two front-ends feed it: ordered key/value documents
//! ([`frontend::doc`]) and the workflow DSL's parsed expression tree
//! ([`frontend::dsl`]). Both lower onto one [`node::Node`]
//! representation, and one builder ([`build`]) classifies each node into
//! a step kind, extracts and infers its parameters, resolves deferred
//! variable references inside resource state, and drives the set-only
//! builder protocol ([`protocol`]) that the surrounding workflow service
//! implements.
//!
//! The type system itself stays outside the crate: the builder consumes
//! the narrow [`typesys::TypeSystem`] capability and treats every type
//! as an opaque [`typesys::TypeHandle`] with just enough introspection
//! to direct inference.
//!
//! ```
//! use cadence_core::build::{build_step, Context};
//! use cadence_core::node::{Key, Node};
//! use cadence_core::step::StepKind;
//! # use cadence_core::typesys::{TypeHandle, TypeSystem};
//! # use cadence_core::error::BuildError;
//! # struct NoTypes;
//! # impl TypeSystem for NoTypes {
//! #     fn parse_type(&self, s: &str) -> Result<TypeHandle, BuildError> {
//! #         Err(BuildError::UnresolvedType { type_name: s.to_string() })
//! #     }
//! #     fn load_object_type(&self, _: &str) -> Option<TypeHandle> { None }
//! #     fn any(&self) -> TypeHandle {
//! #         struct Any;
//! #         impl cadence_core::typesys::TypeInfo for Any {
//! #             fn name(&self) -> &str { "Any" }
//! #             fn shape(&self) -> cadence_core::typesys::TypeShape {
//! #                 cadence_core::typesys::TypeShape::Any
//! #             }
//! #         }
//! #         TypeHandle::new(std::sync::Arc::new(Any))
//! #     }
//! # }
//! let types = NoTypes;
//! let ctx = Context::new(&types, "deploy.yaml");
//! let doc = Node::map(vec![(
//!     Key::new("steps"),
//!     Node::map(vec![(
//!         Key::new("notify"),
//!         Node::map(vec![(Key::new("call"), Node::str("notifier"))]),
//!     )]),
//! )]);
//! let step = build_step(&ctx, "deploy", &doc)?;
//! assert_eq!(step.kind(), StepKind::Workflow);
//! assert_eq!(step.steps()[0].kind(), StepKind::Reference);
//! # Ok::<(), BuildError>(())
//! ```

pub mod ast;
pub mod build;
pub mod crud;
pub mod error;
pub mod frontend;
pub mod names;
pub mod node;
pub mod protocol;
pub mod recorder;
pub mod span;
pub mod step;
pub mod typesys;
pub mod value;

pub use build::{build_into, build_step, Context};
pub use error::BuildError;
pub use step::{IterationStyle, Parameter, ResourceState, Step, StepDetail, StepKind};
pub use value::{DeferredValue, Value};
