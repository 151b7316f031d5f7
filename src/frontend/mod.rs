//! Front-ends over the shared builder.
//!
//! Two grammars produce steps: ordered key/value documents
//! ([`doc`]) and the workflow DSL's parsed expression tree ([`dsl`]).
//! Both normalize onto [`Node`](crate::node::Node) and share every
//! classification, parameter and state rule downstream.

pub mod doc;
pub mod dsl;
