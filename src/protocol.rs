//! The set-only builder protocol.
//!
//! The surrounding workflow-service layer owns step registration; the
//! builder drives these traits and never reads anything back. Child
//! steps are attached through [`ChildBuilder`] callbacks so that a
//! failing child is never published to its parent: the implementation
//! must only attach a child when the callback returns `Ok`.
//!
//! [`crate::recorder::StepRecorder`] is the reference implementation,
//! producing the owned [`Step`](crate::step::Step) tree.

use crate::crud::CrudHandler;
use crate::error::BuildError;
use crate::step::{IterationStyle, Parameter, ResourceState};
use crate::value::Value;

/// Setters common to every step kind.
pub trait StepBuilder {
    fn set_name(&mut self, name: &str);
    fn set_when(&mut self, guard: &str);
    fn set_parameters(&mut self, parameters: Vec<Parameter>);
    fn set_returns(&mut self, returns: Vec<Parameter>);
}

/// Attachment point for nested steps, implemented by workflow and
/// iterator builders (and by whatever receives the top-level step).
pub trait ChildBuilder {
    fn child_workflow(
        &mut self,
        build: &mut dyn FnMut(&mut dyn WorkflowBuilder) -> Result<(), BuildError>,
    ) -> Result<(), BuildError>;

    fn child_resource(
        &mut self,
        build: &mut dyn FnMut(&mut dyn ResourceBuilder) -> Result<(), BuildError>,
    ) -> Result<(), BuildError>;

    fn child_handler(
        &mut self,
        build: &mut dyn FnMut(&mut dyn HandlerBuilder) -> Result<(), BuildError>,
    ) -> Result<(), BuildError>;

    fn child_iterator(
        &mut self,
        build: &mut dyn FnMut(&mut dyn IteratorBuilder) -> Result<(), BuildError>,
    ) -> Result<(), BuildError>;

    fn child_reference(
        &mut self,
        build: &mut dyn FnMut(&mut dyn ReferenceBuilder) -> Result<(), BuildError>,
    ) -> Result<(), BuildError>;
}

pub trait WorkflowBuilder: StepBuilder + ChildBuilder {}

pub trait ResourceBuilder: StepBuilder {
    fn set_state(&mut self, state: ResourceState);
    fn set_external_id(&mut self, id: &str);
}

pub trait HandlerBuilder: StepBuilder {
    fn set_handler(&mut self, handler: CrudHandler);
}

/// Iterator steps attach their per-iteration producer through the
/// inherited [`ChildBuilder`].
pub trait IteratorBuilder: StepBuilder + ChildBuilder {
    fn set_style(&mut self, style: IterationStyle);
    fn set_over(&mut self, over: Value);
    fn set_variables(&mut self, variables: Vec<Parameter>);
    fn set_into(&mut self, into: &str);
}

pub trait ReferenceBuilder: StepBuilder {
    fn set_reference_to(&mut self, target: &str);
}
