//! Reference implementation of the builder protocol.
//!
//! `StepRecorder` accumulates whatever setters the builder drives and
//! finalizes into an owned [`Step`]. Children are recorded through the
//! `ChildBuilder` callbacks and attached only when the child's build
//! callback succeeds, so a failed build never leaves a partial node
//! visible in the parent.

use crate::crud::CrudHandler;
use crate::error::BuildError;
use crate::protocol::{
    ChildBuilder, HandlerBuilder, IteratorBuilder, ReferenceBuilder, ResourceBuilder, StepBuilder,
    WorkflowBuilder,
};
use crate::step::{IterationStyle, Parameter, ResourceState, Step, StepDetail, StepKind};
use crate::value::Value;

#[derive(Default)]
pub struct StepRecorder {
    name: String,
    when: Option<String>,
    parameters: Vec<Parameter>,
    returns: Vec<Parameter>,
    state: Option<ResourceState>,
    external_id: Option<String>,
    handler: Option<CrudHandler>,
    style: Option<IterationStyle>,
    over: Option<Value>,
    variables: Vec<Parameter>,
    into: Option<String>,
    target: Option<String>,
    children: Vec<Step>,
}

impl StepRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Finalize into a step of the given kind. Kind-specific mandatory
    /// pieces that were never set indicate a builder that did not honor
    /// its contract and fail with `MissingRequiredField`.
    pub fn finish(self, kind: StepKind) -> Result<Step, BuildError> {
        let detail = match kind {
            StepKind::Workflow => StepDetail::Workflow {
                steps: self.children,
            },
            StepKind::Resource => StepDetail::Resource {
                state: self.state.ok_or(BuildError::MissingRequiredField {
                    field: "state".to_string(),
                })?,
                external_id: self.external_id,
            },
            StepKind::Handler => StepDetail::Handler {
                handler: self.handler.ok_or(BuildError::MissingRequiredField {
                    field: "handler".to_string(),
                })?,
            },
            StepKind::Iterator => {
                let mut children = self.children;
                StepDetail::Iterator {
                    style: self.style.ok_or(BuildError::MissingRequiredField {
                        field: "style".to_string(),
                    })?,
                    over: self.over.unwrap_or(Value::Null),
                    variables: self.variables,
                    into: self.into,
                    producer: children.pop().map(Box::new),
                }
            }
            StepKind::Reference => StepDetail::Reference {
                target: self.target.ok_or(BuildError::MissingRequiredField {
                    field: "reference".to_string(),
                })?,
            },
        };
        Ok(Step {
            name: self.name,
            when: self.when,
            parameters: self.parameters,
            returns: self.returns,
            detail,
        })
    }

    fn record_child(
        &mut self,
        kind: StepKind,
        build: &mut dyn FnMut(&mut StepRecorder) -> Result<(), BuildError>,
    ) -> Result<(), BuildError> {
        let mut child = StepRecorder::new();
        build(&mut child)?;
        self.children.push(child.finish(kind)?);
        Ok(())
    }
}

impl StepBuilder for StepRecorder {
    fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    fn set_when(&mut self, guard: &str) {
        self.when = Some(guard.to_string());
    }

    fn set_parameters(&mut self, parameters: Vec<Parameter>) {
        self.parameters = parameters;
    }

    fn set_returns(&mut self, returns: Vec<Parameter>) {
        self.returns = returns;
    }
}

impl ChildBuilder for StepRecorder {
    fn child_workflow(
        &mut self,
        build: &mut dyn FnMut(&mut dyn WorkflowBuilder) -> Result<(), BuildError>,
    ) -> Result<(), BuildError> {
        self.record_child(StepKind::Workflow, &mut |r| build(r))
    }

    fn child_resource(
        &mut self,
        build: &mut dyn FnMut(&mut dyn ResourceBuilder) -> Result<(), BuildError>,
    ) -> Result<(), BuildError> {
        self.record_child(StepKind::Resource, &mut |r| build(r))
    }

    fn child_handler(
        &mut self,
        build: &mut dyn FnMut(&mut dyn HandlerBuilder) -> Result<(), BuildError>,
    ) -> Result<(), BuildError> {
        self.record_child(StepKind::Handler, &mut |r| build(r))
    }

    fn child_iterator(
        &mut self,
        build: &mut dyn FnMut(&mut dyn IteratorBuilder) -> Result<(), BuildError>,
    ) -> Result<(), BuildError> {
        self.record_child(StepKind::Iterator, &mut |r| build(r))
    }

    fn child_reference(
        &mut self,
        build: &mut dyn FnMut(&mut dyn ReferenceBuilder) -> Result<(), BuildError>,
    ) -> Result<(), BuildError> {
        self.record_child(StepKind::Reference, &mut |r| build(r))
    }
}

impl WorkflowBuilder for StepRecorder {}

impl ResourceBuilder for StepRecorder {
    fn set_state(&mut self, state: ResourceState) {
        self.state = Some(state);
    }

    fn set_external_id(&mut self, id: &str) {
        self.external_id = Some(id.to_string());
    }
}

impl HandlerBuilder for StepRecorder {
    fn set_handler(&mut self, handler: CrudHandler) {
        self.handler = Some(handler);
    }
}

impl IteratorBuilder for StepRecorder {
    fn set_style(&mut self, style: IterationStyle) {
        self.style = Some(style);
    }

    fn set_over(&mut self, over: Value) {
        self.over = Some(over);
    }

    fn set_variables(&mut self, variables: Vec<Parameter>) {
        self.variables = variables;
    }

    fn set_into(&mut self, into: &str) {
        self.into = Some(into.to_string());
    }
}

impl ReferenceBuilder for StepRecorder {
    fn set_reference_to(&mut self, target: &str) {
        self.target = Some(target.to_string());
    }
}

/// Top-level sink: collects the single root step of a build.
#[derive(Default)]
pub struct Collector {
    step: Option<Step>,
}

impl Collector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_step(self) -> Option<Step> {
        self.step
    }

    fn collect(
        &mut self,
        kind: StepKind,
        build: &mut dyn FnMut(&mut StepRecorder) -> Result<(), BuildError>,
    ) -> Result<(), BuildError> {
        let mut recorder = StepRecorder::new();
        build(&mut recorder)?;
        self.step = Some(recorder.finish(kind)?);
        Ok(())
    }
}

impl ChildBuilder for Collector {
    fn child_workflow(
        &mut self,
        build: &mut dyn FnMut(&mut dyn WorkflowBuilder) -> Result<(), BuildError>,
    ) -> Result<(), BuildError> {
        self.collect(StepKind::Workflow, &mut |r| build(r))
    }

    fn child_resource(
        &mut self,
        build: &mut dyn FnMut(&mut dyn ResourceBuilder) -> Result<(), BuildError>,
    ) -> Result<(), BuildError> {
        self.collect(StepKind::Resource, &mut |r| build(r))
    }

    fn child_handler(
        &mut self,
        build: &mut dyn FnMut(&mut dyn HandlerBuilder) -> Result<(), BuildError>,
    ) -> Result<(), BuildError> {
        self.collect(StepKind::Handler, &mut |r| build(r))
    }

    fn child_iterator(
        &mut self,
        build: &mut dyn FnMut(&mut dyn IteratorBuilder) -> Result<(), BuildError>,
    ) -> Result<(), BuildError> {
        self.collect(StepKind::Iterator, &mut |r| build(r))
    }

    fn child_reference(
        &mut self,
        build: &mut dyn FnMut(&mut dyn ReferenceBuilder) -> Result<(), BuildError>,
    ) -> Result<(), BuildError> {
        self.collect(StepKind::Reference, &mut |r| build(r))
    }
}
