//! The step builder.
//!
//! `build_step` walks one normalized [`Node`] tree, classifies each node
//! into a step kind, and drives the builder protocol to produce the step
//! tree. Frames track the lexical chain of enclosing steps for qualified
//! diagnostic labels, `typespace` inheritance and per-step memoized
//! resource types. Every failure below a step is re-wrapped at that
//! step's boundary with its kind, qualified label and source location.

pub(crate) mod classify;
mod params;
pub(crate) mod resolve;
mod state;

#[cfg(test)]
mod tests;

use tracing::debug;

use crate::ast::{FormalParam, FunctionDecl};
use crate::crud::{CrudHandler, Invocable};
use crate::error::BuildError;
use crate::names::leaf_name;
use crate::node::Node;
use crate::protocol::{
    ChildBuilder, HandlerBuilder, IteratorBuilder, ReferenceBuilder, ResourceBuilder, StepBuilder,
    WorkflowBuilder,
};
use crate::recorder::Collector;
use crate::step::{IterationStyle, Parameter, Step, StepKind};
use crate::typesys::{TypeHandle, TypeSystem};

use classify::{REFERENCE_KEYS, STEPS_KEYS};

/// Everything a build needs from its surroundings: the type system and
/// the source file name used in diagnostic locations.
pub struct Context<'t> {
    types: &'t dyn TypeSystem,
    file: String,
}

impl<'t> Context<'t> {
    pub fn new(types: &'t dyn TypeSystem, file: impl Into<String>) -> Self {
        Self {
            types,
            file: file.into(),
        }
    }

    pub fn types(&self) -> &dyn TypeSystem {
        self.types
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    pub(crate) fn location(&self, span: crate::span::Span) -> crate::span::Location {
        crate::span::Location::new(&self.file, span)
    }
}

/// One entry in the lexical chain of steps under construction.
pub(crate) struct Frame {
    pub(crate) name: String,
    pub(crate) parent: Option<usize>,
    pub(crate) typespace: Option<String>,
    pub(crate) resource_type: Option<TypeHandle>,
}

/// Walk state of one build. Frames are appended as the walk descends and
/// never removed; indices are stable for the whole build.
pub(crate) struct Compiler<'a> {
    pub(crate) ctx: &'a Context<'a>,
    pub(crate) frames: Vec<Frame>,
}

/// Build the step named `name` from `node` into `sink`.
pub fn build_into<B: ChildBuilder + ?Sized>(
    ctx: &Context,
    name: &str,
    node: &Node,
    sink: &mut B,
) -> Result<(), BuildError> {
    Compiler::new(ctx).build_child(None, name, node, sink)
}

/// Build the step named `name` from `node` into an owned [`Step`] tree.
pub fn build_step(ctx: &Context, name: &str, node: &Node) -> Result<Step, BuildError> {
    let mut collector = Collector::new();
    build_into(ctx, name, node, &mut collector)?;
    collector
        .into_step()
        .ok_or_else(|| BuildError::MissingRequiredField {
            field: "step".to_string(),
        })
}

/// A string-valued property, or an error when the property exists with a
/// different shape.
fn string_property(node: &Node, field: &str) -> Result<Option<String>, BuildError> {
    match node.get(field) {
        None => Ok(None),
        Some(v) => match v.as_str() {
            Some(s) => Ok(Some(s.to_string())),
            None => Err(BuildError::ShapeMismatch {
                field: field.to_string(),
                expected: "a string",
                actual: v.kind_name().to_string(),
            }),
        },
    }
}

impl<'a> Compiler<'a> {
    pub(crate) fn new(ctx: &'a Context<'a>) -> Self {
        Self {
            ctx,
            frames: Vec::new(),
        }
    }

    /// Classify `node` and build it as a child of `parent` into `sink`.
    /// Any failure inside is wrapped with this step's kind, qualified
    /// label and location.
    pub(crate) fn build_child<B: ChildBuilder + ?Sized>(
        &mut self,
        parent: Option<usize>,
        name: &str,
        node: &Node,
        sink: &mut B,
    ) -> Result<(), BuildError> {
        let kind = classify::classify(self.ctx, name, node)?;
        let label = self.child_label(parent, name);
        debug!(%kind, step = %label, "building step");
        let location = self.ctx.location(node.span);
        self.dispatch(kind, parent, name, node, sink)
            .map_err(|source| BuildError::Step {
                kind,
                label,
                location,
                source: Box::new(source),
            })
    }

    fn dispatch<B: ChildBuilder + ?Sized>(
        &mut self,
        kind: StepKind,
        parent: Option<usize>,
        name: &str,
        node: &Node,
        sink: &mut B,
    ) -> Result<(), BuildError> {
        let frame = self.push_frame(parent, name, node)?;
        match kind {
            StepKind::Workflow => sink.child_workflow(&mut |b| self.build_workflow(frame, node, b)),
            StepKind::Resource => sink.child_resource(&mut |b| self.build_resource(frame, node, b)),
            StepKind::Handler => sink.child_handler(&mut |b| self.build_handler(frame, node, b)),
            StepKind::Iterator => sink.child_iterator(&mut |b| self.build_iterator(frame, node, b)),
            StepKind::Reference => {
                sink.child_reference(&mut |b| self.build_reference(frame, node, b))
            }
        }
    }

    fn push_frame(
        &mut self,
        parent: Option<usize>,
        name: &str,
        node: &Node,
    ) -> Result<usize, BuildError> {
        let typespace = string_property(node, "typespace")?;
        self.frames.push(Frame {
            name: leaf_name(name).to_string(),
            parent,
            typespace,
            resource_type: None,
        });
        Ok(self.frames.len() - 1)
    }

    /// The `/`-joined chain of step names from the root to `frame`.
    pub(crate) fn qualified_name(&self, frame: usize) -> String {
        let mut segments = Vec::new();
        let mut current = Some(frame);
        while let Some(i) = current {
            segments.push(self.frames[i].name.as_str());
            current = self.frames[i].parent;
        }
        segments.reverse();
        segments.join("/")
    }

    fn child_label(&self, parent: Option<usize>, name: &str) -> String {
        match parent {
            Some(p) => format!("{}/{}", self.qualified_name(p), leaf_name(name)),
            None => leaf_name(name).to_string(),
        }
    }

    /// The nearest `typespace` declared on `frame` or an enclosing step.
    pub(crate) fn typespace(&self, frame: usize) -> Option<String> {
        let mut current = Some(frame);
        while let Some(i) = current {
            if let Some(ts) = &self.frames[i].typespace {
                return Some(ts.clone());
            }
            current = self.frames[i].parent;
        }
        None
    }

    fn build_common<B: StepBuilder + ?Sized>(
        &mut self,
        frame: usize,
        kind: StepKind,
        node: &Node,
        b: &mut B,
    ) -> Result<(), BuildError> {
        let name = self.frames[frame].name.clone();
        b.set_name(&name);
        if let Some(guard) = string_property(node, "when")? {
            b.set_when(&guard);
        }
        b.set_parameters(self.extract_parameters(frame, kind, node, "parameters", false)?);
        b.set_returns(self.extract_parameters(frame, kind, node, "returns", true)?);
        Ok(())
    }

    fn build_workflow<B: WorkflowBuilder + ?Sized>(
        &mut self,
        frame: usize,
        node: &Node,
        b: &mut B,
    ) -> Result<(), BuildError> {
        self.build_common(frame, StepKind::Workflow, node, b)?;
        let Some(block) = STEPS_KEYS.iter().find_map(|k| node.get(k)) else {
            return Ok(());
        };
        if !block.is_map() {
            return Err(BuildError::ShapeMismatch {
                field: "steps".to_string(),
                expected: "a map of step definitions",
                actual: block.kind_name().to_string(),
            });
        }
        for (key, child) in block.entries() {
            if !(child.is_map() || child.is_body()) {
                return Err(BuildError::NotAStep {
                    name: key.name.clone(),
                    location: self.ctx.location(child.span),
                    reason: format!(
                        "expected a step definition or function body, got {}",
                        child.kind_name()
                    ),
                });
            }
            self.build_child(Some(frame), &key.name, child, b)?;
        }
        Ok(())
    }

    fn build_resource<B: ResourceBuilder + ?Sized>(
        &mut self,
        frame: usize,
        node: &Node,
        b: &mut B,
    ) -> Result<(), BuildError> {
        let name = self.frames[frame].name.clone();
        b.set_name(&name);
        if let Some(guard) = string_property(node, "when")? {
            b.set_when(&guard);
        }
        let params = self.extract_parameters(frame, StepKind::Resource, node, "parameters", false)?;
        let (state, params) = self.build_state(frame, node, params)?;
        b.set_parameters(params);
        b.set_returns(self.extract_parameters(frame, StepKind::Resource, node, "returns", true)?);
        b.set_state(state);
        for key in ["external_id", "externalId"] {
            if let Some(id) = string_property(node, key)? {
                b.set_external_id(&id);
                break;
            }
        }
        Ok(())
    }

    fn build_handler<B: HandlerBuilder + ?Sized>(
        &mut self,
        frame: usize,
        node: &Node,
        b: &mut B,
    ) -> Result<(), BuildError> {
        let name = self.frames[frame].name.clone();
        if let Some(decl) = node.as_body() {
            b.set_name(&name);
            let params = self.formal_parameters(&decl.formals)?;
            b.set_parameters(params.clone());
            b.set_returns(self.declared_returns(decl)?);
            b.set_handler(CrudHandler::Do(Invocable::new(name, params, decl.body.clone())));
            return Ok(());
        }
        self.build_common(frame, StepKind::Handler, node, b)?;
        let mut functions: Vec<(&str, &FunctionDecl)> = Vec::new();
        for (key, value) in node.entries() {
            if let Some(decl) = value.as_body() {
                functions.push((key.name.as_str(), decl));
            }
        }
        if let [("do", decl)] = functions.as_slice() {
            let params = self.formal_parameters(&decl.formals)?;
            b.set_parameters(params.clone());
            b.set_returns(self.declared_returns(decl)?);
            b.set_handler(CrudHandler::Do(Invocable::new(name, params, decl.body.clone())));
            return Ok(());
        }
        // Multi-function form; a stray `do` among lifecycle functions is
        // rejected by the dispatch constructor.
        let mut invocables = Vec::with_capacity(functions.len());
        for (fname, decl) in functions {
            let params = self.formal_parameters(&decl.formals)?;
            invocables.push(Invocable::new(fname, params, decl.body.clone()));
        }
        b.set_handler(CrudHandler::from_functions(invocables)?);
        Ok(())
    }

    fn build_iterator<B: IteratorBuilder + ?Sized>(
        &mut self,
        frame: usize,
        node: &Node,
        b: &mut B,
    ) -> Result<(), BuildError> {
        let name = self.frames[frame].name.clone();
        b.set_name(&name);
        if let Some(guard) = string_property(node, "when")? {
            b.set_when(&guard);
        }
        let mut params = self.extract_parameters(frame, StepKind::Iterator, node, "parameters", false)?;
        let Some((style, over)) = IterationStyle::DIRECTIVE_KEYS
            .iter()
            .find_map(|k| Some((IterationStyle::from_key(k)?, node.get(k)?)))
        else {
            return Err(BuildError::MissingRequiredField {
                field: "each".to_string(),
            });
        };
        b.set_style(style);
        let over = over.to_value(style.key())?;
        let over = resolve::resolve(self.ctx.types(), over, &self.ctx.types().any(), &mut params);
        b.set_over(over);
        b.set_parameters(params);
        b.set_returns(self.extract_parameters(frame, StepKind::Iterator, node, "returns", true)?);
        let variables_field = if node.has("as") { "as" } else { "variables" };
        b.set_variables(self.extract_parameters(frame, StepKind::Iterator, node, variables_field, false)?);
        if let Some(into) = string_property(node, "into")? {
            b.set_into(&into);
        }
        if let Some(producer) = node.get("step") {
            self.build_child(Some(frame), &name, producer, b)?;
        }
        Ok(())
    }

    fn build_reference<B: ReferenceBuilder + ?Sized>(
        &mut self,
        frame: usize,
        node: &Node,
        b: &mut B,
    ) -> Result<(), BuildError> {
        let name = self.frames[frame].name.clone();
        b.set_name(&name);
        if let Some(guard) = string_property(node, "when")? {
            b.set_when(&guard);
        }
        b.set_parameters(self.extract_parameters(frame, StepKind::Reference, node, "parameters", true)?);
        b.set_returns(self.extract_parameters(frame, StepKind::Reference, node, "returns", true)?);
        let mut target = None;
        for key in REFERENCE_KEYS {
            if let Some(t) = string_property(node, key)? {
                target = Some(t);
                break;
            }
        }
        // An empty or absent target means "a step of my own name".
        let target = target.filter(|t| !t.is_empty()).unwrap_or(name);
        b.set_reference_to(&target);
        Ok(())
    }

    fn formal_parameters(&self, formals: &[FormalParam]) -> Result<Vec<Parameter>, BuildError> {
        let mut params = Vec::with_capacity(formals.len());
        for formal in formals {
            let ptype = match &formal.type_name {
                Some(tn) => self.ctx.types().parse_type(tn)?,
                None => self.ctx.types().any(),
            };
            let mut p = Parameter::new(formal.name.clone(), ptype);
            p.value = formal.default.clone();
            params.push(p);
        }
        Ok(params)
    }

    fn declared_returns(&self, decl: &FunctionDecl) -> Result<Vec<Parameter>, BuildError> {
        let Some(returns) = &decl.returns else {
            return Ok(Vec::new());
        };
        let mut params = Vec::with_capacity(returns.len());
        for (name, type_name) in returns {
            params.push(Parameter::new(
                name.clone(),
                self.ctx.types().parse_type(type_name)?,
            ));
        }
        Ok(params)
    }
}
