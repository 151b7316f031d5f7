//! The DSL front-end.
//!
//! Lowers a parsed step expression ([`StepExpr`]) onto the shared
//! [`Node`] representation and hands it to the builder. The lowering is
//! purely structural: properties become map entries, definition blocks
//! become `steps` or `state` or lifecycle-function entries, and an
//! `iteration` property wraps the whole step in an iterator node whose
//! producer is the step itself.

use crate::ast::{BlockItem, Definition, StepExpr, StepStyle};
use crate::build::{self, Context};
use crate::error::BuildError;
use crate::node::{Key, Node, Payload};
use crate::protocol::ChildBuilder;
use crate::step::{IterationStyle, Step};

/// Build one step expression into an owned step tree.
pub fn build_step_expr(ctx: &Context, expr: &StepExpr) -> Result<Step, BuildError> {
    let node = lower_step(expr)?;
    build::build_step(ctx, &expr.name, &node)
}

/// Build one step expression into `sink`.
pub fn build_step_expr_into<B: ChildBuilder + ?Sized>(
    ctx: &Context,
    expr: &StepExpr,
    sink: &mut B,
) -> Result<(), BuildError> {
    let node = lower_step(expr)?;
    build::build_into(ctx, &expr.name, &node, sink)
}

/// Lower a step expression onto the shared node representation.
pub fn lower_step(expr: &StepExpr) -> Result<Node, BuildError> {
    let mut entries: Vec<(Key, Node)> = Vec::new();
    let mut iteration = None;
    for (key, value) in &expr.properties {
        if key.name == "iteration" {
            iteration = Some(value);
            continue;
        }
        entries.push((key.clone(), value.clone()));
    }

    let mut bare_body = None;
    match (&expr.style, &expr.definition) {
        (_, None) => {}
        (StepStyle::Workflow, Some(Definition::Block(items))) => {
            let mut steps = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    BlockItem::Step(child) => {
                        steps.push((
                            Key::with_span(child.name.as_str(), child.span),
                            lower_step(child)?,
                        ));
                    }
                    BlockItem::Function(decl) => {
                        steps.push((
                            Key::with_span(decl.name.as_str(), decl.span),
                            Node::with_span(Payload::Body(decl.clone()), decl.span),
                        ));
                    }
                }
            }
            entries.push((Key::new("steps"), Node::with_span(Payload::Map(steps), expr.span)));
        }
        (StepStyle::Resource, Some(Definition::Hash(state, span))) => {
            entries.push((
                Key::new("state"),
                Node::with_span(Payload::Map(state.clone()), *span),
            ));
        }
        (StepStyle::Handler, Some(Definition::Body(decl))) => {
            if entries.is_empty() {
                bare_body = Some(Node::with_span(Payload::Body(decl.clone()), decl.span));
            } else {
                entries.push((
                    Key::with_span("do", decl.span),
                    Node::with_span(Payload::Body(decl.clone()), decl.span),
                ));
            }
        }
        (StepStyle::Handler, Some(Definition::Block(items))) => {
            for item in items {
                match item {
                    BlockItem::Function(decl) => {
                        entries.push((
                            Key::with_span(decl.name.as_str(), decl.span),
                            Node::with_span(Payload::Body(decl.clone()), decl.span),
                        ));
                    }
                    BlockItem::Step(child) => {
                        return Err(BuildError::ShapeMismatch {
                            field: child.name.clone(),
                            expected: "a lifecycle function",
                            actual: "a nested step".to_string(),
                        });
                    }
                }
            }
        }
        (style, Some(definition)) => {
            return Err(BuildError::ShapeMismatch {
                field: "definition".to_string(),
                expected: definition_shape(*style),
                actual: definition_kind(definition).to_string(),
            });
        }
    }

    let node = match bare_body {
        Some(body) => body,
        None => Node::with_span(Payload::Map(entries), expr.span).with_style(expr.style),
    };
    match iteration {
        Some(iteration) => lower_iteration(expr, iteration, node),
        None => Ok(node),
    }
}

fn definition_shape(style: StepStyle) -> &'static str {
    match style {
        StepStyle::Workflow => "a block of nested steps",
        StepStyle::Resource => "a state hash",
        StepStyle::Handler => "a function body or a block of lifecycle functions",
    }
}

fn definition_kind(definition: &Definition) -> &'static str {
    match definition {
        Definition::Block(_) => "a block",
        Definition::Hash(..) => "a hash",
        Definition::Body(_) => "a function body",
    }
}

/// Wrap the lowered step in an iterator node. The `iteration` property
/// names the directive (`function`), the source collection (`over`) and
/// the per-iteration variables (`as`); the step itself becomes the
/// iterator's producer under the `step` key.
fn lower_iteration(expr: &StepExpr, iteration: &Node, producer: Node) -> Result<Node, BuildError> {
    if !iteration.is_map() {
        return Err(BuildError::ShapeMismatch {
            field: "iteration".to_string(),
            expected: "a map",
            actual: iteration.kind_name().to_string(),
        });
    }
    let function = match iteration.get("function") {
        None => {
            return Err(BuildError::MissingRequiredField {
                field: "iteration.function".to_string(),
            })
        }
        Some(f) => f.as_str().ok_or_else(|| BuildError::ShapeMismatch {
            field: "iteration.function".to_string(),
            expected: "a string",
            actual: f.kind_name().to_string(),
        })?,
    };
    let style = IterationStyle::from_key(function).ok_or_else(|| BuildError::ShapeMismatch {
        field: "iteration.function".to_string(),
        expected: "one of 'each', 'eachPair', 'times' or 'range'",
        actual: function.to_string(),
    })?;
    let mut entries = Vec::with_capacity(4);
    let over = iteration
        .get("over")
        .cloned()
        .unwrap_or_else(|| Node::with_span(Payload::Null, iteration.span));
    entries.push((Key::new(style.key()), over));
    if let Some(vars) = iteration.get("vars").or_else(|| iteration.get("as")) {
        entries.push((Key::new("as"), vars.clone()));
    }
    if let Some(into) = iteration.get("into") {
        entries.push((Key::new("into"), into.clone()));
    }
    entries.push((Key::with_span("step", expr.span), producer));
    Ok(Node::with_span(Payload::Map(entries), expr.span))
}
