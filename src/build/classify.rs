//! Step classification.
//!
//! One pass over a node's declared keys decides which of the five step
//! kinds it is; the result is never re-derived later. Document nodes are
//! classified structurally; DSL nodes carry an explicit style tag set by
//! their grammar and only the iterator shape is structural for them.

use crate::ast::StepStyle;
use crate::build::Context;
use crate::error::BuildError;
use crate::names::is_type_name;
use crate::node::Node;
use crate::step::{IterationStyle, StepKind};

/// Keys that make a node a workflow.
pub(crate) const STEPS_KEYS: [&str; 2] = ["steps", "activities"];

/// Keys that make a node a reference.
pub(crate) const REFERENCE_KEYS: [&str; 2] = ["reference", "call"];

/// The legacy resource-state key.
pub(crate) const STATE_KEY: &str = "state";

/// The single key matching the type-name grammar on a structural-form
/// resource node, when exactly one exists.
pub(crate) fn type_name_key(node: &Node) -> Option<&str> {
    let mut found = None;
    for (key, _) in node.entries() {
        if is_type_name(&key.name) {
            if found.is_some() {
                return None;
            }
            found = Some(key.name.as_str());
        }
    }
    found
}

fn has_any(node: &Node, keys: &[&str]) -> bool {
    keys.iter().any(|k| node.has(k))
}

/// Determine the step kind of a node.
///
/// A node matching more than one kind's shape is a configuration error;
/// a node matching none is a handler only when it is a callable body.
pub(crate) fn classify(ctx: &Context, name: &str, node: &Node) -> Result<StepKind, BuildError> {
    if node.is_body() {
        return Ok(StepKind::Handler);
    }

    if let Some(style) = node.style {
        // The tree front-end's grammar already decided; iterator shapes
        // are still structural (the lowering wraps the producer).
        if has_any(node, &IterationStyle::DIRECTIVE_KEYS) {
            return Ok(StepKind::Iterator);
        }
        return Ok(match style {
            StepStyle::Workflow => StepKind::Workflow,
            StepStyle::Resource => StepKind::Resource,
            StepStyle::Handler => StepKind::Handler,
        });
    }

    if !node.is_map() {
        return Err(BuildError::NotAStep {
            name: name.to_string(),
            location: ctx.location(node.span),
            reason: format!(
                "expected a step definition or function body, got {}",
                node.kind_name()
            ),
        });
    }

    let mut kinds = Vec::new();
    if has_any(node, &STEPS_KEYS) {
        kinds.push(StepKind::Workflow);
    }
    if has_any(node, &IterationStyle::DIRECTIVE_KEYS) {
        kinds.push(StepKind::Iterator);
    }
    if has_any(node, &REFERENCE_KEYS) {
        kinds.push(StepKind::Reference);
    }
    if node.has(STATE_KEY) || type_name_key(node).is_some() {
        kinds.push(StepKind::Resource);
    }

    match kinds.len() {
        1 => Ok(kinds[0]),
        0 => Err(BuildError::NotAStep {
            name: name.to_string(),
            location: ctx.location(node.span),
            reason: "the definition has neither workflow steps, an iteration directive, \
                     a reference, nor a resource state"
                .to_string(),
        }),
        _ => {
            let matched: Vec<String> = kinds.iter().map(|k| k.to_string()).collect();
            Err(BuildError::NotAStep {
                name: name.to_string(),
                location: ctx.location(node.span),
                reason: format!("the definition matches more than one step shape: {}", matched.join(", ")),
            })
        }
    }
}
