//! The document front-end.
//!
//! A document (typically deserialized from YAML by the caller) arrives
//! as an untagged [`Node`] tree whose root must be a map; the root step's
//! name is derived from the file path. Everything else is structural and
//! handled by the shared builder.

use std::path::Path;

use crate::build::{self, Context};
use crate::error::BuildError;
use crate::node::Node;
use crate::protocol::ChildBuilder;
use crate::step::Step;

/// Derive the root step name from a source file path.
///
/// Path segments below a `workflows` directory are joined with `::` so
/// that nested files produce qualified names; without such a directory
/// the file's stem alone is the name. The final extension is dropped.
pub fn step_name_from_path(path: &Path) -> String {
    let segments: Vec<&str> = path
        .iter()
        .filter_map(|s| s.to_str())
        .collect();
    let below = segments
        .iter()
        .position(|s| s.eq_ignore_ascii_case("workflows"))
        .map(|i| i + 1)
        .filter(|i| *i < segments.len());
    let name = match below {
        Some(i) => segments[i..].join("::"),
        None => segments.last().copied().unwrap_or_default().to_string(),
    };
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => name
            .strip_suffix(&format!(".{ext}"))
            .map(str::to_string)
            .unwrap_or(name),
        None => name,
    }
}

/// Build the document rooted at `root` into an owned step tree, naming
/// the root step `name`.
pub fn build_document_step(ctx: &Context, name: &str, root: &Node) -> Result<Step, BuildError> {
    check_root(ctx, name, root)?;
    build::build_step(ctx, name, root)
}

/// Build the document rooted at `root` into `sink`.
pub fn build_document_into<B: ChildBuilder + ?Sized>(
    ctx: &Context,
    name: &str,
    root: &Node,
    sink: &mut B,
) -> Result<(), BuildError> {
    check_root(ctx, name, root)?;
    build::build_into(ctx, name, root, sink)
}

/// Build the document loaded from `path`, deriving the root step name
/// from the path.
pub fn build_file_step(ctx: &Context, path: &Path, root: &Node) -> Result<Step, BuildError> {
    build_document_step(ctx, &step_name_from_path(path), root)
}

fn check_root(ctx: &Context, name: &str, root: &Node) -> Result<(), BuildError> {
    if root.is_map() {
        return Ok(());
    }
    Err(BuildError::NotAStep {
        name: name.to_string(),
        location: ctx.location(root.span),
        reason: format!("a step document must be a map, got {}", root.kind_name()),
    })
}
