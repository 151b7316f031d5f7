//! Name grammars shared by both front-ends.
//!
//! Two lexical categories drive classification and parameter resolution:
//!
//! * variable names: lowercase start, word characters, optionally
//!   dot-separated segments for nested access (`region`, `tags.a`)
//! * type names: one or more capitalized segments separated by `::`
//!   (`Aws::Instance`)

use once_cell::sync::Lazy;
use regex::Regex;

static VAR_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\A[a-z]\w*(?:\.[a-z]\w*)*\z").expect("variable name pattern"));

static TYPE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\A[A-Z][\w]*(?:::[A-Z][\w]*)*\z").expect("type name pattern"));

/// The sigil that marks a string literal as a variable reference.
pub const REFERENCE_SIGIL: char = '$';

/// True when `s` matches the variable-name grammar.
pub fn is_var_name(s: &str) -> bool {
    VAR_NAME.is_match(s)
}

/// True when `s` matches the type-name grammar.
pub fn is_type_name(s: &str) -> bool {
    TYPE_NAME.is_match(s)
}

/// The last `::`-separated segment of a qualified name.
pub fn leaf_name(name: &str) -> &str {
    name.rsplit("::").next().unwrap_or(name)
}

/// If `s` is a reference (`$` sigil followed by a variable name), the
/// referenced variable name.
pub fn reference_name(s: &str) -> Option<&str> {
    let rest = s.strip_prefix(REFERENCE_SIGIL)?;
    if !rest.is_empty() && is_var_name(rest) {
        Some(rest)
    } else {
        None
    }
}
