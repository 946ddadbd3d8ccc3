//! Scope-chain name resolution.
//!
//! Given a reference written somewhere in the documentation tree, find the
//! entity it denotes by searching the same chain the source language itself
//! searches: the enclosing class path, then the enclosing module, then the
//! global namespace.

use crate::model::{EntityId, ObjectModel};
use crate::typeexpr::{normalize_name, split_name};

/// Prefix that hides the qualified part of a reference in output. It only
/// affects display, never resolution.
pub const HIDE_PREFIX: char = '~';

/// Resolve `name` as written inside `scope`.
///
/// Candidates are tried in a fixed order and the first hit wins:
/// module + class chain + name, module + name, then name alone (treated as
/// fully qualified). Qualified names are globally unique, so the order only
/// decides which candidate path is tried first.
pub fn resolve(model: &ObjectModel, name: &str, scope: EntityId) -> Option<EntityId> {
    let name = clean_target(name);
    if name.is_empty() {
        return None;
    }
    for candidate in candidates(model, &name, scope) {
        if let Some(id) = model.find(&candidate) {
            return Some(id);
        }
    }
    None
}

/// The candidate paths `resolve` would try, in order.
pub fn candidates(model: &ObjectModel, name: &str, scope: EntityId) -> Vec<String> {
    let (module, class) = model.scope_of(scope);
    [
        join_path(&[&module, &class, name]),
        join_path(&[&module, name]),
        name.to_string(),
    ]
    .into_iter()
    .fold(Vec::new(), |mut acc, c| {
        if !acc.contains(&c) {
            acc.push(c);
        }
        acc
    })
}

/// Resolution plus the text to display for the reference. A leading `~`
/// shortens the display to the last path component; the original text is
/// kept verbatim when resolution fails.
pub fn resolve_with_display(
    model: &ObjectModel,
    name: &str,
    scope: EntityId,
) -> (Option<EntityId>, String) {
    let resolved = resolve(model, name, scope);
    (resolved, display_text(name))
}

/// Display form of a reference, honoring the hide prefix.
pub fn display_text(name: &str) -> String {
    let trimmed = name.trim();
    match trimmed.strip_prefix(HIDE_PREFIX) {
        Some(rest) => split_name(rest).pop().unwrap_or_else(|| rest.to_string()),
        None => normalize_name(trimmed),
    }
}

fn clean_target(name: &str) -> String {
    let mut name = name.trim();
    name = name.strip_prefix(HIDE_PREFIX).unwrap_or(name);
    name = name.strip_suffix("()").unwrap_or(name);
    normalize_name(name.trim())
}

fn join_path(components: &[&str]) -> String {
    components
        .iter()
        .filter(|c| !c.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(".")
}
