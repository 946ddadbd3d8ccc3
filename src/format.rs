//! Signature formatting.
//!
//! Everything renders to a token stream first. Tokens distinguish plain
//! text, punctuation, keywords, literals, and cross-references, so callers
//! can render to plain text, wrapped lines, or hyperlinked markup without
//! re-parsing anything.

use crate::error::{Diagnostics, Warning};
use crate::model::{Entity, EntityId, Kind, ObjectModel, Param};
use crate::resolver;
use crate::typeexpr::{self, TypeExpr, TypeParam};

/// One token of a rendered signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SigToken {
    /// An identifier or other plain text.
    Text(String),
    /// Punctuation: brackets, commas, arrows.
    Punct(&'static str),
    /// A language keyword or builtin type name.
    Keyword(String),
    /// A literal type: quoted string, number, boolean.
    Literal(String),
    Space,
    /// A point where a long signature may wrap. Renders as nothing when the
    /// line fits.
    SoftBreak,
    /// A cross-reference. `entity` is `None` when resolution failed, in
    /// which case `display` still carries the original text.
    Ref {
        target: String,
        entity: Option<EntityId>,
        display: String,
    },
}

/// Render tokens to a single line, ignoring soft breaks.
pub fn render_plain(tokens: &[SigToken]) -> String {
    let mut out = String::new();
    for token in tokens {
        match token {
            SigToken::Text(t) | SigToken::Keyword(t) | SigToken::Literal(t) => out.push_str(t),
            SigToken::Punct(p) => out.push_str(p),
            SigToken::Space => out.push(' '),
            SigToken::SoftBreak => {}
            SigToken::Ref { display, .. } => out.push_str(display),
        }
    }
    out
}

/// Render tokens to lines no wider than `max_width`, breaking only at soft
/// break points. A segment longer than the limit stays on one line rather
/// than being split mid-token. Continuation lines are indented.
pub fn render_wrapped(tokens: &[SigToken], max_width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::new();
    let mut segment = String::new();

    let mut flush = |lines: &mut Vec<String>, line: &mut String, segment: &mut String| {
        if line.is_empty() {
            *line = std::mem::take(segment);
        } else if line.len() + segment.len() <= max_width {
            line.push_str(segment);
            segment.clear();
        } else {
            lines.push(std::mem::take(line));
            *line = format!("    {}", segment.trim_start());
            segment.clear();
        }
    };

    for token in tokens {
        match token {
            SigToken::SoftBreak => flush(&mut lines, &mut line, &mut segment),
            SigToken::Text(t) | SigToken::Keyword(t) | SigToken::Literal(t) => segment.push_str(t),
            SigToken::Punct(p) => segment.push_str(p),
            SigToken::Space => segment.push(' '),
            SigToken::Ref { display, .. } => segment.push_str(display),
        }
    }
    flush(&mut lines, &mut line, &mut segment);
    if !line.is_empty() {
        lines.push(line);
    }
    lines
}

/// Format a type expression, resolving named types against `scope`.
/// Builtin type names become keywords; everything else becomes a reference
/// token. Unresolvable names keep their text and produce a warning.
pub fn format_type(
    model: &ObjectModel,
    expr: &TypeExpr,
    scope: EntityId,
    diag: &mut Diagnostics,
) -> Vec<SigToken> {
    let mut tokens = Vec::new();
    push_type(model, expr, scope, diag, &mut tokens);
    tokens
}

fn push_type(
    model: &ObjectModel,
    expr: &TypeExpr,
    scope: EntityId,
    diag: &mut Diagnostics,
    out: &mut Vec<SigToken>,
) {
    match expr {
        TypeExpr::Named(name) => push_named(model, name, scope, diag, out),
        TypeExpr::Array(inner) => {
            push_type(model, inner, scope, diag, out);
            out.push(SigToken::Punct("[]"));
        }
        TypeExpr::Optional(inner) => {
            let needs_parens = matches!(**inner, TypeExpr::Union(_) | TypeExpr::Function { .. });
            if needs_parens {
                out.push(SigToken::Punct("("));
            }
            push_type(model, inner, scope, diag, out);
            if needs_parens {
                out.push(SigToken::Punct(")"));
            }
            out.push(SigToken::Punct("?"));
        }
        TypeExpr::Union(arms) => {
            for (i, arm) in arms.iter().enumerate() {
                if i > 0 {
                    out.push(SigToken::Space);
                    out.push(SigToken::Punct("|"));
                    out.push(SigToken::Space);
                    out.push(SigToken::SoftBreak);
                }
                push_type(model, arm, scope, diag, out);
            }
        }
        TypeExpr::Dict(key, value) => {
            out.push(SigToken::Punct("{"));
            out.push(SigToken::Space);
            out.push(SigToken::Punct("["));
            push_type(model, key, scope, diag, out);
            out.push(SigToken::Punct("]"));
            out.push(SigToken::Punct(":"));
            out.push(SigToken::Space);
            push_type(model, value, scope, diag, out);
            out.push(SigToken::Space);
            out.push(SigToken::Punct("}"));
        }
        TypeExpr::Function { params, returns } => {
            out.push(SigToken::Keyword("fun".to_string()));
            out.push(SigToken::Punct("("));
            push_type_params(model, params, scope, diag, out);
            out.push(SigToken::Punct(")"));
            if !returns.is_empty() {
                out.push(SigToken::Space);
                out.push(SigToken::SoftBreak);
                out.push(SigToken::Punct("->"));
                out.push(SigToken::Space);
                push_type_params(model, returns, scope, diag, out);
            }
        }
        TypeExpr::Generic { base, args } => {
            push_named(model, base, scope, diag, out);
            out.push(SigToken::Punct("<"));
            for (i, arg) in args.iter().enumerate() {
                if i > 0 {
                    out.push(SigToken::Punct(","));
                    out.push(SigToken::Space);
                    out.push(SigToken::SoftBreak);
                }
                push_type(model, arg, scope, diag, out);
            }
            out.push(SigToken::Punct(">"));
        }
        TypeExpr::Literal(text) => out.push(SigToken::Literal(text.clone())),
        TypeExpr::Variadic => out.push(SigToken::Punct("...")),
        TypeExpr::Unresolved(raw) => out.push(SigToken::Text(raw.clone())),
    }
}

fn push_type_params(
    model: &ObjectModel,
    params: &[TypeParam],
    scope: EntityId,
    diag: &mut Diagnostics,
    out: &mut Vec<SigToken>,
) {
    for (i, param) in params.iter().enumerate() {
        if i > 0 {
            out.push(SigToken::Punct(","));
            out.push(SigToken::Space);
            out.push(SigToken::SoftBreak);
        }
        if let Some(name) = &param.name {
            out.push(SigToken::Text(name.clone()));
            out.push(SigToken::Punct(":"));
            out.push(SigToken::Space);
        }
        push_type(model, &param.ty, scope, diag, out);
    }
}

fn push_named(
    model: &ObjectModel,
    name: &str,
    scope: EntityId,
    diag: &mut Diagnostics,
    out: &mut Vec<SigToken>,
) {
    if typeexpr::is_builtin_type(name) {
        out.push(SigToken::Keyword(name.to_string()));
        return;
    }
    let (entity, display) = resolver::resolve_with_display(model, name, scope);
    if entity.is_none() {
        diag.warn(Warning::UnresolvedReference {
            name: name.to_string(),
            scope: model.entity(scope).qualified_name.clone(),
        });
    }
    out.push(SigToken::Ref {
        target: name.to_string(),
        entity,
        display,
    });
}

/// Format a declared type string through the model's shared cache.
pub fn format_type_repr(
    model: &ObjectModel,
    repr: &str,
    scope: EntityId,
    diag: &mut Diagnostics,
) -> Vec<SigToken> {
    let expr = model.type_cache().parse(repr);
    format_type(model, &expr, scope, diag)
}

/// Format the declaration signature of any entity, dispatching on kind.
pub fn entity_signature(
    model: &ObjectModel,
    id: EntityId,
    diag: &mut Diagnostics,
) -> Vec<SigToken> {
    let entity = model.entity(id);
    match entity.kind {
        Kind::Function => function_signature(model, id, diag),
        Kind::Class => class_signature(model, id, diag),
        Kind::Alias | Kind::Enum => alias_signature(model, id, diag),
        _ => value_signature(model, id, diag),
    }
}

/// `name(param: type, ...) -> ret` with the method separator when the
/// function takes an implicit self.
pub fn function_signature(
    model: &ObjectModel,
    id: EntityId,
    diag: &mut Diagnostics,
) -> Vec<SigToken> {
    let entity = model.entity(id);
    let mut out = Vec::new();
    out.push(SigToken::Text(display_title(model, entity)));

    if !entity.generics.is_empty() {
        out.push(SigToken::Punct("<"));
        push_params(model, &entity.generics, id, diag, &mut out);
        out.push(SigToken::Punct(">"));
    }

    out.push(SigToken::Punct("("));
    let params: Vec<Param> = match &entity.signature {
        Some(sig) => {
            let skip_self = sig.implicit_self
                && sig
                    .params
                    .first()
                    .is_some_and(|p| p.name.as_deref() == Some("self"));
            sig.params.iter().skip(usize::from(skip_self)).cloned().collect()
        }
        None => Vec::new(),
    };
    push_params(model, &params, id, diag, &mut out);
    out.push(SigToken::Punct(")"));

    if let Some(sig) = &entity.signature {
        if !sig.returns.is_empty() {
            out.push(SigToken::Space);
            out.push(SigToken::SoftBreak);
            out.push(SigToken::Punct("->"));
            out.push(SigToken::Space);
            push_params(model, &sig.returns, id, diag, &mut out);
        }
    }
    out
}

fn push_params(
    model: &ObjectModel,
    params: &[Param],
    scope: EntityId,
    diag: &mut Diagnostics,
    out: &mut Vec<SigToken>,
) {
    for (i, param) in params.iter().enumerate() {
        if i > 0 {
            out.push(SigToken::Punct(","));
            out.push(SigToken::Space);
            out.push(SigToken::SoftBreak);
        }
        match (&param.name, &param.type_repr) {
            (Some(name), Some(repr)) => {
                out.push(SigToken::Text(name.clone()));
                out.push(SigToken::Punct(":"));
                out.push(SigToken::Space);
                out.extend(format_type_repr(model, repr, scope, diag));
            }
            (Some(name), None) => out.push(SigToken::Text(name.clone())),
            (None, Some(repr)) => out.extend(format_type_repr(model, repr, scope, diag)),
            (None, None) => {}
        }
    }
}

/// `class Name: Base1, Base2`.
pub fn class_signature(
    model: &ObjectModel,
    id: EntityId,
    diag: &mut Diagnostics,
) -> Vec<SigToken> {
    let entity = model.entity(id);
    let mut out = vec![
        SigToken::Keyword("class".to_string()),
        SigToken::Space,
        SigToken::Text(display_title(model, entity)),
    ];
    if !entity.bases.is_empty() {
        out.push(SigToken::Punct(":"));
        out.push(SigToken::Space);
        for (i, (raw, resolved)) in entity.bases.iter().enumerate() {
            if i > 0 {
                out.push(SigToken::Punct(","));
                out.push(SigToken::Space);
                out.push(SigToken::SoftBreak);
            }
            match resolved {
                Some(base) => out.push(SigToken::Ref {
                    target: raw.clone(),
                    entity: Some(*base),
                    display: model.entity(*base).qualified_name.clone(),
                }),
                None => out.extend(format_type_repr(model, raw, id, diag)),
            }
        }
    }
    out
}

/// `alias Name = type` and `enum Name = type`.
pub fn alias_signature(
    model: &ObjectModel,
    id: EntityId,
    diag: &mut Diagnostics,
) -> Vec<SigToken> {
    let entity = model.entity(id);
    let keyword = match entity.kind {
        Kind::Enum => "enum",
        _ => "alias",
    };
    let mut out = vec![
        SigToken::Keyword(keyword.to_string()),
        SigToken::Space,
        SigToken::Text(display_title(model, entity)),
    ];
    if let Some(repr) = &entity.type_repr {
        out.push(SigToken::Space);
        out.push(SigToken::Punct("="));
        out.push(SigToken::Space);
        out.extend(format_type_repr(model, repr, id, diag));
    }
    out
}

/// `name: type = literal` for data, constants, and attributes.
pub fn value_signature(
    model: &ObjectModel,
    id: EntityId,
    diag: &mut Diagnostics,
) -> Vec<SigToken> {
    let entity = model.entity(id);
    let mut out = vec![SigToken::Text(display_title(model, entity))];
    if let Some(repr) = &entity.type_repr {
        out.push(SigToken::Punct(":"));
        out.push(SigToken::Space);
        out.extend(format_type_repr(model, repr, id, diag));
    }
    if let Some(literal) = &entity.literal {
        out.push(SigToken::Space);
        out.push(SigToken::Punct("="));
        out.push(SigToken::Space);
        out.push(SigToken::Literal(literal.clone()));
    }
    out
}

/// Local name of an entity, with the method separator for functions that
/// take an implicit self.
fn display_title(model: &ObjectModel, entity: &Entity) -> String {
    let implicit_self = entity
        .signature
        .as_ref()
        .is_some_and(|sig| sig.implicit_self);
    if implicit_self {
        if let Some(parent) = entity.parent {
            let parent = model.entity(parent);
            if parent.kind != Kind::Module && !parent.name.is_empty() {
                return format!("{}:{}", parent.name, entity.name);
            }
        }
    }
    entity.name.clone()
}
