//! Tolerant parser for type annotations embedded in analyzer exports.
//!
//! Annotations arrive as plain strings (`fun(x: integer): boolean`,
//! `table<string, Sound>`, `string|nil`...). Parsing never fails outright:
//! any subexpression that cannot be understood degrades to
//! [`TypeExpr::Unresolved`] carrying the original text, so formatting always
//! reproduces the input even on partial failure.

use std::collections::HashMap;
use std::fmt::Display;
use std::sync::{Arc, RwLock};

/// Built-in type names of the source language. The formatter renders these
/// as keywords instead of cross-references.
pub const BUILTIN_TYPES: &[&str] = &[
    "nil",
    "any",
    "unknown",
    "boolean",
    "string",
    "number",
    "integer",
    "function",
    "table",
    "thread",
    "userdata",
    "lightuserdata",
];

pub fn is_builtin_type(name: &str) -> bool {
    BUILTIN_TYPES.contains(&name)
}

/// A parsed type expression. Immutable once built; cached per raw input
/// string in a [`TypeCache`].
#[derive(Debug, Clone, PartialEq)]
pub enum TypeExpr {
    /// A dotted identifier path: `integer`, `sound.Source`.
    Named(String),
    /// Array sugar: `T[]`.
    Array(Box<TypeExpr>),
    /// Dict sugar: `{ [K]: V }` or `table<K, V>`; both parse to this shape.
    Dict(Box<TypeExpr>, Box<TypeExpr>),
    /// Function sugar: `fun(a: T, b: U): R`. The `->` and `:` return
    /// separators produce the same shape.
    Function {
        params: Vec<TypeParam>,
        returns: Vec<TypeParam>,
    },
    /// Alternatives joined by `|`.
    Union(Vec<TypeExpr>),
    /// A trailing `?`: `string?` desugars to `Optional(string)`.
    Optional(Box<TypeExpr>),
    /// Generic instantiation: `Promise<T>`.
    Generic { base: String, args: Vec<TypeExpr> },
    /// A quoted string or number used in literal-union aliases.
    Literal(String),
    /// The `...` variadic marker.
    Variadic,
    /// Anything that failed to parse; holds the exact original text span.
    Unresolved(String),
}

/// A possibly-named element of a function parameter or return list.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeParam {
    pub name: Option<String>,
    pub ty: TypeExpr,
}

impl TypeParam {
    fn unnamed(ty: TypeExpr) -> Self {
        TypeParam { name: None, ty }
    }
}

impl Display for TypeExpr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TypeExpr::Named(path) => write!(f, "{path}"),
            TypeExpr::Array(inner) => write!(f, "{inner}[]"),
            TypeExpr::Dict(key, value) => write!(f, "{{ [{key}]: {value} }}"),
            TypeExpr::Function { params, returns } => {
                write!(f, "fun(")?;
                for (i, p) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{p}")?;
                }
                write!(f, ")")?;
                if !returns.is_empty() {
                    write!(f, " -> ")?;
                    for (i, r) in returns.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{r}")?;
                    }
                }
                Ok(())
            }
            TypeExpr::Union(alts) => {
                for (i, alt) in alts.iter().enumerate() {
                    if i > 0 {
                        write!(f, " | ")?;
                    }
                    write!(f, "{alt}")?;
                }
                Ok(())
            }
            TypeExpr::Optional(inner) => match inner.as_ref() {
                // A union needs parens for the `?` to bind the whole thing.
                TypeExpr::Union(_) | TypeExpr::Function { .. } => write!(f, "({inner})?"),
                _ => write!(f, "{inner}?"),
            },
            TypeExpr::Generic { base, args } => {
                write!(f, "{base}<")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ">")
            }
            TypeExpr::Literal(text) => write!(f, "{text}"),
            TypeExpr::Variadic => write!(f, "..."),
            TypeExpr::Unresolved(raw) => write!(f, "{raw}"),
        }
    }
}

impl Display for TypeParam {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{name}: {}", self.ty),
            None => write!(f, "{}", self.ty),
        }
    }
}

/// Parse a raw annotation string. Never fails; unparseable input comes back
/// as [`TypeExpr::Unresolved`].
pub fn parse(raw: &str) -> TypeExpr {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return TypeExpr::Unresolved(raw.to_string());
    }
    parse_expr(trimmed).unwrap_or_else(|| TypeExpr::Unresolved(trimmed.to_string()))
}

fn parse_fallback(text: &str) -> TypeExpr {
    let trimmed = text.trim();
    parse_expr(trimmed).unwrap_or_else(|| TypeExpr::Unresolved(trimmed.to_string()))
}

fn parse_expr(s: &str) -> Option<TypeExpr> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    // Unions bind loosest.
    let alts = split_top(s, '|');
    if alts.len() > 1 {
        return Some(TypeExpr::Union(alts.iter().map(|a| parse_fallback(a)).collect()));
    }

    if s == "..." {
        return Some(TypeExpr::Variadic);
    }

    if let Some(lit) = parse_literal(s) {
        return Some(lit);
    }

    // Trailing suffixes peel from the right: `integer[]?` is an optional
    // array, `integer?[]` an array of optionals.
    if let Some(prefix) = s.strip_suffix('?') {
        let prefix = prefix.trim_end();
        if !prefix.is_empty() && is_balanced(prefix) {
            return Some(TypeExpr::Optional(Box::new(parse_fallback(prefix))));
        }
    }
    if let Some(prefix) = s.strip_suffix("[]") {
        let prefix = prefix.trim_end();
        if !prefix.is_empty() && is_balanced(prefix) {
            return Some(TypeExpr::Array(Box::new(parse_fallback(prefix))));
        }
    }

    // Parenthesized group spanning the whole expression: `(string|nil)`.
    if s.starts_with('(') && matching_close(s, '(', ')') == Some(s.len() - 1) {
        return parse_expr(&s[1..s.len() - 1]);
    }

    if let Some(rest) = s.strip_prefix("fun") {
        let rest = rest.trim_start();
        if rest.starts_with('(') {
            return parse_function(rest);
        }
    }

    if s.starts_with('{') && matching_close(s, '{', '}') == Some(s.len() - 1) {
        return parse_table(&s[1..s.len() - 1]);
    }

    parse_named(s)
}

fn parse_literal(s: &str) -> Option<TypeExpr> {
    let mut chars = s.chars();
    let first = chars.next()?;
    if matches!(first, '"' | '\'' | '`') && s.len() >= 2 && s.ends_with(first) {
        // Make sure the closing quote isn't escaped.
        if !s[..s.len() - 1].ends_with('\\') {
            return Some(TypeExpr::Literal(s.to_string()));
        }
    }
    if first.is_ascii_digit() || (first == '.' && s.len() > 1) || first == '-' {
        if s.parse::<f64>().is_ok() {
            return Some(TypeExpr::Literal(s.to_string()));
        }
    }
    None
}

fn parse_function(s: &str) -> Option<TypeExpr> {
    // `s` starts at the opening paren of the parameter list.
    let close = matching_close(s, '(', ')')?;
    let params_text = &s[1..close];
    let rest = s[close + 1..].trim_start();

    let params = split_top(params_text, ',')
        .iter()
        .map(|p| parse_param(p, true))
        .collect();

    // Both `): R` and `) -> R` denote the return list; they normalize to
    // the same shape.
    let returns_text = if let Some(r) = rest.strip_prefix("->") {
        r
    } else if let Some(r) = rest.strip_prefix(':') {
        r
    } else if rest.is_empty() {
        ""
    } else {
        return None;
    };

    let returns = split_top(returns_text, ',')
        .iter()
        .map(|r| parse_param(r, false))
        .collect();

    Some(TypeExpr::Function { params, returns })
}

/// Parse a single `name: type` or bare `type` element of a parameter or
/// return list. In parameter position a lone identifier is a name with an
/// unknown type; in return position it is a type.
fn parse_param(s: &str, in_params: bool) -> TypeParam {
    let s = s.trim();
    let pieces = split_top(s, ':');
    if pieces.len() >= 2 {
        let head = pieces[0].trim();
        let (name, optional) = match head.strip_suffix('?') {
            Some(stripped) => (stripped.trim_end(), true),
            None => (head, false),
        };
        if is_param_name(name) {
            let ty_text = s[s.find(':').unwrap_or(0) + 1..].trim();
            let mut ty = parse_fallback(ty_text);
            if optional {
                ty = TypeExpr::Optional(Box::new(ty));
            }
            return TypeParam {
                name: Some(name.to_string()),
                ty,
            };
        }
    }
    if in_params && (is_param_name(s) || s == "...") {
        let ty = if s == "..." {
            TypeExpr::Variadic
        } else {
            TypeExpr::Named("any".to_string())
        };
        return TypeParam {
            name: Some(s.to_string()),
            ty,
        };
    }
    TypeParam::unnamed(parse_fallback(s))
}

fn parse_table(inner: &str) -> Option<TypeExpr> {
    let fields = split_top(inner, ',');
    if fields.len() == 1 {
        let field = fields[0].trim();
        // `[K]: V` indexer sugar.
        if field.starts_with('[') {
            if let Some(close) = matching_close(field, '[', ']') {
                let key = &field[1..close];
                let rest = field[close + 1..].trim_start();
                if let Some(value) = rest.strip_prefix(':') {
                    return Some(TypeExpr::Dict(
                        Box::new(parse_fallback(key)),
                        Box::new(parse_fallback(value)),
                    ));
                }
            }
        }
        // `{K: V}` shorthand with a type-shaped key.
        let pieces = split_top(field, ':');
        if pieces.len() == 2 {
            return Some(TypeExpr::Dict(
                Box::new(parse_fallback(&pieces[0])),
                Box::new(parse_fallback(&pieces[1])),
            ));
        }
    }
    // Multi-field table literals keep their text; we don't model structs.
    None
}

fn parse_named(s: &str) -> Option<TypeExpr> {
    // Optional generic argument list: `Name<...>`.
    if let Some(open) = s.find('<') {
        if s.ends_with('>') {
            let base = s[..open].trim_end();
            if is_ident_path(base) {
                let args: Vec<TypeExpr> = split_top(&s[open + 1..s.len() - 1], ',')
                    .iter()
                    .map(|a| parse_fallback(a))
                    .collect();
                if args.is_empty() {
                    return None;
                }
                // `table<K, V>` is dict sugar, same AST as `{ [K]: V }`.
                if base == "table" && args.len() == 2 {
                    let mut it = args.into_iter();
                    let key = it.next().unwrap_or(TypeExpr::Variadic);
                    let value = it.next().unwrap_or(TypeExpr::Variadic);
                    return Some(TypeExpr::Dict(Box::new(key), Box::new(value)));
                }
                return Some(TypeExpr::Generic {
                    base: base.to_string(),
                    args,
                });
            }
        }
        return None;
    }

    if is_ident_path(s) {
        return Some(TypeExpr::Named(s.to_string()));
    }
    None
}

fn is_param_name(s: &str) -> bool {
    !s.is_empty()
        && s.chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '-')
}

fn is_ident_path(s: &str) -> bool {
    if s.is_empty() || s.starts_with('.') || s.ends_with('.') {
        return false;
    }
    s.split('.')
        .all(|c| is_param_name(c) && !c.chars().next().is_some_and(|f| f.is_ascii_digit()))
}

fn is_balanced(s: &str) -> bool {
    let mut depth: i32 = 0;
    let mut scanner = StringScanner::new();
    for c in s.chars() {
        if scanner.step(c) {
            continue;
        }
        match c {
            '(' | '[' | '{' | '<' => depth += 1,
            ')' | ']' | '}' | '>' => depth -= 1,
            _ => {}
        }
    }
    depth == 0 && !scanner.in_string
}

/// Byte offset of the close paired with the opening bracket at position 0.
fn matching_close(s: &str, open: char, close: char) -> Option<usize> {
    debug_assert!(s.starts_with(open));
    let mut depth = 0;
    let mut scanner = StringScanner::new();
    for (i, c) in s.char_indices() {
        if scanner.step(c) {
            continue;
        }
        if c == open {
            depth += 1;
        } else if c == close {
            depth -= 1;
            if depth == 0 {
                return Some(i);
            }
        }
    }
    None
}

/// Tracks whether the scan position is inside a quoted literal, honoring
/// backslash escapes. Returns `true` while consuming string contents.
struct StringScanner {
    in_string: bool,
    quote: char,
    escaped: bool,
}

impl StringScanner {
    fn new() -> Self {
        StringScanner {
            in_string: false,
            quote: '\0',
            escaped: false,
        }
    }

    fn step(&mut self, c: char) -> bool {
        if self.in_string {
            if self.escaped {
                self.escaped = false;
            } else if c == self.quote {
                self.in_string = false;
            } else if c == '\\' {
                self.escaped = true;
            }
            true
        } else if matches!(c, '\'' | '"' | '`') {
            self.in_string = true;
            self.quote = c;
            false
        } else {
            false
        }
    }
}

/// Split a string on a separator, ignoring separators nested inside paren
/// groups and string literals. Empty pieces are dropped.
pub(crate) fn split_top(s: &str, sep: char) -> Vec<String> {
    let mut res = Vec::new();
    let mut depth = 0;
    let mut scanner = StringScanner::new();
    let mut start = 0;
    for (i, c) in s.char_indices() {
        if scanner.step(c) {
            continue;
        }
        match c {
            '(' | '[' | '{' | '<' => depth += 1,
            ')' | ']' | '}' | '>' => depth = (depth - 1).max(0),
            _ if depth == 0 && c == sep => {
                let piece = s[start..i].trim();
                if !piece.is_empty() {
                    res.push(piece.to_string());
                }
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    let piece = s[start..].trim();
    if !piece.is_empty() {
        res.push(piece.to_string());
    }
    res
}

/// Split a dotted object path into components, keeping bracketed
/// "type-as-name" components (`Colors.[integer]`) intact.
pub fn split_name(path: &str) -> Vec<String> {
    split_top(path, '.')
}

/// Normalize a dotted object path: bracketed components have their inner
/// type expression reparsed and reprinted so spacing differences don't
/// produce distinct names.
pub fn normalize_name(name: &str) -> String {
    if !name.contains('[') {
        return name.to_string();
    }
    split_name(name)
        .iter()
        .map(|c| {
            if c.starts_with('[') && c.ends_with(']') {
                format!("[{}]", parse(&c[1..c.len() - 1]))
            } else {
                c.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(".")
}

/// Append-only memoization cache for parsed annotations.
///
/// Concurrent lookups may race on first insertion; both sides compute
/// structurally identical ASTs, so whichever lands in the map wins.
#[derive(Debug, Default)]
pub struct TypeCache {
    cache: RwLock<HashMap<String, Arc<TypeExpr>>>,
}

impl TypeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse(&self, raw: &str) -> Arc<TypeExpr> {
        if let Ok(cache) = self.cache.read() {
            if let Some(hit) = cache.get(raw) {
                return Arc::clone(hit);
            }
        }
        let parsed = Arc::new(parse(raw));
        match self.cache.write() {
            Ok(mut cache) => Arc::clone(
                cache
                    .entry(raw.to_string())
                    .or_insert_with(|| Arc::clone(&parsed)),
            ),
            // A poisoned lock only costs us the memoization.
            Err(_) => parsed,
        }
    }
}
