//! Analyzer export decoding.
//!
//! Two backends produce the JSON exports this crate consumes. Both decode
//! into the same backend-neutral [`RawRecord`] stream; everything downstream
//! of this module is backend-agnostic. Decoding is tolerant of missing
//! fields, but a document that is not the expected shape at the top level is
//! a fatal [`LuaDocError::MalformedExport`].

use serde::Deserialize;
use serde_json::Value;

use crate::error::LuaDocError;
pub use crate::model::Visibility as RawVisibility;

/// What the analyzer said an object is, before doctype overrides apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KindHint {
    Module,
    Class,
    Table,
    Callable,
    Value,
    Alias,
    Enum,
}

/// A parameter, return value, or generic parameter as exported.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawParam {
    pub name: Option<String>,
    pub type_repr: Option<String>,
    pub doc: Option<String>,
}

/// One object from an analyzer export, in backend-neutral form. Paths may
/// be dotted; the builder creates placeholder namespaces for intermediate
/// components.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRecord {
    pub path: String,
    pub hint: Option<KindHint>,
    /// A doctype override the backend carried directly (EmmyLua tags).
    /// Overrides found in `!doctype` doc markers are extracted later.
    pub doctype: Option<String>,
    pub doc: Option<String>,
    /// Options the backend carried directly (EmmyLua `doc` tags).
    pub doc_options: Vec<(String, String)>,
    pub visibility: RawVisibility,
    pub bases: Vec<String>,
    pub generics: Vec<RawParam>,
    pub params: Vec<RawParam>,
    pub returns: Vec<RawParam>,
    /// Overload signatures as type strings, parsed later with the type
    /// expression parser.
    pub overloads: Vec<String>,
    pub implicit_self: bool,
    pub type_repr: Option<String>,
    pub literal: Option<String>,
    pub deprecated: bool,
    pub deprecation_reason: Option<String>,
    pub nodiscard: bool,
    pub nodiscard_reason: Option<String>,
    pub is_async: bool,
    pub file: Option<String>,
    pub line: Option<u32>,
    pub children: Vec<RawRecord>,
}

/// Decode a lua-language-server `doc.json` export.
pub fn records_from_luals(source: &str) -> Result<Vec<RawRecord>, LuaDocError> {
    let toplevels: Vec<LuaLsToplevel> =
        serde_json::from_str(source).map_err(|e| LuaDocError::MalformedExport {
            reason: e.to_string(),
        })?;

    let mut records = Vec::new();
    for toplevel in toplevels {
        if toplevel.name.is_empty() {
            continue;
        }
        let mut record = luals_definitions(&toplevel.defines);
        record.path = toplevel.name;
        for field in toplevel.fields {
            let Some(name) = field.name.clone() else { continue };
            let mut child = luals_field(&field);
            child.path = name;
            record.children.push(child);
        }
        records.push(record);
    }
    Ok(records)
}

#[derive(Debug, Deserialize)]
struct LuaLsToplevel {
    #[serde(default)]
    name: String,
    #[serde(default)]
    defines: Vec<LuaLsDefine>,
    #[serde(default)]
    fields: Vec<LuaLsDefine>,
}

/// Defines and fields share the same shape; only `extends` differs (a list
/// of base types for classes, a single value description otherwise).
#[derive(Debug, Deserialize, Default)]
struct LuaLsDefine {
    #[serde(rename = "type", default)]
    define_type: String,
    name: Option<String>,
    #[serde(default)]
    extends: Value,
    view: Option<String>,
    desc: Option<String>,
    file: Option<String>,
    start: Option<Vec<u32>>,
    visible: Option<String>,
    #[serde(default)]
    deprecated: bool,
    #[serde(default, rename = "async")]
    is_async: bool,
}

fn luals_definitions(defines: &[LuaLsDefine]) -> RawRecord {
    // the first recognized definition wins; later ones usually repeat it
    for define in defines {
        match define.define_type.as_str() {
            "doc.class" => {
                let mut record = luals_common(define);
                record.hint = Some(KindHint::Class);
                record.doc = define.desc.clone();
                if let Value::Array(bases) = &define.extends {
                    for base in bases {
                        if let Some(view) = base.get("view").and_then(Value::as_str) {
                            record.bases.push(normalize_luals_type(view));
                        }
                    }
                }
                return record;
            }
            "doc.alias" => {
                let mut record = luals_common(define);
                record.hint = Some(KindHint::Alias);
                record.type_repr = Some(normalize_luals_type(
                    define.view.as_deref().unwrap_or("unknown"),
                ));
                record.doc = unwrap_alias_doc(define.desc.as_deref());
                return record;
            }
            "doc.enum" => {
                let mut record = luals_common(define);
                record.hint = Some(KindHint::Enum);
                record.doc = define.desc.clone();
                return record;
            }
            _ => {}
        }
    }
    match defines.first() {
        Some(define) => luals_field(define),
        // nothing usable; treat as a plain namespace
        None => RawRecord {
            hint: Some(KindHint::Module),
            ..RawRecord::default()
        },
    }
}

fn luals_field(define: &LuaLsDefine) -> RawRecord {
    let mut record = luals_common(define);
    record.doc = define.desc.clone();

    match define.extends.as_object() {
        Some(extends) if extends.get("type").and_then(Value::as_str) == Some("function") => {
            record.hint = Some(KindHint::Callable);
            record.implicit_self = define.define_type == "setmethod";
            record.params = luals_params(extends.get("args"));
            record.returns = luals_params(extends.get("returns"));
        }
        Some(_) => {
            record.hint = Some(KindHint::Value);
            record.type_repr = Some(normalize_luals_type(
                define.view.as_deref().unwrap_or("unknown"),
            ));
        }
        // no value description at all; a plain namespace table
        None => record.hint = Some(KindHint::Module),
    }
    record
}

fn luals_params(params: Option<&Value>) -> Vec<RawParam> {
    let Some(Value::Array(params)) = params else {
        return Vec::new();
    };
    params
        .iter()
        .map(|param| {
            let name = if param.get("type").and_then(Value::as_str) == Some("...") {
                Some("...".to_string())
            } else {
                param
                    .get("name")
                    .and_then(Value::as_str)
                    .map(str::to_string)
            };
            RawParam {
                name,
                type_repr: Some(normalize_luals_type(
                    param.get("view").and_then(Value::as_str).unwrap_or("unknown"),
                )),
                doc: param
                    .get("desc")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            }
        })
        .collect()
}

fn luals_common(define: &LuaLsDefine) -> RawRecord {
    RawRecord {
        visibility: parse_visibility(define.visible.as_deref()),
        deprecated: define.deprecated,
        is_async: define.is_async,
        file: define.file.clone().map(strip_file_scheme),
        line: define.start.as_ref().and_then(|s| s.first().copied()),
        ..RawRecord::default()
    }
}

/// `(name)?` comes out of the analyzer for optional named types; unwrap the
/// redundant parentheses.
fn normalize_luals_type(view: &str) -> String {
    let inner = view
        .strip_prefix('(')
        .and_then(|rest| rest.strip_suffix(")?"));
    match inner {
        Some(name)
            if !name.is_empty()
                && name
                    .chars()
                    .all(|c| c.is_alphanumeric() || matches!(c, '_' | '.' | '-')) =>
        {
            format!("{name}?")
        }
        _ => view.to_string(),
    }
}

/// Alias descriptions arrive as a Lua code block with the documentation in
/// comment lines; pull those out.
fn unwrap_alias_doc(desc: Option<&str>) -> Option<String> {
    let desc = desc?;
    let Some(body) = desc
        .strip_prefix("```lua\n")
        .and_then(|rest| rest.strip_suffix("\n```"))
    else {
        return Some(desc.to_string());
    };
    let doc: Vec<&str> = body
        .lines()
        .filter_map(|line| line.strip_prefix("--"))
        .collect();
    Some(doc.join("\n"))
}

fn strip_file_scheme(file: String) -> String {
    let trimmed = file.trim_start();
    let trimmed = trimmed
        .strip_prefix("[FOREIGN]")
        .map(str::trim_start)
        .unwrap_or(trimmed);
    match trimmed.find("://") {
        Some(pos) => trimmed[pos + 3..].to_string(),
        None => trimmed.to_string(),
    }
}

fn parse_visibility(visible: Option<&str>) -> RawVisibility {
    match visible {
        Some("protected") => RawVisibility::Protected,
        Some("private") | Some("internal") => RawVisibility::Private,
        Some("package") => RawVisibility::Package,
        _ => RawVisibility::Public,
    }
}

/// Decode an emmylua_doc_cli export.
pub fn records_from_emmylua(source: &str) -> Result<Vec<RawRecord>, LuaDocError> {
    let export: EmmyExport =
        serde_json::from_str(source).map_err(|e| LuaDocError::MalformedExport {
            reason: e.to_string(),
        })?;

    let mut records = Vec::new();
    for module in export.modules {
        let mut record = emmy_common(&module.common);
        record.path = module.name;
        record.hint = Some(KindHint::Module);
        record.file = module.file;
        record.children = emmy_members(module.members);
        if !record.path.is_empty() {
            records.push(record);
        }
    }
    for ty in export.types {
        let hint = match ty.type_name.as_str() {
            "class" => KindHint::Class,
            "enum" => KindHint::Enum,
            "alias" => KindHint::Alias,
            _ => continue,
        };
        let mut record = emmy_common(&ty.common);
        record.path = ty.name;
        record.hint = Some(hint);
        record.bases = ty.bases;
        record.generics = emmy_generics(ty.generics);
        record.children = emmy_members(ty.members);
        if hint != KindHint::Class {
            record.type_repr = Some(ty.typ.unwrap_or_else(|| "unknown".to_string()));
        }
        if let Some(loc) = ty.loc.first() {
            record.file = Some(loc.file.clone());
            record.line = Some(loc.line.saturating_sub(1));
        }
        if !record.path.is_empty() {
            records.push(record);
        }
    }
    for global in export.globals {
        let mut record = emmy_common(&global.common);
        record.path = global.name;
        match global.type_name.as_str() {
            "table" => {
                record.hint = Some(KindHint::Table);
                record.children = emmy_members(global.members);
            }
            "field" => {
                record.hint = Some(KindHint::Value);
                record.type_repr = global.typ;
                record.literal = global.literal;
            }
            _ => continue,
        }
        if let Some(loc) = &global.loc {
            record.file = Some(loc.file.clone());
            record.line = Some(loc.line.saturating_sub(1));
        }
        if !record.path.is_empty() {
            records.push(record);
        }
    }
    Ok(records)
}

#[derive(Debug, Deserialize)]
struct EmmyExport {
    #[serde(default)]
    modules: Vec<EmmyModule>,
    #[serde(default)]
    types: Vec<EmmyType>,
    #[serde(default)]
    globals: Vec<EmmyGlobal>,
}

#[derive(Debug, Deserialize, Default)]
struct EmmyCommon {
    description: Option<String>,
    visibility: Option<String>,
    #[serde(default)]
    tag_content: Option<Vec<EmmyTag>>,
    #[serde(default)]
    is_async: bool,
    #[serde(default)]
    deprecated: bool,
    deprecation_reason: Option<String>,
    #[serde(default)]
    is_nodiscard: bool,
    nodiscard_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EmmyTag {
    tag_name: String,
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct EmmyModule {
    name: String,
    file: Option<String>,
    #[serde(default)]
    members: Vec<EmmyMember>,
    #[serde(flatten)]
    common: EmmyCommon,
}

#[derive(Debug, Deserialize)]
struct EmmyType {
    #[serde(rename = "type")]
    type_name: String,
    name: String,
    typ: Option<String>,
    #[serde(default)]
    bases: Vec<String>,
    #[serde(default)]
    generics: Vec<EmmyGeneric>,
    #[serde(default)]
    members: Vec<EmmyMember>,
    #[serde(default)]
    loc: Vec<EmmyLoc>,
    #[serde(flatten)]
    common: EmmyCommon,
}

#[derive(Debug, Deserialize)]
struct EmmyGlobal {
    #[serde(rename = "type")]
    type_name: String,
    name: String,
    typ: Option<String>,
    literal: Option<String>,
    #[serde(default)]
    members: Vec<EmmyMember>,
    loc: Option<EmmyLoc>,
    #[serde(flatten)]
    common: EmmyCommon,
}

#[derive(Debug, Deserialize)]
struct EmmyMember {
    #[serde(rename = "type")]
    type_name: String,
    name: String,
    typ: Option<String>,
    literal: Option<String>,
    #[serde(default)]
    params: Vec<EmmyParam>,
    #[serde(default)]
    returns: Vec<EmmyParam>,
    #[serde(default)]
    overloads: Vec<String>,
    #[serde(default)]
    is_meth: bool,
    #[serde(default)]
    generics: Vec<EmmyGeneric>,
    loc: Option<EmmyLoc>,
    #[serde(flatten)]
    common: EmmyCommon,
}

#[derive(Debug, Deserialize)]
struct EmmyParam {
    name: Option<String>,
    typ: Option<String>,
    desc: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EmmyGeneric {
    name: String,
    base: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
struct EmmyLoc {
    file: String,
    line: u32,
}

fn emmy_common(common: &EmmyCommon) -> RawRecord {
    let mut record = RawRecord {
        doc: common.description.clone(),
        visibility: parse_visibility(common.visibility.as_deref()),
        is_async: common.is_async,
        deprecated: common.deprecated,
        deprecation_reason: common.deprecation_reason.clone(),
        nodiscard: common.is_nodiscard,
        nodiscard_reason: common.nodiscard_message.clone(),
        ..RawRecord::default()
    };
    for tag in common.tag_content.iter().flatten() {
        match tag.tag_name.as_str() {
            "doc" => {
                let content = tag.content.trim();
                if !content.is_empty() {
                    let (name, arg) = match content.split_once(char::is_whitespace) {
                        Some((name, arg)) => (name, arg.trim()),
                        None => (content, ""),
                    };
                    record
                        .doc_options
                        .push((name.trim().to_string(), arg.to_string()));
                }
            }
            "doctype" => {
                let content = tag.content.trim();
                if !content.is_empty() {
                    record.doctype = Some(content.to_string());
                }
            }
            _ => {}
        }
    }
    record
}

fn emmy_members(members: Vec<EmmyMember>) -> Vec<RawRecord> {
    let mut records = Vec::new();
    for member in members {
        let mut record = emmy_common(&member.common);
        record.path = member.name;
        match member.type_name.as_str() {
            "fn" => {
                record.hint = Some(KindHint::Callable);
                record.implicit_self = member.is_meth;
                record.generics = emmy_generics(member.generics);
                record.params = member.params.into_iter().map(emmy_param).collect();
                record.returns = member.returns.into_iter().map(emmy_param).collect();
                record.overloads = member.overloads;
                if record.implicit_self
                    && record
                        .params
                        .first()
                        .map_or(true, |p| p.name.as_deref() != Some("self"))
                {
                    record.params.insert(
                        0,
                        RawParam {
                            name: Some("self".to_string()),
                            type_repr: None,
                            doc: None,
                        },
                    );
                }
            }
            "field" => {
                record.hint = Some(KindHint::Value);
                record.type_repr = member.typ;
                record.literal = member.literal;
            }
            _ => continue,
        }
        if let Some(loc) = &member.loc {
            record.file = Some(loc.file.clone());
            record.line = Some(loc.line.saturating_sub(1));
        }
        if !record.path.is_empty() {
            records.push(record);
        }
    }
    records
}

fn emmy_param(param: EmmyParam) -> RawParam {
    RawParam {
        name: param.name,
        type_repr: param.typ,
        doc: param.desc,
    }
}

fn emmy_generics(generics: Vec<EmmyGeneric>) -> Vec<RawParam> {
    generics
        .into_iter()
        .map(|g| RawParam {
            name: Some(g.name),
            type_repr: g.base,
            doc: None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_luals_class_with_bases() {
        let source = json!([{
            "name": "gfx.Sprite",
            "defines": [{
                "type": "doc.class",
                "extends": [{"view": "gfx.Node"}, {"view": "(gfx.Drawable)?"}],
                "desc": "A sprite.",
                "file": "file:///project/sprite.lua",
                "start": [12, 0],
                "visible": "public"
            }],
            "fields": [{
                "name": "draw",
                "type": "setmethod",
                "extends": {
                    "type": "function",
                    "args": [
                        {"name": "self", "view": "gfx.Sprite"},
                        {"type": "...", "view": "any"}
                    ],
                    "returns": [{"view": "boolean"}]
                },
                "desc": "Draw it."
            }]
        }])
        .to_string();

        let records = records_from_luals(&source).unwrap();
        assert_eq!(records.len(), 1);
        let sprite = &records[0];
        assert_eq!(sprite.path, "gfx.Sprite");
        assert_eq!(sprite.hint, Some(KindHint::Class));
        assert_eq!(sprite.bases, vec!["gfx.Node", "gfx.Drawable?"]);
        assert_eq!(sprite.file.as_deref(), Some("/project/sprite.lua"));
        assert_eq!(sprite.line, Some(12));

        let draw = &sprite.children[0];
        assert_eq!(draw.hint, Some(KindHint::Callable));
        assert!(draw.implicit_self);
        assert_eq!(draw.params[1].name.as_deref(), Some("..."));
        assert_eq!(draw.returns[0].type_repr.as_deref(), Some("boolean"));
    }

    #[test]
    fn test_luals_alias_doc_unwrapped() {
        let source = json!([{
            "name": "Color",
            "defines": [{
                "type": "doc.alias",
                "view": "\"red\" | \"green\"",
                "desc": "```lua\n--Pick one.\nalias Color\n```"
            }]
        }])
        .to_string();

        let records = records_from_luals(&source).unwrap();
        assert_eq!(records[0].hint, Some(KindHint::Alias));
        assert_eq!(records[0].type_repr.as_deref(), Some("\"red\" | \"green\""));
        assert_eq!(records[0].doc.as_deref(), Some("Pick one."));
    }

    #[test]
    fn test_luals_malformed_is_fatal() {
        let err = records_from_luals("{\"not\": \"a list\"}").unwrap_err();
        assert!(matches!(err, LuaDocError::MalformedExport { .. }));
    }

    #[test]
    fn test_emmylua_module_and_members() {
        let source = json!({
            "modules": [{
                "name": "soundboard",
                "file": "soundboard.lua",
                "description": "The soundboard.",
                "visibility": "public",
                "deprecated": false,
                "deprecation_reason": null,
                "members": [{
                    "type": "fn",
                    "name": "play",
                    "is_meth": true,
                    "params": [{"name": "volume", "typ": "number", "desc": "loudness"}],
                    "returns": [{"name": null, "typ": "boolean", "desc": null}],
                    "overloads": ["fun(volume: number, pan: number): boolean"],
                    "loc": {"file": "soundboard.lua", "line": 10},
                    "description": "Play.",
                    "visibility": "internal",
                    "deprecated": true,
                    "deprecation_reason": "use play2"
                }]
            }],
            "types": [],
            "globals": []
        })
        .to_string();

        let records = records_from_emmylua(&source).unwrap();
        let module = &records[0];
        assert_eq!(module.hint, Some(KindHint::Module));

        let play = &module.children[0];
        assert_eq!(play.hint, Some(KindHint::Callable));
        // implicit self injected ahead of declared params
        assert_eq!(play.params[0].name.as_deref(), Some("self"));
        assert_eq!(play.params[1].name.as_deref(), Some("volume"));
        assert_eq!(play.visibility, RawVisibility::Private);
        assert!(play.deprecated);
        assert_eq!(play.deprecation_reason.as_deref(), Some("use play2"));
        assert_eq!(play.line, Some(9));
        assert_eq!(play.overloads.len(), 1);
    }

    #[test]
    fn test_emmylua_doc_markers_from_tags() {
        let source = json!({
            "modules": [],
            "types": [{
                "type": "class",
                "name": "Registry",
                "bases": ["Base"],
                "members": [],
                "loc": [{"file": "registry.lua", "line": 3}],
                "description": "A registry.",
                "visibility": "public",
                "deprecated": false,
                "deprecation_reason": null,
                "tag_content": [
                    {"tag_name": "doctype", "content": "table"},
                    {"tag_name": "doc", "content": "members a, b"}
                ]
            }],
            "globals": []
        })
        .to_string();

        let records = records_from_emmylua(&source).unwrap();
        let registry = &records[0];
        assert_eq!(registry.doctype.as_deref(), Some("table"));
        assert_eq!(
            registry.doc_options,
            vec![("members".to_string(), "a, b".to_string())]
        );
        assert_eq!(registry.bases, vec!["Base"]);
        assert_eq!(registry.line, Some(2));
    }

    #[test]
    fn test_normalize_optional_parens() {
        assert_eq!(normalize_luals_type("(integer)?"), "integer?");
        assert_eq!(normalize_luals_type("(fun())?"), "(fun())?");
        assert_eq!(normalize_luals_type("integer"), "integer");
    }
}
