//! Model construction.
//!
//! Building runs in two phases. Phase one flattens raw records into pending
//! entities, assigning export ordinals and extracting doc markers. Phase two
//! attaches everything to the tree, resolves base classes, and checks
//! inheritance for cycles, so every query after `finish` is a pure read.

use crate::error::{Diagnostics, Warning};
use crate::export::{KindHint, RawParam, RawRecord};
use crate::model::{
    Entity, EntityId, FunctionSignature, Kind, Location, ObjectModel, Param,
};
use crate::resolver;
use crate::typeexpr::{self, TypeExpr};
use crate::{inherit, options};

pub struct ModelBuilder {
    model: ObjectModel,
    diag: Diagnostics,
    pending: Vec<Pending>,
    next_ordinal: u32,
}

struct Pending {
    parent: String,
    entity: Entity,
}

enum Attach {
    Done,
    Deferred(Pending),
}

impl Default for ModelBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelBuilder {
    pub fn new() -> Self {
        ModelBuilder {
            model: ObjectModel::empty(),
            diag: Diagnostics::new(),
            pending: Vec::new(),
            next_ordinal: 0,
        }
    }

    pub fn add_records<I>(&mut self, records: I)
    where
        I: IntoIterator<Item = RawRecord>,
    {
        for record in records {
            self.add_record(record);
        }
    }

    /// Queue one record and its children. Dotted paths get placeholder
    /// namespaces for every intermediate component; a later record for the
    /// same path replaces the placeholder in place.
    pub fn add_record(&mut self, record: RawRecord) {
        self.flatten(String::new(), record);
    }

    fn flatten(&mut self, prefix: String, mut record: RawRecord) {
        let components = typeexpr::split_name(&record.path);
        let Some((name, namespaces)) = components.split_last() else {
            return;
        };

        let mut parent = prefix;
        for namespace in namespaces {
            let path = join(&parent, namespace);
            let mut placeholder = Entity::new(namespace.clone(), path.clone(), Kind::Module);
            placeholder.placeholder = true;
            placeholder.location.ordinal = self.next_ordinal;
            self.pending.push(Pending {
                parent,
                entity: placeholder,
            });
            parent = path;
        }

        let qualified = join(&parent, name);
        let children = std::mem::take(&mut record.children);
        let documented_children = children.iter().any(|c| {
            c.doc.as_deref().is_some_and(|d| !d.trim().is_empty())
        });
        let entity = self.make_entity(name.clone(), qualified.clone(), record, documented_children);
        self.pending.push(Pending { parent, entity });

        for child in children {
            self.flatten(qualified.clone(), child);
        }
    }

    fn make_entity(
        &mut self,
        name: String,
        qualified: String,
        record: RawRecord,
        documented_children: bool,
    ) -> Entity {
        let markers = extract_markers(record.doc.as_deref());
        let doctype = record.doctype.or(markers.doctype);

        let kind = match infer_kind(doctype.as_deref(), record.hint, documented_children) {
            Ok(kind) => kind,
            Err(doctype) => {
                self.diag.warn(Warning::UnknownDoctype {
                    path: qualified.clone(),
                    doctype,
                });
                hint_kind(record.hint, documented_children)
            }
        };

        let mut entity = Entity::new(name, qualified, kind);
        entity.visibility = record.visibility;
        entity.doc = markers.doc;
        entity.doc_options = record.doc_options;
        entity.doc_options.extend(markers.options);
        entity.location = Location {
            file: record.file,
            line: record.line,
            ordinal: self.next_ordinal,
        };
        self.next_ordinal += 1;

        entity.annotations.is_deprecated = record.deprecated;
        entity.annotations.deprecation_reason = record.deprecation_reason;
        entity.annotations.is_nodiscard = record.nodiscard;
        entity.annotations.nodiscard_reason = record.nodiscard_reason;
        entity.annotations.is_async = record.is_async;
        for (option, _) in &entity.doc_options {
            match option.as_str() {
                "abstract" => entity.annotations.is_abstract = true,
                "virtual" => entity.annotations.is_virtual = true,
                "global" => entity.annotations.is_global = true,
                _ => {}
            }
        }

        entity.bases = record.bases.into_iter().map(|b| (b, None)).collect();
        entity.generics = record.generics.into_iter().map(to_param).collect();
        entity.type_repr = record.type_repr;
        entity.literal = record.literal;

        if kind == Kind::Function || !record.params.is_empty() || !record.returns.is_empty() {
            entity.signature = Some(FunctionSignature {
                params: record.params.into_iter().map(to_param).collect(),
                returns: record.returns.into_iter().map(to_param).collect(),
                implicit_self: record.implicit_self,
            });
        }
        entity.overloads = record
            .overloads
            .iter()
            .filter_map(|o| parse_overload(o))
            .collect();

        entity
    }

    /// Attach everything, resolve bases, check for cycles.
    pub fn finish(mut self) -> (ObjectModel, Vec<Warning>) {
        let mut queue = std::mem::take(&mut self.pending);
        loop {
            let before = queue.len();
            let mut deferred = Vec::new();
            for pending in queue {
                if let Attach::Deferred(pending) = self.try_attach(pending) {
                    deferred.push(pending);
                }
            }
            if deferred.is_empty() || deferred.len() == before {
                queue = deferred;
                break;
            }
            queue = deferred;
        }
        for pending in queue {
            let path = pending.entity.qualified_name.clone();
            self.diag.warn(Warning::Orphaned {
                path,
                parent: pending.parent,
            });
            self.model.push_orphan(pending.entity);
        }

        self.resolve_bases();
        self.check_cycles();
        (self.model, self.diag.into_warnings())
    }

    fn try_attach(&mut self, pending: Pending) -> Attach {
        let parent_id = if pending.parent.is_empty() {
            Some(ObjectModel::ROOT)
        } else {
            self.model.find(&pending.parent)
        };
        let Some(parent_id) = parent_id else {
            return Attach::Deferred(pending);
        };

        if !self.model.entity(parent_id).kind.is_container() {
            if !pending.entity.placeholder {
                self.diag.warn(Warning::Orphaned {
                    path: pending.entity.qualified_name.clone(),
                    parent: pending.parent,
                });
                self.model.push_orphan(pending.entity);
            }
            return Attach::Done;
        }

        if let Some(existing) = self.model.entity(parent_id).child(&pending.entity.name) {
            match (self.model.entity(existing).placeholder, pending.entity.placeholder) {
                (true, false) => self.upgrade(existing, pending.entity, parent_id),
                (_, true) => {}
                (false, false) => {
                    self.diag.warn(Warning::DuplicateName {
                        path: pending.entity.qualified_name.clone(),
                        location: pending.entity.location.describe(),
                    });
                    self.model.push_orphan(pending.entity);
                }
            }
            return Attach::Done;
        }

        let mut entity = pending.entity;
        entity.parent = Some(parent_id);
        if entity.kind == Kind::Module && self.inside_class(parent_id) {
            if !entity.placeholder {
                self.diag.warn(Warning::ModuleInClass {
                    path: entity.qualified_name.clone(),
                });
            }
            entity.kind = Kind::Table;
        }

        let name = entity.name.clone();
        let path = entity.qualified_name.clone();
        let id = self.model.push(entity);
        self.model.register(path, id);
        self.model.entity_mut(parent_id).children.push((name, id));
        Attach::Done
    }

    /// A real record arrived for a path we had synthesized: keep the node
    /// and its children, take everything else from the record.
    fn upgrade(&mut self, id: EntityId, entity: Entity, parent_id: EntityId) {
        let demote = entity.kind == Kind::Module && self.inside_class(parent_id);
        if demote {
            self.diag.warn(Warning::ModuleInClass {
                path: entity.qualified_name.clone(),
            });
        }

        let target = self.model.entity_mut(id);
        target.kind = if demote { Kind::Table } else { entity.kind };
        target.visibility = entity.visibility;
        target.annotations = entity.annotations;
        target.doc = entity.doc;
        target.doc_options = entity.doc_options;
        target.location = entity.location;
        target.bases = entity.bases;
        target.signature = entity.signature;
        target.overloads = entity.overloads;
        target.generics = entity.generics;
        target.type_repr = entity.type_repr;
        target.literal = entity.literal;
        target.placeholder = false;
    }

    fn inside_class(&self, id: EntityId) -> bool {
        let (_, class) = self.model.scope_of(id);
        !class.is_empty()
    }

    fn resolve_bases(&mut self) {
        let mut updates = Vec::new();
        for (id, entity) in self.model.iter() {
            if entity.kind != Kind::Class {
                continue;
            }
            for (i, (raw, _)) in entity.bases.iter().enumerate() {
                let target = base_target(raw);
                let resolved = resolver::resolve(&self.model, target, id);
                if resolved.is_none() && is_plain_path(target) {
                    updates.push((id, i, None, Some((raw.clone(), entity.qualified_name.clone()))));
                } else {
                    updates.push((id, i, resolved, None));
                }
            }
        }
        for (id, i, resolved, unresolved) in updates {
            if let Some((name, class)) = unresolved {
                self.diag.warn(Warning::UnresolvedBase { name, class });
            }
            self.model.entity_mut(id).bases[i].1 = resolved;
        }
    }

    fn check_cycles(&mut self) {
        let mut cyclic = Vec::new();
        for (id, entity) in self.model.iter() {
            if entity.kind != Kind::Class || entity.bases.is_empty() {
                continue;
            }
            if inherit::linearize_checked(&self.model, id).1 {
                cyclic.push(entity.qualified_name.clone());
            }
        }
        for path in cyclic {
            self.diag.warn(Warning::InheritanceCycle { path });
        }
    }
}

/// Per-object options harvested from doc markers, validated against the
/// recognized option names so typos surface early.
pub fn validate_doc_options(entity: &Entity) -> Result<(), crate::error::ConfigError> {
    let mut probe = options::MemberOptions::default();
    for (name, value) in &entity.doc_options {
        if matches!(name.as_str(), "abstract" | "virtual" | "global") {
            continue;
        }
        probe.set(name, value)?;
    }
    Ok(())
}

/// Decide the kind of an object. A recognized doctype override wins over
/// whatever the analyzer reported; an unrecognized one is returned as an
/// error so the caller can warn and fall back.
pub fn infer_kind(
    doctype: Option<&str>,
    hint: Option<KindHint>,
    documented_children: bool,
) -> Result<Kind, String> {
    if let Some(doctype) = doctype {
        return match doctype {
            "module" => Ok(Kind::Module),
            "table" => Ok(Kind::Table),
            "data" => Ok(Kind::Data),
            "const" => Ok(Kind::Const),
            "attribute" => Ok(Kind::Attribute),
            "class" => Ok(Kind::Class),
            "alias" => Ok(Kind::Alias),
            "enum" => Ok(Kind::Enum),
            "function" | "method" | "classmethod" | "staticmethod" => Ok(Kind::Function),
            other => Err(other.to_string()),
        };
    }
    Ok(hint_kind(hint, documented_children))
}

fn hint_kind(hint: Option<KindHint>, documented_children: bool) -> Kind {
    match hint {
        Some(KindHint::Module) => Kind::Module,
        Some(KindHint::Class) => Kind::Class,
        Some(KindHint::Callable) => Kind::Function,
        Some(KindHint::Alias) => Kind::Alias,
        Some(KindHint::Enum) => Kind::Enum,
        Some(KindHint::Table) => Kind::Table,
        Some(KindHint::Value) | None => {
            if documented_children {
                Kind::Table
            } else {
                Kind::Data
            }
        }
    }
}

struct DocMarkers {
    doc: Option<String>,
    doctype: Option<String>,
    options: Vec<(String, String)>,
}

/// Pull `!doctype` and `!doc` marker lines out of a docstring. Markers are
/// stripped from the text; `!doc name: value` carries a per-object option.
fn extract_markers(doc: Option<&str>) -> DocMarkers {
    let mut markers = DocMarkers {
        doc: None,
        doctype: None,
        options: Vec::new(),
    };
    let Some(doc) = doc else {
        return markers;
    };

    let mut kept = Vec::new();
    for line in doc.lines() {
        let trimmed = line.trim_start();
        if let Some(rest) = trimmed.strip_prefix("!doctype") {
            if rest.starts_with(char::is_whitespace) {
                markers.doctype = Some(rest.trim().to_string());
                continue;
            }
        }
        if let Some(rest) = trimmed.strip_prefix("!doc") {
            if rest.starts_with(char::is_whitespace) {
                let value = rest.trim();
                if !value.is_empty() {
                    let (name, arg) = match value.split_once(':') {
                        Some((name, arg)) => (name, arg),
                        None => (value, ""),
                    };
                    markers
                        .options
                        .push((name.trim().to_string(), arg.trim().to_string()));
                }
                continue;
            }
        }
        kept.push(line);
    }

    let text = kept.join("\n");
    let text = text.trim();
    if !text.is_empty() {
        markers.doc = Some(text.to_string());
    }
    markers
}

fn to_param(raw: RawParam) -> Param {
    Param {
        name: raw.name,
        type_repr: raw.type_repr,
        doc: raw.doc,
    }
}

/// Overload strings are function type expressions; anything that doesn't
/// parse as one is dropped.
fn parse_overload(overload: &str) -> Option<FunctionSignature> {
    match typeexpr::parse(overload) {
        TypeExpr::Function { params, returns } => Some(FunctionSignature {
            params: params
                .into_iter()
                .map(|p| Param::new(p.name, Some(p.ty.to_string())))
                .collect(),
            returns: returns
                .into_iter()
                .map(|p| Param::new(p.name, Some(p.ty.to_string())))
                .collect(),
            implicit_self: false,
        }),
        _ => None,
    }
}

fn base_target(raw: &str) -> &str {
    raw.split('<').next().unwrap_or(raw).trim()
}

fn is_plain_path(target: &str) -> bool {
    !target.is_empty()
        && target
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '_' | '.' | '-'))
}

fn join(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}.{name}")
    }
}
