use std::collections::HashMap;

use serde::Serialize;

use crate::typeexpr::TypeCache;

/// Kind of a documented object, decided once at build time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    Module,
    Table,
    Class,
    Function,
    Data,
    Const,
    Attribute,
    Alias,
    Enum,
}

impl Kind {
    /// Fixed ordering used by groupwise member sorting: data-like objects
    /// before functions, before classes, before aliases and enums, with
    /// nested modules last.
    pub fn group_order(self) -> u8 {
        match self {
            Kind::Table | Kind::Data | Kind::Const | Kind::Attribute => 1,
            Kind::Function => 2,
            Kind::Class => 3,
            Kind::Alias => 4,
            Kind::Enum => 5,
            Kind::Module => 6,
        }
    }

    /// Whether objects of this kind may own documented children.
    pub fn is_container(self) -> bool {
        matches!(
            self,
            Kind::Module | Kind::Table | Kind::Class | Kind::Alias | Kind::Enum
        )
    }
}

/// Visibility of a documented object.
///
/// "Special" members (double-underscore names) are not a visibility: they are
/// an orthogonal category detected with [`is_special_name`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Protected,
    Private,
    Package,
}

/// Whether a local name denotes a "special" member (`__index`, `__call`, ...).
pub fn is_special_name(name: &str) -> bool {
    name.starts_with("__")
}

/// Modifier markers carried over from the analyzer export.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Annotations {
    pub is_deprecated: bool,
    pub deprecation_reason: Option<String>,
    pub is_nodiscard: bool,
    pub nodiscard_reason: Option<String>,
    pub is_async: bool,
    pub is_abstract: bool,
    pub is_virtual: bool,
    pub is_global: bool,
}

/// A function parameter, return value, or generic parameter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Param {
    pub name: Option<String>,
    pub type_repr: Option<String>,
    pub doc: Option<String>,
}

impl Param {
    pub fn new(name: Option<String>, type_repr: Option<String>) -> Self {
        Param {
            name,
            type_repr,
            doc: None,
        }
    }
}

/// One callable signature. Functions carry a primary signature plus zero or
/// more overloads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FunctionSignature {
    pub params: Vec<Param>,
    pub returns: Vec<Param>,
    /// The function implicitly accepts `self` (declared with `:` syntax).
    pub implicit_self: bool,
}

/// Source position of an object. `ordinal` is the position within the export
/// stream and breaks ties when file or line are unavailable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Location {
    pub file: Option<String>,
    pub line: Option<u32>,
    pub ordinal: u32,
}

impl Location {
    pub fn describe(&self) -> Option<String> {
        let file = self.file.as_deref()?;
        match self.line {
            Some(line) => Some(format!("{file}:{line}")),
            None => Some(file.to_string()),
        }
    }
}

/// Index of an [`Entity`] within its [`ObjectModel`].
///
/// The model owns entities top-down; parent links and base-class links are
/// stored as ids so navigation stays bidirectional without ownership cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct EntityId(pub(crate) u32);

impl EntityId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// A single documented object: module, class, function, data, alias, enum...
#[derive(Debug, Clone)]
pub struct Entity {
    /// Local name within the parent.
    pub name: String,
    /// Dot-separated path, unique within the whole model.
    pub qualified_name: String,
    pub kind: Kind,
    pub parent: Option<EntityId>,
    /// Children in insertion order; bysource ordering relies on this.
    pub children: Vec<(String, EntityId)>,
    pub visibility: Visibility,
    pub annotations: Annotations,
    /// Documentation text with marker lines already stripped.
    pub doc: Option<String>,
    /// Per-object autodoc options extracted from `!doc` markers.
    pub doc_options: Vec<(String, String)>,
    pub location: Location,
    /// Raw base type strings paired with their resolution, classes only.
    /// Resolved in the second build phase, once the model is complete.
    pub bases: Vec<(String, Option<EntityId>)>,
    pub signature: Option<FunctionSignature>,
    pub overloads: Vec<FunctionSignature>,
    pub generics: Vec<Param>,
    /// Declared type of a data value, alias, or enum.
    pub type_repr: Option<String>,
    /// Literal value of a data item, when the analyzer reported one.
    pub literal: Option<String>,
    /// Synthesized to hold a dotted path together; not present in the export.
    /// A real record for the same path replaces this in place.
    pub placeholder: bool,
}

impl Entity {
    pub(crate) fn new(name: String, qualified_name: String, kind: Kind) -> Self {
        Entity {
            name,
            qualified_name,
            kind,
            parent: None,
            children: Vec::new(),
            visibility: Visibility::Public,
            annotations: Annotations::default(),
            doc: None,
            doc_options: Vec::new(),
            location: Location::default(),
            bases: Vec::new(),
            signature: None,
            overloads: Vec::new(),
            generics: Vec::new(),
            type_repr: None,
            literal: None,
            placeholder: false,
        }
    }

    pub fn is_documented(&self) -> bool {
        self.doc.as_deref().is_some_and(|d| !d.trim().is_empty())
    }

    pub fn child(&self, name: &str) -> Option<EntityId> {
        self.children
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, id)| *id)
    }
}

/// The object model: an arena of entities rooted at the global namespace.
///
/// Built once per documentation build. After construction the model is never
/// mutated, so resolution, linearization, and selection queries can run from
/// multiple readers without locking.
#[derive(Debug)]
pub struct ObjectModel {
    entities: Vec<Entity>,
    index: HashMap<String, EntityId>,
    orphans: Vec<Entity>,
    types: TypeCache,
}

/// Components of a qualified name, split the way the source language nests
/// them: module path, class path, and the final local name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathComponents {
    pub id: EntityId,
    pub module: String,
    pub class: String,
    pub name: String,
}

impl ObjectModel {
    /// The global namespace. Always present, never removed.
    pub const ROOT: EntityId = EntityId(0);

    pub(crate) fn empty() -> Self {
        let mut root = Entity::new(String::new(), String::new(), Kind::Module);
        root.doc = None;
        ObjectModel {
            entities: vec![root],
            index: HashMap::new(),
            orphans: Vec::new(),
            types: TypeCache::new(),
        }
    }

    pub fn entity(&self, id: EntityId) -> &Entity {
        &self.entities[id.index()]
    }

    pub(crate) fn entity_mut(&mut self, id: EntityId) -> &mut Entity {
        &mut self.entities[id.index()]
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.len() <= 1
    }

    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &Entity)> {
        self.entities
            .iter()
            .enumerate()
            .map(|(i, e)| (EntityId(i as u32), e))
    }

    /// Entities that could not be attached to the tree: duplicate names,
    /// missing or non-container parents. Kept so they can render as
    /// undocumented instead of vanishing.
    pub fn orphans(&self) -> &[Entity] {
        &self.orphans
    }

    pub fn type_cache(&self) -> &TypeCache {
        &self.types
    }

    /// Look up an entity by its full dotted path.
    pub fn find(&self, path: &str) -> Option<EntityId> {
        if path.is_empty() {
            return Some(Self::ROOT);
        }
        self.index.get(path).copied()
    }

    /// Find an object and split its path into module, class, and name
    /// components, following the same nesting rules as the source language:
    /// once a non-module container is entered, everything below is a class
    /// path component.
    pub fn find_path(&self, path: &str) -> Option<PathComponents> {
        let mut current = Self::ROOT;
        let mut in_class = false;
        let mut module = Vec::new();
        let mut class = Vec::new();

        for component in crate::typeexpr::split_name(path) {
            current = self.entity(current).child(&component)?;
            if in_class || self.entity(current).kind != Kind::Module {
                in_class = true;
                class.push(component);
            } else {
                module.push(component);
            }
        }

        let name = class.pop().or_else(|| module.pop()).unwrap_or_default();
        Some(PathComponents {
            id: current,
            module: module.join("."),
            class: class.join("."),
            name,
        })
    }

    /// Module path and class path enclosing the given entity, the entity
    /// itself included when it is a documentable container. Non-container
    /// scopes (a function, a data value) contribute nothing themselves, so
    /// references written inside them resolve against the enclosing class.
    pub fn scope_of(&self, id: EntityId) -> (String, String) {
        let mut containers = Vec::new();
        let mut current = Some(id);
        while let Some(c) = current {
            if c == Self::ROOT {
                break;
            }
            let entity = self.entity(c);
            if entity.kind.is_container() {
                containers.push((entity.name.clone(), entity.kind));
            }
            current = entity.parent;
        }
        containers.reverse();

        let mut module = Vec::new();
        let mut class = Vec::new();
        let mut in_class = false;
        for (name, kind) in containers {
            if in_class || kind != Kind::Module {
                in_class = true;
                class.push(name);
            } else {
                module.push(name);
            }
        }
        (module.join("."), class.join("."))
    }

    pub(crate) fn push(&mut self, entity: Entity) -> EntityId {
        let id = EntityId(self.entities.len() as u32);
        self.entities.push(entity);
        id
    }

    pub(crate) fn register(&mut self, path: String, id: EntityId) {
        self.index.insert(path, id);
    }

    pub(crate) fn push_orphan(&mut self, entity: Entity) {
        self.orphans.push(entity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::ModelBuilder;
    use crate::export::{KindHint, RawRecord};

    fn record(path: &str, hint: KindHint) -> RawRecord {
        RawRecord {
            path: path.to_string(),
            hint: Some(hint),
            doc: Some("docs".to_string()),
            ..RawRecord::default()
        }
    }

    fn sample() -> ObjectModel {
        let mut builder = ModelBuilder::new();
        builder.add_record(record("app", KindHint::Module));
        builder.add_record(record("app.audio", KindHint::Module));
        builder.add_record(record("app.audio.Mixer", KindHint::Class));
        builder.add_record(record("app.audio.Mixer.Channel", KindHint::Class));
        builder.add_record(record("app.audio.Mixer.Channel.gain", KindHint::Value));
        let (model, warnings) = builder.finish();
        assert!(warnings.is_empty(), "unexpected warnings: {warnings:?}");
        model
    }

    #[test]
    fn test_find_path_splits_module_and_class() {
        let model = sample();
        let parts = model.find_path("app.audio.Mixer.Channel.gain").unwrap();
        assert_eq!(parts.module, "app.audio");
        assert_eq!(parts.class, "Mixer.Channel");
        assert_eq!(parts.name, "gain");
        assert_eq!(parts.id, model.find("app.audio.Mixer.Channel.gain").unwrap());
    }

    #[test]
    fn test_find_path_missing_component() {
        let model = sample();
        assert!(model.find_path("app.video.Mixer").is_none());
    }

    #[test]
    fn test_scope_of_noncontainer_uses_enclosing_class() {
        let model = sample();
        let gain = model.find("app.audio.Mixer.Channel.gain").unwrap();
        let (module, class) = model.scope_of(gain);
        assert_eq!(module, "app.audio");
        assert_eq!(class, "Mixer.Channel");
    }

    #[test]
    fn test_scope_of_container_includes_itself() {
        let model = sample();
        let mixer = model.find("app.audio.Mixer").unwrap();
        let (module, class) = model.scope_of(mixer);
        assert_eq!(module, "app.audio");
        assert_eq!(class, "Mixer");
    }

    #[test]
    fn test_root_scope_is_empty() {
        let model = sample();
        let (module, class) = model.scope_of(ObjectModel::ROOT);
        assert!(module.is_empty());
        assert!(class.is_empty());
    }
}
