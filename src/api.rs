//! The crate's entry point: run an analyzer export through the builder and
//! query the resulting model.

use serde::Serialize;

use crate::builder::ModelBuilder;
use crate::error::{Diagnostics, LuaDocError, Warning};
use crate::export;
use crate::format::{self, SigToken};
use crate::members::{self, SelectedMember};
use crate::model::{Entity, EntityId, Kind, ObjectModel, Visibility};
use crate::options::SelectionConfig;
use crate::resolver;

/// Which analyzer produced the export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    LuaLs,
    EmmyLua,
}

/// A built model together with the warnings its construction produced.
#[derive(Debug)]
pub struct Analysis {
    pub model: ObjectModel,
    pub warnings: Vec<Warning>,
}

/// Decode `source` with the given backend and build the object model.
/// Structural problems in individual objects degrade to warnings; only an
/// undecodable document fails.
pub fn analyze(source: &str, backend: Backend) -> Result<Analysis, LuaDocError> {
    let records = match backend {
        Backend::LuaLs => export::records_from_luals(source)?,
        Backend::EmmyLua => export::records_from_emmylua(source)?,
    };
    log::debug!("decoded {} top-level records", records.len());

    let mut builder = ModelBuilder::new();
    builder.add_records(records);
    let (model, warnings) = builder.finish();
    log::info!(
        "built object model: {} entities, {} warnings",
        model.len(),
        warnings.len()
    );
    Ok(Analysis { model, warnings })
}

impl Analysis {
    /// Resolve a reference as written inside `scope`.
    pub fn resolve(&self, name: &str, scope: EntityId) -> Option<EntityId> {
        resolver::resolve(&self.model, name, scope)
    }

    /// Declaration signature of an entity as a token stream. Unresolvable
    /// type references are appended to the analysis warnings.
    pub fn signature(&mut self, id: EntityId) -> Vec<SigToken> {
        let mut diag = Diagnostics::new();
        let tokens = format::entity_signature(&self.model, id, &mut diag);
        self.warnings.extend(diag.into_warnings());
        tokens
    }

    /// Select and order the members of a container.
    pub fn members(&self, container: EntityId, config: &SelectionConfig) -> Vec<SelectedMember> {
        members::select_members(&self.model, container, config)
    }

    /// Serializable summary of the whole tree.
    pub fn to_dump(&self) -> DumpNode {
        dump(&self.model, ObjectModel::ROOT)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.to_dump())
    }

    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(&self.to_dump())
    }
}

/// One node of a model dump.
#[derive(Debug, Serialize)]
pub struct DumpNode {
    pub name: String,
    pub kind: Kind,
    #[serde(skip_serializing_if = "is_public")]
    pub visibility: Visibility,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_repr: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub bases: Vec<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub placeholder: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<DumpNode>,
}

fn is_public(visibility: &Visibility) -> bool {
    *visibility == Visibility::Public
}

fn dump(model: &ObjectModel, id: EntityId) -> DumpNode {
    let entity: &Entity = model.entity(id);
    DumpNode {
        name: entity.name.clone(),
        kind: entity.kind,
        visibility: entity.visibility,
        type_repr: entity.type_repr.clone(),
        bases: entity.bases.iter().map(|(raw, _)| raw.clone()).collect(),
        placeholder: entity.placeholder,
        children: entity
            .children
            .iter()
            .map(|(_, child)| dump(model, *child))
            .collect(),
    }
}
