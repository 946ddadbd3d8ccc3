//! Member selection and ordering.
//!
//! Given a container and an effective configuration, decide which children
//! appear in the output and in what order. Explicitly listed names always
//! pass; everything else goes through the category gates.

use crate::inherit;
use crate::model::{is_special_name, Entity, EntityId, Kind, ObjectModel, Visibility};
use crate::options::{MemberOrder, SelectionConfig};

/// One selected member. `inherited_from` names the defining class when the
/// member came through the inheritance chain rather than the container
/// itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedMember {
    pub name: String,
    pub entity: EntityId,
    pub inherited_from: Option<EntityId>,
}

/// Select and order the members of `container`. Own members come first,
/// inherited ones after, each block sorted by the configured order.
pub fn select_members(
    model: &ObjectModel,
    container: EntityId,
    config: &SelectionConfig,
) -> Vec<SelectedMember> {
    let entity = model.entity(container);

    let mut own: Vec<SelectedMember> = entity
        .children
        .iter()
        .map(|(name, id)| SelectedMember {
            name: name.clone(),
            entity: *id,
            inherited_from: None,
        })
        .collect();

    let mut inherited: Vec<SelectedMember> = Vec::new();
    if entity.kind == Kind::Class && config.inherited_members.requested() {
        for member in inherit::effective_members(model, container) {
            if member.defined_in != container {
                inherited.push(SelectedMember {
                    name: member.name,
                    entity: member.member,
                    inherited_from: Some(member.defined_in),
                });
            }
        }
    }

    own.retain(|m| keep(model, m, config));
    inherited.retain(|m| keep(model, m, config));

    let order = order_for(entity.kind, config);
    sort_members(model, &mut own, order);
    sort_members(model, &mut inherited, order);

    own.extend(inherited);
    own
}

/// The configuration nested containers run with during a recursive walk:
/// global defaults plus whatever the current configuration propagates. When
/// the current container is not recursive, nothing descends.
pub fn nested_config(defaults: &SelectionConfig, current: &SelectionConfig) -> SelectionConfig {
    if current.recursive {
        SelectionConfig::merge(defaults, &current.propagate())
    } else {
        defaults.clone()
    }
}

fn order_for(kind: Kind, config: &SelectionConfig) -> MemberOrder {
    match (kind, config.module_member_order) {
        (Kind::Module, Some(order)) => order,
        _ => config.member_order,
    }
}

fn keep(model: &ObjectModel, member: &SelectedMember, config: &SelectionConfig) -> bool {
    if config.exclude_members.contains(&member.name) {
        return false;
    }
    // an explicit name in any list option bypasses every category gate
    if config.members.contains(&member.name)
        || config.undoc_members.contains(&member.name)
        || config.private_members.contains(&member.name)
        || config.protected_members.contains(&member.name)
        || config.package_members.contains(&member.name)
        || config.special_members.contains(&member.name)
        || config.inherited_members.contains(&member.name)
    {
        return true;
    }

    let entity = model.entity(member.entity);
    let undocumented = !entity.is_documented() && !entity.placeholder;
    let special = is_special_name(&member.name);
    let inherited = member.inherited_from.is_some();

    if undocumented && !config.undoc_members.all {
        return false;
    }
    match entity.visibility {
        Visibility::Private if !config.private_members.all => return false,
        Visibility::Protected if !config.protected_members.all => return false,
        Visibility::Package if !config.package_members.all => return false,
        _ => {}
    }
    if special && !config.special_members.all {
        return false;
    }
    if inherited && !config.inherited_members.all {
        return false;
    }

    let gated = undocumented
        || entity.visibility != Visibility::Public
        || special
        || inherited;
    gated || config.members.all
}

fn sort_members(model: &ObjectModel, members: &mut [SelectedMember], order: MemberOrder) {
    match order {
        MemberOrder::Alphabetical => {
            members.sort_by_key(|m| m.name.to_lowercase());
        }
        MemberOrder::Groupwise => {
            members.sort_by_key(|m| {
                (
                    model.entity(m.entity).kind.group_order(),
                    m.name.to_lowercase(),
                )
            });
        }
        MemberOrder::Bysource => {
            members.sort_by_key(|m| source_key(model.entity(m.entity), &m.name));
        }
    }
}

/// Positioned members sort by file then line; location-less ones come after
/// all of them, in export order.
fn source_key(entity: &Entity, name: &str) -> (u8, String, u32, u32, String) {
    let loc = &entity.location;
    let positioned = loc.file.is_some() || loc.line.is_some();
    (
        u8::from(!positioned),
        loc.file.clone().unwrap_or_default(),
        loc.line.unwrap_or(0),
        loc.ordinal,
        name.to_lowercase(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::ModelBuilder;
    use crate::export::{KindHint, RawRecord, RawVisibility};
    use crate::options::ListValue;

    fn record(path: &str, hint: KindHint) -> RawRecord {
        RawRecord {
            path: path.to_string(),
            hint: Some(hint),
            doc: Some("docs".to_string()),
            ..RawRecord::default()
        }
    }

    fn sample_model() -> ObjectModel {
        let mut builder = ModelBuilder::new();
        builder.add_record(record("m", KindHint::Module));
        builder.add_record(record("m.Widget", KindHint::Class));
        builder.add_record(RawRecord {
            line: Some(30),
            file: Some("widget.lua".to_string()),
            ..record("m.Widget.draw", KindHint::Callable)
        });
        builder.add_record(RawRecord {
            line: Some(10),
            file: Some("widget.lua".to_string()),
            ..record("m.Widget.new", KindHint::Callable)
        });
        builder.add_record(RawRecord {
            visibility: RawVisibility::Private,
            line: Some(20),
            file: Some("widget.lua".to_string()),
            ..record("m.Widget.secret", KindHint::Value)
        });
        builder.add_record(RawRecord {
            doc: None,
            ..record("m.Widget.scratch", KindHint::Value)
        });
        builder.add_record(record("m.Widget.__index", KindHint::Value));
        let (model, warnings) = builder.finish();
        assert!(warnings.is_empty(), "unexpected warnings: {warnings:?}");
        model
    }

    fn all_members() -> SelectionConfig {
        SelectionConfig {
            members: ListValue {
                all: true,
                names: Default::default(),
            },
            ..SelectionConfig::default()
        }
    }

    fn names(members: &[SelectedMember]) -> Vec<&str> {
        members.iter().map(|m| m.name.as_str()).collect()
    }

    #[test]
    fn test_default_gates_hide_private_undoc_special() {
        let model = sample_model();
        let widget = model.find("m.Widget").unwrap();
        let selected = select_members(&model, widget, &all_members());
        assert_eq!(names(&selected), vec!["new", "draw"]);
    }

    #[test]
    fn test_explicit_name_bypasses_gates() {
        let model = sample_model();
        let widget = model.find("m.Widget").unwrap();
        let mut config = all_members();
        config.members.names.insert("secret".to_string());
        let selected = select_members(&model, widget, &config);
        assert!(names(&selected).contains(&"secret"));
    }

    #[test]
    fn test_category_flags_admit_their_category() {
        let model = sample_model();
        let widget = model.find("m.Widget").unwrap();
        let mut config = all_members();
        config.private_members.all = true;
        config.special_members.all = true;
        config.undoc_members.all = true;
        let selected = select_members(&model, widget, &config);
        assert_eq!(
            names(&selected),
            vec!["new", "secret", "draw", "scratch", "__index"]
        );
    }

    #[test]
    fn test_exclude_wins_over_everything() {
        let model = sample_model();
        let widget = model.find("m.Widget").unwrap();
        let mut config = all_members();
        config.members.names.insert("draw".to_string());
        config.exclude_members.names.insert("draw".to_string());
        let selected = select_members(&model, widget, &config);
        assert!(!names(&selected).contains(&"draw"));
    }

    #[test]
    fn test_bysource_orders_by_position_then_export_order() {
        let model = sample_model();
        let widget = model.find("m.Widget").unwrap();
        let mut config = all_members();
        config.undoc_members.all = true;
        let selected = select_members(&model, widget, &config);
        // positioned by line, the location-less one last
        assert_eq!(names(&selected), vec!["new", "draw", "scratch"]);
    }

    #[test]
    fn test_alphabetical_order() {
        let model = sample_model();
        let widget = model.find("m.Widget").unwrap();
        let mut config = all_members();
        config.member_order = MemberOrder::Alphabetical;
        let selected = select_members(&model, widget, &config);
        assert_eq!(names(&selected), vec!["draw", "new"]);
    }

    #[test]
    fn test_groupwise_order() {
        let mut builder = ModelBuilder::new();
        builder.add_record(record("m", KindHint::Module));
        builder.add_record(record("m.zeta", KindHint::Value));
        builder.add_record(record("m.Alpha", KindHint::Class));
        builder.add_record(record("m.run", KindHint::Callable));
        let (model, _) = builder.finish();
        let m = model.find("m").unwrap();
        let mut config = all_members();
        config.member_order = MemberOrder::Groupwise;
        let selected = select_members(&model, m, &config);
        // data before functions before classes
        assert_eq!(names(&selected), vec!["zeta", "run", "Alpha"]);
    }

    #[test]
    fn test_module_member_order_is_independent() {
        let mut builder = ModelBuilder::new();
        builder.add_record(record("m", KindHint::Module));
        builder.add_record(RawRecord {
            line: Some(10),
            file: Some("m.lua".to_string()),
            ..record("m.zulu", KindHint::Value)
        });
        builder.add_record(RawRecord {
            line: Some(20),
            file: Some("m.lua".to_string()),
            ..record("m.alpha", KindHint::Value)
        });
        builder.add_record(record("m.Widget", KindHint::Class));
        builder.add_record(RawRecord {
            line: Some(30),
            file: Some("widget.lua".to_string()),
            ..record("m.Widget.second", KindHint::Value)
        });
        builder.add_record(RawRecord {
            line: Some(10),
            file: Some("widget.lua".to_string()),
            ..record("m.Widget.first", KindHint::Value)
        });
        let (model, _) = builder.finish();

        let mut config = all_members();
        config.member_order = MemberOrder::Bysource;
        config.module_member_order = Some(MemberOrder::Alphabetical);

        // the module-level override applies to the module container only
        let m = model.find("m").unwrap();
        let selected = select_members(&model, m, &config);
        assert_eq!(names(&selected), vec!["alpha", "Widget", "zulu"]);

        // nested containers keep the general member order
        let widget = model.find("m.Widget").unwrap();
        let selected = select_members(&model, widget, &config);
        assert_eq!(names(&selected), vec!["first", "second"]);
    }

    #[test]
    fn test_placeholder_namespace_passes_undoc_gate() {
        let mut builder = ModelBuilder::new();
        // only the leaf is documented; "ns" exists purely to hold the path
        builder.add_record(record("ns.deep.value", KindHint::Value));
        let (model, _) = builder.finish();

        let ns = model.find("ns").unwrap();
        assert!(model.entity(ns).placeholder);

        let selected = select_members(&model, ObjectModel::ROOT, &all_members());
        assert_eq!(names(&selected), vec!["ns"], "namespaces stay browsable");

        // a real undocumented sibling is still gated out
        let mut builder = ModelBuilder::new();
        builder.add_record(record("ns.deep.value", KindHint::Value));
        builder.add_record(RawRecord {
            doc: None,
            ..record("bare", KindHint::Value)
        });
        let (model, _) = builder.finish();
        let selected = select_members(&model, ObjectModel::ROOT, &all_members());
        assert_eq!(names(&selected), vec!["ns"]);
    }

    #[test]
    fn test_inherited_members_shadowed_by_own() {
        let mut builder = ModelBuilder::new();
        builder.add_record(RawRecord {
            bases: vec!["Base".to_string()],
            ..record("Derived", KindHint::Class)
        });
        builder.add_record(record("Derived.id", KindHint::Value));
        builder.add_record(record("Base", KindHint::Class));
        builder.add_record(record("Base.id", KindHint::Value));
        builder.add_record(record("Base.extra", KindHint::Value));
        let (model, _) = builder.finish();

        let derived = model.find("Derived").unwrap();
        let base = model.find("Base").unwrap();
        let mut config = all_members();
        config.inherited_members.all = true;
        let selected = select_members(&model, derived, &config);

        let own_id = selected.iter().find(|m| m.name == "id").unwrap();
        assert_eq!(own_id.inherited_from, None);
        let extra = selected.iter().find(|m| m.name == "extra").unwrap();
        assert_eq!(extra.inherited_from, Some(base));
        // own members come before inherited ones
        assert!(
            names(&selected).iter().position(|n| *n == "id").unwrap()
                < names(&selected).iter().position(|n| *n == "extra").unwrap()
        );
    }

    #[test]
    fn test_nested_config_propagates_only_when_recursive() {
        let defaults = SelectionConfig::default();
        let mut current = all_members();
        current.recursive = true;
        let nested = nested_config(&defaults, &current);
        assert!(nested.members.all);
        assert!(nested.recursive);

        current.recursive = false;
        let nested = nested_config(&defaults, &current);
        assert_eq!(nested, defaults);
    }

    #[test]
    fn test_selection_does_not_mutate_model() {
        let model = sample_model();
        let widget = model.find("m.Widget").unwrap();
        let before: Vec<String> = model
            .entity(widget)
            .children
            .iter()
            .map(|(n, _)| n.clone())
            .collect();
        let _ = select_members(&model, widget, &all_members());
        let after: Vec<String> = model
            .entity(widget)
            .children
            .iter()
            .map(|(n, _)| n.clone())
            .collect();
        assert_eq!(before, after);
    }
}
