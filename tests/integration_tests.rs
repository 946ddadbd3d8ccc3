//! End-to-end scenarios: export in, ordered member lists and resolved
//! references out.

use luadoc_core::api::{analyze, Analysis, Backend};
use luadoc_core::error::Warning;
use luadoc_core::members::select_members;
use luadoc_core::options::{MemberOptions, SelectionConfig};

fn class_export() -> String {
    serde_json::json!({
        "modules": [],
        "types": [
            {
                "type": "class",
                "name": "Foo",
                "bases": [],
                "members": [
                    {"type": "field", "name": "id", "typ": "integer", "literal": null,
                     "description": "Foo id.", "visibility": "public",
                     "deprecated": false, "deprecation_reason": null,
                     "loc": {"file": "foo.lua", "line": 3}},
                    {"type": "field", "name": "only_foo", "typ": "string", "literal": null,
                     "description": "Only here.", "visibility": "public",
                     "deprecated": false, "deprecation_reason": null,
                     "loc": {"file": "foo.lua", "line": 5}}
                ],
                "loc": [{"file": "foo.lua", "line": 1}],
                "description": "Base of everything.",
                "visibility": "public",
                "deprecated": false,
                "deprecation_reason": null
            },
            {
                "type": "class",
                "name": "Bar",
                "bases": ["Foo"],
                "members": [
                    {"type": "field", "name": "id", "typ": "string", "literal": null,
                     "description": "Bar id.", "visibility": "public",
                     "deprecated": false, "deprecation_reason": null,
                     "loc": {"file": "bar.lua", "line": 3}}
                ],
                "loc": [{"file": "bar.lua", "line": 1}],
                "description": "Middle.",
                "visibility": "public",
                "deprecated": false,
                "deprecation_reason": null
            },
            {
                "type": "class",
                "name": "Baz",
                "bases": ["Bar", "Foo"],
                "members": [],
                "loc": [{"file": "baz.lua", "line": 1}],
                "description": "Most derived.",
                "visibility": "public",
                "deprecated": false,
                "deprecation_reason": null
            }
        ],
        "globals": []
    })
    .to_string()
}

fn built(source: &str) -> Analysis {
    analyze(source, Backend::EmmyLua).unwrap()
}

#[test]
fn test_inherited_member_comes_from_nearest_base() {
    let analysis = built(&class_export());
    let baz = analysis.model.find("Baz").unwrap();
    let bar = analysis.model.find("Bar").unwrap();
    let foo = analysis.model.find("Foo").unwrap();

    let overrides = MemberOptions::from_pairs([("members", ""), ("inherited-members", "")]).unwrap();
    let config = SelectionConfig::merge(&SelectionConfig::default(), &overrides);
    let members = select_members(&analysis.model, baz, &config);

    let id = members.iter().find(|m| m.name == "id").unwrap();
    assert_eq!(id.inherited_from, Some(bar), "Bar shadows Foo's id");
    let only_foo = members.iter().find(|m| m.name == "only_foo").unwrap();
    assert_eq!(only_foo.inherited_from, Some(foo));
}

#[test]
fn test_without_inherited_members_only_own_show() {
    let analysis = built(&class_export());
    let baz = analysis.model.find("Baz").unwrap();

    let overrides = MemberOptions::from_pairs([("members", "")]).unwrap();
    let config = SelectionConfig::merge(&SelectionConfig::default(), &overrides);
    let members = select_members(&analysis.model, baz, &config);
    assert!(members.is_empty());
}

#[test]
fn test_reference_resolution_from_nested_scope() {
    let source = serde_json::json!({
        "modules": [{
            "name": "soundboard",
            "file": "soundboard.lua",
            "description": "Sounds.",
            "visibility": "public",
            "deprecated": false,
            "deprecation_reason": null,
            "members": []
        }],
        "types": [
            {
                "type": "class", "name": "soundboard.SoundBoard", "bases": [],
                "members": [
                    {"type": "fn", "name": "board_method", "is_meth": true,
                     "params": [], "returns": [], "overloads": [],
                     "description": "A method.", "visibility": "public",
                     "deprecated": false, "deprecation_reason": null,
                     "loc": {"file": "board.lua", "line": 10}}
                ],
                "loc": [{"file": "board.lua", "line": 1}],
                "description": "The board.", "visibility": "public",
                "deprecated": false, "deprecation_reason": null
            },
            {
                "type": "class", "name": "soundboard.Sound", "bases": [],
                "members": [
                    {"type": "field", "name": "id", "typ": "integer", "literal": null,
                     "description": "Id.", "visibility": "public",
                     "deprecated": false, "deprecation_reason": null,
                     "loc": {"file": "sound.lua", "line": 3}}
                ],
                "loc": [{"file": "sound.lua", "line": 1}],
                "description": "A sound.", "visibility": "public",
                "deprecated": false, "deprecation_reason": null
            }
        ],
        "globals": []
    })
    .to_string();

    let analysis = built(&source);
    let method = analysis.model.find("soundboard.SoundBoard.board_method").unwrap();

    // written inside SoundBoard, `Sound.id` falls back to the module scope
    let resolved = analysis.resolve("Sound.id", method).unwrap();
    assert_eq!(
        analysis.model.entity(resolved).qualified_name,
        "soundboard.Sound.id"
    );
    // a call-style suffix is tolerated
    let resolved = analysis.resolve("Sound.id()", method).unwrap();
    assert_eq!(
        analysis.model.entity(resolved).qualified_name,
        "soundboard.Sound.id"
    );
}

#[test]
fn test_inheritance_cycle_warns_but_builds() {
    let source = serde_json::json!({
        "modules": [],
        "types": [
            {"type": "class", "name": "A", "bases": ["B"], "members": [],
             "loc": [], "description": "a", "visibility": "public",
             "deprecated": false, "deprecation_reason": null},
            {"type": "class", "name": "B", "bases": ["A"], "members": [],
             "loc": [], "description": "b", "visibility": "public",
             "deprecated": false, "deprecation_reason": null}
        ],
        "globals": []
    })
    .to_string();

    let analysis = built(&source);
    assert!(analysis
        .warnings
        .iter()
        .any(|w| matches!(w, Warning::InheritanceCycle { .. })));
    // queries still terminate
    let a = analysis.model.find("A").unwrap();
    let config = SelectionConfig::merge(
        &SelectionConfig::default(),
        &MemberOptions::from_pairs([("members", ""), ("inherited-members", "")]).unwrap(),
    );
    let _ = select_members(&analysis.model, a, &config);
}

#[test]
fn test_doc_marker_options_drive_selection() {
    let source = serde_json::json!({
        "modules": [{
            "name": "m",
            "file": "m.lua",
            "description": "Module.\n!doc members: visible",
            "visibility": "public",
            "deprecated": false,
            "deprecation_reason": null,
            "members": [
                {"type": "field", "name": "visible", "typ": "integer", "literal": null,
                 "description": null, "visibility": "public",
                 "deprecated": false, "deprecation_reason": null,
                 "loc": {"file": "m.lua", "line": 2}},
                {"type": "field", "name": "hidden", "typ": "integer", "literal": null,
                 "description": null, "visibility": "public",
                 "deprecated": false, "deprecation_reason": null,
                 "loc": {"file": "m.lua", "line": 3}}
            ]
        }],
        "types": [],
        "globals": []
    })
    .to_string();

    let analysis = built(&source);
    let m = analysis.model.find("m").unwrap();
    let entity = analysis.model.entity(m);
    // the marker was stripped from the doc text and kept as an option
    assert_eq!(entity.doc.as_deref(), Some("Module."));
    let pairs: Vec<(&str, &str)> = entity
        .doc_options
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();
    let overrides = MemberOptions::from_pairs(pairs).unwrap();
    let config = SelectionConfig::merge(&SelectionConfig::default(), &overrides);

    let members = select_members(&analysis.model, m, &config);
    let names: Vec<&str> = members.iter().map(|m| m.name.as_str()).collect();
    // `visible` is listed explicitly, so it passes the undoc gate; `hidden` is not
    assert_eq!(names, vec!["visible"]);
}
