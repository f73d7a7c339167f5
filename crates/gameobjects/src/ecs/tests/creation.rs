//! Definition-driven and programmatic creation

use super::support::{
    controller, recorder, recorder_with_id, take_events, take_lifecycle_events, Marker, Recorder,
};
use crate::assets::{DefinitionError, MemoryDefinitionSource};
use crate::config::ControllerConfig;
use crate::ecs::{
    ComponentState, EntityId, GameObjectController, GameObjectError, RegistryError,
    ANONYMOUS_TYPE_NAME,
};
use crate::foundation::collections::SlotMap;

#[test]
fn test_hooks_run_in_declaration_order_with_children_started_first() {
    let mut controller = controller(&[
        (
            "parent",
            format!("{}{}child = kid\n", recorder("p1", &[]), recorder("p2", &[])),
        ),
        ("kid", recorder("k1", &[])),
    ]);

    let parent = controller.create("parent").unwrap();
    assert_eq!(
        take_events(),
        vec![
            "p1:read", "p1:init", "p2:read", "p2:init", "k1:read", "k1:init", "k1:start",
            "p1:start", "p2:start",
        ]
    );

    let object = controller.game_object(parent).unwrap();
    assert_eq!(object.type_name(), "parent");
    assert_eq!(object.component_state("annon_0"), Some(ComponentState::Started));
    assert_eq!(controller.children(parent).len(), 1);
    assert_eq!(controller.entity_count(), 2);
}

#[test]
fn test_component_ids_are_explicit_or_synthesized() {
    let mut controller = controller(&[
        (
            "trio",
            format!(
                "{}{}{}",
                recorder_with_id(Some("a"), "a", &[]),
                recorder_with_id(Some("b"), "b", &[]),
                recorder("c", &[])
            ),
        ),
        (
            "mixed",
            format!(
                "{}{}{}",
                recorder("x", &[]),
                recorder_with_id(Some("named"), "y", &[]),
                recorder("z", &[])
            ),
        ),
    ]);

    let trio = controller.create("trio").unwrap();
    let ids: Vec<_> = controller.game_object(trio).unwrap().component_ids().collect();
    assert_eq!(ids, vec!["a", "b", "annon_2"]);
    assert_eq!(
        controller.find_component::<Recorder>(trio, "annon_2").map(|p| p.label.as_str()),
        Some("c")
    );

    let mixed = controller.create("mixed").unwrap();
    let ids: Vec<_> = controller.game_object(mixed).unwrap().component_ids().collect();
    assert_eq!(ids, vec!["annon_0", "named", "annon_2"]);
}

#[test]
fn test_unknown_definition_is_an_error() {
    let mut controller = controller(&[("slime", recorder("slime", &[]))]);

    let err = controller.create("ghost_enemy").unwrap_err();
    assert!(matches!(err, GameObjectError::UnknownDefinition(ref name) if name == "ghost_enemy"));
    assert_eq!(controller.entity_count(), 0);
    assert_eq!(controller.scene().node_count(), 0);
}

#[test]
fn test_create_requires_initialization() {
    let mut controller = GameObjectController::new();
    assert!(matches!(
        controller.create("anything"),
        Err(GameObjectError::NotInitialized)
    ));
    assert!(matches!(
        controller.finalize(),
        Err(GameObjectError::NotInitialized)
    ));
}

#[test]
fn test_unknown_parent_is_an_error() {
    let mut controller = controller(&[("slime", recorder("slime", &[]))]);
    let mut stale_ids = SlotMap::with_key();
    let stale = stale_ids.insert(());

    assert!(matches!(
        controller.create_with_parent("slime", Some(stale)),
        Err(GameObjectError::UnknownEntity(id)) if id == stale
    ));
    assert!(matches!(
        controller.create_anonymous(Some(stale)),
        Err(GameObjectError::UnknownEntity(_))
    ));
}

#[test]
fn test_invalid_definitions_fail_initialization() {
    let mut unknown_component = GameObjectController::new();
    unknown_component.register_component::<Recorder>("recorder").unwrap();
    unknown_component.register_definition_source(
        MemoryDefinitionSource::new().with("rock", "physics\n{\n    mass = 3\n}\n"),
    );
    let err = unknown_component.initialize().unwrap_err();
    assert!(matches!(
        err,
        GameObjectError::Definition(DefinitionError::UnknownComponentType { ref component, .. })
            if component == "physics"
    ));
    assert!(!unknown_component.is_initialized());
    assert!(unknown_component.definitions().is_empty());

    let mut missing_child = GameObjectController::new();
    missing_child.register_component::<Recorder>("recorder").unwrap();
    missing_child.register_definition_source(
        MemoryDefinitionSource::new()
            .with("nest", format!("{}child = egg\n", recorder("nest", &[]))),
    );
    assert!(matches!(
        missing_child.initialize(),
        Err(GameObjectError::Definition(DefinitionError::UnknownChild { .. }))
    ));
}

#[test]
fn test_child_cycles_fail_initialization() {
    let mut looped = GameObjectController::new();
    looped.register_component::<Recorder>("recorder").unwrap();
    looped.register_definition_source(
        MemoryDefinitionSource::new()
            .with("ouroboros", format!("{}child = ouroboros\n", recorder("o", &[]))),
    );
    let err = looped.initialize().unwrap_err();
    assert!(matches!(
        err,
        GameObjectError::Definition(DefinitionError::CyclicChild { ref type_name, ref path })
            if type_name == "ouroboros" && path == &["ouroboros", "ouroboros"]
    ));
    assert!(!looped.is_initialized());
    assert!(matches!(
        looped.create("ouroboros"),
        Err(GameObjectError::NotInitialized)
    ));

    let mut mutual = GameObjectController::new();
    mutual.register_component::<Recorder>("recorder").unwrap();
    mutual.register_definition_source(
        MemoryDefinitionSource::new()
            .with("day", format!("{}child = night\n", recorder("day", &[])))
            .with("night", format!("{}child = day\n", recorder("night", &[]))),
    );
    let err = mutual.initialize().unwrap_err();
    assert!(matches!(
        err,
        GameObjectError::Definition(DefinitionError::CyclicChild { ref path, .. })
            if path == &["day", "night", "day"]
    ));
    assert!(mutual.definitions().is_empty());
}

#[test]
fn test_destroy_from_on_start_waits_for_create() {
    let mut controller = controller(&[
        ("rock", recorder("rock", &[])),
        ("hunter", recorder("hunter", &[("kill_on_start", "rock")])),
    ]);
    let rock = controller.create("rock").unwrap();
    take_events();

    let hunter = controller.create("hunter").unwrap();
    assert_eq!(
        take_lifecycle_events(),
        vec![
            "hunter:start",
            "hunter:killed alive=true",
            "rock:finalize children=0 siblings=0",
        ]
    );
    assert!(!controller.contains(rock));
    assert!(controller.contains(hunter));
    assert!(controller.pending_removals().is_empty());
}

#[test]
fn test_reload_across_finalize() {
    let mut controller = controller(&[
        ("nest", format!("{}child = egg\n", recorder("nest", &[]))),
        ("egg", recorder("egg", &[])),
    ]);

    assert!(matches!(
        controller.initialize(),
        Err(GameObjectError::AlreadyInitialized)
    ));
    assert!(matches!(
        controller.register_component::<Marker>("marker"),
        Err(GameObjectError::Registry(RegistryError::Frozen { .. }))
    ));

    let nest = controller.create("nest").unwrap();
    assert_eq!(controller.entity_count(), 2);
    let first_load = loaded_ids(&controller, nest);
    controller.finalize().unwrap();
    assert_eq!(controller.entity_count(), 0);
    assert_eq!(controller.scene().node_count(), 0);
    assert!(controller.definitions().is_empty());

    controller.register_component::<Marker>("marker").unwrap();
    controller.initialize().unwrap();
    assert_eq!(controller.definitions().type_names(), vec!["egg", "nest"]);
    let nest = controller.create("nest").unwrap();
    assert_eq!(controller.entity_count(), 2);
    assert_eq!(loaded_ids(&controller, nest), first_load);
}

/// Type name and component ids of `root` and each child, in creation order
fn loaded_ids(controller: &GameObjectController, root: EntityId) -> Vec<(String, Vec<String>)> {
    std::iter::once(root)
        .chain(controller.children(root))
        .map(|entity| {
            let object = controller.game_object(entity).unwrap();
            (
                object.type_name().to_string(),
                object.component_ids().map(ToString::to_string).collect(),
            )
        })
        .collect()
}

#[test]
fn test_definitions_are_scanned_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("crate.def"),
        format!("// wooden crate\n{}child = lid\n", recorder("crate", &[])),
    )
    .unwrap();
    std::fs::write(dir.path().join("lid.def"), recorder("lid", &[])).unwrap();
    std::fs::write(dir.path().join("ignored.go"), "not parsed {").unwrap();

    let config = ControllerConfig::new()
        .with_definitions_dir(dir.path())
        .with_definition_extension("def");
    let mut controller = GameObjectController::with_config(config);
    controller.register_component::<Recorder>("recorder").unwrap();
    controller.initialize().unwrap();

    assert_eq!(controller.definitions().type_names(), vec!["crate", "lid"]);
    let crate_object = controller.create("crate").unwrap();
    let lid = controller.children(crate_object)[0];
    assert_eq!(controller.game_object(lid).unwrap().type_name(), "lid");
}

#[test]
fn test_anonymous_objects_and_hierarchy_lookups() {
    let mut controller = controller(&[
        ("tower", format!("{}child = floor\n", recorder("tower", &[]))),
        ("floor", format!("{}child = room\n", recorder("floor", &[]))),
        ("room", recorder("room", &[])),
    ]);

    let holder = controller.create_anonymous(None).unwrap();
    let object = controller.game_object(holder).unwrap();
    assert_eq!(object.type_name(), ANONYMOUS_TYPE_NAME);
    assert_eq!(object.component_count(), 0);
    assert_eq!(
        controller.scene().node(object.node()).map(|node| node.name()),
        Some("annon")
    );

    let tower = controller.create_with_parent("tower", Some(holder)).unwrap();
    let floor = controller.children(tower)[0];
    let room = controller.children(floor)[0];

    assert_eq!(controller.parent(tower), Some(holder));
    assert_eq!(controller.parent(room), Some(floor));
    assert_eq!(controller.root(room), Some(holder));
    assert_eq!(controller.root(holder), Some(holder));
    assert_eq!(controller.find("room"), Some(room));

    let node = controller.game_object(room).unwrap().node();
    assert_eq!(controller.entity_of_node(node), Some(room));

    assert_eq!(
        controller.component_in_children::<Recorder>(tower).map(|p| p.label.as_str()),
        Some("floor")
    );
    let labels: Vec<_> = controller
        .components_in_children::<Recorder>(holder)
        .into_iter()
        .map(|p| p.label.as_str())
        .collect();
    assert_eq!(labels, vec!["tower", "floor", "room"]);
    assert!(controller.component_in_children::<Recorder>(room).is_none());
    assert_eq!(controller.entities(), vec![holder, tower, floor, room]);
}

#[test]
fn test_builder_composes_objects() {
    let mut controller = controller(&[]);
    let parent = controller.create_anonymous(None).unwrap();

    let composed = controller
        .build()
        .named("crate")
        .parent(parent)
        .with_id("lid", Recorder::labelled("lid"))
        .with(Recorder::labelled("body"))
        .with(Marker)
        .spawn()
        .unwrap();

    assert_eq!(
        take_lifecycle_events(),
        vec!["lid:start", "body:start"]
    );

    let object = controller.game_object(composed).unwrap();
    assert_eq!(object.type_name(), "crate");
    assert_eq!(
        object.component_ids().collect::<Vec<_>>(),
        vec!["lid", "annon_1", "annon_2"]
    );
    let type_names: Vec<_> = object.component_type_names().collect();
    assert_eq!(type_names[0], "recorder");
    assert!(type_names[2].ends_with("Marker"));
    assert!(object.has_component::<Marker>());
    assert_eq!(controller.parent(composed), Some(parent));
    assert_eq!(controller.components::<Recorder>(composed).count(), 2);

    controller.component_mut::<Recorder>(composed).unwrap().label = "renamed".to_string();
    assert_eq!(
        controller.find_component::<Recorder>(composed, "lid").map(|p| p.label.as_str()),
        Some("renamed")
    );
}
