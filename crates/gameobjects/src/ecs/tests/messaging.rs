//! Broadcast delivery, vetoes, reentrancy and the message pool

use super::support::{
    controller, recorder, take_events, take_events_matching, take_lifecycle_events, Ping, Poke,
};
use crate::ecs::{GameObjectController, GameObjectError};
use crate::messages::MessageKind;

#[test]
fn test_broadcast_follows_declaration_and_document_order() {
    let mut controller = controller(&[
        (
            "parent",
            format!("{}{}child = kid\n", recorder("p1", &[]), recorder("p2", &[])),
        ),
        ("kid", recorder("k1", &[])),
        ("loner", recorder("l1", &[])),
    ]);
    controller.create("parent").unwrap();
    controller.create("loner").unwrap();
    take_events();

    controller.broadcast(&Ping).unwrap();
    assert_eq!(take_events(), vec!["p1:ping", "p2:ping", "k1:ping", "l1:ping"]);
}

#[test]
fn test_veto_stops_only_the_same_object() {
    let mut controller = controller(&[
        (
            "guarded",
            format!("{}{}", recorder("v1", &[("veto", "true")]), recorder("v2", &[])),
        ),
        ("other", recorder("o1", &[])),
    ]);
    controller.create("guarded").unwrap();
    controller.create("other").unwrap();
    take_events();

    controller.broadcast(&Ping).unwrap();
    assert_eq!(take_events(), vec!["v1:ping", "o1:ping"]);
}

#[test]
fn test_broadcast_to_reaches_only_the_subtree() {
    let mut controller = controller(&[
        ("parent", format!("{}child = kid\n", recorder("parent", &[]))),
        ("kid", recorder("kid", &[])),
        ("loner", recorder("loner", &[])),
    ]);
    let parent = controller.create("parent").unwrap();
    let kid = controller.children(parent)[0];
    controller.create("loner").unwrap();
    take_events();

    controller.broadcast_to(parent, &Ping).unwrap();
    assert_eq!(take_events(), vec!["parent:ping", "kid:ping"]);

    controller.broadcast_to(kid, &Ping).unwrap();
    assert_eq!(take_events(), vec!["kid:ping"]);

    controller.destroy(kid);
    assert!(matches!(
        controller.broadcast_to(kid, &Ping),
        Err(GameObjectError::UnknownEntity(_))
    ));
}

#[test]
fn test_objects_created_mid_broadcast_are_not_visited() {
    let mut controller = controller(&[
        ("spawner", recorder("spawner", &[("spawn_on_ping", "kid")])),
        ("kid", recorder("kid", &[])),
    ]);
    let spawner = controller.create("spawner").unwrap();
    take_events();

    controller.broadcast(&Ping).unwrap();
    assert_eq!(
        take_events(),
        vec!["spawner:ping", "kid:read", "kid:init", "kid:start"]
    );
    assert_eq!(controller.children(spawner).len(), 1);

    controller.broadcast(&Ping).unwrap();
    assert_eq!(take_events_matching(":ping"), vec!["spawner:ping", "kid:ping"]);
    assert_eq!(controller.children(spawner).len(), 2);
}

#[test]
fn test_messages_wait_for_on_start() {
    let mut controller = controller(&[
        ("listener", recorder("listener", &[])),
        (
            "starter",
            format!(
                "{}{}{}",
                recorder("s1", &[]),
                recorder("s2", &[("ping_on_start", "true")]),
                recorder("s3", &[])
            ),
        ),
    ]);
    controller.create("listener").unwrap();
    take_events();

    controller.create("starter").unwrap();
    assert_eq!(
        take_lifecycle_events(),
        vec!["s1:start", "s2:start", "listener:ping", "s1:ping", "s3:start"]
    );
}

#[test]
fn test_same_kind_reentrancy_is_rejected() {
    let mut controller = controller(&[
        ("echo", recorder("echo", &[("rebroadcast", "true")])),
        ("listener", recorder("listener", &[])),
    ]);
    controller.create("echo").unwrap();
    controller.create("listener").unwrap();
    take_events();

    controller.send::<Ping>(|_| {}).unwrap();
    assert_eq!(
        take_events(),
        vec![
            "echo:ping",
            "echo:reentrant",
            "echo:reentrant",
            "listener:poke 3",
            "echo:poke-sent",
            "listener:ping",
        ]
    );

    controller.broadcast(&Ping).unwrap();
    assert_eq!(take_events_matching("reentrant").len(), 2);
    assert!(!controller.messages().is_in_flight(MessageKind::of::<Ping>()));
    assert!(!controller.is_dispatching());
}

#[test]
fn test_send_reuses_the_pooled_instance() {
    let mut controller = controller(&[("listener", recorder("listener", &[]))]);
    controller.create("listener").unwrap();
    take_events();

    controller.send::<Poke>(|poke| poke.strength = 5).unwrap();
    controller.send::<Poke>(|poke| poke.strength += 1).unwrap();
    assert_eq!(take_events(), vec!["listener:poke 5", "listener:poke 6"]);
    assert_eq!(controller.messages().pooled::<Poke>().map(|p| p.strength), Some(6));
    assert_eq!(controller.messages().len(), 1);
}

#[test]
fn test_finalize_is_rejected_while_dispatching() {
    let mut controller = controller(&[("rash", recorder("rash", &[("finalize_on_ping", "true")]))]);
    let rash = controller.create("rash").unwrap();
    take_events();

    controller.broadcast(&Ping).unwrap();
    assert_eq!(take_events(), vec!["rash:ping", "rash:finalize-rejected"]);
    assert!(controller.contains(rash));
    assert!(controller.is_initialized());
}

#[test]
fn test_broadcast_without_objects_is_a_no_op() {
    let mut controller = GameObjectController::new();
    controller.broadcast(&Ping).unwrap();
    controller.send::<Poke>(|poke| poke.strength = 1).unwrap();
    assert!(take_events().is_empty());
}
