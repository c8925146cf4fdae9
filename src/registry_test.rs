use protocol::Command;

use super::*;
use crate::model::{Coordinate, ProvidedImage};
use crate::test_helpers::RecordingEngine;

fn lifecycle(ready: bool) -> (Arc<RecordingEngine>, Lifecycle, mpsc::UnboundedReceiver<SweepSignal>) {
    let engine = RecordingEngine::new();
    let bridge = Arc::new(EngineBridge::new(engine.clone()));
    if ready {
        bridge.mark_ready();
    }
    let (tx, rx) = mpsc::unbounded_channel();
    (engine, Lifecycle::new(bridge, tx), rx)
}

fn placed_marker() -> Marker {
    let marker = Marker::provided(ProvidedImage::Blue);
    marker.set_position(Coordinate::new(49.013_517, 8.404_435));
    marker
}

#[test]
fn add_before_ready_is_ignored() {
    let (engine, lc, _rx) = lifecycle(false);
    let marker = placed_marker();
    lc.add_marker(&marker);
    assert!(!lc.is_registered(marker.id()));
    assert!(engine.commands().is_empty());
}

#[test]
fn add_marker_creates_then_syncs() {
    let (engine, lc, _rx) = lifecycle(true);
    let marker = placed_marker();
    marker.set_rotation(45);
    marker.set_css_class(Some("poi"));
    lc.add_marker(&marker);

    let id = marker.id().to_owned();
    assert_eq!(
        engine.commands(),
        vec![
            Command::AddMarker {
                id: id.clone(),
                url: ProvidedImage::Blue.url().into(),
                latitude: 49.013_517,
                longitude: 8.404_435,
                offset_x: -32,
                offset_y: -64,
            },
            Command::Hide { id: id.clone() },
            Command::SetRotation { id: id.clone(), rotation: 45 },
            Command::SetCssClass { id, css_class: "poi".into() },
        ]
    );
}

#[test]
fn marker_without_position_is_not_added() {
    let (engine, lc, _rx) = lifecycle(true);
    let marker = Marker::provided(ProvidedImage::Red);
    lc.add_marker(&marker);
    assert!(!lc.is_registered(marker.id()));
    assert!(engine.commands().is_empty());
}

#[test]
fn add_is_idempotent() {
    let (engine, lc, _rx) = lifecycle(true);
    let marker = placed_marker();
    lc.add_marker(&marker);
    let after_first = engine.commands().len();
    let listeners = marker.0.element.position.listener_count();

    lc.add_marker(&marker);
    assert_eq!(engine.commands().len(), after_first);
    assert_eq!(marker.0.element.position.listener_count(), listeners);
    assert_eq!(lc.elements.len(), 1);
}

#[test]
fn add_remove_remove() {
    let (engine, lc, _rx) = lifecycle(true);
    let marker = placed_marker();
    lc.add_marker(&marker);
    engine.clear();

    lc.remove_marker(&marker);
    assert!(!lc.is_registered(marker.id()));
    assert_eq!(engine.names(), vec!["hide", "remove"]);

    lc.remove_marker(&marker);
    assert_eq!(engine.names(), vec!["hide", "remove"]);
}

#[test]
fn listeners_push_changes_until_removed() {
    let (engine, lc, _rx) = lifecycle(true);
    let marker = placed_marker();
    lc.add_marker(&marker);
    engine.clear();

    marker.set_visible(true);
    marker.set_position(Coordinate::new(1.0, 2.0));
    assert_eq!(
        engine.commands(),
        vec![
            Command::Show { id: marker.id().into() },
            Command::MoveMapObject { id: marker.id().into(), latitude: 1.0, longitude: 2.0 },
        ]
    );

    lc.remove_marker(&marker);
    engine.clear();
    marker.set_visible(false);
    marker.set_position(Coordinate::new(3.0, 4.0));
    assert!(engine.commands().is_empty());
    assert_eq!(marker.0.element.position.listener_count(), 0);
}

#[test]
fn adding_marker_adds_attached_label() {
    let (engine, lc, _rx) = lifecycle(true);
    let marker = placed_marker();
    let label = Label::new("Schloss").expect("label");
    marker.attach_label(&label).expect("attach");
    lc.add_marker(&marker);

    assert!(lc.is_registered(label.id()));
    assert_eq!(engine.commands_for(label.id())[0].name(), "addLabel");
    engine.clear();

    marker.set_position(Coordinate::new(5.0, 6.0));
    let moved: Vec<_> = engine.commands().iter().filter_map(|c| c.target().map(str::to_owned)).collect();
    assert!(moved.contains(&marker.id().to_owned()));
    assert!(moved.contains(&label.id().to_owned()));
}

#[test]
fn owned_label_waits_for_its_marker() {
    let (engine, lc, _rx) = lifecycle(true);
    let marker = placed_marker();
    let label = Label::new("Schloss").expect("label");
    marker.attach_label(&label).expect("attach");

    lc.add_label(&label);
    assert!(!lc.is_registered(label.id()));
    assert!(engine.commands().is_empty());
}

#[test]
fn owned_label_cannot_be_removed_directly() {
    let (_engine, lc, _rx) = lifecycle(true);
    let marker = placed_marker();
    let label = Label::new("Schloss").expect("label");
    marker.attach_label(&label).expect("attach");
    lc.add_marker(&marker);

    lc.remove_label(&label);
    assert!(lc.is_registered(label.id()));

    lc.remove_marker(&marker);
    assert!(!lc.is_registered(label.id()));
    assert!(!lc.is_registered(marker.id()));
}

#[test]
fn free_label_is_added_and_removed() {
    let (engine, lc, _rx) = lifecycle(true);
    let label = Label::new("free").expect("label");
    label.set_position(Coordinate::new(1.0, 1.0));
    lc.add_label(&label);
    assert_eq!(lc.label(label.id()), Some(label.clone()));
    assert!(lc.marker(label.id()).is_none());

    lc.remove_label(&label);
    assert!(!lc.is_registered(label.id()));
    assert_eq!(engine.names().last().copied(), Some("remove"));
}

#[test]
fn coordinate_line_registration_sequence() {
    let (engine, lc, _rx) = lifecycle(true);
    let line = CoordinateLine::new(&[
        Coordinate::new(49.013_517, 8.404_435),
        Coordinate::new(49.015_511, 8.323_497),
        Coordinate::new(48.993_284, 8.402_186),
    ]);
    line.set_width(7).set_closed(true);
    lc.add_coordinate_line(&line);

    assert_eq!(
        engine.names(),
        vec![
            "getCoordinateLine",
            "addCoordinate",
            "addCoordinate",
            "addCoordinate",
            "setColor",
            "setFillColor",
            "setWidth",
            "setClosed",
            "seal",
            "hide",
        ]
    );
    assert!(engine.commands().contains(&Command::SetWidth { id: line.id().into(), width: 7 }));
    assert!(engine.commands().contains(&Command::SetClosed { id: line.id().into(), closed: true }));

    lc.add_coordinate_line(&line);
    assert_eq!(engine.names().len(), 10);
}

#[test]
fn line_style_changes_are_not_live() {
    let (engine, lc, _rx) = lifecycle(true);
    let line = CoordinateLine::new(&[Coordinate::new(1.0, 1.0), Coordinate::new(2.0, 2.0)]);
    lc.add_coordinate_line(&line);
    engine.clear();

    line.set_width(9);
    assert!(engine.commands().is_empty());
    line.set_visible(true);
    assert_eq!(engine.commands(), vec![Command::Show { id: line.id().into() }]);
}

#[test]
fn circle_add_and_remove() {
    let (engine, lc, _rx) = lifecycle(true);
    let circle = MapCircle::new(Coordinate::new(49.0, 8.4), 100.0);
    circle.set_visible(true);
    lc.add_map_circle(&circle);
    assert_eq!(engine.names().last().copied(), Some("show"));

    lc.remove_map_circle(&circle);
    assert!(!lc.is_registered(circle.id()));
    assert_eq!(circle.0.entity.visible.listener_count(), 0);
}

#[test]
fn dropped_entities_are_reported_and_reclaimed() {
    let (engine, lc, mut rx) = lifecycle(true);
    let marker = placed_marker();
    let label = Label::new("gone").expect("label");
    marker.attach_label(&label).expect("attach");
    let line = CoordinateLine::new(&[Coordinate::new(1.0, 1.0), Coordinate::new(2.0, 2.0)]);
    lc.add_marker(&marker);
    lc.add_coordinate_line(&line);
    let (marker_id, label_id, line_id) = (marker.id().to_owned(), label.id().to_owned(), line.id().to_owned());

    assert!(lc.dead_ids().is_empty());
    drop(label);
    drop(marker);
    drop(line);

    let mut signalled = Vec::new();
    while let Ok(SweepSignal::Reclaimed(id)) = rx.try_recv() {
        signalled.push(id);
    }
    assert_eq!(signalled.len(), 3);

    let dead = lc.dead_ids();
    assert_eq!(dead.len(), 3);
    assert!(dead.lines.contains(&line_id));
    engine.clear();

    lc.remove_reclaimed(dead);
    assert!(!lc.is_registered(&marker_id));
    assert!(!lc.is_registered(&label_id));
    assert!(!lc.is_registered(&line_id));
    assert_eq!(engine.names().iter().filter(|n| **n == "remove").count(), 3);
}

#[test]
fn reclaimed_marker_takes_live_label_along() {
    let (_engine, lc, _rx) = lifecycle(true);
    let label = Label::new("survivor").expect("label");
    {
        let marker = placed_marker();
        marker.attach_label(&label).expect("attach");
        lc.add_marker(&marker);
    }
    assert!(lc.is_registered(label.id()));

    let dead = lc.dead_ids();
    assert_eq!(dead.elements.len(), 1);
    lc.remove_reclaimed(dead);
    assert!(!lc.is_registered(label.id()));
    assert_eq!(lc.elements.len(), 0);
}

#[test]
fn detached_label_survives_former_owner_reclaim() {
    let (engine, lc, _rx) = lifecycle(true);
    let label = Label::new("free again").expect("label");
    {
        let marker = placed_marker();
        marker.attach_label(&label).expect("attach");
        lc.add_marker(&marker);
        assert_eq!(marker.detach_label(), Some(label.clone()));
    }
    engine.clear();

    let dead = lc.dead_ids();
    assert_eq!(dead.elements.len(), 1);
    lc.remove_reclaimed(dead);
    assert!(lc.is_registered(label.id()));
    assert!(engine.commands_for(label.id()).is_empty());
    assert_eq!(lc.elements.len(), 1);
}

#[test]
fn reattached_label_stays_with_its_new_marker() {
    let (_engine, lc, _rx) = lifecycle(true);
    let label = Label::new("moved").expect("label");
    let keeper = placed_marker();
    {
        let first = placed_marker();
        first.attach_label(&label).expect("attach");
        lc.add_marker(&first);
        first.detach_label();
        keeper.attach_label(&label).expect("reattach");
        lc.add_marker(&keeper);
    }

    lc.remove_reclaimed(lc.dead_ids());
    assert!(lc.is_registered(keeper.id()));
    assert!(lc.is_registered(label.id()));
}
