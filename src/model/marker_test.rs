use tokio::sync::mpsc;

use super::*;

fn karlsruhe() -> Coordinate {
    Coordinate::new(49.015_511, 8.323_497)
}

#[test]
fn new_marker_is_hidden_without_position() {
    let marker = Marker::provided(ProvidedImage::Blue);
    assert!(marker.id().starts_with("marker-"));
    assert!(!marker.is_visible());
    assert!(marker.position().is_none());
    assert_eq!(marker.css_class(), "");
    assert_eq!((marker.offset_x(), marker.offset_y()), (-32, -64));
}

#[test]
fn empty_image_url_is_rejected() {
    assert!(matches!(Marker::new("", 0, 0), Err(ModelError::InvalidArgument(_))));
}

#[test]
fn markers_get_distinct_ids_in_construction_order() {
    let a = Marker::provided(ProvidedImage::Red);
    let b = Marker::provided(ProvidedImage::Red);
    assert_ne!(a, b);
    let seq = |m: &Marker| crate::model::id::sequence_of(m.id()).expect("suffix");
    assert!(seq(&b) > seq(&a));
}

#[test]
fn rotation_is_normalized() {
    let marker = Marker::provided(ProvidedImage::Green);
    marker.set_rotation(370);
    assert_eq!(marker.rotation(), 10);
    marker.set_rotation(-90);
    assert_eq!(marker.rotation(), 270);
}

#[test]
fn css_class_none_resets() {
    let marker = Marker::provided(ProvidedImage::Orange);
    marker.set_css_class(Some("highlight"));
    assert_eq!(marker.css_class(), "highlight");
    marker.set_css_class(None);
    assert_eq!(marker.css_class(), "");
}

#[test]
fn attached_label_follows_marker() {
    let marker = Marker::provided(ProvidedImage::Blue);
    let label = Label::new("castle").expect("label");
    marker.attach_label(&label).expect("attach");

    marker.set_position(karlsruhe());
    marker.set_visible(true);

    assert_eq!(label.position(), Some(karlsruhe()));
    assert!(label.is_visible());
    assert_eq!(label.owner(), Some(marker.clone()));
}

#[test]
fn attach_copies_current_marker_state() {
    let marker = Marker::provided(ProvidedImage::Blue);
    marker.set_position(karlsruhe());
    marker.set_visible(true);

    let label = Label::new("castle").expect("label");
    marker.attach_label(&label).expect("attach");
    assert_eq!(label.position(), Some(karlsruhe()));
    assert!(label.is_visible());
}

#[test]
fn attached_label_ignores_direct_changes() {
    let marker = Marker::provided(ProvidedImage::Blue);
    marker.set_position(karlsruhe());
    let label = Label::new("castle").expect("label");
    marker.attach_label(&label).expect("attach");

    label.set_position(Coordinate::new(0.0, 0.0));
    label.set_visible(true);

    assert_eq!(label.position(), Some(karlsruhe()));
    assert!(!label.is_visible());
}

#[test]
fn label_cannot_belong_to_two_markers() {
    let first = Marker::provided(ProvidedImage::Blue);
    let second = Marker::provided(ProvidedImage::Red);
    let label = Label::new("shared").expect("label");
    first.attach_label(&label).expect("attach");

    let err = second.attach_label(&label).expect_err("already attached");
    assert!(matches!(err, ModelError::LabelAlreadyAttached { ref marker, .. } if marker == first.id()));
    assert!(second.label().is_none());
    assert!(first.attach_label(&label).is_ok());
}

#[test]
fn attaching_replaces_previous_label() {
    let marker = Marker::provided(ProvidedImage::Blue);
    let old = Label::new("old").expect("label");
    let new = Label::new("new").expect("label");
    marker.attach_label(&old).expect("attach old");
    marker.attach_label(&new).expect("attach new");

    assert_eq!(marker.label(), Some(new.clone()));
    assert!(!old.is_attached());
    marker.set_position(karlsruhe());
    assert!(old.position().is_none());
    assert_eq!(new.position(), Some(karlsruhe()));
}

#[test]
fn detached_label_stops_following() {
    let marker = Marker::provided(ProvidedImage::Blue);
    let label = Label::new("castle").expect("label");
    marker.attach_label(&label).expect("attach");

    assert_eq!(marker.detach_label(), Some(label.clone()));
    assert!(marker.detach_label().is_none());
    marker.set_position(karlsruhe());
    assert!(label.position().is_none());

    label.set_visible(true);
    assert!(label.is_visible());
}

#[test]
fn dropping_marker_releases_label_owner() {
    let label = Label::new("orphan").expect("label");
    {
        let marker = Marker::provided(ProvidedImage::Blue);
        marker.attach_label(&label).expect("attach");
        assert!(label.is_attached());
    }
    assert!(!label.is_attached());
}

#[test]
fn dropping_last_handle_reports_reclaimed_id() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let marker = Marker::provided(ProvidedImage::Blue);
    let id = marker.id().to_owned();
    marker.track(&tx);
    marker.track(&tx);

    let clone = marker.clone();
    drop(marker);
    assert!(rx.try_recv().is_err());

    drop(clone);
    assert!(matches!(rx.try_recv(), Ok(SweepSignal::Reclaimed(ref reclaimed)) if *reclaimed == id));
    assert!(rx.try_recv().is_err());
}
