use std::collections::HashSet;

use super::*;

#[test]
fn ids_carry_kind_prefix() {
    assert!(next_id(Kind::Marker).starts_with("marker-"));
    assert!(next_id(Kind::Label).starts_with("label-"));
    assert!(next_id(Kind::CoordinateLine).starts_with("coordinateline-"));
    assert!(next_id(Kind::MapCircle).starts_with("mapcircle-"));
}

#[test]
fn ids_increase_in_allocation_order() {
    let first = sequence_of(&next_id(Kind::CoordinateLine)).expect("numeric suffix");
    let second = sequence_of(&next_id(Kind::CoordinateLine)).expect("numeric suffix");
    assert!(second > first);
    assert!(first >= 1);
}

#[test]
fn concurrent_allocation_never_duplicates() {
    let handles: Vec<_> = (0..8)
        .map(|_| std::thread::spawn(|| (0..200).map(|_| next_id(Kind::Marker)).collect::<Vec<_>>()))
        .collect();

    let mut seen = HashSet::new();
    for handle in handles {
        for id in handle.join().expect("allocator thread") {
            assert!(seen.insert(id), "duplicate id allocated");
        }
    }
    assert_eq!(seen.len(), 1600);
}

#[test]
fn sequence_of_rejects_foreign_ids() {
    assert_eq!(sequence_of("marker-12"), Some(12));
    assert_eq!(sequence_of("marker"), None);
    assert_eq!(sequence_of("marker-x"), None);
}
