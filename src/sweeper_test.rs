use std::time::{Duration, Instant};

use super::*;
use crate::bridge::EngineBridge;
use crate::model::{Coordinate, MapCircle, Marker, ProvidedImage};
use crate::test_helpers::RecordingEngine;
use crate::ui::UiQueue;

struct Fixture {
    engine: Arc<RecordingEngine>,
    lifecycle: Arc<Lifecycle>,
    queue: Arc<UiQueue>,
    sweeper: Sweeper,
}

fn fixture() -> Fixture {
    let engine = RecordingEngine::new();
    let bridge = Arc::new(EngineBridge::new(engine.clone()));
    bridge.mark_ready();
    let (tx, rx) = mpsc::unbounded_channel();
    let lifecycle = Arc::new(Lifecycle::new(bridge, tx.clone()));
    let queue = Arc::new(UiQueue::new());
    let sweeper = Sweeper::spawn(Arc::downgrade(&lifecycle), queue.clone(), tx, rx).expect("spawn sweeper");
    Fixture { engine, lifecycle, queue, sweeper }
}

fn wait_for(mut done: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if done() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    false
}

#[test]
fn dropped_marker_mirror_is_removed_on_ui_queue() {
    let fx = fixture();
    let marker = Marker::provided(ProvidedImage::Green);
    marker.set_position(Coordinate::new(49.0, 8.4));
    let id = marker.id().to_owned();
    fx.lifecycle.add_marker(&marker);
    fx.engine.clear();

    drop(marker);
    assert!(wait_for(|| fx.queue.run_pending() > 0), "sweeper never scheduled removal");

    assert!(!fx.lifecycle.is_registered(&id));
    assert_eq!(
        fx.engine.commands(),
        vec![protocol::Command::Hide { id: id.clone() }, protocol::Command::Remove { id }]
    );
}

#[test]
fn live_entities_survive_a_sweep() {
    let fx = fixture();
    let keep = MapCircle::new(Coordinate::new(1.0, 1.0), 10.0);
    let gone = MapCircle::new(Coordinate::new(2.0, 2.0), 10.0);
    fx.lifecycle.add_map_circle(&keep);
    fx.lifecycle.add_map_circle(&gone);

    drop(gone);
    assert!(wait_for(|| fx.queue.run_pending() > 0));
    assert!(fx.lifecycle.is_registered(keep.id()));
    assert_eq!(fx.lifecycle.circles.len(), 1);
}

#[test]
fn stop_is_terminal() {
    let mut fx = fixture();
    assert!(wait_for(|| fx.sweeper.state() == SweeperState::Waiting));
    fx.sweeper.stop();
    assert_eq!(fx.sweeper.state(), SweeperState::Stopped);

    let marker = Marker::provided(ProvidedImage::Red);
    marker.set_position(Coordinate::new(0.0, 0.0));
    fx.lifecycle.add_marker(&marker);
    drop(marker);
    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(fx.queue.run_pending(), 0);
}

#[test]
fn sweeper_stops_when_view_is_gone() {
    let fx = fixture();
    let Fixture { lifecycle, sweeper, .. } = fx;
    let tx = lifecycle.reclaim_sender();
    drop(lifecycle);
    let _ = tx.send(SweepSignal::Reclaimed("marker-0".into()));
    assert!(wait_for(|| sweeper.state() == SweeperState::Stopped));
}
