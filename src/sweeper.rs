//! Background reclaim of mirrors whose entities the host dropped.
//!
//! DESIGN
//! ======
//! Every registered entity holds a sender for the reclaim channel and reports
//! its id from `Drop`. The sweeper thread blocks on that channel (no
//! polling), then scans the three registries for dead weak handles and hands
//! the removals to the UI executor without waiting for them.
//!
//! STATES
//! ======
//! `Waiting` → (signal) → `Sweeping` → `Waiting` ... → `Stopped`.
//! `Stopped` is terminal and entered on an explicit shutdown signal, when the
//! channel closes, or when the owning map view is gone. Shutdown is best
//! effort: dropping a [`Sweeper`] signals the thread but does not join it.

use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::thread::JoinHandle;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::registry::Lifecycle;
use crate::ui::UiExecutor;

/// Message on the reclaim channel.
#[derive(Debug)]
pub enum SweepSignal {
    /// The last handle to the entity with this id was dropped.
    Reclaimed(String),
    Shutdown,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SweeperState {
    Waiting,
    Sweeping,
    Stopped,
}

pub struct Sweeper {
    state: Arc<Mutex<SweeperState>>,
    tx: mpsc::UnboundedSender<SweepSignal>,
    handle: Option<JoinHandle<()>>,
}

impl Sweeper {
    pub(crate) fn spawn(
        lifecycle: Weak<Lifecycle>,
        ui: Arc<dyn UiExecutor>,
        tx: mpsc::UnboundedSender<SweepSignal>,
        rx: mpsc::UnboundedReceiver<SweepSignal>,
    ) -> std::io::Result<Self> {
        let state = Arc::new(Mutex::new(SweeperState::Waiting));
        let thread_state = Arc::clone(&state);
        let handle = std::thread::Builder::new()
            .name("mapview-sweeper".into())
            .spawn(move || run(rx, &lifecycle, ui.as_ref(), &thread_state))?;
        Ok(Self { state, tx, handle: Some(handle) })
    }

    #[must_use]
    pub fn state(&self) -> SweeperState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Signal shutdown and wait for the thread to exit.
    pub fn stop(&mut self) {
        let _ = self.tx.send(SweepSignal::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Sweeper {
    fn drop(&mut self) {
        let _ = self.tx.send(SweepSignal::Shutdown);
    }
}

fn set_state(state: &Mutex<SweeperState>, next: SweeperState) {
    *state.lock().unwrap_or_else(PoisonError::into_inner) = next;
}

fn run(
    mut rx: mpsc::UnboundedReceiver<SweepSignal>,
    lifecycle: &Weak<Lifecycle>,
    ui: &dyn UiExecutor,
    state: &Mutex<SweeperState>,
) {
    info!("sweeper started");
    loop {
        set_state(state, SweeperState::Waiting);
        let Some(first) = rx.blocking_recv() else {
            break;
        };

        // Coalesce a burst of drops into one scan.
        let mut shutdown = matches!(first, SweepSignal::Shutdown);
        while let Ok(next) = rx.try_recv() {
            shutdown |= matches!(next, SweepSignal::Shutdown);
        }
        if shutdown {
            break;
        }

        let Some(registry) = lifecycle.upgrade() else {
            break;
        };
        set_state(state, SweeperState::Sweeping);
        let reclaimed = registry.dead_ids();
        drop(registry);
        if reclaimed.is_empty() {
            continue;
        }

        debug!(count = reclaimed.len(), "reclaiming mirrors of dropped entities");
        let target = lifecycle.clone();
        ui.run_later(Box::new(move || {
            if let Some(registry) = target.upgrade() {
                registry.remove_reclaimed(reclaimed);
            }
        }));
    }
    set_state(state, SweeperState::Stopped);
    info!("sweeper stopped");
}

#[cfg(test)]
#[path = "sweeper_test.rs"]
mod tests;
