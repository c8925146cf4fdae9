//! UI-thread marshaling.
//!
//! Work that must touch the engine from a non-UI thread (the sweeper's
//! removals) is handed to a [`UiExecutor`] and runs later on the UI context.

use std::sync::{Mutex, PoisonError};

use tokio::sync::mpsc;

pub type UiTask = Box<dyn FnOnce() + Send>;

pub trait UiExecutor: Send + Sync {
    /// Schedule `task` on the UI context. Must not block.
    fn run_later(&self, task: UiTask);
}

/// Runs tasks immediately on the calling thread.
///
/// Only correct when every caller already is the UI context, e.g. a
/// single-threaded host or tests.
#[derive(Clone, Copy, Debug, Default)]
pub struct InlineExecutor;

impl UiExecutor for InlineExecutor {
    fn run_later(&self, task: UiTask) {
        task();
    }
}

/// Queue drained by the UI loop through [`UiQueue::run_pending`].
pub struct UiQueue {
    tx: mpsc::UnboundedSender<UiTask>,
    rx: Mutex<mpsc::UnboundedReceiver<UiTask>>,
}

impl Default for UiQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl UiQueue {
    #[must_use]
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self { tx, rx: Mutex::new(rx) }
    }

    /// Run every task queued so far. Returns how many ran.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        loop {
            // Release the lock before running so a task may enqueue more work.
            let next = self.rx.lock().unwrap_or_else(PoisonError::into_inner).try_recv();
            let Ok(task) = next else { break };
            task();
            ran += 1;
        }
        ran
    }
}

impl UiExecutor for UiQueue {
    fn run_later(&self, task: UiTask) {
        // The receiver lives in `self`, so the send only fails during teardown.
        let _ = self.tx.send(task);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn inline_runs_immediately() {
        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        InlineExecutor.run_later(Box::new(move || {
            h.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn queue_defers_until_drained() {
        let queue = UiQueue::new();
        let hits = Arc::new(AtomicUsize::new(0));
        for _ in 0..3 {
            let h = Arc::clone(&hits);
            queue.run_later(Box::new(move || {
                h.fetch_add(1, Ordering::SeqCst);
            }));
        }
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert_eq!(queue.run_pending(), 3);
        assert_eq!(hits.load(Ordering::SeqCst), 3);
        assert_eq!(queue.run_pending(), 0);
    }
}
