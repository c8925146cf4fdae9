//! Observable attribute cell.
//!
//! DESIGN
//! ======
//! A value plus an ordered listener list. `set` swaps the value under the
//! value lock, releases it, and then calls every listener registered at that
//! moment with `(old, new)` before returning. Listeners may therefore read
//! or set other observables (marker → label slaving does exactly that), but
//! a listener that sets the same observable recurses.
//!
//! Unchanged values notify nobody.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Handle returned by [`Observable::subscribe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener<T> = Arc<dyn Fn(&T, &T) + Send + Sync>;

pub struct Observable<T> {
    value: Mutex<T>,
    listeners: Mutex<Vec<(ListenerId, Listener<T>)>>,
    next_listener: AtomicU64,
}

impl<T> Observable<T>
where
    T: Clone + PartialEq + Send,
{
    pub fn new(value: T) -> Self {
        Self {
            value: Mutex::new(value),
            listeners: Mutex::new(Vec::new()),
            next_listener: AtomicU64::new(1),
        }
    }

    pub fn get(&self) -> T {
        self.value.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Replace the value. Returns `true` when it changed and listeners ran.
    pub fn set(&self, value: T) -> bool {
        let old = {
            let mut current = self.value.lock().unwrap_or_else(PoisonError::into_inner);
            if *current == value {
                return false;
            }
            std::mem::replace(&mut *current, value.clone())
        };

        let listeners: Vec<Listener<T>> = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in listeners {
            listener(&old, &value);
        }
        true
    }

    pub fn subscribe<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&T, &T) + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_listener.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::new(listener)));
        id
    }

    /// Detach a listener. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|(listener_id, _)| *listener_id != id);
        listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl<T> std::fmt::Debug for Observable<T>
where
    T: Clone + PartialEq + Send + std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observable")
            .field("value", &self.get())
            .field("listeners", &self.listener_count())
            .finish()
    }
}

#[cfg(test)]
#[path = "observable_test.rs"]
mod tests;
