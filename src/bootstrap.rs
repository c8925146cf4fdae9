//! Bootstrap sequencing with bounded connector retries.
//!
//! DESIGN
//! ======
//! `Loading` renders the map document; success implies scripting is up, so
//! `WaitingEngineReady` is passed straight through to
//! `AcquiringBridgeHandle`. Acquisition is retried with a fixed blocking
//! sleep between attempts. Both failure paths end in `Failed`, which is
//! terminal: the view stays uninitialized and every push remains a no-op.
//!
//! The sleep blocks whichever thread drives bootstrap (normally the UI
//! thread). Retries are rare and bounded, so that is tolerated.

use tracing::{error, info, warn};

use crate::config::{BootstrapConfig, Configuration};
use crate::engine::MapEngine;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BootState {
    Loading,
    WaitingEngineReady,
    AcquiringBridgeHandle,
    Ready,
    Failed,
}

impl BootState {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Ready | Self::Failed)
    }
}

/// Drive the sequence to `Ready` or `Failed`, reporting every state entered.
pub(crate) fn run(
    engine: &dyn MapEngine,
    config: &BootstrapConfig,
    configuration: &Configuration,
    mut enter: impl FnMut(BootState),
) -> BootState {
    enter(BootState::Loading);
    if let Err(e) = engine.load_document(&config.document) {
        error!(document = %config.document, error = %e, "map document failed to load");
        enter(BootState::Failed);
        return BootState::Failed;
    }

    enter(BootState::WaitingEngineReady);
    enter(BootState::AcquiringBridgeHandle);

    let payload = configuration.to_json();
    let attempts = config.max_attempts.max(1);
    for attempt in 1..=attempts {
        match engine.acquire_connector(&payload) {
            Ok(()) => {
                info!(attempt, "map connector acquired");
                enter(BootState::Ready);
                return BootState::Ready;
            }
            Err(e) => {
                warn!(attempt, attempts, error = %e, "map connector not ready");
                if attempt < attempts {
                    std::thread::sleep(config.backoff);
                }
            }
        }
    }

    error!(attempts, "giving up on map connector; map view stays uninitialized");
    enter(BootState::Failed);
    BootState::Failed
}

#[cfg(test)]
#[path = "bootstrap_test.rs"]
mod tests;
