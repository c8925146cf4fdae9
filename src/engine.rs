//! The map engine collaborator.
//!
//! DESIGN
//! ======
//! The engine is the embedded rendering runtime that owns the mirror objects.
//! It is UI-thread-affine: every call on a [`MapEngine`] must be made from the
//! UI context. This crate only ever talks to it through three operations:
//! load the map document, acquire the connector (the bootstrap call that
//! hands the configuration to the page), and execute a [`Command`].
//!
//! [`ChannelEngine`] is the out-of-process form: requests travel over a tokio
//! channel to whatever process hosts the renderer. Document load and
//! connector acquisition wait for a reply; commands are fire-and-forget.

use protocol::Command;
use tokio::sync::{mpsc, oneshot};

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("map document failed to load: {0}")]
    Load(String),
    #[error("connector not available: {0}")]
    Connector(String),
    #[error("command {op} failed: {message}")]
    Execute { op: &'static str, message: String },
    #[error("engine channel closed")]
    Closed,
}

/// UI-thread-affine map engine.
pub trait MapEngine: Send + Sync {
    /// Load and render the map document.
    ///
    /// # Errors
    ///
    /// [`EngineError::Load`] when the document cannot be rendered.
    fn load_document(&self, document: &str) -> Result<(), EngineError>;

    /// Invoke the bootstrap call that creates the connector for `configuration_json`.
    ///
    /// # Errors
    ///
    /// [`EngineError::Connector`] while scripting is not ready yet.
    fn acquire_connector(&self, configuration_json: &str) -> Result<(), EngineError>;

    /// # Errors
    ///
    /// [`EngineError::Execute`] when the connector call throws.
    fn execute(&self, command: &Command) -> Result<(), EngineError>;
}

// =============================================================================
// CHANNEL ENGINE
// =============================================================================

/// Request sent to the renderer process.
#[derive(Debug)]
pub enum EngineRequest {
    LoadDocument { document: String, reply: oneshot::Sender<Result<(), String>> },
    AcquireConnector { configuration: String, reply: oneshot::Sender<Result<(), String>> },
    Execute(Command),
}

/// [`MapEngine`] that forwards every call over an unbounded channel.
///
/// The blocking calls wait with `blocking_recv`, so they must not run inside
/// an async task.
pub struct ChannelEngine {
    tx: mpsc::UnboundedSender<EngineRequest>,
}

impl ChannelEngine {
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<EngineRequest>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn round_trip<F>(&self, build: F) -> Result<Result<(), String>, EngineError>
    where
        F: FnOnce(oneshot::Sender<Result<(), String>>) -> EngineRequest,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx.send(build(reply_tx)).map_err(|_| EngineError::Closed)?;
        reply_rx.blocking_recv().map_err(|_| EngineError::Closed)
    }
}

impl MapEngine for ChannelEngine {
    fn load_document(&self, document: &str) -> Result<(), EngineError> {
        self.round_trip(|reply| EngineRequest::LoadDocument { document: document.to_owned(), reply })?
            .map_err(EngineError::Load)
    }

    fn acquire_connector(&self, configuration_json: &str) -> Result<(), EngineError> {
        self.round_trip(|reply| EngineRequest::AcquireConnector { configuration: configuration_json.to_owned(), reply })?
            .map_err(EngineError::Connector)
    }

    fn execute(&self, command: &Command) -> Result<(), EngineError> {
        self.tx
            .send(EngineRequest::Execute(command.clone()))
            .map_err(|_| EngineError::Closed)
    }
}

#[cfg(test)]
#[path = "engine_test.rs"]
mod tests;
