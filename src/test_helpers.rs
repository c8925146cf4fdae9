//! Test doubles shared by the unit tests.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::get;
use protocol::Command;

use crate::engine::{EngineError, MapEngine};

/// Engine that records every command in order.
#[derive(Default)]
pub struct RecordingEngine {
    commands: Mutex<Vec<Command>>,
    documents: Mutex<Vec<String>>,
    connector_attempts: AtomicUsize,
    connector_failures: AtomicUsize,
    fail_load: AtomicBool,
    fail_execute: AtomicBool,
}

impl RecordingEngine {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Fail the next `n` connector acquisitions.
    pub fn fail_connector(&self, n: usize) {
        self.connector_failures.store(n, Ordering::SeqCst);
    }

    pub fn fail_load(&self) {
        self.fail_load.store(true, Ordering::SeqCst);
    }

    pub fn fail_execute(&self) {
        self.fail_execute.store(true, Ordering::SeqCst);
    }

    pub fn commands(&self) -> Vec<Command> {
        self.commands.lock().unwrap().clone()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.commands().iter().map(Command::name).collect()
    }

    /// Commands addressed to `id`.
    pub fn commands_for(&self, id: &str) -> Vec<Command> {
        self.commands().into_iter().filter(|c| c.target() == Some(id)).collect()
    }

    pub fn clear(&self) {
        self.commands.lock().unwrap().clear();
    }

    pub fn documents(&self) -> Vec<String> {
        self.documents.lock().unwrap().clone()
    }

    pub fn connector_attempts(&self) -> usize {
        self.connector_attempts.load(Ordering::SeqCst)
    }
}

impl MapEngine for RecordingEngine {
    fn load_document(&self, document: &str) -> Result<(), EngineError> {
        self.documents.lock().unwrap().push(document.to_owned());
        if self.fail_load.load(Ordering::SeqCst) {
            return Err(EngineError::Load(format!("{document}: not found")));
        }
        Ok(())
    }

    fn acquire_connector(&self, _configuration_json: &str) -> Result<(), EngineError> {
        self.connector_attempts.fetch_add(1, Ordering::SeqCst);
        let remaining = self.connector_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.connector_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(EngineError::Connector("connector not defined yet".into()));
        }
        Ok(())
    }

    fn execute(&self, command: &Command) -> Result<(), EngineError> {
        self.commands.lock().unwrap().push(command.clone());
        if self.fail_execute.load(Ordering::SeqCst) {
            return Err(EngineError::Execute { op: command.name(), message: "script error".into() });
        }
        Ok(())
    }
}

// =============================================================================
// TILE SERVER
// =============================================================================

/// Local HTTP server standing in for a tile provider. Counts every request.
pub struct TileServer {
    pub addr: SocketAddr,
    hits: Arc<AtomicUsize>,
}

impl TileServer {
    pub async fn spawn() -> Self {
        let hits = Arc::new(AtomicUsize::new(0));
        let app = Router::new()
            .route("/tiles/{z}/{x}/{y}", get(tile))
            .route("/missing", get(missing))
            .with_state(Arc::clone(&hits));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Self { addr, hits }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

async fn tile(State(hits): State<Arc<AtomicUsize>>, Path((z, x, y)): Path<(u32, u32, String)>) -> impl IntoResponse {
    hits.fetch_add(1, Ordering::SeqCst);
    (
        [(header::CONTENT_TYPE, "image/png"), (header::CACHE_CONTROL, "max-age=3600")],
        format!("tile {z}/{x}/{y}").into_bytes(),
    )
}

async fn missing(State(hits): State<Arc<AtomicUsize>>) -> StatusCode {
    hits.fetch_add(1, Ordering::SeqCst);
    StatusCode::NOT_FOUND
}

/// reqwest client that ignores proxy environment variables.
pub fn direct_http() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}
