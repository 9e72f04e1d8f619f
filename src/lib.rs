//! Home energy service library.
//!
//! Accepts meter readings (logged only) and CSV uploads (forwarded to an
//! object-storage bucket) over a small JSON HTTP API.  The binary in
//! `main.rs` wires configuration, logging and the storage backend; the
//! router itself is built by [`server::app`].

use std::sync::Arc;

pub mod config;
pub mod errors;
pub mod filename;
pub mod handlers;
pub mod metrics;
pub mod server;
pub mod storage;

use crate::config::Config;
use crate::storage::backend::ObjectStore;

/// Shared application state passed to all handlers via `axum::extract::State`.
pub struct AppState {
    /// Service configuration.
    pub config: Config,
    /// Destination for uploaded files.
    pub storage: Arc<dyn ObjectStore>,
}
