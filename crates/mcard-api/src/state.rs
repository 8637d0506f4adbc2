//! # Application State
//!
//! Shared state for the Axum application, passed to all route handlers
//! via the `State` extractor.
//!
//! The registry is optional: when the document store could not be
//! initialized at startup the service still answers health checks, and
//! every credential route returns 503.

use std::sync::Arc;

use mcard_registry::{MemoryBlobStore, MemoryCredentialStore, Registry};

use crate::config::AppConfig;
use crate::error::AppError;

/// Application state shared across all request handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The issuance workflow, if its stores are available.
    pub registry: Option<Registry>,
    /// Runtime configuration.
    pub config: Arc<AppConfig>,
}

impl AppState {
    /// State backed entirely by in-memory stores, with default configuration.
    pub fn new() -> Self {
        let config = AppConfig::default();
        let registry = Registry::new(
            Arc::new(MemoryCredentialStore::new()),
            Arc::new(MemoryBlobStore::new()),
        )
        .with_media_base_url(config.media_base_url());
        Self::with_config(config, Some(registry))
    }

    /// State with explicit configuration and registry.
    pub fn with_config(config: AppConfig, registry: Option<Registry>) -> Self {
        Self {
            registry,
            config: Arc::new(config),
        }
    }

    /// The registry, or 503 if it is not configured.
    pub fn registry(&self) -> Result<&Registry, AppError> {
        self.registry
            .as_ref()
            .ok_or_else(|| AppError::service_unavailable("credential store is not connected"))
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
