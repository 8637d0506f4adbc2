//! # Startup Wiring
//!
//! Turns an [`AppConfig`] into an [`AppState`]: loads the certificate
//! template and its fonts, builds the notification link builder, opens the blob store
//! under `MEDIA_ROOT`, and connects the selected document store.
//!
//! Template and link settings are operator errors and abort startup. A
//! document store that cannot be reached does not: the service starts
//! with no registry and credential routes answer 503 until restarted.

use std::sync::Arc;

use mcard_notify::{LinkError, NotificationLinkBuilder};
use mcard_registry::{CredentialStore, FsBlobStore, MemoryCredentialStore, Registry};
use mcard_render::{CertificateRenderer, CertificateTemplate, RenderError};

use crate::config::{AppConfig, StoreBackend};
use crate::db::credentials::PgCredentialStore;
use crate::state::AppState;

/// Errors that abort startup.
#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    #[error("certificate template: {0}")]
    Template(#[from] RenderError),
    #[error("notification link settings: {0}")]
    Notify(#[from] LinkError),
}

/// Build application state from configuration.
pub async fn bootstrap(config: AppConfig) -> Result<AppState, BootstrapError> {
    let renderer = load_renderer(&config)?;
    let links = NotificationLinkBuilder::new(&config.notify_base_url, &config.notify_country_code)?;

    let registry = match connect_store(&config).await {
        Some(store) => {
            let blobs = Arc::new(FsBlobStore::new(&config.media_root));
            tracing::info!(media_root = %config.media_root.display(), "blob store ready");
            Some(
                Registry::new(store, blobs)
                    .with_renderer(renderer)
                    .with_link_builder(links)
                    .with_media_base_url(config.media_base_url()),
            )
        }
        None => None,
    };

    Ok(AppState::with_config(config, registry))
}

fn load_renderer(config: &AppConfig) -> Result<CertificateRenderer, RenderError> {
    let template = match &config.certificate_template {
        Some(path) => {
            let template = CertificateTemplate::from_path(path)?;
            tracing::info!(path = %path.display(), "loaded certificate template");
            template
        }
        None => CertificateTemplate::default(),
    };
    CertificateRenderer::new(template)
}

async fn connect_store(config: &AppConfig) -> Option<Arc<dyn CredentialStore>> {
    match config.store_backend {
        StoreBackend::Memory => {
            tracing::warn!("using in-memory credential store; records will not survive restarts");
            Some(Arc::new(MemoryCredentialStore::new()))
        }
        StoreBackend::Postgres => {
            let url = config.database_url.as_deref().unwrap_or_default();
            match crate::db::init_pool(url).await {
                Ok(pool) => Some(Arc::new(PgCredentialStore::new(pool))),
                Err(e) => {
                    tracing::error!(error = %e, "credential store unavailable; credential routes will return 503");
                    None
                }
            }
        }
    }
}
