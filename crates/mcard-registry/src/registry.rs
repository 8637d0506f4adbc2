//! # Credential Registry
//!
//! Orchestrates the issuance workflow over the injected stores:
//!
//! ```text
//! register ──▶ uniqueness check ──▶ [photo save] ──▶ insert PENDING
//! approve  ──▶ render snapshot ──▶ save/put PDF ──▶ mark APPROVED ──▶ link
//! retrieve ──▶ lookup by phone ──▶ APPROVED? ──▶ re-render
//! ```
//!
//! Approval renders the record as it will look once approved, so the PDF
//! written at approval and the one produced by a later retrieve agree.
//!
//! The photo is read back from the blob store on every render. A record
//! whose photo blob has gone missing still renders, with an empty frame;
//! a photo that is present but cannot be decoded fails the render.

use std::sync::Arc;

use chrono::Utc;
use mcard_core::{
    photo_filename, CredentialId, CredentialRecord, CredentialStatus, NewCredential, Phone,
};
use mcard_notify::NotificationLinkBuilder;
use mcard_render::{CertificateRenderer, Photo};

use crate::blob::BlobStore;
use crate::error::{BlobError, RegistryError};
use crate::store::CredentialStore;

/// Blob key prefix for registrant photos.
pub const PHOTO_PREFIX: &str = "licenses/photos/";

/// Blob key prefix for generated certificates.
pub const GENERATED_PREFIX: &str = "licenses/generated/";

/// Public media location used when none is configured.
const DEFAULT_MEDIA_BASE_URL: &str = "http://localhost:8080/media/";

/// An uploaded photo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoUpload {
    /// Client-supplied filename; sanitized before use.
    pub filename: String,
    /// File contents.
    pub bytes: Vec<u8>,
}

/// Registration request, as received at the boundary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registration {
    pub name: String,
    pub national_id: String,
    pub phone: String,
    pub address: String,
    pub photo: Option<PhotoUpload>,
}

/// Result of a successful approval.
#[derive(Debug, Clone)]
pub struct Approval {
    /// The record after approval.
    pub record: CredentialRecord,
    /// Blob key of the certificate.
    pub certificate_ref: String,
    /// Public URL of the certificate.
    pub certificate_url: String,
    /// Messaging deep-link announcing the approval.
    pub notification_link: String,
}

/// A rendered certificate ready for download.
#[derive(Debug, Clone)]
pub struct Certificate {
    /// `Content-Disposition` filename.
    pub filename: String,
    /// PDF bytes.
    pub bytes: Vec<u8>,
}

/// The credential issuance service.
#[derive(Clone)]
pub struct Registry {
    store: Arc<dyn CredentialStore>,
    blobs: Arc<dyn BlobStore>,
    renderer: Arc<CertificateRenderer>,
    links: NotificationLinkBuilder,
    media_base_url: String,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("renderer", &self.renderer)
            .field("links", &self.links)
            .field("media_base_url", &self.media_base_url)
            .finish_non_exhaustive()
    }
}

impl Registry {
    /// Create a registry over the given stores with the default template,
    /// link builder, and media URL.
    pub fn new(store: Arc<dyn CredentialStore>, blobs: Arc<dyn BlobStore>) -> Self {
        Self {
            store,
            blobs,
            renderer: Arc::new(CertificateRenderer::default()),
            links: NotificationLinkBuilder::default(),
            media_base_url: DEFAULT_MEDIA_BASE_URL.to_string(),
        }
    }

    /// Use a specific certificate renderer.
    pub fn with_renderer(mut self, renderer: CertificateRenderer) -> Self {
        self.renderer = Arc::new(renderer);
        self
    }

    /// Use a specific notification link builder.
    pub fn with_link_builder(mut self, links: NotificationLinkBuilder) -> Self {
        self.links = links;
        self
    }

    /// Set the absolute URL under which blob keys are publicly served.
    pub fn with_media_base_url(mut self, url: impl Into<String>) -> Self {
        let mut url = url.into();
        if !url.ends_with('/') {
            url.push('/');
        }
        self.media_base_url = url;
        self
    }

    /// The renderer in use.
    pub fn renderer(&self) -> &CertificateRenderer {
        &self.renderer
    }

    /// Public URL of a blob key.
    pub fn public_url(&self, key: &str) -> String {
        format!("{}{}", self.media_base_url, key)
    }

    /// Register a new credential request in `Pending` state.
    pub async fn register(&self, input: Registration) -> Result<CredentialRecord, RegistryError> {
        let phone = Phone::new(&input.phone)?;
        let mut new = NewCredential::new(&input.name, &input.national_id, phone, &input.address)?;

        if self.store.find_by_phone(&new.phone).await?.is_some() {
            return Err(RegistryError::DuplicatePhone);
        }

        let mut saved_photo = None;
        if let Some(photo) = input.photo.filter(|p| !p.bytes.is_empty()) {
            let key = format!("{PHOTO_PREFIX}{}", photo_filename(&photo.filename));
            let stored = self.blobs.save(&key, photo.bytes).await?;
            new = new.with_photo_ref(stored.clone());
            saved_photo = Some(stored);
        }

        match self.store.insert(new).await {
            Ok(record) => {
                tracing::info!(credential_id = %record.id, "credential registered");
                Ok(record)
            }
            Err(err) => {
                if let Some(key) = saved_photo {
                    self.discard_blob(&key).await;
                }
                Err(err.into())
            }
        }
    }

    /// All records, in registration order.
    pub async fn list(&self) -> Result<Vec<CredentialRecord>, RegistryError> {
        Ok(self.store.list().await?)
    }

    /// A single record by id.
    pub async fn get(&self, id: CredentialId) -> Result<CredentialRecord, RegistryError> {
        self.store.get(id).await?.ok_or(RegistryError::NotFound)
    }

    /// Whether `phone` is free to register.
    pub async fn check_availability(&self, phone: &str) -> Result<bool, RegistryError> {
        let phone = Phone::new(phone)?;
        Ok(self.store.find_by_phone(&phone).await?.is_none())
    }

    /// Approve a credential, generating and storing its certificate.
    ///
    /// Approving an already approved record regenerates the certificate
    /// from current data and overwrites the blob it already references.
    /// On render or blob failure the record is left unchanged.
    pub async fn approve(&self, id: CredentialId) -> Result<Approval, RegistryError> {
        let record = self.store.get(id).await?.ok_or(RegistryError::NotFound)?;

        let existing = match (record.status, &record.certificate_ref) {
            (CredentialStatus::Approved, Some(key)) => Some(key.clone()),
            _ => None,
        };
        let target = existing.clone().unwrap_or_else(|| {
            format!("{GENERATED_PREFIX}{}", self.renderer.filename(&record))
        });

        let now = Utc::now();
        let mut snapshot = record.clone();
        snapshot.approve(target.as_str(), now);
        let bytes = self.render(&snapshot).await?;

        let certificate_ref = match existing {
            Some(key) => {
                self.blobs.put(&key, bytes).await?;
                key
            }
            None => self.blobs.save(&target, bytes).await?,
        };

        let updated = match self.store.mark_approved(id, &certificate_ref, now).await {
            Ok(updated) => updated,
            Err(err) => {
                if !record.status.is_approved() {
                    self.discard_blob(&certificate_ref).await;
                }
                return Err(err.into());
            }
        };

        let certificate_url = self.public_url(&certificate_ref);
        let notification_link = self.links.build(&updated, &certificate_url);
        tracing::info!(
            credential_id = %id,
            certificate_ref = %certificate_ref,
            reapproval = record.status.is_approved(),
            "credential approved"
        );

        Ok(Approval {
            record: updated,
            certificate_ref,
            certificate_url,
            notification_link,
        })
    }

    /// Render the certificate for the approved record registered under `phone`.
    ///
    /// Unknown and not-yet-approved phones both report `NotFound`.
    pub async fn retrieve(&self, phone: &str) -> Result<Certificate, RegistryError> {
        let phone = Phone::new(phone)?;
        let record = self
            .store
            .find_by_phone(&phone)
            .await?
            .filter(|r| r.status.is_approved())
            .ok_or(RegistryError::NotFound)?;

        let bytes = self.render(&record).await?;
        Ok(Certificate {
            filename: self.renderer.filename(&record),
            bytes,
        })
    }

    /// Delete a record. Its photo and certificate blobs are left in place.
    pub async fn delete(&self, id: CredentialId) -> Result<(), RegistryError> {
        if self.store.delete(id).await? {
            tracing::info!(credential_id = %id, "credential deleted");
            Ok(())
        } else {
            Err(RegistryError::NotFound)
        }
    }

    async fn render(&self, record: &CredentialRecord) -> Result<Vec<u8>, RegistryError> {
        let photo = self.load_photo(record).await?;
        self.renderer.render(record, photo.as_ref()).map_err(|err| {
            tracing::error!(credential_id = %record.id, error = %err, "certificate render failed");
            RegistryError::Render(err)
        })
    }

    async fn load_photo(&self, record: &CredentialRecord) -> Result<Option<Photo>, RegistryError> {
        let Some(key) = record.photo_ref.as_deref() else {
            return Ok(None);
        };
        let bytes = match self.blobs.get(key).await {
            Ok(bytes) => bytes,
            Err(BlobError::NotFound(_)) => {
                tracing::warn!(
                    credential_id = %record.id,
                    photo_ref = key,
                    "photo blob missing, rendering an empty frame"
                );
                return Ok(None);
            }
            Err(err) => return Err(err.into()),
        };
        Photo::from_bytes(&bytes).map(Some).map_err(|err| {
            tracing::error!(credential_id = %record.id, photo_ref = key, error = %err, "photo could not be decoded");
            RegistryError::Render(err)
        })
    }

    async fn discard_blob(&self, key: &str) {
        if let Err(err) = self.blobs.delete(key).await {
            tracing::warn!(blob = key, error = %err, "failed to remove orphaned blob");
        }
    }
}
