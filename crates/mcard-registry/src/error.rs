//! Error taxonomy for the registry and its adapters.
//!
//! Adapters report [`StoreError`] and [`BlobError`]; the registry maps them
//! to [`RegistryError`], which is the only error callers see. Adapter
//! detail is logged at the mapping point and not carried further.

use mcard_core::{CredentialId, ValidationError};
use mcard_render::RenderError;
use thiserror::Error;

/// Document store failures.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Another record already holds this phone number.
    #[error("phone {0} is already registered")]
    DuplicatePhone(String),

    /// No record with this id.
    #[error("credential {0} not found")]
    NotFound(CredentialId),

    /// A persisted row could not be decoded into a record.
    #[error("corrupt credential record: {0}")]
    Corrupt(String),

    /// The backing store could not be reached or failed the operation.
    #[error("document store unavailable: {0}")]
    Unavailable(String),
}

/// Blob store failures.
#[derive(Error, Debug)]
pub enum BlobError {
    /// No blob under this key.
    #[error("blob {0} not found")]
    NotFound(String),

    /// The key is empty, absolute, or escapes the store root.
    #[error("invalid blob key {0:?}")]
    InvalidKey(String),

    /// No free key could be found for a colliding name.
    #[error("no free blob key for {0}")]
    Exhausted(String),

    /// Filesystem or backend I/O failed.
    #[error("blob I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors returned by [`Registry`](crate::Registry) operations.
#[derive(Error, Debug)]
pub enum RegistryError {
    /// Input failed validation (for example, a missing phone number).
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// The phone number is already registered.
    #[error("phone number is already registered")]
    DuplicatePhone,

    /// No such record, or the record is not approved yet.
    #[error("credential not found")]
    NotFound,

    /// The certificate could not be generated.
    #[error("certificate generation failed: {0}")]
    Render(#[from] RenderError),

    /// The document or blob store is unreachable. Retryable.
    #[error("storage unavailable")]
    StorageUnavailable,
}

impl From<StoreError> for RegistryError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicatePhone(_) => Self::DuplicatePhone,
            StoreError::NotFound(_) => Self::NotFound,
            StoreError::Corrupt(_) | StoreError::Unavailable(_) => {
                tracing::error!(error = %err, "document store failure");
                Self::StorageUnavailable
            }
        }
    }
}

impl From<BlobError> for RegistryError {
    fn from(err: BlobError) -> Self {
        tracing::error!(error = %err, "blob store failure");
        Self::StorageUnavailable
    }
}
