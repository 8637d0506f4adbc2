//! # mcard-registry — Credential Issuance Workflow
//!
//! The [`Registry`] owns the credential lifecycle: registration with phone
//! uniqueness, administrative approval (render, store, link), gated
//! certificate retrieval, and deletion. It depends only on two adapter
//! contracts, injected at construction:
//!
//! - [`CredentialStore`] persists [`CredentialRecord`](mcard_core::CredentialRecord)s
//!   and enforces phone uniqueness atomically on insert.
//! - [`BlobStore`] persists uploaded photos and generated certificates
//!   under stable keys.
//!
//! In-memory implementations of both ship here for tests and single-node
//! deployments; [`FsBlobStore`] keeps blobs under a media directory. A
//! Postgres-backed document store lives in `mcard-api`.
//!
//! ## Blob Layout
//!
//! ```text
//! licenses/photos/<sanitized upload name>      registrant photos
//! licenses/generated/<PREFIX><sanitized>.pdf   approved certificates
//! ```
//!
//! Colliding keys on first write get a numeric suffix (`_1`, `_2`, ...).

pub mod blob;
pub mod error;
pub mod registry;
pub mod store;

pub use blob::{BlobStore, FsBlobStore, MemoryBlobStore};
pub use error::{BlobError, RegistryError, StoreError};
pub use registry::{
    Approval, Certificate, PhotoUpload, Registration, Registry, GENERATED_PREFIX, PHOTO_PREFIX,
};
pub use store::{CredentialStore, MemoryCredentialStore};
