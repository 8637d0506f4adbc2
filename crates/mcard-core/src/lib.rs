#![deny(missing_docs)]

//! # mcard-core — Foundational Types for Membership Card Issuance
//!
//! This crate defines the types every other crate in the workspace depends
//! on. It has no internal crate dependencies, only `serde`, `serde_json`,
//! `thiserror`, `chrono`, and `uuid` from the external ecosystem.
//!
//! ## Design Principles
//!
//! 1. **Newtype wrappers for domain primitives.** A [`CredentialId`] is not
//!    a bare `Uuid` and a [`Phone`] is not a bare `String`. A `Phone` cannot
//!    be constructed empty.
//!
//! 2. **One lifecycle enum.** [`CredentialStatus`] has exactly two states,
//!    `Pending` and `Approved`. Nothing moves back to `Pending`.
//!
//! 3. **Records are structs, not maps.** [`CredentialRecord`] is the single
//!    shape persisted by every store adapter. Its `certificate_ref` is set
//!    if and only if the status is `Approved`, and the only way to reach
//!    `Approved` is [`CredentialRecord::approve`].
//!
//! 4. **Filenames come from one function.** [`sanitize_name`] is the sole
//!    path from a user-supplied display name to anything that lands in a
//!    blob key or a `Content-Disposition` header.

pub mod error;
pub mod identity;
pub mod naming;
pub mod record;
pub mod status;

// Re-export primary types at crate root for ergonomic imports.
pub use error::ValidationError;
pub use identity::{CredentialId, Phone};
pub use naming::{certificate_filename, photo_filename, sanitize_name};
pub use record::{CredentialRecord, NewCredential};
pub use status::CredentialStatus;
