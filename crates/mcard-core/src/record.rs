//! # Credential Records
//!
//! [`NewCredential`] is validated registration input. [`CredentialRecord`]
//! is what the document store persists and returns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::identity::{CredentialId, Phone};
use crate::status::CredentialStatus;

/// Maximum display name length, in characters.
pub const MAX_NAME_LEN: usize = 200;
/// Maximum national ID length, in characters.
pub const MAX_NATIONAL_ID_LEN: usize = 64;
/// Maximum address length, in characters.
pub const MAX_ADDRESS_LEN: usize = 500;

/// Validated registration input, before the store assigns an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCredential {
    /// Display name.
    pub name: String,
    /// National identity number, opaque to this service.
    pub national_id: String,
    /// Unique contact number.
    pub phone: Phone,
    /// Postal address.
    pub address: String,
    /// Blob key of the uploaded photo, once stored.
    pub photo_ref: Option<String>,
}

impl NewCredential {
    /// Build registration input, trimming text fields and enforcing length limits.
    pub fn new(
        name: impl AsRef<str>,
        national_id: impl AsRef<str>,
        phone: Phone,
        address: impl AsRef<str>,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            name: bounded("name", name.as_ref(), MAX_NAME_LEN)?,
            national_id: bounded("national_id", national_id.as_ref(), MAX_NATIONAL_ID_LEN)?,
            phone,
            address: bounded("address", address.as_ref(), MAX_ADDRESS_LEN)?,
            photo_ref: None,
        })
    }

    /// Attach a stored photo reference.
    pub fn with_photo_ref(mut self, photo_ref: impl Into<String>) -> Self {
        self.photo_ref = Some(photo_ref.into());
        self
    }
}

fn bounded(field: &'static str, value: &str, max: usize) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.chars().count() > max {
        return Err(ValidationError::TooLong { field, max });
    }
    Ok(trimmed.to_string())
}

/// A persisted credential record.
///
/// `certificate_ref` and `approved_at` are `Some` exactly when `status` is
/// [`CredentialStatus::Approved`]. Fields are public for reading; use
/// [`CredentialRecord::approve`] to change state so the invariant holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRecord {
    /// Store-assigned identifier.
    pub id: CredentialId,
    /// Display name.
    pub name: String,
    /// National identity number.
    pub national_id: String,
    /// Unique contact number.
    pub phone: Phone,
    /// Postal address.
    pub address: String,
    /// Blob key of the registrant photo, if one was uploaded.
    pub photo_ref: Option<String>,
    /// Lifecycle state.
    pub status: CredentialStatus,
    /// Blob key of the generated certificate, once approved.
    pub certificate_ref: Option<String>,
    /// When the registration was received.
    pub created_at: DateTime<Utc>,
    /// When the credential was last approved.
    pub approved_at: Option<DateTime<Utc>>,
}

impl CredentialRecord {
    /// Materialize a pending record from registration input.
    pub fn pending(id: CredentialId, new: NewCredential, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            name: new.name,
            national_id: new.national_id,
            phone: new.phone,
            address: new.address,
            photo_ref: new.photo_ref,
            status: CredentialStatus::Pending,
            certificate_ref: None,
            created_at,
            approved_at: None,
        }
    }

    /// Move to `Approved`, attaching the certificate reference.
    ///
    /// Re-approval replaces the reference and timestamp.
    pub fn approve(&mut self, certificate_ref: impl Into<String>, at: DateTime<Utc>) {
        self.status = CredentialStatus::Approved;
        self.certificate_ref = Some(certificate_ref.into());
        self.approved_at = Some(at);
    }

    /// Whether the record satisfies the status/certificate invariant.
    pub fn is_consistent(&self) -> bool {
        match self.status {
            CredentialStatus::Pending => self.certificate_ref.is_none() && self.approved_at.is_none(),
            CredentialStatus::Approved => self.certificate_ref.is_some() && self.approved_at.is_some(),
        }
    }
}
