//! # Identity Newtypes
//!
//! [`CredentialId`] is the store-assigned key of a credential record;
//! [`Phone`] is the natural key used for uniqueness checks, availability
//! queries, and certificate download.
//!
//! `CredentialId` is always valid by construction. `Phone` validates at
//! construction time: it is trimmed and must not be empty.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// Maximum accepted phone length, in characters, after trimming.
pub const MAX_PHONE_LEN: usize = 32;

// ---------------------------------------------------------------------------
// CredentialId
// ---------------------------------------------------------------------------

/// Opaque identifier of a credential record.
///
/// Serializes as the hyphenated UUID string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CredentialId(Uuid);

impl CredentialId {
    /// Create a new random credential identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a credential identifier from an existing UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Access the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Short human-facing membership number derived from the id.
    ///
    /// The first eight hex digits, uppercased. Used on the printed card.
    pub fn membership_number(&self) -> String {
        let simple = self.0.simple().to_string();
        simple[..8].to_ascii_uppercase()
    }
}

impl Default for CredentialId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CredentialId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CredentialId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|_| ValidationError::InvalidCredentialId(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Phone
// ---------------------------------------------------------------------------

/// A registrant's phone number, as entered.
///
/// The stored form is the trimmed input; no normalization beyond that is
/// applied, so `"9000000001"` and `"+91 9000000001"` are distinct keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Phone(String);

impl Phone {
    /// Create a validated phone number.
    ///
    /// Returns [`ValidationError::MissingPhone`] if the trimmed input is
    /// empty, or [`ValidationError::TooLong`] past [`MAX_PHONE_LEN`].
    pub fn new(s: impl AsRef<str>) -> Result<Self, ValidationError> {
        let trimmed = s.as_ref().trim();
        if trimmed.is_empty() {
            return Err(ValidationError::MissingPhone);
        }
        if trimmed.chars().count() > MAX_PHONE_LEN {
            return Err(ValidationError::TooLong {
                field: "phone",
                max: MAX_PHONE_LEN,
            });
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Return the phone number as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Only the ASCII digits of the number.
    pub fn digits(&self) -> String {
        self.0.chars().filter(char::is_ascii_digit).collect()
    }

    /// Whether the number was entered in international form (`+` prefix).
    pub fn is_international(&self) -> bool {
        self.0.starts_with('+')
    }
}

impl TryFrom<String> for Phone {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Phone> for String {
    fn from(value: Phone) -> Self {
        value.0
    }
}

impl std::fmt::Display for Phone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<&str> for Phone {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}
