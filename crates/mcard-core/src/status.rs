//! # Credential Lifecycle
//!
//! A credential is created `Pending` and moves to `Approved` exactly once.
//! Re-approving an approved credential is accepted and leaves the state
//! unchanged. Nothing moves back to `Pending`.
//!
//! ```text
//! PENDING ──approve──▶ APPROVED ──approve──▶ APPROVED
//! ```

use serde::{Deserialize, Serialize};

/// The lifecycle state of a credential record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CredentialStatus {
    /// Registration received, awaiting administrative approval.
    #[default]
    Pending,
    /// Approved; a certificate has been generated.
    Approved,
}

impl CredentialStatus {
    /// Return the string representation of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
        }
    }

    /// Parse the persisted string form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(Self::Pending),
            "APPROVED" => Some(Self::Approved),
            _ => None,
        }
    }

    /// Whether the credential has been approved.
    pub fn is_approved(&self) -> bool {
        matches!(self, Self::Approved)
    }
}

impl std::fmt::Display for CredentialStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
