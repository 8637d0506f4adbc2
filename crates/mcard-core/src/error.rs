//! # Error Hierarchy
//!
//! Structured error types for the credential domain, built with `thiserror`.
//! No `Box<dyn Error>`, no `.unwrap()` outside tests.

use thiserror::Error;

/// Validation errors for domain primitives and registration input.
///
/// Each error carries enough context for the caller to correct the request
/// without guessing which field was wrong.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The phone number was absent or blank.
    #[error("phone number is required")]
    MissingPhone,

    /// A credential identifier could not be parsed.
    #[error("invalid credential id: \"{0}\"")]
    InvalidCredentialId(String),

    /// The request carried a field this service does not accept.
    #[error("unknown field: \"{0}\"")]
    UnknownField(String),

    /// A field exceeded its maximum length.
    #[error("field \"{field}\" exceeds {max} characters")]
    TooLong {
        /// The offending field name.
        field: &'static str,
        /// The maximum permitted length in characters.
        max: usize,
    },
}
