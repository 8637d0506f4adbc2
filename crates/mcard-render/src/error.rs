//! Render error types.

use thiserror::Error;

/// Errors from certificate rendering.
#[derive(Error, Debug)]
pub enum RenderError {
    /// The layout template could not be loaded or parsed.
    #[error("certificate template error: {0}")]
    Template(String),

    /// A field the layout requires is empty.
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// The PDF document could not be serialized.
    #[error("PDF serialization failed: {0}")]
    Pdf(String),

    /// A font program could not be loaded, parsed or subset.
    #[error("font error: {0}")]
    Font(String),

    /// The member photo could not be decoded.
    #[error("photo could not be embedded: {0}")]
    Photo(String),
}
