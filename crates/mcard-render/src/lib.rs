//! # mcard-render — Certificate Rendering
//!
//! Turns a [`CredentialRecord`](mcard_core::CredentialRecord) into a
//! single-page A4 PDF membership certificate.
//!
//! ## Determinism
//!
//! The output is a pure function of the template, the font set, the photo
//! and the record snapshot: no creation timestamps, no document IDs, and
//! subset tags derived from the glyphs used. Rendering the same record
//! twice yields byte-identical PDFs, which is what lets a download
//! re-render instead of serving a cached artifact.
//!
//! ## Fonts
//!
//! Text is shaped with `rustybuzz` and drawn with subset TrueType programs
//! embedded as Type0 fonts, so Tamil, Devanagari and other scripts print
//! when a face in the [`FontSet`] covers them. A `ToUnicode` CMap and an
//! `/ActualText` span per text call keep the text layer searchable even
//! where a glyph falls back to `.notdef`.
//!
//! ## Photos
//!
//! [`Photo`] embeds JPEG uploads unchanged and re-encodes PNGs, so the
//! image sits in the frame as a `DCTDecode` XObject.

pub mod certificate;
pub mod error;
pub mod font;
mod pdf;
pub mod photo;
mod shaping;
pub mod template;

pub use certificate::CertificateRenderer;
pub use error::RenderError;
pub use font::{FontConfig, FontProgram, FontSet};
pub use photo::Photo;
pub use template::{CertificateTemplate, PageSize, Rgb};
