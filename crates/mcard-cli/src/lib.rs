//! # mcard-cli — Operator CLI
//!
//! Offline tooling around the issuance workflow. Nothing here talks to a
//! running service or a database.
//!
//! ## Subcommands
//!
//! - `mcard render`: render a certificate PDF from a record JSON file.
//! - `mcard link`: build the notification link for a member.
//! - `mcard template`: print the built-in template or validate a YAML one.
//!
//! ```bash
//! mcard render record.json --photo photo.jpg
//! mcard link --name "Asha Rao" --phone 9000000001 --url https://example.org/c.pdf
//! mcard template validate certificate.yaml
//! ```

pub mod link;
pub mod render;
pub mod template;

use std::path::Path;

use anyhow::Result;
use mcard_render::CertificateTemplate;

/// Load `path` as a template, or the built-in template when absent.
pub fn load_template(path: Option<&Path>) -> Result<CertificateTemplate> {
    Ok(match path {
        Some(p) => CertificateTemplate::from_path(p)?,
        None => CertificateTemplate::default(),
    })
}
