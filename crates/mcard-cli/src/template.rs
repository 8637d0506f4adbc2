//! # Template Subcommand
//!
//! `mcard template show` prints the built-in template as YAML, a starting
//! point for an override file. `mcard template validate <path>` checks an
//! override file and renders a sample certificate with it.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Args, Subcommand};
use mcard_core::{CredentialId, CredentialRecord, NewCredential, Phone};
use mcard_render::{CertificateRenderer, CertificateTemplate};

/// Template subcommand arguments.
#[derive(Args, Debug)]
pub struct TemplateArgs {
    #[command(subcommand)]
    pub command: TemplateCommand,
}

/// Available template subcommands.
#[derive(Subcommand, Debug)]
pub enum TemplateCommand {
    /// Print the built-in template as YAML.
    Show,
    /// Validate a YAML template and render a sample with it.
    Validate {
        /// Path to the template file.
        path: PathBuf,
    },
}

/// Execute the template subcommand.
pub fn run_template(args: &TemplateArgs) -> Result<u8> {
    match &args.command {
        TemplateCommand::Show => {
            print!("{}", default_template_yaml()?);
            Ok(0)
        }
        TemplateCommand::Validate { path } => {
            let bytes = validate_template(path)?;
            println!("{}: OK (sample certificate {bytes} bytes)", path.display());
            Ok(0)
        }
    }
}

/// The built-in template serialized as YAML.
pub fn default_template_yaml() -> Result<String> {
    serde_yaml::to_string(&CertificateTemplate::default())
        .context("failed to serialize built-in template")
}

/// Load the template at `path` and render a sample record. Returns the sample size.
pub fn validate_template(path: &Path) -> Result<usize> {
    let template = CertificateTemplate::from_path(path)?;
    let renderer = CertificateRenderer::new(template)
        .with_context(|| format!("template {} fonts do not load", path.display()))?;
    let bytes = renderer
        .render(&sample_record()?, None)
        .with_context(|| format!("template {} does not render", path.display()))?;
    Ok(bytes.len())
}

fn sample_record() -> Result<CredentialRecord> {
    let new = NewCredential::new(
        "Sample Member",
        "0000-0000-0000",
        Phone::new("9000000000")?,
        "1 Sample Street",
    )?;
    Ok(CredentialRecord::pending(CredentialId::new(), new, Utc::now()))
}
