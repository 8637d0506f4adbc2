//! # Render Subcommand
//!
//! Renders a certificate from a credential record serialized as JSON (the
//! shape the API stores and the registry returns). The output is the same
//! PDF the service would serve for that record.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use mcard_core::CredentialRecord;
use mcard_render::{CertificateRenderer, Photo};

use crate::load_template;

/// Arguments for `mcard render`.
#[derive(Args, Debug)]
pub struct RenderArgs {
    /// Path to a credential record JSON file.
    pub record: PathBuf,

    /// Output file. Defaults to the certificate filename in the current directory.
    #[arg(long, short)]
    pub out: Option<PathBuf>,

    /// Member photo (JPEG or PNG) placed in the photo frame.
    #[arg(long)]
    pub photo: Option<PathBuf>,

    /// YAML certificate template. Defaults to the built-in layout.
    #[arg(long)]
    pub template: Option<PathBuf>,
}

/// Execute the render subcommand.
pub fn run_render(args: &RenderArgs) -> Result<u8> {
    let out = render_to_file(
        &args.record,
        args.out.as_deref(),
        args.photo.as_deref(),
        args.template.as_deref(),
    )?;
    println!("{}", out.display());
    Ok(0)
}

/// Render the record at `record_path` and write the PDF. Returns the path written.
pub fn render_to_file(
    record_path: &Path,
    out: Option<&Path>,
    photo: Option<&Path>,
    template: Option<&Path>,
) -> Result<PathBuf> {
    let json = std::fs::read_to_string(record_path)
        .with_context(|| format!("failed to read record: {}", record_path.display()))?;
    let record: CredentialRecord = serde_json::from_str(&json)
        .with_context(|| format!("invalid record JSON: {}", record_path.display()))?;
    if !record.is_consistent() {
        anyhow::bail!("record {} has a status and certificate reference that disagree", record.id);
    }

    let photo = photo
        .map(|path| -> Result<Photo> {
            let bytes = std::fs::read(path)
                .with_context(|| format!("failed to read photo: {}", path.display()))?;
            Photo::from_bytes(&bytes)
                .with_context(|| format!("unusable photo: {}", path.display()))
        })
        .transpose()?;

    let renderer = CertificateRenderer::new(load_template(template)?)?;
    let bytes = renderer.render(&record, photo.as_ref())?;

    let out = out
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(renderer.filename(&record)));
    std::fs::write(&out, &bytes)
        .with_context(|| format!("failed to write certificate: {}", out.display()))?;
    tracing::info!(path = %out.display(), bytes = bytes.len(), "certificate written");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use mcard_core::{CredentialId, NewCredential, Phone};

    fn write_record(dir: &Path, approve: bool) -> PathBuf {
        let new = NewCredential::new(
            "Asha Rao",
            "1234",
            Phone::new("9000000001").unwrap(),
            "12 MG Road",
        )
        .unwrap();
        let at = chrono::Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        let mut record = CredentialRecord::pending(CredentialId::new(), new, at);
        if approve {
            record.approve("licenses/generated/NEHRU_MLA_Asha_Rao.pdf", at);
        }
        let path = dir.join("record.json");
        std::fs::write(&path, serde_json::to_vec(&record).unwrap()).unwrap();
        path
    }

    fn write_photo(dir: &Path) -> PathBuf {
        let img = image::RgbImage::from_fn(16, 20, |x, y| image::Rgb([(x * 12) as u8, (y * 9) as u8, 40]));
        let path = dir.join("photo.png");
        img.save(&path).unwrap();
        path
    }

    #[test]
    fn renders_pdf_to_requested_path() {
        let dir = tempfile::tempdir().unwrap();
        let record = write_record(dir.path(), true);
        let out = dir.path().join("card.pdf");
        let written = render_to_file(&record, Some(&out), None, None).unwrap();
        assert_eq!(written, out);
        assert!(std::fs::read(&out).unwrap().starts_with(b"%PDF"));
    }

    #[test]
    fn rendering_twice_is_identical() {
        let dir = tempfile::tempdir().unwrap();
        let record = write_record(dir.path(), true);
        let a = dir.path().join("a.pdf");
        let b = dir.path().join("b.pdf");
        let photo = write_photo(dir.path());
        render_to_file(&record, Some(&a), Some(&photo), None).unwrap();
        render_to_file(&record, Some(&b), Some(&photo), None).unwrap();
        assert_eq!(std::fs::read(a).unwrap(), std::fs::read(b).unwrap());
    }

    #[test]
    fn photo_changes_the_output() {
        let dir = tempfile::tempdir().unwrap();
        let record = write_record(dir.path(), true);
        let with = dir.path().join("with.pdf");
        let without = dir.path().join("without.pdf");
        let photo = write_photo(dir.path());
        render_to_file(&record, Some(&with), Some(&photo), None).unwrap();
        render_to_file(&record, Some(&without), None, None).unwrap();
        assert_ne!(std::fs::read(with).unwrap(), std::fs::read(without).unwrap());
    }

    #[test]
    fn unreadable_photo_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let record = write_record(dir.path(), true);
        let photo = dir.path().join("photo.jpg");
        std::fs::write(&photo, "not an image").unwrap();
        let err = render_to_file(&record, None, Some(&photo), None).unwrap_err();
        assert!(format!("{err:#}").contains("unusable photo"));

        let missing = dir.path().join("missing.jpg");
        let err = render_to_file(&record, None, Some(&missing), None).unwrap_err();
        assert!(format!("{err:#}").contains("failed to read photo"));
    }

    #[test]
    fn invalid_json_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{").unwrap();
        let err = render_to_file(&path, None, None, None).unwrap_err();
        assert!(format!("{err:#}").contains("invalid record JSON"));
    }

    #[test]
    fn missing_template_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let record = write_record(dir.path(), false);
        let out = dir.path().join("card.pdf");
        assert!(render_to_file(
            &record,
            Some(&out),
            None,
            Some(Path::new("/nonexistent/template.yaml"))
        )
        .is_err());
        assert!(!out.exists());
    }
}
