//! # Certificate Layout
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │ ██████████ ORGANIZATION ████████████████ │  header band (accent)
//! │              MEMBERSHIP CARD             │
//! │               subtitle line              │
//! │                                          │
//! │  Name            Asha Rao      ┌──────┐  │
//! │  Membership No.  6F9619FF      │photo │  │
//! │  National ID     ...           └──────┘  │
//! │  Phone           ...                     │
//! │  Address         wrapped lines           │
//! │                                          │
//! │  Status: APPROVED      Issued: 2026-...  │
//! │                 footer                   │
//! └──────────────────────────────────────────┘
//! ```

use mcard_core::CredentialRecord;

use crate::error::RenderError;
use crate::font::FontSet;
use crate::pdf::{wrap, Font, PageBuilder};
use crate::photo::Photo;
use crate::template::{CertificateTemplate, Rgb};

const MARGIN: i64 = 36;
const LABEL_X: i64 = 72;
const VALUE_X: i64 = 200;
const ROW_HEIGHT: i64 = 26;
const ADDRESS_WRAP: usize = 40;
const FRAME_W: i64 = 110;
const FRAME_H: i64 = 135;
const FRAME_PADDING: i64 = 4;

/// Renders membership certificates from credential records.
#[derive(Debug, Clone, Default)]
pub struct CertificateRenderer {
    template: CertificateTemplate,
    fonts: FontSet,
}

impl CertificateRenderer {
    /// Create a renderer for the given template, loading the fonts it names.
    pub fn new(template: CertificateTemplate) -> Result<Self, RenderError> {
        let fonts = FontSet::from_config(&template.fonts)?;
        Ok(Self { template, fonts })
    }

    /// Create a renderer with an explicit font set.
    pub fn with_fonts(template: CertificateTemplate, fonts: FontSet) -> Self {
        Self { template, fonts }
    }

    /// The layout template in use.
    pub fn template(&self) -> &CertificateTemplate {
        &self.template
    }

    pub fn fonts(&self) -> &FontSet {
        &self.fonts
    }

    /// Download filename for a record.
    pub fn filename(&self, record: &CredentialRecord) -> String {
        self.template.filename_for(&record.name)
    }

    /// Render the certificate for `record`.
    ///
    /// Without a photo the frame reads "not provided".
    pub fn render(
        &self,
        record: &CredentialRecord,
        photo: Option<&Photo>,
    ) -> Result<Vec<u8>, RenderError> {
        if record.name.trim().is_empty() {
            return Err(RenderError::MissingField("name"));
        }

        let t = &self.template;
        let mut page = PageBuilder::new(t.page, &self.fonts)?;
        let size = page.size();
        let top = size.height - MARGIN;

        // Border and header band.
        page.stroke_color(t.accent);
        page.line_width(3);
        page.stroke_rect(
            MARGIN / 2,
            MARGIN / 2,
            size.width - MARGIN,
            size.height - MARGIN,
        );
        page.fill_color(t.accent);
        page.fill_rect(MARGIN / 2, top - 60, size.width - MARGIN, 60 + MARGIN / 2);
        page.fill_color(Rgb::new(255, 255, 255));
        page.centered_text(Font::Bold, 24, top - 40, &t.organization)?;

        page.fill_color(t.ink);
        page.centered_text(Font::Bold, 28, top - 110, &t.title)?;
        if !t.subtitle.trim().is_empty() {
            page.centered_text(Font::Regular, 14, top - 132, &t.subtitle)?;
        }

        // Photo frame, right-hand side.
        let frame_x = size.width - MARGIN - 40 - FRAME_W;
        let frame_y = top - 190 - FRAME_H;
        page.stroke_color(t.ink);
        page.line_width(1);
        page.stroke_rect(frame_x, frame_y, FRAME_W, FRAME_H);
        match photo {
            Some(photo) => page.image_in_box(
                photo,
                frame_x + FRAME_PADDING,
                frame_y + FRAME_PADDING,
                FRAME_W - 2 * FRAME_PADDING,
                FRAME_H - 2 * FRAME_PADDING,
            ),
            None => {
                page.text(Font::Regular, 9, frame_x + 8, frame_y + FRAME_H - 16, "PHOTO")?;
                page.text(Font::Regular, 8, frame_x + 8, frame_y + 10, "not provided")?;
            }
        }

        // Member fields.
        let mut y = top - 200;
        let membership_number = record.id.membership_number();
        let rows: [(&str, &str); 4] = [
            ("Name", record.name.as_str()),
            ("Membership No.", membership_number.as_str()),
            ("National ID", record.national_id.as_str()),
            ("Phone", record.phone.as_str()),
        ];
        for (label, value) in rows {
            page.text(Font::Bold, 12, LABEL_X, y, label)?;
            page.text(Font::Regular, 12, VALUE_X, y, value)?;
            y -= ROW_HEIGHT;
        }

        page.text(Font::Bold, 12, LABEL_X, y, "Address")?;
        for line in &wrap(&record.address, ADDRESS_WRAP) {
            page.text(Font::Regular, 12, VALUE_X, y, line)?;
            y -= 16;
        }

        // Status line.
        let status_y = MARGIN + 90;
        page.text(
            Font::Bold,
            12,
            LABEL_X,
            status_y,
            &format!("Status: {}", record.status),
        )?;
        if let Some(at) = record.approved_at {
            let issued = format!("Issued: {}", at.format("%Y-%m-%d"));
            page.text(Font::Regular, 12, VALUE_X + 150, status_y, &issued)?;
        }

        page.fill_color(t.accent);
        page.centered_text(Font::Regular, 12, MARGIN + 40, &t.footer)?;

        if page.uncovered() > 0 {
            tracing::warn!(
                credential_id = %record.id,
                characters = page.uncovered(),
                "no configured font covers some certificate text; glyphs print as boxes"
            );
        }
        page.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::photo::fixtures;
    use chrono::{TimeZone, Utc};
    use mcard_core::{CredentialId, NewCredential, Phone};

    fn page_text(pdf: &[u8]) -> String {
        lopdf::Document::load_mem(pdf)
            .unwrap()
            .extract_text(&[1])
            .unwrap()
    }

    fn record_named(name: &str) -> CredentialRecord {
        let new = NewCredential::new(
            name,
            "1234-5678-9012",
            Phone::new("9000000001").unwrap(),
            "12 MG Road",
        )
        .unwrap();
        let created = Utc.with_ymd_and_hms(2026, 1, 5, 10, 0, 0).unwrap();
        CredentialRecord::pending(CredentialId::new(), new, created)
    }

    fn record() -> CredentialRecord {
        record_named("Asha Rao")
    }

    #[test]
    fn renders_a_pdf_with_member_fields() {
        let rec = record();
        let pdf = CertificateRenderer::default().render(&rec, None).unwrap();
        assert!(pdf.starts_with(b"%PDF-"));
        let text = page_text(&pdf);
        for expected in [
            "Asha Rao",
            "1234-5678-9012",
            "12 MG Road",
            "9000000001",
            "MEMBERSHIP CARD",
            "not provided",
        ] {
            assert!(text.lines().any(|l| l == expected), "{expected} missing from:\n{text}");
        }
    }

    #[test]
    fn non_latin_names_survive_extraction() {
        let renderer = CertificateRenderer::default();
        for name in ["ஆஷா ராவ்", "प्रिया शर्मा", "Ольга Петрова"] {
            let text = page_text(&renderer.render(&record_named(name), None).unwrap());
            assert!(text.lines().any(|l| l == name), "{name} missing from:\n{text}");
            assert!(!text.contains('?'), "{text}");
            assert!(!text.contains('\u{FFFD}'), "{text}");
        }
    }

    #[test]
    fn configured_font_is_embedded_first() {
        let fonts = FontSet::builtin().prefer(crate::font::FontProgram::builtin_bold());
        let renderer = CertificateRenderer::with_fonts(CertificateTemplate::default(), fonts);
        let pdf = renderer.render(&record(), None).unwrap();
        let doc = lopdf::Document::load_mem(&pdf).unwrap();
        let page_id = doc.page_iter().next().unwrap();
        let names: Vec<String> = doc
            .get_page_fonts(page_id)
            .unwrap()
            .values()
            .map(|f| f.get(b"BaseFont").unwrap().as_name_str().unwrap().to_string())
            .collect();
        // Everything on the page is Latin, so the preferred face draws all of it.
        assert_eq!(names.len(), 1, "{names:?}");
        assert!(names[0].ends_with("+DejaVuSans-Bold"));
    }

    #[test]
    fn rendering_is_byte_deterministic() {
        let rec = record_named("ஆஷா ராவ்");
        let photo = Photo::from_bytes(&fixtures::png(64, 80)).unwrap();
        let renderer = CertificateRenderer::default();
        let a = renderer.render(&rec, Some(&photo)).unwrap();
        let b = renderer.render(&rec, Some(&photo)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn changed_fields_change_output() {
        let mut rec = record();
        let renderer = CertificateRenderer::default();
        let before = renderer.render(&rec, None).unwrap();
        rec.address = "7 Anna Salai".into();
        let after = renderer.render(&rec, None).unwrap();
        assert_ne!(before, after);
        assert!(page_text(&after).contains("7 Anna Salai"));
    }

    #[test]
    fn approved_record_prints_issue_date() {
        let mut rec = record();
        rec.approve(
            "licenses/generated/x.pdf",
            Utc.with_ymd_and_hms(2026, 2, 1, 9, 30, 0).unwrap(),
        );
        let text = page_text(&CertificateRenderer::default().render(&rec, None).unwrap());
        assert!(text.contains("Status: APPROVED"));
        assert!(text.contains("Issued: 2026-02-01"));
    }

    #[test]
    fn photo_is_embedded_as_an_image() {
        let jpeg = fixtures::jpeg(90, 120);
        let photo = Photo::from_bytes(&jpeg).unwrap();
        let pdf = CertificateRenderer::default()
            .render(&record(), Some(&photo))
            .unwrap();
        let doc = lopdf::Document::load_mem(&pdf).unwrap();
        let page_id = doc.page_iter().next().unwrap();
        let images = doc.get_page_images(page_id).unwrap();
        assert_eq!(images.len(), 1);
        let image = &images[0];
        assert_eq!((image.width, image.height), (90, 120));
        assert_eq!(image.filters.as_deref(), Some(&["DCTDecode".to_string()][..]));
        assert_eq!(image.content, jpeg.as_slice());

        let text = page_text(&pdf);
        assert!(!text.contains("not provided"));
        assert!(!text.contains("http"));
    }

    #[test]
    fn png_photo_is_embedded_as_jpeg() {
        let photo = Photo::from_bytes(&fixtures::png(40, 40)).unwrap();
        let pdf = CertificateRenderer::default()
            .render(&record(), Some(&photo))
            .unwrap();
        let doc = lopdf::Document::load_mem(&pdf).unwrap();
        let page_id = doc.page_iter().next().unwrap();
        let images = doc.get_page_images(page_id).unwrap();
        assert_eq!(images[0].color_space.as_deref(), Some("DeviceRGB"));
        assert!(images[0].content.starts_with(&[0xFF, 0xD8]));
    }

    #[test]
    fn empty_name_is_missing_field() {
        let mut rec = record();
        rec.name = "  ".into();
        let err = CertificateRenderer::default().render(&rec, None).unwrap_err();
        assert!(matches!(err, RenderError::MissingField("name")));
    }

    #[test]
    fn filename_uses_template_prefix() {
        let mut template = CertificateTemplate::default();
        template.file_prefix = "CARD_".into();
        let renderer = CertificateRenderer::with_fonts(template, FontSet::builtin());
        assert_eq!(renderer.filename(&record()), "CARD_Asha_Rao.pdf");
    }

    #[test]
    fn new_rejects_unloadable_template_fonts() {
        let mut template = CertificateTemplate::default();
        template.fonts.regular = vec!["/nonexistent/Tamil.ttf".into()];
        let err = CertificateRenderer::new(template).unwrap_err();
        assert!(matches!(err, RenderError::Font(_)));
    }
}
