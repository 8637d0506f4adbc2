//! # Certificate Template
//!
//! The fixed layout parameters of the certificate. A built-in default
//! matches the membership card issued by the campaign office; operators
//! can override any subset of fields from a YAML file:
//!
//! ```yaml
//! organization: "NEHRU MLA"
//! title: "MEMBERSHIP CARD"
//! accent: { r: 214, g: 40, b: 40 }
//! fonts:
//!   regular: ["/opt/fonts/NotoSansTamil-Regular.ttf"]
//!   bold: ["/opt/fonts/NotoSansTamil-Bold.ttf"]
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::RenderError;
use crate::font::FontConfig;

/// An sRGB color with 8-bit channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    /// Construct a color from channel values.
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// Page dimensions in PDF points (1/72 inch).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSize {
    pub width: i64,
    pub height: i64,
}

impl PageSize {
    /// ISO A4 portrait.
    pub const A4: PageSize = PageSize {
        width: 595,
        height: 842,
    };
}

/// Layout parameters for the membership certificate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CertificateTemplate {
    /// Issuing organization, printed in the header band.
    pub organization: String,
    /// Certificate title.
    pub title: String,
    /// Secondary title line.
    pub subtitle: String,
    /// Closing line printed at the bottom of the page.
    pub footer: String,
    /// Prefix of the generated filename (`<prefix><sanitized name>.pdf`).
    pub file_prefix: String,
    /// Page dimensions.
    pub page: PageSize,
    /// Header band and border color.
    pub accent: Rgb,
    /// Body text color.
    pub ink: Rgb,
    /// Font programs to try before the bundled faces.
    pub fonts: FontConfig,
}

impl Default for CertificateTemplate {
    fn default() -> Self {
        Self {
            organization: "NEHRU MLA".to_string(),
            title: "MEMBERSHIP CARD".to_string(),
            subtitle: "Urupinar Attai".to_string(),
            footer: "Thank you for joining the movement.".to_string(),
            file_prefix: mcard_core::naming::CERTIFICATE_FILE_PREFIX.to_string(),
            page: PageSize::A4,
            accent: Rgb::new(0, 51, 160),
            ink: Rgb::new(0, 40, 85),
            fonts: FontConfig::default(),
        }
    }
}

impl CertificateTemplate {
    /// Parse a template from YAML. Missing fields take default values.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, RenderError> {
        let template: Self =
            serde_yaml::from_str(yaml).map_err(|e| RenderError::Template(e.to_string()))?;
        template.validate()?;
        Ok(template)
    }

    /// Load a template from a YAML file.
    pub fn from_path(path: &Path) -> Result<Self, RenderError> {
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| RenderError::Template(format!("{}: {e}", path.display())))?;
        Self::from_yaml_str(&yaml)
    }

    /// Check the template can produce a usable page.
    pub fn validate(&self) -> Result<(), RenderError> {
        if self.title.trim().is_empty() {
            return Err(RenderError::Template("title must not be empty".into()));
        }
        if self.page.width < 200 || self.page.height < 300 {
            return Err(RenderError::Template(format!(
                "page {}x{} is too small (minimum 200x300 points)",
                self.page.width, self.page.height
            )));
        }
        if self.file_prefix.chars().any(|c| !(c.is_ascii_alphanumeric() || c == '_' || c == '-')) {
            return Err(RenderError::Template(
                "file_prefix may only contain [A-Za-z0-9_-]".into(),
            ));
        }
        Ok(())
    }

    /// Certificate filename for a display name.
    pub fn filename_for(&self, name: &str) -> String {
        mcard_core::naming::certificate_filename_with_prefix(&self.file_prefix, name)
    }
}
