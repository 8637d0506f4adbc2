//! # Fonts
//!
//! Certificates embed TrueType programs so names print in the script they
//! were registered in. A [`FontSet`] holds one fallback chain per weight;
//! each character is drawn with the first program in the chain that has a
//! glyph for it.
//!
//! Chain order:
//!
//! 1. programs listed in the template (`fonts.regular`, `fonts.bold`),
//! 2. the bundled DejaVu Sans faces (Latin, Greek, Cyrillic and symbols),
//! 3. Indic faces found at well-known system paths, when
//!    `fonts.system_fallback` is on.
//!
//! Only outlines in a `glyf` table are accepted; CFF-flavoured OpenType
//! files are rejected at load time.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rustybuzz::ttf_parser;
use serde::{Deserialize, Serialize};

use crate::error::RenderError;

static DEJAVU_SANS: &[u8] = include_bytes!("../fonts/DejaVuSans.ttf");
static DEJAVU_SANS_BOLD: &[u8] = include_bytes!("../fonts/DejaVuSans-Bold.ttf");

/// Regular/bold pairs looked up when system fallback is enabled. A missing bold
/// face falls back to the regular one.
const SYSTEM_FALLBACKS: &[(&str, &str)] = &[
    (
        "/usr/share/fonts/truetype/noto/NotoSansTamil-Regular.ttf",
        "/usr/share/fonts/truetype/noto/NotoSansTamil-Bold.ttf",
    ),
    (
        "/usr/share/fonts/truetype/noto/NotoSansDevanagari-Regular.ttf",
        "/usr/share/fonts/truetype/noto/NotoSansDevanagari-Bold.ttf",
    ),
    (
        "/usr/share/fonts/noto/NotoSansTamil-Regular.ttf",
        "/usr/share/fonts/noto/NotoSansTamil-Bold.ttf",
    ),
    (
        "/usr/share/fonts/noto/NotoSansDevanagari-Regular.ttf",
        "/usr/share/fonts/noto/NotoSansDevanagari-Bold.ttf",
    ),
    (
        "/usr/share/fonts/google-noto/NotoSansTamil-Regular.ttf",
        "/usr/share/fonts/google-noto/NotoSansTamil-Bold.ttf",
    ),
    (
        "/usr/share/fonts/truetype/lohit-tamil/Lohit-Tamil.ttf",
        "/usr/share/fonts/truetype/lohit-tamil/Lohit-Tamil.ttf",
    ),
    (
        "/usr/share/fonts/truetype/lohit-devanagari/Lohit-Devanagari.ttf",
        "/usr/share/fonts/truetype/lohit-devanagari/Lohit-Devanagari.ttf",
    ),
];

#[derive(Clone)]
enum FontBytes {
    Static(&'static [u8]),
    Shared(Arc<[u8]>),
}

/// A validated TrueType font program.
#[derive(Clone)]
pub struct FontProgram {
    label: String,
    bytes: FontBytes,
}

impl fmt::Debug for FontProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FontProgram")
            .field("label", &self.label)
            .field("len", &self.data().len())
            .finish()
    }
}

impl FontProgram {
    /// Bundled DejaVu Sans.
    pub fn builtin_regular() -> Self {
        Self {
            label: "DejaVuSans".to_string(),
            bytes: FontBytes::Static(DEJAVU_SANS),
        }
    }

    /// Bundled DejaVu Sans Bold.
    pub fn builtin_bold() -> Self {
        Self {
            label: "DejaVuSans-Bold".to_string(),
            bytes: FontBytes::Static(DEJAVU_SANS_BOLD),
        }
    }

    /// Validate and wrap an in-memory font file.
    pub fn from_bytes(label: impl Into<String>, data: Vec<u8>) -> Result<Self, RenderError> {
        let label = label.into();
        check_truetype(&label, &data)?;
        Ok(Self {
            label,
            bytes: FontBytes::Shared(data.into()),
        })
    }

    /// Load a font file from disk.
    pub fn from_path(path: &Path) -> Result<Self, RenderError> {
        let data = std::fs::read(path)
            .map_err(|e| RenderError::Font(format!("{}: {e}", path.display())))?;
        Self::from_bytes(path.display().to_string(), data)
    }

    /// Where the program came from (file path or bundled face name).
    pub fn label(&self) -> &str {
        &self.label
    }

    pub(crate) fn data(&self) -> &[u8] {
        match &self.bytes {
            FontBytes::Static(data) => data,
            FontBytes::Shared(data) => data,
        }
    }

    pub(crate) fn face(&self) -> Result<rustybuzz::Face<'_>, RenderError> {
        rustybuzz::Face::from_slice(self.data(), 0)
            .ok_or_else(|| RenderError::Font(format!("{}: unreadable font", self.label)))
    }

    /// PostScript name from the `name` table, or the label.
    pub(crate) fn postscript_name(&self, face: &ttf_parser::Face<'_>) -> String {
        let raw = face
            .names()
            .into_iter()
            .find(|n| n.name_id == ttf_parser::name_id::POST_SCRIPT_NAME)
            .and_then(|n| n.to_string())
            .unwrap_or_else(|| self.label.clone());
        let clean: String = raw
            .chars()
            .filter(|c| c.is_ascii_graphic() && !"[](){}<>/%#".contains(*c))
            .collect();
        if clean.is_empty() {
            "Embedded".to_string()
        } else {
            clean
        }
    }
}

fn check_truetype(label: &str, data: &[u8]) -> Result<(), RenderError> {
    let face = ttf_parser::Face::parse(data, 0)
        .map_err(|e| RenderError::Font(format!("{label}: {e}")))?;
    if face.tables().glyf.is_none() {
        return Err(RenderError::Font(format!(
            "{label}: no glyf table (only TrueType outlines can be embedded)"
        )));
    }
    if face.units_per_em() == 0 {
        return Err(RenderError::Font(format!("{label}: zero units per em")));
    }
    Ok(())
}

/// Font selection from the certificate template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FontConfig {
    /// TrueType files tried first for regular text.
    pub regular: Vec<PathBuf>,
    /// TrueType files tried first for bold text.
    pub bold: Vec<PathBuf>,
    /// Append Indic faces from well-known system locations.
    pub system_fallback: bool,
}

impl Default for FontConfig {
    fn default() -> Self {
        Self {
            regular: Vec::new(),
            bold: Vec::new(),
            system_fallback: true,
        }
    }
}

/// Selects a fallback chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Weight {
    Regular,
    Bold,
}

/// Fallback chains for regular and bold text.
#[derive(Debug, Clone)]
pub struct FontSet {
    regular: Vec<FontProgram>,
    bold: Vec<FontProgram>,
}

impl Default for FontSet {
    fn default() -> Self {
        Self::builtin()
    }
}

impl FontSet {
    /// The bundled faces only. Output does not depend on the host.
    pub fn builtin() -> Self {
        Self {
            regular: vec![FontProgram::builtin_regular()],
            bold: vec![FontProgram::builtin_bold()],
        }
    }

    /// Build the chains a template asks for. Configured files must load;
    /// unusable system files are skipped.
    pub fn from_config(config: &FontConfig) -> Result<Self, RenderError> {
        let mut set = Self {
            regular: load_all(&config.regular)?,
            bold: load_all(&config.bold)?,
        };
        set.regular.push(FontProgram::builtin_regular());
        set.bold.push(FontProgram::builtin_bold());
        if config.system_fallback {
            for (regular, bold) in SYSTEM_FALLBACKS {
                let Some(regular) = load_system(Path::new(regular)) else {
                    continue;
                };
                let bold = load_system(Path::new(bold)).unwrap_or_else(|| regular.clone());
                set.regular.push(regular);
                set.bold.push(bold);
            }
        }
        Ok(set)
    }

    /// Put `program` at the front of both chains.
    pub fn prefer(mut self, program: FontProgram) -> Self {
        self.regular.insert(0, program.clone());
        self.bold.insert(0, program);
        self
    }

    /// Labels of the regular chain, in lookup order.
    pub fn regular_labels(&self) -> Vec<&str> {
        self.regular.iter().map(FontProgram::label).collect()
    }

    pub(crate) fn chain(&self, weight: Weight) -> &[FontProgram] {
        match weight {
            Weight::Regular => &self.regular,
            Weight::Bold => &self.bold,
        }
    }
}

fn load_all(paths: &[PathBuf]) -> Result<Vec<FontProgram>, RenderError> {
    paths.iter().map(|p| FontProgram::from_path(p)).collect()
}

fn load_system(path: &Path) -> Option<FontProgram> {
    if !path.is_file() {
        return None;
    }
    match FontProgram::from_path(path) {
        Ok(program) => {
            tracing::debug!(font = %path.display(), "using system fallback font");
            Some(program)
        }
        Err(err) => {
            tracing::warn!(error = %err, "skipping system font");
            None
        }
    }
}
