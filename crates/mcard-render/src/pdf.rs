//! Minimal single-page PDF builder over `lopdf`.
//!
//! Collects content-stream operations in drawing order and assembles a
//! document with a fixed object layout, so identical drawing calls always
//! produce identical bytes.
//!
//! Text is shaped with `rustybuzz` and shown through Type0 fonts
//! (`CIDFontType2`, `Identity-H`) whose programs are subset and embedded.
//! Every text call is wrapped in an `/ActualText` span and every font
//! carries a `ToUnicode` CMap.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, StringFormat, Stream};
use rustybuzz::ttf_parser;

use crate::error::RenderError;
use crate::font::{FontProgram, FontSet, Weight};
use crate::photo::Photo;
use crate::shaping::{font_runs, shape_run, utf16_be_with_bom, CidMap, PlacedGlyph, ShapedLine};
use crate::template::{PageSize, Rgb};

/// Which fallback chain a text call draws from.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Font {
    Regular,
    Bold,
}

impl Font {
    fn weight(self) -> Weight {
        match self {
            Self::Regular => Weight::Regular,
            Self::Bold => Weight::Bold,
        }
    }
}

const IMAGE_RESOURCE: &str = "Im1";

struct FontSlot<'f> {
    program: &'f FontProgram,
    face: rustybuzz::Face<'f>,
    resource: String,
    cids: CidMap,
}

pub(crate) struct PageBuilder<'f> {
    size: PageSize,
    ops: Vec<Operation>,
    slots: Vec<FontSlot<'f>>,
    regular: Vec<usize>,
    bold: Vec<usize>,
    image: Option<&'f Photo>,
    uncovered: usize,
}

impl<'f> PageBuilder<'f> {
    pub(crate) fn new(size: PageSize, fonts: &'f FontSet) -> Result<Self, RenderError> {
        let mut slots = Vec::new();
        let mut chains = [Vec::new(), Vec::new()];
        for (chain, weight) in chains.iter_mut().zip([Weight::Regular, Weight::Bold]) {
            for program in fonts.chain(weight) {
                chain.push(slots.len());
                slots.push(FontSlot {
                    program,
                    face: program.face()?,
                    resource: format!("F{}", slots.len() + 1),
                    cids: CidMap::default(),
                });
            }
        }
        let [regular, bold] = chains;
        Ok(Self {
            size,
            ops: Vec::new(),
            slots,
            regular,
            bold,
            image: None,
            uncovered: 0,
        })
    }

    pub(crate) fn size(&self) -> PageSize {
        self.size
    }

    pub(crate) fn fill_color(&mut self, color: Rgb) {
        self.ops.push(Operation::new("rg", channels(color)));
    }

    pub(crate) fn stroke_color(&mut self, color: Rgb) {
        self.ops.push(Operation::new("RG", channels(color)));
    }

    pub(crate) fn line_width(&mut self, width: i64) {
        self.ops
            .push(Operation::new("w", vec![Object::Integer(width)]));
    }

    pub(crate) fn fill_rect(&mut self, x: i64, y: i64, w: i64, h: i64) {
        self.ops.push(rect(x, y, w, h));
        self.ops.push(Operation::new("f", vec![]));
    }

    pub(crate) fn stroke_rect(&mut self, x: i64, y: i64, w: i64, h: i64) {
        self.ops.push(rect(x, y, w, h));
        self.ops.push(Operation::new("S", vec![]));
    }

    pub(crate) fn text(
        &mut self,
        font: Font,
        size: i64,
        x: i64,
        y: i64,
        text: &str,
    ) -> Result<(), RenderError> {
        let line = self.shape(font, size as f32, text)?;
        self.show(&line, size, x as f32, y as f32, text);
        Ok(())
    }

    /// Draw text horizontally centered on the page.
    pub(crate) fn centered_text(
        &mut self,
        font: Font,
        size: i64,
        y: i64,
        text: &str,
    ) -> Result<(), RenderError> {
        let line = self.shape(font, size as f32, text)?;
        let x = ((self.size.width as f32 - line.width) / 2.0).max(0.0);
        self.show(&line, size, x, y as f32, text);
        Ok(())
    }

    /// Draw `photo` scaled to fit inside the box, centered.
    pub(crate) fn image_in_box(&mut self, photo: &'f Photo, x: i64, y: i64, w: i64, h: i64) {
        let scale = (w as f32 / photo.width() as f32).min(h as f32 / photo.height() as f32);
        let draw_w = photo.width() as f32 * scale;
        let draw_h = photo.height() as f32 * scale;
        let left = x as f32 + (w as f32 - draw_w) / 2.0;
        let bottom = y as f32 + (h as f32 - draw_h) / 2.0;

        self.ops.push(Operation::new("q", vec![]));
        self.ops.push(Operation::new(
            "cm",
            vec![
                real(draw_w),
                Object::Integer(0),
                Object::Integer(0),
                real(draw_h),
                real(left),
                real(bottom),
            ],
        ));
        self.ops.push(Operation::new(
            "Do",
            vec![Object::Name(IMAGE_RESOURCE.as_bytes().to_vec())],
        ));
        self.ops.push(Operation::new("Q", vec![]));
        self.image = Some(photo);
    }

    /// Characters drawn so far that no font in their chain covers.
    pub(crate) fn uncovered(&self) -> usize {
        self.uncovered
    }

    fn shape(&mut self, font: Font, size: f32, text: &str) -> Result<ShapedLine, RenderError> {
        let chain = match font.weight() {
            Weight::Regular => self.regular.clone(),
            Weight::Bold => self.bold.clone(),
        };
        let slots = &mut self.slots;
        let covers = |i: usize, c: char| {
            chain
                .get(i)
                .and_then(|slot| slots[*slot].face.glyph_index(c))
                .is_some()
        };
        self.uncovered += text
            .chars()
            .filter(|c| !c.is_whitespace() && !(0..chain.len()).any(|i| covers(i, *c)))
            .count();
        let runs = font_runs(text, chain.len(), covers);

        let mut line = ShapedLine::default();
        for (index, range) in runs {
            let Some(&slot_id) = chain.get(index) else {
                continue;
            };
            let run = text.get(range).unwrap_or_default();
            let FontSlot { face, cids, .. } = &mut slots[slot_id];
            let (glyphs, width) =
                shape_run(face, slot_id, run, size, line.width, |gid, piece| {
                    cids.cid(gid, piece)
                })?;
            line.glyphs.extend(glyphs);
            line.width += width;
        }
        Ok(line)
    }

    fn show(&mut self, line: &ShapedLine, size: i64, x: f32, y: f32, text: &str) {
        if line.glyphs.is_empty() {
            return;
        }
        self.ops.push(Operation::new(
            "BDC",
            vec![
                Object::Name(b"Span".to_vec()),
                Object::Dictionary(dictionary! {
                    "ActualText" => Object::String(utf16_be_with_bom(text), StringFormat::Hexadecimal),
                }),
            ],
        ));
        self.ops.push(Operation::new("BT", vec![]));
        let mut current = None;
        for PlacedGlyph { slot, cid, x: gx, y: gy } in line.glyphs.iter().copied() {
            if current != Some(slot) {
                self.ops.push(Operation::new(
                    "Tf",
                    vec![
                        Object::Name(self.slots[slot].resource.as_bytes().to_vec()),
                        Object::Integer(size),
                    ],
                ));
                current = Some(slot);
            }
            self.ops.push(Operation::new(
                "Tm",
                vec![
                    Object::Integer(1),
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(1),
                    real(x + gx),
                    real(y + gy),
                ],
            ));
            self.ops.push(Operation::new(
                "Tj",
                vec![Object::String(cid.to_be_bytes().to_vec(), StringFormat::Hexadecimal)],
            ));
        }
        self.ops.push(Operation::new("ET", vec![]));
        self.ops.push(Operation::new("EMC", vec![]));
    }

    /// Serialize the page into a complete PDF document.
    pub(crate) fn finish(self) -> Result<Vec<u8>, RenderError> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let mut fonts = Dictionary::new();
        for slot in self.slots.iter().filter(|s| !s.cids.is_empty()) {
            let font_id = embed_font(&mut doc, slot)?;
            fonts.set(slot.resource.as_bytes().to_vec(), font_id);
        }
        let mut resources = dictionary! {
            "Font" => fonts,
        };
        if let Some(photo) = self.image {
            let image_id = doc.add_object(image_xobject(photo));
            resources.set(
                "XObject",
                dictionary! { IMAGE_RESOURCE => image_id },
            );
        }
        let resources_id = doc.add_object(resources);

        let content = Content { operations: self.ops };
        let encoded = content
            .encode()
            .map_err(|e| RenderError::Pdf(e.to_string()))?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::Reference(page_id)],
            "Count" => Object::Integer(1),
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(self.size.width),
                Object::Integer(self.size.height),
            ],
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut out = Vec::new();
        doc.save_to(&mut out)
            .map_err(|e| RenderError::Pdf(e.to_string()))?;
        Ok(out)
    }
}

/// Add the Type0 font, its descendant, descriptor, subset program and
/// `ToUnicode` CMap for one slot. Returns the Type0 font object.
fn embed_font(doc: &mut Document, slot: &FontSlot<'_>) -> Result<ObjectId, RenderError> {
    let face: &ttf_parser::Face<'_> = &slot.face;
    let units = f32::from(face.units_per_em().max(1));
    let to_glyph_space = |v: f32| (v * 1000.0 / units).round() as i64;

    let mut gids: Vec<u16> = slot.cids.glyphs().map(|(_, gid)| gid).collect();
    gids.push(0);
    gids.sort_unstable();
    gids.dedup();
    let program = subsetter::subset(slot.program.data(), 0, subsetter::Profile::pdf(&gids))
        .map_err(|e| RenderError::Font(format!("{}: subsetting failed: {e}", slot.program.label())))?;

    let base_font = format!("{}+{}", subset_tag(&gids), slot.program.postscript_name(face));

    let mut file = Stream::new(
        dictionary! { "Length1" => Object::Integer(program.len() as i64) },
        program,
    );
    compress(&mut file)?;
    let file_id = doc.add_object(file);

    let bbox = face.global_bounding_box();
    let descriptor_id = doc.add_object(dictionary! {
        "Type" => "FontDescriptor",
        "FontName" => Object::Name(base_font.as_bytes().to_vec()),
        "Flags" => Object::Integer(4),
        "FontBBox" => vec![
            Object::Integer(to_glyph_space(f32::from(bbox.x_min))),
            Object::Integer(to_glyph_space(f32::from(bbox.y_min))),
            Object::Integer(to_glyph_space(f32::from(bbox.x_max))),
            Object::Integer(to_glyph_space(f32::from(bbox.y_max))),
        ],
        "ItalicAngle" => real(face.italic_angle()),
        "Ascent" => Object::Integer(to_glyph_space(f32::from(face.ascender()))),
        "Descent" => Object::Integer(to_glyph_space(f32::from(face.descender()))),
        "CapHeight" => Object::Integer(to_glyph_space(f32::from(
            face.capital_height().unwrap_or(face.ascender()),
        ))),
        "StemV" => Object::Integer(80),
        "FontFile2" => file_id,
    });

    let mut widths = Vec::new();
    let mut cid_to_gid = vec![0u8, 0u8];
    for (_, gid) in slot.cids.glyphs() {
        let advance = face
            .glyph_hor_advance(ttf_parser::GlyphId(gid))
            .unwrap_or(0);
        widths.push(Object::Integer(to_glyph_space(f32::from(advance))));
        cid_to_gid.extend_from_slice(&gid.to_be_bytes());
    }
    let mut cid_map = Stream::new(dictionary! {}, cid_to_gid);
    compress(&mut cid_map)?;
    let cid_map_id = doc.add_object(cid_map);

    let descendant_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "CIDFontType2",
        "BaseFont" => Object::Name(base_font.as_bytes().to_vec()),
        "CIDSystemInfo" => dictionary! {
            "Registry" => Object::string_literal("Adobe"),
            "Ordering" => Object::string_literal("Identity"),
            "Supplement" => Object::Integer(0),
        },
        "FontDescriptor" => descriptor_id,
        "DW" => Object::Integer(1000),
        "W" => vec![Object::Integer(1), Object::Array(widths)],
        "CIDToGIDMap" => cid_map_id,
    });

    let mut to_unicode = Stream::new(dictionary! {}, slot.cids.to_unicode());
    compress(&mut to_unicode)?;
    let to_unicode_id = doc.add_object(to_unicode);

    Ok(doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type0",
        "BaseFont" => Object::Name(base_font.into_bytes()),
        "Encoding" => "Identity-H",
        "DescendantFonts" => vec![Object::Reference(descendant_id)],
        "ToUnicode" => to_unicode_id,
    }))
}

fn image_xobject(photo: &Photo) -> Stream {
    let color_space = if photo.components() == 1 {
        "DeviceGray"
    } else {
        "DeviceRGB"
    };
    Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => Object::Integer(i64::from(photo.width())),
            "Height" => Object::Integer(i64::from(photo.height())),
            "ColorSpace" => color_space,
            "BitsPerComponent" => Object::Integer(8),
            "Filter" => "DCTDecode",
        },
        photo.jpeg().to_vec(),
    )
    .with_compression(false)
}

/// Six uppercase letters derived from the glyph set, as subset fonts require.
fn subset_tag(gids: &[u16]) -> String {
    let mut hash: u32 = 0x811C_9DC5;
    for gid in gids {
        for byte in gid.to_be_bytes() {
            hash ^= u32::from(byte);
            hash = hash.wrapping_mul(0x0100_0193);
        }
    }
    (0..6)
        .map(|_| {
            let letter = char::from(b'A' + (hash % 26) as u8);
            hash /= 26;
            letter
        })
        .collect()
}

fn compress(stream: &mut Stream) -> Result<(), RenderError> {
    stream
        .compress()
        .map_err(|e| RenderError::Pdf(e.to_string()))
}

fn real(value: f32) -> Object {
    Object::Real((value * 100.0).round() / 100.0)
}

fn rect(x: i64, y: i64, w: i64, h: i64) -> Operation {
    Operation::new(
        "re",
        vec![
            Object::Integer(x),
            Object::Integer(y),
            Object::Integer(w),
            Object::Integer(h),
        ],
    )
}

fn channels(color: Rgb) -> Vec<Object> {
    [color.r, color.g, color.b]
        .into_iter()
        .map(|c| Object::Real((f32::from(c) / 255.0).into()))
        .collect()
}

/// Greedy word wrap to at most `width` characters per line.
pub(crate) fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let needed = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };
        if needed > width && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}
