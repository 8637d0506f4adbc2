//! Member photos prepared for embedding as a `DCTDecode` image.
//!
//! Baseline and progressive JPEGs with one or three components and a sane
//! size are embedded as uploaded. Anything else the decoder understands
//! (PNG, CMYK or oversized JPEG) is downscaled, flattened onto white and
//! re-encoded as an RGB JPEG.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, Rgb, RgbImage};

use crate::error::RenderError;

/// Longest edge kept when a photo has to be re-encoded.
const MAX_EDGE: u32 = 600;

/// Longest edge accepted for pass-through JPEGs.
const MAX_PASSTHROUGH_EDGE: u32 = 2400;

const JPEG_QUALITY: u8 = 85;

/// A photo ready to be placed on the certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Photo {
    width: u32,
    height: u32,
    components: u8,
    jpeg: Vec<u8>,
}

impl Photo {
    /// Prepare uploaded image bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, RenderError> {
        if let Some(frame) = jpeg_frame(bytes) {
            if frame.embeddable() {
                return Ok(Self {
                    width: u32::from(frame.width),
                    height: u32::from(frame.height),
                    components: frame.components,
                    jpeg: bytes.to_vec(),
                });
            }
        }
        let decoded =
            image::load_from_memory(bytes).map_err(|e| RenderError::Photo(e.to_string()))?;
        Self::from_image(&decoded)
    }

    fn from_image(decoded: &DynamicImage) -> Result<Self, RenderError> {
        if decoded.width() == 0 || decoded.height() == 0 {
            return Err(RenderError::Photo("image has no pixels".into()));
        }
        let scaled = if decoded.width() > MAX_EDGE || decoded.height() > MAX_EDGE {
            decoded.thumbnail(MAX_EDGE, MAX_EDGE)
        } else {
            decoded.clone()
        };
        let rgba = scaled.to_rgba8();
        let mut flat = RgbImage::new(rgba.width(), rgba.height());
        for (x, y, pixel) in rgba.enumerate_pixels() {
            let [r, g, b, a] = pixel.0;
            let over_white = |c: u8| {
                let alpha = u16::from(a);
                ((u16::from(c) * alpha + 255 * (255 - alpha)) / 255) as u8
            };
            flat.put_pixel(x, y, Rgb([over_white(r), over_white(g), over_white(b)]));
        }

        let mut jpeg = Cursor::new(Vec::new());
        JpegEncoder::new_with_quality(&mut jpeg, JPEG_QUALITY)
            .encode_image(&flat)
            .map_err(|e| RenderError::Photo(e.to_string()))?;
        Ok(Self {
            width: flat.width(),
            height: flat.height(),
            components: 3,
            jpeg: jpeg.into_inner(),
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// 1 for grayscale, 3 for RGB.
    pub fn components(&self) -> u8 {
        self.components
    }

    pub(crate) fn jpeg(&self) -> &[u8] {
        &self.jpeg
    }
}

/// Frame header of a JPEG stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct JpegFrame {
    marker: u8,
    width: u16,
    height: u16,
    components: u8,
}

impl JpegFrame {
    fn embeddable(&self) -> bool {
        // SOF0 baseline, SOF1 extended, SOF2 progressive; all Huffman coded.
        matches!(self.marker, 0xC0..=0xC2)
            && matches!(self.components, 1 | 3)
            && self.width > 0
            && self.height > 0
            && u32::from(self.width.max(self.height)) <= MAX_PASSTHROUGH_EDGE
    }
}

/// Walk the marker segments up to the first start-of-frame.
fn jpeg_frame(bytes: &[u8]) -> Option<JpegFrame> {
    if bytes.get(..2)? != [0xFF, 0xD8] {
        return None;
    }
    let mut at = 2;
    loop {
        while *bytes.get(at)? != 0xFF {
            at += 1;
        }
        while *bytes.get(at)? == 0xFF {
            at += 1;
        }
        let marker = *bytes.get(at)?;
        at += 1;
        match marker {
            0x01 | 0xD0..=0xD7 => continue,
            0xD9 | 0xDA => return None,
            0xC0..=0xC3 | 0xC5..=0xC7 | 0xC9..=0xCB | 0xCD..=0xCF => {
                let segment = bytes.get(at + 2..at + 8)?;
                return Some(JpegFrame {
                    marker,
                    height: u16::from_be_bytes([segment[1], segment[2]]),
                    width: u16::from_be_bytes([segment[3], segment[4]]),
                    components: segment[5],
                });
            }
            _ => {
                let len = u16::from_be_bytes([*bytes.get(at)?, *bytes.get(at + 1)?]);
                at += usize::from(len);
            }
        }
    }
}
