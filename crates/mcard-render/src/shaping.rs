//! Text shaping and the glyph-to-text bookkeeping behind embedded fonts.
//!
//! Each font slot on a page owns a [`CidMap`]: glyphs are written as
//! two-byte CIDs allocated in first-use order, and every CID remembers the
//! text it stands for. That table becomes the `ToUnicode` CMap, so copying
//! or extracting text from the certificate yields the original string.

use std::collections::HashMap;
use std::ops::Range;

use mcard_core::naming::is_combining_mark;

use crate::error::RenderError;

/// Stand-in text for glyphs beyond a cluster's character count (for example
/// the second half of a split vowel sign).
const SURPLUS_GLYPH_TEXT: &str = "\u{200B}";

/// Longest `ToUnicode` target, in UTF-16 units.
const MAX_TARGET_UNITS: usize = 256;

/// CMap sections hold at most 100 entries.
const BFCHAR_CHUNK: usize = 100;

/// One glyph ready to be drawn, positioned relative to the run origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct PlacedGlyph {
    pub slot: usize,
    pub cid: u16,
    pub x: f32,
    pub y: f32,
}

/// A shaped line of text.
#[derive(Debug, Default)]
pub(crate) struct ShapedLine {
    pub glyphs: Vec<PlacedGlyph>,
    pub width: f32,
}

/// CIDs allocated for one font slot.
#[derive(Debug, Default)]
pub(crate) struct CidMap {
    entries: Vec<(u16, String)>,
    index: HashMap<(u16, String), u16>,
}

impl CidMap {
    /// CID for `gid` standing for `text`, allocating on first use.
    pub(crate) fn cid(&mut self, gid: u16, text: &str) -> Result<u16, RenderError> {
        if let Some(cid) = self.index.get(&(gid, text.to_string())) {
            return Ok(*cid);
        }
        let cid = u16::try_from(self.entries.len() + 1)
            .ok()
            .filter(|cid| *cid < u16::MAX)
            .ok_or_else(|| RenderError::Pdf("too many distinct glyphs on one page".into()))?;
        self.entries.push((gid, text.to_string()));
        self.index.insert((gid, text.to_string()), cid);
        Ok(cid)
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `(cid, gid)` pairs in CID order, starting at 1.
    pub(crate) fn glyphs(&self) -> impl Iterator<Item = (u16, u16)> + '_ {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, (gid, _))| (i as u16 + 1, *gid))
    }

    /// The `ToUnicode` CMap program for this slot.
    pub(crate) fn to_unicode(&self) -> Vec<u8> {
        let mut mappings = vec!["<0000> <FFFD>".to_string()];
        for (i, (_, text)) in self.entries.iter().enumerate() {
            mappings.push(format!("<{:04X}> <{}>", i + 1, utf16_hex(text)));
        }

        let mut cmap = String::from(
            "/CIDInit /ProcSet findresource begin\n\
             12 dict begin\n\
             begincmap\n\
             /CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n\
             /CMapName /Adobe-Identity-UCS def\n\
             /CMapType 2 def\n\
             1 begincodespacerange\n\
             <0000> <FFFF>\n\
             endcodespacerange\n",
        );
        for chunk in mappings.chunks(BFCHAR_CHUNK) {
            cmap.push_str(&format!("{} beginbfchar\n", chunk.len()));
            for line in chunk {
                cmap.push_str(line);
                cmap.push('\n');
            }
            cmap.push_str("endbfchar\n");
        }
        cmap.push_str(
            "endcmap\n\
             CMapName currentdict /CMap defineresource pop\n\
             end\n\
             end\n",
        );
        cmap.into_bytes()
    }
}

fn utf16_hex(text: &str) -> String {
    let units: Vec<u16> = text.encode_utf16().take(MAX_TARGET_UNITS).collect();
    if units.is_empty() {
        return "FFFD".to_string();
    }
    units.iter().map(|u| format!("{u:04X}")).collect()
}

/// UTF-16BE with byte order mark, as PDF text strings expect.
pub(crate) fn utf16_be_with_bom(text: &str) -> Vec<u8> {
    let mut out = vec![0xFE, 0xFF];
    for unit in text.encode_utf16() {
        out.extend_from_slice(&unit.to_be_bytes());
    }
    out
}

/// Split `text` into runs of one font each.
///
/// A character stays in the current run while that run's face covers it.
/// Otherwise the first face in `covers` order that has it starts a new run.
/// Whitespace, combining marks and uncovered characters never break a run.
pub(crate) fn font_runs<F>(text: &str, slots: usize, covers: F) -> Vec<(usize, Range<usize>)>
where
    F: Fn(usize, char) -> bool,
{
    let mut runs: Vec<(usize, Range<usize>)> = Vec::new();
    for (at, c) in text.char_indices() {
        let end = at + c.len_utf8();
        let current = runs.last().map(|(slot, _)| *slot);
        let sticky = c.is_whitespace() || is_combining_mark(c);
        let slot = match current {
            Some(slot) if sticky || covers(slot, c) => slot,
            _ => (0..slots)
                .find(|slot| covers(*slot, c))
                .or(current)
                .unwrap_or(0),
        };
        match runs.last_mut() {
            Some((last, range)) if *last == slot => range.end = end,
            _ => runs.push((slot, at..end)),
        }
    }
    runs
}

/// Divide a cluster's text across the glyphs that render it.
///
/// Glyph `i` takes character `i` and the last glyph takes whatever is left,
/// so the pieces concatenate back to `text` in logical order.
pub(crate) fn split_cluster(text: &str, glyphs: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    (0..glyphs)
        .map(|i| {
            let piece: String = if i + 1 == glyphs {
                chars.get(i..).map(|rest| rest.iter().collect()).unwrap_or_default()
            } else {
                chars.get(i).map(|c| c.to_string()).unwrap_or_default()
            };
            if piece.is_empty() {
                SURPLUS_GLYPH_TEXT.to_string()
            } else {
                piece
            }
        })
        .collect()
}

/// Shape one run with `face` at `size` points, starting at pen position `x`.
///
/// `cid` receives each glyph id and the text it stands for.
pub(crate) fn shape_run<C>(
    face: &rustybuzz::Face<'_>,
    slot: usize,
    text: &str,
    size: f32,
    x: f32,
    mut cid: C,
) -> Result<(Vec<PlacedGlyph>, f32), RenderError>
where
    C: FnMut(u16, &str) -> Result<u16, RenderError>,
{
    let mut buffer = rustybuzz::UnicodeBuffer::new();
    buffer.push_str(text);
    buffer.guess_segment_properties();
    let shaped = rustybuzz::shape(face, &[], buffer);
    let infos = shaped.glyph_infos();
    let positions = shaped.glyph_positions();
    let scale = size / face.units_per_em().max(1) as f32;

    let mut starts: Vec<usize> = infos.iter().map(|g| g.cluster as usize).collect();
    starts.sort_unstable();
    starts.dedup();
    let mut placed = Vec::with_capacity(infos.len());
    let mut pen = x;
    let mut i = 0;
    while i < infos.len() {
        let cluster = infos[i].cluster;
        let len = infos[i..]
            .iter()
            .take_while(|g| g.cluster == cluster)
            .count();
        let pieces = split_cluster(cluster_text(text, &starts, cluster as usize), len);
        for (info, (pos, piece)) in infos[i..i + len]
            .iter()
            .zip(positions[i..i + len].iter().zip(&pieces))
        {
            let gid = u16::try_from(info.glyph_id).unwrap_or(0);
            placed.push(PlacedGlyph {
                slot,
                cid: cid(gid, piece)?,
                x: pen + pos.x_offset as f32 * scale,
                y: pos.y_offset as f32 * scale,
            });
            pen += pos.x_advance as f32 * scale;
        }
        i += len;
    }
    Ok((placed, pen - x))
}

/// Source text of the cluster beginning at byte `start`.
fn cluster_text<'t>(text: &'t str, starts: &[usize], start: usize) -> &'t str {
    let end = starts
        .iter()
        .find(|s| **s > start)
        .copied()
        .unwrap_or(text.len());
    text.get(start..end).unwrap_or_default()
}
