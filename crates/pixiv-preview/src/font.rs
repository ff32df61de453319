//! Font handles: measure and draw text onto RGB canvases.
//!
//! Composers only ever see [`TextFont`]; where the glyphs come from is the
//! loader's business. [`GlyphFontLoader`] rasterizes TrueType/OpenType
//! fonts registered by id; [`BlockFontLoader`] needs no font files at all.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use ab_glyph::{point, Font, FontArc, GlyphId, PxScale, ScaleFont};
use image::{Rgb, RgbImage};

use crate::types::{PreviewError, PreviewResult};

/// Pixel extent of a (possibly multi-line) string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextExtent {
    pub width: u32,
    pub height: u32,
}

/// A font at a fixed pixel size.
pub trait TextFont: Send + Sync {
    /// Pixel size the handle was loaded at.
    fn size(&self) -> f32;

    /// Extent of `text`; `\n` starts a new line.
    fn measure(&self, text: &str) -> TextExtent;

    /// Draw `text` with its top-left corner at `(x, y)`. Pixels outside the
    /// canvas are clipped.
    fn draw(&self, canvas: &mut RgbImage, x: i64, y: i64, text: &str, color: Rgb<u8>);
}

/// Produces font handles from a logical id and a pixel size.
pub trait FontLoader: Send + Sync {
    fn load(&self, font_id: &str, size: f32) -> PreviewResult<Arc<dyn TextFont>>;
}

/// Loader backed by in-memory font files.
#[derive(Clone, Default)]
pub struct GlyphFontLoader {
    fonts: HashMap<String, FontArc>,
}

impl GlyphFontLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register raw font bytes under `font_id`.
    pub fn register_bytes(&mut self, font_id: &str, bytes: Vec<u8>) -> PreviewResult<()> {
        let font = FontArc::try_from_vec(bytes)
            .map_err(|e| PreviewError::Font(format!("{font_id}: {e}")))?;
        self.fonts.insert(font_id.to_string(), font);
        Ok(())
    }

    /// Register a font file from disk under `font_id`.
    pub fn register_file(&mut self, font_id: &str, path: &Path) -> PreviewResult<()> {
        let bytes = std::fs::read(path)?;
        self.register_bytes(font_id, bytes)
    }

    pub fn has_font(&self, font_id: &str) -> bool {
        self.fonts.contains_key(font_id)
    }
}

impl FontLoader for GlyphFontLoader {
    fn load(&self, font_id: &str, size: f32) -> PreviewResult<Arc<dyn TextFont>> {
        let font = self
            .fonts
            .get(font_id)
            .cloned()
            .ok_or_else(|| PreviewError::Font(format!("Font not registered: {font_id}")))?;
        if !(size.is_finite() && size >= 1.0) {
            return Err(PreviewError::Font(format!("Invalid font size {size}")));
        }
        Ok(Arc::new(GlyphFont {
            font,
            scale: PxScale::from(size),
        }))
    }
}

struct GlyphFont {
    font: FontArc,
    scale: PxScale,
}

impl GlyphFont {
    fn line_height(&self) -> f32 {
        let scaled = self.font.as_scaled(self.scale);
        scaled.ascent() - scaled.descent()
    }

    fn line_advance(&self) -> f32 {
        self.line_height() + self.font.as_scaled(self.scale).line_gap()
    }

    fn line_width(&self, line: &str) -> f32 {
        let scaled = self.font.as_scaled(self.scale);
        let mut width = 0.0;
        let mut prev: Option<GlyphId> = None;
        for ch in line.chars() {
            let id = scaled.glyph_id(ch);
            if let Some(p) = prev {
                width += scaled.kern(p, id);
            }
            width += scaled.h_advance(id);
            prev = Some(id);
        }
        width
    }
}

impl TextFont for GlyphFont {
    fn size(&self) -> f32 {
        self.scale.y
    }

    fn measure(&self, text: &str) -> TextExtent {
        let lines: Vec<&str> = text.split('\n').collect();
        let width = lines
            .iter()
            .map(|l| self.line_width(l))
            .fold(0.0f32, f32::max);
        let height = self.line_height() + self.line_advance() * (lines.len() - 1) as f32;
        TextExtent {
            width: width.ceil() as u32,
            height: height.ceil() as u32,
        }
    }

    fn draw(&self, canvas: &mut RgbImage, x: i64, y: i64, text: &str, color: Rgb<u8>) {
        let scaled = self.font.as_scaled(self.scale);
        let ascent = scaled.ascent();

        for (row, line) in text.split('\n').enumerate() {
            let baseline = y as f32 + ascent + self.line_advance() * row as f32;
            let mut caret = x as f32;
            let mut prev: Option<GlyphId> = None;

            for ch in line.chars() {
                let mut glyph = scaled.scaled_glyph(ch);
                if let Some(p) = prev {
                    caret += scaled.kern(p, glyph.id);
                }
                glyph.position = point(caret, baseline);
                caret += scaled.h_advance(glyph.id);
                prev = Some(glyph.id);

                if let Some(outlined) = self.font.outline_glyph(glyph) {
                    let bounds = outlined.px_bounds();
                    outlined.draw(|gx, gy, coverage| {
                        let px = bounds.min.x as i64 + gx as i64;
                        let py = bounds.min.y as i64 + gy as i64;
                        blend_pixel(canvas, px, py, color, coverage);
                    });
                }
            }
        }
    }
}

/// Mix `color` into the pixel at `(x, y)` by `coverage` in `0.0..=1.0`.
pub(crate) fn blend_pixel(canvas: &mut RgbImage, x: i64, y: i64, color: Rgb<u8>, coverage: f32) {
    if x < 0 || y < 0 || x >= canvas.width() as i64 || y >= canvas.height() as i64 {
        return;
    }
    let c = coverage.clamp(0.0, 1.0);
    let pixel = canvas.get_pixel_mut(x as u32, y as u32);
    for i in 0..3 {
        let mixed = pixel.0[i] as f32 * (1.0 - c) + color.0[i] as f32 * c;
        pixel.0[i] = mixed.round() as u8;
    }
}

/// Break `text` into lines no wider than `max_width` pixels.
///
/// Breaks fall between characters so unspaced scripts wrap too; existing
/// newlines are kept. A single character wider than the limit still gets
/// its own line.
pub fn wrap_text(font: &dyn TextFont, text: &str, max_width: u32) -> String {
    let mut lines: Vec<String> = Vec::new();

    for paragraph in text.split('\n') {
        let mut current = String::new();
        for ch in paragraph.chars() {
            let mut candidate = current.clone();
            candidate.push(ch);
            if !current.is_empty() && font.measure(&candidate).width > max_width {
                lines.push(current.trim_end().to_string());
                current = if ch.is_whitespace() {
                    String::new()
                } else {
                    ch.to_string()
                };
            } else {
                current = candidate;
            }
        }
        lines.push(current.trim_end().to_string());
    }

    lines.join("\n")
}

/// Font-free fallback: every visible character is a solid block half the
/// size wide and one size tall.
///
/// Metrics are exact integers, so layouts measured with it are identical on
/// every machine. Useful where no font file is available.
#[derive(Debug, Clone, Copy)]
pub struct BlockFont {
    size: f32,
}

impl BlockFont {
    pub fn new(size: f32) -> Self {
        Self { size }
    }

    fn advance(&self) -> u32 {
        ((self.size * 0.5).round() as u32).max(1)
    }

    fn line_height(&self) -> u32 {
        (self.size.round() as u32).max(1)
    }
}

impl TextFont for BlockFont {
    fn size(&self) -> f32 {
        self.size
    }

    fn measure(&self, text: &str) -> TextExtent {
        let lines: Vec<&str> = text.split('\n').collect();
        let longest = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);
        TextExtent {
            width: (longest as u32).saturating_mul(self.advance()),
            height: (lines.len() as u32).saturating_mul(self.line_height()),
        }
    }

    fn draw(&self, canvas: &mut RgbImage, x: i64, y: i64, text: &str, color: Rgb<u8>) {
        let adv = self.advance() as i64;
        let lh = self.line_height() as i64;
        for (row, line) in text.split('\n').enumerate() {
            for (col, ch) in line.chars().enumerate() {
                if ch.is_whitespace() {
                    continue;
                }
                let x0 = x + col as i64 * adv;
                let y0 = y + row as i64 * lh + lh / 5;
                for py in y0..(y0 + lh * 3 / 5).max(y0 + 1) {
                    for px in x0..(x0 + adv - 1).max(x0 + 1) {
                        blend_pixel(canvas, px, py, color, 1.0);
                    }
                }
            }
        }
    }
}

/// Hands out [`BlockFont`]s for any font id.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlockFontLoader;

impl FontLoader for BlockFontLoader {
    fn load(&self, _font_id: &str, size: f32) -> PreviewResult<Arc<dyn TextFont>> {
        Ok(Arc::new(BlockFont::new(size)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_respects_width() {
        let font = BlockFont::new(10.0); // 5px per char
        let wrapped = wrap_text(&font, "abcdefghij", 20);
        assert_eq!(wrapped, "abcd\nefgh\nij");
        for line in wrapped.lines() {
            assert!(font.measure(line).width <= 20);
        }
    }

    #[test]
    fn test_wrap_keeps_newlines_and_drops_break_spaces() {
        let font = BlockFont::new(10.0);
        assert_eq!(wrap_text(&font, "ab\ncd", 100), "ab\ncd");
        assert_eq!(wrap_text(&font, "abc def", 15), "abc\ndef");
    }

    #[test]
    fn test_wrap_single_wide_char() {
        let font = BlockFont::new(10.0);
        assert_eq!(wrap_text(&font, "ab", 1), "a\nb");
    }

    #[test]
    fn test_blend_clips() {
        let mut img = RgbImage::new(2, 2);
        blend_pixel(&mut img, -1, 0, Rgb([255, 0, 0]), 1.0);
        blend_pixel(&mut img, 5, 5, Rgb([255, 0, 0]), 1.0);
        blend_pixel(&mut img, 1, 1, Rgb([200, 100, 50]), 0.5);
        assert_eq!(img.get_pixel(1, 1), &Rgb([100, 50, 25]));
        assert_eq!(img.get_pixel(0, 0), &Rgb([0, 0, 0]));
    }

    #[test]
    fn test_loader_rejects_unknown_font() {
        let loader = GlyphFontLoader::new();
        assert!(loader.load("missing", 12.0).is_err());
        assert!(!loader.has_font("missing"));
    }

    #[test]
    fn test_loader_rejects_garbage_bytes() {
        let mut loader = GlyphFontLoader::new();
        assert!(loader.register_bytes("bad", vec![0, 1, 2, 3]).is_err());
    }
}
