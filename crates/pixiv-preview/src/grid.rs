//! Grid composition: tile cards or thumbnails under a title header.

use std::sync::Arc;

use chrono::{DateTime, Local};
use image::codecs::jpeg::JpegEncoder;
use image::{Rgb, RgbImage};

use crate::card::CardGeometry;
use crate::config::PreviewConfig;
use crate::draw::{check_canvas, decode, fill_rect, fit_within, paste, placeholder, resize_exact};
use crate::font::{FontLoader, TextFont};
use crate::types::{PreviewBatch, PreviewError, PreviewResult};

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const USER_TITLE_COLOR: Rgb<u8> = Rgb([37, 143, 184]);
const HEADER_TEXT: Rgb<u8> = Rgb([255, 255, 255]);
const CAPTION_COLOR: Rgb<u8> = Rgb([0, 0, 0]);

/// Arithmetic placement of equally sized items in rows under a header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridLayout {
    pub item_width: u32,
    pub item_height: u32,
    pub items_per_row: u32,
    pub spacing: u32,
    /// Everything above the first row, including its top margin.
    pub header_height: u32,
}

impl GridLayout {
    pub fn new(
        item_width: u32,
        item_height: u32,
        items_per_row: u32,
        spacing: u32,
        header_height: u32,
    ) -> Self {
        Self {
            item_width,
            item_height,
            items_per_row: items_per_row.max(1),
            spacing,
            header_height,
        }
    }

    pub fn rows(&self, count: usize) -> u32 {
        let count = u32::try_from(count).unwrap_or(u32::MAX);
        count.div_ceil(self.items_per_row)
    }

    /// Canvas size needed for `count` items.
    ///
    /// Fails with [`PreviewError::Composition`] when a side does not fit in `u32`.
    pub fn canvas_size(&self, count: usize) -> PreviewResult<(u32, u32)> {
        let overflow = || {
            PreviewError::Composition(format!(
                "Grid of {count} items at {}x{} does not fit a canvas",
                self.item_width, self.item_height
            ))
        };
        let width = self
            .item_width
            .checked_add(self.spacing)
            .and_then(|cell| cell.checked_mul(self.items_per_row))
            .and_then(|w| w.checked_add(self.spacing))
            .ok_or_else(overflow)?;
        let height = self
            .item_height
            .checked_add(self.spacing)
            .and_then(|cell| cell.checked_mul(self.rows(count)))
            .and_then(|h| h.checked_add(self.header_height))
            .and_then(|h| h.checked_add(self.spacing))
            .ok_or_else(overflow)?;
        Ok((width, height))
    }

    /// Top-left corner of item `index`.
    pub fn position(&self, index: usize) -> (i64, i64) {
        let per_row = self.items_per_row as usize;
        let (row, col) = (index / per_row, index % per_row);
        let x = self.spacing as u64 + col as u64 * (self.item_width + self.spacing) as u64;
        let y = self.header_height as u64 + row as u64 * (self.item_height + self.spacing) as u64;
        (x as i64, y as i64)
    }
}

/// Title size of a user search grid built from cards of this geometry.
pub fn user_search_title_size(g: &CardGeometry) -> f32 {
    (g.height / 6).max(1) as f32
}

/// Stack user cards in one column under a "Pixiv User Search" title.
///
/// Every card is expected at `g.width` x `g.height`.
pub fn compose_user_search_grid(
    search_name: &str,
    result_count: &str,
    cards: &[RgbImage],
    g: &CardGeometry,
    title_font: &dyn TextFont,
) -> PreviewResult<RgbImage> {
    let spacing = g.height / 12;
    let title = format!("Pixiv User Search: {search_name} - {result_count}");
    let title_height = title_font.measure(&title).height;

    let layout = GridLayout::new(
        g.width,
        g.height,
        1,
        spacing,
        title_height.saturating_add(spacing * 2),
    );
    let (width, height) = layout.canvas_size(cards.len())?;
    check_canvas(width, height)?;
    let mut canvas = RgbImage::from_pixel(width, height, BACKGROUND);

    title_font.draw(
        &mut canvas,
        (spacing * 2) as i64,
        spacing as i64,
        &title,
        USER_TITLE_COLOR,
    );

    for (index, card) in cards.iter().enumerate() {
        let (x, y) = layout.position(index);
        paste(&mut canvas, card, x, y);
    }

    Ok(canvas)
}

/// Options for a grid of raw thumbnails with captions.
#[derive(Debug, Clone, PartialEq)]
pub struct ThumbnailGridOptions {
    /// Tile size in pixels.
    pub preview_size: (u32, u32),
    pub columns: usize,
    /// Letterbox tiles instead of stretching them.
    pub hold_ratio: bool,
    /// Maximum tiles taken from the batch.
    pub limit: usize,
    pub header_color: Rgb<u8>,
}

impl Default for ThumbnailGridOptions {
    fn default() -> Self {
        Self::from_config(&PreviewConfig::default())
    }
}

impl ThumbnailGridOptions {
    pub fn from_config(config: &PreviewConfig) -> Self {
        Self {
            preview_size: config.preview_size,
            columns: config.preview_columns,
            hold_ratio: config.hold_ratio,
            limit: config.preview_limit,
            header_color: Rgb(config.header_color),
        }
    }

    pub fn spacing(&self) -> u32 {
        (self.preview_size.0 / 16).max(1)
    }

    pub fn caption_font_size(&self) -> f32 {
        (self.preview_size.0 / 16).max(1) as f32
    }

    pub fn title_font_size(&self) -> f32 {
        (self.preview_size.0 / 6).max(1) as f32
    }
}

/// Fonts used by a thumbnail grid.
#[derive(Clone)]
pub struct GridFonts {
    pub title: Arc<dyn TextFont>,
    pub caption: Arc<dyn TextFont>,
}

impl GridFonts {
    pub fn load(
        loader: &dyn FontLoader,
        font_id: &str,
        options: &ThumbnailGridOptions,
    ) -> PreviewResult<Self> {
        Ok(Self {
            title: loader.load(font_id, options.title_font_size())?,
            caption: loader.load(font_id, options.caption_font_size())?,
        })
    }
}

/// Tile a batch's thumbnails with their captions under a coloured header.
///
/// Only fetched items are in a batch, so there are no gaps; an item whose
/// bytes do not decode still gets a placeholder tile. An empty batch yields
/// the header alone. Fails when the requested tiles would not fit a canvas.
pub fn compose_thumbnail_grid(
    batch: &PreviewBatch,
    options: &ThumbnailGridOptions,
    fonts: &GridFonts,
) -> PreviewResult<RgbImage> {
    let (tile_w, tile_h) = options.preview_size;
    let spacing = options.spacing();
    let items = &batch.items()[..batch.count().min(options.limit)];

    let title = batch.name();
    let title_extent = fonts.title.measure(title);
    let bar_height = title_extent.height.saturating_add(spacing);

    let caption_height = items
        .iter()
        .map(|item| fonts.caption.measure(&item.description).height)
        .max()
        .unwrap_or(0);

    let per_row = options.columns.min(items.len()).max(1) as u32;
    let item_height = tile_h
        .checked_add(spacing / 2)
        .and_then(|h| h.checked_add(caption_height))
        .ok_or_else(|| {
            PreviewError::Composition(format!("Tile height {tile_h} too large for a caption"))
        })?;
    let layout = GridLayout::new(
        tile_w,
        item_height,
        per_row,
        spacing,
        bar_height.saturating_add(spacing),
    );
    let (grid_width, height) = layout.canvas_size(items.len())?;
    let width = grid_width.max(title_extent.width.saturating_add(spacing * 2));
    check_canvas(width, height)?;

    let mut canvas = RgbImage::from_pixel(width, height, BACKGROUND);
    fill_rect(
        &mut canvas,
        0,
        0,
        width as i64,
        bar_height as i64,
        options.header_color,
    );
    fonts.title.draw(
        &mut canvas,
        spacing as i64,
        (spacing / 2) as i64,
        title,
        HEADER_TEXT,
    );

    for (index, item) in items.iter().enumerate() {
        let (x, y) = layout.position(index);
        let tile = render_tile(item.image_bytes.as_deref(), tile_w, tile_h, options.hold_ratio);
        paste(&mut canvas, &tile, x, y);
        fonts.caption.draw(
            &mut canvas,
            x,
            y + (tile_h + spacing / 2) as i64,
            &item.description,
            CAPTION_COLOR,
        );
    }

    Ok(canvas)
}

fn render_tile(bytes: Option<&[u8]>, width: u32, height: u32, hold_ratio: bool) -> RgbImage {
    let Some(bytes) = bytes else {
        return placeholder(width, height);
    };
    match decode(bytes) {
        Ok(img) if hold_ratio => fit_within(&img, width, height, BACKGROUND),
        Ok(img) => resize_exact(&img, width, height),
        Err(e) => {
            tracing::warn!("Substituting placeholder for undecodable thumbnail: {e}");
            placeholder(width, height)
        }
    }
}

/// Encode a finished canvas as JPEG.
pub fn encode_jpeg(canvas: &RgbImage, quality: u8) -> PreviewResult<Vec<u8>> {
    let mut buf = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100));
    encoder.encode_image(canvas)?;
    Ok(buf)
}

/// `{prefix}_{name}_{timestamp}.jpg`, with path-hostile characters in the
/// name replaced. The timestamp carries milliseconds.
pub fn preview_file_name(prefix: &str, name: &str, at: DateTime<Local>) -> String {
    let safe: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    format!("{prefix}_{safe}_{}.jpg", at.format("%Y-%m-%d-%H-%M-%S-%3f"))
}
