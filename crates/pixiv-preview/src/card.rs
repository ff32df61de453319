//! User search result cards.
//!
//! Every length on a card is a fixed fraction of the card height, and the
//! card height is the requested width over the configured ratio, so a card
//! looks the same at any width.

use std::sync::Arc;

use image::{Rgb, RgbImage};

use crate::draw::{
    check_canvas, decode, ellipse_mask, fill_rect, fill_rounded_rect, paste, paste_masked,
    placeholder, resize_exact, tile_or_placeholder,
};
use crate::font::{wrap_text, FontLoader, TextFont};
use crate::model::UserSearchResult;
use crate::types::{PreviewError, PreviewResult};

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const PANEL: Rgb<u8> = Rgb([228, 250, 255]);
const THUMB_BORDER: Rgb<u8> = Rgb([224, 224, 224]);
const NAME_COLOR: Rgb<u8> = Rgb([0, 0, 0]);
const ACCENT: Rgb<u8> = Rgb([37, 143, 184]);

/// Smallest card height the layout fractions still make sense for.
const MIN_CARD_HEIGHT: u32 = 12;

/// Card layout derived from width and ratio.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CardGeometry {
    pub width: u32,
    pub height: u32,
    pub avatar_size: u32,
    pub thumb_size: u32,
    pub spacing: u32,
    pub main_font_size: f32,
    pub desc_font_size: f32,
    pub corner_radius: u32,
    /// Left edge of the text column.
    pub text_x: u32,
    /// Wrap width of the description.
    pub desc_wrap_width: u32,
    /// Left edge of the first thumbnail.
    pub thumbs_x: u32,
}

impl CardGeometry {
    pub fn new(width: u32, ratio: f32) -> PreviewResult<Self> {
        if !(ratio.is_finite() && ratio > 0.0) {
            return Err(PreviewError::Composition(format!("Invalid card ratio {ratio}")));
        }
        let height = (width as f32 / ratio) as u32;
        if height < MIN_CARD_HEIGHT {
            return Err(PreviewError::Composition(format!(
                "Card width {width} too small for ratio {ratio}"
            )));
        }
        check_canvas(width, height)?;

        let avatar_size = height * 5 / 6;
        let spacing = (height - avatar_size) / 2;
        let desc_wrap_width = height * 3 / 2;

        Ok(Self {
            width,
            height,
            avatar_size,
            thumb_size: avatar_size,
            spacing,
            main_font_size: (height / 8) as f32,
            desc_font_size: (height / 12) as f32,
            corner_radius: height / 12,
            text_x: spacing * 4 + avatar_size,
            desc_wrap_width,
            thumbs_x: spacing * 6 + avatar_size + desc_wrap_width,
        })
    }

    /// Top-left corner of thumbnail `index`.
    pub fn thumb_origin(&self, index: usize) -> (i64, i64) {
        let x = self.thumbs_x as i64 + index as i64 * (self.thumb_size + self.spacing) as i64;
        (x, self.spacing as i64)
    }
}

/// Fonts used on a card.
#[derive(Clone)]
pub struct CardFonts {
    pub main: Arc<dyn TextFont>,
    pub desc: Arc<dyn TextFont>,
}

impl CardFonts {
    pub fn load(loader: &dyn FontLoader, font_id: &str, geometry: &CardGeometry) -> PreviewResult<Self> {
        Ok(Self {
            main: loader.load(font_id, geometry.main_font_size)?,
            desc: loader.load(font_id, geometry.desc_font_size)?,
        })
    }
}

/// Image bytes a card is built from.
///
/// `thumbnails` is positional: `None` marks a slot whose fetch failed.
#[derive(Debug, Clone, Default)]
pub struct CardImages {
    pub avatar: Vec<u8>,
    pub thumbnails: Vec<Option<Vec<u8>>>,
}

/// Render one user's card.
///
/// At most `max_thumbs` thumbnails are placed; failed or undecodable ones
/// become placeholders so the row stays aligned.
pub fn compose_user_card(
    user: &UserSearchResult,
    images: &CardImages,
    fonts: &CardFonts,
    g: &CardGeometry,
    max_thumbs: usize,
) -> RgbImage {
    let mut card = RgbImage::from_pixel(g.width, g.height, BACKGROUND);

    let inset = (g.spacing / 4) as i64;
    fill_rounded_rect(
        &mut card,
        inset,
        inset,
        g.width as i64 - inset,
        g.height as i64 - inset,
        g.corner_radius as i64,
        PANEL,
    );

    let avatar = match decode(&images.avatar) {
        Ok(img) => resize_exact(&img, g.avatar_size, g.avatar_size),
        Err(e) => {
            tracing::warn!("Avatar for user {} unreadable: {e}", user.user_id);
            placeholder(g.avatar_size, g.avatar_size)
        }
    };
    let mask = ellipse_mask(g.avatar_size, g.avatar_size);
    paste_masked(
        &mut card,
        &avatar,
        &mask,
        (g.spacing * 2) as i64,
        g.spacing as i64,
    );

    // Text column: each line starts below everything drawn before it.
    let text_x = g.text_x as i64;
    let quarter = (g.spacing / 4) as i64;
    let mut y = (g.spacing * 3 / 2) as i64;

    fonts.main.draw(&mut card, text_x, y, &user.user_name, NAME_COLOR);
    y += fonts.main.measure(&user.user_name).height as i64 + quarter;

    let uid_text = format!("UID: {}", user.user_id);
    fonts.desc.draw(&mut card, text_x, y, &uid_text, ACCENT);
    y += fonts.desc.measure(&uid_text).height as i64 + quarter * 2;

    let count_text = format!(
        "Artworks: {}",
        user.illust_count.as_deref().unwrap_or("-")
    );
    fonts.desc.draw(&mut card, text_x, y, &count_text, ACCENT);
    y += fonts.desc.measure(&count_text).height as i64 + quarter * 2;

    let desc = wrap_text(fonts.desc.as_ref(), &user.description, g.desc_wrap_width);
    fonts.desc.draw(&mut card, text_x, y, &desc, NAME_COLOR);

    let border_lead = (g.thumb_size / 80) as i64;
    let border_trail = (g.thumb_size / 96) as i64;
    let size = g.thumb_size as i64;
    for (index, slot) in images.thumbnails.iter().take(max_thumbs).enumerate() {
        let (x, y) = g.thumb_origin(index);
        fill_rect(
            &mut card,
            x - border_lead,
            y - border_lead,
            x + size + border_trail + 1,
            y + size + border_trail + 1,
            THUMB_BORDER,
        );
        let thumb = tile_or_placeholder(slot.as_deref(), g.thumb_size, g.thumb_size);
        paste(&mut card, &thumb, x, y);
    }

    card
}
