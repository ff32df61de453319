//! Raster primitives shared by the card and grid composers.

use image::imageops::FilterType;
use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage};

use crate::font::blend_pixel;
use crate::types::{PreviewError, PreviewResult};

/// Neutral fill for thumbnails that could not be fetched or decoded.
pub const PLACEHOLDER_COLOR: Rgb<u8> = Rgb([127, 127, 127]);

/// Largest canvas, in pixels, any composer will allocate.
pub const MAX_CANVAS_PIXELS: u64 = 1 << 28;

/// Reject canvases that are empty or larger than [`MAX_CANVAS_PIXELS`].
pub fn check_canvas(width: u32, height: u32) -> PreviewResult<()> {
    let pixels = width as u64 * height as u64;
    if pixels == 0 || pixels > MAX_CANVAS_PIXELS {
        return Err(PreviewError::Composition(format!(
            "Canvas {width}x{height} outside 1..={MAX_CANVAS_PIXELS} pixels"
        )));
    }
    Ok(())
}

/// Decode fetched bytes into an image.
pub fn decode(bytes: &[u8]) -> PreviewResult<DynamicImage> {
    Ok(image::load_from_memory(bytes)?)
}

/// A solid tile standing in for a missing image.
pub fn placeholder(width: u32, height: u32) -> RgbImage {
    RgbImage::from_pixel(width, height, PLACEHOLDER_COLOR)
}

/// Decode and stretch to exactly `width` x `height`, or a placeholder.
pub fn tile_or_placeholder(bytes: Option<&[u8]>, width: u32, height: u32) -> RgbImage {
    match bytes.map(decode) {
        Some(Ok(img)) => resize_exact(&img, width, height),
        Some(Err(e)) => {
            tracing::warn!("Substituting placeholder for undecodable image: {e}");
            placeholder(width, height)
        }
        None => placeholder(width, height),
    }
}

pub fn resize_exact(img: &DynamicImage, width: u32, height: u32) -> RgbImage {
    img.resize_exact(width, height, FilterType::Lanczos3).to_rgb8()
}

/// Scale to fit inside `width` x `height` keeping the aspect ratio, centred
/// on a `background` tile of exactly that size.
pub fn fit_within(img: &DynamicImage, width: u32, height: u32, background: Rgb<u8>) -> RgbImage {
    let mut tile = RgbImage::from_pixel(width, height, background);
    let fitted = img.resize(width, height, FilterType::Lanczos3).to_rgb8();
    let (fw, fh) = fitted.dimensions();
    let x = (width.saturating_sub(fw) / 2) as i64;
    let y = (height.saturating_sub(fh) / 2) as i64;
    image::imageops::replace(&mut tile, &fitted, x, y);
    tile
}

/// Copy `src` onto `canvas` at `(x, y)`, clipped.
pub fn paste(canvas: &mut RgbImage, src: &RgbImage, x: i64, y: i64) {
    image::imageops::replace(canvas, src, x, y);
}

/// Fill the half-open rectangle `[x0, x1) x [y0, y1)`, clipped to the canvas.
pub fn fill_rect(canvas: &mut RgbImage, x0: i64, y0: i64, x1: i64, y1: i64, color: Rgb<u8>) {
    let (w, h) = (canvas.width() as i64, canvas.height() as i64);
    for y in y0.max(0)..y1.min(h) {
        for x in x0.max(0)..x1.min(w) {
            canvas.put_pixel(x as u32, y as u32, color);
        }
    }
}

/// Fill a rectangle with corners rounded by `radius`.
pub fn fill_rounded_rect(
    canvas: &mut RgbImage,
    x0: i64,
    y0: i64,
    x1: i64,
    y1: i64,
    radius: i64,
    color: Rgb<u8>,
) {
    let r = radius.min((x1 - x0) / 2).min((y1 - y0) / 2).max(0);
    let (w, h) = (canvas.width() as i64, canvas.height() as i64);
    let rf = r as f64;

    for y in y0.max(0)..y1.min(h) {
        for x in x0.max(0)..x1.min(w) {
            // Distance from the nearest corner centre, only inside corner boxes.
            let cx = if x < x0 + r {
                Some((x0 + r) as f64 - (x as f64 + 0.5))
            } else if x >= x1 - r {
                Some((x as f64 + 0.5) - (x1 - r) as f64)
            } else {
                None
            };
            let cy = if y < y0 + r {
                Some((y0 + r) as f64 - (y as f64 + 0.5))
            } else if y >= y1 - r {
                Some((y as f64 + 0.5) - (y1 - r) as f64)
            } else {
                None
            };
            if let (Some(dx), Some(dy)) = (cx, cy) {
                if dx * dx + dy * dy > rf * rf {
                    continue;
                }
            }
            canvas.put_pixel(x as u32, y as u32, color);
        }
    }
}

/// Alpha mask holding an ellipse inscribed in a `width` x `height` box.
pub fn ellipse_mask(width: u32, height: u32) -> GrayImage {
    let mut mask = GrayImage::new(width, height);
    let rx = width as f64 / 2.0;
    let ry = height as f64 / 2.0;
    if rx == 0.0 || ry == 0.0 {
        return mask;
    }
    for y in 0..height {
        for x in 0..width {
            let dx = (x as f64 + 0.5 - rx) / rx;
            let dy = (y as f64 + 0.5 - ry) / ry;
            if dx * dx + dy * dy <= 1.0 {
                mask.put_pixel(x, y, Luma([255]));
            }
        }
    }
    mask
}

/// Composite `src` onto `canvas` at `(x, y)` weighted by `mask`.
///
/// `mask` must have the same dimensions as `src`.
pub fn paste_masked(canvas: &mut RgbImage, src: &RgbImage, mask: &GrayImage, x: i64, y: i64) {
    debug_assert_eq!(src.dimensions(), mask.dimensions());
    for (sx, sy, pixel) in src.enumerate_pixels() {
        let alpha = mask.get_pixel(sx, sy).0[0];
        if alpha == 0 {
            continue;
        }
        blend_pixel(
            canvas,
            x + sx as i64,
            y + sy as i64,
            *pixel,
            alpha as f32 / 255.0,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb(color)));
        let mut buf = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(&mut buf);
        img.write_with_encoder(encoder).unwrap();
        buf
    }

    fn close_to(pixel: &Rgb<u8>, expected: [u8; 3]) -> bool {
        pixel
            .0
            .iter()
            .zip(expected)
            .all(|(a, b)| (*a as i16 - b as i16).abs() <= 2)
    }

    #[test]
    fn test_tile_from_bytes() {
        let bytes = png(10, 20, [255, 0, 0]);
        let tile = tile_or_placeholder(Some(bytes.as_slice()), 8, 8);
        assert_eq!(tile.dimensions(), (8, 8));
        assert!(close_to(tile.get_pixel(4, 4), [255, 0, 0]));
    }

    #[test]
    fn test_tile_placeholder_on_bad_bytes() {
        let tile = tile_or_placeholder(Some(&b"definitely not an image"[..]), 6, 4);
        assert_eq!(tile.dimensions(), (6, 4));
        assert!(tile.pixels().all(|p| *p == PLACEHOLDER_COLOR));

        let tile = tile_or_placeholder(None, 3, 3);
        assert!(tile.pixels().all(|p| *p == PLACEHOLDER_COLOR));
    }

    #[test]
    fn test_fit_within_centres() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(20, 10, Rgb([0, 0, 255])));
        let tile = fit_within(&img, 10, 10, Rgb([255, 255, 255]));
        assert_eq!(tile.dimensions(), (10, 10));
        assert_eq!(tile.get_pixel(5, 0), &Rgb([255, 255, 255]));
        assert!(close_to(tile.get_pixel(5, 5), [0, 0, 255]));
    }

    #[test]
    fn test_ellipse_mask_corners_empty() {
        let mask = ellipse_mask(10, 10);
        assert_eq!(mask.get_pixel(0, 0).0[0], 0);
        assert_eq!(mask.get_pixel(9, 9).0[0], 0);
        assert_eq!(mask.get_pixel(5, 5).0[0], 255);
        assert_eq!(mask.get_pixel(0, 5).0[0], 255);
    }

    #[test]
    fn test_paste_masked_respects_mask() {
        let mut canvas = RgbImage::from_pixel(10, 10, Rgb([255, 255, 255]));
        let src = RgbImage::from_pixel(10, 10, Rgb([0, 0, 0]));
        let mask = ellipse_mask(10, 10);
        paste_masked(&mut canvas, &src, &mask, 0, 0);
        assert_eq!(canvas.get_pixel(0, 0), &Rgb([255, 255, 255]));
        assert_eq!(canvas.get_pixel(5, 5), &Rgb([0, 0, 0]));
    }

    #[test]
    fn test_rounded_rect_skips_corners() {
        let mut canvas = RgbImage::from_pixel(20, 20, Rgb([0, 0, 0]));
        fill_rounded_rect(&mut canvas, 0, 0, 20, 20, 6, Rgb([9, 9, 9]));
        assert_eq!(canvas.get_pixel(0, 0), &Rgb([0, 0, 0]));
        assert_eq!(canvas.get_pixel(10, 0), &Rgb([9, 9, 9]));
        assert_eq!(canvas.get_pixel(10, 10), &Rgb([9, 9, 9]));
    }

    #[test]
    fn test_check_canvas_bounds() {
        assert!(check_canvas(1600, 237).is_ok());
        assert!(check_canvas(0, 10).is_err());
        assert!(check_canvas(u32::MAX, u32::MAX).is_err());
        assert!(check_canvas(1 << 15, 1 << 14).is_err());
    }

    #[test]
    fn test_fill_rect_clips() {
        let mut canvas = RgbImage::new(4, 4);
        fill_rect(&mut canvas, -2, -2, 2, 2, Rgb([1, 2, 3]));
        assert_eq!(canvas.get_pixel(1, 1), &Rgb([1, 2, 3]));
        assert_eq!(canvas.get_pixel(2, 2), &Rgb([0, 0, 0]));
    }
}
