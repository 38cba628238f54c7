//! Page rasterisation with on-disk memoization.
//!
//! ## Why cache rendered pages?
//!
//! Rendering is the expensive prelude to an even more expensive
//! recognition call. Caching each page's PNG under the image cache
//! directory means an interrupted run (or a deliberate re-run) never
//! re-rasterises a page it already has — the driver's idempotency story
//! depends on it.
//!
//! ## Why cap pixels, not DPI?
//!
//! Page sizes vary wildly: an A0 poster at 150 DPI would produce a
//! 12,000 × 17,000 px image. Capping the longest side keeps memory
//! bounded regardless of physical page size and matches the input-size
//! sweet spot of vision models (~1,024 px). Recorded page geometry is
//! unaffected; the driver rescales recognition output back into native
//! coordinates.

use crate::config::PipelineConfig;
use crate::error::PageError;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Rasterise one page of a document, memoized to
/// `image_dir/page_<NN>.png`.
///
/// If the cache file already exists it is loaded and returned unchanged —
/// no re-rendering, no matter what `dpi` says now. Pixel dimensions of a
/// fresh render derive from `config.dpi` and the page's native size,
/// with the longest side capped at `config.max_recognition_pixels`.
pub fn render_page_cached(
    document: &PdfDocument,
    page_index: usize,
    config: &PipelineConfig,
    image_dir: &Path,
) -> Result<(DynamicImage, PathBuf), PageError> {
    let png_path = image_dir.join(format!("page_{page_index:02}.png"));

    if png_path.exists() {
        debug!("Image cache hit: {}", png_path.display());
        let image = image::open(&png_path).map_err(|e| PageError::RenderFailed {
            page: page_index,
            detail: format!("cached image unreadable: {e}"),
        })?;
        return Ok((image, png_path));
    }

    let pages = document.pages();
    let page = pages.get(page_index as u16).map_err(|e| PageError::RenderFailed {
        page: page_index,
        detail: format!("{e:?}"),
    })?;

    let (target_width, target_height) = target_pixels(
        page.width().value,
        page.height().value,
        config.dpi,
        config.max_recognition_pixels,
    );

    let render_config = PdfRenderConfig::new()
        .set_target_width(target_width as i32)
        .set_maximum_height(target_height as i32);

    let bitmap = page
        .render_with_config(&render_config)
        .map_err(|e| PageError::RenderFailed {
            page: page_index,
            detail: format!("{e:?}"),
        })?;
    let image = bitmap.as_image();
    debug!(
        "Rendered page {} → {}x{} px",
        page_index,
        image.width(),
        image.height()
    );

    write_png_atomic(&image, &png_path).map_err(|detail| PageError::RenderFailed {
        page: page_index,
        detail,
    })?;

    Ok((image, png_path))
}

/// Downscale an image so its longest side is at most `max` pixels,
/// preserving aspect ratio. Images already within bounds are returned
/// unchanged.
pub fn bounded(image: DynamicImage, max: u32) -> DynamicImage {
    if image.width() <= max && image.height() <= max {
        return image;
    }
    let scaled = image.thumbnail(max, max);
    debug!(
        "Downscaled {}x{} → {}x{}",
        image.width(),
        image.height(),
        scaled.width(),
        scaled.height()
    );
    scaled
}

/// Compute render target dimensions from native page points and DPI,
/// capped at `max` on the longest side.
fn target_pixels(width_pts: f32, height_pts: f32, dpi: u32, max: u32) -> (u32, u32) {
    let scale = dpi as f32 / 72.0;
    let mut w = (width_pts * scale).round().max(1.0);
    let mut h = (height_pts * scale).round().max(1.0);
    let longest = w.max(h);
    if longest > max as f32 {
        let shrink = max as f32 / longest;
        w = (w * shrink).round().max(1.0);
        h = (h * shrink).round().max(1.0);
    }
    (w as u32, h as u32)
}

/// Write a PNG via temp file + rename so a crash mid-write never leaves a
/// truncated cache entry for a later run to trust.
fn write_png_atomic(image: &DynamicImage, path: &Path) -> Result<(), String> {
    let dir = path.parent().ok_or_else(|| "no parent directory".to_string())?;
    std::fs::create_dir_all(dir).map_err(|e| e.to_string())?;

    let tmp = tempfile::Builder::new()
        .suffix(".png")
        .tempfile_in(dir)
        .map_err(|e| e.to_string())?;
    image.save(tmp.path()).map_err(|e| e.to_string())?;
    tmp.persist(path).map_err(|e| e.to_string())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbaImage;

    #[test]
    fn target_pixels_applies_dpi() {
        // US Letter at 150 DPI: 612x792 pt → 1275x1650 px before the cap.
        let (w, h) = target_pixels(612.0, 792.0, 150, 10_000);
        assert_eq!((w, h), (1275, 1650));
    }

    #[test]
    fn target_pixels_caps_longest_side() {
        let (w, h) = target_pixels(612.0, 792.0, 150, 1024);
        assert_eq!(h, 1024);
        assert!(w < h);
        // Aspect ratio preserved within rounding.
        let aspect = 612.0 / 792.0;
        assert!((w as f32 / h as f32 - aspect).abs() < 0.01);
    }

    #[test]
    fn bounded_is_noop_within_limits() {
        let img = DynamicImage::ImageRgba8(RgbaImage::new(200, 100));
        let out = bounded(img, 1024);
        assert_eq!((out.width(), out.height()), (200, 100));
    }

    #[test]
    fn bounded_downscales_preserving_aspect() {
        let img = DynamicImage::ImageRgba8(RgbaImage::new(2048, 1024));
        let out = bounded(img, 1024);
        assert_eq!(out.width(), 1024);
        assert_eq!(out.height(), 512);
    }

    #[test]
    fn write_png_atomic_round_trips() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("page_00.png");
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            4,
            4,
            image::Rgba([0, 128, 255, 255]),
        ));
        write_png_atomic(&img, &path).unwrap();
        let back = image::open(&path).unwrap();
        assert_eq!((back.width(), back.height()), (4, 4));
    }
}
