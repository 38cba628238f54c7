//! The pattern backend: deterministic canned blocks, no model.
//!
//! Exists for wiring verification and tests — it exercises the entire
//! pipeline (rendering, assembly, persistence, idempotency) without model
//! weights, a GPU, or a network connection. It is also the default
//! backend so a fresh install produces output out of the box.

use super::{Recognition, RecognitionBackend};
use crate::block::RawBlock;
use crate::error::BackendError;
use image::DynamicImage;

/// A backend that returns a fixed list of blocks for every image.
pub struct PatternBackend {
    blocks: Vec<RawBlock>,
}

impl PatternBackend {
    /// A backend returning exactly the given blocks, in order.
    pub fn with_blocks(blocks: Vec<RawBlock>) -> Self {
        Self { blocks }
    }

    /// A backend that recognizes nothing.
    pub fn empty() -> Self {
        Self { blocks: Vec::new() }
    }
}

impl Default for PatternBackend {
    /// One canned block, matching the reference fixture used throughout
    /// the test suite.
    fn default() -> Self {
        Self {
            blocks: vec![RawBlock {
                text: "World".to_string(),
                confidence: 0.95,
                bbox: [10, 50, 120, 70],
            }],
        }
    }
}

impl RecognitionBackend for PatternBackend {
    fn name(&self) -> &'static str {
        "pattern"
    }

    fn recognize(&self, _image: &DynamicImage) -> Result<Recognition, BackendError> {
        Ok(Recognition {
            items: self.blocks.clone(),
            tables: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbaImage;

    fn white_canvas(w: u32, h: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(w, h, image::Rgba([255; 4])))
    }

    #[test]
    fn default_returns_the_canned_block() {
        let backend = PatternBackend::default();
        let out = backend.recognize(&white_canvas(200, 100)).unwrap();
        assert_eq!(out.items.len(), 1);
        assert_eq!(out.items[0].text, "World");
        assert_eq!(out.items[0].confidence, 0.95);
        assert_eq!(out.items[0].bbox, [10, 50, 120, 70]);
        assert!(out.tables.is_empty());
    }

    #[test]
    fn recognition_is_independent_of_the_image() {
        let backend = PatternBackend::default();
        let a = backend.recognize(&white_canvas(200, 100)).unwrap();
        let b = backend.recognize(&white_canvas(640, 480)).unwrap();
        assert_eq!(a.items, b.items);
    }

    #[test]
    fn empty_backend_returns_no_blocks() {
        let backend = PatternBackend::empty();
        let out = backend.recognize(&white_canvas(10, 10)).unwrap();
        assert!(out.items.is_empty());
    }
}
