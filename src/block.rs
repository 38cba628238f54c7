//! The canonical data model: blocks, tables, and the persisted page record.
//!
//! One schema regardless of how a page's text was obtained. Downstream
//! consumers (overlay viewers, search indexers, data-entry automation)
//! parse exactly one JSON shape and never need to know whether a page had
//! a native text layer or went through a recognition backend.
//!
//! ## Identity conventions
//!
//! * `page_index` is zero-based and assigned by the assembler, never by a
//!   backend.
//! * `block_id` is `p<page_index>_b<ordinal>`, unique within a page, with
//!   ordinal order defining the implicit reading order.
//!
//! ## Geometry conventions
//!
//! Bounding boxes are axis-aligned `[x0, y0, x1, y1]`, origin top-left,
//! expressed in the same coordinate space as the record's `size` (PDF
//! points for PDF pages, pixels for standalone images). The driver
//! rescales backend output so this always holds — see
//! [`crate::driver`].

use serde::{Deserialize, Serialize};

/// Version written into every persisted page record.
pub const SCHEMA_VERSION: &str = "1.0";

/// A text unit as produced by an extraction path, before identity
/// assignment.
///
/// This is the shape recognition backends return: the three required
/// fields and nothing else. `page_index` and `block_id` are the
/// assembler's business.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawBlock {
    /// Recognized or extracted content.
    pub text: String,
    /// Confidence in `[0.0, 1.0]`. Native-text extraction is authoritative
    /// and always reports 1.0; backends report their own estimate, which
    /// may be a fixed placeholder.
    pub confidence: f32,
    /// `[x0, y0, x1, y1]`, origin top-left.
    pub bbox: [u32; 4],
}

impl RawBlock {
    /// A block spanning an entire page of the given dimensions.
    pub fn full_page(text: impl Into<String>, confidence: f32, width: u32, height: u32) -> Self {
        Self {
            text: text.into(),
            confidence,
            bbox: [0, 0, width, height],
        }
    }
}

/// A single recognized or extracted text unit within a persisted page.
///
/// Field order matters: serde serializes struct fields in declaration
/// order, and the on-disk schema is fixed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// `p<page_index>_b<ordinal>`, unique within the page.
    pub block_id: String,
    pub text: String,
    pub confidence: f32,
    pub bbox: [u32; 4],
    /// Zero-based index of the owning page.
    pub page_index: usize,
}

/// A detected table: rectangular cell matrix plus bounding geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub bbox: [u32; 4],
    /// Row-major cell text. Every row has the same number of columns;
    /// cells with no content are empty strings.
    pub cells: Vec<Vec<String>>,
}

/// Page dimensions in the coordinate space the blocks are expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSize {
    pub width: u32,
    pub height: u32,
}

/// The canonical persisted representation of one page's content.
///
/// Immutable once written: the driver treats an existing record file as a
/// cache entry and never recomputes it unless the file is removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageRecord {
    pub schema_version: String,
    /// Zero-based page index (same value as each item's `page_index`).
    pub page: usize,
    pub size: PageSize,
    pub items: Vec<Block>,
    /// Tables detected on the page. Omitted from JSON when empty so
    /// table-less records keep the minimal schema.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tables: Vec<Table>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_serializes_in_schema_field_order() {
        let block = Block {
            block_id: "p0_b0".into(),
            text: "World".into(),
            confidence: 0.95,
            bbox: [10, 50, 120, 70],
            page_index: 0,
        };
        let json = serde_json::to_string(&block).unwrap();
        let id_pos = json.find("block_id").unwrap();
        let text_pos = json.find("\"text\"").unwrap();
        let conf_pos = json.find("confidence").unwrap();
        let bbox_pos = json.find("bbox").unwrap();
        let page_pos = json.find("page_index").unwrap();
        assert!(id_pos < text_pos && text_pos < conf_pos && conf_pos < bbox_pos);
        assert!(bbox_pos < page_pos);
    }

    #[test]
    fn empty_tables_are_omitted_from_json() {
        let record = PageRecord {
            schema_version: SCHEMA_VERSION.into(),
            page: 0,
            size: PageSize {
                width: 200,
                height: 100,
            },
            items: vec![],
            tables: vec![],
        };
        let json = serde_json::to_string(&record).unwrap();
        assert!(!json.contains("tables"), "got: {json}");
    }

    #[test]
    fn record_with_tables_round_trips() {
        let record = PageRecord {
            schema_version: SCHEMA_VERSION.into(),
            page: 2,
            size: PageSize {
                width: 612,
                height: 792,
            },
            items: vec![],
            tables: vec![Table {
                bbox: [50, 100, 500, 300],
                cells: vec![
                    vec!["a".into(), "b".into()],
                    vec!["c".into(), String::new()],
                ],
            }],
        };
        let json = serde_json::to_string_pretty(&record).unwrap();
        let back: PageRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn full_page_helper_spans_dimensions() {
        let raw = RawBlock::full_page("Hello", 1.0, 612, 792);
        assert_eq!(raw.bbox, [0, 0, 612, 792]);
        assert_eq!(raw.confidence, 1.0);
    }
}
