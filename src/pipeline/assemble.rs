//! The Page Assembler: normalise raw extraction output into a canonical
//! page record.
//!
//! This is the only place `page_index` and `block_id` are ever assigned.
//! Backends and the native extractor produce anonymous [`RawBlock`]s; the
//! assembler stamps identity onto them in input order and wraps the
//! result in the fixed record shape. It is a pure function — no I/O, no
//! reordering, no deduplication, no filtering. If a backend returns
//! garbage order, the record preserves garbage order; reading order is
//! the extraction path's contract, not the assembler's.

use crate::block::{Block, PageRecord, PageSize, RawBlock, Table, SCHEMA_VERSION};

/// Wrap raw extraction output into a [`PageRecord`].
///
/// `ordinal` is each item's position in `raw_items`, so
/// `items[i].block_id == "p<page_index>_b<i>"` for every `i`.
pub fn assemble(
    raw_items: Vec<RawBlock>,
    tables: Vec<Table>,
    page_index: usize,
    width: u32,
    height: u32,
) -> PageRecord {
    let items = raw_items
        .into_iter()
        .enumerate()
        .map(|(ordinal, raw)| Block {
            block_id: format!("p{page_index}_b{ordinal}"),
            text: raw.text,
            confidence: raw.confidence,
            bbox: raw.bbox,
            page_index,
        })
        .collect();

    PageRecord {
        schema_version: SCHEMA_VERSION.to_string(),
        page: page_index,
        size: PageSize { width, height },
        items,
        tables,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(text: &str, confidence: f32, bbox: [u32; 4]) -> RawBlock {
        RawBlock {
            text: text.into(),
            confidence,
            bbox,
        }
    }

    #[test]
    fn assigns_ordinal_block_ids_in_input_order() {
        let record = assemble(
            vec![
                raw("first", 0.9, [0, 0, 10, 10]),
                raw("second", 0.8, [0, 20, 10, 30]),
                raw("third", 0.7, [0, 40, 10, 50]),
            ],
            vec![],
            4,
            612,
            792,
        );

        assert_eq!(record.page, 4);
        assert_eq!(record.schema_version, SCHEMA_VERSION);
        for (i, item) in record.items.iter().enumerate() {
            assert_eq!(item.block_id, format!("p4_b{i}"));
            assert_eq!(item.page_index, 4);
        }
        // Input order preserved verbatim.
        let texts: Vec<&str> = record.items.iter().map(|b| b.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second", "third"]);
    }

    #[test]
    fn does_not_deduplicate_or_filter() {
        let record = assemble(
            vec![
                raw("dup", 0.5, [0, 0, 1, 1]),
                raw("dup", 0.5, [0, 0, 1, 1]),
                raw("", 0.0, [0, 0, 0, 0]),
            ],
            vec![],
            0,
            100,
            100,
        );
        assert_eq!(record.items.len(), 3);
        assert_eq!(record.items[0].block_id, "p0_b0");
        assert_eq!(record.items[1].block_id, "p0_b1");
        assert_eq!(record.items[2].block_id, "p0_b2");
    }

    #[test]
    fn empty_input_yields_empty_record() {
        let record = assemble(vec![], vec![], 0, 200, 100);
        assert!(record.items.is_empty());
        assert_eq!(record.size, PageSize { width: 200, height: 100 });
    }

    #[test]
    fn carries_tables_through_untouched() {
        let table = Table {
            bbox: [10, 10, 90, 90],
            cells: vec![vec!["a".into(), "b".into()]],
        };
        let record = assemble(vec![], vec![table.clone()], 1, 612, 792);
        assert_eq!(record.tables, vec![table]);
    }

    #[test]
    fn record_json_round_trip_preserves_order() {
        let record = assemble(
            vec![
                raw("alpha", 1.0, [0, 0, 612, 792]),
                raw("beta", 0.5, [5, 5, 50, 20]),
            ],
            vec![],
            2,
            612,
            792,
        );
        let json = serde_json::to_string_pretty(&record).unwrap();
        let back: PageRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
        let ids: Vec<&str> = back.items.iter().map(|b| b.block_id.as_str()).collect();
        assert_eq!(ids, vec!["p2_b0", "p2_b1"]);
    }
}
