//! Native text layer access and table detection.
//!
//! A page with an embedded, already-decoded text layer never needs a
//! recognition backend: its text is authoritative (confidence 1.0) and
//! free. This module reads that layer through pdfium and, when text is
//! present, looks for tabular structure in the positioned text spans.
//!
//! Everything here is read-only: no page is ever rendered on this path.
//!
//! ## Table detection
//!
//! The detector is alignment-based (the stream flavour of table finding):
//! spans are grouped into rows by vertical position, and a run of
//! consecutive multi-span rows whose spans settle into at least two
//! disjoint horizontal bands is a table. Ruling lines are ignored — many
//! real-world tables have none, and text alignment is what a reader keys
//! on anyway.

use crate::block::Table;
use pdfium_render::prelude::*;

/// A positioned piece of native text, in top-left-origin page points.
///
/// Decoupled from pdfium types so the table detector is a pure function
/// that unit tests can feed synthetic layouts.
#[derive(Debug, Clone, PartialEq)]
pub struct TextSpan {
    pub text: String,
    /// `[x0, y0, x1, y1]`, origin top-left, page points.
    pub bbox: [f32; 4],
}

impl TextSpan {
    fn x_center(&self) -> f32 {
        (self.bbox[0] + self.bbox[2]) / 2.0
    }

    fn y_center(&self) -> f32 {
        (self.bbox[1] + self.bbox[3]) / 2.0
    }

    fn height(&self) -> f32 {
        self.bbox[3] - self.bbox[1]
    }
}

/// Extract the page's embedded text, trimmed.
///
/// An empty string signals "no native layer; fall back to recognition".
pub fn page_text(page: &PdfPage) -> Result<String, PdfiumError> {
    Ok(page.text()?.all().trim().to_string())
}

/// Extract positioned text spans in top-left-origin page points.
///
/// pdfium reports rectangles with a bottom-left origin; flipping against
/// the page height puts them in the same space as every other bbox in
/// the output schema.
pub fn text_spans(page: &PdfPage) -> Result<Vec<TextSpan>, PdfiumError> {
    let page_height = page.height().value;
    let text = page.text()?;

    let mut spans = Vec::new();
    for segment in text.segments().iter() {
        let content = segment.text();
        if content.trim().is_empty() {
            continue;
        }
        let bounds = segment.bounds();
        spans.push(TextSpan {
            text: content.trim().to_string(),
            bbox: [
                bounds.left().value,
                page_height - bounds.top().value,
                bounds.right().value,
                page_height - bounds.bottom().value,
            ],
        });
    }
    Ok(spans)
}

/// Detect tables in positioned text spans. Pure function, no I/O.
///
/// Returns each detected table as a rectangular cell matrix plus its
/// bounding geometry. Cells that align into the same row and column are
/// joined with a space; positions with no span become empty strings.
pub fn detect_tables(spans: &[TextSpan]) -> Vec<Table> {
    let rows = group_into_rows(spans);

    // A table is a run of >= 2 consecutive rows that each carry >= 2 spans.
    let mut tables = Vec::new();
    let mut run: Vec<&Vec<TextSpan>> = Vec::new();
    for row in &rows {
        if row.len() >= 2 {
            run.push(row);
            continue;
        }
        if run.len() >= 2 {
            tables.extend(table_from_run(&run));
        }
        run.clear();
    }
    if run.len() >= 2 {
        tables.extend(table_from_run(&run));
    }
    tables
}

/// Group spans into visual rows by vertical proximity.
///
/// Spans are sorted by vertical center; a span joins the current row when
/// its center sits within half a typical span height of the row's center.
fn group_into_rows(spans: &[TextSpan]) -> Vec<Vec<TextSpan>> {
    let mut sorted: Vec<TextSpan> = spans.to_vec();
    sorted.sort_by(|a, b| a.y_center().total_cmp(&b.y_center()));

    let mut rows: Vec<Vec<TextSpan>> = Vec::new();
    for span in sorted {
        let tolerance = span.height().max(1.0) * 0.5;
        match rows.last_mut() {
            Some(row) if (span.y_center() - row_center(row)).abs() <= tolerance => {
                row.push(span);
            }
            _ => rows.push(vec![span]),
        }
    }
    for row in &mut rows {
        row.sort_by(|a, b| a.bbox[0].total_cmp(&b.bbox[0]));
    }
    rows
}

fn row_center(row: &[TextSpan]) -> f32 {
    row.iter().map(|s| s.y_center()).sum::<f32>() / row.len() as f32
}

/// Turn a run of candidate rows into a table, if its spans align into at
/// least two column bands.
fn table_from_run(run: &[&Vec<TextSpan>]) -> Option<Table> {
    // Merge the horizontal extents of every span into disjoint bands.
    // Prose masquerading as rows collapses into a single wide band here
    // and is rejected; genuinely tabular text leaves gaps between columns.
    let mut intervals: Vec<(f32, f32)> = run
        .iter()
        .flat_map(|row| row.iter().map(|s| (s.bbox[0], s.bbox[2])))
        .collect();
    intervals.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut bands: Vec<(f32, f32)> = Vec::new();
    for (start, end) in intervals {
        match bands.last_mut() {
            Some(band) if start <= band.1 => band.1 = band.1.max(end),
            _ => bands.push((start, end)),
        }
    }
    if bands.len() < 2 {
        return None;
    }

    // Rectangular matrix: one column per band, rows in reading order.
    let mut cells = vec![vec![String::new(); bands.len()]; run.len()];
    for (row_idx, row) in run.iter().enumerate() {
        for span in row.iter() {
            let col = bands
                .iter()
                .position(|&(start, end)| span.x_center() >= start && span.x_center() <= end)?;
            let cell = &mut cells[row_idx][col];
            if cell.is_empty() {
                *cell = span.text.clone();
            } else {
                cell.push(' ');
                cell.push_str(&span.text);
            }
        }
    }

    let mut x0 = f32::MAX;
    let mut y0 = f32::MAX;
    let mut x1 = f32::MIN;
    let mut y1 = f32::MIN;
    for span in run.iter().flat_map(|row| row.iter()) {
        x0 = x0.min(span.bbox[0]);
        y0 = y0.min(span.bbox[1]);
        x1 = x1.max(span.bbox[2]);
        y1 = y1.max(span.bbox[3]);
    }

    Some(Table {
        bbox: [
            x0.max(0.0).round() as u32,
            y0.max(0.0).round() as u32,
            x1.max(0.0).round() as u32,
            y1.max(0.0).round() as u32,
        ],
        cells,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(text: &str, x0: f32, y0: f32, x1: f32, y1: f32) -> TextSpan {
        TextSpan {
            text: text.into(),
            bbox: [x0, y0, x1, y1],
        }
    }

    /// A 3×2 grid of aligned spans: one table with rectangular cells.
    #[test]
    fn aligned_grid_yields_one_table() {
        let spans = vec![
            span("Name", 50.0, 100.0, 120.0, 112.0),
            span("Amount", 200.0, 100.0, 270.0, 112.0),
            span("Widget", 50.0, 120.0, 115.0, 132.0),
            span("42", 200.0, 120.0, 220.0, 132.0),
            span("Gadget", 50.0, 140.0, 118.0, 152.0),
            span("7", 200.0, 140.0, 210.0, 152.0),
        ];

        let tables = detect_tables(&spans);
        assert_eq!(tables.len(), 1);
        let t = &tables[0];
        assert_eq!(t.cells.len(), 3);
        assert!(t.cells.iter().all(|row| row.len() == 2));
        assert_eq!(t.cells[0], vec!["Name", "Amount"]);
        assert_eq!(t.cells[1], vec!["Widget", "42"]);
        assert_eq!(t.cells[2], vec!["Gadget", "7"]);
        assert_eq!(t.bbox, [50, 100, 270, 152]);
    }

    /// Single-span prose lines never become a table.
    #[test]
    fn prose_lines_yield_no_tables() {
        let spans = vec![
            span("This is the first paragraph line.", 50.0, 100.0, 400.0, 112.0),
            span("And here the text simply continues on.", 50.0, 120.0, 420.0, 132.0),
            span("A third line of running prose.", 50.0, 140.0, 380.0, 152.0),
        ];
        assert!(detect_tables(&spans).is_empty());
    }

    /// Two-span rows whose extents overlap horizontally collapse into a
    /// single band and are rejected.
    #[test]
    fn staggered_spans_yield_no_tables() {
        let spans = vec![
            span("alpha", 0.0, 100.0, 50.0, 112.0),
            span("beta", 40.0, 100.0, 100.0, 112.0),
            span("gamma", 30.0, 120.0, 70.0, 132.0),
            span("delta", 60.0, 120.0, 120.0, 132.0),
        ];
        assert!(detect_tables(&spans).is_empty());
    }

    /// A missing cell leaves an empty string, keeping the matrix
    /// rectangular.
    #[test]
    fn missing_cell_is_empty_string() {
        let spans = vec![
            span("A", 50.0, 100.0, 70.0, 112.0),
            span("B", 200.0, 100.0, 220.0, 112.0),
            span("C", 50.0, 120.0, 70.0, 132.0),
            span("D", 200.0, 120.0, 220.0, 132.0),
            // Third row only fills the second column; the row still has
            // two spans so the run continues.
            span("E", 200.0, 140.0, 220.0, 152.0),
            span("F", 300.0, 140.0, 320.0, 152.0),
        ];
        let tables = detect_tables(&spans);
        assert_eq!(tables.len(), 1);
        let t = &tables[0];
        assert_eq!(t.cells.len(), 3);
        assert!(t.cells.iter().all(|row| row.len() == 3));
        assert_eq!(t.cells[2][0], "");
        assert_eq!(t.cells[2][1], "E");
        assert_eq!(t.cells[2][2], "F");
    }

    /// Rows separated by a prose line form two independent runs; a
    /// one-row run is not a table.
    #[test]
    fn prose_interruption_splits_runs() {
        let spans = vec![
            span("A", 50.0, 100.0, 70.0, 112.0),
            span("B", 200.0, 100.0, 220.0, 112.0),
            span("An interrupting paragraph line.", 50.0, 120.0, 400.0, 132.0),
            span("C", 50.0, 140.0, 70.0, 152.0),
            span("D", 200.0, 140.0, 220.0, 152.0),
        ];
        assert!(detect_tables(&spans).is_empty());
    }

    #[test]
    fn empty_input_is_fine() {
        assert!(detect_tables(&[]).is_empty());
    }
}
