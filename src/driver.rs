//! The Document Driver: per-page orchestration of the extraction
//! pipeline.
//!
//! ## The per-page decision
//!
//! For every page of a paginated document the driver asks one question:
//! can this page's text be obtained losslessly from the native text
//! layer? If yes, that layer is authoritative — one full-page block at
//! confidence 1.0, plus table detection over the positioned text. If not,
//! the page is rasterised (cached to disk) and handed to the recognition
//! backend. Exactly one path runs per page, never both.
//!
//! ## Idempotency
//!
//! A page record on disk is a cache entry keyed by page index. Before any
//! work on page `i` the driver checks `page_<NN>.json`; an existing file
//! skips the page entirely — no render, no backend call. Interrupting a
//! long run and restarting it resumes at the first missing record.
//! Invalidation is external: delete the record file.
//!
//! ## Failure containment
//!
//! A failing page is logged, counted, and skipped; the remaining pages
//! are still processed and written. Only persistence failures (the
//! output directory or a record file cannot be written) abort the
//! document, because a document whose records cannot land on disk is not
//! done in any useful sense.
//!
//! ## Geometry convention
//!
//! Records always carry the page's *native* dimensions — PDF points for
//! PDF pages, original pixel dimensions for standalone images. When
//! recognition ran on a rendered or downscaled raster, backend geometry
//! is rescaled back into native space here, so `size` and every `bbox`
//! in a record share one coordinate space and consumers never need to
//! know whether downscaling occurred.

use crate::backend::{resolve_backend, Recognition, RecognitionBackend};
use crate::block::{PageRecord, RawBlock, Table};
use crate::config::PipelineConfig;
use crate::error::{PageError, Pdf2BlocksError};
use crate::pipeline::{assemble::assemble, input, native, render};
use pdfium_render::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Aggregate counts for one processed document.
///
/// `total_pages` is the page count of the document itself;
/// `native_pages + recognized_pages + skipped_pages + failed_pages ==
/// total_pages` after a completed run. A document that could not be
/// opened at all (corrupt, password-protected) reports `failed_pages ==
/// 1` with `total_pages == 0`, since its page count is unknowable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DocumentSummary {
    /// Normalized document identifier (filename stem).
    pub document: String,
    pub total_pages: usize,
    /// Pages whose text came from the native text layer.
    pub native_pages: usize,
    /// Pages that went through the recognition backend.
    pub recognized_pages: usize,
    /// Pages skipped because their record already existed on disk.
    pub skipped_pages: usize,
    /// Pages that failed and were skipped without output.
    pub failed_pages: usize,
    pub duration_ms: u64,
}

impl DocumentSummary {
    /// Pages written by this run (excludes cache hits).
    pub fn written_pages(&self) -> usize {
        self.native_pages + self.recognized_pages
    }
}

/// Process one input file — a PDF document or a PNG/JPEG image — into
/// per-page JSON records under `output_root/<stem>/page_<NN>.json`.
///
/// Unsupported input types are a warn-and-skip no-op returning an empty
/// summary, so a batch caller can feed a whole directory without
/// pre-filtering. Corrupt inputs behave the same way. An unknown backend
/// selector is fatal and raised before any page is touched.
pub fn process(
    input_path: &Path,
    image_cache_dir: &Path,
    output_root: &Path,
    config: &PipelineConfig,
) -> Result<DocumentSummary, Pdf2BlocksError> {
    let start = Instant::now();

    // ── Step 1: Classify input ───────────────────────────────────────────
    let kind = match input::classify(input_path)? {
        Some(kind) => kind,
        None => {
            warn!("Skipping unsupported file type: {}", input_path.display());
            return Ok(DocumentSummary::default());
        }
    };

    // ── Step 2: Resolve backend (fatal on bad selector) ──────────────────
    let backend = resolve_backend(config)?;

    // ── Step 3: Create the output directory ──────────────────────────────
    let stem = input::document_stem(input_path);
    let out_dir = output_root.join(&stem);
    std::fs::create_dir_all(&out_dir).map_err(|e| Pdf2BlocksError::OutputWriteFailed {
        path: out_dir.clone(),
        source: e,
    })?;

    info!(
        "Processing {} '{}' with backend '{}'",
        if kind.is_image() { "image" } else { "document" },
        input_path.display(),
        backend.name()
    );

    // ── Step 4: Run the per-page loop ────────────────────────────────────
    let mut summary = if kind.is_image() {
        process_image(input_path, &out_dir, &backend, config)
    } else {
        let image_dir = image_cache_dir.join(&stem);
        process_pdf(input_path, &image_dir, &out_dir, &backend, config)
    }?;

    summary.document = stem;
    summary.duration_ms = start.elapsed().as_millis() as u64;
    info!(
        "Document '{}' done: {} native, {} recognized, {} skipped, {} failed ({}ms)",
        summary.document,
        summary.native_pages,
        summary.recognized_pages,
        summary.skipped_pages,
        summary.failed_pages,
        summary.duration_ms
    );
    Ok(summary)
}

// ── PDF path ─────────────────────────────────────────────────────────────

fn process_pdf(
    pdf_path: &Path,
    image_dir: &Path,
    out_dir: &Path,
    backend: &Arc<dyn RecognitionBackend>,
    config: &PipelineConfig,
) -> Result<DocumentSummary, Pdf2BlocksError> {
    let pdfium = Pdfium::default();
    let document = match pdfium.load_pdf_from_file(pdf_path, config.password.as_deref()) {
        Ok(doc) => doc,
        Err(e) => {
            // Input validation failure: one bad file must not abort a
            // batch, but the summary has to show the document failed.
            warn!("Skipping document: {}", classify_load_error(pdf_path, &e));
            return Ok(DocumentSummary {
                failed_pages: 1,
                ..Default::default()
            });
        }
    };

    let total_pages = document.pages().len() as usize;
    debug!("Document has {total_pages} pages");
    if let Some(ref cb) = config.progress {
        cb.on_document_start(total_pages);
    }

    let mut summary = DocumentSummary {
        total_pages,
        ..Default::default()
    };

    for page_index in 0..total_pages {
        let record_path = record_path(out_dir, page_index);
        if record_path.exists() {
            debug!("Page {page_index:02} already processed, skipping");
            summary.skipped_pages += 1;
            if let Some(ref cb) = config.progress {
                cb.on_page_skipped(page_index, total_pages);
            }
            continue;
        }

        if let Some(ref cb) = config.progress {
            cb.on_page_start(page_index, total_pages);
        }
        let page_start = Instant::now();

        match process_pdf_page(&document, page_index, image_dir, backend, config) {
            Ok((record, recognized)) => {
                // Persistence failures are document-fatal, by design.
                write_record(&record, &record_path)?;
                let elapsed_ms = page_start.elapsed().as_millis() as u64;
                let source = if recognized { backend.name() } else { "native" };
                if recognized {
                    summary.recognized_pages += 1;
                } else {
                    summary.native_pages += 1;
                }
                info!(
                    "Page {page_index:02} ({source}) → {} ({elapsed_ms}ms)",
                    record_path.display()
                );
                if let Some(ref cb) = config.progress {
                    cb.on_page_complete(page_index, total_pages, recognized, elapsed_ms);
                }
            }
            Err(page_err) => {
                warn!("{page_err} — continuing with next page");
                summary.failed_pages += 1;
                if let Some(ref cb) = config.progress {
                    cb.on_page_error(page_index, total_pages, &page_err.to_string());
                }
            }
        }
    }

    if let Some(ref cb) = config.progress {
        cb.on_document_complete(total_pages, summary.written_pages());
    }
    Ok(summary)
}

/// Run the extraction decision for one PDF page.
///
/// Returns the assembled record and whether the recognition path was
/// taken (`false` = native text layer).
fn process_pdf_page(
    document: &PdfDocument,
    page_index: usize,
    image_dir: &Path,
    backend: &Arc<dyn RecognitionBackend>,
    config: &PipelineConfig,
) -> Result<(PageRecord, bool), PageError> {
    let pages = document.pages();
    let page = pages
        .get(page_index as u16)
        .map_err(|e| PageError::NativeExtractFailed {
            page: page_index,
            detail: format!("{e:?}"),
        })?;

    let width = page.width().value.round().max(0.0) as u32;
    let height = page.height().value.round().max(0.0) as u32;

    let text = native::page_text(&page).map_err(|e| PageError::NativeExtractFailed {
        page: page_index,
        detail: format!("{e:?}"),
    })?;

    if !text.is_empty() {
        // Native path: the embedded layer is authoritative.
        let tables = if config.detect_tables {
            match native::text_spans(&page) {
                Ok(spans) => native::detect_tables(&spans),
                Err(e) => {
                    // Malformed span data loses the tables, not the page.
                    warn!("Page {page_index}: table detection skipped: {e:?}");
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };
        let raw = vec![RawBlock::full_page(text, 1.0, width, height)];
        return Ok((assemble(raw, tables, page_index, width, height), false));
    }

    // Recognition fallback: render (cached), recognize, rescale to the
    // page's native point space.
    let (image, _png_path) = render::render_page_cached(document, page_index, config, image_dir)?;
    let recognition = backend
        .recognize(&image)
        .map_err(|e| PageError::RecognitionFailed {
            page: page_index,
            backend: backend.name().to_string(),
            detail: e.to_string(),
        })?;
    let (items, tables) = rescale_recognition(
        recognition,
        (image.width(), image.height()),
        (width, height),
    );
    Ok((assemble(items, tables, page_index, width, height), true))
}

// ── Image path ───────────────────────────────────────────────────────────

/// A standalone image is a one-page document with `page_index` 0. There
/// is no native layer to consult, so recognition always runs — on a
/// bounded downscale, with geometry rescaled back to the original pixel
/// dimensions.
fn process_image(
    image_path: &Path,
    out_dir: &Path,
    backend: &Arc<dyn RecognitionBackend>,
    config: &PipelineConfig,
) -> Result<DocumentSummary, Pdf2BlocksError> {
    let mut summary = DocumentSummary {
        total_pages: 1,
        ..Default::default()
    };

    let record_path = record_path(out_dir, 0);
    if record_path.exists() {
        debug!("Image already processed, skipping");
        summary.skipped_pages = 1;
        // Same event sequence a one-page PDF cache hit produces.
        if let Some(ref cb) = config.progress {
            cb.on_document_start(1);
            cb.on_page_skipped(0, 1);
            cb.on_document_complete(1, 0);
        }
        return Ok(summary);
    }

    if let Some(ref cb) = config.progress {
        cb.on_document_start(1);
        cb.on_page_start(0, 1);
    }
    let page_start = Instant::now();

    let image = match image::open(image_path) {
        Ok(img) => img,
        Err(e) => {
            warn!("Skipping undecodable image {}: {e}", image_path.display());
            summary.failed_pages = 1;
            if let Some(ref cb) = config.progress {
                cb.on_page_error(0, 1, &e.to_string());
            }
            return Ok(summary);
        }
    };
    let (width, height) = (image.width(), image.height());

    let scaled = render::bounded(image, config.max_recognition_pixels);
    match backend.recognize(&scaled) {
        Ok(recognition) => {
            let (items, tables) = rescale_recognition(
                recognition,
                (scaled.width(), scaled.height()),
                (width, height),
            );
            let record = assemble(items, tables, 0, width, height);
            write_record(&record, &record_path)?;
            let elapsed_ms = page_start.elapsed().as_millis() as u64;
            summary.recognized_pages = 1;
            info!(
                "Page 00 ({}) → {} ({elapsed_ms}ms)",
                backend.name(),
                record_path.display()
            );
            if let Some(ref cb) = config.progress {
                cb.on_page_complete(0, 1, true, elapsed_ms);
            }
        }
        Err(e) => {
            let page_err = PageError::RecognitionFailed {
                page: 0,
                backend: backend.name().to_string(),
                detail: e.to_string(),
            };
            warn!("{page_err}");
            summary.failed_pages = 1;
            if let Some(ref cb) = config.progress {
                cb.on_page_error(0, 1, &page_err.to_string());
            }
        }
    }

    if let Some(ref cb) = config.progress {
        cb.on_document_complete(1, summary.written_pages());
    }
    Ok(summary)
}

/// Classify a pdfium document-load failure.
///
/// pdfium reports load failures through one opaque error type; the
/// password case is worth telling apart because its remedy (supply the
/// password) differs from a genuinely corrupt file.
fn classify_load_error(path: &Path, err: &PdfiumError) -> Pdf2BlocksError {
    let detail = format!("{err:?}");
    if detail.to_ascii_lowercase().contains("password") {
        Pdf2BlocksError::PasswordRequired {
            path: path.to_path_buf(),
        }
    } else {
        Pdf2BlocksError::CorruptDocument {
            path: path.to_path_buf(),
            detail,
        }
    }
}

// ── Shared helpers ───────────────────────────────────────────────────────

/// Record file path for a page: zero-padded two-digit page index.
pub fn record_path(out_dir: &Path, page_index: usize) -> PathBuf {
    out_dir.join(format!("page_{page_index:02}.json"))
}

/// Map recognition geometry from the raster the backend saw into the
/// page's native coordinate space.
///
/// Identity when the spaces already match (e.g. an image that needed no
/// downscaling), so the common case costs nothing and loses no
/// precision.
fn rescale_recognition(
    recognition: Recognition,
    from: (u32, u32),
    to: (u32, u32),
) -> (Vec<RawBlock>, Vec<Table>) {
    if from == to || from.0 == 0 || from.1 == 0 {
        return (recognition.items, recognition.tables);
    }
    let sx = to.0 as f64 / from.0 as f64;
    let sy = to.1 as f64 / from.1 as f64;
    let map = |bbox: [u32; 4]| -> [u32; 4] {
        [
            ((bbox[0] as f64 * sx).round() as u32).min(to.0),
            ((bbox[1] as f64 * sy).round() as u32).min(to.1),
            ((bbox[2] as f64 * sx).round() as u32).min(to.0),
            ((bbox[3] as f64 * sy).round() as u32).min(to.1),
        ]
    };

    let items = recognition
        .items
        .into_iter()
        .map(|mut b| {
            b.bbox = map(b.bbox);
            b
        })
        .collect();
    let tables = recognition
        .tables
        .into_iter()
        .map(|mut t| {
            t.bbox = map(t.bbox);
            t
        })
        .collect();
    (items, tables)
}

/// Write a page record as indented UTF-8 JSON via temp file + rename.
///
/// Atomic so a crash mid-write can never leave a truncated record that a
/// later run would treat as a valid cache entry.
fn write_record(record: &PageRecord, path: &Path) -> Result<(), Pdf2BlocksError> {
    let json = serde_json::to_string_pretty(record)
        .map_err(|e| Pdf2BlocksError::Internal(format!("record serialization: {e}")))?;

    let dir = path.parent().ok_or_else(|| {
        Pdf2BlocksError::Internal(format!("record path has no parent: {}", path.display()))
    })?;
    let mut tmp = tempfile::Builder::new()
        .suffix(".json")
        .tempfile_in(dir)
        .map_err(|e| Pdf2BlocksError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;
    use std::io::Write;
    tmp.write_all(json.as_bytes())
        .and_then(|_| tmp.write_all(b"\n"))
        .map_err(|e| Pdf2BlocksError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;
    tmp.persist(path)
        .map_err(|e| Pdf2BlocksError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e.error,
        })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::PageSize;

    #[test]
    fn rescale_is_identity_when_spaces_match() {
        let recognition = Recognition {
            items: vec![RawBlock {
                text: "World".into(),
                confidence: 0.95,
                bbox: [10, 50, 120, 70],
            }],
            tables: vec![],
        };
        let (items, _) = rescale_recognition(recognition, (200, 100), (200, 100));
        assert_eq!(items[0].bbox, [10, 50, 120, 70]);
    }

    #[test]
    fn rescale_maps_raster_to_native_space() {
        let recognition = Recognition {
            items: vec![RawBlock {
                text: "t".into(),
                confidence: 0.5,
                bbox: [0, 0, 512, 256],
            }],
            tables: vec![Table {
                bbox: [128, 64, 256, 128],
                cells: vec![],
            }],
        };
        // Backend saw a 512x256 downscale of a 1024x512 original.
        let (items, tables) = rescale_recognition(recognition, (512, 256), (1024, 512));
        assert_eq!(items[0].bbox, [0, 0, 1024, 512]);
        assert_eq!(tables[0].bbox, [256, 128, 512, 256]);
    }

    #[test]
    fn rescale_clamps_to_target_dimensions() {
        let recognition = Recognition {
            items: vec![RawBlock {
                text: "t".into(),
                confidence: 0.5,
                // Slightly out of bounds, as sloppy backends produce.
                bbox: [0, 0, 600, 300],
            }],
            tables: vec![],
        };
        let (items, _) = rescale_recognition(recognition, (512, 256), (1024, 512));
        assert_eq!(items[0].bbox, [0, 0, 1024, 512]);
    }

    #[test]
    fn record_path_is_zero_padded() {
        let dir = Path::new("/tmp/out/doc");
        assert!(record_path(dir, 0).ends_with("page_00.json"));
        assert!(record_path(dir, 7).ends_with("page_07.json"));
        assert!(record_path(dir, 12).ends_with("page_12.json"));
    }

    #[test]
    fn write_record_round_trips() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("page_00.json");
        let record = assemble(
            vec![RawBlock::full_page("Hello", 1.0, 612, 792)],
            vec![],
            0,
            612,
            792,
        );
        write_record(&record, &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"schema_version\": \"1.0\""));
        let back: PageRecord = serde_json::from_str(&text).unwrap();
        assert_eq!(back.page, 0);
        assert_eq!(back.size, PageSize { width: 612, height: 792 });
        assert_eq!(back.items[0].block_id, "p0_b0");
    }

    #[test]
    fn load_errors_classify_password_apart_from_corruption() {
        let path = Path::new("/tmp/locked.pdf");

        let err = classify_load_error(
            path,
            &PdfiumError::PdfiumLibraryInternalError(PdfiumInternalError::PasswordError),
        );
        assert!(matches!(err, Pdf2BlocksError::PasswordRequired { .. }));

        let err = classify_load_error(
            path,
            &PdfiumError::PdfiumLibraryInternalError(PdfiumInternalError::FormatError),
        );
        match err {
            Pdf2BlocksError::CorruptDocument { detail, .. } => {
                assert!(detail.contains("FormatError"));
            }
            other => panic!("expected CorruptDocument, got {other}"),
        }
    }

    #[test]
    fn unsupported_input_is_a_noop() {
        let dir = tempfile::TempDir::new().unwrap();
        let input = dir.path().join("notes.txt");
        std::fs::write(&input, "plain text").unwrap();

        let config = PipelineConfig::default();
        let summary = process(
            &input,
            &dir.path().join("cache"),
            &dir.path().join("out"),
            &config,
        )
        .unwrap();

        assert_eq!(summary, DocumentSummary::default());
        assert!(!dir.path().join("out").exists());
    }
}
