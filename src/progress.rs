//! Progress-callback trait for per-page driver events.
//!
//! Inject an [`Arc<dyn PipelineProgressCallback>`] via
//! [`crate::config::PipelineConfigBuilder::progress`] to receive events as
//! the driver works through a document.
//!
//! # Why callbacks instead of channels?
//!
//! The callback approach is the least-invasive integration point: callers
//! can forward events to a terminal progress bar, a log file, or a status
//! endpoint without the library knowing anything about how the host
//! application communicates. The trait is `Send + Sync` so a config can be
//! shared across threads even though the driver itself processes pages
//! strictly one at a time.

use std::sync::Arc;

/// Called by the document driver as it processes each page.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Pages are processed sequentially, so calls arrive
/// in page order.
pub trait PipelineProgressCallback: Send + Sync {
    /// Called once after the document is opened, before any page is
    /// processed.
    fn on_document_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called just before a page's extraction path is decided.
    fn on_page_start(&self, page_index: usize, total_pages: usize) {
        let _ = (page_index, total_pages);
    }

    /// Called when a page record already existed on disk and the page was
    /// skipped without any work.
    fn on_page_skipped(&self, page_index: usize, total_pages: usize) {
        let _ = (page_index, total_pages);
    }

    /// Called when a page's record was written.
    ///
    /// `recognized` is false when the native text layer was used.
    fn on_page_complete(
        &self,
        page_index: usize,
        total_pages: usize,
        recognized: bool,
        duration_ms: u64,
    ) {
        let _ = (page_index, total_pages, recognized, duration_ms);
    }

    /// Called when a page failed and its output was skipped.
    fn on_page_error(&self, page_index: usize, total_pages: usize, error: &str) {
        let _ = (page_index, total_pages, error);
    }

    /// Called once after the last page has been attempted.
    fn on_document_complete(&self, total_pages: usize, written: usize) {
        let _ = (total_pages, written);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl PipelineProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in
/// [`crate::config::PipelineConfig`].
pub type ProgressCallback = Arc<dyn PipelineProgressCallback>;
