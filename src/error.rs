//! Error types for the pdf2blocks library.
//!
//! Three distinct error types reflect three distinct failure modes:
//!
//! * [`Pdf2BlocksError`] — **Fatal**: the document cannot be processed at
//!   all (bad input path, unknown recognition backend, output directory not
//!   writable). Returned as `Err(Pdf2BlocksError)` from the top-level
//!   driver functions.
//!
//! * [`PageError`] — **Non-fatal**: a single page failed (render glitch,
//!   backend invocation failure) but the remaining pages are fine. The
//!   driver logs it, counts it in the [`crate::driver::DocumentSummary`],
//!   and continues with the next page so partial results are still written.
//!
//! * [`BackendError`] — internal to a recognition backend (HTTP failure,
//!   image encoding, malformed reply). The driver wraps it into a
//!   [`PageError::RecognitionFailed`] so every backend surfaces failures
//!   the same way regardless of its transport.
//!
//! The separation lets callers decide their own tolerance: abort on a
//! fatal error, or inspect the summary counts after a partial run.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the pdf2blocks library.
///
/// Page-level failures use [`PageError`] and are tallied in
/// [`crate::driver::DocumentSummary::failed_pages`] rather than propagated
/// here.
#[derive(Debug, Error)]
pub enum Pdf2BlocksError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Input file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file has a supported extension but its content does not match
    /// (wrong magic bytes, truncated header).
    #[error("File content does not match its declared type: '{path}'\nFirst bytes: {magic:?}")]
    ContentMismatch { path: PathBuf, magic: [u8; 4] },

    // ── Document errors ───────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("Document '{path}' is corrupt: {detail}")]
    CorruptDocument { path: PathBuf, detail: String },

    /// PDF requires a password but none (or a wrong one) was provided.
    #[error("Document '{path}' is encrypted.\nProvide the user password via configuration.")]
    PasswordRequired { path: PathBuf },

    // ── Backend configuration errors ──────────────────────────────────────
    /// The recognition backend selector named an unknown implementation.
    ///
    /// Fatal at startup: the process must not run with an invalid backend
    /// selection, so this is raised before any page is touched.
    #[error("Unknown recognition backend '{name}'.\nKnown backends: pattern, vlm.")]
    UnknownBackend { name: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write a page record or cache file.
    ///
    /// Persistence failures are document-level: a document cannot be
    /// declared done when its records cannot be written.
    #[error("Failed to write '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single page.
///
/// The driver logs these and skips the page's output; the overall run
/// continues and the document summary reflects that fewer pages were
/// written than exist.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum PageError {
    /// Page rasterisation failed.
    #[error("Page {page}: rasterisation failed: {detail}")]
    RenderFailed { page: usize, detail: String },

    /// The recognition backend failed or returned garbage.
    #[error("Page {page}: recognition backend '{backend}' failed: {detail}")]
    RecognitionFailed {
        page: usize,
        backend: String,
        detail: String,
    },

    /// The native text layer could not be read.
    #[error("Page {page}: native text extraction failed: {detail}")]
    NativeExtractFailed { page: usize, detail: String },
}

/// Errors raised inside a recognition backend.
///
/// Backends are heterogeneous (local pattern matching, remote model
/// inference) — this enum is the one shape they all report through.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The HTTP request to a remote model endpoint failed.
    #[error("request failed: {detail}")]
    Request { detail: String },

    /// The remote endpoint answered with a non-success status.
    #[error("endpoint returned HTTP {code}: {detail}")]
    Status { code: u16, detail: String },

    /// The page image could not be encoded for transport.
    #[error("image encoding failed: {0}")]
    Encode(#[from] image::ImageError),

    /// The backend reply did not have the expected shape.
    #[error("malformed backend reply: {detail}")]
    Malformed { detail: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_backend_display_lists_known_names() {
        let e = Pdf2BlocksError::UnknownBackend {
            name: "tesseract".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("tesseract"), "got: {msg}");
        assert!(msg.contains("pattern"), "got: {msg}");
        assert!(msg.contains("vlm"), "got: {msg}");
    }

    #[test]
    fn page_error_display_names_the_page() {
        let e = PageError::RecognitionFailed {
            page: 3,
            backend: "vlm".into(),
            detail: "connection refused".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("Page 3"));
        assert!(msg.contains("vlm"));
        assert!(msg.contains("connection refused"));
    }

    #[test]
    fn page_error_round_trips_through_json() {
        let e = PageError::RenderFailed {
            page: 7,
            detail: "bitmap allocation".into(),
        };
        let json = serde_json::to_string(&e).unwrap();
        let back: PageError = serde_json::from_str(&json).unwrap();
        assert_eq!(back.to_string(), e.to_string());
    }

    #[test]
    fn backend_status_display() {
        let e = BackendError::Status {
            code: 503,
            detail: "overloaded".into(),
        };
        assert!(e.to_string().contains("503"));
    }
}
