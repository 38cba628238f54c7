//! # pdf2blocks
//!
//! Extract structured text blocks from PDFs and images into page-indexed
//! JSON records.
//!
//! ## Why this crate?
//!
//! Downstream document systems (search indexing, redlining, review UIs)
//! need text with *identity and geometry*, not a flat string: every piece
//! of text addressable by a stable id, positioned on its page, with an
//! honest confidence attached. This crate produces exactly that — one
//! JSON record per page, written incrementally so a 500-page run that
//! dies at page 300 resumes at page 300.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF / PNG / JPEG
//!  │
//!  ├─ 1. Classify  extension + magic bytes → document or image path
//!  ├─ 2. Decide    per page: native text layer present?
//!  │     ├─ yes →  native text, confidence 1.0 (+ table detection)
//!  │     └─ no  →  render to PNG (cached) → recognition backend
//!  ├─ 3. Assemble  stamp block ids (p<page>_b<ordinal>), fixed schema
//!  └─ 4. Persist   atomic write of page_<NN>.json, one file per page
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf2blocks::{process, PipelineConfig};
//! use std::path::Path;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PipelineConfig::default();
//!     let summary = process(
//!         Path::new("report.pdf"),
//!         Path::new("cache/images"),
//!         Path::new("out"),
//!         &config,
//!     )?;
//!     println!(
//!         "{}: {} pages written, {} skipped",
//!         summary.document,
//!         summary.written_pages(),
//!         summary.skipped_pages
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Idempotency
//!
//! Page records double as cache entries: a page whose `page_<NN>.json`
//! already exists is skipped without rendering or recognition. Re-running
//! over a complete output directory is a no-op; deleting a single record
//! reprocesses exactly that page. Rendered page images are cached the
//! same way under the image cache directory.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2blocks` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! pdf2blocks = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod backend;
pub mod block;
pub mod config;
pub mod driver;
pub mod error;
pub mod pipeline;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use backend::{resolve_backend, PatternBackend, Recognition, RecognitionBackend, VlmBackend};
pub use block::{Block, PageRecord, PageSize, RawBlock, Table, SCHEMA_VERSION};
pub use config::{BackendKind, PipelineConfig, PipelineConfigBuilder, BACKEND_ENV};
pub use driver::{process, DocumentSummary};
pub use error::{BackendError, PageError, Pdf2BlocksError};
pub use progress::{NoopProgressCallback, PipelineProgressCallback, ProgressCallback};
