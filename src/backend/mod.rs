//! Recognition backends: pluggable image-to-blocks implementations.
//!
//! The pipeline is backend-agnostic. A backend receives a decoded page
//! image and returns an ordered list of text blocks with geometry and
//! confidence — nothing more. Identity (`page_index`, `block_id`) is
//! assigned later by the assembler, and geometry normalisation to the
//! page's native coordinate space is the driver's job.
//!
//! ## Contract
//!
//! * Blocks come back in intended reading order; the list may be empty.
//! * Geometry is in the input image's pixel coordinate space.
//! * Content may be non-deterministic (model-dependent); the pipeline
//!   validates structure only, never recognition quality.
//! * Backends that understand layout may additionally return structured
//!   [`Table`]s through [`Recognition::tables`] — a dedicated field, not a
//!   serialized payload smuggled through a block's `text`.

pub mod pattern;
pub mod vlm;

use crate::block::{RawBlock, Table};
use crate::config::{BackendKind, PipelineConfig};
use crate::error::{BackendError, Pdf2BlocksError};
use image::DynamicImage;
use std::sync::Arc;
use tracing::debug;

pub use pattern::PatternBackend;
pub use vlm::VlmBackend;

/// Output of one recognition call.
#[derive(Debug, Clone, Default)]
pub struct Recognition {
    /// Text blocks in reading order, geometry in input-image pixels.
    pub items: Vec<RawBlock>,
    /// Structured tables, for backends that detect them. Empty for
    /// backends that only produce flat text.
    pub tables: Vec<Table>,
}

/// A pluggable component that converts a raster image into text blocks.
///
/// Implementations must be `Send + Sync`: the backend instance is
/// constructed once at startup and shared for the lifetime of the
/// process.
pub trait RecognitionBackend: Send + Sync {
    /// Stable identifier used in logs and error messages.
    fn name(&self) -> &'static str;

    /// Recognize text blocks in the given image.
    ///
    /// Calls are blocking; model inference may be slow. The driver invokes
    /// this at most once per page and never concurrently.
    fn recognize(&self, image: &DynamicImage) -> Result<Recognition, BackendError>;
}

/// Resolve the recognition backend, from most-specific to least-specific:
///
/// 1. **Injected instance** (`config.backend`) — the caller constructed
///    the backend entirely; used as-is. This is the test seam and the
///    path front ends use after constructing their backend at startup.
/// 2. **Named selector** (`config.backend_name`) — parsed into a
///    [`BackendKind`]; unknown names fail here, before any page work.
/// 3. **Environment** (`PDF2BLOCKS_BACKEND`) — process-wide selection.
/// 4. **Default** — the pattern backend.
pub fn resolve_backend(
    config: &PipelineConfig,
) -> Result<Arc<dyn RecognitionBackend>, Pdf2BlocksError> {
    if let Some(ref backend) = config.backend {
        debug!("Using injected recognition backend '{}'", backend.name());
        return Ok(Arc::clone(backend));
    }

    let kind = match config.backend_name {
        Some(ref name) => name.parse::<BackendKind>()?,
        None => BackendKind::from_env()?,
    };

    debug!("Constructing recognition backend '{kind}'");
    match kind {
        BackendKind::Pattern => Ok(Arc::new(PatternBackend::default())),
        BackendKind::Vlm => Ok(Arc::new(VlmBackend::from_config(config)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_prefers_injected_instance() {
        let config = PipelineConfig::builder()
            .backend(Arc::new(PatternBackend::default()))
            // Would be fatal if the name were consulted first.
            .backend_name("pattern")
            .build()
            .unwrap();
        let backend = resolve_backend(&config).unwrap();
        assert_eq!(backend.name(), "pattern");
    }

    #[test]
    fn resolve_by_name() {
        let config = PipelineConfig::builder()
            .backend_name("pattern")
            .build()
            .unwrap();
        assert_eq!(resolve_backend(&config).unwrap().name(), "pattern");
    }

    #[test]
    fn resolve_unknown_name_is_fatal() {
        let mut config = PipelineConfig::default();
        config.backend_name = Some("detectron".into());
        let err = resolve_backend(&config).map(|b| b.name()).unwrap_err();
        assert!(matches!(err, Pdf2BlocksError::UnknownBackend { .. }));
    }
}
