//! Configuration types for the extraction pipeline.
//!
//! All behaviour is controlled through [`PipelineConfig`], built via its
//! [`PipelineConfigBuilder`]. Keeping every knob in one struct makes it
//! trivial to share a config between the driver and a front end, and to
//! diff two runs to understand why their outputs differ.
//!
//! # Design choice: builder over constructor
//! A dozen-field constructor is unreadable and breaks on every new field.
//! The builder lets callers set only what they care about and rely on
//! documented defaults for the rest.

use crate::backend::RecognitionBackend;
use crate::error::Pdf2BlocksError;
use crate::progress::ProgressCallback;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Environment variable naming the active recognition backend.
pub const BACKEND_ENV: &str = "PDF2BLOCKS_BACKEND";

/// Configuration for a document extraction run.
///
/// Built via [`PipelineConfig::builder()`] or [`PipelineConfig::default()`].
///
/// # Example
/// ```rust
/// use pdf2blocks::PipelineConfig;
///
/// let config = PipelineConfig::builder()
///     .dpi(150)
///     .max_recognition_pixels(1024)
///     .backend_name("pattern")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct PipelineConfig {
    /// Rendering DPI used when rasterising a PDF page for recognition.
    /// Range: 72–400. Default: 150.
    ///
    /// 150 DPI keeps text sharp enough for recognition while the page
    /// image stays small; the pixel cap below bounds the result anyway.
    pub dpi: u32,

    /// Maximum image dimension (longest side) fed to a recognition
    /// backend, in pixels. Default: 1024.
    ///
    /// Caps both rendered PDF pages and standalone image inputs,
    /// preserving aspect ratio. Recorded page geometry is unaffected:
    /// the driver rescales backend bounding boxes back into the page's
    /// native coordinate space.
    pub max_recognition_pixels: u32,

    /// Pre-constructed recognition backend. Takes precedence over
    /// `backend_name` and the `PDF2BLOCKS_BACKEND` environment variable.
    ///
    /// This is the injection point for tests and for front ends that
    /// construct the backend once at startup.
    pub backend: Option<Arc<dyn RecognitionBackend>>,

    /// Recognition backend selector ("pattern", "vlm"). Unknown names are
    /// a fatal error at resolution time, before any page is processed.
    pub backend_name: Option<String>,

    /// Base URL of the VLM endpoint (Ollama-style API). Default:
    /// `http://localhost:11434`.
    pub vlm_endpoint: String,

    /// Model identifier passed to the VLM endpoint. Default:
    /// `llava-phi3:3.8b`.
    pub vlm_model: String,

    /// Sampling temperature for the VLM completion. Default: 0.0.
    ///
    /// Transcription wants determinism; anything above zero trades
    /// accuracy for creativity.
    pub temperature: f32,

    /// Maximum retry attempts on a transient VLM failure. Default: 3.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds (doubles per attempt).
    /// Default: 500.
    pub retry_backoff_ms: u64,

    /// Per-request timeout for the VLM endpoint in seconds. Default: 120.
    pub api_timeout_secs: u64,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Attempt table detection on pages with a native text layer.
    /// Default: true.
    pub detect_tables: bool,

    /// Optional per-page progress callback.
    pub progress: Option<ProgressCallback>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            dpi: 150,
            max_recognition_pixels: 1024,
            backend: None,
            backend_name: None,
            vlm_endpoint: "http://localhost:11434".to_string(),
            vlm_model: "llava-phi3:3.8b".to_string(),
            temperature: 0.0,
            max_retries: 3,
            retry_backoff_ms: 500,
            api_timeout_secs: 120,
            password: None,
            detect_tables: true,
            progress: None,
        }
    }
}

impl fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("dpi", &self.dpi)
            .field("max_recognition_pixels", &self.max_recognition_pixels)
            .field("backend", &self.backend.as_ref().map(|b| b.name()))
            .field("backend_name", &self.backend_name)
            .field("vlm_endpoint", &self.vlm_endpoint)
            .field("vlm_model", &self.vlm_model)
            .field("temperature", &self.temperature)
            .field("max_retries", &self.max_retries)
            .field("detect_tables", &self.detect_tables)
            .finish()
    }
}

impl PipelineConfig {
    /// Create a new builder for `PipelineConfig`.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`PipelineConfig`].
#[derive(Debug)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 400);
        self
    }

    pub fn max_recognition_pixels(mut self, px: u32) -> Self {
        self.config.max_recognition_pixels = px.max(100);
        self
    }

    pub fn backend(mut self, backend: Arc<dyn RecognitionBackend>) -> Self {
        self.config.backend = Some(backend);
        self
    }

    pub fn backend_name(mut self, name: impl Into<String>) -> Self {
        self.config.backend_name = Some(name.into());
        self
    }

    pub fn vlm_endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.vlm_endpoint = url.into();
        self
    }

    pub fn vlm_model(mut self, model: impl Into<String>) -> Self {
        self.config.vlm_model = model.into();
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn detect_tables(mut self, v: bool) -> Self {
        self.config.detect_tables = v;
        self
    }

    pub fn progress(mut self, cb: ProgressCallback) -> Self {
        self.config.progress = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PipelineConfig, Pdf2BlocksError> {
        let c = &self.config;
        if c.dpi < 72 || c.dpi > 400 {
            return Err(Pdf2BlocksError::InvalidConfig(format!(
                "DPI must be 72–400, got {}",
                c.dpi
            )));
        }
        if c.max_recognition_pixels < 100 {
            return Err(Pdf2BlocksError::InvalidConfig(format!(
                "max_recognition_pixels must be ≥ 100, got {}",
                c.max_recognition_pixels
            )));
        }
        if let Some(ref name) = c.backend_name {
            // Fail fast: a bad selector must never survive to first use.
            name.parse::<BackendKind>()?;
        }
        Ok(self.config)
    }
}

// ── Backend selection ────────────────────────────────────────────────────

/// The fixed enumeration of known recognition backend implementations.
///
/// Selected once at process startup via configuration or the
/// `PDF2BLOCKS_BACKEND` environment variable; unknown values fail fast
/// with [`Pdf2BlocksError::UnknownBackend`] rather than at first use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendKind {
    /// Deterministic pattern backend — no model, canned blocks. (default)
    #[default]
    Pattern,
    /// Vision-language-model backend over an Ollama-style HTTP API.
    Vlm,
}

impl BackendKind {
    /// Resolve the selector from the environment, falling back to the
    /// default when the variable is unset or empty.
    pub fn from_env() -> Result<Self, Pdf2BlocksError> {
        match std::env::var(BACKEND_ENV) {
            Ok(v) if !v.trim().is_empty() => v.parse(),
            _ => Ok(Self::default()),
        }
    }

    /// Human-readable selector name, matching what `FromStr` accepts.
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Pattern => "pattern",
            BackendKind::Vlm => "vlm",
        }
    }
}

impl FromStr for BackendKind {
    type Err = Pdf2BlocksError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pattern" => Ok(BackendKind::Pattern),
            "vlm" => Ok(BackendKind::Vlm),
            other => Err(Pdf2BlocksError::UnknownBackend {
                name: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_kind_parses_known_names() {
        assert_eq!("pattern".parse::<BackendKind>().unwrap(), BackendKind::Pattern);
        assert_eq!("vlm".parse::<BackendKind>().unwrap(), BackendKind::Vlm);
        assert_eq!(" VLM ".parse::<BackendKind>().unwrap(), BackendKind::Vlm);
    }

    #[test]
    fn backend_kind_rejects_unknown_names() {
        let err = "paddle".parse::<BackendKind>().unwrap_err();
        assert!(matches!(
            err,
            Pdf2BlocksError::UnknownBackend { ref name } if name == "paddle"
        ));
    }

    #[test]
    fn builder_clamps_dpi() {
        let config = PipelineConfig::builder().dpi(9999).build().unwrap();
        assert_eq!(config.dpi, 400);
    }

    #[test]
    fn builder_rejects_unknown_backend_name() {
        let err = PipelineConfig::builder()
            .backend_name("tesseract")
            .build()
            .unwrap_err();
        assert!(matches!(err, Pdf2BlocksError::UnknownBackend { .. }));
    }

    #[test]
    fn defaults_match_documented_values() {
        let c = PipelineConfig::default();
        assert_eq!(c.dpi, 150);
        assert_eq!(c.max_recognition_pixels, 1024);
        assert!(c.detect_tables);
        assert!(c.backend.is_none());
    }
}
