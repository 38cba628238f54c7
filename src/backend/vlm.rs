//! The VLM backend: page image → text via a vision-language model served
//! over an Ollama-style HTTP API.
//!
//! ## Why one full-page block?
//!
//! General-purpose VLMs transcribe text in reading order but do not emit
//! per-line geometry. The backend therefore wraps the whole reply in a
//! single block spanning the input image, with a fixed placeholder
//! confidence of 0.5 — the model does not estimate confidence at all, and
//! pretending otherwise would mislead downstream consumers.
//!
//! ## Why PNG?
//!
//! Lossless encoding preserves text crispness. JPEG artefacts on rendered
//! text measurably degrade transcription accuracy at low DPI.
//!
//! ## Retry strategy
//!
//! HTTP 5xx and transport errors from model servers are transient and
//! frequent under load. Exponential backoff (`retry_backoff_ms *
//! 2^(attempt-1)`) keeps the wait sequence short: with a 500 ms base and
//! 3 retries, 500 ms → 1 s → 2 s.

use super::{Recognition, RecognitionBackend};
use crate::block::RawBlock;
use crate::config::PipelineConfig;
use crate::error::{BackendError, Pdf2BlocksError};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::DynamicImage;
use serde::Deserialize;
use std::io::Cursor;
use std::time::Duration;
use tracing::{debug, warn};

/// Confidence reported for VLM output. The model does not estimate
/// confidence; this is an explicit placeholder, not a measurement.
const VLM_PLACEHOLDER_CONFIDENCE: f32 = 0.5;

/// Extraction prompt. Deliberately terse: commentary in the reply would
/// end up inside the block text.
const EXTRACTION_PROMPT: &str = "Extract only the visible, human-readable text from the image. \
     Return raw text lines in reading order - no commentary.";

#[derive(Debug, Deserialize)]
struct GenerateReply {
    response: String,
}

/// Recognition backend backed by an Ollama-style `/api/generate`
/// endpoint.
pub struct VlmBackend {
    client: reqwest::blocking::Client,
    endpoint: String,
    model: String,
    temperature: f32,
    max_retries: u32,
    retry_backoff_ms: u64,
}

impl VlmBackend {
    /// Construct from pipeline configuration.
    pub fn from_config(config: &PipelineConfig) -> Result<Self, Pdf2BlocksError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.api_timeout_secs))
            .build()
            .map_err(|e| Pdf2BlocksError::Internal(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: config.vlm_endpoint.trim_end_matches('/').to_string(),
            model: config.vlm_model.clone(),
            temperature: config.temperature,
            max_retries: config.max_retries,
            retry_backoff_ms: config.retry_backoff_ms,
        })
    }

    fn call_model(&self, image_b64: &str) -> Result<String, BackendError> {
        let url = format!("{}/api/generate", self.endpoint);
        let body = serde_json::json!({
            "model": self.model,
            "prompt": EXTRACTION_PROMPT,
            "images": [image_b64],
            "stream": false,
            "options": { "temperature": self.temperature },
        });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .map_err(|e| BackendError::Request {
                detail: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().unwrap_or_default();
            return Err(BackendError::Status {
                code: status.as_u16(),
                detail,
            });
        }

        let reply: GenerateReply = response.json().map_err(|e| BackendError::Malformed {
            detail: format!("invalid JSON reply: {e}"),
        })?;

        Ok(reply.response)
    }
}

impl RecognitionBackend for VlmBackend {
    fn name(&self) -> &'static str {
        "vlm"
    }

    fn recognize(&self, image: &DynamicImage) -> Result<Recognition, BackendError> {
        let image_b64 = encode_png(image)?;
        debug!("Encoded page image → {} bytes base64", image_b64.len());

        let mut last_err: Option<BackendError> = None;
        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let backoff = self.retry_backoff_ms * 2u64.pow(attempt - 1);
                warn!(
                    "VLM call retry {}/{} after {}ms",
                    attempt, self.max_retries, backoff
                );
                std::thread::sleep(Duration::from_millis(backoff));
            }

            match self.call_model(&image_b64) {
                Ok(reply) => {
                    let text = strip_fences(reply.trim());
                    if text.is_empty() {
                        return Ok(Recognition::default());
                    }
                    return Ok(Recognition {
                        items: vec![RawBlock::full_page(
                            text,
                            VLM_PLACEHOLDER_CONFIDENCE,
                            image.width(),
                            image.height(),
                        )],
                        tables: Vec::new(),
                    });
                }
                Err(e) => {
                    warn!("VLM call attempt {} failed: {e}", attempt + 1);
                    last_err = Some(e);
                }
            }
        }

        Err(last_err.unwrap_or(BackendError::Request {
            detail: "no attempts made".into(),
        }))
    }
}

/// Encode a page image as base64 PNG for the model API.
pub fn encode_png(img: &DynamicImage) -> Result<String, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
    Ok(STANDARD.encode(&buf))
}

/// Strip a code fence the model sometimes wraps its reply in.
///
/// Only a fence enclosing the whole reply is removed; fences inside the
/// transcribed text are content and stay.
fn strip_fences(text: &str) -> String {
    let trimmed = text.trim();
    if let Some(rest) = trimmed.strip_prefix("```") {
        if let Some(inner) = rest.strip_suffix("```") {
            // Drop an optional language tag on the opening fence line.
            let inner = match inner.split_once('\n') {
                Some((first, body)) if !first.trim().contains(' ') => body,
                _ => inner,
            };
            return inner.trim().to_string();
        }
    }
    trimmed.to_string()
}
