//! CLI binary for pdf2blocks.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `PipelineConfig`, runs each input through the driver, and prints a
//! per-document summary.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pdf2blocks::{
    process, BackendKind, PipelineConfig, PipelineProgressCallback, ProgressCallback,
};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a live progress bar plus one log line per
/// page. Pages arrive strictly in order, so no bookkeeping beyond the bar
/// itself is needed.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    /// Create a callback whose bar length is set by `on_document_start`
    /// once the page count is known.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);

        // Spinner-only until we know the total.
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Opening document…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self { bar })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Extracting");
        self.bar.reset_eta();
    }
}

impl PipelineProgressCallback for CliProgressCallback {
    fn on_document_start(&self, total_pages: usize) {
        self.activate_bar(total_pages);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Extracting {total_pages} pages…"))
        ));
    }

    fn on_page_start(&self, page_index: usize, _total: usize) {
        self.bar.set_message(format!("page {page_index:02}"));
    }

    fn on_page_skipped(&self, page_index: usize, total: usize) {
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}",
            dim("○"),
            page_index,
            total,
            dim("cached, skipped"),
        ));
        self.bar.inc(1);
    }

    fn on_page_complete(&self, page_index: usize, total: usize, recognized: bool, duration_ms: u64) {
        let source = if recognized { "recognized" } else { "native" };
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {:<10}  {}",
            green("✓"),
            page_index,
            total,
            dim(source),
            dim(&format!("{:.1}s", duration_ms as f64 / 1000.0)),
        ));
        self.bar.inc(1);
    }

    fn on_page_error(&self, page_index: usize, total: usize, error: &str) {
        // Truncate very long error messages to keep output tidy.
        let msg = truncate_message(error, 80);

        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}",
            red("✗"),
            page_index,
            total,
            red(&msg),
        ));
        self.bar.inc(1);
    }

    fn on_document_complete(&self, total_pages: usize, written: usize) {
        self.bar.finish_and_clear();
        let _ = (total_pages, written);
    }
}

/// Shorten a message to at most `max` characters, ellipsis included.
///
/// Counts characters, not bytes: error text can carry multibyte UTF-8
/// (file names, model replies) and slicing at a byte index would panic
/// off a char boundary.
fn truncate_message(msg: &str, max: usize) -> String {
    if msg.chars().count() <= max {
        return msg.to_string();
    }
    let mut out: String = msg.chars().take(max.saturating_sub(1)).collect();
    out.push('\u{2026}');
    out
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Extract a PDF into out/<stem>/page_<NN>.json
  pdf2blocks document.pdf

  # Several inputs, shared output directory
  pdf2blocks scans/*.pdf photos/*.png -o extracted/

  # Recognize scanned pages with a local VLM (Ollama-style endpoint)
  pdf2blocks --backend vlm --vlm-model llava-phi3:3.8b scan.pdf

  # Re-extract from scratch, ignoring cached page records
  pdf2blocks --force document.pdf

  # Machine-readable run summary on stdout
  pdf2blocks --json document.pdf > summary.json

IDEMPOTENCY:
  Page records double as cache entries. A page whose page_<NN>.json
  already exists is skipped without rendering or recognition, so an
  interrupted run resumes where it stopped. Delete a record file (or pass
  --force) to reprocess.

BACKENDS:
  pattern   Deterministic canned output, no model. Default; used in tests.
  vlm       Vision language model over an Ollama-style HTTP API.

ENVIRONMENT VARIABLES:
  PDF2BLOCKS_BACKEND      Backend selector (pattern, vlm)
  PDF2BLOCKS_OUTPUT       Default output directory
  PDFIUM_LIB_PATH         Path to an existing libpdfium build
"#;

/// Extract structured text blocks from PDFs and images into page-indexed
/// JSON records.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2blocks",
    version,
    about = "Extract structured text blocks from PDFs and images as per-page JSON",
    long_about = "Extract text from PDF documents and PNG/JPEG images into one JSON record per \
page. Pages with a native text layer are read directly (confidence 1.0, with table detection); \
pages without one are rasterised and sent to a recognition backend. Output is written \
incrementally and re-runs skip pages that already have a record.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Input files: PDF, PNG, or JPEG. Unsupported types are skipped with
    /// a warning.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Output root; records land in <output>/<document-stem>/.
    #[arg(short, long, env = "PDF2BLOCKS_OUTPUT", default_value = "out")]
    output: PathBuf,

    /// Directory for cached page renders.
    #[arg(long, env = "PDF2BLOCKS_IMAGE_CACHE", default_value = "out/.images")]
    image_cache: PathBuf,

    /// Recognition backend: pattern, vlm.
    #[arg(long, env = "PDF2BLOCKS_BACKEND", value_enum)]
    backend: Option<BackendArg>,

    /// Rendering DPI for pages without a native text layer (72–400).
    #[arg(long, env = "PDF2BLOCKS_DPI", default_value_t = 150,
          value_parser = clap::value_parser!(u32).range(72..=400))]
    dpi: u32,

    /// Max image dimension (longest side) fed to recognition, in pixels.
    #[arg(long, env = "PDF2BLOCKS_MAX_PIXELS", default_value_t = 1024)]
    max_pixels: u32,

    /// Base URL of the VLM endpoint.
    #[arg(long, env = "PDF2BLOCKS_VLM_ENDPOINT", default_value = "http://localhost:11434")]
    vlm_endpoint: String,

    /// Model identifier for the VLM endpoint.
    #[arg(long, env = "PDF2BLOCKS_VLM_MODEL", default_value = "llava-phi3:3.8b")]
    vlm_model: String,

    /// VLM sampling temperature (0.0–2.0).
    #[arg(long, env = "PDF2BLOCKS_TEMPERATURE", default_value_t = 0.0)]
    temperature: f32,

    /// Retries per page on a transient recognition failure.
    #[arg(long, env = "PDF2BLOCKS_MAX_RETRIES", default_value_t = 3)]
    max_retries: u32,

    /// Per-request VLM timeout in seconds.
    #[arg(long, env = "PDF2BLOCKS_API_TIMEOUT", default_value_t = 120)]
    api_timeout: u64,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PDF2BLOCKS_PASSWORD")]
    password: Option<String>,

    /// Disable table detection on native-text pages.
    #[arg(long, env = "PDF2BLOCKS_NO_TABLES")]
    no_tables: bool,

    /// Delete existing page records for each input before processing.
    #[arg(long)]
    force: bool,

    /// Print a JSON run summary to stdout instead of human-readable text.
    #[arg(long, env = "PDF2BLOCKS_JSON")]
    json: bool,

    /// Disable the progress bar.
    #[arg(long, env = "PDF2BLOCKS_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF2BLOCKS_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF2BLOCKS_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum BackendArg {
    Pattern,
    Vlm,
}

impl From<BackendArg> for BackendKind {
    fn from(v: BackendArg) -> Self {
        match v {
            BackendArg::Pattern => BackendKind::Pattern,
            BackendArg::Vlm => BackendKind::Vlm,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active;
    // the bar provides all the feedback that matters to the user.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new_dynamic();
        Some(cb as Arc<dyn PipelineProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb)?;

    // ── Process each input ───────────────────────────────────────────────
    let mut summaries = Vec::with_capacity(cli.inputs.len());
    let mut failed_documents = 0usize;

    for input in &cli.inputs {
        if cli.force {
            invalidate(input, &cli.output, &cli.image_cache)?;
        }

        match process(input, &cli.image_cache, &cli.output, &config) {
            Ok(summary) => {
                if !cli.quiet && !cli.json {
                    print_summary(input, &summary);
                }
                summaries.push(summary);
            }
            Err(e) => {
                // Fatal for this document (bad backend selector, output
                // not writable); keep going with the rest of the batch.
                failed_documents += 1;
                eprintln!("{} {}: {e}", red("✘"), input.display());
            }
        }
    }

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&summaries).context("Failed to serialise summaries")?
        );
    }

    if failed_documents > 0 {
        anyhow::bail!("{failed_documents} input(s) failed");
    }
    Ok(())
}

/// Map CLI args to `PipelineConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<PipelineConfig> {
    let mut builder = PipelineConfig::builder()
        .dpi(cli.dpi)
        .max_recognition_pixels(cli.max_pixels)
        .vlm_endpoint(cli.vlm_endpoint.clone())
        .vlm_model(cli.vlm_model.clone())
        .temperature(cli.temperature)
        .max_retries(cli.max_retries)
        .api_timeout_secs(cli.api_timeout)
        .detect_tables(!cli.no_tables);

    if let Some(ref backend) = cli.backend {
        builder = builder.backend_name(BackendKind::from(backend.clone()).as_str());
    }
    if let Some(ref password) = cli.password {
        builder = builder.password(password.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Remove a document's page records and cached renders so the next run
/// starts from scratch.
fn invalidate(input: &std::path::Path, output: &std::path::Path, cache: &std::path::Path) -> Result<()> {
    let stem = pdf2blocks::pipeline::input::document_stem(input);

    for dir in [output.join(&stem), cache.join(&stem)] {
        if dir.exists() {
            std::fs::remove_dir_all(&dir)
                .with_context(|| format!("Failed to clear {}", dir.display()))?;
        }
    }
    Ok(())
}

fn print_summary(input: &std::path::Path, summary: &pdf2blocks::DocumentSummary) {
    if summary.total_pages == 0 {
        eprintln!("{} {}  {}", cyan("○"), input.display(), dim("skipped"));
        return;
    }
    let tick = if summary.failed_pages == 0 {
        green("✔")
    } else {
        cyan("⚠")
    };
    eprintln!(
        "{tick} {}  {} native, {} recognized, {} cached{}  {}",
        bold(&summary.document),
        summary.native_pages,
        summary.recognized_pages,
        summary.skipped_pages,
        if summary.failed_pages > 0 {
            red(&format!(", {} failed", summary.failed_pages))
        } else {
            String::new()
        },
        dim(&format!("{}ms", summary.duration_ms)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_messages_pass_through() {
        assert_eq!(truncate_message("connection refused", 80), "connection refused");
    }

    #[test]
    fn long_messages_end_with_ellipsis() {
        let long = "x".repeat(200);
        let out = truncate_message(&long, 80);
        assert_eq!(out.chars().count(), 80);
        assert!(out.ends_with('\u{2026}'));
    }

    #[test]
    fn truncation_respects_multibyte_boundaries() {
        // A multibyte character straddling the cut position must not
        // panic the formatter.
        let msg = format!("{}é and more", "a".repeat(78));
        let out = truncate_message(&msg, 80);
        assert_eq!(out.chars().count(), 80);
        assert!(out.ends_with('\u{2026}'));

        let exotic = "页".repeat(100);
        let out = truncate_message(&exotic, 80);
        assert_eq!(out.chars().count(), 80);
    }
}
