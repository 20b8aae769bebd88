//! # cv2pdf
//!
//! Render a bilingual (English/Polish) résumé from YAML content and export
//! every version × language combination to PDF.
//!
//! ## How it works
//!
//! The résumé text lives in one YAML file per version (`it.yaml`,
//! `pm.yaml`, ...), each with parallel `en` and `pl` branches. A small local
//! HTTP server renders the page for `?version=..&language=..`, and a
//! headless engine (Chrome, or WeasyPrint) prints that URL to PDF:
//!
//! ```text
//! content/*.yaml
//!  │
//!  ├─ 1. Load     typed documents, required fields + EN/PL parity checked
//!  ├─ 2. Plan     versions × languages, unknown versions rejected
//!  ├─ 3. Serve    axum site server on 127.0.0.1:<port> (or reuse one)
//!  ├─ 4. Print    preflight GET, engine prints the URL, bounded by timeout
//!  └─ 5. Verify   %PDF check, atomic move to cv_<version>_<language>.pdf
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cv2pdf::{export, ExportConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Every version, both languages, headless Chrome found automatically.
//!     let config = ExportConfig::builder().site_dir("site").build()?;
//!     let report = export(&config).await?;
//!     eprintln!("{}/{} PDFs written",
//!         report.stats.succeeded,
//!         report.stats.planned);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `cv2pdf` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! cv2pdf = { version = "0.3", default-features = false }
//! ```
//!
//! ## Engines
//!
//! | Method       | Executable                       | Notes |
//! |--------------|----------------------------------|-------|
//! | `chrome`     | Chrome / Chromium (`CHROME_PATH`) | Default. Scratch profile per run, `--virtual-time-budget` settle time |
//! | `weasyprint` | `weasyprint` (`WEASYPRINT_PATH`) | No JavaScript; the page is fully server-rendered so output matches |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod content;
pub mod error;
pub mod export;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod render;
pub mod server;
pub mod session;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ExportConfig, ExportConfigBuilder, Language, LanguageSelector, Method, VersionSelector};
pub use content::{ContentDocument, ContentStore, CvContent};
pub use error::{Cv2PdfError, ExportError};
pub use export::{check, export, export_sync, export_with_store, load_store};
pub use output::{CombinationResult, ExportReport, ExportStats};
pub use pipeline::plan::Combination;
pub use progress::{ExportProgressCallback, NoopProgressCallback, ProgressCallback};
pub use server::SiteServer;
pub use session::ExportSession;
