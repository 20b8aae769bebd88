//! Export entry points.
//!
//! A run is: load and validate the content store, plan the combinations,
//! open one [`ExportSession`], export the combinations one after another,
//! close the session. Everything up to planning is pure: configuration and
//! content errors surface before a port is bound or a browser is started.

use crate::config::ExportConfig;
use crate::content::ContentStore;
use crate::error::Cv2PdfError;
use crate::output::{CombinationResult, ExportReport, ExportStats};
use crate::pipeline::plan::{self, Combination};
use crate::session::ExportSession;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

/// Export every requested combination to PDF.
///
/// # Returns
/// `Ok(ExportReport)` when at least one combination succeeded. Check
/// [`ExportReport::is_success`] (or call [`ExportReport::into_result`])
/// for partial failures.
///
/// # Errors
/// Fatal problems only:
/// - site or content directory missing, content invalid
/// - unknown version requested
/// - engine not found, port held by another program
/// - every combination failed
///
/// # Example
/// ```rust,no_run
/// use cv2pdf::{export, ExportConfig, LanguageSelector, VersionSelector};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = ExportConfig::builder()
///     .versions(VersionSelector::One("it".into()))
///     .languages(LanguageSelector::Both)
///     .output_dir("out")
///     .build()?;
/// let report = export(&config).await?.into_result()?;
/// for path in report.outputs() {
///     println!("{}", path.display());
/// }
/// # Ok(())
/// # }
/// ```
pub async fn export(config: &ExportConfig) -> Result<ExportReport, Cv2PdfError> {
    let store = load_store(config)?;
    export_with_store(Arc::new(store), config).await
}

/// Like [`export`], over an already loaded store.
pub async fn export_with_store(
    store: Arc<ContentStore>,
    config: &ExportConfig,
) -> Result<ExportReport, Cv2PdfError> {
    let started = Instant::now();
    let combos = plan::plan(config, &store)?;
    let total = combos.len();
    info!("Exporting {} combination(s) with {}", total, config.method);

    if let Some(ref cb) = config.progress_callback {
        cb.on_export_start(total);
    }

    let session = ExportSession::open(store, config).await?;
    let engine = session.engine().name().to_string();
    let base_url = session.base_url().to_string();
    let output_dir = session.output_dir().to_path_buf();

    let results = run_combinations(&session, &combos, config).await;

    if let Err(e) = session.close().await {
        warn!("Export session did not close cleanly: {}", e);
    }

    let succeeded = results.iter().filter(|r| r.is_success()).count();
    let failed = results.len() - succeeded;
    let stats = ExportStats {
        planned: total,
        succeeded,
        failed,
        skipped: total - results.len(),
        total_bytes: results.iter().map(|r| r.bytes).sum(),
        total_duration_ms: started.elapsed().as_millis() as u64,
    };

    if let Some(ref cb) = config.progress_callback {
        cb.on_export_complete(total, succeeded);
    }

    if succeeded == 0 {
        let first_error = results
            .iter()
            .find_map(|r| r.error.as_ref())
            .map(|e| e.to_string())
            .unwrap_or_else(|| "unknown error".to_string());
        return Err(Cv2PdfError::AllCombinationsFailed {
            attempted: results.len(),
            skipped: stats.skipped,
            first_error,
        });
    }

    info!(
        "Export complete: {}/{} PDFs, {} bytes, {}ms",
        succeeded, total, stats.total_bytes, stats.total_duration_ms
    );

    Ok(ExportReport {
        engine,
        base_url,
        output_dir,
        results,
        stats,
    })
}

/// Synchronous wrapper around [`export`].
///
/// Creates a temporary tokio runtime internally.
pub fn export_sync(config: &ExportConfig) -> Result<ExportReport, Cv2PdfError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Cv2PdfError::Internal(format!("Failed to create tokio runtime: {e}")))?
        .block_on(export(config))
}

/// Load and validate content, then plan the run, without starting anything.
///
/// Returns the combinations an export would produce.
pub fn check(config: &ExportConfig) -> Result<Vec<Combination>, Cv2PdfError> {
    let store = load_store(config)?;
    plan::plan(config, &store)
}

/// Load the content store configured by `config`.
pub fn load_store(config: &ExportConfig) -> Result<ContentStore, Cv2PdfError> {
    if !config.site_dir.is_dir() {
        return Err(Cv2PdfError::SiteNotFound {
            path: config.site_dir.clone(),
        });
    }
    ContentStore::load(&config.content_dir(), config.strict_parity)
}

async fn run_combinations(
    session: &ExportSession,
    combos: &[Combination],
    config: &ExportConfig,
) -> Vec<CombinationResult> {
    let total = combos.len();
    let mut results = Vec::with_capacity(total);

    for (i, combo) in combos.iter().enumerate() {
        let index = i + 1;
        if let Some(ref cb) = config.progress_callback {
            cb.on_combination_start(index, total, combo);
        }

        let started = Instant::now();
        let outcome = session.export_one(combo).await;
        let elapsed = started.elapsed().as_millis() as u64;

        match outcome {
            Ok((path, bytes)) => {
                if let Some(ref cb) = config.progress_callback {
                    cb.on_combination_complete(index, total, combo, bytes);
                }
                results.push(CombinationResult::success(combo, path, bytes, elapsed));
            }
            Err(e) => {
                error!("{}", e);
                if let Some(ref cb) = config.progress_callback {
                    cb.on_combination_error(index, total, combo, &e.to_string());
                }
                results.push(CombinationResult::failure(combo, e, elapsed));
                if config.fail_fast {
                    warn!(
                        "Stopping after first failure; {} combination(s) not attempted",
                        total - index
                    );
                    break;
                }
            }
        }
    }

    results
}
