//! Progress-callback trait for per-combination export events.
//!
//! Inject an [`Arc<dyn ExportProgressCallback>`] via
//! [`crate::config::ExportConfigBuilder::progress_callback`] to receive
//! events as the orchestrator works through each (version, language)
//! combination. The CLI forwards them to a terminal progress bar; library
//! callers can log them or collect them.
//!
//! # Example
//!
//! ```rust
//! use cv2pdf::{Combination, ExportConfig, ExportProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     written: AtomicUsize,
//! }
//!
//! impl ExportProgressCallback for CountingCallback {
//!     fn on_combination_complete(&self, _index: usize, _total: usize, combo: &Combination, bytes: u64) {
//!         self.written.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{combo}: {bytes} bytes");
//!     }
//! }
//!
//! let config = ExportConfig::builder()
//!     .progress_callback(Arc::new(CountingCallback { written: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use crate::pipeline::plan::Combination;
use std::sync::Arc;

/// Called by the orchestrator as it processes each combination.
///
/// Combinations run sequentially, but the trait is `Send + Sync` so a
/// callback can be shared with other tasks (e.g. a progress bar ticker).
/// All methods have default no-op implementations.
pub trait ExportProgressCallback: Send + Sync {
    /// Called once, after planning, before the session is opened.
    ///
    /// # Arguments
    /// * `total` — number of combinations that will be attempted
    fn on_export_start(&self, total: usize) {
        let _ = total;
    }

    /// Called just before a combination is exported.
    ///
    /// # Arguments
    /// * `index` — 1-based position in the run
    /// * `total` — combinations in the run
    /// * `combo` — the (version, language) pair
    fn on_combination_start(&self, index: usize, total: usize, combo: &Combination) {
        let _ = (index, total, combo);
    }

    /// Called when a combination's PDF is in place.
    ///
    /// # Arguments
    /// * `bytes` — size of the written PDF
    fn on_combination_complete(&self, index: usize, total: usize, combo: &Combination, bytes: u64) {
        let _ = (index, total, combo, bytes);
    }

    /// Called when a combination fails.
    fn on_combination_error(&self, index: usize, total: usize, combo: &Combination, error: &str) {
        let _ = (index, total, combo, error);
    }

    /// Called once after the last attempted combination.
    ///
    /// # Arguments
    /// * `total`         — combinations planned
    /// * `success_count` — combinations that produced a PDF
    fn on_export_complete(&self, total: usize, success_count: usize) {
        let _ = (total, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ExportProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ExportConfig`].
pub type ProgressCallback = Arc<dyn ExportProgressCallback>;
