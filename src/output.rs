//! Result types returned by the export entry points.

use crate::config::Language;
use crate::error::{Cv2PdfError, ExportError};
use crate::pipeline::plan::Combination;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Outcome of one (version, language) combination.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombinationResult {
    pub version: String,
    pub language: Language,
    /// Final PDF path, present on success.
    pub output: Option<PathBuf>,
    /// Size of the written PDF in bytes (0 on failure).
    pub bytes: u64,
    pub duration_ms: u64,
    pub error: Option<ExportError>,
}

impl CombinationResult {
    pub fn success(combo: &Combination, output: PathBuf, bytes: u64, duration_ms: u64) -> Self {
        Self {
            version: combo.version.clone(),
            language: combo.language,
            output: Some(output),
            bytes,
            duration_ms,
            error: None,
        }
    }

    pub fn failure(combo: &Combination, error: ExportError, duration_ms: u64) -> Self {
        Self {
            version: combo.version.clone(),
            language: combo.language,
            output: None,
            bytes: 0,
            duration_ms,
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub fn combination(&self) -> Combination {
        Combination::new(self.version.as_str(), self.language)
    }
}

/// Aggregate counters for a run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExportStats {
    /// Combinations planned.
    pub planned: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Not attempted because the run stopped early (`fail_fast`).
    pub skipped: usize,
    pub total_bytes: u64,
    pub total_duration_ms: u64,
}

/// Everything a run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportReport {
    /// Engine used (`chrome` or `weasyprint`).
    pub engine: String,
    /// Base URL of the site server the engine printed from.
    pub base_url: String,
    pub output_dir: PathBuf,
    /// One entry per attempted combination, in run order.
    pub results: Vec<CombinationResult>,
    pub stats: ExportStats,
}

impl ExportReport {
    /// True when every planned combination produced a PDF.
    pub fn is_success(&self) -> bool {
        self.stats.failed == 0 && self.stats.skipped == 0
    }

    pub fn failures(&self) -> impl Iterator<Item = &ExportError> {
        self.results.iter().filter_map(|r| r.error.as_ref())
    }

    /// Paths of the PDFs written by this run.
    pub fn outputs(&self) -> Vec<&Path> {
        self.results
            .iter()
            .filter_map(|r| r.output.as_deref())
            .collect()
    }

    /// Turn any failed or skipped combination into [`Cv2PdfError::PartialFailure`].
    pub fn into_result(self) -> Result<Self, Cv2PdfError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(Cv2PdfError::PartialFailure {
                success: self.stats.succeeded,
                failed: self.stats.failed + self.stats.skipped,
                total: self.stats.planned,
            })
        }
    }
}
