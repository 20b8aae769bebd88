//! Error types for the cv2pdf library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`Cv2PdfError`] — **Fatal**: the run cannot proceed at all (unknown
//!   version, content that fails validation, port taken, engine missing).
//!   Returned as `Err(Cv2PdfError)` from the top-level `export*` functions.
//!   Configuration and content errors are raised before any server or
//!   engine is started.
//!
//! * [`ExportError`] — **Per combination**: one (version, language) pair
//!   failed to export (page not served, engine crashed, timeout) while the
//!   others may be fine. Stored inside
//!   [`crate::output::CombinationResult`] so the caller sees exactly which
//!   pair failed and why.

use std::path::PathBuf;
use thiserror::Error;

use crate::config::Language;

/// All fatal errors returned by the cv2pdf library.
#[derive(Debug, Error)]
pub enum Cv2PdfError {
    // ── Configuration errors ──────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The version identifier is not usable as a file name / query value.
    #[error("Invalid version identifier '{value}': use lowercase letters, digits, '-' or '_'")]
    InvalidVersion { value: String },

    /// The requested version has no content document.
    #[error("Unknown version '{requested}'. Available versions: {}", .available.join(", "))]
    UnknownVersion {
        requested: String,
        available: Vec<String>,
    },

    /// The requested language code is not supported.
    #[error("Unknown language '{value}'. Supported languages: en, pl")]
    UnknownLanguage { value: String },

    // ── Content errors ────────────────────────────────────────────────────
    /// The site directory (page assets) does not exist.
    #[error("Site directory not found: '{path}'\nRun from the repository root or pass --site-dir.")]
    SiteNotFound { path: PathBuf },

    /// The content directory does not exist.
    #[error("Content directory not found: '{path}'\nExpected one <version>.yaml file per résumé version.")]
    ContentDirMissing { path: PathBuf },

    /// The content directory holds no version files.
    #[error("No content files (*.yaml) found in '{path}'")]
    NoVersions { path: PathBuf },

    /// A content file could not be read.
    #[error("Failed to read content file '{path}': {source}")]
    ContentRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A content file is not valid YAML for the résumé schema.
    #[error("Content file '{path}' is invalid: {detail}")]
    ContentParse { path: PathBuf, detail: String },

    /// A required field is empty in one language branch.
    #[error("Version '{version}' ({language}): required field '{field}' is empty")]
    MissingTranslation {
        version: String,
        language: Language,
        field: String,
    },

    /// The English and Polish branches do not have the same structure.
    #[error("Version '{version}': language branches differ in structure:\n  - {}", .issues.join("\n  - "))]
    ParityMismatch { version: String, issues: Vec<String> },

    // ── Environment errors ────────────────────────────────────────────────
    /// The local server port is taken by something that is not a cv2pdf server.
    #[error("Port {port} is already in use by another program.\nPick a free port with --port, or --port 0 for any free port.")]
    PortUnavailable {
        port: u16,
        #[source]
        source: std::io::Error,
    },

    /// The port is held by a cv2pdf server whose content differs from ours.
    #[error("A cv2pdf server at {base_url} is serving different content.\nStop it (or restart it on the current content), or pick another port with --port.")]
    StaleServer { base_url: String },

    /// The local server could not be started for another reason.
    #[error("Failed to start the local site server on {addr}: {source}")]
    ServerStart {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// The PDF engine executable could not be found.
    #[error("{0}")]
    EngineNotFound(#[from] engine_locate::LocateError),

    /// The output directory could not be created.
    #[error("Failed to create output directory '{path}': {source}")]
    OutputDirFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Any other I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // ── Outcome errors ────────────────────────────────────────────────────
    /// Every attempted combination failed.
    ///
    /// With fail-fast, `skipped` counts the planned combinations that were
    /// never attempted.
    #[error("{}", all_failed_message(.attempted, .skipped, .first_error))]
    AllCombinationsFailed {
        attempted: usize,
        skipped: usize,
        first_error: String,
    },

    /// Some combinations succeeded but at least one failed.
    ///
    /// Returned by [`crate::output::ExportReport::into_result`] when the
    /// caller treats any failure as an error (the CLI does).
    #[error("{failed}/{total} export combinations failed")]
    PartialFailure {
        success: usize,
        failed: usize,
        total: usize,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

fn all_failed_message(attempted: &usize, skipped: &usize, first_error: &str) -> String {
    let head = if *skipped == 0 {
        format!("All {attempted} export combinations failed.")
    } else {
        format!(
            "{attempted} export combination(s) attempted, all failed; \
             {skipped} not attempted (fail-fast)."
        )
    };
    format!("{head}\nFirst error: {first_error}")
}

/// A failure exporting one (version, language) combination.
///
/// Every variant names the pair so that a batch report identifies which
/// export failed without further context.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum ExportError {
    /// The page did not answer, answered with an error, or lacked the
    /// readiness marker.
    #[error("{version}/{language}: page {url} unavailable: {reason}")]
    PageUnavailable {
        version: String,
        language: Language,
        url: String,
        reason: String,
    },

    /// The engine process could not be spawned.
    #[error("{version}/{language}: failed to launch {engine}: {detail}")]
    EngineSpawn {
        version: String,
        language: Language,
        engine: String,
        detail: String,
    },

    /// The engine exited with a failure status.
    #[error("{version}/{language}: {engine} exited with {status}: {stderr}")]
    EngineFailed {
        version: String,
        language: Language,
        engine: String,
        status: String,
        stderr: String,
    },

    /// The engine did not finish within the render timeout.
    #[error("{version}/{language}: {engine} did not finish within {secs}s")]
    Timeout {
        version: String,
        language: Language,
        engine: String,
        secs: u64,
    },

    /// The engine reported success but wrote nothing.
    #[error("{version}/{language}: engine produced an empty file")]
    EmptyOutput { version: String, language: Language },

    /// The engine wrote something that is not a PDF.
    #[error("{version}/{language}: engine output is not a PDF (first bytes: {magic:?})")]
    NotAPdf {
        version: String,
        language: Language,
        magic: Vec<u8>,
    },

    /// Staging or moving the PDF into place failed.
    #[error("{version}/{language}: failed to write '{path}': {detail}")]
    OutputWriteFailed {
        version: String,
        language: Language,
        path: PathBuf,
        detail: String,
    },
}

impl ExportError {
    /// Version identifier of the failed combination.
    pub fn version(&self) -> &str {
        match self {
            ExportError::PageUnavailable { version, .. }
            | ExportError::EngineSpawn { version, .. }
            | ExportError::EngineFailed { version, .. }
            | ExportError::Timeout { version, .. }
            | ExportError::EmptyOutput { version, .. }
            | ExportError::NotAPdf { version, .. }
            | ExportError::OutputWriteFailed { version, .. } => version,
        }
    }

    /// Language of the failed combination.
    pub fn language(&self) -> Language {
        match self {
            ExportError::PageUnavailable { language, .. }
            | ExportError::EngineSpawn { language, .. }
            | ExportError::EngineFailed { language, .. }
            | ExportError::Timeout { language, .. }
            | ExportError::EmptyOutput { language, .. }
            | ExportError::NotAPdf { language, .. }
            | ExportError::OutputWriteFailed { language, .. } => *language,
        }
    }
}
