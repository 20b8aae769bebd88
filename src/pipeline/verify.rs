//! Check an engine's output and move it onto its final name.
//!
//! Engines write into a staging directory inside the output directory, so
//! the final rename stays on one filesystem and a half-written or bogus
//! file never replaces a good PDF from an earlier run.

use super::plan::Combination;
use crate::error::ExportError;
use std::path::Path;
use tracing::debug;

const PDF_MAGIC: &[u8] = b"%PDF";

/// Verify `staged` is a non-empty PDF, then rename it to `target`
/// (replacing any previous file). Returns the size in bytes.
pub async fn persist(combo: &Combination, staged: &Path, target: &Path) -> Result<u64, ExportError> {
    let bytes = match tokio::fs::read(staged).await {
        Ok(b) => b,
        // Engine claimed success without writing anything.
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
        Err(e) => {
            return Err(ExportError::OutputWriteFailed {
                version: combo.version.clone(),
                language: combo.language,
                path: staged.to_path_buf(),
                detail: e.to_string(),
            })
        }
    };

    check_pdf(combo, &bytes)?;

    tokio::fs::rename(staged, target)
        .await
        .map_err(|e| ExportError::OutputWriteFailed {
            version: combo.version.clone(),
            language: combo.language,
            path: target.to_path_buf(),
            detail: e.to_string(),
        })?;

    debug!("{} → {} ({} bytes)", combo, target.display(), bytes.len());
    Ok(bytes.len() as u64)
}

/// Reject empty buffers and anything without the `%PDF` header.
pub fn check_pdf(combo: &Combination, bytes: &[u8]) -> Result<(), ExportError> {
    if bytes.is_empty() {
        return Err(ExportError::EmptyOutput {
            version: combo.version.clone(),
            language: combo.language,
        });
    }
    if !bytes.starts_with(PDF_MAGIC) {
        return Err(ExportError::NotAPdf {
            version: combo.version.clone(),
            language: combo.language,
            magic: bytes.iter().take(PDF_MAGIC.len()).copied().collect(),
        });
    }
    Ok(())
}
