//! Make sure the page is served and fully rendered before printing it.
//!
//! The engine would happily print an error page or a connection-refused
//! screen. Fetching the URL first turns those into a `PageUnavailable`
//! naming the combination.

use super::plan::Combination;
use crate::error::ExportError;
use crate::render::READY_MARKER;
use std::time::Duration;
use tracing::debug;

/// HTTP client for preflight requests, bounded by `timeout_secs`.
pub fn client(timeout_secs: u64) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .no_proxy()
        .build()
}

/// GET `url`; it must answer 200 and carry the readiness marker.
pub async fn check_page(
    client: &reqwest::Client,
    combo: &Combination,
    url: &str,
) -> Result<(), ExportError> {
    let unavailable = |reason: String| ExportError::PageUnavailable {
        version: combo.version.clone(),
        language: combo.language,
        url: url.to_string(),
        reason,
    };

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            unavailable("request timed out".into())
        } else {
            unavailable(e.to_string())
        }
    })?;

    let status = response.status();
    if !status.is_success() {
        return Err(unavailable(format!("HTTP {status}")));
    }

    let body = response
        .text()
        .await
        .map_err(|e| unavailable(format!("failed to read body: {e}")))?;
    if !body.contains(READY_MARKER) {
        return Err(unavailable("page is missing the readiness marker".into()));
    }

    debug!("Preflight ok for {} ({} bytes)", combo, body.len());
    Ok(())
}
