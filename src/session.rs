//! The resources one export run shares across combinations.
//!
//! An [`ExportSession`] is opened once per run and owns:
//!
//! - the [`SiteServer`] (started here, or attached to a running one),
//! - the located [`Engine`] and its scratch browser profile,
//! - the HTTP client used for preflight requests,
//! - a staging directory inside the output directory.
//!
//! [`ExportSession::close`] releases them in order and reports shutdown
//! errors. Dropping a session without closing it still stops the server
//! (shutdown signal on drop), kills any engine child (`kill_on_drop`) and
//! removes the scratch directories (`TempDir` drop).

use crate::config::ExportConfig;
use crate::content::ContentStore;
use crate::error::{Cv2PdfError, ExportError};
use crate::pipeline::engine::Engine;
use crate::pipeline::plan::Combination;
use crate::pipeline::{preflight, verify};
use crate::server::SiteServer;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tracing::{debug, info, warn};

pub struct ExportSession {
    server: SiteServer,
    engine: Engine,
    client: reqwest::Client,
    staging: TempDir,
    output_dir: PathBuf,
    file_prefix: String,
    timeout: Duration,
}

impl ExportSession {
    /// Prepare the output directory, locate the engine and start (or reuse)
    /// the site server.
    pub async fn open(store: Arc<ContentStore>, config: &ExportConfig) -> Result<Self, Cv2PdfError> {
        let output_dir = config.output_dir.clone();
        tokio::fs::create_dir_all(&output_dir)
            .await
            .map_err(|e| Cv2PdfError::OutputDirFailed {
                path: output_dir.clone(),
                source: e,
            })?;

        let engine = Engine::locate(config)?;

        let staging = tempfile::Builder::new()
            .prefix(".cv2pdf-staging-")
            .tempdir_in(&output_dir)
            .map_err(|e| Cv2PdfError::OutputDirFailed {
                path: output_dir.clone(),
                source: e,
            })?;

        let client = preflight::client(config.timeout_secs)
            .map_err(|e| Cv2PdfError::Internal(format!("HTTP client: {e}")))?;

        let server = SiteServer::start(store, config).await?;

        info!(
            "Export session open: {} → {}",
            server.base_url(),
            output_dir.display()
        );
        Ok(Self {
            server,
            engine,
            client,
            staging,
            output_dir,
            file_prefix: config.file_prefix.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        })
    }

    pub fn base_url(&self) -> &str {
        self.server.base_url()
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Final path of `combo`'s PDF.
    pub fn output_path(&self, combo: &Combination) -> PathBuf {
        self.output_dir.join(combo.file_name(&self.file_prefix))
    }

    /// Export one combination: preflight, print, verify, move into place.
    ///
    /// Returns the final path and its size.
    pub async fn export_one(&self, combo: &Combination) -> Result<(PathBuf, u64), ExportError> {
        let url = combo.url(self.server.base_url());
        preflight::check_page(&self.client, combo, &url).await?;

        let staged = self.staging.path().join(combo.file_name(&self.file_prefix));
        // A leftover from an earlier failed attempt must not pass as output.
        let _ = tokio::fs::remove_file(&staged).await;

        self.engine.print(combo, &url, &staged, self.timeout).await?;

        let target = self.output_path(combo);
        let bytes = verify::persist(combo, &staged, &target).await?;
        info!("{} → {} ({} bytes)", combo, target.display(), bytes);
        Ok((target, bytes))
    }

    /// Stop the server and remove the scratch directories.
    pub async fn close(self) -> Result<(), Cv2PdfError> {
        let Self {
            server,
            engine,
            staging,
            ..
        } = self;

        let shutdown = server.shutdown().await;
        drop(engine);
        if let Err(e) = staging.close() {
            warn!("Failed to remove staging directory: {}", e);
        }
        debug!("Export session closed");
        shutdown
    }
}
