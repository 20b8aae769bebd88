//! PDF engines: headless Chrome/Chromium and WeasyPrint.
//!
//! Both are external programs driven through `tokio::process`. Each print
//! is one short-lived child process, bounded by the render timeout and
//! spawned with `kill_on_drop(true)`: when the timeout fires (or the
//! session is torn down) the wait future is dropped and the child with it.
//!
//! Chrome runs against a scratch profile directory owned by the engine, so
//! it never touches the user's real profile and leaves nothing behind.

use super::plan::Combination;
use crate::config::{ExportConfig, Method};
use crate::error::{Cv2PdfError, ExportError};
use engine_locate::EngineKind;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tempfile::TempDir;
use tokio::process::Command;
use tracing::{debug, info};

/// Lines of engine stderr kept in an `EngineFailed` error.
const STDERR_TAIL_LINES: usize = 12;

/// A located engine, ready to print URLs.
#[derive(Debug)]
pub enum Engine {
    Chrome(ChromeEngine),
    WeasyPrint(WeasyPrintEngine),
}

#[derive(Debug)]
pub struct ChromeEngine {
    path: PathBuf,
    profile: TempDir,
    settle_ms: u64,
    no_sandbox: bool,
}

#[derive(Debug)]
pub struct WeasyPrintEngine {
    path: PathBuf,
}

impl Engine {
    /// Locate the engine selected by `config.method`.
    pub fn locate(config: &ExportConfig) -> Result<Self, Cv2PdfError> {
        let engine = match config.method {
            Method::Chrome => {
                let path = engine_locate::locate(EngineKind::Chrome, config.chrome_path.as_deref())?;
                let profile = tempfile::Builder::new()
                    .prefix("cv2pdf-profile-")
                    .tempdir()?;
                Engine::Chrome(ChromeEngine {
                    path,
                    profile,
                    settle_ms: config.settle_ms,
                    no_sandbox: config.no_sandbox,
                })
            }
            Method::WeasyPrint => {
                let path =
                    engine_locate::locate(EngineKind::WeasyPrint, config.weasyprint_path.as_deref())?;
                Engine::WeasyPrint(WeasyPrintEngine { path })
            }
        };
        info!("Using {} at {}", engine.name(), engine.path().display());
        Ok(engine)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Engine::Chrome(_) => Method::Chrome.name(),
            Engine::WeasyPrint(_) => Method::WeasyPrint.name(),
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            Engine::Chrome(c) => &c.path,
            Engine::WeasyPrint(w) => &w.path,
        }
    }

    /// Scratch browser profile, if the engine uses one.
    pub fn profile_dir(&self) -> Option<&Path> {
        match self {
            Engine::Chrome(c) => Some(c.profile.path()),
            Engine::WeasyPrint(_) => None,
        }
    }

    /// Command-line arguments that print `url` into `out`.
    pub fn args(&self, url: &str, out: &Path) -> Vec<OsString> {
        match self {
            Engine::Chrome(c) => {
                let mut args: Vec<OsString> = [
                    "--headless=new",
                    "--disable-gpu",
                    "--no-first-run",
                    "--no-default-browser-check",
                    "--disable-extensions",
                    "--hide-scrollbars",
                    "--run-all-compositor-stages-before-draw",
                    "--no-pdf-header-footer",
                ]
                .into_iter()
                .map(OsString::from)
                .collect();
                args.push(format!("--virtual-time-budget={}", c.settle_ms).into());
                args.push(prefixed("--user-data-dir=", c.profile.path()));
                args.push(prefixed("--print-to-pdf=", out));
                if c.no_sandbox {
                    args.push("--no-sandbox".into());
                }
                args.push(url.into());
                args
            }
            Engine::WeasyPrint(_) => vec![url.into(), out.as_os_str().to_owned()],
        }
    }

    /// Print `url` to `out`, giving up after `timeout`.
    pub async fn print(
        &self,
        combo: &Combination,
        url: &str,
        out: &Path,
        timeout: Duration,
    ) -> Result<(), ExportError> {
        let args = self.args(url, out);
        debug!("{} {:?}", self.path().display(), args);

        let child = Command::new(self.path())
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ExportError::EngineSpawn {
                version: combo.version.clone(),
                language: combo.language,
                engine: self.name().to_string(),
                detail: e.to_string(),
            })?;

        let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(ExportError::EngineSpawn {
                    version: combo.version.clone(),
                    language: combo.language,
                    engine: self.name().to_string(),
                    detail: format!("waiting for process: {e}"),
                })
            }
            Err(_) => {
                return Err(ExportError::Timeout {
                    version: combo.version.clone(),
                    language: combo.language,
                    engine: self.name().to_string(),
                    secs: timeout.as_secs(),
                })
            }
        };

        if !output.status.success() {
            let status = match output.status.code() {
                Some(code) => format!("exit code {code}"),
                None => "a signal".to_string(),
            };
            return Err(ExportError::EngineFailed {
                version: combo.version.clone(),
                language: combo.language,
                engine: self.name().to_string(),
                status,
                stderr: stderr_tail(&output.stderr),
            });
        }
        Ok(())
    }
}

fn prefixed(flag: &str, path: &Path) -> OsString {
    let mut s = OsString::from(flag);
    s.push(path.as_os_str());
    s
}

/// Last few non-empty lines of `stderr`.
fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    if lines.is_empty() {
        return "(no output)".to_string();
    }
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("\n")
}
