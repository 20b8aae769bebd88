//! Local site server.
//!
//! Serves the rendered résumé page, the raw content documents, a health
//! check and the static assets of the site directory:
//!
//! | Route                | Response                                        |
//! |----------------------|-------------------------------------------------|
//! | `GET /`, `/cv.html`  | page for `?version=..&language=..`              |
//! | `GET /content/:v`    | the version's `ContentDocument` as JSON         |
//! | `GET /health`        | `{"status":"ok","service":"cv2pdf",...}`        |
//! | anything else        | file from the site directory (`ServeDir`)       |
//!
//! [`SiteServer`] runs the router on a background tokio task and stops it
//! when shut down or dropped. If the port is already held by another
//! cv2pdf server (say, a `cv2pdf --serve` preview in another terminal) it
//! can attach to that one instead of failing, provided that server reports
//! the same content fingerprint.

use crate::config::{ExportConfig, Language, PAGE_PATH};
use crate::content::ContentStore;
use crate::error::Cv2PdfError;
use crate::render;
use axum::extract::{Path as UrlPath, Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

/// Value of `service` in the health response; identifies a reusable server.
pub const SERVICE_NAME: &str = "cv2pdf";

const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);
const HEALTH_TIMEOUT: Duration = Duration::from_secs(2);

// ── Router ───────────────────────────────────────────────────────────────

#[derive(Clone)]
struct SiteState {
    store: Arc<ContentStore>,
}

/// Build the site router over `store`, falling back to files in `site_dir`.
pub fn build_router(store: Arc<ContentStore>, site_dir: &Path) -> Router {
    Router::new()
        .route("/", get(page_handler))
        .route(PAGE_PATH, get(page_handler))
        .route("/content/:version", get(content_handler))
        .route("/health", get(health_handler))
        .fallback_service(ServeDir::new(site_dir))
        .with_state(SiteState { store })
        .layer(TraceLayer::new_for_http())
}

#[derive(Debug, Deserialize)]
struct PageQuery {
    version: Option<String>,
    language: Option<String>,
}

/// Page-level failures, rendered as visible error pages.
#[derive(Debug)]
enum PageError {
    UnknownVersion { requested: String, available: Vec<String> },
    UnknownLanguage { requested: String },
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        let (status, html) = match &self {
            PageError::UnknownVersion { requested, available } => (
                StatusCode::NOT_FOUND,
                render::render_error_page(
                    "unknown-version",
                    "Unknown résumé version",
                    &format!(
                        "There is no version '{requested}'. Available: {}.",
                        available.join(", ")
                    ),
                ),
            ),
            PageError::UnknownLanguage { requested } => (
                StatusCode::BAD_REQUEST,
                render::render_error_page(
                    "unknown-language",
                    "Unknown language",
                    &format!("There is no language '{requested}'. Use en or pl."),
                ),
            ),
        };
        warn!("Page request rejected: {:?}", self);
        (status, Html(html.into_string())).into_response()
    }
}

/// Treat `?version=` like a missing parameter.
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

async fn page_handler(
    State(state): State<SiteState>,
    Query(query): Query<PageQuery>,
) -> Result<Html<String>, PageError> {
    let store = &state.store;
    let version = non_empty(query.version)
        .map(|v| v.trim().to_ascii_lowercase())
        .unwrap_or_else(|| store.default_version().to_string());

    let doc = store.get(&version).ok_or_else(|| PageError::UnknownVersion {
        requested: version.clone(),
        available: store.versions(),
    })?;

    let language = match non_empty(query.language) {
        None => Language::En,
        Some(l) => l
            .parse::<Language>()
            .map_err(|_| PageError::UnknownLanguage { requested: l })?,
    };

    debug!("Rendering {}/{}", version, language);
    Ok(Html(render::render_page(
        doc,
        &version,
        language,
        &store.versions(),
    )
    .into_string()))
}

async fn content_handler(
    State(state): State<SiteState>,
    UrlPath(version): UrlPath<String>,
) -> Response {
    match state.store.get(&version) {
        Some(doc) => Json(doc.clone()).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({
                "error": "unknown-version",
                "requested": version,
                "available": state.store.versions(),
            })),
        )
            .into_response(),
    }
}

async fn health_handler(State(state): State<SiteState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "versions": state.store.versions(),
        "fingerprint": state.store.fingerprint(),
    }))
}

// ── Server lifecycle ─────────────────────────────────────────────────────

struct Running {
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<std::io::Result<()>>,
}

/// A site server started by this process, or attached to an existing one.
pub struct SiteServer {
    base_url: String,
    port: u16,
    running: Option<Running>,
}

impl SiteServer {
    /// Start serving `store` and `config.site_dir` on `config.host:config.port`.
    ///
    /// Port `0` binds any free port. When the port is taken by a cv2pdf
    /// server and `config.reuse_running_server` is set, that server is used
    /// instead; otherwise the result is [`Cv2PdfError::PortUnavailable`].
    pub async fn start(store: Arc<ContentStore>, config: &ExportConfig) -> Result<Self, Cv2PdfError> {
        if !config.site_dir.is_dir() {
            return Err(Cv2PdfError::SiteNotFound {
                path: config.site_dir.clone(),
            });
        }

        let host = config.host.as_str();
        let listener = match tokio::net::TcpListener::bind((host, config.port)).await {
            Ok(l) => l,
            Err(e) if e.kind() == std::io::ErrorKind::AddrInUse => {
                let base_url = format!("http://{host}:{}", config.port);
                if config.reuse_running_server {
                    if let Some(running) = running_server(&base_url).await {
                        if running.fingerprint.as_deref() != Some(store.fingerprint()) {
                            warn!(
                                "Server at {} has versions [{}] and different content",
                                base_url,
                                running.versions.join(", ")
                            );
                            return Err(Cv2PdfError::StaleServer { base_url });
                        }
                        info!("Reusing cv2pdf server already running at {}", base_url);
                        return Ok(Self {
                            base_url,
                            port: config.port,
                            running: None,
                        });
                    }
                }
                return Err(Cv2PdfError::PortUnavailable {
                    port: config.port,
                    source: e,
                });
            }
            Err(e) => {
                return Err(Cv2PdfError::ServerStart {
                    addr: format!("{host}:{}", config.port),
                    source: e,
                })
            }
        };

        let local = listener.local_addr()?;
        let base_url = format!("http://{}", client_addr(local));
        let app = build_router(store, &config.site_dir);

        let (tx, rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = rx.await;
                })
                .await
        });

        info!("Serving {} at {}", config.site_dir.display(), base_url);
        Ok(Self {
            base_url,
            port: local.port(),
            running: Some(Running {
                shutdown: Some(tx),
                task,
            }),
        })
    }

    /// `http://host:port`, without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The bound port (the actual one when started with port 0).
    pub fn port(&self) -> u16 {
        self.port
    }

    /// True when attached to a server started elsewhere.
    pub fn is_reused(&self) -> bool {
        self.running.is_none()
    }

    /// Stop the server and wait for in-flight requests to finish.
    ///
    /// A reused server is left running.
    pub async fn shutdown(mut self) -> Result<(), Cv2PdfError> {
        let Some(mut running) = self.running.take() else {
            return Ok(());
        };
        if let Some(tx) = running.shutdown.take() {
            let _ = tx.send(());
        }
        match tokio::time::timeout(SHUTDOWN_GRACE, &mut running.task).await {
            Ok(Ok(result)) => result.map_err(|e| Cv2PdfError::ServerStart {
                addr: self.base_url.clone(),
                source: e,
            })?,
            Ok(Err(join)) => {
                return Err(Cv2PdfError::Internal(format!("server task failed: {join}")))
            }
            Err(_) => {
                warn!("Server did not stop within {:?}; aborting", SHUTDOWN_GRACE);
                running.task.abort();
            }
        }
        debug!("Server at {} stopped", self.base_url);
        Ok(())
    }
}

impl Drop for SiteServer {
    fn drop(&mut self) {
        if let Some(mut running) = self.running.take() {
            if let Some(tx) = running.shutdown.take() {
                let _ = tx.send(());
            }
        }
    }
}

/// What a running cv2pdf server reports on `/health`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunningServer {
    pub versions: Vec<String>,
    /// Absent when the server predates content fingerprints.
    pub fingerprint: Option<String>,
}

/// Ask `base_url/health` whether a cv2pdf server is there.
pub async fn running_server(base_url: &str) -> Option<RunningServer> {
    let client = reqwest::Client::builder()
        .timeout(HEALTH_TIMEOUT)
        .no_proxy()
        .build()
        .ok()?;
    let body: Value = client
        .get(format!("{base_url}/health"))
        .send()
        .await
        .ok()?
        .json()
        .await
        .ok()?;
    if body.get("service")?.as_str()? != SERVICE_NAME {
        return None;
    }
    let versions = body
        .get("versions")?
        .as_array()?
        .iter()
        .filter_map(|v| v.as_str().map(str::to_string))
        .collect();
    let fingerprint = body
        .get("fingerprint")
        .and_then(Value::as_str)
        .map(str::to_string);
    Some(RunningServer {
        versions,
        fingerprint,
    })
}

/// Address clients should connect to; wildcard binds map to loopback.
fn client_addr(bound: SocketAddr) -> SocketAddr {
    if bound.ip().is_unspecified() {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), bound.port())
    } else {
        bound
    }
}
