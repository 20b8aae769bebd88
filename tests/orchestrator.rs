//! Export orchestration against stand-in engine scripts.
//!
//! The scripts accept the same arguments as the real engines and write a
//! minimal `%PDF` file (or fail in a controlled way), so the whole run
//! (planning, server, preflight, process handling, verification, atomic
//! output) is exercised without a browser. Real engines are covered by
//! `tests/e2e.rs`.

#![cfg(unix)]

use cv2pdf::config::Language;
use cv2pdf::content::ContentDocument;
use cv2pdf::{
    export, Combination, ContentStore, Cv2PdfError, ExportConfig, ExportConfigBuilder, ExportProgressCallback,
    LanguageSelector, Method, SiteServer, VersionSelector,
};
use std::collections::{BTreeMap, BTreeSet};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};
use tempfile::TempDir;

// ── Stand-in engines ─────────────────────────────────────────────────────────

/// Output path: `--print-to-pdf=<path>` (Chrome) or the last argument (WeasyPrint).
const FIND_OUT: &str = r#"out=""
for arg in "$@"; do
  case "$arg" in
    --print-to-pdf=*) out="${arg#--print-to-pdf=}" ;;
  esac
done
if [ -z "$out" ]; then
  for arg in "$@"; do out="$arg"; done
fi
"#;

const ENGINES: &[(&str, &str)] = &[
    ("ok", "printf '%%PDF-1.4\\n%% stand-in\\n' > \"$out\"\n"),
    ("fail", "echo 'renderer crashed' >&2\nexit 3\n"),
    ("slow", "exec sleep 30\n"),
    ("html", "printf '<html></html>' > \"$out\"\n"),
    ("silent", "exit 0\n"),
    (
        "no-polish",
        "case \"$*\" in *language=pl*) echo 'no fonts for pl' >&2; exit 4 ;; esac\n\
         printf '%%PDF-1.4\\n' > \"$out\"\n",
    ),
];

/// Directory with every stand-in script, written once per test binary so no
/// script is still open for writing while another test executes it.
fn engines() -> &'static Path {
    static DIR: OnceLock<TempDir> = OnceLock::new();
    DIR.get_or_init(|| {
        let dir = tempfile::tempdir().unwrap();
        for (name, body) in ENGINES {
            let path = dir.path().join(name);
            std::fs::write(&path, format!("#!/bin/sh\n{FIND_OUT}{body}")).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        }
        dir
    })
    .path()
}

fn engine(name: &str) -> PathBuf {
    engines().join(name)
}

// ── Test helpers ─────────────────────────────────────────────────────────────

fn site_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("site")
}

/// `RUST_LOG=cv2pdf=debug cargo test --test orchestrator -- --nocapture`
/// shows the orchestrator's log lines.
fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn base(out: &Path, engine_name: &str) -> ExportConfigBuilder {
    init_logging();
    ExportConfig::builder()
        .site_dir(site_dir())
        .output_dir(out)
        .port(0)
        .chrome_path(engine(engine_name))
        .settle_ms(100)
        .timeout_secs(10)
}

fn files_in(dir: &Path) -> BTreeSet<String> {
    std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect()
}

fn set(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|s| s.to_string()).collect()
}

// ── Successful runs ──────────────────────────────────────────────────────────

#[tokio::test]
async fn all_versions_both_languages_writes_one_pdf_each() {
    let out = tempfile::tempdir().unwrap();
    let config = base(out.path(), "ok").build().unwrap();

    let report = export(&config).await.unwrap();

    assert!(report.is_success());
    assert_eq!(report.stats.planned, 4);
    assert_eq!(report.stats.succeeded, 4);
    assert_eq!(report.engine, "chrome");
    assert_eq!(
        files_in(out.path()),
        set(&["cv_it_en.pdf", "cv_it_pl.pdf", "cv_pm_en.pdf", "cv_pm_pl.pdf"]),
        "only the PDFs remain; staging is cleaned up"
    );
    for path in report.outputs() {
        let bytes = std::fs::read(path).unwrap();
        assert!(bytes.starts_with(b"%PDF"), "{}", path.display());
    }

    let order: Vec<String> = report
        .results
        .iter()
        .map(|r| r.combination().to_string())
        .collect();
    assert_eq!(order, vec!["it/en", "it/pl", "pm/en", "pm/pl"]);
}

#[tokio::test]
async fn rerun_overwrites_instead_of_accumulating() {
    let out = tempfile::tempdir().unwrap();
    let config = base(out.path(), "ok").build().unwrap();

    export(&config).await.unwrap();
    std::fs::write(out.path().join("cv_it_en.pdf"), b"stale").unwrap();
    export(&config).await.unwrap();

    assert_eq!(files_in(out.path()).len(), 4);
    let bytes = std::fs::read(out.path().join("cv_it_en.pdf")).unwrap();
    assert!(bytes.starts_with(b"%PDF"));
}

#[tokio::test]
async fn single_combination_yields_exactly_one_file() {
    let out = tempfile::tempdir().unwrap();
    let config = base(out.path(), "ok")
        .versions(VersionSelector::One("it".into()))
        .languages(LanguageSelector::En)
        .build()
        .unwrap();

    let report = export(&config).await.unwrap();
    assert_eq!(report.stats.planned, 1);
    assert_eq!(files_in(out.path()), set(&["cv_it_en.pdf"]));
}

#[tokio::test]
async fn prefix_and_nested_output_dir() {
    let out = tempfile::tempdir().unwrap();
    let nested = out.path().join("build").join("pdf");
    let config = base(&nested, "ok")
        .file_prefix("Anna_Nowak")
        .languages(LanguageSelector::Pl)
        .build()
        .unwrap();

    export(&config).await.unwrap();
    assert_eq!(
        files_in(&nested),
        set(&["Anna_Nowak_it_pl.pdf", "Anna_Nowak_pm_pl.pdf"])
    );
}

#[tokio::test]
async fn weasyprint_method_uses_its_own_executable() {
    let out = tempfile::tempdir().unwrap();
    let config = ExportConfig::builder()
        .site_dir(site_dir())
        .output_dir(out.path())
        .port(0)
        .method(Method::WeasyPrint)
        .weasyprint_path(engine("ok"))
        .chrome_path("/nonexistent/chrome")
        .versions(VersionSelector::One("pm".into()))
        .build()
        .unwrap();

    let report = export(&config).await.unwrap();
    assert_eq!(report.engine, "weasyprint");
    assert_eq!(files_in(out.path()), set(&["cv_pm_en.pdf", "cv_pm_pl.pdf"]));
}

#[tokio::test]
async fn running_cv2pdf_server_is_reused_and_left_running() {
    let out = tempfile::tempdir().unwrap();
    let store = Arc::new(cv2pdf::load_store(&base(out.path(), "ok").build().unwrap()).unwrap());
    let preview_config = ExportConfig::builder()
        .site_dir(site_dir())
        .port(0)
        .build()
        .unwrap();
    let preview = SiteServer::start(store, &preview_config).await.unwrap();

    let config = base(out.path(), "ok")
        .port(preview.port())
        .languages(LanguageSelector::En)
        .build()
        .unwrap();
    let report = export(&config).await.unwrap();

    assert_eq!(report.base_url, preview.base_url());
    assert!(cv2pdf::server::running_server(preview.base_url()).await.is_some());
    preview.shutdown().await.unwrap();
}

#[tokio::test]
async fn preview_server_with_edited_content_is_not_reused() {
    let out = tempfile::tempdir().unwrap();
    let loaded = cv2pdf::load_store(&base(out.path(), "ok").build().unwrap()).unwrap();
    let mut documents: BTreeMap<String, ContentDocument> = loaded
        .versions()
        .into_iter()
        .map(|v| {
            let doc = loaded.get(&v).unwrap().clone();
            (v, doc)
        })
        .collect();
    documents.get_mut("it").unwrap().en.headline = "STALE HEADLINE".into();
    let stale = Arc::new(ContentStore::from_documents(documents, true).unwrap());

    let preview_config = ExportConfig::builder()
        .site_dir(site_dir())
        .port(0)
        .build()
        .unwrap();
    let preview = SiteServer::start(stale, &preview_config).await.unwrap();

    let config = base(out.path(), "ok")
        .port(preview.port())
        .versions(VersionSelector::One("it".into()))
        .languages(LanguageSelector::En)
        .build()
        .unwrap();
    let err = export(&config).await.unwrap_err();
    assert!(matches!(err, Cv2PdfError::StaleServer { .. }), "got: {err:?}");
    assert!(err.to_string().contains(preview.base_url()), "got: {err}");
    assert!(files_in(out.path()).is_empty());

    preview.shutdown().await.unwrap();
}

// ── Failures ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn unknown_version_fails_before_any_output() {
    let out = tempfile::tempdir().unwrap();
    let target = out.path().join("pdf");
    let config = base(&target, "ok")
        .versions(VersionSelector::One("sales".into()))
        .build()
        .unwrap();

    let err = export(&config).await.unwrap_err();
    assert!(err.to_string().contains("'sales'"), "got: {err}");
    assert!(!target.exists());
}

#[tokio::test]
async fn engine_failure_carries_status_and_stderr() {
    let out = tempfile::tempdir().unwrap();
    let config = base(out.path(), "fail")
        .versions(VersionSelector::One("it".into()))
        .languages(LanguageSelector::En)
        .build()
        .unwrap();

    match export(&config).await {
        Err(Cv2PdfError::AllCombinationsFailed {
            attempted,
            skipped,
            first_error,
        }) => {
            assert_eq!((attempted, skipped), (1, 0));
            assert!(first_error.contains("it/en"), "got: {first_error}");
            assert!(first_error.contains("exit code 3"), "got: {first_error}");
            assert!(first_error.contains("renderer crashed"), "got: {first_error}");
        }
        other => panic!("expected AllCombinationsFailed, got {other:?}"),
    }
    assert!(files_in(out.path()).is_empty());
}

#[tokio::test]
async fn hung_engine_is_killed_at_the_timeout() {
    let out = tempfile::tempdir().unwrap();
    let config = base(out.path(), "slow")
        .versions(VersionSelector::One("it".into()))
        .languages(LanguageSelector::En)
        .timeout_secs(1)
        .build()
        .unwrap();

    let started = std::time::Instant::now();
    let err = export(&config).await.unwrap_err();
    assert!(started.elapsed().as_secs() < 15, "timeout not enforced");
    assert!(err.to_string().contains("did not finish within 1s"), "got: {err}");
}

#[tokio::test]
async fn non_pdf_and_empty_output_are_rejected() {
    for (name, expected) in [("html", "not a PDF"), ("silent", "empty file")] {
        let out = tempfile::tempdir().unwrap();
        let config = base(out.path(), name)
            .versions(VersionSelector::One("pm".into()))
            .languages(LanguageSelector::Pl)
            .build()
            .unwrap();
        let err = export(&config).await.unwrap_err();
        assert!(err.to_string().contains(expected), "{name}: got {err}");
        assert!(files_in(out.path()).is_empty(), "{name}: nothing may be written");
    }
}

#[tokio::test]
async fn partial_failure_attempts_everything_by_default() {
    let out = tempfile::tempdir().unwrap();
    let config = base(out.path(), "no-polish").build().unwrap();

    let report = export(&config).await.unwrap();
    assert_eq!(report.stats.succeeded, 2);
    assert_eq!(report.stats.failed, 2);
    assert_eq!(report.stats.skipped, 0);
    assert!(report
        .failures()
        .all(|e| e.language() == Language::Pl && e.to_string().contains("no fonts for pl")));
    assert_eq!(files_in(out.path()), set(&["cv_it_en.pdf", "cv_pm_en.pdf"]));

    match report.into_result() {
        Err(Cv2PdfError::PartialFailure { success, failed, total }) => {
            assert_eq!((success, failed, total), (2, 2, 4));
        }
        other => panic!("expected PartialFailure, got {other:?}"),
    }
}

#[tokio::test]
async fn fail_fast_stops_after_first_failure() {
    let out = tempfile::tempdir().unwrap();
    let config = base(out.path(), "no-polish").fail_fast(true).build().unwrap();

    let report = export(&config).await.unwrap();
    assert_eq!(report.results.len(), 2, "it/en ok, it/pl failed, rest skipped");
    assert_eq!(report.stats.skipped, 2);
    assert!(!report.is_success());
    assert_eq!(files_in(out.path()), set(&["cv_it_en.pdf"]));
}

#[tokio::test]
async fn fail_fast_with_every_attempt_failed_reports_what_ran() {
    let out = tempfile::tempdir().unwrap();
    let config = base(out.path(), "fail").fail_fast(true).build().unwrap();

    match export(&config).await {
        Err(
            e @ Cv2PdfError::AllCombinationsFailed {
                attempted,
                skipped,
                ..
            },
        ) => {
            assert_eq!((attempted, skipped), (1, 3));
            let msg = e.to_string();
            assert!(!msg.contains("All 4"), "got: {msg}");
            assert!(msg.contains("3 not attempted"), "got: {msg}");
            assert!(msg.contains("it/en"), "got: {msg}");
        }
        other => panic!("expected AllCombinationsFailed, got {other:?}"),
    }
    assert!(files_in(out.path()).is_empty());
}

// ── Progress events ──────────────────────────────────────────────────────────

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<String>>,
}

impl ExportProgressCallback for Recorder {
    fn on_export_start(&self, total: usize) {
        self.events.lock().unwrap().push(format!("start {total}"));
    }
    fn on_combination_start(&self, index: usize, total: usize, combo: &Combination) {
        self.events
            .lock()
            .unwrap()
            .push(format!("begin {index}/{total} {combo}"));
    }
    fn on_combination_complete(&self, index: usize, _total: usize, combo: &Combination, bytes: u64) {
        assert!(bytes > 0);
        self.events.lock().unwrap().push(format!("ok {index} {combo}"));
    }
    fn on_combination_error(&self, index: usize, _total: usize, combo: &Combination, _e: &str) {
        self.events.lock().unwrap().push(format!("err {index} {combo}"));
    }
    fn on_export_complete(&self, total: usize, success_count: usize) {
        self.events
            .lock()
            .unwrap()
            .push(format!("done {success_count}/{total}"));
    }
}

#[tokio::test]
async fn progress_callback_sees_every_combination_in_order() {
    let out = tempfile::tempdir().unwrap();
    let recorder = Arc::new(Recorder::default());
    let config = base(out.path(), "no-polish")
        .versions(VersionSelector::One("it".into()))
        .progress_callback(recorder.clone())
        .build()
        .unwrap();

    export(&config).await.unwrap();

    let events = recorder.events.lock().unwrap().clone();
    assert_eq!(
        events,
        vec![
            "start 2",
            "begin 1/2 it/en",
            "ok 1 it/en",
            "begin 2/2 it/pl",
            "err 2 it/pl",
            "done 1/2",
        ]
    );
}
