//! Site server tests over real HTTP, using the repository's `site/` content.
//!
//! Each test starts its own server on an ephemeral port.

use cv2pdf::config::Language;
use cv2pdf::pipeline::preflight;
use cv2pdf::{Combination, ContentStore, Cv2PdfError, ExportConfig, ExportError, SiteServer};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::PathBuf;
use std::sync::Arc;

// ── Test helpers ─────────────────────────────────────────────────────────────

fn site_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("site")
}

fn store() -> Arc<ContentStore> {
    Arc::new(ContentStore::load(&site_dir().join("content"), true).unwrap())
}

async fn start() -> (SiteServer, Arc<ContentStore>) {
    let store = store();
    let config = ExportConfig::builder()
        .site_dir(site_dir())
        .port(0)
        .build()
        .unwrap();
    let server = SiteServer::start(store.clone(), &config).await.unwrap();
    (server, store)
}

fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

async fn get(url: &str) -> (u16, String) {
    let resp = client().get(url).send().await.unwrap();
    let status = resp.status().as_u16();
    (status, resp.text().await.unwrap())
}

/// The `<article>` holding `lang`, up to its closing tag.
fn branch(page: &str, lang: Language) -> String {
    let open = format!(r#"<article class="cv-lang" lang="{lang}""#);
    let start = page
        .find(&open)
        .unwrap_or_else(|| panic!("no {lang} branch in page"));
    let end = start + page[start..].find("</article>").unwrap();
    page[start..end].to_string()
}

/// `text` as it appears in rendered markup.
fn escaped(text: &str) -> String {
    maud::html! { (text) }.into_string()
}

static TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<(/?[a-z0-9]+)(?:[^>]*?\sclass="([^"]*)")?[^>]*>"#).unwrap());

/// Element/class sequence with text and other attributes stripped.
fn skeleton(fragment: &str) -> Vec<String> {
    TAG.captures_iter(fragment)
        .map(|c| {
            format!(
                "{}.{}",
                &c[1],
                c.get(2).map(|m| m.as_str()).unwrap_or_default()
            )
        })
        .collect()
}

fn other(lang: Language) -> Language {
    match lang {
        Language::En => Language::Pl,
        Language::Pl => Language::En,
    }
}

// ── Page rendering ───────────────────────────────────────────────────────────

#[tokio::test]
async fn every_combination_renders_its_own_language() {
    let (server, store) = start().await;

    for version in store.versions() {
        let doc = store.get(&version).unwrap();
        for lang in Language::ALL {
            let url = Combination::new(version.as_str(), lang).url(server.base_url());
            let (status, page) = get(&url).await;
            assert_eq!(status, 200, "{url}");
            assert!(page.contains(r#"data-cv-ready="true""#));
            assert!(page.contains(&format!(r#"data-version="{version}""#)));
            assert!(page.contains(&format!(r#"data-language="{lang}""#)));

            let visible = branch(&page, lang);
            let content = doc.get(lang);
            let foreign = doc.get(other(lang));
            assert!(!visible.contains(" hidden>"), "{version}/{lang}: visible branch hidden");
            assert!(branch(&page, other(lang)).contains(" hidden>"));

            // Every defined section is present, with this language's labels.
            for label in [
                &content.labels.contact,
                &content.labels.experience,
                &content.labels.skills,
                &content.labels.education,
                &content.labels.languages,
            ] {
                assert!(visible.contains(label.as_str()), "{version}/{lang}: missing {label}");
            }
            let escaped_role = escaped(&content.experience[0].role);
            assert!(visible.contains(&escaped_role));

            // No text of the other language leaks into the visible branch.
            for (mine, theirs) in [
                (&content.headline, &foreign.headline),
                (&content.labels.experience, &foreign.labels.experience),
                (&content.labels.education, &foreign.labels.education),
            ] {
                if mine != theirs {
                    let theirs = escaped(theirs);
                    assert!(
                        !visible.contains(&theirs),
                        "{version}/{lang}: leaked '{theirs}'"
                    );
                }
            }
        }
    }

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn language_branches_share_one_skeleton() {
    let (server, store) = start().await;

    for version in store.versions() {
        let url = Combination::new(version.as_str(), Language::En).url(server.base_url());
        let (_, page) = get(&url).await;
        let en = skeleton(&branch(&page, Language::En));
        let pl = skeleton(&branch(&page, Language::Pl));
        assert!(en.len() > 30, "{version}: suspiciously small page");
        assert_eq!(en, pl, "{version}: branches differ in structure");
    }

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn missing_parameters_use_defaults() {
    let (server, store) = start().await;

    let (status, page) = get(&format!("{}/", server.base_url())).await;
    assert_eq!(status, 200);
    assert!(page.contains(&format!(r#"data-version="{}""#, store.default_version())));
    assert!(page.contains(r#"data-language="en""#));

    let (status, page) = get(&format!("{}/cv.html?version=pm", server.base_url())).await;
    assert_eq!(status, 200);
    assert!(page.contains(r#"data-version="pm""#));
    assert!(page.contains(r#"data-language="en""#));

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn unknown_version_is_a_visible_404() {
    let (server, _) = start().await;

    let (status, page) = get(&format!(
        "{}/cv.html?version=sales&language=en",
        server.base_url()
    ))
    .await;
    assert_eq!(status, 404);
    assert!(page.contains(r#"data-cv-error="unknown-version""#));
    assert!(page.contains("sales"));
    assert!(page.contains("it, pm"));
    assert!(!page.contains("data-cv-ready"));

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn unknown_language_is_a_visible_400() {
    let (server, _) = start().await;

    let (status, page) = get(&format!(
        "{}/cv.html?version=it&language=de",
        server.base_url()
    ))
    .await;
    assert_eq!(status, 400);
    assert!(page.contains(r#"data-cv-error="unknown-language""#));
    assert!(page.contains("There is no language 'de'"));

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn switcher_script_and_print_stylesheet_are_served() {
    let (server, _) = start().await;

    let (_, page) = get(&format!("{}/cv.html?version=it&language=pl", server.base_url())).await;
    assert!(page.contains("history.replaceState"));
    assert!(page.contains(r#"<button type="button" data-lang="pl" aria-pressed="true">Polski</button>"#));
    assert!(page.contains(r#"href="/styles/cv.css""#));

    let (status, css) = get(&format!("{}/styles/cv.css", server.base_url())).await;
    assert_eq!(status, 200);
    assert!(css.contains("@page"));
    assert!(css.contains("size: A4"));
    assert!(css.contains(".no-print"));

    let (status, _) = get(&format!("{}/images/profile.svg", server.base_url())).await;
    assert_eq!(status, 200);

    let (status, _) = get(&format!("{}/missing.txt", server.base_url())).await;
    assert_eq!(status, 404);

    server.shutdown().await.unwrap();
}

// ── JSON routes ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn content_and_health_routes() {
    let (server, store) = start().await;
    let base = server.base_url().to_string();

    let doc: serde_json::Value = client()
        .get(format!("{base}/content/it"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(doc["en"]["name"], store.get("it").unwrap().en.name.as_str());
    assert!(doc["pl"]["experience"].is_array());

    let resp = client().get(format!("{base}/content/sales")).send().await.unwrap();
    assert_eq!(resp.status().as_u16(), 404);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "unknown-version");

    let health: serde_json::Value = client()
        .get(format!("{base}/health"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "ok");
    assert_eq!(health["service"], "cv2pdf");
    assert_eq!(health["versions"], serde_json::json!(["it", "pm"]));
    assert_eq!(health["fingerprint"], store.fingerprint());

    server.shutdown().await.unwrap();
}

// ── Preflight against a live server ──────────────────────────────────────────

#[tokio::test]
async fn preflight_accepts_ready_page_and_rejects_errors() {
    let (server, _) = start().await;
    let client = preflight::client(5).unwrap();

    let ok = Combination::new("it", Language::Pl);
    preflight::check_page(&client, &ok, &ok.url(server.base_url()))
        .await
        .unwrap();

    let unknown = Combination::new("sales", Language::En);
    let err = preflight::check_page(&client, &unknown, &unknown.url(server.base_url()))
        .await
        .unwrap_err();
    match err {
        ExportError::PageUnavailable { version, reason, .. } => {
            assert_eq!(version, "sales");
            assert!(reason.contains("404"), "got: {reason}");
        }
        other => panic!("expected PageUnavailable, got {other:?}"),
    }

    let base = server.base_url().to_string();
    server.shutdown().await.unwrap();

    let err = preflight::check_page(&client, &ok, &ok.url(&base))
        .await
        .unwrap_err();
    assert!(matches!(err, ExportError::PageUnavailable { .. }));
}

#[tokio::test]
async fn site_dir_must_exist() {
    let dir = tempfile::tempdir().unwrap();
    let config = ExportConfig::builder()
        .site_dir(dir.path().join("absent"))
        .port(0)
        .build()
        .unwrap();
    let err = SiteServer::start(store(), &config).await.err().unwrap();
    assert!(matches!(err, Cv2PdfError::SiteNotFound { .. }));
}
