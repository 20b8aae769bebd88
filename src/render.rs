//! HTML rendering of a résumé page.
//!
//! The page carries every language branch of one [`ContentDocument`] as a
//! sibling `<article class="cv-lang" lang="..">`. Only the selected branch
//! is visible; the others are `hidden` (and never printed). All branches
//! are produced by the same code path, so they share one element skeleton
//! and switching language changes text only.
//!
//! The inline switcher script toggles branches and rewrites the query
//! string with `history.replaceState`: no reload and no refetch.
//!
//! `<main id="cv">` carries `data-cv-ready="true"`, the marker the export
//! preflight waits for. Error pages carry `data-cv-error` instead.
//!
//! Markup is built with `maud`, so every interpolated value is escaped.

use crate::config::{Language, PAGE_PATH};
use crate::content::{ContentDocument, CvContent};
use maud::{html, Markup, PreEscaped, DOCTYPE};

/// Attribute marking a fully rendered page.
pub const READY_MARKER: &str = r#"data-cv-ready="true""#;

const SWITCHER_SCRIPT: &str = r#"(function () {
  var cv = document.getElementById('cv');
  var buttons = document.querySelectorAll('#language-switcher button');
  function show(lang) {
    var found = false;
    document.querySelectorAll('#cv > article.cv-lang').forEach(function (a) {
      var match = a.lang === lang;
      a.hidden = !match;
      if (match) { found = true; }
    });
    if (!found) { return; }
    cv.dataset.language = lang;
    document.documentElement.lang = lang;
    buttons.forEach(function (b) {
      b.setAttribute('aria-pressed', String(b.dataset.lang === lang));
    });
    var params = new URLSearchParams(window.location.search);
    params.set('version', cv.dataset.version);
    params.set('language', lang);
    history.replaceState(null, '', window.location.pathname + '?' + params.toString());
  }
  buttons.forEach(function (b) {
    b.addEventListener('click', function () { show(b.dataset.lang); });
  });
})();"#;

/// Render the full page for `version`, showing `selected`.
///
/// `versions` feeds the version links in the (non-printed) toolbar.
pub fn render_page(
    doc: &ContentDocument,
    version: &str,
    selected: Language,
    versions: &[String],
) -> Markup {
    let shown = doc.get(selected);
    html! {
        (DOCTYPE)
        html lang=(selected.code()) {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { (shown.name) " – CV" }
                link rel="stylesheet" href="/styles/cv.css";
            }
            body {
                (toolbar(version, selected, versions))
                main id="cv" data-version=(version) data-language=(selected.code()) data-cv-ready="true" {
                    @for lang in Language::ALL {
                        (branch(doc.get(lang), lang, lang == selected))
                    }
                }
                script { (PreEscaped(SWITCHER_SCRIPT)) }
            }
        }
    }
}

/// Render a visible error page. `kind` ends up in `data-cv-error`.
pub fn render_error_page(kind: &str, title: &str, detail: &str) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                title { (title) }
                link rel="stylesheet" href="/styles/cv.css";
            }
            body {
                main id="cv-error" data-cv-error=(kind) {
                    h1 { (title) }
                    p { (detail) }
                }
            }
        }
    }
}

fn toolbar(version: &str, selected: Language, versions: &[String]) -> Markup {
    html! {
        nav id="toolbar" class="no-print" {
            div id="language-switcher" role="group" aria-label="Language" {
                @for lang in Language::ALL {
                    button type="button" data-lang=(lang.code()) aria-pressed=(lang == selected) {
                        (lang.native_name())
                    }
                }
            }
            @if versions.len() > 1 {
                div id="version-switcher" {
                    @for v in versions {
                        a href={ (PAGE_PATH) "?version=" (v) "&language=" (selected.code()) }
                            aria-current=[(v == version).then_some("page")] {
                            (v.to_uppercase())
                        }
                    }
                }
            }
        }
    }
}

fn section(class: &str, heading: &str, body: Markup) -> Markup {
    html! {
        section class={ "cv-section " (class) } {
            h2 { (heading) }
            (body)
        }
    }
}

fn branch(c: &CvContent, lang: Language, visible: bool) -> Markup {
    html! {
        article class="cv-lang" lang=(lang.code()) hidden[!visible] {
            header class="cv-header" {
                @if let Some(photo) = &c.photo {
                    img class="cv-photo" src=(asset_url(photo)) alt=(c.name);
                }
                div class="cv-identity" {
                    h1 class="cv-name" { (c.name) }
                    p class="cv-headline" { (c.headline) }
                }
            }
            section class="cv-section cv-intro" {
                p { (c.intro) }
            }
            @if !c.contact.is_empty() {
                (section("cv-contact", &c.labels.contact, html! {
                    ul class="cv-contact-list" {
                        @for item in &c.contact {
                            li {
                                span class="cv-contact-label" { (item.label) }
                                " "
                                @if let Some(href) = &item.href {
                                    a href=(href) { (item.value) }
                                } @else {
                                    (item.value)
                                }
                            }
                        }
                    }
                }))
            }
            @if !c.experience.is_empty() {
                (section("cv-experience", &c.labels.experience, html! {
                    @for e in &c.experience {
                        div class="cv-entry" {
                            div class="cv-entry-head" {
                                h3 class="cv-role" { (e.role) }
                                span class="cv-period" { (e.period) }
                            }
                            p class="cv-org" {
                                (e.company)
                                @if let Some(location) = &e.location {
                                    " "
                                    span class="cv-location" { (location) }
                                }
                            }
                            @if !e.highlights.is_empty() {
                                ul class="cv-highlights" {
                                    @for h in &e.highlights {
                                        li { (h) }
                                    }
                                }
                            }
                        }
                    }
                }))
            }
            @if !c.skills.is_empty() {
                (section("cv-skills", &c.labels.skills, html! {
                    dl class="cv-skill-groups" {
                        @for g in &c.skills {
                            dt { (g.category) }
                            dd { (g.items.join(", ")) }
                        }
                    }
                }))
            }
            @if !c.education.is_empty() {
                (section("cv-education", &c.labels.education, html! {
                    @for e in &c.education {
                        div class="cv-entry" {
                            div class="cv-entry-head" {
                                h3 class="cv-degree" { (e.degree) }
                                span class="cv-period" { (e.period) }
                            }
                            p class="cv-org" { (e.institution) }
                            @if let Some(details) = &e.details {
                                p class="cv-details" { (details) }
                            }
                        }
                    }
                }))
            }
            @if !c.languages.is_empty() {
                (section("cv-languages", &c.labels.languages, html! {
                    ul class="cv-language-list" {
                        @for l in &c.languages {
                            li {
                                span class="cv-language-name" { (l.name) }
                                " "
                                span class="cv-language-level" { (l.level) }
                            }
                        }
                    }
                }))
            }
            @if let Some(footer) = &c.footer {
                footer class="cv-footer" {
                    p { (footer) }
                }
            }
        }
    }
}

/// Site-relative asset paths become root-relative; absolute URLs pass through.
fn asset_url(path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") || path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}
