//! Load-time checks on a [`ContentDocument`].
//!
//! Two checks run for every version:
//!
//! - [`check_required`]: required text fields are non-empty in both
//!   branches. Failing this is always an error.
//! - [`parity_issues`]: the `en` and `pl` branches have the same shape
//!   (same number of entries per section, same optional fields present).
//!   Whether a mismatch is fatal is up to the caller.

use super::{ContentDocument, CvContent};
use crate::config::Language;
use crate::error::Cv2PdfError;

/// Fail on the first empty required field, naming its path.
pub fn check_required(version: &str, doc: &ContentDocument) -> Result<(), Cv2PdfError> {
    for lang in Language::ALL {
        if let Some(field) = first_empty_field(doc.get(lang)) {
            return Err(Cv2PdfError::MissingTranslation {
                version: version.to_string(),
                language: lang,
                field,
            });
        }
    }
    Ok(())
}

fn blank(s: &str) -> bool {
    s.trim().is_empty()
}

fn first_empty_field(c: &CvContent) -> Option<String> {
    let top = [
        ("name", c.name.as_str()),
        ("headline", c.headline.as_str()),
        ("intro", c.intro.as_str()),
        ("labels.contact", c.labels.contact.as_str()),
        ("labels.experience", c.labels.experience.as_str()),
        ("labels.skills", c.labels.skills.as_str()),
        ("labels.education", c.labels.education.as_str()),
        ("labels.languages", c.labels.languages.as_str()),
    ];
    if let Some((field, _)) = top.iter().find(|(_, v)| blank(v)) {
        return Some(field.to_string());
    }

    for (i, item) in c.contact.iter().enumerate() {
        if blank(&item.label) {
            return Some(format!("contact[{i}].label"));
        }
        if blank(&item.value) {
            return Some(format!("contact[{i}].value"));
        }
    }
    for (i, e) in c.experience.iter().enumerate() {
        for (name, v) in [("role", &e.role), ("company", &e.company), ("period", &e.period)] {
            if blank(v) {
                return Some(format!("experience[{i}].{name}"));
            }
        }
        if let Some(j) = e.highlights.iter().position(|h| blank(h)) {
            return Some(format!("experience[{i}].highlights[{j}]"));
        }
    }
    for (i, g) in c.skills.iter().enumerate() {
        if blank(&g.category) {
            return Some(format!("skills[{i}].category"));
        }
        if let Some(j) = g.items.iter().position(|s| blank(s)) {
            return Some(format!("skills[{i}].items[{j}]"));
        }
    }
    for (i, e) in c.education.iter().enumerate() {
        for (name, v) in [
            ("degree", &e.degree),
            ("institution", &e.institution),
            ("period", &e.period),
        ] {
            if blank(v) {
                return Some(format!("education[{i}].{name}"));
            }
        }
    }
    for (i, l) in c.languages.iter().enumerate() {
        if blank(&l.name) {
            return Some(format!("languages[{i}].name"));
        }
        if blank(&l.level) {
            return Some(format!("languages[{i}].level"));
        }
    }
    None
}

/// Every structural difference between the `en` and `pl` branches.
pub fn parity_issues(doc: &ContentDocument) -> Vec<String> {
    let (en, pl) = (&doc.en, &doc.pl);
    let mut issues = Vec::new();

    let mut count = |section: &str, a: usize, b: usize| {
        if a != b {
            issues.push(format!("{section}: en has {a} entries, pl has {b}"));
        }
    };
    count("contact", en.contact.len(), pl.contact.len());
    count("experience", en.experience.len(), pl.experience.len());
    count("skills", en.skills.len(), pl.skills.len());
    count("education", en.education.len(), pl.education.len());
    count("languages", en.languages.len(), pl.languages.len());

    presence(&mut issues, "photo", en.photo.is_some(), pl.photo.is_some());
    presence(&mut issues, "footer", en.footer.is_some(), pl.footer.is_some());

    for (i, (a, b)) in en.contact.iter().zip(&pl.contact).enumerate() {
        presence(&mut issues, &format!("contact[{i}].href"), a.href.is_some(), b.href.is_some());
    }
    for (i, (a, b)) in en.experience.iter().zip(&pl.experience).enumerate() {
        if a.highlights.len() != b.highlights.len() {
            issues.push(format!(
                "experience[{i}].highlights: en has {}, pl has {}",
                a.highlights.len(),
                b.highlights.len()
            ));
        }
        presence(
            &mut issues,
            &format!("experience[{i}].location"),
            a.location.is_some(),
            b.location.is_some(),
        );
    }
    for (i, (a, b)) in en.skills.iter().zip(&pl.skills).enumerate() {
        if a.items.len() != b.items.len() {
            issues.push(format!(
                "skills[{i}].items: en has {}, pl has {}",
                a.items.len(),
                b.items.len()
            ));
        }
    }
    for (i, (a, b)) in en.education.iter().zip(&pl.education).enumerate() {
        presence(
            &mut issues,
            &format!("education[{i}].details"),
            a.details.is_some(),
            b.details.is_some(),
        );
    }

    issues
}

fn presence(issues: &mut Vec<String>, field: &str, en: bool, pl: bool) {
    if en != pl {
        let (has, lacks) = if en { ("en", "pl") } else { ("pl", "en") };
        issues.push(format!("{field}: present in {has}, missing in {lacks}"));
    }
}
