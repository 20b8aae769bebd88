//! Content store: typed résumé documents loaded from YAML.
//!
//! One file per résumé version lives in the content directory
//! (`site/content/it.yaml`, `site/content/pm.yaml`, ...). Each file holds two
//! parallel language branches, `en` and `pl`, with the same sections.
//!
//! Documents are deserialised into explicit records and validated when the
//! store is loaded, so a missing translation or a malformed entry is
//! reported before any server or browser is started rather than showing up
//! as a half-empty page in a PDF.
//!
//! ```yaml
//! en:
//!   name: Jane Doe
//!   headline: Software Engineer
//!   intro: ...
//!   labels: { contact: Contact, experience: Experience, skills: Skills,
//!             education: Education, languages: Languages }
//!   experience:
//!     - role: Backend Engineer
//!       company: Acme
//!       period: 2021 – present
//!       highlights: [ ... ]
//! pl:
//!   name: Jane Doe
//!   ...
//! ```

pub mod parity;

use crate::config::{is_valid_version_id, Language, ALL_VERSIONS};
use crate::error::Cv2PdfError;
use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Version used when a page request names none, if the store has it.
pub const PREFERRED_DEFAULT_VERSION: &str = "it";

// ── Schema ───────────────────────────────────────────────────────────────

/// All text of one résumé version, in every supported language.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContentDocument {
    pub en: CvContent,
    pub pl: CvContent,
}

impl ContentDocument {
    /// The branch for `language`.
    pub fn get(&self, language: Language) -> &CvContent {
        match language {
            Language::En => &self.en,
            Language::Pl => &self.pl,
        }
    }
}

/// One language branch of a résumé.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CvContent {
    pub name: String,
    pub headline: String,
    pub intro: String,
    /// Site-relative path of the profile picture.
    #[serde(default)]
    pub photo: Option<String>,
    #[serde(default)]
    pub contact: Vec<ContactItem>,
    pub labels: SectionLabels,
    #[serde(default)]
    pub experience: Vec<ExperienceEntry>,
    #[serde(default)]
    pub skills: Vec<SkillGroup>,
    #[serde(default)]
    pub education: Vec<EducationEntry>,
    #[serde(default)]
    pub languages: Vec<LanguageSkill>,
    /// Closing line, e.g. the personal-data processing consent clause.
    #[serde(default)]
    pub footer: Option<String>,
}

/// Section headings, translated per branch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SectionLabels {
    pub contact: String,
    pub experience: String,
    pub skills: String,
    pub education: String,
    pub languages: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContactItem {
    pub label: String,
    pub value: String,
    #[serde(default)]
    pub href: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExperienceEntry {
    pub role: String,
    pub company: String,
    pub period: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub highlights: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SkillGroup {
    pub category: String,
    pub items: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EducationEntry {
    pub degree: String,
    pub institution: String,
    pub period: String,
    #[serde(default)]
    pub details: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LanguageSkill {
    pub name: String,
    pub level: String,
}

// ── Store ────────────────────────────────────────────────────────────────

/// Every résumé version, keyed by version identifier (sorted).
#[derive(Debug, Clone)]
pub struct ContentStore {
    documents: BTreeMap<String, ContentDocument>,
    default_version: String,
    fingerprint: String,
}

impl ContentStore {
    /// Load and validate every `*.yaml` / `*.yml` file in `dir`.
    ///
    /// The file stem is the version identifier. With `strict_parity`, any
    /// structural difference between the language branches is an error;
    /// otherwise it is logged.
    pub fn load(dir: &Path, strict_parity: bool) -> Result<Self, Cv2PdfError> {
        if !dir.is_dir() {
            return Err(Cv2PdfError::ContentDirMissing {
                path: dir.to_path_buf(),
            });
        }

        let entries = std::fs::read_dir(dir).map_err(|e| Cv2PdfError::ContentRead {
            path: dir.to_path_buf(),
            source: e,
        })?;

        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && is_content_file(p))
            .collect();
        files.sort();

        let mut documents = BTreeMap::new();
        for path in files {
            let version = version_from_path(&path)?;
            if documents.contains_key(&version) {
                return Err(Cv2PdfError::ContentParse {
                    path,
                    detail: format!("version '{version}' is defined by more than one file"),
                });
            }
            let text = std::fs::read_to_string(&path).map_err(|e| Cv2PdfError::ContentRead {
                path: path.clone(),
                source: e,
            })?;
            let doc = parse_document(&path, &text)?;
            debug!("Loaded version '{}' from {}", version, path.display());
            documents.insert(version, doc);
        }

        if documents.is_empty() {
            return Err(Cv2PdfError::NoVersions {
                path: dir.to_path_buf(),
            });
        }

        let store = Self::from_documents(documents, strict_parity)?;
        info!(
            "Content store: {} version(s) [{}], default '{}'",
            store.len(),
            store.versions().join(", "),
            store.default_version
        );
        Ok(store)
    }

    /// Build a store from already-parsed documents, applying the same
    /// validation as [`ContentStore::load`].
    pub fn from_documents(
        documents: BTreeMap<String, ContentDocument>,
        strict_parity: bool,
    ) -> Result<Self, Cv2PdfError> {
        for (version, doc) in &documents {
            if version == ALL_VERSIONS || !is_valid_version_id(version) {
                return Err(Cv2PdfError::InvalidVersion {
                    value: version.clone(),
                });
            }
            parity::check_required(version, doc)?;

            let issues = parity::parity_issues(doc);
            if !issues.is_empty() {
                if strict_parity {
                    return Err(Cv2PdfError::ParityMismatch {
                        version: version.clone(),
                        issues,
                    });
                }
                for issue in &issues {
                    warn!("Version '{}': {}", version, issue);
                }
            }
        }

        let default_version = if documents.contains_key(PREFERRED_DEFAULT_VERSION) {
            PREFERRED_DEFAULT_VERSION.to_string()
        } else {
            documents
                .keys()
                .next()
                .cloned()
                .ok_or_else(|| Cv2PdfError::Internal("content store is empty".into()))?
        };

        let fingerprint = fingerprint(&documents)?;
        Ok(Self {
            documents,
            default_version,
            fingerprint,
        })
    }

    /// Override the version served when a page request names none.
    pub fn with_default_version(mut self, version: &str) -> Result<Self, Cv2PdfError> {
        self.require(version)?;
        self.default_version = version.to_string();
        Ok(self)
    }

    /// Hex digest of every document. Two stores serve the same pages iff
    /// their fingerprints match.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Sorted version identifiers.
    pub fn versions(&self) -> Vec<String> {
        self.documents.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn default_version(&self) -> &str {
        &self.default_version
    }

    pub fn get(&self, version: &str) -> Option<&ContentDocument> {
        self.documents.get(version)
    }

    /// Like [`ContentStore::get`], but an unknown version is an error that
    /// lists the available ones.
    pub fn require(&self, version: &str) -> Result<&ContentDocument, Cv2PdfError> {
        self.documents
            .get(version)
            .ok_or_else(|| Cv2PdfError::UnknownVersion {
                requested: version.to_string(),
                available: self.versions(),
            })
    }
}

/// Parse one content file.
pub fn parse_document(path: &Path, text: &str) -> Result<ContentDocument, Cv2PdfError> {
    serde_yaml::from_str(text).map_err(|e| Cv2PdfError::ContentParse {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })
}

fn fingerprint(documents: &BTreeMap<String, ContentDocument>) -> Result<String, Cv2PdfError> {
    let bytes = serde_json::to_vec(documents)
        .map_err(|e| Cv2PdfError::Internal(format!("content fingerprint: {e}")))?;
    Ok(format!("{:x}", Md5::digest(&bytes)))
}

fn is_content_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    )
}

fn version_from_path(path: &Path) -> Result<String, Cv2PdfError> {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string();
    if stem == ALL_VERSIONS {
        return Err(Cv2PdfError::ContentParse {
            path: path.to_path_buf(),
            detail: format!(
                "file name '{ALL_VERSIONS}' is reserved (--version {ALL_VERSIONS} selects every version); \
                 rename the file"
            ),
        });
    }
    if !is_valid_version_id(&stem) {
        return Err(Cv2PdfError::ContentParse {
            path: path.to_path_buf(),
            detail: format!(
                "file name '{stem}' is not a valid version identifier \
                 (lowercase letters, digits, '-' or '_')"
            ),
        });
    }
    Ok(stem)
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! Small valid documents shared by unit tests across the crate.

    use super::*;

    pub fn branch(lang: Language) -> CvContent {
        let (headline, intro, exp, skills, edu, langs, contact) = match lang {
            Language::En => (
                "Platform Engineer",
                "I build reliable systems.",
                "Experience",
                "Skills",
                "Education",
                "Languages",
                "Contact",
            ),
            Language::Pl => (
                "Inżynier platformy",
                "Buduję niezawodne systemy.",
                "Doświadczenie",
                "Umiejętności",
                "Wykształcenie",
                "Języki",
                "Kontakt",
            ),
        };
        CvContent {
            name: "Jan Kowalski".into(),
            headline: headline.into(),
            intro: intro.into(),
            photo: Some("images/photo.png".into()),
            contact: vec![ContactItem {
                label: "Email".into(),
                value: "jan@example.com".into(),
                href: Some("mailto:jan@example.com".into()),
            }],
            labels: SectionLabels {
                contact: contact.into(),
                experience: exp.into(),
                skills: skills.into(),
                education: edu.into(),
                languages: langs.into(),
            },
            experience: vec![ExperienceEntry {
                role: match lang {
                    Language::En => "Senior Engineer".into(),
                    Language::Pl => "Starszy inżynier".into(),
                },
                company: "Acme".into(),
                period: "2020 – 2024".into(),
                location: Some("Kraków".into()),
                highlights: vec![match lang {
                    Language::En => "Cut deploy time by half".into(),
                    Language::Pl => "Skrócił czas wdrożeń o połowę".into(),
                }],
            }],
            skills: vec![SkillGroup {
                category: match lang {
                    Language::En => "Languages".into(),
                    Language::Pl => "Języki programowania".into(),
                },
                items: vec!["Rust".into(), "Go".into()],
            }],
            education: vec![EducationEntry {
                degree: match lang {
                    Language::En => "MSc Computer Science".into(),
                    Language::Pl => "Magister informatyki".into(),
                },
                institution: "AGH".into(),
                period: "2013 – 2018".into(),
                details: None,
            }],
            languages: vec![LanguageSkill {
                name: match lang {
                    Language::En => "Polish".into(),
                    Language::Pl => "Polski".into(),
                },
                level: match lang {
                    Language::En => "native".into(),
                    Language::Pl => "ojczysty".into(),
                },
            }],
            footer: None,
        }
    }

    pub fn document() -> ContentDocument {
        ContentDocument {
            en: branch(Language::En),
            pl: branch(Language::Pl),
        }
    }

    pub fn store(versions: &[&str]) -> ContentStore {
        let docs = versions
            .iter()
            .map(|v| (v.to_string(), document()))
            .collect();
        ContentStore::from_documents(docs, true).unwrap()
    }
}
