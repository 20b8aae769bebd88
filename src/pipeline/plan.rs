//! Expand the requested selectors into concrete export combinations.

use crate::config::{ExportConfig, Language, VersionSelector, PAGE_PATH};
use crate::content::ContentStore;
use crate::error::Cv2PdfError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One (version, language) pair to export.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Combination {
    pub version: String,
    pub language: Language,
}

impl Combination {
    pub fn new(version: impl Into<String>, language: Language) -> Self {
        Self {
            version: version.into(),
            language,
        }
    }

    /// `<prefix>_<version>_<language>.pdf`
    pub fn file_name(&self, prefix: &str) -> String {
        format!("{prefix}_{}_{}.pdf", self.version, self.language)
    }

    /// Page URL under `base` (e.g. `http://127.0.0.1:8000`).
    pub fn url(&self, base: &str) -> String {
        format!(
            "{}{PAGE_PATH}?version={}&language={}",
            base.trim_end_matches('/'),
            self.version,
            self.language
        )
    }
}

impl fmt::Display for Combination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.version, self.language)
    }
}

/// Ordered combinations for `config`: versions sorted, then `en` before `pl`.
///
/// An unknown version is an error listing the available ones. Nothing is
/// started before this returns.
pub fn plan(config: &ExportConfig, store: &ContentStore) -> Result<Vec<Combination>, Cv2PdfError> {
    let versions = match config.versions {
        VersionSelector::All => store.versions(),
        VersionSelector::One(ref v) => {
            store.require(v)?;
            vec![v.clone()]
        }
    };
    let languages = config.languages.languages();

    Ok(versions
        .iter()
        .flat_map(|v| languages.iter().map(move |&l| Combination::new(v.as_str(), l)))
        .collect())
}
