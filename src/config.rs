//! Configuration types for a résumé export run.
//!
//! All run behaviour is controlled through [`ExportConfig`], built via its
//! [`ExportConfigBuilder`]. Every knob lives in one struct so the CLI, the
//! tests and library callers all drive the orchestrator the same way.

use crate::error::Cv2PdfError;
use crate::progress::ProgressCallback;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Default local server port.
pub const DEFAULT_PORT: u16 = 8000;

/// Page served by the site server.
pub const PAGE_PATH: &str = "/cv.html";

static VERSION_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z0-9][a-z0-9_-]*$").unwrap());

/// Selector keyword for every version; no content file may use it as a stem.
pub const ALL_VERSIONS: &str = "all";

/// `true` when `id` is usable as a version identifier (file stem, query
/// value and output file name component).
pub fn is_valid_version_id(id: &str) -> bool {
    VERSION_ID.is_match(id)
}

/// Configuration for one export run.
///
/// Built via [`ExportConfig::builder()`] or [`ExportConfig::default()`].
///
/// # Example
/// ```rust
/// use cv2pdf::{ExportConfig, LanguageSelector, VersionSelector};
///
/// let config = ExportConfig::builder()
///     .versions(VersionSelector::One("it".into()))
///     .languages(LanguageSelector::En)
///     .port(0)
///     .build()
///     .unwrap();
/// assert_eq!(config.output_file_name("it", cv2pdf::Language::En), "cv_it_en.pdf");
/// ```
#[derive(Clone)]
pub struct ExportConfig {
    /// Which résumé versions to export. Default: all.
    pub versions: VersionSelector,

    /// Which languages to export. Default: both.
    pub languages: LanguageSelector,

    /// Local server port. `0` binds any free port. Default: 8000.
    pub port: u16,

    /// Interface the site server binds to. Default: 127.0.0.1.
    pub host: String,

    /// PDF engine. Default: headless Chrome.
    pub method: Method,

    /// Directory with the page assets (stylesheet, images). Default: `site`.
    pub site_dir: PathBuf,

    /// Directory with one YAML file per version. Default: `<site_dir>/content`.
    pub content_dir: Option<PathBuf>,

    /// Directory the PDFs are written to. Default: current directory.
    pub output_dir: PathBuf,

    /// Output file name prefix: `<prefix>_<version>_<language>.pdf`. Default: `cv`.
    pub file_prefix: String,

    /// Explicit Chrome/Chromium binary. Falls back to discovery.
    pub chrome_path: Option<PathBuf>,

    /// Explicit WeasyPrint binary. Falls back to discovery.
    pub weasyprint_path: Option<PathBuf>,

    /// Virtual time budget Chrome gives the page before printing, in ms. Default: 1000.
    pub settle_ms: u64,

    /// Upper bound for one engine invocation, in seconds. Default: 60.
    pub timeout_secs: u64,

    /// Stop after the first failed combination. Default: false.
    pub fail_fast: bool,

    /// Pass `--no-sandbox` to Chrome (needed when running as root in containers).
    pub no_sandbox: bool,

    /// Reject content whose language branches differ in structure. Default: true.
    ///
    /// When false, mismatches are logged as warnings instead.
    pub strict_parity: bool,

    /// Reuse a cv2pdf server already listening on `port` instead of failing.
    /// Default: true.
    pub reuse_running_server: bool,

    /// Optional per-combination progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            versions: VersionSelector::All,
            languages: LanguageSelector::Both,
            port: DEFAULT_PORT,
            host: "127.0.0.1".to_string(),
            method: Method::default(),
            site_dir: PathBuf::from("site"),
            content_dir: None,
            output_dir: PathBuf::from("."),
            file_prefix: "cv".to_string(),
            chrome_path: None,
            weasyprint_path: None,
            settle_ms: 1000,
            timeout_secs: 60,
            fail_fast: false,
            no_sandbox: false,
            strict_parity: true,
            reuse_running_server: true,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ExportConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExportConfig")
            .field("versions", &self.versions)
            .field("languages", &self.languages)
            .field("port", &self.port)
            .field("host", &self.host)
            .field("method", &self.method)
            .field("chrome_path", &self.chrome_path)
            .field("weasyprint_path", &self.weasyprint_path)
            .field("site_dir", &self.site_dir)
            .field("content_dir", &self.content_dir)
            .field("output_dir", &self.output_dir)
            .field("file_prefix", &self.file_prefix)
            .field("settle_ms", &self.settle_ms)
            .field("timeout_secs", &self.timeout_secs)
            .field("fail_fast", &self.fail_fast)
            .field("no_sandbox", &self.no_sandbox)
            .field("strict_parity", &self.strict_parity)
            .field("reuse_running_server", &self.reuse_running_server)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ExportProgressCallback>"),
            )
            .finish()
    }
}

impl ExportConfig {
    /// Create a new builder for `ExportConfig`.
    pub fn builder() -> ExportConfigBuilder {
        ExportConfigBuilder {
            config: Self::default(),
        }
    }

    /// Resolved content directory.
    pub fn content_dir(&self) -> PathBuf {
        self.content_dir
            .clone()
            .unwrap_or_else(|| self.site_dir.join("content"))
    }

    /// Deterministic output file name for a combination.
    pub fn output_file_name(&self, version: &str, language: Language) -> String {
        format!("{}_{}_{}.pdf", self.file_prefix, version, language)
    }

    /// Full output path for a combination.
    pub fn output_path(&self, version: &str, language: Language) -> PathBuf {
        self.output_dir.join(self.output_file_name(version, language))
    }
}

/// Builder for [`ExportConfig`].
#[derive(Debug)]
pub struct ExportConfigBuilder {
    config: ExportConfig,
}

impl ExportConfigBuilder {
    pub fn versions(mut self, v: VersionSelector) -> Self {
        self.config.versions = v;
        self
    }

    pub fn languages(mut self, l: LanguageSelector) -> Self {
        self.config.languages = l;
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    pub fn method(mut self, method: Method) -> Self {
        self.config.method = method;
        self
    }

    pub fn site_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.site_dir = dir.into();
        self
    }

    pub fn content_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.content_dir = Some(dir.into());
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    pub fn file_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.file_prefix = prefix.into();
        self
    }

    pub fn chrome_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.chrome_path = Some(path.into());
        self
    }

    pub fn weasyprint_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.weasyprint_path = Some(path.into());
        self
    }

    pub fn settle_ms(mut self, ms: u64) -> Self {
        self.config.settle_ms = ms;
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.config.timeout_secs = secs.max(1);
        self
    }

    pub fn fail_fast(mut self, v: bool) -> Self {
        self.config.fail_fast = v;
        self
    }

    pub fn no_sandbox(mut self, v: bool) -> Self {
        self.config.no_sandbox = v;
        self
    }

    pub fn strict_parity(mut self, v: bool) -> Self {
        self.config.strict_parity = v;
        self
    }

    pub fn reuse_running_server(mut self, v: bool) -> Self {
        self.config.reuse_running_server = v;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExportConfig, Cv2PdfError> {
        let c = &self.config;
        if let VersionSelector::One(ref v) = c.versions {
            if !is_valid_version_id(v) {
                return Err(Cv2PdfError::InvalidVersion { value: v.clone() });
            }
        }
        if c.file_prefix.is_empty()
            || c.file_prefix
                .chars()
                .any(|ch| matches!(ch, '/' | '\\' | ':' | '\0'))
        {
            return Err(Cv2PdfError::InvalidConfig(format!(
                "file prefix must be a non-empty file name fragment, got {:?}",
                c.file_prefix
            )));
        }
        if c.settle_ms >= c.timeout_secs.saturating_mul(1000) {
            return Err(Cv2PdfError::InvalidConfig(format!(
                "settle time ({} ms) must be shorter than the render timeout ({} s)",
                c.settle_ms, c.timeout_secs
            )));
        }
        if c.host.trim().is_empty() {
            return Err(Cv2PdfError::InvalidConfig("host must not be empty".into()));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// A supported résumé language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    Pl,
}

impl Language {
    /// Every supported language, in export order.
    pub const ALL: [Language; 2] = [Language::En, Language::Pl];

    /// Two-letter code used in URLs, file names and content keys.
    pub fn code(self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Pl => "pl",
        }
    }

    /// Label shown on the language switcher, in the language itself.
    pub fn native_name(self) -> &'static str {
        match self {
            Language::En => "English",
            Language::Pl => "Polski",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = Cv2PdfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "en" => Ok(Language::En),
            "pl" => Ok(Language::Pl),
            _ => Err(Cv2PdfError::UnknownLanguage {
                value: s.to_string(),
            }),
        }
    }
}

/// Which languages a run exports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LanguageSelector {
    En,
    Pl,
    /// Every supported language (default).
    #[default]
    Both,
}

impl LanguageSelector {
    /// Expand into concrete languages, in export order.
    pub fn languages(self) -> Vec<Language> {
        match self {
            LanguageSelector::En => vec![Language::En],
            LanguageSelector::Pl => vec![Language::Pl],
            LanguageSelector::Both => Language::ALL.to_vec(),
        }
    }
}

impl FromStr for LanguageSelector {
    type Err = Cv2PdfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("both") {
            return Ok(LanguageSelector::Both);
        }
        Ok(match s.parse::<Language>()? {
            Language::En => LanguageSelector::En,
            Language::Pl => LanguageSelector::Pl,
        })
    }
}

/// Which résumé versions a run exports.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VersionSelector {
    /// Every version in the content store (default).
    #[default]
    All,
    /// A single named version, e.g. `it`.
    One(String),
}

impl FromStr for VersionSelector {
    type Err = Cv2PdfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        if s == ALL_VERSIONS {
            return Ok(VersionSelector::All);
        }
        if !is_valid_version_id(&s) {
            return Err(Cv2PdfError::InvalidVersion { value: s });
        }
        Ok(VersionSelector::One(s))
    }
}

/// The engine that turns the page into a PDF.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    /// Headless Chrome/Chromium `--print-to-pdf` (default).
    #[default]
    Chrome,
    /// The WeasyPrint command-line tool.
    WeasyPrint,
}

impl Method {
    pub fn name(self) -> &'static str {
        match self {
            Method::Chrome => "chrome",
            Method::WeasyPrint => "weasyprint",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_cli_contract() {
        let c = ExportConfig::default();
        assert_eq!(c.port, 8000);
        assert_eq!(c.languages, LanguageSelector::Both);
        assert_eq!(c.versions, VersionSelector::All);
        assert_eq!(c.method, Method::Chrome);
        assert_eq!(c.content_dir(), PathBuf::from("site").join("content"));
    }

    #[test]
    fn debug_shows_engine_and_server_settings() {
        let c = ExportConfig::builder()
            .chrome_path("/opt/chrome/chrome")
            .weasyprint_path("/usr/local/bin/weasyprint")
            .no_sandbox(true)
            .reuse_running_server(false)
            .build()
            .unwrap();
        let dbg = format!("{c:?}");
        assert!(dbg.contains(r#"chrome_path: Some("/opt/chrome/chrome")"#), "{dbg}");
        assert!(dbg.contains(r#"weasyprint_path: Some("/usr/local/bin/weasyprint")"#), "{dbg}");
        assert!(dbg.contains("no_sandbox: true"), "{dbg}");
        assert!(dbg.contains("reuse_running_server: false"), "{dbg}");
    }

    #[test]
    fn output_names_are_deterministic() {
        let c = ExportConfig::builder()
            .output_dir("out")
            .build()
            .unwrap();
        assert_eq!(c.output_file_name("it", Language::En), "cv_it_en.pdf");
        assert_eq!(
            c.output_path("pm", Language::Pl),
            PathBuf::from("out").join("cv_pm_pl.pdf")
        );
    }

    #[test]
    fn language_parsing() {
        assert_eq!("en".parse::<Language>().unwrap(), Language::En);
        assert_eq!(" PL ".parse::<Language>().unwrap(), Language::Pl);
        let err = "de".parse::<Language>().unwrap_err();
        assert!(err.to_string().contains("'de'"));
    }

    #[test]
    fn language_selector_expansion() {
        assert_eq!(LanguageSelector::Both.languages(), vec![Language::En, Language::Pl]);
        assert_eq!(LanguageSelector::Pl.languages(), vec![Language::Pl]);
        assert_eq!("both".parse::<LanguageSelector>().unwrap(), LanguageSelector::Both);
        assert!("fr".parse::<LanguageSelector>().is_err());
    }

    #[test]
    fn version_selector_parsing() {
        assert_eq!("all".parse::<VersionSelector>().unwrap(), VersionSelector::All);
        assert_eq!(
            "IT".parse::<VersionSelector>().unwrap(),
            VersionSelector::One("it".into())
        );
        assert!("../etc".parse::<VersionSelector>().is_err());
        assert!("".parse::<VersionSelector>().is_err());
    }

    #[test]
    fn builder_rejects_bad_prefix() {
        let err = ExportConfig::builder().file_prefix("a/b").build().unwrap_err();
        assert!(matches!(err, Cv2PdfError::InvalidConfig(_)));
        assert!(ExportConfig::builder().file_prefix("").build().is_err());
    }

    #[test]
    fn builder_rejects_settle_longer_than_timeout() {
        let err = ExportConfig::builder()
            .timeout_secs(2)
            .settle_ms(5000)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("settle"));
    }

    #[test]
    fn builder_clamps_zero_timeout() {
        let c = ExportConfig::builder()
            .settle_ms(0)
            .timeout_secs(0)
            .build()
            .unwrap();
        assert_eq!(c.timeout_secs, 1);
    }

    #[test]
    fn builder_rejects_invalid_version_id() {
        let err = ExportConfig::builder()
            .versions(VersionSelector::One("It Dev".into()))
            .build()
            .unwrap_err();
        assert!(matches!(err, Cv2PdfError::InvalidVersion { .. }));
    }
}
