//! # engine-locate
//!
//! Find an HTML-to-PDF engine executable on the host: a headless-capable
//! Chrome/Chromium, or the WeasyPrint command-line tool.
//!
//! ## How it works
//!
//! [`locate`] resolves an engine in this order, first match wins:
//!
//! 1. An explicit path passed by the caller (e.g. a `--chrome-path` flag).
//! 2. The engine's environment override (`CHROME_PATH`, `WEASYPRINT_PATH`).
//! 3. Well-known executable names searched on `PATH`.
//! 4. Platform install locations (application bundles, Program Files, ...).
//!
//! An explicit path or environment override that does not point to an
//! executable is an error; it never silently falls through to discovery,
//! so a typo in `CHROME_PATH` does not print with a different browser.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use engine_locate::{locate, EngineKind};
//!
//! let chrome = locate(EngineKind::Chrome, None).expect("Chrome unavailable");
//! println!("printing with {}", chrome.display());
//! ```
//!
//! ## Platform locations
//!
//! | OS      | Chrome / Chromium                                             |
//! |---------|---------------------------------------------------------------|
//! | Linux   | `/usr/bin/google-chrome`, `/usr/bin/chromium`, `/snap/bin/chromium` |
//! | macOS   | `/Applications/Google Chrome.app/...`, `~/Applications/...`   |
//! | Windows | `%ProgramFiles%\Google\Chrome\...`, `%LOCALAPPDATA%\Google\Chrome\...` |
//!
//! WeasyPrint is only looked up on `PATH` (it is a Python entry point).

use std::path::{Path, PathBuf};

use thiserror::Error;

// ── Error type ───────────────────────────────────────────────────────────────

/// Errors returned by engine lookup.
#[derive(Error, Debug)]
pub enum LocateError {
    /// A path was given explicitly (argument or environment) but nothing
    /// executable lives there.
    #[error("{engine} path '{path}' (from {origin}) is not an executable file")]
    NotExecutable {
        engine: &'static str,
        path: PathBuf,
        origin: String,
    },

    /// Discovery exhausted every candidate.
    #[error("{engine} executable not found.\n{hint}")]
    NotFound { engine: &'static str, hint: String },
}

// ── Engine kinds ─────────────────────────────────────────────────────────────

/// The engines this crate knows how to find.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineKind {
    /// Google Chrome, Chromium or `chrome-headless-shell`.
    Chrome,
    /// The `weasyprint` command-line tool.
    WeasyPrint,
}

impl EngineKind {
    /// Human-readable engine name used in messages.
    pub fn display_name(self) -> &'static str {
        match self {
            EngineKind::Chrome => "Chrome/Chromium",
            EngineKind::WeasyPrint => "WeasyPrint",
        }
    }

    /// Environment variable that overrides discovery.
    pub fn env_var(self) -> &'static str {
        match self {
            EngineKind::Chrome => "CHROME_PATH",
            EngineKind::WeasyPrint => "WEASYPRINT_PATH",
        }
    }

    /// Executable names searched on `PATH`, most specific first.
    pub fn executable_names(self) -> &'static [&'static str] {
        match self {
            EngineKind::Chrome => &[
                "google-chrome-stable",
                "google-chrome",
                "chromium",
                "chromium-browser",
                "chrome",
                "chrome-headless-shell",
            ],
            EngineKind::WeasyPrint => &["weasyprint"],
        }
    }

    /// Installation advice appended to [`LocateError::NotFound`].
    pub fn install_hint(self) -> String {
        match self {
            EngineKind::Chrome => format!(
                "Install Google Chrome or Chromium, or point {} (or --chrome-path) \
                 at the browser binary.",
                self.env_var()
            ),
            EngineKind::WeasyPrint => format!(
                "Install WeasyPrint (`pip install weasyprint`), or point {} \
                 (or --weasyprint-path) at the executable.",
                self.env_var()
            ),
        }
    }
}

// ── Public API ───────────────────────────────────────────────────────────────

/// Resolve the executable for `kind`.
///
/// `explicit` takes precedence over everything else. See the crate docs for
/// the full lookup order.
pub fn locate(kind: EngineKind, explicit: Option<&Path>) -> Result<PathBuf, LocateError> {
    if let Some(path) = explicit {
        return checked(kind, path.to_path_buf(), "argument");
    }

    if let Some(value) = std::env::var_os(kind.env_var()).filter(|v| !v.is_empty()) {
        return checked(kind, PathBuf::from(value), kind.env_var());
    }

    if let Some(found) = find_on_path(kind.executable_names()) {
        return Ok(found);
    }

    platform_candidates(kind)
        .into_iter()
        .find(|p| is_executable(p))
        .ok_or_else(|| LocateError::NotFound {
            engine: kind.display_name(),
            hint: kind.install_hint(),
        })
}

/// Search the directories of `PATH` for the first of `names`.
///
/// Names are tried in order; for each name every `PATH` entry is checked
/// before moving on to the next name. On Windows `.exe` is appended.
pub fn find_on_path(names: &[&str]) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    let dirs: Vec<PathBuf> = std::env::split_paths(&path_var).collect();
    find_in_dirs(names, &dirs)
}

/// Same as [`find_on_path`] over an explicit directory list.
pub fn find_in_dirs(names: &[&str], dirs: &[PathBuf]) -> Option<PathBuf> {
    names.iter().find_map(|name| {
        let file = executable_file_name(name);
        dirs.iter()
            .map(|dir| dir.join(&file))
            .find(|candidate| is_executable(candidate))
    })
}

/// `true` when `path` is a regular file the current user may execute.
pub fn is_executable(path: &Path) -> bool {
    let Ok(meta) = std::fs::metadata(path) else {
        return false;
    };
    if !meta.is_file() {
        return false;
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        meta.permissions().mode() & 0o111 != 0
    }
    #[cfg(not(unix))]
    {
        true
    }
}

// ── Internal helpers ─────────────────────────────────────────────────────────

fn checked(kind: EngineKind, path: PathBuf, origin: &str) -> Result<PathBuf, LocateError> {
    if is_executable(&path) {
        Ok(path)
    } else {
        Err(LocateError::NotExecutable {
            engine: kind.display_name(),
            path,
            origin: origin.to_string(),
        })
    }
}

fn executable_file_name(name: &str) -> String {
    if cfg!(windows) {
        format!("{name}.exe")
    } else {
        name.to_string()
    }
}

/// Install locations outside `PATH`, per platform.
fn platform_candidates(kind: EngineKind) -> Vec<PathBuf> {
    if kind != EngineKind::Chrome {
        return Vec::new();
    }

    let mut out = Vec::new();
    match std::env::consts::OS {
        "linux" => {
            for p in [
                "/usr/bin/google-chrome",
                "/usr/bin/google-chrome-stable",
                "/usr/bin/chromium",
                "/usr/bin/chromium-browser",
                "/snap/bin/chromium",
                "/opt/google/chrome/chrome",
            ] {
                out.push(PathBuf::from(p));
            }
        }
        "macos" => {
            let bundles = [
                "Google Chrome.app/Contents/MacOS/Google Chrome",
                "Chromium.app/Contents/MacOS/Chromium",
                "Google Chrome Canary.app/Contents/MacOS/Google Chrome Canary",
            ];
            for b in bundles {
                out.push(Path::new("/Applications").join(b));
            }
            if let Some(home) = dirs::home_dir() {
                for b in bundles {
                    out.push(home.join("Applications").join(b));
                }
            }
        }
        "windows" => {
            let suffix = Path::new("Google").join("Chrome").join("Application").join("chrome.exe");
            for var in ["ProgramFiles", "ProgramFiles(x86)"] {
                if let Some(base) = std::env::var_os(var) {
                    out.push(PathBuf::from(base).join(&suffix));
                }
            }
            if let Some(local) = dirs::data_local_dir() {
                out.push(local.join(&suffix));
            }
        }
        _ => {}
    }
    out
}

// ── Tests ─────────────────────────────────────────────────────────────────────
