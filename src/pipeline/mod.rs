//! Per-combination export stages.
//!
//! ```text
//! plan ──▶ preflight ──▶ engine ──▶ verify
//! (pairs)  (GET page)    (print)    (%PDF + move into place)
//! ```
//!
//! 1. [`plan`]      expand selectors against the content store into ordered
//!    (version, language) combinations; unknown versions fail here
//! 2. [`preflight`] fetch the page URL and require the readiness marker
//! 3. [`engine`]    run headless Chrome or WeasyPrint on the URL, bounded by
//!    the render timeout
//! 4. [`verify`]    check the staged file is a non-empty PDF and move it onto
//!    its final name
//!
//! The stages are driven by [`crate::session::ExportSession::export_one`].

pub mod engine;
pub mod plan;
pub mod preflight;
pub mod verify;
