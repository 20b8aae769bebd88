//! CLI binary for cv2pdf.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ExportConfig`, shows progress and prints the outcome.

use anyhow::{Context, Result};
use clap::Parser;
use cv2pdf::{
    check, export, load_store, Combination, ExportConfig, ExportProgressCallback, ExportReport,
    LanguageSelector, Method, ProgressCallback, SiteServer, VersionSelector,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress: one bar for the run, one log line per combination.
struct CliProgressCallback {
    bar: ProgressBar,
    start_times: Mutex<HashMap<usize, Instant>>,
}

impl CliProgressCallback {
    /// Spinner until `on_export_start` tells us the total.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Loading content…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>2}/{len} PDFs  \
             ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Exporting");
        self.bar.reset_eta();
    }

    fn elapsed(&self, index: usize) -> f64 {
        self.start_times
            .lock()
            .unwrap()
            .remove(&index)
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl ExportProgressCallback for CliProgressCallback {
    fn on_export_start(&self, total: usize) {
        self.activate_bar(total);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Exporting {total} PDF(s)…"))
        ));
    }

    fn on_combination_start(&self, index: usize, _total: usize, combo: &Combination) {
        self.start_times.lock().unwrap().insert(index, Instant::now());
        self.bar.set_message(combo.to_string());
    }

    fn on_combination_complete(&self, index: usize, total: usize, combo: &Combination, bytes: u64) {
        let secs = self.elapsed(index);
        self.bar.println(format!(
            "  {} {:>2}/{:<2} {:<12} {}  {}",
            green("✓"),
            index,
            total,
            combo.to_string(),
            dim(&format!("{:>7} KB", bytes / 1024)),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_combination_error(&self, index: usize, total: usize, combo: &Combination, error: &str) {
        let secs = self.elapsed(index);

        // Keep one line per combination; full errors are in the summary.
        let first_line = error.lines().next().unwrap_or_default();
        let msg = if first_line.chars().count() > 90 {
            format!("{}\u{2026}", first_line.chars().take(89).collect::<String>())
        } else {
            first_line.to_string()
        };

        self.bar.println(format!(
            "  {} {:>2}/{:<2} {:<12} {}  {}",
            red("✗"),
            index,
            total,
            combo.to_string(),
            red(&msg),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_export_complete(&self, total: usize, success_count: usize) {
        let failed = total.saturating_sub(success_count);
        self.bar.finish_and_clear();

        if failed == 0 {
            eprintln!(
                "{} {} PDF(s) exported successfully",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} PDF(s) exported  ({} failed or skipped)",
                if success_count == 0 { red("✘") } else { cyan("⚠") },
                bold(&success_count.to_string()),
                total,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Every version, both languages, into the current directory
  cv2pdf

  # One version, one language
  cv2pdf --version it --language en

  # WeasyPrint instead of headless Chrome, PDFs into ./out
  cv2pdf --method weasyprint -o out

  # Any free port (useful when 8000 is taken)
  cv2pdf --port 0

  # Validate content and show what would be exported
  cv2pdf --check

  # Preview the site in a browser until Ctrl-C
  cv2pdf --serve
  #   then open http://127.0.0.1:8000/cv.html?version=it&language=pl

  # Machine-readable report
  cv2pdf --json > report.json

OUTPUT:
  One PDF per combination: <prefix>_<version>_<language>.pdf
  (default prefix "cv", e.g. cv_it_en.pdf, cv_pm_pl.pdf). Re-running
  overwrites the previous files.

CONTENT:
  <site-dir>/content/<version>.yaml, each with parallel `en:` and `pl:`
  blocks. Both blocks must have the same sections and entry counts;
  a missing translation is reported before anything is started.

ENVIRONMENT VARIABLES:
  CHROME_PATH       Chrome/Chromium executable (skips discovery)
  WEASYPRINT_PATH   WeasyPrint executable (skips discovery)
  CV2PDF_*          Fallback for the run flags, e.g. CV2PDF_PORT=9000
  RUST_LOG          Log filter override, e.g. RUST_LOG=cv2pdf=debug

EXIT STATUS:
  0  every requested PDF was written
  1  invalid configuration or content, or at least one PDF failed
  2  invalid command-line usage
"#;

/// Export the bilingual résumé to PDF.
#[derive(Parser, Debug)]
#[command(
    name = "cv2pdf",
    version,
    disable_version_flag = true,
    about = "Render the bilingual résumé and export it to PDF",
    long_about = "Serve the résumé site locally and print every requested version × language \
combination to PDF with headless Chrome/Chromium or WeasyPrint.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Résumé version to export (a content file name, e.g. it, pm) or `all`.
    #[arg(long = "version", env = "CV2PDF_VERSION", default_value = "all",
          value_parser = parse_version)]
    cv_version: VersionSelector,

    /// Language to export.
    #[arg(long, env = "CV2PDF_LANGUAGE", value_enum, default_value = "both")]
    language: LanguageArg,

    /// Port of the local site server (0 picks a free port).
    #[arg(long, env = "CV2PDF_PORT", default_value_t = cv2pdf::config::DEFAULT_PORT)]
    port: u16,

    /// PDF engine.
    #[arg(long, env = "CV2PDF_METHOD", value_enum, default_value = "chrome")]
    method: MethodArg,

    /// Directory holding the site (stylesheet, images, content/).
    #[arg(long, env = "CV2PDF_SITE_DIR", default_value = "site")]
    site_dir: PathBuf,

    /// Content directory [default: <site-dir>/content].
    #[arg(long, env = "CV2PDF_CONTENT_DIR")]
    content_dir: Option<PathBuf>,

    /// Where PDFs are written.
    #[arg(short, long, env = "CV2PDF_OUTPUT_DIR", default_value = ".")]
    output_dir: PathBuf,

    /// File name prefix: <prefix>_<version>_<language>.pdf.
    #[arg(long, env = "CV2PDF_FILE_PREFIX", default_value = "cv")]
    file_prefix: String,

    /// Chrome/Chromium executable.
    #[arg(long, env = "CHROME_PATH")]
    chrome_path: Option<PathBuf>,

    /// WeasyPrint executable.
    #[arg(long, env = "WEASYPRINT_PATH")]
    weasyprint_path: Option<PathBuf>,

    /// Time Chrome lets the page settle before printing, in milliseconds.
    #[arg(long, env = "CV2PDF_SETTLE_MS", default_value_t = 1000)]
    settle_ms: u64,

    /// Per-PDF render timeout in seconds.
    #[arg(long, env = "CV2PDF_TIMEOUT", default_value_t = 60,
          value_parser = clap::value_parser!(u64).range(1..))]
    timeout: u64,

    /// Stop at the first failed PDF instead of attempting the rest.
    #[arg(long, env = "CV2PDF_FAIL_FAST")]
    fail_fast: bool,

    /// Pass --no-sandbox to Chrome (needed in some containers).
    #[arg(long, env = "CV2PDF_NO_SANDBOX")]
    no_sandbox: bool,

    /// Only warn when EN and PL content differ in structure.
    #[arg(long, env = "CV2PDF_LENIENT_PARITY")]
    lenient_parity: bool,

    /// Fail instead of reusing a cv2pdf server already running on the port
    /// (one serving different content is never reused).
    #[arg(long, env = "CV2PDF_NO_REUSE")]
    no_reuse: bool,

    /// Load and validate content, print the plan, export nothing.
    #[arg(long, conflicts_with = "serve")]
    check: bool,

    /// Serve the site for preview until Ctrl-C, export nothing.
    #[arg(long)]
    serve: bool,

    /// Print the export report as JSON on stdout.
    #[arg(long, env = "CV2PDF_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "CV2PDF_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "CV2PDF_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "CV2PDF_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum LanguageArg {
    En,
    Pl,
    Both,
}

impl From<LanguageArg> for LanguageSelector {
    fn from(v: LanguageArg) -> Self {
        match v {
            LanguageArg::En => LanguageSelector::En,
            LanguageArg::Pl => LanguageSelector::Pl,
            LanguageArg::Both => LanguageSelector::Both,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum MethodArg {
    /// Headless Chrome/Chromium.
    #[value(alias = "playwright")]
    Chrome,
    /// WeasyPrint.
    Weasyprint,
}

impl From<MethodArg> for Method {
    fn from(v: MethodArg) -> Self {
        match v {
            MethodArg::Chrome => Method::Chrome,
            MethodArg::Weasyprint => Method::WeasyPrint,
        }
    }
}

fn parse_version(s: &str) -> Result<VersionSelector, String> {
    s.parse::<VersionSelector>().map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar gives all the feedback that matters; keep library
    // INFO logs out of its way unless asked for.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.check && !cli.serve;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let cli_cb = show_progress.then(CliProgressCallback::new_dynamic);
    let progress_cb = cli_cb
        .clone()
        .map(|cb| cb as Arc<dyn ExportProgressCallback>);

    let config = build_config(&cli, progress_cb)?;

    // ── Check-only mode ──────────────────────────────────────────────────
    if cli.check {
        let plan = check(&config).context("Content check failed")?;
        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&plan).context("Failed to serialise plan")?
            );
        } else if !cli.quiet {
            eprintln!("{} content is valid; {} PDF(s) planned:", green("✔"), plan.len());
            for combo in &plan {
                println!(
                    "  {:<12} → {}",
                    combo.to_string(),
                    config.output_path(&combo.version, combo.language).display()
                );
            }
        }
        return Ok(());
    }

    // ── Serve-only mode ──────────────────────────────────────────────────
    if cli.serve {
        return serve(&cli, &config).await;
    }

    // ── Run export ───────────────────────────────────────────────────────
    let report = match export(&config).await {
        Ok(report) => report,
        Err(e) => {
            // Fatal errors can arrive before the bar ever started.
            if let Some(cb) = &cli_cb {
                cb.bar.finish_and_clear();
            }
            return Err(e).context("Export failed");
        }
    };

    if cli.json {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialise report")?;
        println!("{json}");
    } else if !cli.quiet {
        print_summary(&report, show_progress);
    }

    report.into_result().context("Export incomplete")?;
    Ok(())
}

/// Map CLI args to `ExportConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ExportConfig> {
    let mut builder = ExportConfig::builder()
        .versions(cli.cv_version.clone())
        .languages(cli.language.into())
        .port(cli.port)
        .method(cli.method.into())
        .site_dir(&cli.site_dir)
        .output_dir(&cli.output_dir)
        .file_prefix(&cli.file_prefix)
        .settle_ms(cli.settle_ms)
        .timeout_secs(cli.timeout)
        .fail_fast(cli.fail_fast)
        .no_sandbox(cli.no_sandbox)
        .strict_parity(!cli.lenient_parity)
        .reuse_running_server(!cli.no_reuse);

    if let Some(ref dir) = cli.content_dir {
        builder = builder.content_dir(dir);
    }
    if let Some(ref path) = cli.chrome_path {
        builder = builder.chrome_path(path);
    }
    if let Some(ref path) = cli.weasyprint_path {
        builder = builder.weasyprint_path(path);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Run the site server until Ctrl-C.
async fn serve(cli: &Cli, config: &ExportConfig) -> Result<()> {
    let store = load_store(config).context("Failed to load content")?;
    let default_version = store.default_version().to_string();
    let server = SiteServer::start(Arc::new(store), config)
        .await
        .context("Failed to start the site server")?;

    if server.is_reused() {
        eprintln!(
            "{} a cv2pdf server is already running at {}",
            cyan("◆"),
            bold(server.base_url())
        );
        return Ok(());
    }

    if !cli.quiet {
        eprintln!(
            "{} serving {} at {}",
            cyan("◆"),
            config.site_dir.display(),
            bold(server.base_url())
        );
        eprintln!(
            "   {}",
            dim(&format!(
                "{}/cv.html?version={default_version}&language=en  (Ctrl-C to stop)",
                server.base_url()
            ))
        );
    }

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    server.shutdown().await.context("Server shutdown failed")?;
    if !cli.quiet {
        eprintln!("{} stopped", green("✔"));
    }
    Ok(())
}

fn print_summary(report: &ExportReport, progress_shown: bool) {
    // The progress callback already printed per-PDF lines.
    if !progress_shown {
        for r in &report.results {
            match (&r.output, &r.error) {
                (Some(path), _) => eprintln!(
                    "  {} {}  {}",
                    green("✓"),
                    path.display(),
                    dim(&format!("{} KB", r.bytes / 1024))
                ),
                (None, Some(e)) => eprintln!("  {} {}", red("✗"), e),
                (None, None) => {}
            }
        }
    }

    let failures: Vec<_> = report.failures().collect();
    if progress_shown && !failures.is_empty() {
        eprintln!("{}", bold("Failures:"));
        for e in &failures {
            eprintln!("  {} {}", red("✗"), e);
        }
    }

    eprintln!(
        "{}  {}/{} PDFs  {}ms  →  {}",
        if report.is_success() { green("✔") } else { cyan("⚠") },
        report.stats.succeeded,
        report.stats.planned,
        report.stats.total_duration_ms,
        bold(&report.output_dir.display().to_string()),
    );
    if report.stats.skipped > 0 {
        eprintln!(
            "   {}",
            dim(&format!(
                "{} combination(s) skipped after the first failure (--fail-fast)",
                report.stats.skipped
            ))
        );
    }
    eprintln!("   {}", dim(&format!("engine: {}  site: {}", report.engine, report.base_url)));
}
