//! CLI binary for vehicle-report.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ReportConfig`, reads the inspection JSON and writes the PDF.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use vehicle_report::document::html;
use vehicle_report::{
    generate_report_to_dir, prepare_document, InspectionInput, PageSize, ProgressCallback,
    ReportConfig, ReportProgressCallback,
};

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

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one spinner whose prefix follows the
/// pipeline stage.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let template = "{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}";
        let style = ProgressStyle::with_template(template)
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Preparing");
        bar.set_message("Reading inspection…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl ReportProgressCallback for CliProgressCallback {
    fn on_report_start(&self, image_count: usize) {
        self.bar.set_prefix("Images");
        self.bar.set_message(format!("resolving {image_count}…"));
    }

    fn on_images_resolved(&self, resolved: usize, failed: usize) {
        if failed > 0 {
            self.bar.println(format!(
                "  {} {} image(s) could not be loaded",
                red("✗"),
                failed
            ));
        }
        self.bar.println(format!("  {} {} image(s) resolved", green("✓"), resolved));
        self.bar.set_prefix("Rendering");
        self.bar.set_message("laying out report…");
    }

    fn on_surface_ready(&self, width: u32, height: u32) {
        self.bar.println(format!(
            "  {} Surface {}",
            green("✓"),
            dim(&format!("{width}×{height} px"))
        ));
        self.bar.set_prefix("Paginating");
        self.bar.set_message("");
    }

    fn on_page_emitted(&self, page_num: usize, total_pages: usize) {
        self.bar.set_message(format!("page {page_num}/{total_pages}"));
    }

    fn on_report_complete(&self, _filename: &str, _total_pages: usize) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"INPUT FORMAT:
  {
    "vehicle":    { "brand", "model", "model_year", "reference_price",
                    "reference_code", "plate", optional "color", "fuel_type",
                    "chassis_id", "municipality", "region", "legal_status" },
    "components": [ { "name", "condition", "conclusion" }, … ],
    "synthesis":  { "summary", "repaint_locations", "filler_locations",
                    "alignment_status", "glass_lamp_replacement",
                    "lower_structure_status", "structure_ok",
                    "final_conclusion", optional "pending_maintenance" }
  }

EXAMPLES:
  # Render into the current directory
  vehicle-report inspection.json

  # With photos and an odometer reading
  vehicle-report inspection.json --image https://cdn.example/1.jpg \
      --image ./photos/2.jpg --odometer 85000 -o reports/

  # Letter paper, narrower surface
  vehicle-report inspection.json --page-size letter --width 1000

  # Inspect the document model without rendering
  vehicle-report inspection.json --json
  vehicle-report inspection.json --html preview.html

ENVIRONMENT VARIABLES:
  RUST_LOG                    Overrides --verbose / --quiet log filtering
  VEHICLE_REPORT_*            Every flag, e.g. VEHICLE_REPORT_OUTPUT_DIR
"#;

/// Render vehicle-inspection results into a paginated PDF report.
#[derive(Parser, Debug)]
#[command(
    name = "vehicle-report",
    version,
    about = "Render vehicle-inspection results into a paginated PDF report",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Inspection JSON file: {vehicle, components, synthesis}.
    input: PathBuf,

    /// Image reference (URL, local path or data: URI). Repeatable; order is gallery order.
    #[arg(long = "image", env = "VEHICLE_REPORT_IMAGE")]
    images: Vec<String>,

    /// Odometer reading in km, shown in the report.
    #[arg(long, env = "VEHICLE_REPORT_ODOMETER")]
    odometer: Option<u32>,

    /// Directory the PDF is written to.
    #[arg(short, long, env = "VEHICLE_REPORT_OUTPUT_DIR", default_value = ".")]
    output_dir: PathBuf,

    /// Physical page size.
    #[arg(long, env = "VEHICLE_REPORT_PAGE_SIZE", value_enum, default_value = "a4")]
    page_size: PageSizeArg,

    /// Surface width in pixels (200–4000).
    #[arg(
        long,
        env = "VEHICLE_REPORT_WIDTH",
        default_value_t = vehicle_report::config::DEFAULT_SURFACE_WIDTH_PX,
        value_parser = clap::value_parser!(u32).range(200..=4000)
    )]
    width: u32,

    /// Fallback settle delay in ms for renderers without a ready signal.
    #[arg(long, env = "VEHICLE_REPORT_SETTLE_MS", default_value_t = 500)]
    settle_ms: u64,

    /// Per-image download timeout in seconds.
    #[arg(long, env = "VEHICLE_REPORT_IMAGE_TIMEOUT", default_value_t = 30)]
    image_timeout: u64,

    /// Write the HTML serialisation of the document here instead of rendering.
    #[arg(long, env = "VEHICLE_REPORT_HTML")]
    html: Option<PathBuf>,

    /// Print the document model as JSON instead of rendering.
    #[arg(long, env = "VEHICLE_REPORT_JSON")]
    json: bool,

    /// Disable the progress spinner.
    #[arg(long, env = "VEHICLE_REPORT_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "VEHICLE_REPORT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "VEHICLE_REPORT_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum PageSizeArg {
    A4,
    Letter,
}

impl From<PageSizeArg> for PageSize {
    fn from(v: PageSizeArg) -> Self {
        match v {
            PageSizeArg::A4 => PageSize::A4,
            PageSizeArg::Letter => PageSize::LETTER,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner provides the feedback that matters; keep library INFO
    // logs out of its way unless asked for.
    let model_only = cli.json || cli.html.is_some();
    let show_progress = !cli.quiet && !cli.no_progress && !model_only;
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

    // ── Read input ───────────────────────────────────────────────────────
    let raw = tokio::fs::read_to_string(&cli.input)
        .await
        .with_context(|| format!("Failed to read {}", cli.input.display()))?;
    let input: InspectionInput = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a valid inspection JSON", cli.input.display()))?;

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn ReportProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;

    // ── Model-only modes ─────────────────────────────────────────────────
    if model_only {
        let prepared = prepare_document(
            &input.vehicle,
            &input.components,
            &input.synthesis,
            &cli.images,
            cli.odometer,
            &config,
        )
        .await
        .context("Failed to build the report document")?;

        if let Some(ref path) = cli.html {
            tokio::fs::write(path, html::to_html(&prepared.document).into_string())
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            if !cli.quiet {
                eprintln!("{} HTML written to {}", green("✔"), bold(&path.display().to_string()));
            }
        }
        if cli.json {
            let json = serde_json::to_string_pretty(&prepared.document)
                .context("Failed to serialise document")?;
            println!("{json}");
        }
        return Ok(());
    }

    // ── Render ───────────────────────────────────────────────────────────
    let (artifact, path) = generate_report_to_dir(
        &input.vehicle,
        &input.components,
        &input.synthesis,
        &cli.images,
        cli.odometer,
        &cli.output_dir,
        &config,
    )
    .await
    .context("Report generation failed")?;

    if !cli.quiet {
        for failure in &artifact.stats.failed_images {
            eprintln!("  {} {}", red("✗"), dim(&failure.to_string()));
        }
        let status = if artifact.stats.failed_images.is_empty() {
            green("✔")
        } else {
            cyan("⚠")
        };
        eprintln!(
            "{}  {} page(s)  {}ms  →  {}",
            status,
            artifact.page_count,
            artifact.stats.total_duration_ms,
            bold(&path.display().to_string()),
        );
    }

    Ok(())
}

/// Map CLI args to `ReportConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ReportConfig> {
    let mut builder = ReportConfig::builder()
        .surface_width_px(cli.width)
        .page_size(cli.page_size.into())
        .settle_delay_ms(cli.settle_ms)
        .image_timeout_secs(cli.image_timeout);

    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
