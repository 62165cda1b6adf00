//! Report generation entry points.
//!
//! [`generate_report`] runs the whole pipeline and returns the artifact in
//! memory. [`generate_report_to_dir`] additionally hands it to a
//! [`DirectorySink`], and [`generate_report_sync`] wraps the async entry
//! point for callers without a runtime.
//!
//! The run is all-or-nothing: either a complete artifact comes back or a
//! single [`ReportError`] does. Per-image failures are the exception; they
//! are recorded in [`ReportStats::failed_images`] and never abort the run.

use crate::config::ReportConfig;
use crate::document::{build_document, BuildContext, ReportDocument, MAX_GALLERY_IMAGES};
use crate::error::{ImageFailure, ReportError};
use crate::output::{ReportArtifact, ReportStats};
use crate::pipeline::assemble::{assemble_pdf, report_filename};
use crate::pipeline::images::{self, DefaultImageResolver, ImageResolver, ResolvedImages};
use crate::pipeline::paginate::{crop_pages, paginate};
use crate::pipeline::render::{self, SurfaceRenderer};
use crate::pipeline::schematic::{SchematicRenderer, BACKGROUND};
use crate::record::{ComponentFinding, Synthesis, VehicleRecord};
use chrono::{DateTime, Local};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// A document built from resolved images, before any rendering.
#[derive(Debug, Clone)]
pub struct PreparedDocument {
    pub document: ReportDocument,
    pub generated_at: DateTime<Local>,
    pub images_requested: usize,
    pub images_resolved: usize,
    pub failed_images: Vec<ImageFailure>,
    pub resolve_duration_ms: u64,
}

/// Resolve images and build the document model. No rendering happens.
///
/// Used by [`generate_report`]; also handy on its own for previews and for
/// dumping the model as JSON or HTML.
pub async fn prepare_document(
    vehicle: &VehicleRecord,
    findings: &[ComponentFinding],
    synthesis: &Synthesis,
    image_urls: &[String],
    odometer_km: Option<u32>,
    config: &ReportConfig,
) -> Result<PreparedDocument, ReportError> {
    let generated_at = Local::now();

    // ── Step 1: Resolve images (all settle, none abort) ─────────────────
    let resolve_start = Instant::now();
    let ResolvedImages { images, failures } = if image_urls.is_empty() {
        ResolvedImages::default()
    } else {
        let resolver = image_resolver(config)?;
        images::resolve_all(&resolver, image_urls).await
    };
    let resolve_duration_ms = resolve_start.elapsed().as_millis() as u64;
    if let Some(ref cb) = config.progress_callback {
        cb.on_images_resolved(images.len(), failures.len());
    }
    if !failures.is_empty() {
        warn!(
            "{} of {} images could not be resolved and were left out",
            failures.len(),
            image_urls.len()
        );
    }

    // ── Step 2: Build the document model ────────────────────────────────
    let images_resolved = images.len();
    let ctx = BuildContext {
        branding: &config.branding,
        generated_at,
        default_odometer_km: config.default_odometer_km,
    };
    let document = build_document(vehicle, findings, synthesis, images, odometer_km, &ctx);
    debug!(
        "Built document: {} sections, protocol {}, risk {}",
        document.sections.len(),
        document.protocol,
        document.risk.label()
    );

    Ok(PreparedDocument {
        document,
        generated_at,
        images_requested: image_urls.len(),
        images_resolved,
        failed_images: failures,
        resolve_duration_ms,
    })
}

/// Produce a report artifact.
///
/// # Arguments
/// * `image_urls` — `data:` URIs, HTTP(S) URLs or local paths; order is the
///   gallery order
/// * `odometer_km` — shown in the report when given; the valuation falls
///   back to `config.default_odometer_km`
///
/// # Errors
/// Only fatal errors: the renderer failed, the PDF could not be encoded, or
/// the configuration is unusable. Unresolvable images are not errors.
pub async fn generate_report(
    vehicle: &VehicleRecord,
    findings: &[ComponentFinding],
    synthesis: &Synthesis,
    image_urls: &[String],
    odometer_km: Option<u32>,
    config: &ReportConfig,
) -> Result<ReportArtifact, ReportError> {
    let total_start = Instant::now();
    info!(
        "Generating report: {} {} {} ({} images)",
        vehicle.brand,
        vehicle.model,
        vehicle.model_year,
        image_urls.len()
    );
    if let Some(ref cb) = config.progress_callback {
        cb.on_report_start(image_urls.len());
    }

    let prepared =
        prepare_document(vehicle, findings, synthesis, image_urls, odometer_km, config).await?;

    // ── Step 3: Rasterise ───────────────────────────────────────────────
    let render_start = Instant::now();
    let renderer: Arc<dyn SurfaceRenderer> = match &config.renderer {
        Some(r) => Arc::clone(r),
        None => Arc::new(SchematicRenderer::new()),
    };
    let surface = render::rasterize_document(renderer, &prepared.document, config).await?;
    let render_duration_ms = render_start.elapsed().as_millis() as u64;
    let (surface_width, surface_height) = surface.dimensions();
    if let Some(ref cb) = config.progress_callback {
        cb.on_surface_ready(surface_width, surface_height);
    }

    // ── Step 4: Paginate and assemble ───────────────────────────────────
    let assemble_start = Instant::now();
    let plan = paginate(surface_width, surface_height, config.page_size)?;
    let filename = report_filename(
        &config.branding.filename_prefix,
        vehicle,
        prepared.generated_at.date_naive(),
    );
    let title = filename.trim_end_matches(".pdf").to_string();
    let page_size = config.page_size;
    let progress = config.progress_callback.clone();

    let (page_count, bytes) = tokio::task::spawn_blocking(move || {
        let pages = crop_pages(&surface, &plan, BACKGROUND);
        drop(surface);
        if let Some(ref cb) = progress {
            for i in 0..pages.len() {
                cb.on_page_emitted(i + 1, pages.len());
            }
        }
        assemble_pdf(&pages, page_size, &title).map(|bytes| (pages.len(), bytes))
    })
    .await
    .map_err(|e| ReportError::Internal(format!("assemble task panicked: {e}")))??;
    let assemble_duration_ms = assemble_start.elapsed().as_millis() as u64;

    let stats = ReportStats {
        images_requested: prepared.images_requested,
        images_resolved: prepared.images_resolved,
        images_shown: prepared.images_resolved.min(MAX_GALLERY_IMAGES),
        failed_images: prepared.failed_images,
        surface_width,
        surface_height,
        pages: page_count,
        resolve_duration_ms: prepared.resolve_duration_ms,
        render_duration_ms,
        assemble_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };

    info!(
        "Report complete: {} ({} pages, {} bytes, {}ms)",
        filename,
        page_count,
        bytes.len(),
        stats.total_duration_ms
    );
    if let Some(ref cb) = config.progress_callback {
        cb.on_report_complete(&filename, page_count);
    }

    Ok(ReportArtifact {
        filename,
        bytes,
        page_count,
        stats,
    })
}

/// Generate a report and save it into `dir`. Returns the artifact and the
/// path it was written to.
pub async fn generate_report_to_dir(
    vehicle: &VehicleRecord,
    findings: &[ComponentFinding],
    synthesis: &Synthesis,
    image_urls: &[String],
    odometer_km: Option<u32>,
    dir: impl AsRef<Path>,
    config: &ReportConfig,
) -> Result<(ReportArtifact, PathBuf), ReportError> {
    let artifact =
        generate_report(vehicle, findings, synthesis, image_urls, odometer_km, config).await?;
    let path = DirectorySink::new(dir.as_ref()).save(&artifact).await?;
    Ok((artifact, path))
}

/// Synchronous wrapper around [`generate_report`].
///
/// Creates a temporary tokio runtime internally.
pub fn generate_report_sync(
    vehicle: &VehicleRecord,
    findings: &[ComponentFinding],
    synthesis: &Synthesis,
    image_urls: &[String],
    odometer_km: Option<u32>,
    config: &ReportConfig,
) -> Result<ReportArtifact, ReportError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ReportError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(generate_report(
            vehicle,
            findings,
            synthesis,
            image_urls,
            odometer_km,
            config,
        ))
}

/// Where finished artifacts go.
pub trait ArtifactSink: Send + Sync {
    fn save<'a>(
        &'a self,
        artifact: &'a ReportArtifact,
    ) -> BoxFuture<'a, Result<PathBuf, ReportError>>;
}

/// Saves artifacts as `<dir>/<filename>`.
///
/// Uses atomic write (temp file + rename) so a reader never sees a partial
/// PDF.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl ArtifactSink for DirectorySink {
    fn save<'a>(
        &'a self,
        artifact: &'a ReportArtifact,
    ) -> BoxFuture<'a, Result<PathBuf, ReportError>> {
        async move {
            let path = self.dir.join(&artifact.filename);
            let save_failed = |source| ReportError::SaveFailed {
                path: path.clone(),
                source,
            };

            tokio::fs::create_dir_all(&self.dir).await.map_err(save_failed)?;

            let tmp_path = path.with_extension("pdf.tmp");
            tokio::fs::write(&tmp_path, &artifact.bytes)
                .await
                .map_err(save_failed)?;
            tokio::fs::rename(&tmp_path, &path).await.map_err(save_failed)?;

            info!("Saved {}", path.display());
            Ok(path)
        }
        .boxed()
    }
}

fn image_resolver(config: &ReportConfig) -> Result<Arc<dyn ImageResolver>, ReportError> {
    match &config.resolver {
        Some(r) => Ok(Arc::clone(r)),
        None => Ok(Arc::new(DefaultImageResolver::new(config.image_timeout_secs)?)),
    }
}
