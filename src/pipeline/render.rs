//! Rendering boundary: structured document → one tall raster surface.
//!
//! The pipeline consumes rendering as a capability. A [`SurfaceRenderer`]
//! attaches a document to a fresh [`RenderSurface`] of fixed pixel width;
//! the surface is then given time to finish asynchronous work (font and
//! image decoding) and rasterised once.
//!
//! ## Readiness
//!
//! A surface that knows when it is done loading returns a future from
//! [`RenderSurface::ready`]; the pipeline awaits it, bounded by
//! `ready_timeout_secs`. A surface without such a signal gets a fixed
//! `settle_delay_ms` wait instead. The fixed wait is a known source of
//! flaky output (a slow decode can outlive it) and exists only for
//! collaborators that cannot signal.
//!
//! ## Release
//!
//! The surface lives inside a [`SurfaceGuard`] from the moment it is
//! attached. The guard calls [`RenderSurface::release`] when dropped, so
//! the surface is released on success, on error, on panic in the blocking
//! task, and when the caller drops the report future mid-flight.

use crate::config::ReportConfig;
use crate::document::ReportDocument;
use crate::error::ReportError;
use futures::future::BoxFuture;
use image::RgbaImage;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Error type collaborators report through; flattened into
/// [`ReportError::Render`] by the pipeline.
pub type SurfaceError = Box<dyn std::error::Error + Send + Sync>;

/// Creates render surfaces for documents.
pub trait SurfaceRenderer: Send + Sync {
    /// Lay `document` out on a new surface `pixel_width` pixels wide.
    fn attach(
        &self,
        document: &ReportDocument,
        pixel_width: u32,
    ) -> Result<Box<dyn RenderSurface>, SurfaceError>;
}

/// A document attached to a rendering surface.
pub trait RenderSurface: Send {
    /// Resolves once all asynchronous loading has finished.
    ///
    /// `None` means the surface cannot tell; the pipeline then falls back
    /// to a fixed settle delay.
    fn ready(&mut self) -> Option<BoxFuture<'static, ()>> {
        None
    }

    /// Produce the full raster: exactly the attached width, any height.
    fn rasterize(&mut self) -> Result<RgbaImage, SurfaceError>;

    /// Free whatever the surface holds. Called exactly once.
    fn release(&mut self) {}
}

/// Owns a surface and releases it on drop.
pub struct SurfaceGuard {
    surface: Box<dyn RenderSurface>,
    released: bool,
}

impl SurfaceGuard {
    pub fn new(surface: Box<dyn RenderSurface>) -> Self {
        Self {
            surface,
            released: false,
        }
    }

    pub fn ready(&mut self) -> Option<BoxFuture<'static, ()>> {
        self.surface.ready()
    }

    pub fn rasterize(&mut self) -> Result<RgbaImage, SurfaceError> {
        self.surface.rasterize()
    }
}

impl Drop for SurfaceGuard {
    fn drop(&mut self) {
        if !self.released {
            self.released = true;
            self.surface.release();
            debug!("Render surface released");
        }
    }
}

/// Attach, wait for readiness, rasterise, release.
///
/// Attaching and rasterising are CPU-bound and run on the blocking pool.
pub async fn rasterize_document(
    renderer: Arc<dyn SurfaceRenderer>,
    document: &ReportDocument,
    config: &ReportConfig,
) -> Result<RgbaImage, ReportError> {
    let width = config.surface_width_px;
    let doc = document.clone();

    let mut guard =
        tokio::task::spawn_blocking(move || renderer.attach(&doc, width).map(SurfaceGuard::new))
            .await
            .map_err(|e| ReportError::render(format!("attach task panicked: {e}")))?
            .map_err(|e| ReportError::render(e.to_string()))?;

    wait_until_ready(&mut guard, config).await;

    // The guard moves into the task and is dropped there, after rasterising.
    let surface = tokio::task::spawn_blocking(move || guard.rasterize())
        .await
        .map_err(|e| ReportError::render(format!("rasterise task panicked: {e}")))?
        .map_err(|e| ReportError::render(e.to_string()))?;

    if surface.width() == 0 || surface.height() == 0 {
        return Err(ReportError::render(format!(
            "renderer produced an empty surface ({}x{})",
            surface.width(),
            surface.height()
        )));
    }
    if surface.width() != width {
        warn!(
            "Renderer returned width {} (requested {}); paginating at returned width",
            surface.width(),
            width
        );
    }

    info!("Rasterised document → {}x{} px", surface.width(), surface.height());
    Ok(surface)
}

async fn wait_until_ready(guard: &mut SurfaceGuard, config: &ReportConfig) {
    match guard.ready() {
        Some(signal) => {
            let limit = Duration::from_secs(config.ready_timeout_secs);
            if tokio::time::timeout(limit, signal).await.is_err() {
                warn!(
                    "Surface not ready after {}s; rasterising anyway",
                    config.ready_timeout_secs
                );
            }
        }
        None => {
            debug!(
                "Surface has no ready signal; settling for {}ms",
                config.settle_delay_ms
            );
            tokio::time::sleep(Duration::from_millis(config.settle_delay_ms)).await;
        }
    }
}
