//! Configuration types for report generation.
//!
//! All pipeline behaviour is controlled through [`ReportConfig`], built via
//! its [`ReportConfigBuilder`]. Collaborators (surface renderer, image
//! resolver, progress sink) are injected here as trait objects; leaving
//! them unset selects the built-in implementations.

use crate::error::ReportError;
use crate::pipeline::images::ImageResolver;
use crate::pipeline::paginate::PageSize;
use crate::pipeline::render::SurfaceRenderer;
use crate::progress::ProgressCallback;
use crate::valuation::DEFAULT_ODOMETER_KM;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// A4 at 96 DPI is 794 px wide; rasterised at 1.5× for print sharpness.
pub const DEFAULT_SURFACE_WIDTH_PX: u32 = 1191;

/// Names and wording printed on every report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branding {
    pub company: String,
    pub tagline: String,
    pub report_title: String,
    pub analyst: String,
    pub website: String,
    pub email: String,
    /// Prefix of the protocol number, e.g. `RVC` → `RVC-123456`.
    pub protocol_prefix: String,
    /// First component of the artifact filename.
    pub filename_prefix: String,
}

impl Default for Branding {
    fn default() -> Self {
        Self {
            company: "ReviuCar".into(),
            tagline: "Intelligent Vehicle Assessment".into(),
            report_title: "Technical Vehicle Assessment Report".into(),
            analyst: "ReviuCar AI".into(),
            website: "www.reviucar.com.br".into(),
            email: "contato@reviucar.com".into(),
            protocol_prefix: "RVC".into(),
            filename_prefix: "Report_ReviuCar".into(),
        }
    }
}

/// Configuration for one or more report generations.
///
/// # Example
/// ```rust
/// use vehicle_report::{PageSize, ReportConfig};
///
/// let config = ReportConfig::builder()
///     .surface_width_px(1000)
///     .page_size(PageSize::LETTER)
///     .settle_delay_ms(0)
///     .build()
///     .unwrap();
/// assert_eq!(config.surface_width_px, 1000);
/// ```
#[derive(Clone)]
pub struct ReportConfig {
    /// Pixel width of the raster surface. Range: 200–4000. Default: 1191.
    pub surface_width_px: u32,

    /// Physical page size. Default: A4.
    pub page_size: PageSize,

    /// Fixed wait before rasterising when the surface offers no ready
    /// signal. Default: 500.
    ///
    /// This is the fallback path and inherently racy: a slow decode can
    /// still be in flight when the wait ends. Renderers should expose
    /// [`crate::pipeline::render::RenderSurface::ready`] instead.
    pub settle_delay_ms: u64,

    /// Upper bound on waiting for an explicit ready signal. Default: 10.
    pub ready_timeout_secs: u64,

    /// Per-image fetch timeout used by the default resolver. Default: 30.
    pub image_timeout_secs: u64,

    /// Odometer used for the express valuation when none is supplied.
    /// Default: 80 000 km.
    pub default_odometer_km: u32,

    pub branding: Branding,

    /// Rendering collaborator. `None` selects the built-in schematic renderer.
    pub renderer: Option<Arc<dyn SurfaceRenderer>>,

    /// Image resolution collaborator. `None` selects the default resolver.
    pub resolver: Option<Arc<dyn ImageResolver>>,

    /// Optional progress sink.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            surface_width_px: DEFAULT_SURFACE_WIDTH_PX,
            page_size: PageSize::A4,
            settle_delay_ms: 500,
            ready_timeout_secs: 10,
            image_timeout_secs: 30,
            default_odometer_km: DEFAULT_ODOMETER_KM,
            branding: Branding::default(),
            renderer: None,
            resolver: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ReportConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReportConfig")
            .field("surface_width_px", &self.surface_width_px)
            .field("page_size", &self.page_size)
            .field("settle_delay_ms", &self.settle_delay_ms)
            .field("ready_timeout_secs", &self.ready_timeout_secs)
            .field("image_timeout_secs", &self.image_timeout_secs)
            .field("default_odometer_km", &self.default_odometer_km)
            .field("branding", &self.branding)
            .field("renderer", &self.renderer.as_ref().map(|_| "<dyn SurfaceRenderer>"))
            .field("resolver", &self.resolver.as_ref().map(|_| "<dyn ImageResolver>"))
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ReportProgressCallback>"),
            )
            .finish()
    }
}

impl ReportConfig {
    /// Create a new builder for `ReportConfig`.
    pub fn builder() -> ReportConfigBuilder {
        ReportConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ReportConfig`].
#[derive(Debug)]
pub struct ReportConfigBuilder {
    config: ReportConfig,
}

impl ReportConfigBuilder {
    pub fn surface_width_px(mut self, px: u32) -> Self {
        self.config.surface_width_px = px;
        self
    }

    pub fn page_size(mut self, size: PageSize) -> Self {
        self.config.page_size = size;
        self
    }

    pub fn settle_delay_ms(mut self, ms: u64) -> Self {
        self.config.settle_delay_ms = ms;
        self
    }

    pub fn ready_timeout_secs(mut self, secs: u64) -> Self {
        self.config.ready_timeout_secs = secs.max(1);
        self
    }

    pub fn image_timeout_secs(mut self, secs: u64) -> Self {
        self.config.image_timeout_secs = secs.max(1);
        self
    }

    pub fn default_odometer_km(mut self, km: u32) -> Self {
        self.config.default_odometer_km = km;
        self
    }

    pub fn branding(mut self, branding: Branding) -> Self {
        self.config.branding = branding;
        self
    }

    pub fn renderer(mut self, renderer: Arc<dyn SurfaceRenderer>) -> Self {
        self.config.renderer = Some(renderer);
        self
    }

    pub fn resolver(mut self, resolver: Arc<dyn ImageResolver>) -> Self {
        self.config.resolver = Some(resolver);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ReportConfig, ReportError> {
        let c = &self.config;
        if !(200..=4000).contains(&c.surface_width_px) {
            return Err(ReportError::InvalidConfig(format!(
                "surface width must be 200–4000 px, got {}",
                c.surface_width_px
            )));
        }
        if !(c.page_size.width > 0.0 && c.page_size.height > 0.0) {
            return Err(ReportError::InvalidConfig(format!(
                "page size must be positive, got {}x{}",
                c.page_size.width, c.page_size.height
            )));
        }
        if c.branding.filename_prefix.trim().is_empty() {
            return Err(ReportError::InvalidConfig(
                "filename prefix must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let c = ReportConfig::builder().build().unwrap();
        assert_eq!(c.surface_width_px, DEFAULT_SURFACE_WIDTH_PX);
        assert_eq!(c.page_size, PageSize::A4);
        assert_eq!(c.default_odometer_km, 80_000);
        assert!(c.renderer.is_none());
    }

    #[test]
    fn rejects_out_of_range_width() {
        assert!(matches!(
            ReportConfig::builder().surface_width_px(10).build(),
            Err(ReportError::InvalidConfig(_))
        ));
        assert!(ReportConfig::builder().surface_width_px(5000).build().is_err());
    }

    #[test]
    fn rejects_degenerate_page() {
        let page = PageSize {
            width: 0.0,
            height: 297.0,
        };
        assert!(ReportConfig::builder().page_size(page).build().is_err());
    }

    #[test]
    fn rejects_blank_filename_prefix() {
        let branding = Branding {
            filename_prefix: "  ".into(),
            ..Branding::default()
        };
        assert!(ReportConfig::builder().branding(branding).build().is_err());
    }

    #[test]
    fn debug_hides_trait_objects() {
        let s = format!("{:?}", ReportConfig::default());
        assert!(s.contains("surface_width_px: 1191"));
        assert!(s.contains("renderer: None"));
    }
}
