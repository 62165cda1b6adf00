//! Result types returned by the report pipeline.

use crate::error::ImageFailure;
use serde::Serialize;

/// One finished report.
#[derive(Clone, Serialize)]
pub struct ReportArtifact {
    /// `{prefix}_{brand}_{model}_{year}_{DD-MM-YYYY}.pdf`
    pub filename: String,
    /// Complete PDF file contents.
    #[serde(skip)]
    pub bytes: Vec<u8>,
    pub page_count: usize,
    pub stats: ReportStats,
}

impl std::fmt::Debug for ReportArtifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportArtifact")
            .field("filename", &self.filename)
            .field("bytes", &format_args!("<{} bytes>", self.bytes.len()))
            .field("page_count", &self.page_count)
            .field("stats", &self.stats)
            .finish()
    }
}

/// Aggregate statistics for one report run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReportStats {
    /// Image references handed in.
    pub images_requested: usize,
    /// References that turned into inline images.
    pub images_resolved: usize,
    /// Images placed in the gallery (at most six).
    pub images_shown: usize,
    /// Non-fatal per-image failures, in input order.
    pub failed_images: Vec<ImageFailure>,
    pub surface_width: u32,
    pub surface_height: u32,
    pub pages: usize,
    /// Wall-clock time for image resolution.
    pub resolve_duration_ms: u64,
    /// Wall-clock time from attach to rasterised surface.
    pub render_duration_ms: u64,
    /// Wall-clock time for pagination and PDF assembly.
    pub assemble_duration_ms: u64,
    pub total_duration_ms: u64,
}
