//! Error types for the vehicle-report library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`ReportError`] — **Fatal**: the report cannot be produced at all
//!   (the rendering collaborator failed, the PDF could not be encoded, the
//!   artifact could not be written). Returned as `Err(ReportError)` from
//!   the top-level `generate_report*` functions. No partial artifact is
//!   ever returned alongside it.
//!
//! * [`ImageFailure`] — **Non-fatal**: a single image could not be resolved
//!   (bad URL, HTTP error, undecodable bytes). The image is left out of the
//!   gallery and the failure is recorded in
//!   [`crate::output::ReportStats::failed_images`]; the run continues.
//!
//! Malformed reference prices are not errors at all: the valuation degrades
//! to a zero price (see [`crate::valuation`]).

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the vehicle-report library.
#[derive(Debug, Error)]
pub enum ReportError {
    // ── Render errors ─────────────────────────────────────────────────────
    /// The rendering surface could not be attached or rasterised.
    ///
    /// Collaborator-specific detail is flattened into `detail`; callers only
    /// ever see this one render variant.
    #[error("Rendering failed: {detail}")]
    Render { detail: String },

    /// A page raster could not be encoded into the PDF.
    #[error("Failed to encode page {page} into the PDF: {detail}")]
    Encode { page: usize, detail: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output artifact.
    #[error("Failed to write report '{path}': {source}")]
    SaveFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ReportError {
    /// Shorthand for the generic render failure.
    pub fn render(detail: impl Into<String>) -> Self {
        ReportError::Render {
            detail: detail.into(),
        }
    }
}

/// A non-fatal error for a single image.
///
/// Stored in [`crate::output::ReportStats`] when an image URL could not be
/// turned into inline image data.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
#[error("Image '{url}' could not be resolved: {reason}")]
pub struct ImageFailure {
    pub url: String,
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_display() {
        let e = ReportError::render("surface lost");
        assert_eq!(e.to_string(), "Rendering failed: surface lost");
    }

    #[test]
    fn encode_display() {
        let e = ReportError::Encode {
            page: 2,
            detail: "bad buffer".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("page 2"), "got: {msg}");
        assert!(msg.contains("bad buffer"), "got: {msg}");
    }

    #[test]
    fn save_failed_keeps_source() {
        use std::error::Error as _;
        let e = ReportError::SaveFailed {
            path: PathBuf::from("/tmp/out.pdf"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope"),
        };
        assert!(e.to_string().contains("/tmp/out.pdf"));
        assert!(e.source().is_some());
    }

    #[test]
    fn image_failure_display() {
        let e = ImageFailure {
            url: "https://cdn.example/1.jpg".into(),
            reason: "HTTP 404".into(),
        };
        assert!(e.to_string().contains("HTTP 404"));
        assert!(e.to_string().contains("1.jpg"));
    }
}
