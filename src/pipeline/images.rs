//! Image resolution: turn image references into inline image data.
//!
//! Every reference is resolved concurrently and the pipeline waits for all
//! of them to settle. A failure only removes that one image; it never
//! cancels the others and never aborts the report.
//!
//! The default resolver understands three kinds of reference:
//!
//! * `data:<mime>;base64,<payload>` — decoded in place
//! * `http://…` / `https://…` — fetched with a per-request timeout
//! * anything else (optionally `file://`-prefixed) — read from disk
//!
//! Whatever the source, the bytes must sniff as a known image format.

use crate::document::InlineImage;
use crate::error::{ImageFailure, ReportError};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use futures::future::{self, BoxFuture};
use futures::FutureExt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Resolves one image reference.
///
/// Implementations report failures as values; the pipeline turns them into
/// absent images.
pub trait ImageResolver: Send + Sync {
    fn resolve<'a>(
        &'a self,
        reference: &'a str,
    ) -> BoxFuture<'a, Result<InlineImage, ImageFailure>>;
}

/// Outcome of resolving a batch of references.
#[derive(Debug, Default)]
pub struct ResolvedImages {
    /// Successfully resolved images, in input order.
    pub images: Vec<InlineImage>,
    pub failures: Vec<ImageFailure>,
}

/// Resolve all references concurrently, keeping input order.
pub async fn resolve_all(
    resolver: &Arc<dyn ImageResolver>,
    references: &[String],
) -> ResolvedImages {
    if references.is_empty() {
        return ResolvedImages::default();
    }
    info!("Resolving {} images", references.len());

    let settled = future::join_all(references.iter().map(|r| resolver.resolve(r))).await;

    let mut out = ResolvedImages::default();
    for result in settled {
        match result {
            Ok(img) => out.images.push(img),
            Err(failure) => {
                warn!("{}", failure);
                out.failures.push(failure);
            }
        }
    }
    debug!(
        "Images settled: {} resolved, {} failed",
        out.images.len(),
        out.failures.len()
    );
    out
}

/// Resolver for data URIs, HTTP(S) URLs and local paths.
#[derive(Debug, Clone)]
pub struct DefaultImageResolver {
    client: reqwest::Client,
    timeout_secs: u64,
}

impl DefaultImageResolver {
    pub fn new(timeout_secs: u64) -> Result<Self, ReportError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ReportError::Internal(format!("HTTP client: {e}")))?;
        Ok(Self {
            client,
            timeout_secs,
        })
    }

    async fn fetch(&self, reference: &str) -> Result<Vec<u8>, String> {
        if let Some(rest) = reference.strip_prefix("data:") {
            return decode_data_uri(rest);
        }
        if is_url(reference) {
            return self.download(reference).await;
        }
        let path = reference.strip_prefix("file://").unwrap_or(reference);
        tokio::fs::read(path).await.map_err(|e| e.to_string())
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, String> {
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                format!("timed out after {}s", self.timeout_secs)
            } else {
                e.to_string()
            }
        })?;

        if !response.status().is_success() {
            return Err(format!("HTTP {}", response.status()));
        }

        let bytes = response.bytes().await.map_err(|e| e.to_string())?;
        Ok(bytes.to_vec())
    }
}

impl ImageResolver for DefaultImageResolver {
    fn resolve<'a>(
        &'a self,
        reference: &'a str,
    ) -> BoxFuture<'a, Result<InlineImage, ImageFailure>> {
        async move {
            let failure = |reason: String| ImageFailure {
                url: display_reference(reference),
                reason,
            };
            let bytes = self.fetch(reference).await.map_err(failure)?;
            let inline = sniff(bytes).map_err(failure)?;
            debug!(
                "Resolved {} → {} ({} bytes)",
                display_reference(reference),
                inline.mime_type,
                inline.bytes.len()
            );
            Ok(inline)
        }
        .boxed()
    }
}

/// Check if the reference looks like a URL.
pub fn is_url(reference: &str) -> bool {
    reference.starts_with("http://") || reference.starts_with("https://")
}

/// Wrap raw bytes as an [`InlineImage`] if they sniff as an image.
pub fn sniff(bytes: Vec<u8>) -> Result<InlineImage, String> {
    let format =
        image::guess_format(&bytes).map_err(|_| "not a recognised image format".to_string())?;
    Ok(InlineImage::new(format.to_mime_type(), bytes))
}

/// Decode the part of a data URI after `data:`.
fn decode_data_uri(rest: &str) -> Result<Vec<u8>, String> {
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| "malformed data URI".to_string())?;
    if !header.ends_with(";base64") {
        return Err("data URI is not base64-encoded".into());
    }
    STANDARD
        .decode(payload.trim())
        .map_err(|e| format!("invalid base64: {e}"))
}

/// Data URIs can be megabytes long; keep log lines short.
fn display_reference(reference: &str) -> String {
    if reference.starts_with("data:") && reference.len() > 48 {
        let cut = reference
            .char_indices()
            .nth(40)
            .map(|(i, _)| i)
            .unwrap_or(reference.len());
        format!("{}…", &reference[..cut])
    } else {
        reference.to_string()
    }
}
