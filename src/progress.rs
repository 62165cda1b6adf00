//! Progress-callback trait for report pipeline events.
//!
//! Inject an [`Arc<dyn ReportProgressCallback>`] via
//! [`crate::config::ReportConfigBuilder::progress_callback`] to receive
//! events as the pipeline moves from image resolution through
//! rasterisation to the finished artifact.
//!
//! # Example
//!
//! ```rust
//! use vehicle_report::{ReportConfig, ReportProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct PageCounter {
//!     pages: AtomicUsize,
//! }
//!
//! impl ReportProgressCallback for PageCounter {
//!     fn on_page_emitted(&self, page_num: usize, total_pages: usize) {
//!         self.pages.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("page {page_num}/{total_pages}");
//!     }
//! }
//!
//! let counter = Arc::new(PageCounter { pages: AtomicUsize::new(0) });
//!
//! let config = ReportConfig::builder()
//!     .progress_callback(counter as Arc<dyn ReportProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the report pipeline as it progresses.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Implementations must be `Send + Sync`: image
/// resolution runs concurrently and rasterisation runs on a blocking
/// thread.
pub trait ReportProgressCallback: Send + Sync {
    /// Called once before any image is fetched.
    fn on_report_start(&self, image_count: usize) {
        let _ = image_count;
    }

    /// Called after every image fetch has settled.
    ///
    /// # Arguments
    /// * `resolved` — images turned into inline data
    /// * `failed`   — images left out of the gallery
    fn on_images_resolved(&self, resolved: usize, failed: usize) {
        let _ = (resolved, failed);
    }

    /// Called once the document has been rasterised.
    fn on_surface_ready(&self, width: u32, height: u32) {
        let _ = (width, height);
    }

    /// Called after each page has been cut from the surface.
    ///
    /// # Arguments
    /// * `page_num`    — 1-indexed page number
    /// * `total_pages` — total pages in the artifact
    fn on_page_emitted(&self, page_num: usize, total_pages: usize) {
        let _ = (page_num, total_pages);
    }

    /// Called once the artifact bytes are ready.
    fn on_report_complete(&self, filename: &str, total_pages: usize) {
        let _ = (filename, total_pages);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ReportProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ReportConfig`].
pub type ProgressCallback = Arc<dyn ReportProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct TrackingCallback {
        images: AtomicUsize,
        pages: AtomicUsize,
        finished: Mutex<Option<(String, usize)>>,
    }

    impl ReportProgressCallback for TrackingCallback {
        fn on_report_start(&self, image_count: usize) {
            self.images.store(image_count, Ordering::SeqCst);
        }

        fn on_page_emitted(&self, _page_num: usize, _total_pages: usize) {
            self.pages.fetch_add(1, Ordering::SeqCst);
        }

        fn on_report_complete(&self, filename: &str, total_pages: usize) {
            *self.finished.lock().unwrap() = Some((filename.to_string(), total_pages));
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_report_start(3);
        cb.on_images_resolved(2, 1);
        cb.on_surface_ready(1191, 4000);
        cb.on_page_emitted(1, 3);
        cb.on_report_complete("r.pdf", 3);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();
        tracker.on_report_start(4);
        tracker.on_page_emitted(1, 2);
        tracker.on_page_emitted(2, 2);
        tracker.on_report_complete("a.pdf", 2);

        assert_eq!(tracker.images.load(Ordering::SeqCst), 4);
        assert_eq!(tracker.pages.load(Ordering::SeqCst), 2);
        assert_eq!(
            tracker.finished.lock().unwrap().clone(),
            Some(("a.pdf".to_string(), 2))
        );
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_surface_ready(10, 10);
    }
}
