//! # vehicle-report
//!
//! Render vehicle-inspection results into paginated, print-ready PDF reports.
//!
//! ## Why rasterise?
//!
//! The report is laid out once, as one tall surface of fixed pixel width,
//! and then cut into pages. Whatever the renderer can draw ends up in the
//! PDF exactly as drawn, with no second layout pass per page and no page
//! breaks negotiated between sections.
//!
//! ## Pipeline Overview
//!
//! ```text
//! VehicleRecord + findings + Synthesis + image refs
//!  │
//!  ├─ 1. Images     resolve every reference concurrently (failures drop one image)
//!  ├─ 2. Document   build the section list, valuation, risk tier
//!  ├─ 3. Render     attach → wait until ready → rasterise (spawn_blocking)
//!  ├─ 4. Paginate   page count, offsets, band cropping
//!  └─ 5. Assemble   page images → PDF bytes + filename
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use vehicle_report::{generate_report, ReportConfig, Synthesis, VehicleRecord};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let vehicle = VehicleRecord {
//!         brand: "Toyota".into(),
//!         model: "Corolla".into(),
//!         model_year: 2020,
//!         reference_price: "R$ 80.000,00".into(),
//!         reference_code: "002144-0".into(),
//!         plate: "ABC1D23".into(),
//!         ..Default::default()
//!     };
//!     let synthesis = Synthesis {
//!         final_conclusion: "cosmetic repair".into(),
//!         structure_ok: true,
//!         ..Default::default()
//!     };
//!     let config = ReportConfig::default();
//!     let artifact = generate_report(&vehicle, &[], &synthesis, &[], None, &config).await?;
//!     std::fs::write(&artifact.filename, &artifact.bytes)?;
//!     eprintln!("{} pages", artifact.page_count);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | `vehicle-report` binary (clap, anyhow, indicatif, tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! vehicle-report = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod document;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod record;
pub mod report;
pub mod valuation;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{Branding, ReportConfig, ReportConfigBuilder};
pub use document::{ReportDocument, RiskTier, SectionKind};
pub use error::{ImageFailure, ReportError};
pub use output::{ReportArtifact, ReportStats};
pub use pipeline::images::{DefaultImageResolver, ImageResolver};
pub use pipeline::paginate::PageSize;
pub use pipeline::render::{RenderSurface, SurfaceError, SurfaceRenderer};
pub use pipeline::schematic::SchematicRenderer;
pub use progress::{NoopProgressCallback, ProgressCallback, ReportProgressCallback};
pub use record::{ComponentFinding, InspectionInput, Synthesis, VehicleRecord};
pub use report::{
    generate_report, generate_report_sync, generate_report_to_dir, prepare_document, ArtifactSink,
    DirectorySink, PreparedDocument,
};
pub use valuation::{offer_price, valuate, CurrencyFormat, Valuation};
