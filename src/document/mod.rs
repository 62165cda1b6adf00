//! The report as data.
//!
//! ```text
//! VehicleRecord + findings + Synthesis + images
//!        │
//!        ▼  builder::build_document
//! ReportDocument ──▶ html::to_html   (for HTML-driven renderers)
//!        │
//!        ▼  pipeline::render
//! ```
//!
//! [`model`] holds the render-independent types, [`builder`] fills them
//! from the input records, and [`html`] serialises a document for
//! renderers that lay out markup.

pub mod builder;
pub mod html;
pub mod model;

pub use builder::{build_document, BuildContext, MAX_GALLERY_IMAGES};
pub use model::{
    Block, Field, Gallery, GalleryImage, InlineImage, ItemGroup, ReportDocument, RiskTier, Section,
    SectionKind,
};
