//! Pipeline stages from report document to PDF bytes.
//!
//! Each submodule implements exactly one transformation step, so each can
//! be tested alone and a stage can be swapped (another renderer, another
//! resolver) without touching the others.
//!
//! ## Data Flow
//!
//! ```text
//! image refs ──▶ images ──▶ (document builder) ──▶ render ──▶ paginate ──▶ assemble
//!   (URLs)       (inline)                          (surface)   (bands)     (PDF)
//! ```
//!
//! 1. [`images`]    — resolve every image reference concurrently; failures
//!    drop that image and nothing else
//! 2. [`render`]    — attach the document to a render surface, wait for it
//!    to settle, rasterise once; blocking work runs in `spawn_blocking`
//! 3. [`schematic`] — the built-in surface renderer
//! 4. [`paginate`]  — page count, per-page offsets and band cropping
//! 5. [`assemble`]  — page images → PDF, plus the artifact filename

pub mod assemble;
pub mod images;
pub mod paginate;
pub mod render;
pub mod schematic;
