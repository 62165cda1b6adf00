//! Pagination: slice one tall raster surface into fixed-size pages.
//!
//! ## Placement model
//!
//! The surface is first scaled so its width matches the physical page
//! width. Page `n` then looks at the *same* scaled surface through a
//! page-sized window whose top sits `n × page_height` below the surface
//! top; equivalently the surface is drawn at a vertical offset of
//! `−n × page_height` on that page. The offsets are computed exactly the
//! way a "remaining height" loop would:
//!
//! ```text
//! left = scaled − H;  while left > 0 { offset = left − scaled; left −= H }
//! ```
//!
//! ## Band cropping
//!
//! Instead of embedding the full raster on every page, [`crop_pages`] cuts
//! each window out as its own [`PageImage`]. Page count and covered area
//! are identical to the offset model: band tops are `floor(n × H_px)`, so
//! consecutive bands meet without gap or overlap, and the trailing part of
//! the last page is filled with background rather than cropped away.

use crate::error::ReportError;
use image::{imageops, Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Offsets within this distance of zero count as zero.
const EPSILON: f64 = 1e-6;

const MM_PER_INCH: f64 = 25.4;
const PT_PER_INCH: f64 = 72.0;

/// Physical page size. Units are arbitrary but shared by width and height;
/// the built-in sizes use millimetres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageSize {
    pub width: f64,
    pub height: f64,
}

impl PageSize {
    pub const A4: PageSize = PageSize {
        width: 210.0,
        height: 297.0,
    };

    pub const LETTER: PageSize = PageSize {
        width: 215.9,
        height: 279.4,
    };

    /// Size in PDF points, treating the units as millimetres.
    pub fn to_points(self) -> (f32, f32) {
        let k = PT_PER_INCH / MM_PER_INCH;
        ((self.width * k) as f32, (self.height * k) as f32)
    }
}

impl Default for PageSize {
    fn default() -> Self {
        PageSize::A4
    }
}

/// Where the scaled surface sits on one page.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PagePlacement {
    /// 0-indexed page number.
    pub index: usize,
    /// Vertical offset of the surface top, in page units. `0` for the first
    /// page, negative afterwards.
    pub offset: f64,
}

/// The full page plan for one surface.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pagination {
    pub page_size: PageSize,
    pub surface_width: u32,
    pub surface_height: u32,
    /// Surface height once scaled to the page width, in page units.
    pub scaled_height: f64,
    pub placements: Vec<PagePlacement>,
}

impl Pagination {
    pub fn page_count(&self) -> usize {
        self.placements.len()
    }

    /// Surface pixels per page unit.
    pub fn pixels_per_unit(&self) -> f64 {
        self.surface_width as f64 / self.page_size.width
    }

    /// Exact page height in surface pixels (usually fractional).
    pub fn page_height_px(&self) -> f64 {
        self.page_size.height * self.pixels_per_unit()
    }

    /// Rows `[top, bottom)` of the surface visible on `placement`.
    pub fn band(&self, placement: &PagePlacement) -> (u32, u32) {
        let ppu = self.pixels_per_unit();
        let top = (-placement.offset * ppu + EPSILON).floor().max(0.0) as u32;
        let bottom = ((-placement.offset + self.page_size.height) * ppu + EPSILON).floor() as u32;
        (top.min(self.surface_height), bottom.min(self.surface_height))
    }
}

/// A single page cut from the surface.
#[derive(Debug, Clone)]
pub struct PageImage {
    pub placement: PagePlacement,
    /// Page-sized raster, background-filled below the content.
    pub raster: RgbaImage,
    /// Rows of `raster` that carry surface content.
    pub content_height: u32,
}

impl PageImage {
    pub fn pixel_height(&self) -> u32 {
        self.raster.height()
    }
}

/// Plan the pages for a `surface_width × surface_height` raster.
pub fn paginate(
    surface_width: u32,
    surface_height: u32,
    page_size: PageSize,
) -> Result<Pagination, ReportError> {
    if surface_width == 0 || surface_height == 0 {
        return Err(ReportError::render(format!(
            "surface is empty ({surface_width}x{surface_height})"
        )));
    }
    if !(page_size.width > 0.0 && page_size.height > 0.0) {
        return Err(ReportError::InvalidConfig(format!(
            "page size must be positive, got {}x{}",
            page_size.width, page_size.height
        )));
    }

    let scaled_height = surface_height as f64 * (page_size.width / surface_width as f64);
    let mut placements = vec![PagePlacement {
        index: 0,
        offset: 0.0,
    }];

    if scaled_height > page_size.height + EPSILON {
        let mut height_left = scaled_height - page_size.height;
        while height_left > EPSILON {
            placements.push(PagePlacement {
                index: placements.len(),
                offset: height_left - scaled_height,
            });
            height_left -= page_size.height;
        }
    }

    debug!(
        "Paginated {}x{} px surface → {} pages (scaled height {:.2})",
        surface_width,
        surface_height,
        placements.len(),
        scaled_height
    );

    Ok(Pagination {
        page_size,
        surface_width,
        surface_height,
        scaled_height,
        placements,
    })
}

/// Cut one [`PageImage`] per placement out of `surface`.
pub fn crop_pages(surface: &RgbaImage, plan: &Pagination, background: Rgba<u8>) -> Vec<PageImage> {
    let page_px = plan.page_height_px().ceil().max(1.0) as u32;

    plan.placements
        .iter()
        .map(|placement| {
            let (top, bottom) = plan.band(placement);
            let rows = bottom.saturating_sub(top).min(page_px);
            let mut raster = RgbaImage::from_pixel(plan.surface_width, page_px, background);
            if rows > 0 {
                let band = imageops::crop_imm(surface, 0, top, plan.surface_width, rows).to_image();
                imageops::replace(&mut raster, &band, 0, 0);
            }
            PageImage {
                placement: *placement,
                raster,
                content_height: rows,
            }
        })
        .collect()
}
