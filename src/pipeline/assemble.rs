//! Document assembly: page images → PDF bytes, plus the report filename.
//!
//! Each [`PageImage`] becomes one PDF page holding one Flate-compressed
//! DeviceRGB image XObject, drawn full-width from the top edge. Anything the
//! raster has below the page bottom (at most one pixel row from rounding)
//! is clipped by the media box.

use crate::error::ReportError;
use crate::pipeline::paginate::{PageImage, PageSize};
use crate::record::VehicleRecord;
use chrono::NaiveDate;
use miniz_oxide::deflate::compress_to_vec_zlib;
use once_cell::sync::Lazy;
use pdf_writer::{Content, Filter, Name, Pdf, Rect, Ref, TextStr};
use regex::Regex;
use tracing::debug;

const IMAGE_NAME: &[u8] = b"Im1";
const COMPRESSION_LEVEL: u8 = 6;

static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// `{prefix}_{brand}_{model}_{year}_{DD-MM-YYYY}.pdf`
///
/// Whitespace runs in brand and model collapse to a single `_`; path
/// separators become `-` so the name is always a single path component.
pub fn report_filename(prefix: &str, vehicle: &VehicleRecord, date: NaiveDate) -> String {
    let vehicle_info = format!(
        "{}_{}_{}",
        vehicle.brand.trim(),
        vehicle.model.trim(),
        vehicle.model_year
    );
    let vehicle_info = RE_WHITESPACE
        .replace_all(&vehicle_info, "_")
        .replace(['/', '\\'], "-");
    format!("{}_{}_{}.pdf", prefix, vehicle_info, date.format("%d-%m-%Y"))
}

/// Write `pages` as a PDF of `page_size` pages.
pub fn assemble_pdf(
    pages: &[PageImage],
    page_size: PageSize,
    title: &str,
) -> Result<Vec<u8>, ReportError> {
    if pages.is_empty() {
        return Err(ReportError::Internal("no pages to assemble".into()));
    }

    let mut pdf = Pdf::new();
    let mut next_id = 1i32;
    let mut alloc = || {
        let r = Ref::new(next_id);
        next_id += 1;
        r
    };

    let catalog_id = alloc();
    let pages_id = alloc();
    let info_id = alloc();
    let page_ids: Vec<Ref> = pages.iter().map(|_| alloc()).collect();
    let content_ids: Vec<Ref> = pages.iter().map(|_| alloc()).collect();
    let image_ids: Vec<Ref> = pages.iter().map(|_| alloc()).collect();

    pdf.catalog(catalog_id).pages(pages_id);
    pdf.pages(pages_id)
        .kids(page_ids.iter().copied())
        .count(pages.len() as i32);
    pdf.document_info(info_id)
        .title(TextStr(title))
        .producer(TextStr(concat!("vehicle-report ", env!("CARGO_PKG_VERSION"))));

    let (page_w, page_h) = page_size.to_points();

    for (i, page) in pages.iter().enumerate() {
        let (w, h) = page.raster.dimensions();
        if w == 0 || h == 0 {
            return Err(ReportError::Encode {
                page: i + 1,
                detail: format!("raster is {w}x{h}"),
            });
        }

        let rgb: Vec<u8> = page
            .raster
            .pixels()
            .flat_map(|p| [p.0[0], p.0[1], p.0[2]])
            .collect();
        let compressed = compress_to_vec_zlib(&rgb, COMPRESSION_LEVEL);
        {
            let mut xobj = pdf.image_xobject(image_ids[i], &compressed);
            xobj.filter(Filter::FlateDecode);
            xobj.width(w as i32);
            xobj.height(h as i32);
            xobj.color_space().device_rgb();
            xobj.bits_per_component(8);
        }

        let draw_h = page_w * h as f32 / w as f32;
        let mut content = Content::new();
        content.save_state();
        content.transform([page_w, 0.0, 0.0, draw_h, 0.0, page_h - draw_h]);
        content.x_object(Name(IMAGE_NAME));
        content.restore_state();
        let raw = content.finish();
        let compressed_content = compress_to_vec_zlib(&raw, COMPRESSION_LEVEL);
        pdf.stream(content_ids[i], &compressed_content)
            .filter(Filter::FlateDecode);

        let mut pdf_page = pdf.page(page_ids[i]);
        pdf_page
            .media_box(Rect::new(0.0, 0.0, page_w, page_h))
            .parent(pages_id)
            .contents(content_ids[i]);
        pdf_page
            .resources()
            .x_objects()
            .pair(Name(IMAGE_NAME), image_ids[i]);

        debug!(
            "Page {}/{}: {}x{} px, {} bytes compressed",
            i + 1,
            pages.len(),
            w,
            h,
            compressed.len()
        );
    }

    Ok(pdf.finish())
}
