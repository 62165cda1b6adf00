//! End-to-end integration tests for vehicle-report.
//!
//! These exercise the public API only: inline `data:` images, the built-in
//! schematic renderer, injected renderers and the directory sink. No
//! network access is needed.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::Local;
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use regex::Regex;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use vehicle_report::document::{Block, SectionKind};
use vehicle_report::valuation::digit_sum;
use vehicle_report::{
    generate_report, generate_report_to_dir, prepare_document, ComponentFinding, CurrencyFormat,
    InspectionInput, PageSize, RenderSurface, ReportConfig, ReportDocument, ReportError, RiskTier,
    SurfaceError, SurfaceRenderer, Synthesis, VehicleRecord,
};

// ── Test helpers ─────────────────────────────────────────────────────────────

const INSPECTION_JSON: &str = r#"{
    "vehicle": {
        "brand": "Toyota",
        "model": "Corolla",
        "model_year": 2020,
        "color": "Silver",
        "fuel_type": "Flex",
        "municipality": "Curitiba",
        "region": "PR",
        "reference_price": "R$ 80.000,00",
        "reference_code": "002144-0",
        "plate": "ABC1D23"
    },
    "components": [
        { "name": "Rear bumper", "condition": "repainted", "conclusion": "cosmetic only" },
        { "name": "Hood", "condition": "original", "conclusion": "no findings" }
    ],
    "synthesis": {
        "summary": "Light repaint on the rear bumper; no structural findings.",
        "repaint_locations": "rear bumper",
        "filler_locations": "none",
        "alignment_status": "no",
        "glass_lamp_replacement": "no",
        "lower_structure_status": "intact",
        "structure_ok": true,
        "final_conclusion": "cosmetic repair",
        "pending_maintenance": ["Replace rear tyres"]
    }
}"#;

fn inspection() -> InspectionInput {
    serde_json::from_str(INSPECTION_JSON).unwrap()
}

fn photo_uri(color: [u8; 3]) -> String {
    let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(
        32,
        24,
        Rgba([color[0], color[1], color[2], 255]),
    ));
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    format!("data:image/png;base64,{}", STANDARD.encode(buf))
}

fn fast_config() -> ReportConfig {
    ReportConfig::builder()
        .settle_delay_ms(0)
        .ready_timeout_secs(5)
        .build()
        .unwrap()
}

/// Assert the bytes look like a complete PDF with `pages` page objects.
fn assert_pdf(bytes: &[u8], pages: usize, context: &str) {
    assert!(bytes.starts_with(b"%PDF-"), "[{context}] missing PDF header");
    let tail = String::from_utf8_lossy(&bytes[bytes.len().saturating_sub(32)..]).to_string();
    assert!(tail.contains("%%EOF"), "[{context}] missing %%EOF trailer");

    let text = String::from_utf8_lossy(bytes);
    let page_objects = text.matches("/Type /Page").count() - text.matches("/Type /Pages").count();
    assert_eq!(page_objects, pages, "[{context}] page object count");
    assert_eq!(
        text.matches("/Subtype /Image").count(),
        pages,
        "[{context}] one image per page"
    );
}

// ── Full pipeline with the built-in renderer ─────────────────────────────────

#[tokio::test]
async fn full_report_with_inline_photos() {
    let input = inspection();
    let photos = vec![photo_uri([200, 30, 30]), photo_uri([30, 200, 30])];

    let artifact = generate_report(
        &input.vehicle,
        &input.components,
        &input.synthesis,
        &photos,
        Some(85_000),
        &fast_config(),
    )
    .await
    .expect("report should be generated");

    assert!(artifact.page_count >= 1);
    assert_pdf(&artifact.bytes, artifact.page_count, "inline photos");
    assert_eq!(artifact.stats.images_resolved, 2);
    assert!(artifact.stats.failed_images.is_empty());
    assert_eq!(artifact.stats.surface_width, 1191);
    assert!(artifact
        .filename
        .starts_with("Report_ReviuCar_Toyota_Corolla_2020_"));
}

#[tokio::test]
async fn minimal_corolla_report_is_named_for_today() {
    let vehicle = VehicleRecord {
        brand: "Toyota".into(),
        model: "Corolla".into(),
        model_year: 2020,
        reference_price: "R$ 80.000,00".into(),
        ..Default::default()
    };
    let synthesis = Synthesis {
        final_conclusion: "cosmetic repair".into(),
        ..Default::default()
    };
    let config = fast_config();

    let prepared = prepare_document(&vehicle, &[], &synthesis, &[], None, &config)
        .await
        .unwrap();
    assert_eq!(prepared.document.risk, RiskTier::Low);
    let offer = CurrencyFormat::BRL
        .parse(&prepared.document.offer_price)
        .expect("offer must parse back") as i64;
    assert_eq!(digit_sum(offer), 8, "offer {offer}");
    assert_eq!(offer % 100, 0, "offer {offer}");

    let before = Local::now().format("%d-%m-%Y").to_string();
    let artifact = generate_report(&vehicle, &[], &synthesis, &[], None, &config)
        .await
        .unwrap();
    let after = Local::now().format("%d-%m-%Y").to_string();

    let pattern = Regex::new(r"^Report_ReviuCar_Toyota_Corolla_2020_(\d{2}-\d{2}-\d{4})\.pdf$")
        .unwrap();
    let caps = pattern
        .captures(&artifact.filename)
        .unwrap_or_else(|| panic!("unexpected filename {}", artifact.filename));
    assert!(
        caps[1] == before || caps[1] == after,
        "{} is not dated today ({before})",
        artifact.filename
    );
    assert_pdf(&artifact.bytes, artifact.page_count, "minimal corolla");
}

#[tokio::test]
async fn document_content_for_corolla_scenario() {
    let input = inspection();
    let photos: Vec<String> = (0..9).map(|i| photo_uri([i * 20, 100, 100])).collect();

    let prepared = prepare_document(
        &input.vehicle,
        &input.components,
        &input.synthesis,
        &photos,
        None,
        &fast_config(),
    )
    .await
    .unwrap();
    let doc = &prepared.document;

    assert_eq!(doc.risk, RiskTier::Low);
    assert_eq!(doc.offer_price, "R$ 62.000,00");
    assert_eq!(doc.gallery_len(), 6);
    assert_eq!(
        doc.kinds(),
        SectionKind::CANONICAL_ORDER.to_vec(),
        "all eight sections in canonical order"
    );

    let Some(Block::Gallery(gallery)) = doc.section(SectionKind::Images).map(|s| &s.block) else {
        panic!("images section must hold a gallery");
    };
    assert_eq!(
        gallery.overflow_note.as_deref(),
        Some("And 3 more images analyzed…")
    );

    let risk = doc.section(SectionKind::Risk).map(|s| &s.block);
    let Some(Block::RiskBanner { text, .. }) = risk else {
        panic!("risk section must hold a banner");
    };
    assert_eq!(text, "RISK CLASSIFICATION: LOW");
}

#[tokio::test]
async fn unresolvable_photos_do_not_abort() {
    let input = inspection();
    let photos = vec![
        "/no/such/photo.jpg".to_string(),
        photo_uri([10, 10, 200]),
        "data:image/png;base64,!!!".to_string(),
    ];

    let artifact = generate_report(
        &input.vehicle,
        &input.components,
        &input.synthesis,
        &photos,
        None,
        &fast_config(),
    )
    .await
    .unwrap();

    assert_eq!(artifact.stats.images_requested, 3);
    assert_eq!(artifact.stats.images_resolved, 1);
    assert_eq!(artifact.stats.failed_images.len(), 2);
    assert_pdf(&artifact.bytes, artifact.page_count, "partial photos");
}

#[tokio::test]
async fn no_photos_means_no_image_section() {
    let input = inspection();
    let prepared = prepare_document(
        &input.vehicle,
        &[],
        &input.synthesis,
        &[],
        None,
        &fast_config(),
    )
    .await
    .unwrap();
    assert!(prepared.document.section(SectionKind::Images).is_none());
    assert_eq!(prepared.document.kinds().len(), 7);
}

// ── Injected renderers ───────────────────────────────────────────────────────

#[derive(Default)]
struct Tally {
    attached: AtomicUsize,
    released: AtomicUsize,
}

/// Renderer whose surfaces either fail to rasterise or return a fixed
/// height, counting attach/release.
struct CountingRenderer {
    tally: Arc<Tally>,
    height: Option<u32>,
}

struct CountingSurface {
    tally: Arc<Tally>,
    width: u32,
    height: Option<u32>,
}

impl SurfaceRenderer for CountingRenderer {
    fn attach(
        &self,
        _document: &ReportDocument,
        pixel_width: u32,
    ) -> Result<Box<dyn RenderSurface>, SurfaceError> {
        self.tally.attached.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(CountingSurface {
            tally: Arc::clone(&self.tally),
            width: pixel_width,
            height: self.height,
        }))
    }
}

impl RenderSurface for CountingSurface {
    fn rasterize(&mut self) -> Result<RgbaImage, SurfaceError> {
        match self.height {
            Some(h) => Ok(RgbaImage::from_pixel(self.width, h, Rgba([240, 240, 240, 255]))),
            None => Err("compositor crashed".into()),
        }
    }

    fn release(&mut self) {
        self.tally.released.fetch_add(1, Ordering::SeqCst);
    }
}

fn counting_config(tally: &Arc<Tally>, height: Option<u32>, page: PageSize) -> ReportConfig {
    ReportConfig::builder()
        .renderer(Arc::new(CountingRenderer {
            tally: Arc::clone(tally),
            height,
        }))
        .page_size(page)
        .settle_delay_ms(0)
        .build()
        .unwrap()
}

#[tokio::test]
async fn render_failure_is_fatal_and_surface_is_released() {
    let input = inspection();
    let tally = Arc::new(Tally::default());
    let config = counting_config(&tally, None, PageSize::A4);

    let err = generate_report(
        &input.vehicle,
        &input.components,
        &input.synthesis,
        &[],
        None,
        &config,
    )
    .await
    .unwrap_err();

    assert!(
        matches!(err, ReportError::Render { ref detail } if detail.contains("compositor crashed")),
        "got: {err}"
    );
    assert_eq!(tally.attached.load(Ordering::SeqCst), 1);
    assert_eq!(tally.released.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn page_count_is_ceiling_of_scaled_height() {
    let input = inspection();
    // 1191 px wide on A4: one page is 297 * 1191 / 210 ≈ 1684.4 px.
    for (height, pages) in [(1000, 1), (1684, 1), (1700, 2), (3368, 2), (3400, 3), (10_000, 6)] {
        let tally = Arc::new(Tally::default());
        let config = counting_config(&tally, Some(height), PageSize::A4);
        let artifact = generate_report(&input.vehicle, &[], &input.synthesis, &[], None, &config)
            .await
            .unwrap();
        assert_eq!(artifact.page_count, pages, "surface height {height}");
        assert_pdf(&artifact.bytes, pages, &format!("height {height}"));
        assert_eq!(tally.released.load(Ordering::SeqCst), 1);
    }
}

#[tokio::test]
async fn letter_pages_use_letter_media_box() {
    let input = inspection();
    let tally = Arc::new(Tally::default());
    let config = counting_config(&tally, Some(800), PageSize::LETTER);
    let artifact = generate_report(&input.vehicle, &[], &input.synthesis, &[], None, &config)
        .await
        .unwrap();
    let text = String::from_utf8_lossy(&artifact.bytes);
    let start = text.find("/MediaBox [").unwrap() + "/MediaBox [".len();
    let end = start + text[start..].find(']').unwrap();
    let dims: Vec<f32> = text[start..end]
        .split_whitespace()
        .map(|v| v.parse().unwrap())
        .collect();
    assert_eq!(dims.len(), 4);
    assert!((dims[2] - 612.0).abs() < 0.01, "width {}", dims[2]);
    assert!((dims[3] - 792.0).abs() < 0.01, "height {}", dims[3]);
}

// ── Sink ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn report_is_saved_under_its_filename() {
    let input = inspection();
    let dir = tempfile::tempdir().unwrap();

    let (artifact, path) = generate_report_to_dir(
        &input.vehicle,
        &input.components,
        &input.synthesis,
        &[photo_uri([0, 0, 0])],
        None,
        dir.path(),
        &fast_config(),
    )
    .await
    .unwrap();

    assert_eq!(path.file_name().unwrap().to_str().unwrap(), artifact.filename);
    let written = std::fs::read(&path).unwrap();
    assert_eq!(written, artifact.bytes);
    assert_pdf(&written, artifact.page_count, "saved");
}

#[test]
fn blank_conclusion_is_medium_risk() {
    let synthesis = Synthesis {
        final_conclusion: String::new(),
        ..Default::default()
    };
    let vehicle = VehicleRecord {
        brand: "Fiat".into(),
        model: "Uno".into(),
        model_year: 2012,
        reference_price: "R$ 20.000,00".into(),
        ..Default::default()
    };
    let findings: Vec<ComponentFinding> = vec![];
    let prepared = tokio_test::block_on(prepare_document(
        &vehicle,
        &findings,
        &synthesis,
        &[],
        None,
        &fast_config(),
    ))
    .unwrap();
    assert_eq!(prepared.document.risk, RiskTier::Medium);
}
