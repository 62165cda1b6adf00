//! Built-in [`SurfaceRenderer`]: a deterministic raster layout of the
//! report.
//!
//! Lays the document out top to bottom at a fixed pixel width and paints
//! section boxes, typeset text, the risk banner and the gallery photos.
//! Text is set in the bundled DejaVu Sans faces, wrapped on word
//! boundaries. Deployments that need full HTML layout inject their own
//! renderer through [`crate::config::ReportConfigBuilder::renderer`] and
//! feed it [`crate::document::html::to_html`].
//!
//! Gallery photos are decoded off the async executor while the pipeline
//! waits on [`RenderSurface::ready`]; a photo that is not decoded by
//! rasterisation time is painted as a grey placeholder.

use crate::document::{
    Block, Gallery, ItemGroup, ReportDocument, RiskTier, Section, SectionKind,
};
use crate::pipeline::render::{RenderSurface, SurfaceError, SurfaceRenderer};
use ab_glyph::{FontRef, PxScale};
use futures::future::BoxFuture;
use futures::FutureExt;
use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect as PixelRect;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// Page background; also used to pad the last page.
pub const BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);

const HEADER_BG: Rgba<u8> = Rgba([30, 64, 175, 255]);
const BORDER: Rgba<u8> = Rgba([229, 231, 235, 255]);
const TITLE: Rgba<u8> = Rgba([30, 58, 138, 255]);
const LABEL: Rgba<u8> = Rgba([107, 114, 128, 255]);
const TEXT: Rgba<u8> = Rgba([31, 41, 55, 255]);
const ON_DARK: Rgba<u8> = Rgba([229, 231, 235, 255]);
const PLACEHOLDER: Rgba<u8> = Rgba([209, 213, 219, 255]);
const FOOTER_BG: Rgba<u8> = Rgba([17, 24, 39, 255]);

/// Reference width the unit sizes below are expressed in (A4 at 96 DPI).
const BASE_WIDTH: f32 = 794.0;
const GALLERY_COLUMNS: usize = 3;
/// Body text size in units.
const FONT_SIZE: f32 = 13.0;
const LINE_SPACING: f32 = 1.5;

static REGULAR_TTF: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans.ttf");
static BOLD_TTF: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans-Bold.ttf");

pub fn risk_color(tier: RiskTier) -> Rgba<u8> {
    match tier {
        RiskTier::Low => Rgba([22, 163, 74, 255]),
        RiskTier::Medium => Rgba([217, 119, 6, 255]),
        RiskTier::High => Rgba([220, 38, 38, 255]),
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SchematicRenderer;

impl SchematicRenderer {
    pub fn new() -> Self {
        Self
    }
}

impl SurfaceRenderer for SchematicRenderer {
    fn attach(
        &self,
        document: &ReportDocument,
        pixel_width: u32,
    ) -> Result<Box<dyn RenderSurface>, SurfaceError> {
        Ok(Box::new(SchematicSurface::new(document, pixel_width)?))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Weight {
    Regular,
    Bold,
}

#[derive(Debug, Clone)]
struct Fonts {
    regular: FontRef<'static>,
    bold: FontRef<'static>,
}

impl Fonts {
    fn load() -> Result<Self, SurfaceError> {
        Ok(Self {
            regular: FontRef::try_from_slice(REGULAR_TTF)?,
            bold: FontRef::try_from_slice(BOLD_TTF)?,
        })
    }

    fn face(&self, weight: Weight) -> &FontRef<'static> {
        match weight {
            Weight::Regular => &self.regular,
            Weight::Bold => &self.bold,
        }
    }

    /// Rendered width of `text` in pixels.
    fn width(&self, text: &str, size: f32, weight: Weight) -> f32 {
        text_size(PxScale::from(size), self.face(weight), text).0 as f32
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Rect {
    x: f32,
    y: f32,
    w: f32,
    h: f32,
}

#[derive(Debug, Clone, PartialEq)]
enum Op {
    Fill {
        rect: Rect,
        color: Rgba<u8>,
    },
    Text {
        x: f32,
        y: f32,
        size: f32,
        weight: Weight,
        color: Rgba<u8>,
        text: String,
    },
    Photo {
        rect: Rect,
        slot: usize,
    },
}

/// Encoded photo plus the box it must fill.
struct PhotoSlot {
    bytes: Vec<u8>,
    width: u32,
    height: u32,
}

struct SchematicSurface {
    width: u32,
    height: u32,
    fonts: Fonts,
    ops: Vec<Op>,
    photos: Arc<Vec<PhotoSlot>>,
    decoded: Arc<Mutex<Vec<Option<RgbaImage>>>>,
    released: bool,
}

impl SchematicSurface {
    fn new(document: &ReportDocument, pixel_width: u32) -> Result<Self, SurfaceError> {
        if pixel_width == 0 {
            return Err("surface width must be positive".into());
        }
        let fonts = Fonts::load()?;
        let layout = Layout::new(pixel_width, fonts.clone()).run(document);
        debug!(
            "Schematic layout: {} ops, {} photos, {}x{} px",
            layout.ops.len(),
            layout.photos.len(),
            pixel_width,
            layout.height
        );
        let decoded = Arc::new(Mutex::new(vec![None; layout.photos.len()]));
        Ok(Self {
            width: pixel_width,
            height: layout.height,
            fonts,
            ops: layout.ops,
            photos: Arc::new(layout.photos),
            decoded,
            released: false,
        })
    }
}

impl RenderSurface for SchematicSurface {
    fn ready(&mut self) -> Option<BoxFuture<'static, ()>> {
        if self.photos.is_empty() {
            return Some(futures::future::ready(()).boxed());
        }
        let photos = Arc::clone(&self.photos);
        let decoded = Arc::clone(&self.decoded);
        Some(
            async move {
                let decoding = tokio::task::spawn_blocking(move || {
                    let images: Vec<Option<RgbaImage>> =
                        photos.iter().map(decode_photo).collect();
                    match decoded.lock() {
                        Ok(mut slot) => *slot = images,
                        Err(_) => warn!("Photo cache lock poisoned, photos left undecoded"),
                    }
                });
                if let Err(e) = decoding.await {
                    warn!("Photo decoding task failed, drawing placeholders: {}", e);
                }
            }
            .boxed(),
        )
    }

    fn rasterize(&mut self) -> Result<RgbaImage, SurfaceError> {
        if self.released {
            return Err("surface already released".into());
        }
        let decoded = match self.decoded.lock() {
            Ok(mut slot) => std::mem::take(&mut *slot),
            Err(_) => {
                warn!("Photo cache lock poisoned, drawing placeholders");
                Vec::new()
            }
        };

        let mut canvas = RgbaImage::from_pixel(self.width, self.height, BACKGROUND);
        for op in &self.ops {
            match op {
                Op::Fill { rect, color } => fill(&mut canvas, *rect, *color),
                Op::Text {
                    x,
                    y,
                    size,
                    weight,
                    color,
                    text,
                } => draw_text_mut(
                    &mut canvas,
                    *color,
                    x.round() as i32,
                    y.round() as i32,
                    PxScale::from(*size),
                    self.fonts.face(*weight),
                    text,
                ),
                Op::Photo { rect, slot } => match decoded.get(*slot).and_then(Option::as_ref) {
                    Some(photo) => {
                        let (x, y) = (rect.x.round() as i64, rect.y.round() as i64);
                        imageops::overlay(&mut canvas, photo, x, y)
                    }
                    None => fill(&mut canvas, *rect, PLACEHOLDER),
                },
            }
        }
        Ok(canvas)
    }

    fn release(&mut self) {
        self.released = true;
        self.ops.clear();
        match self.decoded.lock() {
            Ok(mut slot) => slot.clear(),
            Err(_) => warn!("Photo cache lock poisoned on release"),
        }
    }
}

fn decode_photo(slot: &PhotoSlot) -> Option<RgbaImage> {
    match image::load_from_memory(&slot.bytes) {
        Ok(img) => Some(
            img.resize_to_fill(slot.width, slot.height, FilterType::Triangle)
                .to_rgba8(),
        ),
        Err(e) => {
            debug!("Photo decode failed, drawing placeholder: {}", e);
            None
        }
    }
}

fn fill(canvas: &mut RgbaImage, rect: Rect, color: Rgba<u8>) {
    let (w, h) = (rect.w.round(), rect.h.round());
    if w < 1.0 || h < 1.0 {
        return;
    }
    let at = PixelRect::at(rect.x.round() as i32, rect.y.round() as i32);
    draw_filled_rect_mut(canvas, at.of_size(w as u32, h as u32), color);
}

/// Single-pass top-to-bottom layout.
struct Layout {
    width: f32,
    unit: f32,
    y: f32,
    fonts: Fonts,
    ops: Vec<Op>,
    photos: Vec<PhotoSlot>,
}

struct Laid {
    ops: Vec<Op>,
    photos: Vec<PhotoSlot>,
    height: u32,
}

impl Layout {
    fn new(width: u32, fonts: Fonts) -> Self {
        let unit = width as f32 / BASE_WIDTH;
        Self {
            width: width as f32,
            unit,
            y: 32.0 * unit,
            fonts,
            ops: Vec::new(),
            photos: Vec::new(),
        }
    }

    fn u(&self, v: f32) -> f32 {
        v * self.unit
    }

    fn run(mut self, doc: &ReportDocument) -> Laid {
        for section in &doc.sections {
            self.section(section);
            self.y += self.u(24.0);
        }
        let height = (self.y + self.u(8.0)).ceil().max(1.0) as u32;
        Laid {
            ops: self.ops,
            photos: self.photos,
            height,
        }
    }

    fn section(&mut self, section: &Section) {
        let margin = self.u(32.0);
        let pad = self.u(16.0);
        let x = margin + pad;
        let inner_w = self.width - 2.0 * (margin + pad);
        let top = self.y;
        let first_op = self.ops.len();

        let (background, title_color, text_color) = match section.kind {
            SectionKind::Header => (Some(HEADER_BG), ON_DARK, ON_DARK),
            SectionKind::Footer => (Some(FOOTER_BG), ON_DARK, ON_DARK),
            _ => (None, TITLE, TEXT),
        };

        self.y += pad;
        self.y += self.text(x, inner_w, &section.title, title_color, 1.4, Weight::Bold);
        self.y += self.u(8.0);

        match &section.block {
            Block::KeyValue { fields } => {
                let col_w = (inner_w - self.u(24.0)) / 2.0;
                let label_color = if background.is_some() { ON_DARK } else { LABEL };
                for pair in fields.chunks(2) {
                    let row_top = self.y;
                    let mut row_h: f32 = 0.0;
                    for (i, f) in pair.iter().enumerate() {
                        let cx = x + i as f32 * (col_w + self.u(24.0));
                        self.y = row_top;
                        let mut h = self.text(cx, col_w, &f.label, label_color, 0.9, Weight::Bold);
                        self.y = row_top + h;
                        h += self.text(cx, col_w, &f.value, text_color, 1.0, Weight::Regular);
                        row_h = row_h.max(h);
                    }
                    self.y = row_top + row_h + self.u(6.0);
                }
            }
            Block::Paragraph { heading, text } => {
                if let Some(h) = heading {
                    self.y += self.text(x, inner_w, h, TITLE, 1.15, Weight::Bold);
                }
                for line in text.lines() {
                    self.y += self.text(x, inner_w, line, text_color, 1.0, Weight::Regular);
                }
            }
            Block::RiskBanner { tier, text } => self.banner(x, inner_w, *tier, text),
            Block::Gallery(gallery) => self.gallery(x, inner_w, gallery),
            Block::ItemList { groups } => self.groups(x, inner_w, groups),
        }

        self.y += pad;
        let frame = Rect {
            x: margin,
            y: top,
            w: self.width - 2.0 * margin,
            h: self.y - top,
        };
        let backdrop = match background {
            Some(color) => vec![Op::Fill { rect: frame, color }],
            None => {
                let b = self.u(1.5);
                vec![
                    Op::Fill { rect: frame, color: BORDER },
                    Op::Fill {
                        rect: Rect {
                            x: frame.x + b,
                            y: frame.y + b,
                            w: frame.w - 2.0 * b,
                            h: frame.h - 2.0 * b,
                        },
                        color: BACKGROUND,
                    },
                ]
            }
        };
        let content = self.ops.split_off(first_op);
        self.ops.extend(backdrop);
        self.ops.extend(content);
    }

    /// Tier-coloured box with its label centred in white.
    fn banner(&mut self, x: f32, inner_w: f32, tier: RiskTier, text: &str) {
        let h = self.u(56.0);
        let size = self.u(FONT_SIZE) * 1.3;
        self.ops.push(Op::Fill {
            rect: Rect {
                x,
                y: self.y,
                w: inner_w,
                h,
            },
            color: risk_color(tier),
        });
        let text_w = self.fonts.width(text, size, Weight::Bold).min(inner_w);
        self.ops.push(Op::Text {
            x: x + (inner_w - text_w) / 2.0,
            y: self.y + (h - size * 1.2) / 2.0,
            size,
            weight: Weight::Bold,
            color: BACKGROUND,
            text: text.to_string(),
        });
        self.y += h;
    }

    fn gallery(&mut self, x: f32, inner_w: f32, gallery: &Gallery) {
        let gap = self.u(12.0);
        let cell_w = (inner_w - gap * (GALLERY_COLUMNS - 1) as f32) / GALLERY_COLUMNS as f32;
        let photo_h = self.u(160.0);

        for row in gallery.images.chunks(GALLERY_COLUMNS) {
            let row_top = self.y;
            let mut caption_h: f32 = 0.0;
            for (i, g) in row.iter().enumerate() {
                let rect = Rect {
                    x: x + i as f32 * (cell_w + gap),
                    y: row_top,
                    w: cell_w,
                    h: photo_h,
                };
                let slot = self.photos.len();
                self.photos.push(PhotoSlot {
                    bytes: g.image.bytes.clone(),
                    width: rect.w.round().max(1.0) as u32,
                    height: rect.h.round().max(1.0) as u32,
                });
                self.ops.push(Op::Photo { rect, slot });
                self.y = row_top + photo_h;
                let h = self.text(rect.x, cell_w, &g.caption, LABEL, 0.9, Weight::Regular);
                caption_h = caption_h.max(h);
            }
            self.y = row_top + photo_h + caption_h + gap;
        }
        if let Some(note) = &gallery.overflow_note {
            self.y += self.text(x, inner_w, note, LABEL, 1.0, Weight::Regular);
        }
    }

    fn groups(&mut self, x: f32, inner_w: f32, groups: &[ItemGroup]) {
        let indent = self.u(16.0);
        for group in groups {
            if let Some(h) = &group.heading {
                self.y += self.text(x, inner_w, h, TITLE, 1.1, Weight::Bold);
            }
            for item in &group.items {
                let bullet = self.u(5.0);
                let line_h = self.u(FONT_SIZE) * LINE_SPACING;
                let dot = Rect {
                    x: x + self.u(4.0),
                    y: self.y + line_h / 2.0 - bullet / 2.0,
                    w: bullet,
                    h: bullet,
                };
                self.ops.push(Op::Fill { rect: dot, color: TEXT });
                let item_w = inner_w - indent;
                self.y += self.text(x + indent, item_w, item, TEXT, 1.0, Weight::Regular);
            }
            self.y += self.u(8.0);
        }
    }

    /// Typeset `text` wrapped to `max_w` starting at the cursor; returns
    /// the height used. The cursor itself is not moved.
    fn text(
        &mut self,
        x: f32,
        max_w: f32,
        text: &str,
        color: Rgba<u8>,
        scale: f32,
        weight: Weight,
    ) -> f32 {
        let size = self.u(FONT_SIZE) * scale;
        let line_h = size * LINE_SPACING;
        let lines = self.wrap(text, size, weight, max_w);

        let mut y = self.y;
        for line in &lines {
            self.ops.push(Op::Text {
                x,
                y: y + (line_h - size * 1.2) / 2.0,
                size,
                weight,
                color,
                text: line.clone(),
            });
            y += line_h;
        }
        lines.len().max(1) as f32 * line_h
    }

    /// Greedy word wrap; words wider than a line are split between
    /// characters.
    fn wrap(&self, text: &str, size: f32, weight: Weight, max_w: f32) -> Vec<String> {
        let fits = |s: &str| self.fonts.width(s, size, weight) <= max_w;
        let mut lines = Vec::new();
        let mut line = String::new();
        for word in text.split_whitespace() {
            let candidate = if line.is_empty() {
                word.to_string()
            } else {
                format!("{line} {word}")
            };
            if fits(&candidate) {
                line = candidate;
                continue;
            }
            if !line.is_empty() {
                lines.push(std::mem::take(&mut line));
                line.push_str(word);
                if fits(&line) {
                    continue;
                }
                line.clear();
            }
            for c in word.chars() {
                line.push(c);
                if line.chars().count() > 1 && !fits(&line) {
                    line.pop();
                    lines.push(std::mem::take(&mut line));
                    line.push(c);
                }
            }
        }
        if !line.is_empty() {
            lines.push(line);
        }
        lines
    }
}
