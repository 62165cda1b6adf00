//! Serialised visual form of a [`ReportDocument`]: one self-contained HTML
//! page with images inlined as `data:` URIs.
//!
//! External renderers that lay out HTML (headless browsers, webview
//! snapshotters) attach this markup instead of walking the model. Colours
//! follow the same palette as the built-in schematic renderer.

use crate::document::model::{
    Block, Gallery, ItemGroup, ReportDocument, RiskTier, Section, SectionKind,
};
use maud::{html, Markup, PreEscaped, DOCTYPE};

const STYLE: &str = "\
body{margin:0;background:#fff;font-family:Arial,Helvetica,sans-serif;color:#1f2937}\
.report{margin:0 auto;padding:32px}\
.header{background:#1e40af;color:#fff;padding:24px;border-radius:8px}\
.section{margin-top:24px;border:1px solid #e5e7eb;border-radius:8px;padding:16px}\
.section h2{margin:0 0 12px;font-size:18px;color:#1e3a8a}\
.grid{display:grid;grid-template-columns:1fr 1fr;gap:8px 24px}\
.field .label{font-weight:bold;color:#6b7280}\
.gallery{display:grid;grid-template-columns:repeat(3,1fr);gap:12px}\
.gallery img{width:100%;height:160px;object-fit:cover;border-radius:4px}\
.overflow{margin-top:8px;font-style:italic;color:#6b7280}\
.risk{padding:16px;border-radius:8px;font-weight:bold;text-align:center;color:#fff}\
.risk-low{background:#16a34a}.risk-medium{background:#d97706}.risk-high{background:#dc2626}\
.footer{background:#111827;color:#e5e7eb;text-align:center}";

pub fn risk_class(tier: RiskTier) -> &'static str {
    match tier {
        RiskTier::Low => "risk-low",
        RiskTier::Medium => "risk-medium",
        RiskTier::High => "risk-high",
    }
}

/// Render the whole document. Text is escaped by `html!`.
pub fn to_html(doc: &ReportDocument) -> Markup {
    let title = doc
        .section(SectionKind::Header)
        .map(|s| s.title.as_str())
        .unwrap_or_default();

    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                title { (title) " " (doc.protocol) }
                style { (PreEscaped(STYLE)) }
            }
            body {
                div.report {
                    @for section in &doc.sections {
                        (render_section(section))
                    }
                }
            }
        }
    }
}

fn render_section(section: &Section) -> Markup {
    let class = match section.kind {
        SectionKind::Header => "section header",
        SectionKind::Footer => "section footer",
        _ => "section",
    };

    html! {
        section
            class=(class)
            data-kind=(format!("{:?}", section.kind))
            data-icon=(section.icon)
        {
            h2 { (section.title) }
            @match &section.block {
                Block::KeyValue { fields } => {
                    div.grid {
                        @for f in fields {
                            div.field {
                                span.label { (f.label) ":" }
                                " "
                                span.value { (f.value) }
                            }
                        }
                    }
                }
                Block::Paragraph { heading, text } => {
                    @if let Some(h) = heading {
                        h3 { (h) }
                    }
                    @for line in text.lines() {
                        p { (line) }
                    }
                }
                Block::RiskBanner { tier, text } => {
                    div class={ "risk " (risk_class(*tier)) } { (text) }
                }
                Block::Gallery(gallery) => (render_gallery(gallery)),
                Block::ItemList { groups } => (render_groups(groups)),
            }
        }
    }
}

fn render_gallery(gallery: &Gallery) -> Markup {
    html! {
        div.gallery {
            @for g in &gallery.images {
                figure {
                    img src=(g.image.to_data_uri()) alt=(g.caption);
                    figcaption { (g.caption) }
                }
            }
        }
        @if let Some(note) = &gallery.overflow_note {
            p.overflow { (note) }
        }
    }
}

fn render_groups(groups: &[ItemGroup]) -> Markup {
    html! {
        @for group in groups {
            @if let Some(h) = &group.heading {
                h3 { (h) }
            }
            ul {
                @for item in &group.items {
                    li { (item) }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::model::{Field, GalleryImage, InlineImage};

    fn doc() -> ReportDocument {
        ReportDocument {
            sections: vec![
                Section::new(
                    SectionKind::Header,
                    "Technical Vehicle Assessment Report",
                    Block::KeyValue {
                        fields: vec![Field::new("Protocol", "RVC-000042")],
                    },
                ),
                Section::new(
                    SectionKind::Images,
                    "Vehicle Images",
                    Block::Gallery(Gallery {
                        images: vec![GalleryImage {
                            caption: "Image 1".into(),
                            image: InlineImage::new("image/png", vec![1, 2, 3]),
                        }],
                        overflow_note: Some("And 2 more images analyzed…".into()),
                    }),
                ),
                Section::new(
                    SectionKind::Conclusion,
                    "Technical Conclusion",
                    Block::Paragraph {
                        heading: None,
                        text: "Bumper <rear> & trunk \"lid\"".into(),
                    },
                ),
                Section::new(
                    SectionKind::Risk,
                    "Risk Classification",
                    Block::RiskBanner {
                        tier: RiskTier::High,
                        text: "RISK CLASSIFICATION: HIGH".into(),
                    },
                ),
            ],
            protocol: "RVC-000042".into(),
            generated_on: "01/02/2026".into(),
            risk: RiskTier::High,
            offer_price: "R$ 0,00".into(),
        }
    }

    #[test]
    fn escapes_markup() {
        let html = to_html(&doc()).into_string();
        assert!(html.contains("Bumper &lt;rear&gt; &amp; trunk &quot;lid&quot;"));
        assert!(!html.contains("<rear>"));
    }

    #[test]
    fn escapes_field_values_and_captions() {
        let mut d = doc();
        d.sections[0].block = Block::KeyValue {
            fields: vec![Field::new("Plate", "<script>alert(1)</script>")],
        };
        let html = to_html(&d).into_string();
        assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn images_are_inlined() {
        let html = to_html(&doc()).into_string();
        assert!(html.contains("src=\"data:image/png;base64,AQID\""));
        assert!(html.contains("And 2 more images analyzed…"));
    }

    #[test]
    fn sections_keep_document_order() {
        let html = to_html(&doc()).into_string();
        let header = html.find("data-kind=\"Header\"").unwrap();
        let images = html.find("data-kind=\"Images\"").unwrap();
        let risk = html.find("data-kind=\"Risk\"").unwrap();
        assert!(header < images && images < risk);
        assert!(html.contains("class=\"risk risk-high\""));
    }
}
