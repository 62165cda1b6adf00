//! Structured, render-independent representation of one report.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

/// The sections of a report, in the only order they may appear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    Header,
    Vehicle,
    Images,
    Technical,
    Conclusion,
    Risk,
    Observations,
    Footer,
}

impl SectionKind {
    pub const CANONICAL_ORDER: [SectionKind; 8] = [
        SectionKind::Header,
        SectionKind::Vehicle,
        SectionKind::Images,
        SectionKind::Technical,
        SectionKind::Conclusion,
        SectionKind::Risk,
        SectionKind::Observations,
        SectionKind::Footer,
    ];

    /// Icon tag a renderer may map to a glyph.
    pub fn icon(self) -> &'static str {
        match self {
            SectionKind::Header => "logo",
            SectionKind::Vehicle => "car",
            SectionKind::Images => "camera",
            SectionKind::Technical => "magnifier",
            SectionKind::Conclusion => "receipt",
            SectionKind::Risk => "warning",
            SectionKind::Observations => "paperclip",
            SectionKind::Footer => "globe",
        }
    }
}

/// Risk classification derived from the final conclusion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

impl RiskTier {
    /// Map a final-conclusion string onto a tier.
    ///
    /// Matching ignores ASCII case and surrounding whitespace. Anything not
    /// in the LOW or HIGH lists is MEDIUM.
    pub fn from_conclusion(conclusion: &str) -> Self {
        const LOW: [&str; 2] = ["no collision evidence", "cosmetic repair"];
        const HIGH: [&str; 2] = ["significant impact", "structure compromised"];

        let c = conclusion.trim();
        if LOW.iter().any(|k| c.eq_ignore_ascii_case(k)) {
            RiskTier::Low
        } else if HIGH.iter().any(|k| c.eq_ignore_ascii_case(k)) {
            RiskTier::High
        } else {
            RiskTier::Medium
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RiskTier::Low => "LOW",
            RiskTier::Medium => "MEDIUM",
            RiskTier::High => "HIGH",
        }
    }
}

/// Image bytes already fetched and ready to embed.
#[derive(Clone, PartialEq, Eq)]
pub struct InlineImage {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl InlineImage {
    pub fn new(mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.into(),
            bytes,
        }
    }

    /// `data:<mime>;base64,<payload>`
    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, STANDARD.encode(&self.bytes))
    }
}

impl std::fmt::Debug for InlineImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InlineImage")
            .field("mime_type", &self.mime_type)
            .field("bytes", &format_args!("<{} bytes>", self.bytes.len()))
            .finish()
    }
}

// Payload bytes are left out of JSON dumps of the document.
impl Serialize for InlineImage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("InlineImage", 2)?;
        s.serialize_field("mime_type", &self.mime_type)?;
        s.serialize_field("size_bytes", &self.bytes.len())?;
        s.end()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Field {
    pub label: String,
    pub value: String,
}

impl Field {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GalleryImage {
    pub caption: String,
    pub image: InlineImage,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Gallery {
    pub images: Vec<GalleryImage>,
    /// "And N more images analyzed…" when images were left out.
    pub overflow_note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemGroup {
    pub heading: Option<String>,
    pub items: Vec<String>,
}

/// Typed content of a section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    KeyValue { fields: Vec<Field> },
    Paragraph { heading: Option<String>, text: String },
    RiskBanner { tier: RiskTier, text: String },
    Gallery(Gallery),
    ItemList { groups: Vec<ItemGroup> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    pub kind: SectionKind,
    pub title: String,
    pub icon: &'static str,
    pub block: Block,
}

impl Section {
    pub fn new(kind: SectionKind, title: impl Into<String>, block: Block) -> Self {
        Self {
            kind,
            title: title.into(),
            icon: kind.icon(),
            block,
        }
    }
}

/// One report, ready to be rendered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportDocument {
    pub sections: Vec<Section>,
    pub protocol: String,
    /// `DD/MM/YYYY`
    pub generated_on: String,
    pub risk: RiskTier,
    pub offer_price: String,
}

impl ReportDocument {
    pub fn kinds(&self) -> Vec<SectionKind> {
        self.sections.iter().map(|s| s.kind).collect()
    }

    pub fn section(&self, kind: SectionKind) -> Option<&Section> {
        self.sections.iter().find(|s| s.kind == kind)
    }

    /// Number of gallery images that will be rendered.
    pub fn gallery_len(&self) -> usize {
        match self.section(SectionKind::Images).map(|s| &s.block) {
            Some(Block::Gallery(g)) => g.images.len(),
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn risk_tier_mapping() {
        assert_eq!(RiskTier::from_conclusion("no collision evidence"), RiskTier::Low);
        assert_eq!(RiskTier::from_conclusion("cosmetic repair"), RiskTier::Low);
        assert_eq!(RiskTier::from_conclusion("significant impact"), RiskTier::High);
        assert_eq!(RiskTier::from_conclusion("structure compromised"), RiskTier::High);
        assert_eq!(RiskTier::from_conclusion("something else"), RiskTier::Medium);
        assert_eq!(RiskTier::from_conclusion(""), RiskTier::Medium);
    }

    #[test]
    fn risk_tier_ignores_case_and_padding() {
        assert_eq!(RiskTier::from_conclusion("  Cosmetic Repair "), RiskTier::Low);
        assert_eq!(RiskTier::from_conclusion("STRUCTURE COMPROMISED"), RiskTier::High);
    }

    #[test]
    fn canonical_order_is_sorted() {
        let mut sorted = SectionKind::CANONICAL_ORDER;
        sorted.sort();
        assert_eq!(sorted, SectionKind::CANONICAL_ORDER);
    }

    #[test]
    fn data_uri_encoding() {
        let img = InlineImage::new("image/png", vec![1, 2, 3]);
        assert_eq!(img.to_data_uri(), "data:image/png;base64,AQID");
    }

    #[test]
    fn inline_image_serialises_without_payload() {
        let img = InlineImage::new("image/jpeg", vec![0; 2048]);
        let json = serde_json::to_string(&img).unwrap();
        assert_eq!(json, r#"{"mime_type":"image/jpeg","size_bytes":2048}"#);
    }
}
