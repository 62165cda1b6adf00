//! Document Model Builder: input records → [`ReportDocument`].
//!
//! The builder decides *what* the report says; it knows nothing about how
//! it looks. Sections are always emitted in [`SectionKind::CANONICAL_ORDER`]
//! (the image section is skipped when there are no images), and optional
//! vehicle fields produce a row only when present.

use crate::config::Branding;
use crate::document::model::{
    Block, Field, Gallery, GalleryImage, InlineImage, ItemGroup, ReportDocument, RiskTier, Section,
    SectionKind,
};
use crate::record::{ComponentFinding, Synthesis, VehicleRecord};
use crate::valuation::{self, group_digits, CurrencyFormat};
use chrono::{DateTime, Local};

/// Most images shown in the gallery; the rest are only counted.
pub const MAX_GALLERY_IMAGES: usize = 6;

/// Everything that is not part of the inspection data itself.
#[derive(Debug, Clone)]
pub struct BuildContext<'a> {
    pub branding: &'a Branding,
    pub generated_at: DateTime<Local>,
    /// Used for the valuation when the caller gives no odometer reading.
    pub default_odometer_km: u32,
}

/// `{prefix}-{last six digits of the epoch-millisecond timestamp}`
pub fn protocol_number(prefix: &str, at: &DateTime<Local>) -> String {
    format!("{}-{:06}", prefix, at.timestamp_millis().rem_euclid(1_000_000))
}

/// "And 3 more images analyzed…" / "And 1 more image analyzed…"
pub fn overflow_note(remaining: usize) -> String {
    let noun = if remaining == 1 { "image" } else { "images" };
    format!("And {remaining} more {noun} analyzed…")
}

/// Build the report document.
///
/// `images` are already-resolved inline images in display order; only the
/// first [`MAX_GALLERY_IMAGES`] are placed in the gallery.
pub fn build_document(
    vehicle: &VehicleRecord,
    findings: &[ComponentFinding],
    synthesis: &Synthesis,
    images: Vec<InlineImage>,
    odometer_km: Option<u32>,
    ctx: &BuildContext<'_>,
) -> ReportDocument {
    let branding = ctx.branding;
    let risk = RiskTier::from_conclusion(&synthesis.final_conclusion);
    let generated_on = ctx.generated_at.format("%d/%m/%Y").to_string();
    let protocol = protocol_number(&branding.protocol_prefix, &ctx.generated_at);
    let offer_price = match valuation::valuate(
        &vehicle.reference_price,
        Some(odometer_km.unwrap_or(ctx.default_odometer_km)),
    ) {
        Some(v) => v.formatted_offer(&CurrencyFormat::BRL),
        None => CurrencyFormat::BRL.format_whole(0),
    };

    let mut sections = Vec::with_capacity(SectionKind::CANONICAL_ORDER.len());

    sections.push(Section::new(
        SectionKind::Header,
        &branding.report_title,
        Block::KeyValue {
            fields: vec![
                Field::new("Date", &generated_on),
                Field::new("Analyst", &branding.analyst),
                Field::new("Protocol", &protocol),
            ],
        },
    ));

    sections.push(Section::new(
        SectionKind::Vehicle,
        "Evaluated Vehicle",
        Block::KeyValue {
            fields: vehicle_fields(vehicle, odometer_km, &offer_price),
        },
    ));

    if !images.is_empty() {
        sections.push(Section::new(
            SectionKind::Images,
            "Vehicle Images",
            Block::Gallery(gallery(images)),
        ));
    }

    sections.push(Section::new(
        SectionKind::Technical,
        "Technical Results",
        Block::KeyValue {
            fields: technical_fields(synthesis),
        },
    ));

    sections.push(Section::new(
        SectionKind::Conclusion,
        "Technical Conclusion",
        Block::Paragraph {
            heading: Some("Analysis summary".into()),
            text: synthesis.summary.clone(),
        },
    ));

    sections.push(Section::new(
        SectionKind::Risk,
        "Risk Classification",
        Block::RiskBanner {
            tier: risk,
            text: format!("RISK CLASSIFICATION: {}", risk.label()),
        },
    ));

    sections.push(Section::new(
        SectionKind::Observations,
        "Final Observations",
        Block::ItemList {
            groups: observation_groups(findings, synthesis, branding),
        },
    ));

    sections.push(Section::new(
        SectionKind::Footer,
        &branding.company,
        Block::Paragraph {
            heading: None,
            text: format!(
                "{} – {}\n{} | {}",
                branding.company, branding.tagline, branding.website, branding.email
            ),
        },
    ));

    ReportDocument {
        sections,
        protocol,
        generated_on,
        risk,
        offer_price,
    }
}

fn vehicle_fields(
    vehicle: &VehicleRecord,
    odometer_km: Option<u32>,
    offer_price: &str,
) -> Vec<Field> {
    let mut fields = vec![
        Field::new("Model", &vehicle.model),
        Field::new("Brand", &vehicle.brand),
        Field::new("Model year", vehicle.model_year.to_string()),
    ];

    let optional = [
        ("Color", &vehicle.color),
        ("Fuel", &vehicle.fuel_type),
        ("Chassis", &vehicle.chassis_id),
    ];
    fields.extend(
        optional
            .into_iter()
            .filter_map(|(label, value)| present(value).map(|v| Field::new(label, v))),
    );
    if let (Some(city), Some(region)) = (present(&vehicle.municipality), present(&vehicle.region)) {
        fields.push(Field::new("Municipality/Region", format!("{city}/{region}")));
    }
    if let Some(status) = present(&vehicle.legal_status) {
        fields.push(Field::new("Legal status", status));
    }

    fields.push(Field::new("Reference price", &vehicle.reference_price));
    fields.push(Field::new("Reference code", &vehicle.reference_code));
    if let Some(km) = odometer_km {
        fields.push(Field::new("Odometer", format!("{} km", group_digits(km.into(), '.'))));
    }
    fields.push(Field::new("Express offer", offer_price));
    fields
}

/// Treat blank strings like missing ones.
fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn gallery(images: Vec<InlineImage>) -> Gallery {
    let remaining = images.len().saturating_sub(MAX_GALLERY_IMAGES);
    let images = images
        .into_iter()
        .take(MAX_GALLERY_IMAGES)
        .enumerate()
        .map(|(i, image)| GalleryImage {
            caption: format!("Image {}", i + 1),
            image,
        })
        .collect();
    Gallery {
        images,
        overflow_note: (remaining > 0).then(|| overflow_note(remaining)),
    }
}

fn technical_fields(s: &Synthesis) -> Vec<Field> {
    vec![
        Field::new("Repaint detected in", &s.repaint_locations),
        Field::new("Body filler visible in", &s.filler_locations),
        Field::new("Alignment compromised", &s.alignment_status),
        Field::new("Glass/lamps replaced", &s.glass_lamp_replacement),
        Field::new("Lower structure", &s.lower_structure_status),
        Field::new(
            "Structural integrity",
            if s.structure_ok { "Intact" } else { "Compromised" },
        ),
    ]
}

fn observation_groups(
    findings: &[ComponentFinding],
    s: &Synthesis,
    branding: &Branding,
) -> Vec<ItemGroup> {
    let mut groups = Vec::new();
    if !findings.is_empty() {
        groups.push(ItemGroup {
            heading: Some("Analyzed components".into()),
            items: findings
                .iter()
                .map(|f| format!("{}: {} - {}", f.name, f.condition, f.conclusion))
                .collect(),
        });
    }
    if !s.pending_maintenance.is_empty() {
        groups.push(ItemGroup {
            heading: Some("Pending maintenance".into()),
            items: s.pending_maintenance.clone(),
        });
    }
    groups.push(ItemGroup {
        heading: None,
        items: vec![
            "This technical report was generated from images and/or a description of the vehicle."
                .into(),
            format!(
                "Report automated by {} following the standard technical protocol.",
                branding.analyst
            ),
        ],
    });
    groups
}
