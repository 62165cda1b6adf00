//! Input records handed over by the form/analysis layer.
//!
//! These are read-only for the duration of one report: the pipeline borrows
//! them, never mutates them, and keeps nothing once the call returns.

use serde::{Deserialize, Serialize};

/// Identity and market data of the inspected vehicle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleRecord {
    pub brand: String,
    pub model: String,
    pub model_year: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fuel_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chassis_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub municipality: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legal_status: Option<String>,
    /// Locale-formatted currency, e.g. `R$ 80.000,00`.
    pub reference_price: String,
    pub reference_code: String,
    pub plate: String,
}

/// Finding for one inspected component.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentFinding {
    pub name: String,
    pub condition: String,
    pub conclusion: String,
}

/// Overall conclusion of the analysis.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Synthesis {
    pub summary: String,
    pub repaint_locations: String,
    pub filler_locations: String,
    pub alignment_status: String,
    pub glass_lamp_replacement: String,
    pub lower_structure_status: String,
    pub structure_ok: bool,
    /// Drives the risk tier; see [`crate::document::RiskTier::from_conclusion`].
    pub final_conclusion: String,
    #[serde(default)]
    pub pending_maintenance: Vec<String>,
}

/// Everything the analysis layer produces for one report, as read by the CLI.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InspectionInput {
    pub vehicle: VehicleRecord,
    #[serde(default)]
    pub components: Vec<ComponentFinding>,
    pub synthesis: Synthesis,
}
