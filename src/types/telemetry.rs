//! Raw wafer telemetry input types
//!
//! Any of the three data groups (wafer map, metrology, process logs) may be
//! absent — missing groups degrade the quality score in the summarizer
//! rather than failing the analysis.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-wafer telemetry bundle as received from the fab data plane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaferTelemetry {
    /// Wafer identifier (lot + slot convention is up to the caller)
    pub wafer_id: String,

    /// Per-die pass/fail and defect spatial layout
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wafer_map: Option<WaferMap>,

    /// Dimensional and thickness measurements
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrology: Option<Metrology>,

    /// Free-text process/equipment log lines
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process_logs: Option<Vec<String>>,
}

impl WaferTelemetry {
    /// Telemetry with an identifier and no data groups.
    pub fn empty(wafer_id: impl Into<String>) -> Self {
        Self {
            wafer_id: wafer_id.into(),
            wafer_map: None,
            metrology: None,
            process_logs: None,
        }
    }
}

/// Wafer map summary metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaferMap {
    /// Total dies printed on the wafer
    pub total_dies: u32,
    /// Dies passing electrical test
    pub good_dies: u32,
    /// Defects per cm²
    pub defect_density: f64,
    /// Defect fraction per named zone (e.g. "center", "edge")
    #[serde(default)]
    pub spatial_distribution: BTreeMap<String, f64>,
    /// Edge exclusion ring width (mm)
    #[serde(default)]
    pub edge_exclusion_mm: f64,
}

/// Metrology measurements for one wafer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metrology {
    /// Film thickness statistics
    pub thickness: ThicknessStats,
    /// Critical dimension statistics
    pub critical_dimension: CdStats,
}

/// Film thickness statistics (µm).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThicknessStats {
    pub mean: f64,
    pub std: f64,
    /// Within-wafer uniformity fraction (0–1, higher is better)
    pub uniformity: f64,
}

/// Critical dimension statistics (µm).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CdStats {
    pub target: f64,
    pub actual: f64,
    pub variation: f64,
}

/// The three continuous process parameters under the operator's control.
///
/// Value domain is unconstrained here; manufacturing-safe ranges are
/// enforced by the optimizer's feasibility filter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProcessParameters {
    /// Process temperature (°C)
    pub temperature: f64,
    /// Etch time (s)
    pub etch_time: f64,
    /// Lithographic exposure dose (mJ/cm²)
    pub exposure_dose: f64,
}

impl ProcessParameters {
    pub const fn new(temperature: f64, etch_time: f64, exposure_dose: f64) -> Self {
        Self {
            temperature,
            etch_time,
            exposure_dose,
        }
    }
}
