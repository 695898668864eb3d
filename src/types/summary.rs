//! Derived telemetry summary types produced by the summarizer stage

use super::{Metrology, WaferMap};
use serde::{Deserialize, Serialize};

/// Per-group extraction status.
///
/// Serializes as `{"status": "no_data"}` or
/// `{"status": "success", "data": ...}` so downstream consumers can key on
/// the status tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum GroupSummary<T> {
    /// Group was absent or empty in the input telemetry
    NoData,
    /// Group was present; extracted payload attached
    Success { data: T },
}

impl<T> GroupSummary<T> {
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Extracted payload, if the group was present.
    pub const fn data(&self) -> Option<&T> {
        match self {
            Self::NoData => None,
            Self::Success { data } => Some(data),
        }
    }
}

/// Classification of the free-text process log lines.
///
/// Each line lands in at most one bucket (error > warning > key event);
/// lines matching none are dropped from the counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogAnalysis {
    /// Total log lines received
    pub total_lines: usize,
    /// Lines containing "error" (case-insensitive)
    pub errors: usize,
    /// Lines containing "warning"
    pub warnings: usize,
    /// Lines containing "complete", "success", or "finished"
    pub key_events: usize,
    /// First 5 error lines, verbatim
    pub error_details: Vec<String>,
    /// First 5 warning lines, verbatim
    pub warning_details: Vec<String>,
}

/// Read-only summary of one wafer's telemetry with a scalar quality score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySummary {
    pub wafer_id: String,
    pub wafer_map: GroupSummary<WaferMap>,
    pub metrology: GroupSummary<Metrology>,
    pub process_logs: GroupSummary<LogAnalysis>,
    /// Data completeness/cleanliness weight in [0, 1]
    pub quality_score: f64,
}

impl TelemetrySummary {
    /// Classified log error count, 0 when the log group is absent.
    pub fn log_error_count(&self) -> usize {
        self.process_logs.data().map_or(0, |logs| logs.errors)
    }

    /// Wafer-map defect density, `None` when the group is absent.
    pub fn defect_density(&self) -> Option<f64> {
        self.wafer_map.data().map(|map| map.defect_density)
    }
}
