//! Analysis output types: yield estimate, optimization result,
//! recommendations, and the terminal aggregate

use super::ProcessParameters;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Yield estimate for one wafer under a candidate parameter set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YieldEstimate {
    /// Predicted die yield percentage (0–100)
    pub predicted_yield: f64,
    /// Estimator confidence (0–1)
    pub confidence: f64,
    /// Factor strings in discovery order, non-unique
    pub factors: Vec<String>,
}

/// Outcome of the bounded parameter search.
///
/// `optimized_yield >= current_yield` by construction — the search only
/// accepts strictly improving candidates and starts from the input point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResult {
    pub current_yield: f64,
    pub optimized_yield: f64,
    pub recommended_parameters: ProcessParameters,
    /// (optimized − current) / current × 100; 0 when current_yield ≤ 0
    pub improvement_percentage: f64,
}

/// Action verb attached to a recommendation.
///
/// Temperature and etch time use `Adjust`/`Reduce`; exposure dose uses
/// `Increase`/`Reduce`. The asymmetric vocabulary is intentional and
/// matches operator phrasing on the floor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationAction {
    Adjust,
    Reduce,
    Increase,
    Review,
}

impl std::fmt::Display for RecommendationAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Adjust => write!(f, "adjust"),
            Self::Reduce => write!(f, "reduce"),
            Self::Increase => write!(f, "increase"),
            Self::Review => write!(f, "review"),
        }
    }
}

/// One human-actionable change, attributed a share of the expected
/// improvement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub action: RecommendationAction,
    /// Target parameter name ("temperature", "etch_time", "exposure_dose",
    /// or "process" for review items)
    pub parameter: String,
    pub current_value: f64,
    pub recommended_value: f64,
    /// Attributed share of the optimization improvement percentage
    pub improvement: f64,
    pub description: String,
}

/// Per-parameter absolute yield delta from a small fixed perturbation.
///
/// Diagnostic output only; not consumed by the main search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityReport {
    pub temperature: f64,
    pub etch_time: f64,
    pub exposure_dose: f64,
}

/// Terminal aggregate returned to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub estimate: YieldEstimate,
    pub optimization: OptimizationResult,
    pub recommendations: Vec<Recommendation>,
    pub current_parameters: ProcessParameters,
    pub timestamp: DateTime<Utc>,
}
