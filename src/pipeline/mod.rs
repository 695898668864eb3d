//! Analysis Pipeline Orchestrator
//!
//! ## Five-Stage Linear Pipeline
//!
//! ```text
//! STAGE 1: Summarize  — telemetry → quality-scored summary
//! STAGE 2: Estimate   — summary + parameters → yield estimate
//! STAGE 3: Optimize   — bounded grid search for a better operating point
//! STAGE 4: Recommend  — ranked, deduplicated recommendation list
//! STAGE 5: Finalize   — assemble the timestamped AnalysisResult
//! ```
//!
//! Every transition is unconditional: no retries, no branching, no
//! re-entry. A shared [`AnalysisState`] record is threaded through the
//! ordered stage list; each stage reads only prior-stage fields and writes
//! only its own. An analysis either completes all five stages or aborts
//! with [`AnalysisError`] and no partial result.

use crate::config::AnalysisConfig;
use crate::estimator::YieldEstimator;
use crate::optimizer::ParameterOptimizer;
use crate::oracle::TextGenerator;
use crate::recommend::RecommendationSynthesizer;
use crate::summary::summarize;
use crate::types::{
    AnalysisResult, OptimizationResult, ProcessParameters, Recommendation, SensitivityReport,
    TelemetrySummary, WaferTelemetry, YieldEstimate,
};
use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// The only error class that propagates to the caller. Everything else in
/// the pipeline degrades (missing telemetry groups, oracle fallback,
/// infeasible search) instead of failing.
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// A process parameter is NaN or infinite
    #[error("invalid process parameters: {0}")]
    InvalidParameters(String),

    /// A stage observed state its predecessor never wrote
    #[error("pipeline invariant violated at stage {0}: prior state missing")]
    StateCorrupted(Stage),
}

/// Pipeline stage identifiers, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Summarize,
    Estimate,
    Optimize,
    Recommend,
    Finalize,
}

impl Stage {
    /// The fixed execution sequence. There are no conditional edges.
    pub const SEQUENCE: [Self; 5] = [
        Self::Summarize,
        Self::Estimate,
        Self::Optimize,
        Self::Recommend,
        Self::Finalize,
    ];
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Summarize => write!(f, "summarize"),
            Self::Estimate => write!(f, "estimate"),
            Self::Optimize => write!(f, "optimize"),
            Self::Recommend => write!(f, "recommend"),
            Self::Finalize => write!(f, "finalize"),
        }
    }
}

/// Shared state threaded through the stage sequence.
///
/// Inputs are set at construction; each stage appends exactly one field.
/// No stage may read a field written by a later stage.
#[derive(Debug, Clone)]
struct AnalysisState {
    telemetry: WaferTelemetry,
    parameters: ProcessParameters,
    summary: Option<TelemetrySummary>,
    estimate: Option<YieldEstimate>,
    optimization: Option<OptimizationResult>,
    recommendations: Option<Vec<Recommendation>>,
    result: Option<AnalysisResult>,
}

impl AnalysisState {
    fn new(telemetry: WaferTelemetry, parameters: ProcessParameters) -> Self {
        Self {
            telemetry,
            parameters,
            summary: None,
            estimate: None,
            optimization: None,
            recommendations: None,
            result: None,
        }
    }
}

/// Owns the stage components and runs the fixed sequence per request.
///
/// Safe to share behind an `Arc`: the configuration and the optional oracle
/// handle are the only cross-request state, and both are read-only after
/// construction. Concurrent analyses each own their own [`AnalysisState`].
pub struct AnalysisPipeline {
    estimator: YieldEstimator,
    optimizer: ParameterOptimizer,
    synthesizer: RecommendationSynthesizer,
}

impl AnalysisPipeline {
    /// Pipeline with the deterministic heuristic estimator.
    pub fn new(config: Arc<AnalysisConfig>) -> Self {
        Self {
            estimator: YieldEstimator::heuristic(Arc::clone(&config)),
            optimizer: ParameterOptimizer::new(Arc::clone(&config)),
            synthesizer: RecommendationSynthesizer::new(config),
        }
    }

    /// Pipeline with the delegated oracle strategy.
    ///
    /// The oracle is probed once here; a failed probe wires up the
    /// heuristic estimator instead for the process lifetime.
    pub async fn with_oracle(config: Arc<AnalysisConfig>, oracle: Arc<dyn TextGenerator>) -> Self {
        Self {
            estimator: YieldEstimator::delegated(oracle, Arc::clone(&config)).await,
            optimizer: ParameterOptimizer::new(Arc::clone(&config)),
            synthesizer: RecommendationSynthesizer::new(config),
        }
    }

    /// Whether the delegated estimation strategy survived construction.
    pub const fn is_delegated(&self) -> bool {
        self.estimator.is_delegated()
    }

    /// Run the full five-stage analysis for one wafer.
    ///
    /// Synchronous and side-effect-free apart from the optional oracle
    /// call. Returns a complete [`AnalysisResult`] or a single error with
    /// no partial state.
    pub async fn analyze(
        &self,
        telemetry: &WaferTelemetry,
        parameters: &ProcessParameters,
    ) -> Result<AnalysisResult, AnalysisError> {
        validate_parameters(parameters)?;

        let mut state = AnalysisState::new(telemetry.clone(), *parameters);

        for stage in Stage::SEQUENCE {
            self.run_stage(stage, &mut state).await?;
        }

        state.result.ok_or(AnalysisError::StateCorrupted(Stage::Finalize))
    }

    async fn run_stage(&self, stage: Stage, state: &mut AnalysisState) -> Result<(), AnalysisError> {
        match stage {
            Stage::Summarize => {
                let summary = summarize(&state.telemetry);
                info!(
                    stage = %stage,
                    wafer_id = %summary.wafer_id,
                    quality_score = summary.quality_score,
                    "Telemetry summarized"
                );
                state.summary = Some(summary);
            }
            Stage::Estimate => {
                let summary = state
                    .summary
                    .as_ref()
                    .ok_or(AnalysisError::StateCorrupted(stage))?;
                let estimate = self.estimator.estimate(summary, &state.parameters).await;
                info!(
                    stage = %stage,
                    predicted_yield = estimate.predicted_yield,
                    confidence = estimate.confidence,
                    "Yield estimated"
                );
                state.estimate = Some(estimate);
            }
            Stage::Optimize => {
                let summary = state
                    .summary
                    .as_ref()
                    .ok_or(AnalysisError::StateCorrupted(stage))?;
                let estimate = state
                    .estimate
                    .as_ref()
                    .ok_or(AnalysisError::StateCorrupted(stage))?;
                let optimization =
                    self.optimizer
                        .optimize(&state.parameters, estimate.predicted_yield, summary);
                info!(
                    stage = %stage,
                    improvement_percentage = optimization.improvement_percentage,
                    "Optimization complete"
                );
                state.optimization = Some(optimization);
            }
            Stage::Recommend => {
                let optimization = state
                    .optimization
                    .as_ref()
                    .ok_or(AnalysisError::StateCorrupted(stage))?;
                let estimate = state
                    .estimate
                    .as_ref()
                    .ok_or(AnalysisError::StateCorrupted(stage))?;
                let recommendations =
                    self.synthesizer
                        .synthesize(&state.parameters, optimization, estimate);
                info!(
                    stage = %stage,
                    count = recommendations.len(),
                    "Recommendations generated"
                );
                state.recommendations = Some(recommendations);
            }
            Stage::Finalize => {
                let estimate = state
                    .estimate
                    .clone()
                    .ok_or(AnalysisError::StateCorrupted(stage))?;
                let optimization = state
                    .optimization
                    .clone()
                    .ok_or(AnalysisError::StateCorrupted(stage))?;
                let recommendations = state
                    .recommendations
                    .clone()
                    .ok_or(AnalysisError::StateCorrupted(stage))?;
                state.result = Some(AnalysisResult {
                    estimate,
                    optimization,
                    recommendations,
                    current_parameters: state.parameters,
                    timestamp: Utc::now(),
                });
            }
        }
        Ok(())
    }

    /// Diagnostic per-parameter sensitivity passthrough.
    pub fn parameter_sensitivity(&self, parameters: &ProcessParameters) -> SensitivityReport {
        self.optimizer.parameter_sensitivity(parameters)
    }
}

/// Reject non-finite parameter values at the pipeline boundary so the
/// downstream arithmetic stays NaN-free.
fn validate_parameters(parameters: &ProcessParameters) -> Result<(), AnalysisError> {
    for (name, value) in [
        ("temperature", parameters.temperature),
        ("etch_time", parameters.etch_time),
        ("exposure_dose", parameters.exposure_dose),
    ] {
        if !value.is_finite() {
            return Err(AnalysisError::InvalidParameters(format!(
                "{name} must be finite, got {value}"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CdStats, Metrology, ThicknessStats, WaferMap};

    fn pipeline() -> AnalysisPipeline {
        AnalysisPipeline::new(Arc::new(AnalysisConfig::default()))
    }

    fn full_telemetry() -> WaferTelemetry {
        WaferTelemetry {
            wafer_id: "W-PIPE".to_string(),
            wafer_map: Some(WaferMap {
                total_dies: 500,
                good_dies: 465,
                defect_density: 0.07,
                spatial_distribution: std::collections::BTreeMap::new(),
                edge_exclusion_mm: 3.0,
            }),
            metrology: Some(Metrology {
                thickness: ThicknessStats {
                    mean: 1.2,
                    std: 0.05,
                    uniformity: 0.95,
                },
                critical_dimension: CdStats {
                    target: 0.1,
                    actual: 0.102,
                    variation: 0.003,
                },
            }),
            process_logs: Some(vec!["litho exposure complete".to_string()]),
        }
    }

    #[tokio::test]
    async fn analyze_returns_a_complete_result() {
        let result = pipeline()
            .analyze(&full_telemetry(), &ProcessParameters::new(198.5, 46.2, 51.5))
            .await
            .unwrap();

        assert!(result.estimate.predicted_yield > 0.0);
        assert!(result.optimization.optimized_yield >= result.optimization.current_yield);
        assert!(!result.recommendations.is_empty());
        assert_eq!(result.current_parameters, ProcessParameters::new(198.5, 46.2, 51.5));
    }

    #[tokio::test]
    async fn bare_telemetry_at_center_matches_known_numbers() {
        let result = pipeline()
            .analyze(
                &WaferTelemetry::empty("W-BARE"),
                &ProcessParameters::new(200.0, 45.0, 50.0),
            )
            .await
            .unwrap();

        // quality 0.2 → heuristic estimate 18.0; the center point itself is
        // the best feasible grid sample, so parameters are unchanged
        assert!((result.estimate.predicted_yield - 18.0).abs() < 1e-9);
        assert_eq!(
            result.optimization.recommended_parameters,
            result.current_parameters
        );
        // Proxy bonus at center: 3.0 + 2.5 + 4.0 on the 18.0 baseline
        assert!((result.optimization.optimized_yield - 27.5).abs() < 1e-9);
        // No parameter deltas → only the review item from the generic factor
        assert_eq!(result.recommendations.len(), 1);
        assert_eq!(result.recommendations[0].parameter, "process");
    }

    #[tokio::test]
    async fn nan_parameter_is_rejected_before_any_stage() {
        let err = pipeline()
            .analyze(
                &full_telemetry(),
                &ProcessParameters::new(f64::NAN, 45.0, 50.0),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidParameters(_)));
    }

    #[tokio::test]
    async fn infinite_parameter_is_rejected() {
        let err = pipeline()
            .analyze(
                &full_telemetry(),
                &ProcessParameters::new(200.0, f64::INFINITY, 50.0),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidParameters(_)));
    }

    #[tokio::test]
    async fn out_of_window_start_returns_input_unchanged() {
        let params = ProcessParameters::new(150.0, 45.0, 50.0);
        let result = pipeline().analyze(&full_telemetry(), &params).await.unwrap();

        assert_eq!(result.optimization.recommended_parameters, params);
        assert_eq!(result.optimization.improvement_percentage, 0.0);
    }

    #[test]
    fn stage_sequence_is_fixed() {
        assert_eq!(Stage::SEQUENCE.len(), 5);
        assert_eq!(Stage::SEQUENCE[0], Stage::Summarize);
        assert_eq!(Stage::SEQUENCE[4], Stage::Finalize);
    }
}
