//! Yield Estimator
//!
//! Maps a telemetry summary and a candidate parameter set to a yield
//! percentage with confidence and contributing factors. Two interchangeable
//! strategies, selected at construction:
//!
//! - **Heuristic** — deterministic deviation model, always available.
//! - **Delegated** — forwards the summary to an external text-generation
//!   oracle and parses the reply. Every failure mode (unreachable at
//!   construction, call error, timeout, unparseable reply) degrades
//!   silently to the heuristic strategy; nothing propagates past this
//!   module.
//!
//! # Heuristic Model
//!
//! base = 90 × quality_score, then per-parameter penalties of
//! relative-deviation × weight (10 / 8 / 12), −2 per classified log error,
//! −5 × defect density when a wafer map is present, clamped to [0, 100].

use crate::config::AnalysisConfig;
use crate::oracle::TextGenerator;
use crate::types::{ProcessParameters, TelemetrySummary, YieldEstimate};
use regex::Regex;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Maximum achievable base yield at perfect data quality.
const BASE_YIELD: f64 = 90.0;

/// Yield points lost per classified log error.
const LOG_ERROR_YIELD_PENALTY: f64 = 2.0;

/// Yield points lost per unit of defect density.
const DEFECT_DENSITY_WEIGHT: f64 = 5.0;

/// Relative deviation above which a parameter earns a factor string.
const FACTOR_DEVIATION_THRESHOLD: f64 = 0.1;

/// Confidence granted when data quality is above [`HIGH_QUALITY_THRESHOLD`].
const HIGH_QUALITY_CONFIDENCE: f64 = 0.7;

/// Confidence granted otherwise.
const LOW_QUALITY_CONFIDENCE: f64 = 0.5;

/// Quality score boundary between the two confidence levels.
const HIGH_QUALITY_THRESHOLD: f64 = 0.7;

/// Fixed confidence attached to a successfully parsed oracle reply.
const DELEGATED_CONFIDENCE: f64 = 0.75;

fn yield_figure_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        #[allow(clippy::expect_used)]
        Regex::new(r"(\d+\.?\d*)%").expect("literal pattern compiles")
    })
}

/// Deterministic deviation-based yield model. Fail-proof given finite
/// parameters (validated at the pipeline boundary).
#[derive(Debug, Clone)]
pub struct HeuristicEstimator {
    config: Arc<AnalysisConfig>,
}

impl HeuristicEstimator {
    pub const fn new(config: Arc<AnalysisConfig>) -> Self {
        Self { config }
    }

    pub fn estimate(
        &self,
        summary: &TelemetrySummary,
        parameters: &ProcessParameters,
    ) -> YieldEstimate {
        let optimal = &self.config.optimal;
        let weights = &self.config.deviation_weights;

        let mut predicted = BASE_YIELD * summary.quality_score;
        let mut factors = Vec::new();

        let temp_deviation = (parameters.temperature - optimal.temperature).abs() / optimal.temperature;
        let etch_deviation = (parameters.etch_time - optimal.etch_time).abs() / optimal.etch_time;
        let dose_deviation =
            (parameters.exposure_dose - optimal.exposure_dose).abs() / optimal.exposure_dose;

        predicted -= temp_deviation * weights.temperature;
        predicted -= etch_deviation * weights.etch_time;
        predicted -= dose_deviation * weights.exposure_dose;

        if temp_deviation > FACTOR_DEVIATION_THRESHOLD {
            factors.push("Temperature out of optimal range".to_string());
        }
        if etch_deviation > FACTOR_DEVIATION_THRESHOLD {
            factors.push("Etch time needs adjustment".to_string());
        }
        if dose_deviation > FACTOR_DEVIATION_THRESHOLD {
            factors.push("Exposure dose optimization required".to_string());
        }

        #[allow(clippy::cast_precision_loss)]
        let error_penalty = summary.log_error_count() as f64 * LOG_ERROR_YIELD_PENALTY;
        predicted -= error_penalty;

        if let Some(defect_density) = summary.defect_density() {
            predicted -= defect_density * DEFECT_DENSITY_WEIGHT;
        }

        let predicted_yield = predicted.clamp(0.0, 100.0);
        let confidence = if summary.quality_score > HIGH_QUALITY_THRESHOLD {
            HIGH_QUALITY_CONFIDENCE
        } else {
            LOW_QUALITY_CONFIDENCE
        };

        if factors.is_empty() {
            factors.push("Standard process parameters".to_string());
        }

        debug!(
            wafer_id = %summary.wafer_id,
            predicted_yield,
            confidence,
            quality_score = summary.quality_score,
            "Heuristic yield estimate"
        );

        YieldEstimate {
            predicted_yield,
            confidence,
            factors,
        }
    }
}

/// Oracle-backed strategy wrapping the heuristic model as its fallback.
pub struct DelegatedEstimator {
    oracle: Arc<dyn TextGenerator>,
    fallback: HeuristicEstimator,
    call_budget: Duration,
}

impl DelegatedEstimator {
    pub async fn estimate(
        &self,
        summary: &TelemetrySummary,
        parameters: &ProcessParameters,
    ) -> YieldEstimate {
        let prompt = build_prompt(summary, parameters);

        let reply = match tokio::time::timeout(self.call_budget, self.oracle.generate(&prompt)).await
        {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => {
                warn!(error = %e, "Oracle call failed, falling back to heuristic estimate");
                return self.fallback.estimate(summary, parameters);
            }
            Err(_) => {
                warn!(
                    budget_secs = self.call_budget.as_secs(),
                    "Oracle call timed out, falling back to heuristic estimate"
                );
                return self.fallback.estimate(summary, parameters);
            }
        };

        match parse_oracle_reply(&reply) {
            Some(estimate) => estimate,
            None => {
                warn!("Oracle reply had no parseable yield figure, falling back to heuristic");
                self.fallback.estimate(summary, parameters)
            }
        }
    }
}

/// Yield estimation strategy, fixed at construction time.
pub enum YieldEstimator {
    Heuristic(HeuristicEstimator),
    Delegated(DelegatedEstimator),
}

impl YieldEstimator {
    /// The always-available deterministic strategy.
    pub const fn heuristic(config: Arc<AnalysisConfig>) -> Self {
        Self::Heuristic(HeuristicEstimator::new(config))
    }

    /// Probe the oracle once and wire up the delegated strategy.
    ///
    /// A failed probe degrades permanently to the heuristic strategy for
    /// the process lifetime — the oracle is never retried after
    /// construction.
    pub async fn delegated(oracle: Arc<dyn TextGenerator>, config: Arc<AnalysisConfig>) -> Self {
        let call_budget = Duration::from_secs(config.oracle.timeout_secs);
        let fallback = HeuristicEstimator::new(Arc::clone(&config));

        let probe = tokio::time::timeout(call_budget, oracle.generate("test")).await;
        match probe {
            Ok(Ok(_)) => {
                info!(backend = oracle.backend_name(), "Delegated yield oracle online");
                Self::Delegated(DelegatedEstimator {
                    oracle,
                    fallback,
                    call_budget,
                })
            }
            Ok(Err(e)) => {
                warn!(
                    backend = oracle.backend_name(),
                    error = %e,
                    "Oracle probe failed, using heuristic estimation for this process"
                );
                Self::Heuristic(fallback)
            }
            Err(_) => {
                warn!(
                    backend = oracle.backend_name(),
                    "Oracle probe timed out, using heuristic estimation for this process"
                );
                Self::Heuristic(fallback)
            }
        }
    }

    /// Estimate yield for the given summary and parameters.
    pub async fn estimate(
        &self,
        summary: &TelemetrySummary,
        parameters: &ProcessParameters,
    ) -> YieldEstimate {
        match self {
            Self::Heuristic(h) => h.estimate(summary, parameters),
            Self::Delegated(d) => d.estimate(summary, parameters).await,
        }
    }

    /// Whether the delegated strategy is active.
    pub const fn is_delegated(&self) -> bool {
        matches!(self, Self::Delegated(_))
    }
}

/// Build the free-text prompt embedding the summary and parameters.
fn build_prompt(summary: &TelemetrySummary, parameters: &ProcessParameters) -> String {
    let wafer_map = serde_json::to_string(&summary.wafer_map).unwrap_or_default();
    let metrology = serde_json::to_string(&summary.metrology).unwrap_or_default();
    let logs = serde_json::to_string(&summary.process_logs).unwrap_or_default();

    format!(
        "You are an expert semiconductor yield prediction system. Analyze the \
         provided data and predict the die yield percentage.\n\
         Consider wafer map quality and defect density, metrology measurements, \
         process parameters, and log errors.\n\n\
         Data Summary:\n\
         Wafer Map: {wafer_map}\n\
         Metrology: {metrology}\n\
         Process Logs: {logs}\n\
         Quality Score: {quality:.2}\n\n\
         Process Parameters:\n\
         Temperature: {temperature}°C\n\
         Etch Time: {etch_time}s\n\
         Exposure Dose: {exposure_dose}mJ/cm²\n\n\
         Predict the yield percentage (as a number followed by '%') and \
         explain the key factors.",
        quality = summary.quality_score,
        temperature = parameters.temperature,
        etch_time = parameters.etch_time,
        exposure_dose = parameters.exposure_dose,
    )
}

/// Parse the oracle's free-text reply into an estimate.
///
/// Returns `None` when no `<number>%` figure is present — the caller then
/// falls back to the heuristic strategy.
fn parse_oracle_reply(reply: &str) -> Option<YieldEstimate> {
    let captures = yield_figure_regex().captures(reply)?;
    let figure: f64 = captures.get(1)?.as_str().parse().ok()?;
    let predicted_yield = figure.clamp(0.0, 100.0);

    let lower = reply.to_lowercase();
    let mut factors = Vec::new();
    if lower.contains("temperature") {
        factors.push("Temperature optimization needed".to_string());
    }
    if lower.contains("etch") {
        factors.push("Etch time adjustment".to_string());
    }
    if lower.contains("exposure") {
        factors.push("Exposure dose tuning".to_string());
    }
    if factors.is_empty() {
        factors.push("Process parameter optimization".to_string());
    }

    Some(YieldEstimate {
        predicted_yield,
        confidence: DELEGATED_CONFIDENCE,
        factors,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::OracleError;
    use crate::summary::summarize;
    use crate::types::{CdStats, Metrology, ThicknessStats, WaferMap, WaferTelemetry};
    use async_trait::async_trait;

    fn config() -> Arc<AnalysisConfig> {
        Arc::new(AnalysisConfig::default())
    }

    fn full_telemetry() -> WaferTelemetry {
        WaferTelemetry {
            wafer_id: "W-100".to_string(),
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
            process_logs: Some(vec!["etch finished".to_string()]),
        }
    }

    struct CannedOracle {
        reply: String,
    }

    #[async_trait]
    impl TextGenerator for CannedOracle {
        async fn generate(&self, _prompt: &str) -> Result<String, OracleError> {
            Ok(self.reply.clone())
        }

        fn backend_name(&self) -> &'static str {
            "canned"
        }
    }

    struct FailingOracle;

    #[async_trait]
    impl TextGenerator for FailingOracle {
        async fn generate(&self, _prompt: &str) -> Result<String, OracleError> {
            Err(OracleError::Request("connection refused".to_string()))
        }

        fn backend_name(&self) -> &'static str {
            "failing"
        }
    }

    #[test]
    fn bare_telemetry_at_optimal_center_estimates_18() {
        let estimator = HeuristicEstimator::new(config());
        let summary = summarize(&WaferTelemetry::empty("W-BARE"));
        assert_eq!(summary.quality_score, 0.2);

        let params = ProcessParameters::new(200.0, 45.0, 50.0);
        let estimate = estimator.estimate(&summary, &params);

        // 90 × 0.2 with zero deviation terms
        assert!((estimate.predicted_yield - 18.0).abs() < 1e-9);
        assert_eq!(estimate.confidence, 0.5);
        assert_eq!(estimate.factors, vec!["Standard process parameters"]);
    }

    #[test]
    fn full_telemetry_scenario_is_deterministic() {
        let estimator = HeuristicEstimator::new(config());
        let summary = summarize(&full_telemetry());
        assert_eq!(summary.quality_score, 1.0);

        let params = ProcessParameters::new(198.5, 46.2, 51.5);
        let estimate = estimator.estimate(&summary, &params);

        let expected = 90.0
            - (1.5 / 200.0) * 10.0
            - (1.2 / 45.0) * 8.0
            - (1.5 / 50.0) * 12.0
            - 0.07 * 5.0;
        assert!((estimate.predicted_yield - expected).abs() < 1e-9);
        assert_eq!(estimate.confidence, 0.7);
        // All deviations below 0.1 → generic factor only
        assert_eq!(estimate.factors, vec!["Standard process parameters"]);
    }

    #[test]
    fn log_errors_cost_two_points_each() {
        let mut telemetry = full_telemetry();
        telemetry.process_logs = Some(vec![
            "ERROR chamber pressure".to_string(),
            "error vacuum loss".to_string(),
        ]);
        let summary = summarize(&telemetry);
        let estimator = HeuristicEstimator::new(config());
        let params = ProcessParameters::new(200.0, 45.0, 50.0);

        let estimate = estimator.estimate(&summary, &params);
        // quality 0.9 → base 81, minus 2×2 errors, minus 0.35 defect term
        let expected = 90.0 * 0.9 - 4.0 - 0.35;
        assert!((estimate.predicted_yield - expected).abs() < 1e-9);
    }

    #[test]
    fn large_deviations_trigger_factor_strings() {
        let estimator = HeuristicEstimator::new(config());
        let summary = summarize(&full_telemetry());
        let params = ProcessParameters::new(150.0, 55.0, 40.0);

        let estimate = estimator.estimate(&summary, &params);
        assert_eq!(
            estimate.factors,
            vec![
                "Temperature out of optimal range",
                "Etch time needs adjustment",
                "Exposure dose optimization required",
            ]
        );
    }

    #[test]
    fn confidence_boundary_is_strict() {
        let estimator = HeuristicEstimator::new(config());
        // wafer map missing → quality exactly 0.7
        let mut telemetry = full_telemetry();
        telemetry.wafer_map = None;
        let summary = summarize(&telemetry);
        assert_eq!(summary.quality_score, 0.7);

        let estimate = estimator.estimate(&summary, &ProcessParameters::new(200.0, 45.0, 50.0));
        assert_eq!(estimate.confidence, 0.5);
    }

    #[test]
    fn yield_is_clamped_to_zero() {
        let estimator = HeuristicEstimator::new(config());
        let mut telemetry = WaferTelemetry::empty("W-WORST");
        telemetry.process_logs = Some((0..30).map(|i| format!("error {i}")).collect());
        let summary = summarize(&telemetry);

        let estimate = estimator.estimate(&summary, &ProcessParameters::new(100.0, 10.0, 10.0));
        assert_eq!(estimate.predicted_yield, 0.0);
    }

    #[test]
    fn parses_oracle_reply_with_factors() {
        let estimate = parse_oracle_reply(
            "Given the temperature drift and etch variation, predicted yield is 87.5% overall.",
        )
        .unwrap();
        assert!((estimate.predicted_yield - 87.5).abs() < 1e-9);
        assert_eq!(estimate.confidence, 0.75);
        assert_eq!(
            estimate.factors,
            vec!["Temperature optimization needed", "Etch time adjustment"]
        );
    }

    #[test]
    fn oracle_reply_without_figure_is_unparseable() {
        assert!(parse_oracle_reply("the outlook is good").is_none());
        assert!(parse_oracle_reply("").is_none());
    }

    #[test]
    fn oracle_figure_is_clamped() {
        let estimate = parse_oracle_reply("yield will be 150% of plan").unwrap();
        assert_eq!(estimate.predicted_yield, 100.0);
    }

    #[test]
    fn oracle_reply_without_keywords_gets_generic_factor() {
        let estimate = parse_oracle_reply("expect 72% yield").unwrap();
        assert_eq!(estimate.factors, vec!["Process parameter optimization"]);
    }

    #[tokio::test]
    async fn delegated_uses_oracle_reply() {
        let oracle = Arc::new(CannedOracle {
            reply: "yield forecast: 91% (exposure dose near limit)".to_string(),
        });
        let estimator = YieldEstimator::delegated(oracle, config()).await;
        assert!(estimator.is_delegated());

        let summary = summarize(&full_telemetry());
        let params = ProcessParameters::new(198.5, 46.2, 51.5);
        let estimate = estimator.estimate(&summary, &params).await;

        assert!((estimate.predicted_yield - 91.0).abs() < 1e-9);
        assert_eq!(estimate.confidence, 0.75);
        assert_eq!(estimate.factors, vec!["Exposure dose tuning"]);
    }

    #[tokio::test]
    async fn unparseable_oracle_reply_falls_back_per_call() {
        let oracle = Arc::new(CannedOracle {
            reply: "no numeric figure here".to_string(),
        });
        let estimator = YieldEstimator::delegated(oracle, config()).await;
        assert!(estimator.is_delegated());

        let summary = summarize(&full_telemetry());
        let params = ProcessParameters::new(198.5, 46.2, 51.5);
        let delegated = estimator.estimate(&summary, &params).await;
        let heuristic = HeuristicEstimator::new(config()).estimate(&summary, &params);

        assert_eq!(delegated, heuristic);
    }

    #[tokio::test]
    async fn failed_probe_degrades_permanently() {
        let estimator = YieldEstimator::delegated(Arc::new(FailingOracle), config()).await;
        assert!(!estimator.is_delegated());

        let summary = summarize(&full_telemetry());
        let params = ProcessParameters::new(200.0, 45.0, 50.0);
        let estimate = estimator.estimate(&summary, &params).await;
        let heuristic = HeuristicEstimator::new(config()).estimate(&summary, &params);
        assert_eq!(estimate, heuristic);
    }
}
