//! Recommendation Synthesizer
//!
//! Converts the optimizer's chosen parameter delta and the estimator's
//! stated factors into a ranked list of human-actionable changes.
//!
//! A parameter earns a recommendation only when its delta exceeds the
//! materiality threshold for that parameter. Each emitted recommendation is
//! attributed a fixed share of the optimization improvement
//! (0.30 temperature / 0.25 etch time / 0.45 exposure dose). The primary
//! set is sorted descending by attributed improvement; up to two
//! factor-derived `review` items are appended afterwards without re-sorting,
//! skipping any whose text overlaps an existing description.

use crate::config::AnalysisConfig;
use crate::types::{
    OptimizationResult, ProcessParameters, Recommendation, RecommendationAction, YieldEstimate,
};
use std::sync::Arc;
use tracing::debug;

/// Number of estimate factors considered for `review` recommendations.
const REVIEW_FACTOR_LIMIT: usize = 2;

/// Number of recommendations rendered into the operator summary.
const SUMMARY_LIMIT: usize = 3;

/// Materiality-gated, impact-ranked recommendation builder.
#[derive(Debug, Clone)]
pub struct RecommendationSynthesizer {
    config: Arc<AnalysisConfig>,
}

impl RecommendationSynthesizer {
    pub const fn new(config: Arc<AnalysisConfig>) -> Self {
        Self { config }
    }

    /// Build the ordered recommendation list for one analysis.
    pub fn synthesize(
        &self,
        current_parameters: &ProcessParameters,
        optimization: &OptimizationResult,
        estimate: &YieldEstimate,
    ) -> Vec<Recommendation> {
        let materiality = &self.config.materiality;
        let shares = &self.config.improvement_shares;
        let recommended = &optimization.recommended_parameters;
        let mut recommendations = Vec::new();

        let temp_change = recommended.temperature - current_parameters.temperature;
        if temp_change.abs() > materiality.temperature {
            let direction = if temp_change > 0.0 {
                "Increase"
            } else {
                "Decrease"
            };
            recommendations.push(Recommendation {
                action: if temp_change > 0.0 {
                    RecommendationAction::Adjust
                } else {
                    RecommendationAction::Reduce
                },
                parameter: "temperature".to_string(),
                current_value: current_parameters.temperature,
                recommended_value: recommended.temperature,
                improvement: optimization.improvement_percentage * shares.temperature,
                description: format!(
                    "{direction} process temperature to optimize thermal conditions"
                ),
            });
        }

        let etch_change = recommended.etch_time - current_parameters.etch_time;
        if etch_change.abs() > materiality.etch_time {
            let direction = if etch_change > 0.0 {
                "Increase"
            } else {
                "Decrease"
            };
            recommendations.push(Recommendation {
                action: if etch_change > 0.0 {
                    RecommendationAction::Adjust
                } else {
                    RecommendationAction::Reduce
                },
                parameter: "etch_time".to_string(),
                current_value: current_parameters.etch_time,
                recommended_value: recommended.etch_time,
                improvement: optimization.improvement_percentage * shares.etch_time,
                description: format!("{direction} etch time to improve pattern transfer"),
            });
        }

        // Exposure dose is the highest-leverage knob and uses the
        // increase/reduce vocabulary instead of adjust/reduce.
        let dose_change = recommended.exposure_dose - current_parameters.exposure_dose;
        if dose_change.abs() > materiality.exposure_dose {
            let dose_change_pct = dose_change / current_parameters.exposure_dose * 100.0;
            let direction = if dose_change < 0.0 { "Reduce" } else { "Increase" };
            recommendations.push(Recommendation {
                action: if dose_change < 0.0 {
                    RecommendationAction::Reduce
                } else {
                    RecommendationAction::Increase
                },
                parameter: "exposure_dose".to_string(),
                current_value: current_parameters.exposure_dose,
                recommended_value: recommended.exposure_dose,
                improvement: optimization.improvement_percentage * shares.exposure_dose,
                description: format!(
                    "{direction} stepper exposure dose by {:.1}% to improve yield from {:.1}% → {:.1}%",
                    dose_change_pct.abs(),
                    optimization.current_yield,
                    optimization.optimized_yield,
                ),
            });
        }

        recommendations.sort_by(|a, b| {
            b.improvement
                .partial_cmp(&a.improvement)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        // Factor-derived review items stay appended after the sorted
        // primary set. The overlap check is best-effort, either direction.
        for factor in estimate.factors.iter().take(REVIEW_FACTOR_LIMIT) {
            let factor_lower = factor.to_lowercase();
            let overlaps = recommendations.iter().any(|rec| {
                let desc_lower = rec.description.to_lowercase();
                desc_lower.contains(&factor_lower) || factor_lower.contains(&desc_lower)
            });
            if overlaps {
                continue;
            }
            recommendations.push(Recommendation {
                action: RecommendationAction::Review,
                parameter: "process".to_string(),
                current_value: 0.0,
                recommended_value: 0.0,
                improvement: optimization.improvement_percentage * shares.review,
                description: format!("Review and address: {factor}"),
            });
        }

        debug!(
            count = recommendations.len(),
            improvement_percentage = optimization.improvement_percentage,
            "Recommendations synthesized"
        );

        recommendations
    }
}

/// Render the top recommendations as operator-readable sentences.
///
/// Exposure-dose entries show the percentage change with the before/after
/// values; everything else reads "Action parameter from X to Y."
pub fn format_summary(recommendations: &[Recommendation]) -> String {
    if recommendations.is_empty() {
        return "No specific recommendations at this time. Current parameters are near optimal."
            .to_string();
    }

    let mut parts = Vec::new();
    for rec in recommendations.iter().take(SUMMARY_LIMIT) {
        if rec.parameter == "exposure_dose"
            && matches!(
                rec.action,
                RecommendationAction::Reduce | RecommendationAction::Increase
            )
        {
            let change_pct =
                ((rec.recommended_value - rec.current_value) / rec.current_value).abs() * 100.0;
            parts.push(format!(
                "{} stepper exposure dose by {change_pct:.1}% to improve yield from {:.1} → {:.1}.",
                capitalized(rec.action),
                rec.current_value,
                rec.recommended_value,
            ));
        } else {
            parts.push(format!(
                "{} {} from {:.2} to {:.2}.",
                capitalized(rec.action),
                rec.parameter.replace('_', " "),
                rec.current_value,
                rec.recommended_value,
            ));
        }
    }

    parts.join(" ")
}

const fn capitalized(action: RecommendationAction) -> &'static str {
    match action {
        RecommendationAction::Adjust => "Adjust",
        RecommendationAction::Reduce => "Reduce",
        RecommendationAction::Increase => "Increase",
        RecommendationAction::Review => "Review",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn synthesizer() -> RecommendationSynthesizer {
        RecommendationSynthesizer::new(Arc::new(AnalysisConfig::default()))
    }

    fn estimate_with(factors: Vec<&str>) -> YieldEstimate {
        YieldEstimate {
            predicted_yield: 75.0,
            confidence: 0.7,
            factors: factors.into_iter().map(String::from).collect(),
        }
    }

    fn optimization(
        current: ProcessParameters,
        recommended: ProcessParameters,
        improvement: f64,
    ) -> OptimizationResult {
        OptimizationResult {
            current_yield: 75.0,
            optimized_yield: 75.0 * (1.0 + improvement / 100.0),
            recommended_parameters: recommended,
            improvement_percentage: improvement,
        }
    }

    #[test]
    fn material_changes_emit_ranked_recommendations() {
        let current = ProcessParameters::new(198.0, 46.5, 51.0);
        let recommended = ProcessParameters::new(200.0, 45.0, 50.0);
        let result = synthesizer().synthesize(
            &current,
            &optimization(current, recommended, 10.0),
            &estimate_with(vec![]),
        );

        assert_eq!(result.len(), 3);
        // Dose share 0.45 ranks first, then temperature 0.30, then etch 0.25
        assert_eq!(result[0].parameter, "exposure_dose");
        assert!((result[0].improvement - 4.5).abs() < 1e-9);
        assert_eq!(result[1].parameter, "temperature");
        assert!((result[1].improvement - 3.0).abs() < 1e-9);
        assert_eq!(result[2].parameter, "etch_time");
        assert!((result[2].improvement - 2.5).abs() < 1e-9);
    }

    #[test]
    fn immaterial_deltas_are_suppressed() {
        let current = ProcessParameters::new(200.0, 45.0, 50.0);
        // All deltas at or below the 0.5 / 0.3 / 0.2 thresholds
        let recommended = ProcessParameters::new(200.5, 45.3, 50.2);
        let result = synthesizer().synthesize(
            &current,
            &optimization(current, recommended, 5.0),
            &estimate_with(vec![]),
        );
        assert!(result.is_empty());
    }

    #[test]
    fn action_vocabulary_is_asymmetric() {
        let current = ProcessParameters::new(200.0, 45.0, 50.0);
        let up = ProcessParameters::new(202.0, 46.0, 51.0);
        let result = synthesizer().synthesize(
            &current,
            &optimization(current, up, 10.0),
            &estimate_with(vec![]),
        );
        let by_param = |name: &str| {
            result
                .iter()
                .find(|r| r.parameter == name)
                .map(|r| r.action)
                .unwrap()
        };
        // Increasing temperature/etch is "adjust"; increasing dose is "increase"
        assert_eq!(by_param("temperature"), RecommendationAction::Adjust);
        assert_eq!(by_param("etch_time"), RecommendationAction::Adjust);
        assert_eq!(by_param("exposure_dose"), RecommendationAction::Increase);

        let down = ProcessParameters::new(198.0, 44.0, 49.0);
        let result = synthesizer().synthesize(
            &current,
            &optimization(current, down, 10.0),
            &estimate_with(vec![]),
        );
        assert!(result
            .iter()
            .all(|r| r.action == RecommendationAction::Reduce));
    }

    #[test]
    fn dose_description_reports_percent_change_and_yields() {
        let current = ProcessParameters::new(200.0, 45.0, 50.0);
        let recommended = ProcessParameters::new(200.0, 45.0, 49.0);
        let opt = OptimizationResult {
            current_yield: 80.0,
            optimized_yield: 88.0,
            recommended_parameters: recommended,
            improvement_percentage: 10.0,
        };
        let result = synthesizer().synthesize(&current, &opt, &estimate_with(vec![]));
        assert_eq!(result.len(), 1);
        assert_eq!(
            result[0].description,
            "Reduce stepper exposure dose by 2.0% to improve yield from 80.0% → 88.0%"
        );
    }

    #[test]
    fn review_items_append_after_primary_set() {
        let current = ProcessParameters::new(198.0, 45.0, 50.0);
        let recommended = ProcessParameters::new(200.0, 45.0, 50.0);
        let result = synthesizer().synthesize(
            &current,
            &optimization(current, recommended, 10.0),
            &estimate_with(vec!["Defect density elevated near edge", "CD drift on lot"]),
        );

        assert_eq!(result.len(), 3);
        assert_eq!(result[0].parameter, "temperature");
        assert_eq!(result[1].action, RecommendationAction::Review);
        assert_eq!(
            result[1].description,
            "Review and address: Defect density elevated near edge"
        );
        assert!((result[1].improvement - 1.0).abs() < 1e-9);
        assert_eq!(result[2].action, RecommendationAction::Review);
        // Review items keep append order even though their improvement is
        // lower than the primary entries above them
        assert!(result[1].improvement < result[0].improvement);
    }

    #[test]
    fn only_first_two_factors_are_considered() {
        let current = ProcessParameters::new(200.0, 45.0, 50.0);
        let result = synthesizer().synthesize(
            &current,
            &optimization(current, current, 0.0),
            &estimate_with(vec!["factor one", "factor two", "factor three"]),
        );
        assert_eq!(result.len(), 2);
        assert!(result
            .iter()
            .all(|r| r.action == RecommendationAction::Review));
    }

    #[test]
    fn overlapping_factor_is_deduplicated() {
        let current = ProcessParameters::new(198.0, 45.0, 50.0);
        let recommended = ProcessParameters::new(200.0, 45.0, 50.0);
        // Factor text contains the full temperature description
        let factor = "SPC flagged: increase process temperature to optimize thermal conditions";
        let result = synthesizer().synthesize(
            &current,
            &optimization(current, recommended, 10.0),
            &estimate_with(vec![factor, "Unrelated chamber drift"]),
        );

        assert_eq!(result.len(), 2);
        assert_eq!(result[0].parameter, "temperature");
        assert_eq!(
            result[1].description,
            "Review and address: Unrelated chamber drift"
        );
    }

    #[test]
    fn summary_renders_top_three() {
        let current = ProcessParameters::new(198.0, 46.5, 51.0);
        let recommended = ProcessParameters::new(200.0, 45.0, 50.0);
        let recs = synthesizer().synthesize(
            &current,
            &optimization(current, recommended, 10.0),
            &estimate_with(vec!["Chamber drift"]),
        );
        assert_eq!(recs.len(), 4);

        let summary = format_summary(&recs);
        // Only the top three render; the review item is cut
        assert!(summary.starts_with("Reduce stepper exposure dose by 2.0%"));
        assert!(summary.contains("Adjust temperature from 198.00 to 200.00."));
        assert!(summary.contains("Reduce etch time from 46.50 to 45.00."));
        assert!(!summary.contains("Chamber drift"));
    }

    #[test]
    fn empty_summary_has_fixed_wording() {
        assert_eq!(
            format_summary(&[]),
            "No specific recommendations at this time. Current parameters are near optimal."
        );
    }
}
