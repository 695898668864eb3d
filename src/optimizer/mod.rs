//! Parameter Optimizer
//!
//! Bounded local search over the three process parameters. Builds an
//! independent interval per parameter around the current operating point,
//! discretizes it into a small grid, filters against the manufacturing-safe
//! windows, and keeps the feasible point with the highest proxy yield.
//!
//! The proxy model is deliberately cheaper than the full estimator: it
//! starts from the baseline yield and adds a proximity bonus per parameter,
//! weighted 3.0 / 2.5 / 4.0 for temperature / etch time / exposure dose.
//!
//! The search never regresses: the incumbent starts at the input point and
//! only a strictly higher proxy yield replaces it. An empty feasible set is
//! a normal outcome (the input is returned with zero improvement), not an
//! error.

use crate::config::AnalysisConfig;
use crate::types::{OptimizationResult, ProcessParameters, SensitivityReport, TelemetrySummary};
use std::sync::Arc;
use tracing::debug;

/// Fixed baseline yield used by the sensitivity analysis.
const SENSITIVITY_BASELINE_YIELD: f64 = 90.0;

/// Grid-search optimizer over the manufacturing-safe parameter windows.
#[derive(Debug, Clone)]
pub struct ParameterOptimizer {
    config: Arc<AnalysisConfig>,
}

impl ParameterOptimizer {
    pub const fn new(config: Arc<AnalysisConfig>) -> Self {
        Self { config }
    }

    /// Search for a feasible parameter set improving on the current yield.
    pub fn optimize(
        &self,
        current_parameters: &ProcessParameters,
        current_yield: f64,
        summary: &TelemetrySummary,
    ) -> OptimizationResult {
        let radii = &self.config.search_radii;
        let temp_range = search_range(current_parameters.temperature, radii.temperature);
        let etch_range = search_range(current_parameters.etch_time, radii.etch_time);
        let dose_range = search_range(current_parameters.exposure_dose, radii.exposure_dose);

        let points = self.search_points(temp_range, etch_range, dose_range);

        let mut best_parameters = *current_parameters;
        let mut best_yield = current_yield;
        let mut feasible_points: usize = 0;

        for (temperature, etch_time, exposure_dose) in points {
            if !self.within_safe_ranges(temperature, etch_time, exposure_dose) {
                continue;
            }
            feasible_points += 1;

            let candidate = ProcessParameters::new(temperature, etch_time, exposure_dose);
            let estimated = self.proxy_yield(&candidate, current_yield);

            if estimated > best_yield {
                best_yield = estimated;
                best_parameters = candidate;
            }
        }

        let improvement_percentage = if current_yield > 0.0 {
            (best_yield - current_yield) / current_yield * 100.0
        } else {
            0.0
        };

        debug!(
            wafer_id = %summary.wafer_id,
            quality_score = summary.quality_score,
            feasible_points,
            current_yield,
            optimized_yield = best_yield,
            improvement_percentage,
            "Grid search complete"
        );

        OptimizationResult {
            current_yield,
            optimized_yield: best_yield,
            recommended_parameters: best_parameters,
            improvement_percentage,
        }
    }

    /// Absolute yield delta per parameter from a small fixed perturbation
    /// against a fixed baseline. Diagnostic only.
    pub fn parameter_sensitivity(&self, parameters: &ProcessParameters) -> SensitivityReport {
        let steps = &self.config.sensitivity_steps;
        let base = self.proxy_yield(parameters, SENSITIVITY_BASELINE_YIELD);

        let temp_plus = ProcessParameters {
            temperature: parameters.temperature + steps.temperature,
            ..*parameters
        };
        let etch_plus = ProcessParameters {
            etch_time: parameters.etch_time + steps.etch_time,
            ..*parameters
        };
        let dose_plus = ProcessParameters {
            exposure_dose: parameters.exposure_dose + steps.exposure_dose,
            ..*parameters
        };

        SensitivityReport {
            temperature: (self.proxy_yield(&temp_plus, SENSITIVITY_BASELINE_YIELD) - base).abs(),
            etch_time: (self.proxy_yield(&etch_plus, SENSITIVITY_BASELINE_YIELD) - base).abs(),
            exposure_dose: (self.proxy_yield(&dose_plus, SENSITIVITY_BASELINE_YIELD) - base).abs(),
        }
    }

    /// Enumerate the sample grid: temperature outermost, dose innermost,
    /// truncated to the configured point budget in enumeration order.
    fn search_points(
        &self,
        temp_range: (f64, f64),
        etch_range: (f64, f64),
        dose_range: (f64, f64),
    ) -> Vec<(f64, f64, f64)> {
        let n_points = self.config.grid_points;
        #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let n_per_dim = (n_points as f64).cbrt().ceil() as usize;

        let temp_values = linspace(temp_range.0, temp_range.1, n_per_dim);
        let etch_values = linspace(etch_range.0, etch_range.1, n_per_dim);
        let dose_values = linspace(dose_range.0, dose_range.1, n_per_dim);

        let mut points = Vec::with_capacity(n_per_dim.pow(3));
        for &temperature in &temp_values {
            for &etch_time in &etch_values {
                for &exposure_dose in &dose_values {
                    points.push((temperature, etch_time, exposure_dose));
                }
            }
        }

        points.truncate(n_points);
        points
    }

    fn within_safe_ranges(&self, temperature: f64, etch_time: f64, exposure_dose: f64) -> bool {
        let ranges = &self.config.safe_ranges;
        ranges.temperature.contains(temperature)
            && ranges.etch_time.contains(etch_time)
            && ranges.exposure_dose.contains(exposure_dose)
    }

    /// Fast proxy yield: baseline plus weighted proximity bonuses.
    fn proxy_yield(&self, parameters: &ProcessParameters, baseline_yield: f64) -> f64 {
        let optimal = &self.config.optimal;
        let weights = &self.config.proxy_weights;

        let temp_deviation = (parameters.temperature - optimal.temperature).abs() / optimal.temperature;
        let etch_deviation = (parameters.etch_time - optimal.etch_time).abs() / optimal.etch_time;
        let dose_deviation =
            (parameters.exposure_dose - optimal.exposure_dose).abs() / optimal.exposure_dose;

        let estimated = baseline_yield
            + (1.0 - temp_deviation) * weights.temperature
            + (1.0 - etch_deviation) * weights.etch_time
            + (1.0 - dose_deviation) * weights.exposure_dose;

        estimated.clamp(0.0, 100.0)
    }
}

/// Search interval around a center value, floored at 0.
fn search_range(center: f64, radius: f64) -> (f64, f64) {
    ((center - radius).max(0.0), center + radius)
}

/// Evenly spaced samples over a closed interval, endpoints included.
fn linspace(lo: f64, hi: f64, n: usize) -> Vec<f64> {
    if n <= 1 {
        return vec![lo];
    }
    #[allow(clippy::cast_precision_loss)]
    (0..n)
        .map(|i| lo + (hi - lo) * i as f64 / (n - 1) as f64)
        .collect()
}
