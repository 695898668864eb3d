//! Analysis Configuration Module
//!
//! Every tunable of the yield model, grid search, and recommendation
//! synthesis is a field here, loaded from TOML with built-in defaults.
//! The loaded [`AnalysisConfig`] is immutable and passed into the pipeline
//! components at construction — there is no global registry and no runtime
//! mutation, so concurrent analyses share it behind an `Arc` with no
//! coordination.
//!
//! ## Loading Order
//!
//! 1. `FABSIGHT_CONFIG` environment variable (path to TOML file)
//! 2. `fabsight.toml` in the current working directory
//! 3. Built-in defaults

pub mod defaults;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// Errors raised while loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// One value per process parameter. Reused for centers, weights, radii,
/// and thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParamTriple {
    pub temperature: f64,
    pub etch_time: f64,
    pub exposure_dose: f64,
}

/// Closed interval bound for one parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParamRange {
    pub min: f64,
    pub max: f64,
}

impl ParamRange {
    pub fn contains(&self, value: f64) -> bool {
        self.min <= value && value <= self.max
    }
}

/// Manufacturing-safe operating windows for the three parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SafeRanges {
    pub temperature: ParamRange,
    pub etch_time: ParamRange,
    pub exposure_dose: ParamRange,
}

/// Fixed improvement attribution shares for the recommendation synthesizer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImprovementShares {
    pub temperature: f64,
    pub etch_time: f64,
    pub exposure_dose: f64,
    pub review: f64,
}

/// Delegated oracle settings. With no endpoint configured the estimator
/// runs the heuristic strategy only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OracleConfig {
    /// Hosted inference endpoint URL
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Bearer token for the endpoint, if it requires one
    #[serde(default)]
    pub api_token: Option<String>,
    /// Per-call budget; a timeout is treated like any other oracle failure
    #[serde(default = "defaults::default_oracle_timeout_secs")]
    pub timeout_secs: u64,
}

/// Root configuration for one analysis deployment.
///
/// Load with [`AnalysisConfig::load`], or use `AnalysisConfig::default()`
/// in tests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Optimal process centers the deviation model measures against
    #[serde(default = "defaults::optimal_centers")]
    pub optimal: ParamTriple,

    /// Deviation penalty weights for the heuristic estimator
    #[serde(default = "defaults::deviation_weights")]
    pub deviation_weights: ParamTriple,

    /// Proximity bonus weights for the optimizer's proxy model
    #[serde(default = "defaults::proxy_weights")]
    pub proxy_weights: ParamTriple,

    /// Local search half-widths around the current operating point
    #[serde(default = "defaults::search_radii")]
    pub search_radii: ParamTriple,

    /// Materiality thresholds for recommendation emission
    #[serde(default = "defaults::materiality_thresholds")]
    pub materiality: ParamTriple,

    /// Hard feasibility windows for the grid search
    #[serde(default = "defaults::safe_ranges")]
    pub safe_ranges: SafeRanges,

    /// Improvement attribution shares
    #[serde(default = "defaults::improvement_shares")]
    pub improvement_shares: ImprovementShares,

    /// Grid search point budget
    #[serde(default = "defaults::grid_points")]
    pub grid_points: usize,

    /// Sensitivity analysis perturbation steps
    #[serde(default = "defaults::sensitivity_steps")]
    pub sensitivity_steps: ParamTriple,

    /// Delegated oracle settings
    #[serde(default = "defaults::oracle")]
    pub oracle: OracleConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            optimal: defaults::optimal_centers(),
            deviation_weights: defaults::deviation_weights(),
            proxy_weights: defaults::proxy_weights(),
            search_radii: defaults::search_radii(),
            materiality: defaults::materiality_thresholds(),
            safe_ranges: defaults::safe_ranges(),
            improvement_shares: defaults::improvement_shares(),
            grid_points: defaults::grid_points(),
            sensitivity_steps: defaults::sensitivity_steps(),
            oracle: defaults::oracle(),
        }
    }
}

impl AnalysisConfig {
    /// Load configuration using the documented search order.
    ///
    /// Falls back to built-in defaults when no file is found. A file that
    /// exists but fails to read or parse is an error — a half-applied
    /// config is worse than none.
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(path) = std::env::var("FABSIGHT_CONFIG") {
            let path = PathBuf::from(path);
            info!(path = %path.display(), "Loading config from FABSIGHT_CONFIG");
            return Self::load_from_path(&path);
        }

        let cwd_path = Path::new("fabsight.toml");
        if cwd_path.exists() {
            info!(path = %cwd_path.display(), "Loading config from working directory");
            return Self::load_from_path(cwd_path);
        }

        info!("No config file found, using built-in defaults");
        Ok(Self::default())
    }

    /// Load and validate configuration from a specific TOML file.
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the pipeline cannot run safely with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, range) in [
            ("temperature", self.safe_ranges.temperature),
            ("etch_time", self.safe_ranges.etch_time),
            ("exposure_dose", self.safe_ranges.exposure_dose),
        ] {
            if range.min >= range.max {
                return Err(ConfigError::Invalid(format!(
                    "safe range for {name} is inverted ({} >= {})",
                    range.min, range.max
                )));
            }
        }

        for (name, triple) in [
            ("optimal", self.optimal),
            ("deviation_weights", self.deviation_weights),
            ("proxy_weights", self.proxy_weights),
            ("search_radii", self.search_radii),
            ("materiality", self.materiality),
        ] {
            for (param, value) in [
                ("temperature", triple.temperature),
                ("etch_time", triple.etch_time),
                ("exposure_dose", triple.exposure_dose),
            ] {
                if !value.is_finite() || value <= 0.0 {
                    return Err(ConfigError::Invalid(format!(
                        "{name}.{param} must be a positive finite number, got {value}"
                    )));
                }
            }
        }

        if self.grid_points == 0 {
            return Err(ConfigError::Invalid(
                "grid_points must be at least 1".to_string(),
            ));
        }

        if self.oracle.timeout_secs == 0 {
            warn!("oracle.timeout_secs is 0 — every delegated call will fall back");
        }

        Ok(())
    }
}
