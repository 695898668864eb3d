//! Default configuration values
//!
//! Every serde default for [`AnalysisConfig`](super::AnalysisConfig) lives
//! here so a partial TOML file overrides exactly the keys it names and
//! nothing else. Values match the process engineering baselines the yield
//! model was calibrated against.

use super::{ImprovementShares, OracleConfig, ParamRange, ParamTriple, SafeRanges};

/// Optimal process centers: 200 °C, 45 s etch, 50 mJ/cm² dose.
pub fn optimal_centers() -> ParamTriple {
    ParamTriple {
        temperature: 200.0,
        etch_time: 45.0,
        exposure_dose: 50.0,
    }
}

/// Yield penalty per unit of relative deviation from the optimal center.
pub fn deviation_weights() -> ParamTriple {
    ParamTriple {
        temperature: 10.0,
        etch_time: 8.0,
        exposure_dose: 12.0,
    }
}

/// Proximity bonus weights used by the optimizer's fast proxy model.
pub fn proxy_weights() -> ParamTriple {
    ParamTriple {
        temperature: 3.0,
        etch_time: 2.5,
        exposure_dose: 4.0,
    }
}

/// Half-widths of the local search interval around the current operating
/// point.
pub fn search_radii() -> ParamTriple {
    ParamTriple {
        temperature: 5.0,
        etch_time: 3.0,
        exposure_dose: 2.0,
    }
}

/// Minimum |delta| before a parameter change is worth recommending.
pub fn materiality_thresholds() -> ParamTriple {
    ParamTriple {
        temperature: 0.5,
        etch_time: 0.3,
        exposure_dose: 0.2,
    }
}

/// Manufacturing-safe operating windows. Points outside these are rejected
/// by the grid search, not penalized.
pub fn safe_ranges() -> SafeRanges {
    SafeRanges {
        temperature: ParamRange {
            min: 195.0,
            max: 205.0,
        },
        etch_time: ParamRange {
            min: 42.0,
            max: 48.0,
        },
        exposure_dose: ParamRange {
            min: 48.0,
            max: 52.0,
        },
    }
}

/// Fixed attribution of the optimization improvement across the three
/// primary recommendations plus the review share.
pub fn improvement_shares() -> ImprovementShares {
    ImprovementShares {
        temperature: 0.30,
        etch_time: 0.25,
        exposure_dose: 0.45,
        review: 0.10,
    }
}

/// Grid search point budget (3×3×3 by default).
pub const fn grid_points() -> usize {
    27
}

pub fn oracle() -> OracleConfig {
    OracleConfig {
        endpoint: None,
        api_token: None,
        timeout_secs: default_oracle_timeout_secs(),
    }
}

pub const fn default_oracle_timeout_secs() -> u64 {
    30
}

/// Sensitivity analysis perturbation steps: +1.0 °C, +0.5 s, +0.5 mJ/cm².
pub fn sensitivity_steps() -> ParamTriple {
    ParamTriple {
        temperature: 1.0,
        etch_time: 0.5,
        exposure_dose: 0.5,
    }
}
