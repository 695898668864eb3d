//! Fabsight: Wafer Yield Analysis & Process Optimization
//!
//! Estimates manufacturing yield for a semiconductor wafer from
//! heterogeneous process telemetry, searches for process-parameter
//! adjustments that improve that yield, and converts the result into
//! ranked, human-readable recommendations.
//!
//! ## Architecture
//!
//! - **Telemetry Summarizer**: quality-scored extraction of wafer map,
//!   metrology, and process-log data
//! - **Yield Estimator**: deviation-based heuristic model, or a delegated
//!   text-generation oracle with silent heuristic fallback
//! - **Parameter Optimizer**: bounded grid search over manufacturing-safe
//!   parameter windows
//! - **Recommendation Synthesizer**: materiality-gated, impact-ranked
//!   actionable changes
//! - **Analysis Pipeline**: fixed five-stage orchestrator threading shared
//!   state through the components above

pub mod config;
pub mod dataset;
pub mod estimator;
pub mod optimizer;
pub mod oracle;
pub mod pipeline;
pub mod recommend;
pub mod summary;
pub mod types;

// Re-export configuration
pub use config::{AnalysisConfig, ConfigError};

// Re-export commonly used types
pub use types::{
    AnalysisResult, OptimizationResult, ProcessParameters, Recommendation, RecommendationAction,
    SensitivityReport, TelemetrySummary, WaferTelemetry, YieldEstimate,
};

// Re-export pipeline components
pub use estimator::YieldEstimator;
pub use optimizer::ParameterOptimizer;
pub use pipeline::{AnalysisError, AnalysisPipeline, Stage};
pub use recommend::{format_summary, RecommendationSynthesizer};
pub use summary::summarize;

// Re-export oracle contract
pub use oracle::{HttpTextGenerator, OracleError, TextGenerator};

// Re-export dataset collaborator
pub use dataset::{DatasetError, SampleCatalog, SampleRecord};
