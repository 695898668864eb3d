//! Shared data structures for the wafer yield analysis pipeline
//!
//! This module defines the core types threaded through the five pipeline
//! stages:
//! - Stage 1: WaferTelemetry → TelemetrySummary (quality-scored extraction)
//! - Stage 2: YieldEstimate (heuristic or delegated oracle)
//! - Stage 3: OptimizationResult (bounded grid search output)
//! - Stage 4: Recommendation list (ranked, deduplicated)
//! - Stage 5: AnalysisResult (terminal aggregate)

mod telemetry;
mod summary;
mod analysis;

pub use telemetry::*;
pub use summary::*;
pub use analysis::*;
