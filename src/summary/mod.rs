//! Telemetry Summarizer
//!
//! Deterministic, rule-based extraction of wafer telemetry into a
//! [`TelemetrySummary`] with a scalar data-quality score. This stage never
//! fails: absent data groups degrade the quality score and are reported via
//! per-group status instead of raising.
//!
//! # Quality Score
//!
//! The score starts at 1.0 and is reduced by:
//! - missing wafer map: −0.3
//! - missing metrology: −0.3
//! - missing process logs: −0.2
//! - classified log errors: −0.05 each, capped at −0.2 total
//!
//! Floor is 0.0. With all three groups present and zero log errors the
//! score is exactly 1.0; with all three absent it is exactly 0.0.

use crate::types::{GroupSummary, LogAnalysis, TelemetrySummary, WaferTelemetry};

/// Quality deduction for a missing wafer map.
const MISSING_WAFER_MAP_PENALTY: f64 = 0.3;

/// Quality deduction for missing metrology.
const MISSING_METROLOGY_PENALTY: f64 = 0.3;

/// Quality deduction for missing process logs.
const MISSING_LOGS_PENALTY: f64 = 0.2;

/// Quality deduction per classified log error.
const LOG_ERROR_PENALTY: f64 = 0.05;

/// Cap on the cumulative log-error deduction.
const LOG_ERROR_PENALTY_CAP: f64 = 0.2;

/// Number of error/warning lines retained verbatim in the summary.
const DETAIL_LINES: usize = 5;

/// Summarize raw wafer telemetry into per-group status plus a quality
/// score. Pure function of its input.
pub fn summarize(telemetry: &WaferTelemetry) -> TelemetrySummary {
    let wafer_map = telemetry
        .wafer_map
        .as_ref()
        .map_or(GroupSummary::NoData, |map| GroupSummary::Success {
            data: map.clone(),
        });

    let metrology = telemetry
        .metrology
        .as_ref()
        .map_or(GroupSummary::NoData, |m| GroupSummary::Success {
            data: m.clone(),
        });

    let process_logs = match telemetry.process_logs.as_deref() {
        None | Some([]) => GroupSummary::NoData,
        Some(lines) => GroupSummary::Success {
            data: analyze_logs(lines),
        },
    };

    let quality_score = quality_score(&wafer_map, &metrology, &process_logs);

    TelemetrySummary {
        wafer_id: telemetry.wafer_id.clone(),
        wafer_map,
        metrology,
        process_logs,
        quality_score,
    }
}

/// Classify each log line into at most one bucket, priority
/// error > warning > key event. Unclassified lines are dropped from the
/// counts (they still contribute to `total_lines`).
fn analyze_logs(lines: &[String]) -> LogAnalysis {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();
    let mut key_events: usize = 0;

    for line in lines {
        let lower = line.to_lowercase();
        if lower.contains("error") {
            errors.push(line.clone());
        } else if lower.contains("warning") {
            warnings.push(line.clone());
        } else if ["complete", "success", "finished"]
            .iter()
            .any(|keyword| lower.contains(keyword))
        {
            key_events += 1;
        }
    }

    let mut error_details = errors;
    let mut warning_details = warnings;
    let error_count = error_details.len();
    let warning_count = warning_details.len();
    error_details.truncate(DETAIL_LINES);
    warning_details.truncate(DETAIL_LINES);

    LogAnalysis {
        total_lines: lines.len(),
        errors: error_count,
        warnings: warning_count,
        key_events,
        error_details,
        warning_details,
    }
}

/// Compute the data-quality score from the three group statuses.
fn quality_score<A, B>(
    wafer_map: &GroupSummary<A>,
    metrology: &GroupSummary<B>,
    process_logs: &GroupSummary<LogAnalysis>,
) -> f64 {
    let mut score = 1.0;

    if !wafer_map.is_success() {
        score -= MISSING_WAFER_MAP_PENALTY;
    }
    if !metrology.is_success() {
        score -= MISSING_METROLOGY_PENALTY;
    }
    match process_logs.data() {
        None => score -= MISSING_LOGS_PENALTY,
        Some(logs) => {
            #[allow(clippy::cast_precision_loss)]
            let error_penalty = (logs.errors as f64 * LOG_ERROR_PENALTY).min(LOG_ERROR_PENALTY_CAP);
            score -= error_penalty;
        }
    }

    score.max(0.0)
}
