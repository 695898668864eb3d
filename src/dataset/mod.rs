//! Sample Dataset Catalog
//!
//! Loads wafer telemetry + process parameter records from JSON files on
//! disk and synthesizes randomized sample records for demos. This is seed
//! data for the analysis pipeline only — the core has no dependency on
//! this module or its storage format.
//!
//! Two record shapes are accepted:
//!
//! **Structured** — the crate's own serialized [`SampleRecord`]:
//! `{"telemetry": {...}, "parameters": {...}}`.
//!
//! **Flat** — one object (or a list of objects, first entry used) with
//! loosely named fields, snake_case or camelCase
//! (`defect_density` / `defectDensity`, `etch_time` / `etchTime`, ...).
//! Missing fields take calibration-lot defaults so partial exports from
//! fab data tools still convert.

use crate::types::{
    CdStats, Metrology, ProcessParameters, ThicknessStats, WaferMap, WaferTelemetry,
};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Errors from catalog scanning and record loading.
#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("record {0} not found in catalog")]
    NotFound(String),

    #[error("{path} holds an empty dataset")]
    Empty { path: PathBuf },
}

/// One analyzable input: telemetry plus the current operating point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleRecord {
    pub telemetry: WaferTelemetry,
    pub parameters: ProcessParameters,
}

/// Directory-backed catalog of JSON sample records.
pub struct SampleCatalog {
    dir: PathBuf,
}

impl SampleCatalog {
    /// Open a catalog over a directory of `*.json` record files.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, DatasetError> {
        let dir = dir.into();
        // Surface an unreadable directory now rather than on first list()
        std::fs::read_dir(&dir).map_err(|source| DatasetError::Io {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir })
    }

    /// Record names (file stems) available in the catalog, sorted.
    pub fn list(&self) -> Result<Vec<String>, DatasetError> {
        let entries = std::fs::read_dir(&self.dir).map_err(|source| DatasetError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| DatasetError::Io {
                path: self.dir.clone(),
                source,
            })?;
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    /// Load one record by catalog name.
    pub fn load(&self, name: &str) -> Result<SampleRecord, DatasetError> {
        let path = self.dir.join(format!("{name}.json"));
        if !path.exists() {
            return Err(DatasetError::NotFound(name.to_string()));
        }
        load_record(&path)
    }
}

/// Load and convert a record file, structured or flat.
pub fn load_record(path: &Path) -> Result<SampleRecord, DatasetError> {
    let contents = std::fs::read_to_string(path).map_err(|source| DatasetError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let value: Value = serde_json::from_str(&contents).map_err(|source| DatasetError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    // A list of records converts through its first entry
    let record = match &value {
        Value::Array(items) => items.first().ok_or_else(|| DatasetError::Empty {
            path: path.to_path_buf(),
        })?,
        _ => &value,
    };

    // Structured shape first; fall through to the lenient flat conversion
    if let Ok(structured) = serde_json::from_value::<SampleRecord>(record.clone()) {
        debug!(path = %path.display(), "Loaded structured sample record");
        return Ok(structured);
    }

    let fallback_id = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("WAFER");
    debug!(path = %path.display(), "Converting flat sample record");
    Ok(convert_flat_record(record, fallback_id))
}

/// Convert a flat record with loosely named fields, applying
/// calibration-lot defaults for anything missing.
fn convert_flat_record(record: &Value, fallback_id: &str) -> SampleRecord {
    let wafer_id = get_str(record, &["wafer_id", "waferId"])
        .unwrap_or_else(|| format!("WAFER_{fallback_id}"));

    let spatial_distribution = get_zone_map(record, "spatial_distribution").unwrap_or_else(|| {
        let mut zones = BTreeMap::new();
        zones.insert("center".to_string(), 0.02);
        zones.insert("edge".to_string(), 0.12);
        zones
    });

    let telemetry = WaferTelemetry {
        wafer_id,
        wafer_map: Some(WaferMap {
            total_dies: get_u32(record, &["total_dies", "totalDies"], 500),
            good_dies: get_u32(record, &["good_dies", "goodDies"], 465),
            defect_density: get_f64(record, &["defect_density", "defectDensity"], 0.07),
            spatial_distribution,
            edge_exclusion_mm: get_f64(record, &["edge_exclusion", "edgeExclusion"], 3.0),
        }),
        metrology: Some(Metrology {
            thickness: ThicknessStats {
                mean: get_f64(record, &["thickness_mean", "thicknessMean"], 1.2),
                std: get_f64(record, &["thickness_std", "thicknessStd"], 0.05),
                uniformity: get_f64(record, &["thickness_uniformity"], 0.95),
            },
            critical_dimension: CdStats {
                target: get_f64(record, &["cd_target", "cdTarget"], 0.1),
                actual: get_f64(record, &["cd_actual", "cdActual"], 0.102),
                variation: get_f64(record, &["cd_variation"], 0.003),
            },
        }),
        process_logs: get_string_list(record, &["process_logs", "eda_logs"]),
    };

    let parameters = ProcessParameters {
        temperature: get_f64(record, &["temperature", "temp"], 198.5),
        etch_time: get_f64(record, &["etch_time", "etchTime"], 46.2),
        exposure_dose: get_f64(record, &["exposure_dose", "exposureDose"], 51.5),
    };

    SampleRecord {
        telemetry,
        parameters,
    }
}

fn get_f64(record: &Value, keys: &[&str], default: f64) -> f64 {
    keys.iter()
        .find_map(|key| record.get(key).and_then(Value::as_f64))
        .unwrap_or(default)
}

fn get_u32(record: &Value, keys: &[&str], default: u32) -> u32 {
    keys.iter()
        .find_map(|key| record.get(key).and_then(Value::as_u64))
        .and_then(|v| u32::try_from(v).ok())
        .unwrap_or(default)
}

fn get_str(record: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|key| record.get(key).and_then(Value::as_str))
        .map(ToOwned::to_owned)
}

fn get_string_list(record: &Value, keys: &[&str]) -> Option<Vec<String>> {
    let list = keys
        .iter()
        .find_map(|key| record.get(key).and_then(Value::as_array))?;
    Some(
        list.iter()
            .filter_map(Value::as_str)
            .map(ToOwned::to_owned)
            .collect(),
    )
}

fn get_zone_map(record: &Value, key: &str) -> Option<BTreeMap<String, f64>> {
    let map = record.get(key)?.as_object()?;
    Some(
        map.iter()
            .filter_map(|(zone, v)| v.as_f64().map(|v| (zone.clone(), v)))
            .collect(),
    )
}

/// Build a randomized sample record in realistic fab ranges.
pub fn generate_sample(wafer_id: impl Into<String>) -> SampleRecord {
    let mut rng = rand::thread_rng();

    let total_dies: u32 = rng.gen_range(400..=600);
    let failed: u32 = rng.gen_range(10..=80);
    let defect_density = rng.gen_range(0.02..0.15);

    let mut zones = BTreeMap::new();
    zones.insert("center".to_string(), rng.gen_range(0.01..0.05));
    zones.insert("edge".to_string(), rng.gen_range(0.05..0.20));

    let mut logs = vec![
        "Deposition step complete".to_string(),
        "Litho exposure finished".to_string(),
        format!("Etch chamber {} in service", rng.gen_range(1..=4)),
    ];
    if rng.gen_bool(0.3) {
        logs.push("WARNING: gas flow drift within tolerance".to_string());
    }
    if rng.gen_bool(0.15) {
        logs.push("ERROR: transient vacuum excursion, auto-recovered".to_string());
    }

    let telemetry = WaferTelemetry {
        wafer_id: wafer_id.into(),
        wafer_map: Some(WaferMap {
            total_dies,
            good_dies: total_dies - failed,
            defect_density,
            spatial_distribution: zones,
            edge_exclusion_mm: 3.0,
        }),
        metrology: Some(Metrology {
            thickness: ThicknessStats {
                mean: rng.gen_range(1.1..1.3),
                std: rng.gen_range(0.03..0.08),
                uniformity: rng.gen_range(0.90..0.98),
            },
            critical_dimension: CdStats {
                target: 0.1,
                actual: rng.gen_range(0.098..0.104),
                variation: rng.gen_range(0.002..0.005),
            },
        }),
        process_logs: Some(logs),
    };

    let parameters = ProcessParameters {
        temperature: rng.gen_range(196.0..204.0),
        etch_time: rng.gen_range(43.0..47.0),
        exposure_dose: rng.gen_range(48.5..51.5),
    };

    SampleRecord {
        telemetry,
        parameters,
    }
}
