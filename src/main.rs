//! Fabsight CLI — wafer yield analysis from the command line
//!
//! # Usage
//!
//! ```bash
//! # Analyze a generated sample wafer
//! fabsight --sample
//!
//! # Analyze a JSON record (structured or flat export)
//! fabsight --input lot42.json
//!
//! # Override the operating point and emit JSON
//! fabsight --sample --temperature 199.0 --output json
//!
//! # Enable the delegated yield oracle
//! fabsight --sample --oracle-endpoint https://inference.example/v1/generate
//! ```
//!
//! # Environment Variables
//!
//! - `FABSIGHT_CONFIG`: path to a TOML config file
//! - `FABSIGHT_ORACLE_ENDPOINT` / `FABSIGHT_ORACLE_TOKEN`: delegated oracle
//! - `RUST_LOG`: logging level (default: info)

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use fabsight::dataset::{self, SampleRecord};
use fabsight::{
    format_summary, AnalysisConfig, AnalysisPipeline, AnalysisResult, HttpTextGenerator,
    ProcessParameters, TextGenerator,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "fabsight")]
#[command(about = "Wafer yield analysis and process parameter optimization")]
#[command(version)]
struct CliArgs {
    /// Path to a JSON sample record (telemetry + parameters)
    #[arg(long, value_name = "FILE", conflicts_with = "sample")]
    input: Option<PathBuf>,

    /// Generate a randomized sample wafer instead of reading a file
    #[arg(long)]
    sample: bool,

    /// Wafer identifier for generated samples
    #[arg(long, default_value = "WAFER-DEMO")]
    wafer_id: String,

    /// Override the process temperature (°C)
    #[arg(long)]
    temperature: Option<f64>,

    /// Override the etch time (s)
    #[arg(long)]
    etch_time: Option<f64>,

    /// Override the exposure dose (mJ/cm²)
    #[arg(long)]
    exposure_dose: Option<f64>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,

    /// Path to a TOML config file (overrides the search order)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Hosted inference endpoint enabling the delegated estimator
    #[arg(long, env = "FABSIGHT_ORACLE_ENDPOINT")]
    oracle_endpoint: Option<String>,

    /// Bearer token for the oracle endpoint
    #[arg(long, env = "FABSIGHT_ORACLE_TOKEN", hide_env_values = true)]
    oracle_token: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = CliArgs::parse();

    let config = match &args.config {
        Some(path) => AnalysisConfig::load_from_path(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => AnalysisConfig::load().context("loading configuration")?,
    };
    let config = Arc::new(config);

    let record = load_input(&args)?;
    let parameters = apply_overrides(record.parameters, &args);

    let pipeline = build_pipeline(Arc::clone(&config), &args).await?;

    info!(
        wafer_id = %record.telemetry.wafer_id,
        delegated = pipeline.is_delegated(),
        "Starting analysis"
    );

    let result = pipeline
        .analyze(&record.telemetry, &parameters)
        .await
        .context("analysis failed")?;

    match args.output {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&result).context("serializing result")?
            );
        }
        OutputFormat::Text => {
            print_text_report(&record, &result, &pipeline);
        }
    }

    Ok(())
}

/// Resolve the input record: explicit file, or a generated sample.
fn load_input(args: &CliArgs) -> Result<SampleRecord> {
    match &args.input {
        Some(path) => dataset::load_record(path)
            .with_context(|| format!("loading record from {}", path.display())),
        None => Ok(dataset::generate_sample(args.wafer_id.clone())),
    }
}

fn apply_overrides(mut parameters: ProcessParameters, args: &CliArgs) -> ProcessParameters {
    if let Some(temperature) = args.temperature {
        parameters.temperature = temperature;
    }
    if let Some(etch_time) = args.etch_time {
        parameters.etch_time = etch_time;
    }
    if let Some(exposure_dose) = args.exposure_dose {
        parameters.exposure_dose = exposure_dose;
    }
    parameters
}

async fn build_pipeline(config: Arc<AnalysisConfig>, args: &CliArgs) -> Result<AnalysisPipeline> {
    // CLI flags beat the config file for the oracle settings
    let endpoint = args
        .oracle_endpoint
        .clone()
        .or_else(|| config.oracle.endpoint.clone());
    let token = args
        .oracle_token
        .clone()
        .or_else(|| config.oracle.api_token.clone());

    let Some(endpoint) = endpoint else {
        return Ok(AnalysisPipeline::new(config));
    };

    let oracle: Arc<dyn TextGenerator> = Arc::new(
        HttpTextGenerator::new(
            endpoint,
            token,
            Duration::from_secs(config.oracle.timeout_secs),
        )
        .context("constructing oracle client")?,
    );
    Ok(AnalysisPipeline::with_oracle(config, oracle).await)
}

fn print_text_report(record: &SampleRecord, result: &AnalysisResult, pipeline: &AnalysisPipeline) {
    let opt = &result.optimization;
    let rec = &opt.recommended_parameters;
    let cur = &result.current_parameters;

    println!("Wafer {}", record.telemetry.wafer_id);
    println!(
        "  Predicted yield: {:.2}% (confidence {:.0}%)",
        result.estimate.predicted_yield,
        result.estimate.confidence * 100.0
    );
    for factor in &result.estimate.factors {
        println!("    - {factor}");
    }

    println!(
        "  Optimization: {:.2}% → {:.2}% ({:+.2}%)",
        opt.current_yield, opt.optimized_yield, opt.improvement_percentage
    );
    println!(
        "    temperature {:.2} → {:.2} °C, etch {:.2} → {:.2} s, dose {:.2} → {:.2} mJ/cm²",
        cur.temperature,
        rec.temperature,
        cur.etch_time,
        rec.etch_time,
        cur.exposure_dose,
        rec.exposure_dose
    );

    let sensitivity = pipeline.parameter_sensitivity(cur);
    println!(
        "  Sensitivity (Δyield per step): temperature {:.4}, etch {:.4}, dose {:.4}",
        sensitivity.temperature, sensitivity.etch_time, sensitivity.exposure_dose
    );

    println!("  Recommendations:");
    for item in &result.recommendations {
        println!(
            "    [{}] {} — attributed improvement {:.2}%",
            item.action, item.description, item.improvement
        );
    }
    println!();
    println!("{}", format_summary(&result.recommendations));
}
