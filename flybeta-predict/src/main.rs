//! Flight delay prediction runner (flybeta-predict)
//!
//! Reads flights and weather from JSON-lines files, runs the two-stage scoring
//! cascade against the scoring service and writes one prediction per flight.
//! The run summary is printed to stdout as JSON.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

use flybeta_common::config::{load_or_default, resolve_config_path};
use flybeta_common::logging::init_tracing;
use flybeta_predict::config::{CliOverrides, PipelineSettings, ENV_CONFIG, SERVICE_NAME};
use flybeta_predict::io::{JsonLinesSink, JsonLinesSource};
use flybeta_predict::services::HttpScoringClient;

/// Command-line arguments for flybeta-predict
#[derive(Parser, Debug)]
#[command(name = "flybeta-predict")]
#[command(about = "Two-stage flight delay prediction over joined flight and weather data")]
#[command(version)]
struct Args {
    /// Path to TOML config file
    #[arg(short, long, env = ENV_CONFIG)]
    config: Option<PathBuf>,

    /// Flights input (JSON lines)
    #[arg(long)]
    flights: Option<PathBuf>,

    /// Weather observations input (JSON lines)
    #[arg(long)]
    weather: Option<PathBuf>,

    /// Output file for prediction messages (JSON lines)
    #[arg(long)]
    sink: Option<PathBuf>,

    /// Scoring service base URL
    #[arg(long)]
    scoring_url: Option<String>,

    /// Maximum records scored concurrently
    #[arg(long)]
    concurrency: Option<usize>,

    /// Records per publish window
    #[arg(long)]
    window_size: Option<usize>,

    /// Also write the run summary JSON to this file
    #[arg(long)]
    summary_out: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = resolve_config_path(args.config.as_deref(), ENV_CONFIG, SERVICE_NAME);
    let toml_config = load_or_default(config_path.as_deref()).context("Failed to load config")?;

    init_tracing(&toml_config.logging).context("Failed to initialize logging")?;

    info!("Starting flybeta-predict v{}", env!("CARGO_PKG_VERSION"));
    match &config_path {
        Some(path) => info!("Config file: {}", path.display()),
        None => info!("No config file, using built-in defaults"),
    }

    let cli = CliOverrides {
        flights_path: args.flights,
        weather_path: args.weather,
        sink_path: args.sink,
        scoring_url: args.scoring_url,
        concurrency: args.concurrency,
        window_size: args.window_size,
    };
    let settings =
        PipelineSettings::resolve(&toml_config, &cli).context("Invalid pipeline settings")?;

    let source = JsonLinesSource::new(&settings.flights_path, &settings.weather_path)
        .with_filter(settings.filter.clone());
    let scoring = Arc::new(
        HttpScoringClient::new(settings.endpoints.clone())
            .context("Failed to create scoring client")?,
    );
    let mut sink = JsonLinesSink::create(&settings.sink_path, settings.topic.clone())
        .await
        .context("Failed to open sink")?;

    let summary = match flybeta_predict::run_pipeline(&settings, &source, scoring, &mut sink).await
    {
        Ok(summary) => summary,
        Err(e) => {
            error!(error = %e, "Run aborted");
            return Err(e).context("Prediction run aborted");
        }
    };

    let summary_json =
        serde_json::to_string_pretty(&summary).context("Failed to serialize run summary")?;
    println!("{}", summary_json);

    if let Some(path) = args.summary_out {
        tokio::fs::write(&path, &summary_json)
            .await
            .with_context(|| format!("Failed to write summary to {}", path.display()))?;
        info!("Summary written to {}", path.display());
    }

    Ok(())
}
