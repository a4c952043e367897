//! flybeta-predict library interface
//!
//! Flight delay prediction pipeline: flights are joined with the nearest airport
//! weather observations, scored through a two-stage remote cascade under
//! bounded concurrency, and published as one message per flight.

pub mod config;
pub mod error;
pub mod features;
pub mod io;
pub mod join;
pub mod models;
pub mod services;
pub mod utils;

pub use crate::config::{CliOverrides, PipelineSettings};
pub use crate::error::PipelineError;

use crate::features::FeatureAdapter;
use crate::io::{MessageSink, SourceReader};
use crate::join::TemporalJoiner;
use crate::services::{
    BatchPublisher, InferenceOrchestrator, RunSummary, ScoringService, WorkerPool,
};
use std::sync::Arc;
use tracing::info;

/// Wire the components described by `settings` and run them once
///
/// Reads both series, joins them, scores every joined record and publishes the
/// results. Returns the run summary; an error means the run was aborted by a
/// source or sink failure.
pub async fn run_pipeline(
    settings: &PipelineSettings,
    source: &dyn SourceReader,
    scoring: Arc<dyn ScoringService>,
    sink: &mut dyn MessageSink,
) -> Result<RunSummary, PipelineError> {
    let flights = source.read_flights().await?;
    let weather = source.read_weather().await?;

    info!(
        flights = flights.records.len(),
        flights_rejected = flights.rejected,
        flights_filtered = flights.filtered,
        observations = weather.records.len(),
        observations_rejected = weather.rejected,
        "Input series loaded"
    );

    let joiner = TemporalJoiner::new(settings.join.clone());
    let joined = joiner.join(&flights.records, &weather.records);

    let orchestrator = InferenceOrchestrator::new(
        scoring,
        FeatureAdapter::new(settings.stage1_schema.clone(), settings.missing_field_policy),
        FeatureAdapter::new(settings.stage2_schema.clone(), settings.missing_field_policy),
        settings.retry,
        WorkerPool::new(settings.concurrency),
    );
    let publisher = BatchPublisher::new(orchestrator, settings.window_size);

    publisher.run(&joined.records, sink).await
}
