//! Windowed scoring and publishing
//!
//! Joined records are cut into fixed-size windows processed strictly in order.
//! Each window is scored to completion, then one message per result is
//! published. A failed publish is counted as an error for that record and the
//! run continues; only an unavailable sink aborts the run.

use super::inference_orchestrator::InferenceOrchestrator;
use super::statistics::{RunSummary, RunTotals, WindowStats};
use crate::error::{PipelineError, SinkError};
use crate::io::MessageSink;
use crate::models::{JoinedRecord, PredictionResult};
use flybeta_common::time::{format_iso8601, now};
use std::time::Instant;
use tracing::{error, info, warn};
use uuid::Uuid;

pub const DEFAULT_WINDOW_SIZE: usize = 100;

pub struct BatchPublisher {
    orchestrator: InferenceOrchestrator,
    window_size: usize,
}

impl BatchPublisher {
    /// `window_size` is clamped to at least 1
    pub fn new(orchestrator: InferenceOrchestrator, window_size: usize) -> Self {
        Self {
            orchestrator,
            window_size: window_size.max(1),
        }
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn orchestrator(&self) -> &InferenceOrchestrator {
        &self.orchestrator
    }

    /// Score and publish every record, then flush and close the sink
    pub async fn run(
        &self,
        records: &[JoinedRecord],
        sink: &mut dyn MessageSink,
    ) -> Result<RunSummary, PipelineError> {
        let run_id = Uuid::new_v4();
        let started_at = now();
        let start_time = Instant::now();
        let window_count = records.len().div_ceil(self.window_size);

        info!(
            run_id = %run_id,
            records = records.len(),
            window_size = self.window_size,
            windows = window_count,
            concurrency = self.orchestrator.pool().capacity(),
            "Starting prediction run"
        );

        let mut totals = RunTotals::default();
        for (index, window) in records.chunks(self.window_size).enumerate() {
            let results = self.orchestrator.process_window(window).await;
            let stats = self.publish_window(index, &results, sink).await?;

            info!(
                run_id = %run_id,
                window = index + 1,
                of = window_count,
                success = stats.success,
                error = stats.error,
                "{}",
                stats.display_string()
            );
            totals.add_window(&stats);
        }

        sink.flush().await?;
        sink.close().await?;

        let finished_at = now();
        let summary = RunSummary {
            run_id,
            totals,
            elapsed_ms: start_time.elapsed().as_millis() as u64,
            started_at: format_iso8601(&started_at),
            finished_at: format_iso8601(&finished_at),
        };

        info!(
            run_id = %run_id,
            success = summary.success(),
            error = summary.error(),
            total = summary.total(),
            elapsed_ms = summary.elapsed_ms,
            high_water = self.orchestrator.pool().high_water_mark(),
            "{}",
            summary.display_string()
        );
        Ok(summary)
    }

    async fn publish_window(
        &self,
        index: usize,
        results: &[PredictionResult],
        sink: &mut dyn MessageSink,
    ) -> Result<WindowStats, PipelineError> {
        let mut stats = WindowStats::new(index);

        for result in results {
            if let Some(record_error) = &result.error {
                warn!(
                    unique_key = %result.unique_key,
                    stage = result.stage_reached.number(),
                    attempts = result.attempts,
                    error = %record_error,
                    "Record prediction failed"
                );
            }

            let message = result.to_message(format_iso8601(&now()));
            let published = match sink.publish(&result.unique_key, &message).await {
                Ok(()) => true,
                Err(err @ SinkError::Publish { .. }) => {
                    error!(unique_key = %result.unique_key, error = %err, "Publish failed");
                    false
                }
                Err(err) => return Err(err.into()),
            };

            stats.record(result, published);
        }

        Ok(stats)
    }
}
