//! Two-stage scoring cascade
//!
//! Each joined record runs through its own state machine:
//!
//! ```text
//! INIT → STAGE1_CALLING → STAGE1_FAILED
//!                       → STAGE1_LOW_RISK_DONE
//!                       → STAGE1_HIGH_RISK → STAGE2_CALLING → STAGE2_FAILED
//!                                                           → STAGE2_DONE
//! ```
//!
//! Records of a window run concurrently, admitted through the [`WorkerPool`].
//! Every record ends in a terminal state with a [`PredictionResult`]; failures
//! are captured on the result and never propagate to sibling records.

use super::scoring_client::{ScoringRequest, ScoringService, StageOutcome};
use super::worker_pool::WorkerPool;
use crate::error::ScoringError;
use crate::features::{FeatureAdapter, FeatureRow};
use crate::models::{
    DelayLabel, JoinedRecord, PredictionResult, RecordError, RecordErrorKind, RecordState, Stage,
};
use crate::utils::retry::{retry_transient, RetryPolicy};
use futures::future::join_all;
use serde_json::{json, Value};
use std::sync::Arc;

pub struct InferenceOrchestrator {
    scoring: Arc<dyn ScoringService>,
    stage1: FeatureAdapter,
    stage2: FeatureAdapter,
    retry: RetryPolicy,
    pool: WorkerPool,
}

impl InferenceOrchestrator {
    pub fn new(
        scoring: Arc<dyn ScoringService>,
        stage1: FeatureAdapter,
        stage2: FeatureAdapter,
        retry: RetryPolicy,
        pool: WorkerPool,
    ) -> Self {
        Self {
            scoring,
            stage1,
            stage2,
            retry,
            pool,
        }
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Score every record of a window; one result per input record
    pub async fn process_window(&self, records: &[JoinedRecord]) -> Vec<PredictionResult> {
        let tasks = records
            .iter()
            .map(|record| self.pool.run(self.process_record(record)));
        join_all(tasks).await
    }

    /// Run one record through the cascade to a terminal state
    pub async fn process_record(&self, record: &JoinedRecord) -> PredictionResult {
        let mut run = RecordRun::new(record.unique_key());
        let row = FeatureRow::from_joined(record);

        run.transition(RecordState::Stage1Calling);
        let stage1 = match self.call_stage(&mut run, &self.stage1, &row).await {
            Ok(outcome) => outcome,
            Err(error) => {
                run.stage1_raw = Some(error_raw(&error));
                run.transition(RecordState::Stage1Failed);
                return run.fail(Stage::One, error);
            }
        };
        run.stage1_raw = Some(stage1.raw);

        if stage1.prediction == 0 {
            run.transition(RecordState::Stage1LowRiskDone);
            return run.finish(Stage::One, DelayLabel::OnTime);
        }

        run.transition(RecordState::Stage1HighRisk);
        run.transition(RecordState::Stage2Calling);
        match self.call_stage(&mut run, &self.stage2, &row).await {
            Ok(stage2) => {
                let label = DelayLabel::from_stage2(stage2.prediction);
                run.stage2_raw = Some(stage2.raw);
                run.transition(RecordState::Stage2Done);
                run.finish(Stage::Two, label)
            }
            Err(error) => {
                run.stage2_raw = Some(error_raw(&error));
                run.transition(RecordState::Stage2Failed);
                run.fail(Stage::Two, error)
            }
        }
    }

    /// Vectorize and call one stage under the retry policy
    async fn call_stage(
        &self,
        run: &mut RecordRun,
        adapter: &FeatureAdapter,
        row: &FeatureRow,
    ) -> Result<StageOutcome, RecordError> {
        let stage = adapter.schema().stage();

        let features = adapter
            .vectorize(row, &run.unique_key)
            .map_err(|e| RecordError {
                kind: RecordErrorKind::FeatureSchema,
                stage,
                detail: e.to_string(),
            })?;
        run.record_defaulted(features.defaulted());

        let operation_name = format!("stage {} {}", stage, run.unique_key);
        let unique_key = run.unique_key.as_str();
        let outcome = retry_transient(&operation_name, &self.retry, ScoringError::is_transient, || {
            self.scoring.score(ScoringRequest {
                unique_key,
                stage,
                features: &features,
            })
        })
        .await;

        let exhausted = outcome.exhausted(self.retry.max_attempts(), ScoringError::is_transient);
        run.attempts += outcome.attempts;

        outcome.result.map_err(|e| RecordError {
            kind: if exhausted {
                RecordErrorKind::RetriesExhausted
            } else {
                RecordErrorKind::ScoringService
            },
            stage,
            detail: e.to_string(),
        })
    }
}

fn error_raw(error: &RecordError) -> Value {
    json!({ "error": error.detail })
}

/// Mutable bookkeeping for one record while it moves through the cascade
struct RecordRun {
    unique_key: String,
    state: RecordState,
    attempts: u32,
    defaulted_fields: Vec<String>,
    stage1_raw: Option<Value>,
    stage2_raw: Option<Value>,
}

impl RecordRun {
    fn new(unique_key: &str) -> Self {
        Self {
            unique_key: unique_key.to_string(),
            state: RecordState::Init,
            attempts: 0,
            defaulted_fields: Vec::new(),
            stage1_raw: None,
            stage2_raw: None,
        }
    }

    fn transition(&mut self, next: RecordState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "invalid transition {:?} -> {:?}",
            self.state,
            next
        );
        tracing::trace!(
            unique_key = %self.unique_key,
            from = ?self.state,
            to = ?next,
            "Record state transition"
        );
        self.state = next;
    }

    fn record_defaulted(&mut self, fields: &[String]) {
        for field in fields {
            if !self.defaulted_fields.contains(field) {
                self.defaulted_fields.push(field.clone());
            }
        }
    }

    fn finish(self, stage: Stage, label: DelayLabel) -> PredictionResult {
        self.into_result(stage, Some(label), None)
    }

    fn fail(self, stage: Stage, error: RecordError) -> PredictionResult {
        self.into_result(stage, None, Some(error))
    }

    fn into_result(
        self,
        stage_reached: Stage,
        label: Option<DelayLabel>,
        error: Option<RecordError>,
    ) -> PredictionResult {
        PredictionResult {
            unique_key: self.unique_key,
            stage_reached,
            label,
            error,
            final_state: self.state,
            attempts: self.attempts,
            defaulted_fields: self.defaulted_fields,
            stage1_raw: self.stage1_raw,
            stage2_raw: self.stage2_raw,
        }
    }
}
