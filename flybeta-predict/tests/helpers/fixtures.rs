//! Record and pipeline fixtures

use chrono::{DateTime, Utc};
use flybeta_common::time::parse_timestamp;
use flybeta_predict::features::{FeatureAdapter, MissingFieldPolicy, StageSchema};
use flybeta_predict::join::{JoinConfig, TemporalJoiner};
use flybeta_predict::models::{
    AbsentReason, JoinedRecord, ObservationSnapshot, PrimaryRecord, SecondaryObservation, Stage,
};
use flybeta_predict::services::{InferenceOrchestrator, ScoringService, WorkerPool};
use flybeta_predict::utils::RetryPolicy;
use std::sync::Arc;
use std::time::Duration;

pub fn ts(raw: &str) -> DateTime<Utc> {
    parse_timestamp(raw).unwrap()
}

pub fn flight(carrier: &str, origin: &str, dest: &str, dep: &str, arr: &str) -> PrimaryRecord {
    PrimaryRecord::new(carrier, origin, dest, ts(dep), ts(arr))
}

pub fn observation(location: &str, at: &str, temp_c: f64) -> SecondaryObservation {
    SecondaryObservation::new(location, ts(at))
        .with_attribute("temp_c", temp_c)
        .with_attribute("humidity_pct", 80.0)
}

/// Joined record with no weather on either side
pub fn bare_joined(primary: PrimaryRecord) -> JoinedRecord {
    JoinedRecord {
        primary,
        departure_weather: ObservationSnapshot::Absent(AbsentReason::NoObservationsForKey),
        arrival_weather: ObservationSnapshot::Absent(AbsentReason::NoObservationsForKey),
    }
}

/// `n` distinct joined records (one per day, starting 2024-01-01)
pub fn joined_batch(n: usize) -> Vec<JoinedRecord> {
    let flights: Vec<PrimaryRecord> = (0..n)
        .map(|i| {
            let dep = ts("2024-01-01T08:00:00Z") + chrono::Duration::days(i as i64);
            let arr = dep + chrono::Duration::minutes(70);
            PrimaryRecord::new("AA", "LOS", "ABV", dep, arr)
        })
        .collect();
    TemporalJoiner::new(JoinConfig::default())
        .join(&flights, &[])
        .records
}

/// Retry policy with the default budget and a short delay
pub fn quick_retry() -> RetryPolicy {
    RetryPolicy::fixed(2, Duration::from_millis(5))
}

pub fn orchestrator(
    scoring: Arc<dyn ScoringService>,
    concurrency: usize,
    policy: MissingFieldPolicy,
) -> InferenceOrchestrator {
    InferenceOrchestrator::new(
        scoring,
        FeatureAdapter::new(StageSchema::default_for(Stage::One), policy),
        FeatureAdapter::new(StageSchema::default_for(Stage::Two), policy),
        quick_retry(),
        WorkerPool::new(concurrency),
    )
}
