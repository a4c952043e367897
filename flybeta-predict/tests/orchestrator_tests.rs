//! Inference orchestrator integration tests: cascade, retry, isolation, admission

mod helpers;

use flybeta_predict::features::MissingFieldPolicy;
use flybeta_predict::models::{DelayLabel, RecordErrorKind, RecordState, Stage};
use helpers::{joined_batch, orchestrator, Reply, ScriptedScoringService};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_low_risk_never_reaches_stage2() {
    let scoring = Arc::new(ScriptedScoringService::new());
    let records = joined_batch(5);

    let results = orchestrator(scoring.clone(), 10, MissingFieldPolicy::Substitute)
        .process_window(&records)
        .await;

    assert_eq!(results.len(), 5);
    for result in &results {
        assert_eq!(result.stage_reached, Stage::One);
        assert_eq!(result.label, Some(DelayLabel::OnTime));
        assert_eq!(result.final_state, RecordState::Stage1LowRiskDone);
    }
    assert_eq!(scoring.stage_calls(Stage::One), 5);
    assert_eq!(scoring.stage_calls(Stage::Two), 0);
}

#[tokio::test]
async fn test_retry_recovers_from_two_transient_failures() {
    let records = joined_batch(1);
    let key = records[0].unique_key().to_string();
    let scoring = Arc::new(ScriptedScoringService::new().script(
        &key,
        Stage::One,
        vec![Reply::Transient, Reply::Transient, Reply::Predict(1)],
    ).with_default(Stage::Two, Reply::Predict(1)));

    let results = orchestrator(scoring.clone(), 10, MissingFieldPolicy::Substitute)
        .process_window(&records)
        .await;

    let result = &results[0];
    assert!(result.is_success());
    assert_eq!(result.stage_reached, Stage::Two);
    assert_eq!(result.label, Some(DelayLabel::Delay));
    assert_eq!(result.attempts, 4);
    assert_eq!(scoring.calls_for(&key, Stage::One), 3);
}

#[tokio::test]
async fn test_retry_exhaustion_is_isolated_to_one_record() {
    let records = joined_batch(6);
    let doomed = records[2].unique_key().to_string();
    let scoring = Arc::new(ScriptedScoringService::new().script(
        &doomed,
        Stage::One,
        vec![Reply::Transient; 3],
    ));

    let results = orchestrator(scoring.clone(), 3, MissingFieldPolicy::Substitute)
        .process_window(&records)
        .await;

    assert_eq!(results.len(), 6);
    let failed: Vec<_> = results.iter().filter(|r| !r.is_success()).collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].unique_key, doomed);
    assert_eq!(failed[0].final_state, RecordState::Stage1Failed);
    assert_eq!(
        failed[0].error.as_ref().unwrap().kind,
        RecordErrorKind::RetriesExhausted
    );
    assert_eq!(scoring.calls_for(&doomed, Stage::One), 3);
    assert!(results
        .iter()
        .filter(|r| r.unique_key != doomed)
        .all(|r| r.label == Some(DelayLabel::OnTime)));
}

#[tokio::test]
async fn test_stage2_label_mapping() {
    let records = joined_batch(2);
    let delayed = records[0].unique_key().to_string();
    let on_time = records[1].unique_key().to_string();
    let scoring = Arc::new(
        ScriptedScoringService::new()
            .with_default(Stage::One, Reply::Predict(1))
            .script(&delayed, Stage::Two, vec![Reply::Predict(1)])
            .script(&on_time, Stage::Two, vec![Reply::Predict(0)]),
    );

    let results = orchestrator(scoring, 10, MissingFieldPolicy::Substitute)
        .process_window(&records)
        .await;

    let by_key = |key: &str| results.iter().find(|r| r.unique_key == key).unwrap();
    assert_eq!(by_key(&delayed).label, Some(DelayLabel::Delay));
    assert_eq!(by_key(&on_time).label, Some(DelayLabel::OnTime));
    assert_eq!(by_key(&on_time).stage_reached, Stage::Two);
}

#[tokio::test]
async fn test_service_error_in_stage2_is_terminal() {
    let records = joined_batch(1);
    let scoring = Arc::new(
        ScriptedScoringService::new()
            .with_default(Stage::One, Reply::Predict(1))
            .with_default(Stage::Two, Reply::Service(500)),
    );

    let results = orchestrator(scoring.clone(), 10, MissingFieldPolicy::Substitute)
        .process_window(&records)
        .await;

    let result = &results[0];
    assert_eq!(result.final_state, RecordState::Stage2Failed);
    assert_eq!(result.error.as_ref().unwrap().kind, RecordErrorKind::ScoringService);
    assert!(result.stage1_raw.is_some());
    assert!(result.stage2_raw.is_some());
    assert_eq!(scoring.stage_calls(Stage::Two), 1);
}

#[tokio::test]
async fn test_pool_bounds_concurrent_scoring_calls() {
    let scoring = Arc::new(
        ScriptedScoringService::new().with_latency(Duration::from_millis(10)),
    );
    let records = joined_batch(25);
    let orchestrator = orchestrator(scoring.clone(), 4, MissingFieldPolicy::Substitute);

    let results = orchestrator.process_window(&records).await;

    assert_eq!(results.len(), 25);
    assert!(scoring.max_in_flight() <= 4);
    assert_eq!(orchestrator.pool().high_water_mark(), 4);
    assert_eq!(orchestrator.pool().in_flight(), 0);
}

#[tokio::test]
async fn test_reject_policy_skips_scoring() {
    // Joined records without weather lack every origin_*/dest_* field
    let scoring = Arc::new(ScriptedScoringService::new());
    let records = joined_batch(3);

    let results = orchestrator(scoring.clone(), 10, MissingFieldPolicy::Reject)
        .process_window(&records)
        .await;

    assert!(results.iter().all(|r| r.error.as_ref().map(|e| e.kind)
        == Some(RecordErrorKind::FeatureSchema)));
    assert_eq!(scoring.stage_calls(Stage::One), 0);
}

#[tokio::test]
async fn test_substitute_policy_reports_defaulted_fields() {
    let scoring = Arc::new(ScriptedScoringService::new());
    let records = joined_batch(1);

    let results = orchestrator(scoring, 10, MissingFieldPolicy::Substitute)
        .process_window(&records)
        .await;

    let defaulted = &results[0].defaulted_fields;
    assert!(defaulted.contains(&"origin_temp_c".to_string()));
    assert!(defaulted.contains(&"dest_pressure_mb".to_string()));
    assert!(!defaulted.contains(&"sched_dep_hour".to_string()));
}
