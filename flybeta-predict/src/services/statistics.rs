//! Window and run counters
//!
//! Counters are only updated after a window has fully resolved; per-record tasks
//! never touch them.

use crate::models::{DelayLabel, PredictionResult, Stage};
use serde::Serialize;
use uuid::Uuid;

/// Counters for one window
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WindowStats {
    /// Zero-based window position
    pub index: usize,
    pub records: usize,
    /// Result without error marker whose message was published
    pub success: usize,
    /// Result with an error marker, or a message that failed to publish
    pub error: usize,
    pub stage1_on_time: usize,
    pub stage2_delay: usize,
    pub stage2_on_time: usize,
    pub defaulted_field_events: usize,
    pub publish_failures: usize,
}

impl WindowStats {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            ..Self::default()
        }
    }

    /// Count one record; each record is exactly one of success or error
    pub fn record(&mut self, result: &PredictionResult, published: bool) {
        self.records += 1;
        self.defaulted_field_events += result.defaulted_fields.len();
        if !published {
            self.publish_failures += 1;
        }

        match (result.stage_reached, result.label) {
            (Stage::One, Some(DelayLabel::OnTime)) => self.stage1_on_time += 1,
            (Stage::Two, Some(DelayLabel::Delay)) => self.stage2_delay += 1,
            (Stage::Two, Some(DelayLabel::OnTime)) => self.stage2_on_time += 1,
            _ => {}
        }

        if result.is_success() && published {
            self.success += 1;
        } else {
            self.error += 1;
        }
    }

    pub fn display_string(&self) -> String {
        format!(
            "window {}: {} records, {} success, {} error",
            self.index + 1,
            self.records,
            self.success,
            self.error
        )
    }
}

/// Running totals across windows
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunTotals {
    pub windows: usize,
    pub total: usize,
    pub success: usize,
    pub error: usize,
    pub stage1_on_time: usize,
    pub stage2_delay: usize,
    pub stage2_on_time: usize,
    pub defaulted_field_events: usize,
    pub publish_failures: usize,
}

impl RunTotals {
    pub fn add_window(&mut self, window: &WindowStats) {
        self.windows += 1;
        self.total += window.records;
        self.success += window.success;
        self.error += window.error;
        self.stage1_on_time += window.stage1_on_time;
        self.stage2_delay += window.stage2_delay;
        self.stage2_on_time += window.stage2_on_time;
        self.defaulted_field_events += window.defaulted_field_events;
        self.publish_failures += window.publish_failures;
    }

    pub fn display_string(&self) -> String {
        format!(
            "{} of {} records succeeded ({} error) across {} windows",
            self.success, self.total, self.error, self.windows
        )
    }
}

/// Final report of one run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    #[serde(flatten)]
    pub totals: RunTotals,
    pub elapsed_ms: u64,
    /// ISO-8601
    pub started_at: String,
    /// ISO-8601
    pub finished_at: String,
}

impl RunSummary {
    pub fn success(&self) -> usize {
        self.totals.success
    }

    pub fn error(&self) -> usize {
        self.totals.error
    }

    pub fn total(&self) -> usize {
        self.totals.total
    }

    pub fn display_string(&self) -> String {
        format!(
            "Run {}: {} in {:.2}s",
            self.run_id,
            self.totals.display_string(),
            self.elapsed_ms as f64 / 1000.0
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RecordError, RecordErrorKind, RecordState};

    fn result(stage: Stage, label: Option<DelayLabel>, failed: bool) -> PredictionResult {
        PredictionResult {
            unique_key: "k".to_string(),
            stage_reached: stage,
            label,
            error: failed.then(|| RecordError {
                kind: RecordErrorKind::ScoringService,
                stage,
                detail: "boom".to_string(),
            }),
            final_state: RecordState::Stage2Done,
            attempts: 1,
            defaulted_fields: vec!["origin_temp_c".to_string()],
            stage1_raw: None,
            stage2_raw: None,
        }
    }

    #[test]
    fn test_window_counts_each_record_once() {
        let mut window = WindowStats::new(0);
        window.record(&result(Stage::One, Some(DelayLabel::OnTime), false), true);
        window.record(&result(Stage::Two, Some(DelayLabel::Delay), false), true);
        window.record(&result(Stage::Two, None, true), true);
        window.record(&result(Stage::Two, Some(DelayLabel::OnTime), false), false);

        assert_eq!(window.records, 4);
        assert_eq!(window.success, 2);
        assert_eq!(window.error, 2);
        assert_eq!(window.success + window.error, window.records);
        assert_eq!(window.stage1_on_time, 1);
        assert_eq!(window.stage2_delay, 1);
        assert_eq!(window.stage2_on_time, 1);
        assert_eq!(window.publish_failures, 1);
        assert_eq!(window.defaulted_field_events, 4);
    }

    #[test]
    fn test_totals_accumulate() {
        let mut first = WindowStats::new(0);
        first.record(&result(Stage::One, Some(DelayLabel::OnTime), false), true);
        let mut second = WindowStats::new(1);
        second.record(&result(Stage::One, None, true), true);

        let mut totals = RunTotals::default();
        totals.add_window(&first);
        totals.add_window(&second);

        assert_eq!(totals.windows, 2);
        assert_eq!(totals.total, 2);
        assert_eq!(
            totals.display_string(),
            "1 of 2 records succeeded (1 error) across 2 windows"
        );
    }
}
