//! Scripted in-memory scoring service

use super::events::{Event, EventLog};
use async_trait::async_trait;
use flybeta_predict::error::ScoringError;
use flybeta_predict::models::Stage;
use flybeta_predict::services::{ScoringRequest, ScoringService, StageOutcome};
use serde_json::json;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// One scripted answer
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Predict(u8),
    Transient,
    Service(u16),
}

/// Answers per (key, stage) from a script, falling back to a per-stage default
///
/// Tracks every call and the peak number of concurrent calls.
pub struct ScriptedScoringService {
    scripts: Mutex<HashMap<(String, Stage), VecDeque<Reply>>>,
    stage1_default: Reply,
    stage2_default: Reply,
    latency: Duration,
    calls: Mutex<Vec<(String, Stage)>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    events: Option<EventLog>,
}

impl Default for ScriptedScoringService {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedScoringService {
    /// Every record is low risk unless scripted otherwise
    pub fn new() -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            stage1_default: Reply::Predict(0),
            stage2_default: Reply::Predict(0),
            latency: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            events: None,
        }
    }

    pub fn with_default(mut self, stage: Stage, reply: Reply) -> Self {
        match stage {
            Stage::One => self.stage1_default = reply,
            Stage::Two => self.stage2_default = reply,
        }
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn with_event_log(mut self, events: EventLog) -> Self {
        self.events = Some(events);
        self
    }

    /// Replies consumed in order for this key and stage, then the default applies
    pub fn script(self, key: &str, stage: Stage, replies: Vec<Reply>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert((key.to_string(), stage), replies.into());
        self
    }

    pub fn calls_for(&self, key: &str, stage: Stage) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(k, s)| k == key && *s == stage)
            .count()
    }

    pub fn stage_calls(&self, stage: Stage) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, s)| *s == stage)
            .count()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn next_reply(&self, key: &str, stage: Stage) -> Reply {
        let scripted = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(&(key.to_string(), stage))
            .and_then(|queue| queue.pop_front());
        scripted.unwrap_or_else(|| match stage {
            Stage::One => self.stage1_default.clone(),
            Stage::Two => self.stage2_default.clone(),
        })
    }
}

#[async_trait]
impl ScoringService for ScriptedScoringService {
    async fn score(&self, request: ScoringRequest<'_>) -> Result<StageOutcome, ScoringError> {
        self.calls
            .lock()
            .unwrap()
            .push((request.unique_key.to_string(), request.stage));
        if let Some(events) = &self.events {
            events.push(Event::Scored(request.unique_key.to_string()));
        }

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        // Yield so concurrent callers overlap even without latency
        tokio::task::yield_now().await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match self.next_reply(request.unique_key, request.stage) {
            Reply::Predict(prediction) => {
                let raw = match request.stage {
                    Stage::One => json!({ "prediction": prediction }),
                    Stage::Two => json!({ "prediction_2": prediction }),
                };
                Ok(StageOutcome { prediction, raw })
            }
            Reply::Transient => Err(ScoringError::Transient("simulated timeout".to_string())),
            Reply::Service(status) => Err(ScoringError::Service {
                status: Some(status),
                detail: "simulated failure".to_string(),
            }),
        }
    }
}
