//! Prediction results and the per-record cascade state machine
//!
//! Per-record states:
//! INIT → STAGE1_CALLING → {STAGE1_FAILED | STAGE1_LOW_RISK_DONE | STAGE1_HIGH_RISK}
//! STAGE1_HIGH_RISK → STAGE2_CALLING → {STAGE2_FAILED | STAGE2_DONE}

use serde::{Serialize, Serializer};
use serde_json::Value;

/// Scoring stage of the cascade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stage {
    One,
    Two,
}

impl Stage {
    pub fn number(self) -> u8 {
        match self {
            Stage::One => 1,
            Stage::Two => 2,
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.number())
    }
}

// Serialized as the bare stage number, as in the output message contract
impl Serialize for Stage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.number())
    }
}

/// Final label for a flight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DelayLabel {
    OnTime,
    Delay,
}

impl DelayLabel {
    /// Stage-2 binary outcome → label
    pub fn from_stage2(prediction: u8) -> Self {
        if prediction == 1 {
            DelayLabel::Delay
        } else {
            DelayLabel::OnTime
        }
    }
}

/// Per-record cascade state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecordState {
    Init,
    Stage1Calling,
    Stage1Failed,
    Stage1LowRiskDone,
    Stage1HighRisk,
    Stage2Calling,
    Stage2Failed,
    Stage2Done,
}

impl RecordState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RecordState::Stage1Failed
                | RecordState::Stage1LowRiskDone
                | RecordState::Stage2Failed
                | RecordState::Stage2Done
        )
    }

    /// Whether `self → next` is an edge of the state machine
    pub fn can_transition_to(self, next: RecordState) -> bool {
        use RecordState::*;
        matches!(
            (self, next),
            (Init, Stage1Calling)
                | (Stage1Calling, Stage1Failed)
                | (Stage1Calling, Stage1LowRiskDone)
                | (Stage1Calling, Stage1HighRisk)
                | (Stage1HighRisk, Stage2Calling)
                | (Stage2Calling, Stage2Failed)
                | (Stage2Calling, Stage2Done)
        )
    }
}

/// Category of a per-record failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordErrorKind {
    /// Transient failures on every attempt of the retry budget
    RetriesExhausted,
    /// Non-success status or malformed response
    ScoringService,
    /// Feature vector could not be built under the `reject` policy
    FeatureSchema,
}

/// Error marker carried by a failed PredictionResult
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordError {
    pub kind: RecordErrorKind,
    pub stage: Stage,
    pub detail: String,
}

impl std::fmt::Display for RecordError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "stage {} {:?}: {}", self.stage, self.kind, self.detail)
    }
}

/// Outcome of the cascade for one record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResult {
    pub unique_key: String,
    pub stage_reached: Stage,
    pub label: Option<DelayLabel>,
    pub error: Option<RecordError>,
    pub final_state: RecordState,
    /// Scoring calls made across both stages, retries included
    pub attempts: u32,
    /// Feature fields substituted with their declared default
    pub defaulted_fields: Vec<String>,
    pub stage1_raw: Option<Value>,
    pub stage2_raw: Option<Value>,
}

impl PredictionResult {
    /// Success means no error marker, whichever stage was reached
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Outbound message for this result
    pub fn to_message(&self, timestamp: String) -> OutputMessage {
        OutputMessage {
            unique_key: self.unique_key.clone(),
            stage: self.stage_reached,
            prediction: self.label,
            timestamp,
            error: self.error.as_ref().map(|e| e.to_string()),
        }
    }
}

/// One message per record, keyed by `unique_key`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputMessage {
    pub unique_key: String,
    pub stage: Stage,
    pub prediction: Option<DelayLabel>,
    /// ISO-8601
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
