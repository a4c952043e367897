//! Remote scoring service client
//!
//! Two stateless endpoints: stage 1 answers `{"prediction": 0|1}`, stage 2
//! answers `{"prediction_2": 0|1}`. Network failures and timeouts are transient;
//! a non-success status or a malformed body is terminal for the stage.

use crate::error::ScoringError;
use crate::features::FeatureVector;
use crate::models::Stage;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://ml:6000";
pub const DEFAULT_STAGE1_PATH: &str = "/predict";
pub const DEFAULT_STAGE2_PATH: &str = "/predict/stage2";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Header carrying the record key, for tracing on the service side
pub const KEY_HEADER: &str = "x-flybeta-key";

const USER_AGENT: &str = concat!("flybeta-predict/", env!("CARGO_PKG_VERSION"));

/// One scoring call
#[derive(Debug, Clone, Copy)]
pub struct ScoringRequest<'a> {
    pub unique_key: &'a str,
    pub stage: Stage,
    pub features: &'a FeatureVector,
}

/// Successful stage answer
#[derive(Debug, Clone, PartialEq)]
pub struct StageOutcome {
    /// Binary prediction (stage 1: risk flag, stage 2: delay flag)
    pub prediction: u8,
    /// Full response body, kept for audit
    pub raw: Value,
}

/// Remote scoring stages
#[async_trait]
pub trait ScoringService: Send + Sync {
    async fn score(&self, request: ScoringRequest<'_>) -> Result<StageOutcome, ScoringError>;
}

/// Endpoint layout of the scoring service
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringEndpoints {
    pub base_url: String,
    pub stage1_path: String,
    pub stage2_path: String,
    pub timeout: Duration,
}

impl Default for ScoringEndpoints {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            stage1_path: DEFAULT_STAGE1_PATH.to_string(),
            stage2_path: DEFAULT_STAGE2_PATH.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl ScoringEndpoints {
    pub fn url_for(&self, stage: Stage) -> String {
        let path = match stage {
            Stage::One => &self.stage1_path,
            Stage::Two => &self.stage2_path,
        };
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

/// HTTP client for the scoring service
pub struct HttpScoringClient {
    http_client: reqwest::Client,
    endpoints: ScoringEndpoints,
}

impl HttpScoringClient {
    pub fn new(endpoints: ScoringEndpoints) -> Result<Self, ScoringError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(endpoints.timeout)
            .build()
            .map_err(|e| ScoringError::Setup(e.to_string()))?;

        Ok(Self {
            http_client,
            endpoints,
        })
    }

    pub fn endpoints(&self) -> &ScoringEndpoints {
        &self.endpoints
    }
}

#[async_trait]
impl ScoringService for HttpScoringClient {
    async fn score(&self, request: ScoringRequest<'_>) -> Result<StageOutcome, ScoringError> {
        let url = self.endpoints.url_for(request.stage);

        tracing::debug!(
            unique_key = request.unique_key,
            stage = request.stage.number(),
            url = %url,
            fields = request.features.len(),
            "Calling scoring service"
        );

        let response = self
            .http_client
            .post(&url)
            .header(KEY_HEADER, request.unique_key)
            .json(request.features)
            .send()
            .await
            .map_err(|e| ScoringError::Transient(describe_send_error(&e)))?;

        let status = response.status().as_u16();

        // A body that cannot be read after the status arrived is treated as a
        // network failure
        let body = response
            .text()
            .await
            .map_err(|e| ScoringError::Transient(describe_send_error(&e)))?;

        parse_stage_response(request.stage, status, &body)
    }
}

fn describe_send_error(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        format!("timeout: {}", err)
    } else if err.is_connect() {
        format!("connection failed: {}", err)
    } else {
        err.to_string()
    }
}

/// Response field carrying the stage's prediction
pub fn prediction_field(stage: Stage) -> &'static str {
    match stage {
        Stage::One => "prediction",
        Stage::Two => "prediction_2",
    }
}

/// Interpret one scoring response
pub fn parse_stage_response(
    stage: Stage,
    status: u16,
    body: &str,
) -> Result<StageOutcome, ScoringError> {
    if !(200..300).contains(&status) {
        return Err(ScoringError::Service {
            status: Some(status),
            detail: truncate(body, 200),
        });
    }

    let raw: Value = serde_json::from_str(body).map_err(|e| ScoringError::Service {
        status: None,
        detail: format!("malformed response body: {}", e),
    })?;

    if let Some(error) = raw.get("error") {
        return Err(ScoringError::Service {
            status: None,
            detail: format!("service reported error: {}", error),
        });
    }

    let field = prediction_field(stage);
    let prediction = raw
        .get(field)
        .and_then(binary_value)
        .ok_or_else(|| ScoringError::Service {
            status: None,
            detail: format!("missing or non-binary '{}' in response", field),
        })?;

    Ok(StageOutcome { prediction, raw })
}

/// Accept 0/1 as integer, float or bool
fn binary_value(value: &Value) -> Option<u8> {
    match value {
        Value::Bool(b) => Some(u8::from(*b)),
        Value::Number(n) => {
            let v = n.as_f64()?;
            if v == 0.0 {
                Some(0)
            } else if v == 1.0 {
                Some(1)
            } else {
                None
            }
        }
        _ => None,
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max_chars).collect();
        format!("{}...", cut)
    }
}
