//! Inference pipeline services
//!
//! - [`scoring_client`]: remote scoring stages (trait + HTTP client)
//! - [`worker_pool`]: bounded admission for per-record pipelines
//! - [`inference_orchestrator`]: per-record two-stage cascade
//! - [`batch_publisher`]: windowed scoring and publishing
//! - [`statistics`]: window and run counters

pub mod batch_publisher;
pub mod inference_orchestrator;
pub mod scoring_client;
pub mod statistics;
pub mod worker_pool;

pub use batch_publisher::{BatchPublisher, DEFAULT_WINDOW_SIZE};
pub use inference_orchestrator::InferenceOrchestrator;
pub use scoring_client::{
    HttpScoringClient, ScoringEndpoints, ScoringRequest, ScoringService, StageOutcome,
};
pub use statistics::{RunSummary, RunTotals, WindowStats};
pub use worker_pool::{WorkerPool, DEFAULT_CONCURRENCY};
