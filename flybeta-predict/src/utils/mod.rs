//! Shared utilities

pub mod retry;

pub use retry::{retry_transient, BackoffSchedule, RetryOutcome, RetryPolicy};
