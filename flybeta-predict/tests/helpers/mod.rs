//! Shared test doubles and fixtures for flybeta-predict integration tests
#![allow(dead_code)]

pub mod events;
pub mod fixtures;
pub mod scoring;
pub mod sink;

pub use events::{Event, EventLog};
pub use fixtures::*;
pub use scoring::{Reply, ScriptedScoringService};
pub use sink::RecordingSink;
