//! In-memory message sink

use super::events::{Event, EventLog};
use async_trait::async_trait;
use flybeta_predict::error::SinkError;
use flybeta_predict::io::MessageSink;
use flybeta_predict::models::OutputMessage;
use std::collections::HashSet;

/// Keeps every published message; publishing selected keys fails
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub messages: Vec<(String, OutputMessage)>,
    pub fail_keys: HashSet<String>,
    /// Every publish fails with `Unavailable` after this many messages
    pub unavailable_after: Option<usize>,
    pub publish_attempts: usize,
    pub flushed: bool,
    pub closed: bool,
    /// Successful publishes are appended here when set
    pub events: Option<EventLog>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(keys: &[&str]) -> Self {
        Self {
            fail_keys: keys.iter().map(|k| k.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn message(&self, key: &str) -> Option<&OutputMessage> {
        self.messages
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, message)| message)
    }
}

#[async_trait]
impl MessageSink for RecordingSink {
    async fn publish(&mut self, key: &str, message: &OutputMessage) -> Result<(), SinkError> {
        self.publish_attempts += 1;
        if let Some(limit) = self.unavailable_after {
            if self.messages.len() >= limit {
                return Err(SinkError::Unavailable("broker connection lost".to_string()));
            }
        }
        if self.fail_keys.contains(key) {
            return Err(SinkError::Publish {
                key: key.to_string(),
                detail: "simulated publish failure".to_string(),
            });
        }
        if let Some(events) = &self.events {
            events.push(Event::Published(key.to_string()));
        }
        self.messages.push((key.to_string(), message.clone()));
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), SinkError> {
        self.flushed = true;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), SinkError> {
        self.closed = true;
        Ok(())
    }
}
