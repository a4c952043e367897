//! Output message sink
//!
//! One message per record, keyed by `unique_key`. [`JsonLinesSink`] appends one
//! JSON object per line: `{"topic": ..., "key": ..., "value": message}`.

use crate::error::SinkError;
use crate::models::OutputMessage;
use async_trait::async_trait;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};

pub const DEFAULT_TOPIC: &str = "flight-predictions";

/// Destination for output messages
///
/// `publish` failures of a single message are [`SinkError::Publish`] and are
/// counted by the caller; [`SinkError::Unavailable`] aborts the run.
#[async_trait]
pub trait MessageSink: Send {
    async fn publish(&mut self, key: &str, message: &OutputMessage) -> Result<(), SinkError>;

    async fn flush(&mut self) -> Result<(), SinkError>;

    async fn close(&mut self) -> Result<(), SinkError>;
}

#[derive(Serialize)]
struct SinkLine<'a> {
    topic: &'a str,
    key: &'a str,
    value: &'a OutputMessage,
}

/// File-backed sink writing JSON lines
pub struct JsonLinesSink {
    path: PathBuf,
    topic: String,
    writer: Option<BufWriter<File>>,
    published: usize,
}

impl JsonLinesSink {
    /// Create (or truncate) the output file
    pub async fn create(path: &Path, topic: impl Into<String>) -> Result<Self, SinkError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    SinkError::Unavailable(format!("create {}: {}", parent.display(), e))
                })?;
            }
        }

        let file = File::create(path)
            .await
            .map_err(|e| SinkError::Unavailable(format!("open {}: {}", path.display(), e)))?;

        tracing::info!(path = %path.display(), "Opened JSON-lines sink");

        Ok(Self {
            path: path.to_path_buf(),
            topic: topic.into(),
            writer: Some(BufWriter::new(file)),
            published: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Messages written so far
    pub fn published(&self) -> usize {
        self.published
    }

    fn writer(&mut self) -> Result<&mut BufWriter<File>, SinkError> {
        self.writer
            .as_mut()
            .ok_or_else(|| SinkError::Unavailable(format!("{} is closed", self.path.display())))
    }
}

#[async_trait]
impl MessageSink for JsonLinesSink {
    async fn publish(&mut self, key: &str, message: &OutputMessage) -> Result<(), SinkError> {
        let line = SinkLine {
            topic: &self.topic,
            key,
            value: message,
        };
        let mut encoded = serde_json::to_vec(&line).map_err(|e| SinkError::Publish {
            key: key.to_string(),
            detail: e.to_string(),
        })?;
        encoded.push(b'\n');

        self.writer()?
            .write_all(&encoded)
            .await
            .map_err(|e| SinkError::Publish {
                key: key.to_string(),
                detail: e.to_string(),
            })?;

        self.published += 1;
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), SinkError> {
        let path = self.path.display().to_string();
        self.writer()?
            .flush()
            .await
            .map_err(|e| SinkError::Unavailable(format!("flush {}: {}", path, e)))
    }

    async fn close(&mut self) -> Result<(), SinkError> {
        if let Some(mut writer) = self.writer.take() {
            writer.shutdown().await.map_err(|e| {
                SinkError::Unavailable(format!("close {}: {}", self.path.display(), e))
            })?;
            tracing::info!(
                path = %self.path.display(),
                published = self.published,
                "Closed JSON-lines sink"
            );
        }
        Ok(())
    }
}
