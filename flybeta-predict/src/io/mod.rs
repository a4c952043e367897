//! Input and output adapters
//!
//! - [`source`]: SourceReader trait, field-rename contract, JSON-lines reader
//! - [`sink`]: MessageSink trait, JSON-lines sink

pub mod sink;
pub mod source;

pub use sink::{JsonLinesSink, MessageSink, DEFAULT_TOPIC};
pub use source::{JsonLinesSource, RecordFilter, SourceBatch, SourceReader};
