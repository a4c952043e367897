//! Data models for the prediction pipeline

pub mod joined;
pub mod prediction;
pub mod records;

pub use joined::{AbsentReason, JoinedRecord, MatchedObservation, ObservationSnapshot};
pub use prediction::{
    DelayLabel, OutputMessage, PredictionResult, RecordError, RecordErrorKind, RecordState,
    Stage,
};
pub use records::{build_unique_key, PrimaryRecord, SecondaryObservation};
