//! Joined records produced by the temporal joiner

use super::records::PrimaryRecord;
use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeMap;

/// Why a snapshot has no observation attached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbsentReason {
    /// The location has no observations at all
    NoObservationsForKey,
    /// Observations exist but none is within tolerance of the anchor
    OutsideTolerance,
}

/// Observation selected for an anchor timestamp
#[derive(Debug, Clone, PartialEq)]
pub struct MatchedObservation {
    pub observed_at: DateTime<Utc>,
    /// Absolute distance between anchor and observation
    pub distance: Duration,
    pub attributes: BTreeMap<String, f64>,
}

/// Weather attached to one side of a flight
#[derive(Debug, Clone, PartialEq)]
pub enum ObservationSnapshot {
    Matched(MatchedObservation),
    Absent(AbsentReason),
}

impl ObservationSnapshot {
    pub fn is_present(&self) -> bool {
        matches!(self, ObservationSnapshot::Matched(_))
    }

    pub fn matched(&self) -> Option<&MatchedObservation> {
        match self {
            ObservationSnapshot::Matched(m) => Some(m),
            ObservationSnapshot::Absent(_) => None,
        }
    }

    /// Attribute value, `None` when absent (never zero)
    pub fn attribute(&self, name: &str) -> Option<f64> {
        self.matched().and_then(|m| m.attributes.get(name).copied())
    }
}

/// Flight plus departure-side (origin) and arrival-side (destination) weather
#[derive(Debug, Clone, PartialEq)]
pub struct JoinedRecord {
    pub primary: PrimaryRecord,
    /// Origin weather nearest to the scheduled departure
    pub departure_weather: ObservationSnapshot,
    /// Destination weather nearest to the scheduled arrival
    pub arrival_weather: ObservationSnapshot,
}

impl JoinedRecord {
    pub fn unique_key(&self) -> &str {
        self.primary.unique_key()
    }
}
