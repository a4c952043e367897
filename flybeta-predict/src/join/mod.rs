//! Temporal joiner: nearest-timestamp (asof) join of flights with weather
//!
//! Each flight gets two independent lookups:
//! - origin airport observations, anchored on the scheduled departure
//! - destination airport observations, anchored on the scheduled arrival
//!
//! Observations are partitioned by airport and sorted by timestamp once; each
//! lookup is a binary search that inspects the neighbor on either side of the
//! anchor. A candidate is accepted when its absolute distance is within the
//! tolerance (inclusive). Equidistant candidates are resolved by [`TieBreak`].
//!
//! The result is a pure function of the two input sets: primaries are
//! deduplicated and emitted in `unique_key` order, and observations that share a
//! location and timestamp are ordered by content.

use crate::models::{
    AbsentReason, JoinedRecord, MatchedObservation, ObservationSnapshot, PrimaryRecord,
    SecondaryObservation,
};
use chrono::{DateTime, Duration, Utc};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::str::FromStr;
use tracing::{info, warn};

/// Default tolerance window (2 hours)
pub const DEFAULT_TOLERANCE_MINUTES: i64 = 120;

/// Choice between two candidates at the same distance from the anchor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TieBreak {
    #[default]
    PreferEarlier,
    PreferLater,
}

impl FromStr for TieBreak {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "prefer_earlier" | "earlier" => Ok(TieBreak::PreferEarlier),
            "prefer_later" | "later" => Ok(TieBreak::PreferLater),
            other => Err(format!(
                "unknown tie_break '{}' (expected prefer_earlier or prefer_later)",
                other
            )),
        }
    }
}

/// Join parameters
#[derive(Debug, Clone, PartialEq)]
pub struct JoinConfig {
    /// Maximum accepted distance between anchor and observation (inclusive)
    pub tolerance: Duration,
    pub tie_break: TieBreak,
}

impl Default for JoinConfig {
    fn default() -> Self {
        Self {
            tolerance: Duration::minutes(DEFAULT_TOLERANCE_MINUTES),
            tie_break: TieBreak::PreferEarlier,
        }
    }
}

/// Counters reported for one join
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JoinStats {
    pub primaries_in: usize,
    pub duplicates_dropped: usize,
    pub observations_in: usize,
    pub locations: usize,
    pub joined: usize,
    pub departure_matched: usize,
    pub departure_absent: usize,
    pub arrival_matched: usize,
    pub arrival_absent: usize,
}

/// Joined records in `unique_key` order plus counters
#[derive(Debug, Clone)]
pub struct JoinOutput {
    pub records: Vec<JoinedRecord>,
    pub stats: JoinStats,
}

/// Nearest-timestamp joiner
#[derive(Debug, Clone, Default)]
pub struct TemporalJoiner {
    config: JoinConfig,
}

impl TemporalJoiner {
    pub fn new(config: JoinConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &JoinConfig {
        &self.config
    }

    /// Produce exactly one JoinedRecord per distinct `unique_key`
    pub fn join(
        &self,
        primaries: &[PrimaryRecord],
        observations: &[SecondaryObservation],
    ) -> JoinOutput {
        let index = ObservationIndex::build(observations);
        let (flights, duplicates_dropped) = dedupe_primaries(primaries);

        let mut stats = JoinStats {
            primaries_in: primaries.len(),
            duplicates_dropped,
            observations_in: observations.len(),
            locations: index.location_count(),
            ..JoinStats::default()
        };

        let records: Vec<JoinedRecord> = flights
            .into_iter()
            .map(|flight| {
                let departure_weather =
                    index.nearest(flight.origin(), flight.scheduled_departure(), &self.config);
                let arrival_weather =
                    index.nearest(flight.destination(), flight.scheduled_arrival(), &self.config);

                if departure_weather.is_present() {
                    stats.departure_matched += 1;
                } else {
                    stats.departure_absent += 1;
                }
                if arrival_weather.is_present() {
                    stats.arrival_matched += 1;
                } else {
                    stats.arrival_absent += 1;
                }

                JoinedRecord {
                    primary: flight.clone(),
                    departure_weather,
                    arrival_weather,
                }
            })
            .collect();

        stats.joined = records.len();

        info!(
            primaries = stats.primaries_in,
            observations = stats.observations_in,
            locations = stats.locations,
            joined = stats.joined,
            duplicates_dropped = stats.duplicates_dropped,
            departure_matched = stats.departure_matched,
            arrival_matched = stats.arrival_matched,
            tolerance_minutes = self.config.tolerance.num_minutes(),
            "Temporal join complete"
        );

        JoinOutput { records, stats }
    }
}

/// Observations partitioned by location, each partition sorted
struct ObservationIndex<'a> {
    by_location: HashMap<&'a str, Vec<&'a SecondaryObservation>>,
}

impl<'a> ObservationIndex<'a> {
    fn build(observations: &'a [SecondaryObservation]) -> Self {
        let mut by_location: HashMap<&'a str, Vec<&'a SecondaryObservation>> = HashMap::new();
        for obs in observations {
            by_location.entry(obs.location.as_str()).or_default().push(obs);
        }
        for series in by_location.values_mut() {
            series.sort_by(|a, b| compare_observations(a, b));
        }
        Self { by_location }
    }

    fn location_count(&self) -> usize {
        self.by_location.len()
    }

    fn nearest(
        &self,
        location: &str,
        anchor: DateTime<Utc>,
        config: &JoinConfig,
    ) -> ObservationSnapshot {
        let series = match self.by_location.get(location) {
            Some(series) if !series.is_empty() => series,
            _ => return ObservationSnapshot::Absent(AbsentReason::NoObservationsForKey),
        };

        // First observation at or after the anchor
        let idx = series.partition_point(|obs| obs.observed_at < anchor);
        let before = idx.checked_sub(1).map(|i| series[i]);
        let after = series.get(idx).copied();

        let chosen = match (before, after) {
            (Some(b), Some(a)) => {
                let distance_before = anchor - b.observed_at;
                let distance_after = a.observed_at - anchor;
                match distance_before.cmp(&distance_after) {
                    Ordering::Less => b,
                    Ordering::Greater => a,
                    Ordering::Equal => match config.tie_break {
                        TieBreak::PreferEarlier => b,
                        TieBreak::PreferLater => a,
                    },
                }
            }
            (Some(b), None) => b,
            (None, Some(a)) => a,
            (None, None) => {
                return ObservationSnapshot::Absent(AbsentReason::NoObservationsForKey)
            }
        };

        let distance = absolute_distance(anchor, chosen.observed_at);
        if distance > config.tolerance {
            return ObservationSnapshot::Absent(AbsentReason::OutsideTolerance);
        }

        ObservationSnapshot::Matched(MatchedObservation {
            observed_at: chosen.observed_at,
            distance,
            attributes: chosen.attributes.clone(),
        })
    }
}

fn absolute_distance(a: DateTime<Utc>, b: DateTime<Utc>) -> Duration {
    if a >= b {
        a - b
    } else {
        b - a
    }
}

/// Total order on observations of one location: timestamp, then content
fn compare_observations(a: &SecondaryObservation, b: &SecondaryObservation) -> Ordering {
    a.observed_at.cmp(&b.observed_at).then_with(|| {
        let mut left = a.attributes.iter();
        let mut right = b.attributes.iter();
        loop {
            match (left.next(), right.next()) {
                (Some((ka, va)), Some((kb, vb))) => {
                    let ord = ka.cmp(kb).then_with(|| va.total_cmp(vb));
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                (Some(_), None) => return Ordering::Greater,
                (None, Some(_)) => return Ordering::Less,
                (None, None) => return Ordering::Equal,
            }
        }
    })
}

/// Order primaries by key and content, keep the first of each `unique_key`
fn dedupe_primaries(primaries: &[PrimaryRecord]) -> (Vec<&PrimaryRecord>, usize) {
    let mut sorted: Vec<&PrimaryRecord> = primaries.iter().collect();
    sorted.sort_by(|a, b| {
        a.unique_key()
            .cmp(b.unique_key())
            .then_with(|| a.scheduled_departure().cmp(&b.scheduled_departure()))
            .then_with(|| a.scheduled_arrival().cmp(&b.scheduled_arrival()))
            .then_with(|| a.flight_id().cmp(&b.flight_id()))
            .then_with(|| a.airline_name().cmp(&b.airline_name()))
    });

    let mut kept: Vec<&PrimaryRecord> = Vec::with_capacity(sorted.len());
    let mut dropped = 0;
    for record in sorted {
        match kept.last() {
            Some(last) if last.unique_key() == record.unique_key() => {
                dropped += 1;
                warn!(
                    unique_key = %record.unique_key(),
                    flight_id = record.flight_id().unwrap_or("-"),
                    "Duplicate unique_key in primary series, keeping first"
                );
            }
            _ => kept.push(record),
        }
    }
    (kept, dropped)
}
