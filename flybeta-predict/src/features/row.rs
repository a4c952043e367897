//! Named numeric row derived from a joined record

use crate::models::{JoinedRecord, ObservationSnapshot};
use chrono::{Datelike, Timelike};
use std::collections::BTreeMap;

/// Named values available to the feature adapter
///
/// A name that is not in the row is *missing*; missing values are never stored
/// as zero here. Defaults are applied only by the adapter, with a diagnostic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureRow {
    values: BTreeMap<String, f64>,
}

impl FeatureRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule-derived fields plus `origin_*` / `dest_*` weather attributes
    pub fn from_joined(record: &JoinedRecord) -> Self {
        let mut row = Self::new();
        let flight = &record.primary;
        let departure = flight.scheduled_departure();

        row.insert("sched_dep_hour", f64::from(departure.hour()));
        row.insert(
            "sched_dep_dow",
            f64::from(departure.weekday().num_days_from_monday()),
        );
        row.insert("sched_dep_month", f64::from(departure.month()));
        row.insert(
            "sched_block_minutes",
            (flight.scheduled_arrival() - departure).num_minutes() as f64,
        );

        row.insert_snapshot("origin", &record.departure_weather);
        row.insert_snapshot("dest", &record.arrival_weather);
        row
    }

    pub fn insert(&mut self, name: impl Into<String>, value: f64) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn insert_snapshot(&mut self, prefix: &str, snapshot: &ObservationSnapshot) {
        // Absent snapshots contribute nothing
        if let Some(matched) = snapshot.matched() {
            for (name, value) in &matched.attributes {
                self.insert(format!("{}_{}", prefix, name), *value);
            }
            self.insert(
                format!("{}_obs_offset_min", prefix),
                matched.distance.num_seconds() as f64 / 60.0,
            );
        }
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for FeatureRow {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        let mut row = Self::new();
        for (name, value) in iter {
            row.insert(name, value);
        }
        row
    }
}
