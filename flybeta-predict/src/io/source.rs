//! Input series: field-rename contract, prefilters and the JSON-lines reader
//!
//! Raw rows are mapped to canonical names before anything else looks at them.
//! Rows that already use canonical names are accepted as-is.

use crate::error::SourceError;
use crate::models::{PrimaryRecord, SecondaryObservation};
use async_trait::async_trait;
use flybeta_common::time::parse_timestamp;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Raw → canonical flight field names
pub const FLIGHT_FIELD_RENAMES: &[(&str, &str)] = &[
    ("flightID", "flight_id"),
    ("airlineName", "airline_name"),
    ("airlineIataCode", "airline_iata_code"),
    ("scheduledDepartureTime", "sched_dep_time"),
    ("scheduledArrivalTime", "sched_arr_time"),
    ("originAirportIata", "originIata"),
    ("destinationAirportIata", "destIata"),
];

/// Raw → canonical weather field names
pub const WEATHER_FIELD_RENAMES: &[(&str, &str)] = &[
    ("iata_code", "airport_iata"),
    ("datetime", "datetime"),
    ("visibility", "visibility_km"),
    ("precipitation", "precip_mm"),
    ("precipitation_probability", "precip_prob_pct"),
    ("wind_speed", "wind_speed_kmph"),
    ("wind_direction", "wind_dir_deg"),
    ("temperature", "temp_c"),
    ("humidity", "humidity_pct"),
    ("pressure", "pressure_mb"),
    ("cloud_cover", "cloud_cover_pct"),
];

/// Canonical weather attributes carried onto observations
pub const WEATHER_ATTRIBUTE_FIELDS: &[&str] = &[
    "visibility_km",
    "precip_mm",
    "precip_prob_pct",
    "wind_speed_kmph",
    "wind_dir_deg",
    "temp_c",
    "humidity_pct",
    "pressure_mb",
    "cloud_cover_pct",
];

/// Private and charter operators excluded from scoring
pub const DEFAULT_EXCLUDED_AIRLINES: &[&str] = &["PRIVATE OWNER", "ANAP JETS"];

const FLIGHTS: &str = "flights";
const WEATHER: &str = "weather";

/// Records read from one series plus row accounting
#[derive(Debug, Clone)]
pub struct SourceBatch<T> {
    pub records: Vec<T>,
    /// Rows that violated the rename contract or could not be parsed
    pub rejected: usize,
    /// Valid rows dropped by a prefilter
    pub filtered: usize,
}

impl<T> SourceBatch<T> {
    pub fn new(records: Vec<T>) -> Self {
        Self {
            records,
            rejected: 0,
            filtered: 0,
        }
    }
}

/// Supplier of the two input series
#[async_trait]
pub trait SourceReader: Send + Sync {
    async fn read_flights(&self) -> Result<SourceBatch<PrimaryRecord>, SourceError>;

    async fn read_weather(&self) -> Result<SourceBatch<SecondaryObservation>, SourceError>;
}

/// Rename raw keys to canonical ones; unknown keys pass through untouched
pub fn rename_fields(row: Map<String, Value>, renames: &[(&str, &str)]) -> Map<String, Value> {
    row.into_iter()
        .map(|(key, value)| {
            let canonical = renames
                .iter()
                .find(|(raw, _)| *raw == key)
                .map(|(_, canonical)| canonical.to_string())
                .unwrap_or(key);
            (canonical, value)
        })
        .collect()
}

/// Build a flight from a canonical row
pub fn flight_from_row(row: &Map<String, Value>) -> Result<PrimaryRecord, String> {
    let carrier = required_str(row, "airline_iata_code")?;
    let origin = required_str(row, "originIata")?;
    let destination = required_str(row, "destIata")?;
    let departure = required_time(row, "sched_dep_time")?;
    let arrival = required_time(row, "sched_arr_time")?;

    let mut flight = PrimaryRecord::new(carrier, origin, destination, departure, arrival);
    if let Some(flight_id) = optional_text(row, "flight_id") {
        flight = flight.with_flight_id(flight_id);
    }
    if let Some(airline_name) = optional_text(row, "airline_name") {
        flight = flight.with_airline_name(airline_name);
    }
    Ok(flight)
}

/// Build an observation from a canonical row; null or non-numeric attributes are omitted
pub fn observation_from_row(row: &Map<String, Value>) -> Result<SecondaryObservation, String> {
    let location = required_str(row, "airport_iata")?;
    let observed_at = required_time(row, "datetime")?;

    let mut observation = SecondaryObservation::new(location, observed_at);
    for field in WEATHER_ATTRIBUTE_FIELDS {
        if let Some(value) = row.get(*field).and_then(numeric_value) {
            observation = observation.with_attribute(*field, value);
        }
    }
    Ok(observation)
}

fn required_str<'a>(row: &'a Map<String, Value>, field: &str) -> Result<&'a str, String> {
    match row.get(field) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.trim()),
        Some(Value::Null) | None => Err(format!("missing '{}'", field)),
        Some(other) => Err(format!("'{}' must be a non-empty string, got {}", field, other)),
    }
}

fn required_time(
    row: &Map<String, Value>,
    field: &str,
) -> Result<chrono::DateTime<chrono::Utc>, String> {
    let raw = required_str(row, field)?;
    parse_timestamp(raw).map_err(|e| format!("'{}': {}", field, e))
}

fn optional_text(row: &Map<String, Value>, field: &str) -> Option<String> {
    match row.get(field)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn numeric_value(value: &Value) -> Option<f64> {
    let v = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    v.is_finite().then_some(v)
}

/// Prefilters applied to flights after parsing
#[derive(Debug, Clone, PartialEq)]
pub struct RecordFilter {
    /// Upper-cased airline names never scored
    exclude_airlines: HashSet<String>,
    /// When set, both endpoints must be listed
    allowed_airports: Option<HashSet<String>>,
}

impl Default for RecordFilter {
    fn default() -> Self {
        Self::new(
            DEFAULT_EXCLUDED_AIRLINES.iter().map(|s| s.to_string()),
            None,
        )
    }
}

impl RecordFilter {
    pub fn new(
        exclude_airlines: impl IntoIterator<Item = String>,
        allowed_airports: Option<Vec<String>>,
    ) -> Self {
        Self {
            exclude_airlines: exclude_airlines
                .into_iter()
                .map(|a| a.trim().to_uppercase())
                .collect(),
            allowed_airports: allowed_airports.map(|airports| {
                airports
                    .into_iter()
                    .map(|a| a.trim().to_uppercase())
                    .collect()
            }),
        }
    }

    /// Filter that admits every flight with distinct endpoints
    pub fn permissive() -> Self {
        Self::new(Vec::new(), None)
    }

    /// Why a flight is dropped, or `None` to keep it
    pub fn rejection_reason(&self, flight: &PrimaryRecord) -> Option<&'static str> {
        if let Some(name) = flight.airline_name() {
            if self.exclude_airlines.contains(&name.to_uppercase()) {
                return Some("excluded airline");
            }
        }
        if let Some(allowed) = &self.allowed_airports {
            if !allowed.contains(&flight.origin().to_uppercase())
                || !allowed.contains(&flight.destination().to_uppercase())
            {
                return Some("airport not in allow-list");
            }
        }
        if flight.origin().eq_ignore_ascii_case(flight.destination()) {
            return Some("origin equals destination");
        }
        None
    }
}

/// Reads both series from JSON-lines files
#[derive(Debug, Clone)]
pub struct JsonLinesSource {
    flights_path: PathBuf,
    weather_path: PathBuf,
    filter: RecordFilter,
}

impl JsonLinesSource {
    pub fn new(flights_path: impl Into<PathBuf>, weather_path: impl Into<PathBuf>) -> Self {
        Self {
            flights_path: flights_path.into(),
            weather_path: weather_path.into(),
            filter: RecordFilter::default(),
        }
    }

    pub fn with_filter(mut self, filter: RecordFilter) -> Self {
        self.filter = filter;
        self
    }
}

#[async_trait]
impl SourceReader for JsonLinesSource {
    async fn read_flights(&self) -> Result<SourceBatch<PrimaryRecord>, SourceError> {
        let mut batch =
            read_series(&self.flights_path, FLIGHTS, FLIGHT_FIELD_RENAMES, flight_from_row).await?;

        let before = batch.records.len();
        batch.records.retain(|flight| match self.filter.rejection_reason(flight) {
            Some(reason) => {
                tracing::debug!(unique_key = flight.unique_key(), reason, "Flight filtered out");
                false
            }
            None => true,
        });
        batch.filtered = before - batch.records.len();

        tracing::info!(
            path = %self.flights_path.display(),
            kept = batch.records.len(),
            filtered = batch.filtered,
            rejected = batch.rejected,
            "Read flights"
        );
        Ok(batch)
    }

    async fn read_weather(&self) -> Result<SourceBatch<SecondaryObservation>, SourceError> {
        let batch = read_series(
            &self.weather_path,
            WEATHER,
            WEATHER_FIELD_RENAMES,
            observation_from_row,
        )
        .await?;

        tracing::info!(
            path = %self.weather_path.display(),
            observations = batch.records.len(),
            rejected = batch.rejected,
            "Read weather observations"
        );
        Ok(batch)
    }
}

/// Parse every non-blank line; bad rows are logged and counted, not fatal
async fn read_series<T>(
    path: &Path,
    series: &str,
    renames: &[(&str, &str)],
    build: fn(&Map<String, Value>) -> Result<T, String>,
) -> Result<SourceBatch<T>, SourceError> {
    let content = tokio::fs::read(path)
        .await
        .map_err(|e| SourceError::Unavailable {
            series: series.to_string(),
            detail: format!("{}: {}", path.display(), e),
        })?;

    let mut batch = SourceBatch::new(Vec::new());
    for (index, raw) in content.split(|b| *b == b'\n').enumerate() {
        // Encoding errors reject only the affected line
        let parsed = match std::str::from_utf8(raw) {
            Ok(line) if line.trim().is_empty() => continue,
            Ok(line) => match serde_json::from_str::<Value>(line) {
                Ok(Value::Object(row)) => build(&rename_fields(row, renames)),
                Ok(_) => Err("expected a JSON object".to_string()),
                Err(e) => Err(e.to_string()),
            },
            Err(e) => Err(format!("invalid UTF-8: {}", e)),
        };

        match parsed {
            Ok(record) => batch.records.push(record),
            Err(detail) => {
                let err = SourceError::InvalidRecord {
                    series: series.to_string(),
                    line: index + 1,
                    detail,
                };
                tracing::warn!(error = %err, "Skipping input row");
                batch.rejected += 1;
            }
        }
    }
    Ok(batch)
}
