//! Input records: scheduled flights (primary series) and weather observations
//! (secondary series)

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Deterministic per-batch identity of a flight
///
/// Format: `{carrier}_{YYYY-MM-DD}_{origin}_{destination}`, with the date taken
/// from the scheduled departure (UTC).
pub fn build_unique_key(
    carrier: &str,
    scheduled_departure: &DateTime<Utc>,
    origin: &str,
    destination: &str,
) -> String {
    format!(
        "{}_{}_{}_{}",
        carrier,
        scheduled_departure.format("%Y-%m-%d"),
        origin,
        destination
    )
}

/// Scheduled flight
///
/// Fields are private so the derived `unique_key` and `route` can never drift
/// from the identifying fields after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct PrimaryRecord {
    flight_id: Option<String>,
    airline_name: Option<String>,
    carrier: String,
    origin: String,
    destination: String,
    scheduled_departure: DateTime<Utc>,
    scheduled_arrival: DateTime<Utc>,
    route: String,
    unique_key: String,
}

impl PrimaryRecord {
    pub fn new(
        carrier: impl Into<String>,
        origin: impl Into<String>,
        destination: impl Into<String>,
        scheduled_departure: DateTime<Utc>,
        scheduled_arrival: DateTime<Utc>,
    ) -> Self {
        let carrier = carrier.into();
        let origin = origin.into();
        let destination = destination.into();
        let unique_key = build_unique_key(&carrier, &scheduled_departure, &origin, &destination);
        let route = format!("{}-{}", origin, destination);

        Self {
            flight_id: None,
            airline_name: None,
            carrier,
            origin,
            destination,
            scheduled_departure,
            scheduled_arrival,
            route,
            unique_key,
        }
    }

    pub fn with_flight_id(mut self, flight_id: impl Into<String>) -> Self {
        self.flight_id = Some(flight_id.into());
        self
    }

    pub fn with_airline_name(mut self, airline_name: impl Into<String>) -> Self {
        self.airline_name = Some(airline_name.into());
        self
    }

    pub fn flight_id(&self) -> Option<&str> {
        self.flight_id.as_deref()
    }

    pub fn airline_name(&self) -> Option<&str> {
        self.airline_name.as_deref()
    }

    pub fn carrier(&self) -> &str {
        &self.carrier
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }

    pub fn scheduled_departure(&self) -> DateTime<Utc> {
        self.scheduled_departure
    }

    pub fn scheduled_arrival(&self) -> DateTime<Utc> {
        self.scheduled_arrival
    }

    /// `{origin}-{destination}`
    pub fn route(&self) -> &str {
        &self.route
    }

    pub fn unique_key(&self) -> &str {
        &self.unique_key
    }
}

/// Weather observation at one airport
#[derive(Debug, Clone, PartialEq)]
pub struct SecondaryObservation {
    /// Airport IATA code
    pub location: String,
    pub observed_at: DateTime<Utc>,
    /// Canonical attribute name → value (e.g. `temp_c`, `wind_speed_kmph`)
    pub attributes: BTreeMap<String, f64>,
}

impl SecondaryObservation {
    pub fn new(location: impl Into<String>, observed_at: DateTime<Utc>) -> Self {
        Self {
            location: location.into(),
            observed_at,
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: f64) -> Self {
        self.attributes.insert(name.into(), value);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_unique_key_format() {
        let dep = Utc.with_ymd_and_hms(2024, 1, 1, 23, 45, 0).unwrap();
        let arr = Utc.with_ymd_and_hms(2024, 1, 2, 0, 50, 0).unwrap();
        let record = PrimaryRecord::new("AA", "LOS", "ABV", dep, arr);

        assert_eq!(record.unique_key(), "AA_2024-01-01_LOS_ABV");
        assert_eq!(record.route(), "LOS-ABV");
    }

    #[test]
    fn test_unique_key_ignores_optional_fields() {
        let dep = Utc.with_ymd_and_hms(2024, 3, 5, 8, 0, 0).unwrap();
        let arr = Utc.with_ymd_and_hms(2024, 3, 5, 9, 10, 0).unwrap();
        let plain = PrimaryRecord::new("W3", "ABV", "KAN", dep, arr);
        let detailed = PrimaryRecord::new("W3", "ABV", "KAN", dep, arr)
            .with_flight_id("W3-100")
            .with_airline_name("ARIK AIR");

        assert_eq!(plain.unique_key(), detailed.unique_key());
        assert_eq!(detailed.flight_id(), Some("W3-100"));
        assert_eq!(detailed.airline_name(), Some("ARIK AIR"));
    }
}
