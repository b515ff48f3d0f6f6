//! Domain data structures for producer records, tours, and their flattened views.
//!
//! The `Raw*` types mirror the JSON producers upload. All of their fields are
//! optional; read them through the accessor methods, which apply the defaults
//! the dashboards rely on.

use std::fmt;

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::lenient;

/// Producer name used when a record does not carry one.
pub const UNKNOWN_PRODUCER: &str = "Unknown";
/// Vehicle type used when the depot does not describe its vehicle.
pub const UNSPECIFIED_VEHICLE: &str = "Unspecified";
/// Day label used when a tour has no day.
pub const UNDEFINED_DAY: &str = "Undefined";
/// Tour name used when a tour has no name.
pub const UNNAMED_TOUR: &str = "Unnamed";
/// Client label used for stops without a client.
pub const UNKNOWN_CLIENT: &str = "Unknown client";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
/// Identifier for a configured record source.
pub struct SourceId(pub String);

impl fmt::Display for SourceId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
/// Metadata describing a record source and its human-friendly name.
pub struct SourceMeta {
    /// Unique identifier.
    pub id: SourceId,
    /// Display name.
    pub name: String,
}

#[derive(thiserror::Error, Debug)]
/// Reasons a payload could not be turned into [`RawContent`].
pub enum DecodeError {
    /// Textual payload is not JSON.
    #[error("payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// Payload is JSON but not an object.
    #[error("payload is not a JSON object")]
    NotAnObject,
}

/// Longitude/latitude pair, in that order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LonLat {
    /// Longitude in degrees.
    pub lon: f64,
    /// Latitude in degrees.
    pub lat: f64,
}

impl LonLat {
    /// Build a coordinate from longitude and latitude.
    #[must_use]
    pub const fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }
}

/// One row of the remote table.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProducerRecord {
    /// Name of the producer who submitted the tours.
    #[serde(rename = "nom_producteur", default, deserialize_with = "lenient::text")]
    pub producer_name: Option<String>,
    /// Submission timestamp as stored by the table.
    #[serde(default, deserialize_with = "lenient::text")]
    pub created_at: Option<String>,
    /// Depot and tours, either as JSON or as JSON-encoded text.
    #[serde(rename = "data_json", default)]
    pub payload: Option<Payload>,
}

impl ProducerRecord {
    /// Producer name, or [`UNKNOWN_PRODUCER`].
    #[must_use]
    pub fn producer_name(&self) -> &str {
        self.producer_name.as_deref().unwrap_or(UNKNOWN_PRODUCER)
    }

    /// Calendar date of `created_at`, if it can be read.
    #[must_use]
    pub fn sent_on(&self) -> Option<NaiveDate> {
        let raw = self.created_at.as_deref()?.trim();
        if let Ok(timestamp) = DateTime::parse_from_rfc3339(raw) {
            return Some(timestamp.date_naive());
        }
        raw.get(..10)
            .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
    }

    /// Decode the payload. A record without payload has empty content.
    ///
    /// # Errors
    ///
    /// Returns a [`DecodeError`] when the payload is not a JSON object.
    pub fn content(&self) -> Result<RawContent, DecodeError> {
        self.payload
            .as_ref()
            .map_or_else(|| Ok(RawContent::default()), Payload::decode)
    }

    /// First `max_chars` characters of the payload as sent, for display.
    #[must_use]
    pub fn payload_excerpt(&self, max_chars: usize) -> String {
        let raw = match &self.payload {
            None => return String::new(),
            Some(Payload::Text(raw)) => raw.clone(),
            Some(Payload::Json(value)) => value.to_string(),
        };
        if raw.chars().count() <= max_chars {
            raw
        } else {
            let mut cut: String = raw.chars().take(max_chars).collect();
            cut.push('…');
            cut
        }
    }
}

/// Payload column of a producer record.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// JSON-encoded text that still needs parsing.
    Text(String),
    /// Structured JSON.
    Json(Value),
}

impl Payload {
    /// Parse the payload into [`RawContent`].
    ///
    /// # Errors
    ///
    /// Returns a [`DecodeError`] when text is not JSON or the JSON is not an object.
    pub fn decode(&self) -> Result<RawContent, DecodeError> {
        let value = match self {
            Payload::Text(raw) => serde_json::from_str::<Value>(raw)?,
            Payload::Json(value) => value.clone(),
        };
        lenient::coerce_object(value).ok_or(DecodeError::NotAnObject)
    }
}

impl<'de> Deserialize<'de> for Payload {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::String(raw) => Payload::Text(raw),
            other => Payload::Json(other),
        })
    }
}

/// Decoded payload: a depot and the tours leaving from it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawContent {
    /// Depot description.
    #[serde(default, deserialize_with = "lenient::object")]
    pub depot: Option<DepotInfo>,
    /// Tours run from the depot.
    #[serde(default, deserialize_with = "lenient::list")]
    pub tours: Option<Vec<RawTour>>,
}

impl RawContent {
    /// Tours, or an empty slice.
    #[must_use]
    pub fn tours(&self) -> &[RawTour] {
        self.tours.as_deref().unwrap_or_default()
    }

    /// Depot coordinate when both latitude and longitude are usable.
    #[must_use]
    pub fn depot_coordinate(&self) -> Option<LonLat> {
        self.depot
            .as_ref()?
            .location
            .as_ref()
            .and_then(RawLocation::coordinate)
    }

    /// Vehicle type of the depot, or [`UNSPECIFIED_VEHICLE`].
    #[must_use]
    pub fn vehicle_type(&self) -> &str {
        self.depot
            .as_ref()
            .and_then(|depot| depot.vehicle.as_ref())
            .and_then(|vehicle| vehicle.vehicle_type.as_deref())
            .unwrap_or(UNSPECIFIED_VEHICLE)
    }
}

/// Depot block of a payload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DepotInfo {
    /// Depot position.
    #[serde(rename = "pData", default, deserialize_with = "lenient::object")]
    pub location: Option<RawLocation>,
    /// Vehicle based at the depot.
    #[serde(rename = "veh", default, deserialize_with = "lenient::object")]
    pub vehicle: Option<RawVehicle>,
}

/// Latitude/longitude pair as sent by producers.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawLocation {
    /// Latitude in degrees.
    #[serde(default, deserialize_with = "lenient::number")]
    pub lat: Option<f64>,
    /// Longitude in degrees.
    #[serde(default, deserialize_with = "lenient::number")]
    pub lon: Option<f64>,
}

impl RawLocation {
    /// Coordinate when both parts are present. Zero is a valid value.
    #[must_use]
    pub fn coordinate(&self) -> Option<LonLat> {
        Some(LonLat::new(self.lon?, self.lat?))
    }
}

/// Vehicle description of a depot.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawVehicle {
    /// Free-form vehicle type, e.g. "Utilitaire".
    #[serde(rename = "type", default, deserialize_with = "lenient::text")]
    pub vehicle_type: Option<String>,
}

/// One tour of a payload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawTour {
    /// Weekday label, e.g. "Lundi".
    #[serde(default, deserialize_with = "lenient::text")]
    pub day: Option<String>,
    /// Tour name.
    #[serde(default, deserialize_with = "lenient::text")]
    pub name: Option<String>,
    /// Cost, revenue and distance of the tour.
    #[serde(default, deserialize_with = "lenient::object")]
    pub stats: Option<RawStats>,
    /// Ordered stops.
    #[serde(default, deserialize_with = "lenient::list")]
    pub stops: Option<Vec<RawStop>>,
}

impl RawTour {
    /// Day label, or [`UNDEFINED_DAY`].
    #[must_use]
    pub fn day(&self) -> &str {
        self.day.as_deref().unwrap_or(UNDEFINED_DAY)
    }

    /// Tour name, or [`UNNAMED_TOUR`].
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or(UNNAMED_TOUR)
    }

    /// Stops, or an empty slice.
    #[must_use]
    pub fn stops(&self) -> &[RawStop] {
        self.stops.as_deref().unwrap_or_default()
    }

    /// Tour cost, 0 when missing.
    #[must_use]
    pub fn cost(&self) -> f64 {
        self.stats.as_ref().and_then(|stats| stats.cost).unwrap_or(0.0)
    }

    /// Tour revenue, 0 when missing.
    #[must_use]
    pub fn revenue(&self) -> f64 {
        self.stats
            .as_ref()
            .and_then(|stats| stats.revenue)
            .unwrap_or(0.0)
    }

    /// Tour distance in km, 0 when missing.
    #[must_use]
    pub fn distance(&self) -> f64 {
        self.stats
            .as_ref()
            .and_then(|stats| stats.distance)
            .unwrap_or(0.0)
    }
}

/// Aggregate figures reported for a tour.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawStats {
    /// Cost in euros.
    #[serde(default, deserialize_with = "lenient::number")]
    pub cost: Option<f64>,
    /// Revenue ("chiffre d'affaires") in euros.
    #[serde(rename = "ca", default, deserialize_with = "lenient::number")]
    pub revenue: Option<f64>,
    /// Distance in km.
    #[serde(rename = "dist", default, deserialize_with = "lenient::number")]
    pub distance: Option<f64>,
}

/// A delivery stop.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawStop {
    /// Client served at the stop.
    #[serde(default, deserialize_with = "lenient::text")]
    pub client: Option<String>,
    /// Latitude in degrees.
    #[serde(default, deserialize_with = "lenient::number")]
    pub lat: Option<f64>,
    /// Longitude in degrees.
    #[serde(default, deserialize_with = "lenient::number")]
    pub lon: Option<f64>,
    /// Delivered weight in kg.
    #[serde(rename = "vol", default, deserialize_with = "lenient::number")]
    pub volume_kg: Option<f64>,
}

impl RawStop {
    /// Client label, or [`UNKNOWN_CLIENT`].
    #[must_use]
    pub fn client(&self) -> &str {
        self.client.as_deref().unwrap_or(UNKNOWN_CLIENT)
    }

    /// Delivered weight, 0 when missing.
    #[must_use]
    pub fn volume_kg(&self) -> f64 {
        self.volume_kg.unwrap_or(0.0)
    }

    /// Stop position when both latitude and longitude are present.
    #[must_use]
    pub fn coordinate(&self) -> Option<LonLat> {
        Some(LonLat::new(self.lon?, self.lat?))
    }
}

/// Per-tour row of the dashboard table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TourMetric {
    /// Producer running the tour.
    pub producer: String,
    /// Date the record was submitted.
    pub sent_on: Option<NaiveDate>,
    /// Weekday label.
    pub day: String,
    /// Tour name.
    pub tour_name: String,
    /// Vehicle type of the producer's depot.
    pub vehicle_type: String,
    /// Cost in euros.
    pub cost: f64,
    /// Revenue in euros.
    pub revenue: f64,
    /// Distance in km.
    pub distance: f64,
    /// Sum of delivered weights in kg.
    pub total_volume_kg: f64,
    /// Number of stops, located or not.
    pub stop_count: usize,
}

/// A record that contributed no tour, kept for inspection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedRecord {
    /// Producer name, or [`UNKNOWN_PRODUCER`].
    pub producer: String,
    /// Submission timestamp as stored.
    pub created_at: Option<String>,
    /// Why no tour came out of it.
    pub reason: String,
    /// Start of the raw payload.
    pub excerpt: String,
}

/// RGBA color used by the map layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Rgba {
    /// Red channel.
    pub red: u8,
    /// Green channel.
    pub green: u8,
    /// Blue channel.
    pub blue: u8,
    /// Opacity.
    pub alpha: u8,
}

impl Rgba {
    /// Build a color from its channels.
    #[must_use]
    pub const fn new(red: u8, green: u8, blue: u8, alpha: u8) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
/// What a map point stands for.
pub enum PointKind {
    /// Producer depot.
    Depot,
    /// Delivery stop.
    Delivery,
}

/// Marker on the map.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapPoint {
    /// Tooltip text.
    pub label: String,
    /// Position.
    pub coordinates: LonLat,
    /// Fill color.
    pub color: Rgba,
    /// Radius in meters.
    pub radius: u32,
    /// Depot or delivery.
    pub kind: PointKind,
    /// Producer owning the point.
    pub producer: String,
    /// Day of the tour the point belongs to.
    pub day: String,
    /// Vehicle type of the producer.
    pub vehicle_type: String,
}

/// Closed route of one tour, starting and ending at the depot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapPath {
    /// Ordered route vertices.
    pub vertices: Vec<LonLat>,
    /// Stroke color.
    pub color: Rgba,
    /// Tooltip text.
    pub label: String,
    /// Producer running the tour.
    pub producer: String,
    /// Day of the tour.
    pub day: String,
    /// Vehicle type of the producer.
    pub vehicle_type: String,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn record(value: Value) -> ProducerRecord {
        serde_json::from_value(value).expect("record should deserialize")
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let rec = record(json!({}));
        assert_eq!(rec.producer_name(), UNKNOWN_PRODUCER);
        assert!(rec.sent_on().is_none());

        let content = rec.content().expect("no payload is empty content");
        assert!(content.tours().is_empty());
        assert_eq!(content.vehicle_type(), UNSPECIFIED_VEHICLE);
        assert!(content.depot_coordinate().is_none());

        let tour = RawTour::default();
        assert_eq!(tour.day(), UNDEFINED_DAY);
        assert_eq!(tour.name(), UNNAMED_TOUR);
        assert!(tour.cost().abs() < f64::EPSILON);
        assert!(RawStop::default().volume_kg().abs() < f64::EPSILON);
        assert_eq!(RawStop::default().client(), UNKNOWN_CLIENT);
    }

    #[test]
    fn textual_payload_is_parsed() {
        let rec = record(json!({
            "nom_producteur": "Ferme A",
            "data_json": "{\"depot\": {\"veh\": {\"type\": \"Camion\"}}, \"tours\": [{}]}"
        }));
        let content = rec.content().expect("payload is valid JSON");
        assert_eq!(content.vehicle_type(), "Camion");
        assert_eq!(content.tours().len(), 1);
    }

    #[test]
    fn invalid_payloads_are_reported() {
        let rec = record(json!({ "data_json": "not json" }));
        assert!(matches!(rec.content(), Err(DecodeError::Json(_))));

        let rec = record(json!({ "data_json": [1, 2] }));
        assert!(matches!(rec.content(), Err(DecodeError::NotAnObject)));
    }

    #[test]
    fn created_at_accepts_timestamps_and_dates() {
        let rec = record(json!({ "created_at": "2026-01-11T08:30:00.123+00:00" }));
        assert_eq!(rec.sent_on(), NaiveDate::from_ymd_opt(2026, 1, 11));

        let rec = record(json!({ "created_at": "2026-01-12 08:30" }));
        assert_eq!(rec.sent_on(), NaiveDate::from_ymd_opt(2026, 1, 12));

        let rec = record(json!({ "created_at": "yesterday" }));
        assert!(rec.sent_on().is_none());
    }

    #[test]
    fn zero_is_a_valid_coordinate() {
        let location = RawLocation {
            lat: Some(0.0),
            lon: Some(0.0),
        };
        assert_eq!(location.coordinate(), Some(LonLat::new(0.0, 0.0)));

        let half = RawLocation {
            lat: Some(45.0),
            lon: None,
        };
        assert!(half.coordinate().is_none());
    }

    #[test]
    fn wrongly_typed_fields_become_defaults() {
        let rec = record(json!({
            "nom_producteur": 42,
            "data_json": {
                "depot": "nowhere",
                "tours": [
                    { "stats": [1, 2], "stops": "none", "day": null },
                    "garbage"
                ]
            }
        }));
        assert_eq!(rec.producer_name(), "42");

        let content = rec.content().expect("object payload");
        assert!(content.depot.is_none());
        assert_eq!(content.tours().len(), 2);
        let first = content.tours().first().expect("first tour");
        assert!(first.stats.is_none());
        assert!(first.stops().is_empty());
        assert_eq!(first.day(), UNDEFINED_DAY);
    }

    #[test]
    fn english_spellings_next_to_wire_names_are_ignored() {
        let rec = record(json!({
            "nom_producteur": "Ferme E",
            "producer_name": "ignored",
            "data_json": {
                "depot": {
                    "pData": { "lat": 45.0, "lon": 6.0 },
                    "location": { "lat": 1.0, "lon": 1.0 },
                    "veh": { "type": "Camion", "vehicle_type": "Vélo" },
                    "vehicle": { "type": "Vélo" }
                },
                "tours": [{
                    "stats": { "ca": 80, "revenue": 1, "dist": 12, "distance": 2 },
                    "stops": [{ "lat": 45.1, "lon": 6.1, "vol": 50, "volume_kg": 50 }]
                }]
            }
        }));
        assert_eq!(rec.producer_name(), "Ferme E");

        let content = rec.content().expect("object payload");
        assert_eq!(content.depot_coordinate(), Some(LonLat::new(6.0, 45.0)));
        assert_eq!(content.vehicle_type(), "Camion");

        let tour = content.tours().first().expect("one tour");
        assert!((tour.revenue() - 80.0).abs() < f64::EPSILON);
        assert!((tour.distance() - 12.0).abs() < f64::EPSILON);
        let stop = tour.stops().first().expect("one stop");
        assert!((stop.volume_kg() - 50.0).abs() < f64::EPSILON);
        assert_eq!(stop.coordinate(), Some(LonLat::new(6.1, 45.1)));
    }

    #[test]
    fn payload_excerpt_is_truncated() {
        let rec = record(json!({ "data_json": "abcdefghij" }));
        assert_eq!(rec.payload_excerpt(4), "abcd…");
        assert_eq!(rec.payload_excerpt(20), "abcdefghij");

        let rec = record(json!({ "data_json": { "tours": [] } }));
        assert_eq!(rec.payload_excerpt(80), r#"{"tours":[]}"#);
        assert_eq!(record(json!({})).payload_excerpt(10), "");
    }
}
