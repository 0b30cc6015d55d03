use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::config::MAX_FALLBACK_YEARS_BACK;
use crate::error::WeatherError;

/// WGS84 coordinates in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Five decimals, the precision every cache key uses.
    pub fn key_label(&self) -> String {
        format!("{:.5},{:.5}", self.lat, self.lon)
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4},{:.4}", self.lat, self.lon)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherDay {
    pub date: NaiveDate,
    pub temp_min_c: Option<f64>,
    pub temp_max_c: Option<f64>,
    pub precipitation_mm: Option<f64>,
    pub wind_max_kmh: Option<f64>,
    pub weather_code: Option<i32>,
}

impl WeatherDay {
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            temp_min_c: None,
            temp_max_c: None,
            precipitation_mm: None,
            wind_max_kmh: None,
            weather_code: None,
        }
    }
}

/// Upstream daily endpoint a fetch goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    Forecast,
    Archive,
}

impl Backend {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Forecast => "forecast",
            Self::Archive => "archive",
        }
    }

    pub fn source(self) -> ProfileSource {
        match self {
            Self::Forecast => ProfileSource::Forecast,
            Self::Archive => ProfileSource::Archive,
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolved weather strategy for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeatherMode {
    Forecast,
    Archive,
    HistoricalFallback,
}

impl WeatherMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Forecast => "forecast",
            Self::Archive => "archive",
            Self::HistoricalFallback => "historical_fallback",
        }
    }
}

impl fmt::Display for WeatherMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mode as requested by a caller; `Auto` lets the classifier decide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestedMode {
    #[default]
    Auto,
    Fixed(WeatherMode),
}

impl FromStr for RequestedMode {
    type Err = WeatherError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "auto" => Ok(Self::Auto),
            "forecast" => Ok(Self::Fixed(WeatherMode::Forecast)),
            "archive" => Ok(Self::Fixed(WeatherMode::Archive)),
            "historical_fallback" => Ok(Self::Fixed(WeatherMode::HistoricalFallback)),
            other => Err(WeatherError::InvalidMode(other.to_string())),
        }
    }
}

/// Provenance of a profile. `ArchiveYear` tags a single reference year
/// fetched while building an estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum ProfileSource {
    Forecast,
    Archive,
    HistoricalFallback,
    ArchiveYear(i32),
}

impl fmt::Display for ProfileSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Forecast => f.write_str("forecast"),
            Self::Archive => f.write_str("archive"),
            Self::HistoricalFallback => f.write_str("historical_fallback"),
            Self::ArchiveYear(year) => write!(f, "archive-{year}"),
        }
    }
}

impl From<ProfileSource> for String {
    fn from(value: ProfileSource) -> Self {
        value.to_string()
    }
}

impl TryFrom<String> for ProfileSource {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "forecast" => Ok(Self::Forecast),
            "archive" => Ok(Self::Archive),
            "historical_fallback" => Ok(Self::HistoricalFallback),
            other => other
                .strip_prefix("archive-")
                .and_then(|year| year.parse::<i32>().ok())
                .map(Self::ArchiveYear)
                .ok_or_else(|| format!("unknown profile source: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherProfile {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub days: Vec<WeatherDay>,
    pub temp_min_c: Option<f64>,
    pub temp_max_c: Option<f64>,
    pub precip_total_mm: Option<f64>,
    pub rainy_days: Option<u32>,
    pub wind_max_kmh: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<Value>,
    pub source: ProfileSource,
    pub is_estimate: bool,
    #[serde(default)]
    pub reference_years: Vec<i32>,
}

impl WeatherProfile {
    /// Un-aggregated profile; `is_estimate` follows from `source`.
    pub fn new(
        start_date: NaiveDate,
        end_date: NaiveDate,
        days: Vec<WeatherDay>,
        source: ProfileSource,
    ) -> Self {
        Self {
            start_date,
            end_date,
            days,
            temp_min_c: None,
            temp_max_c: None,
            precip_total_mm: None,
            rainy_days: None,
            wind_max_kmh: None,
            raw: None,
            source,
            is_estimate: source == ProfileSource::HistoricalFallback,
            reference_years: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spot {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub tags: Map<String, Value>,
    pub activity: Option<String>,
    pub distance_km: Option<f64>,
    pub travel_time_min: Option<f64>,
    pub score: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LocationQuery {
    Destination(String),
    Coordinates(Coordinates),
}

impl LocationQuery {
    pub fn new(
        destination: Option<&str>,
        lat: Option<f64>,
        lon: Option<f64>,
    ) -> Result<Self, ValidationError> {
        let has_destination = destination.is_some();
        let has_coords = lat.is_some() || lon.is_some();

        if has_destination && has_coords {
            return Err(ValidationError::ConflictingLocationInput);
        }

        match (destination, lat, lon) {
            (Some(raw), None, None) => Ok(Self::Destination(normalize_destination(raw)?)),
            (None, Some(lat), Some(lon)) => Ok(Self::Coordinates(validate_coordinates(lat, lon)?)),
            (None, None, None) => Err(ValidationError::MissingLocationInput),
            _ => Err(ValidationError::PartialCoordinates),
        }
    }
}

/// Validated CLI weather request. The date order is checked later by the
/// resolver, which owns the `InvalidRange` condition.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherRequest {
    pub location: LocationQuery,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl WeatherRequest {
    pub fn new(
        destination: Option<&str>,
        lat: Option<f64>,
        lon: Option<f64>,
        start: &str,
        end: &str,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            location: LocationQuery::new(destination, lat, lon)?,
            start: parse_iso_date(start)?,
            end: parse_iso_date(end)?,
        })
    }
}

pub fn normalize_destination(raw: &str) -> Result<String, ValidationError> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(ValidationError::EmptyDestination);
    }
    Ok(value.to_string())
}

pub fn validate_coordinates(lat: f64, lon: f64) -> Result<Coordinates, ValidationError> {
    if !lat.is_finite() || !((-90.0)..=90.0).contains(&lat) {
        return Err(ValidationError::InvalidLatitude(lat));
    }
    if !lon.is_finite() || !((-180.0)..=180.0).contains(&lon) {
        return Err(ValidationError::InvalidLongitude(lon));
    }
    Ok(Coordinates::new(lat, lon))
}

pub fn validate_radius_km(radius_km: f64) -> Result<f64, ValidationError> {
    if !radius_km.is_finite() || radius_km <= 0.0 {
        return Err(ValidationError::InvalidRadius(radius_km));
    }
    Ok(radius_km)
}

pub fn parse_iso_date(raw: &str) -> Result<NaiveDate, ValidationError> {
    let value = raw.trim();
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| ValidationError::InvalidDate(value.to_string()))
}

#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("missing location input: use --destination or --lat/--lon")]
    MissingLocationInput,
    #[error("partial coordinates: provide both --lat and --lon")]
    PartialCoordinates,
    #[error("conflicting location input: use either --destination or --lat/--lon")]
    ConflictingLocationInput,
    #[error("destination must not be empty")]
    EmptyDestination,
    #[error("activity must not be empty")]
    EmptyActivity,
    #[error("invalid latitude: {0}")]
    InvalidLatitude(f64),
    #[error("invalid longitude: {0}")]
    InvalidLongitude(f64),
    #[error("invalid radius: {0} (must be a positive number of km)")]
    InvalidRadius(f64),
    #[error("invalid date '{0}': expected YYYY-MM-DD")]
    InvalidDate(String),
    #[error("invalid years back: {0} (must be between 1 and {max})", max = MAX_FALLBACK_YEARS_BACK)]
    InvalidYearsBack(u32),
    #[error("invalid min years: {min_years} (must be between 1 and years back {years_back})")]
    InvalidMinYears { min_years: usize, years_back: u32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("date")
    }

    #[test]
    fn model_request_accepts_destination_input() {
        let request = WeatherRequest::new(Some("  Barcelona "), None, None, "2026-07-01", "2026-07-05")
            .expect("request");

        assert_eq!(
            request.location,
            LocationQuery::Destination("Barcelona".to_string())
        );
        assert_eq!(request.start, date(2026, 7, 1));
        assert_eq!(request.end, date(2026, 7, 5));
    }

    #[test]
    fn model_request_accepts_coordinate_input() {
        let request = WeatherRequest::new(None, Some(41.39), Some(2.17), "2026-07-01", "2026-07-05")
            .expect("request");

        assert!(matches!(request.location, LocationQuery::Coordinates(_)));
    }

    #[test]
    fn model_rejects_missing_partial_and_conflicting_locations() {
        assert_eq!(
            LocationQuery::new(None, None, None),
            Err(ValidationError::MissingLocationInput)
        );
        assert_eq!(
            LocationQuery::new(None, Some(41.0), None),
            Err(ValidationError::PartialCoordinates)
        );
        assert_eq!(
            LocationQuery::new(Some("Rome"), Some(41.0), Some(12.0)),
            Err(ValidationError::ConflictingLocationInput)
        );
        assert_eq!(
            LocationQuery::new(Some("   "), None, None),
            Err(ValidationError::EmptyDestination)
        );
    }

    #[test]
    fn model_rejects_out_of_range_coordinates() {
        assert_eq!(
            validate_coordinates(91.0, 0.0),
            Err(ValidationError::InvalidLatitude(91.0))
        );
        assert_eq!(
            validate_coordinates(0.0, -181.0),
            Err(ValidationError::InvalidLongitude(-181.0))
        );
    }

    #[test]
    fn model_rejects_malformed_dates() {
        let err = WeatherRequest::new(None, Some(1.0), Some(1.0), "2026-13-01", "2026-07-05")
            .expect_err("must fail");
        assert_eq!(err, ValidationError::InvalidDate("2026-13-01".to_string()));
    }

    #[test]
    fn model_rejects_non_positive_radius() {
        assert_eq!(validate_radius_km(0.0), Err(ValidationError::InvalidRadius(0.0)));
        assert_eq!(validate_radius_km(2.5), Ok(2.5));
    }

    #[test]
    fn requested_mode_parses_known_values_and_rejects_others() {
        assert_eq!("auto".parse::<RequestedMode>().expect("auto"), RequestedMode::Auto);
        assert_eq!(
            "historical_fallback".parse::<RequestedMode>().expect("mode"),
            RequestedMode::Fixed(WeatherMode::HistoricalFallback)
        );

        let err = "weekly".parse::<RequestedMode>().expect_err("must fail");
        assert!(matches!(err, WeatherError::InvalidMode(ref mode) if mode == "weekly"));
    }

    #[test]
    fn profile_source_serializes_as_plain_strings() {
        let value = serde_json::to_value(ProfileSource::HistoricalFallback).expect("json");
        assert_eq!(value, Value::String("historical_fallback".to_string()));

        let year: ProfileSource =
            serde_json::from_value(Value::String("archive-2023".to_string())).expect("source");
        assert_eq!(year, ProfileSource::ArchiveYear(2023));

        assert!(serde_json::from_value::<ProfileSource>(Value::String("nowcast".into())).is_err());
    }

    #[test]
    fn new_profile_marks_only_fallback_as_estimate() {
        let start = date(2026, 7, 1);
        assert!(!WeatherProfile::new(start, start, vec![], ProfileSource::Forecast).is_estimate);
        assert!(
            WeatherProfile::new(start, start, vec![], ProfileSource::HistoricalFallback).is_estimate
        );
    }

    #[test]
    fn coordinates_key_label_uses_five_decimals() {
        assert_eq!(
            Coordinates::new(41.3850639, 2.1734035).key_label(),
            "41.38506,2.17340"
        );
    }
}
