use chrono::NaiveDate;
use reqwest::blocking::Client;
use serde::Serialize;
use serde_json::Value;

use crate::model::{Backend, Coordinates, WeatherDay};

use super::{ProviderError, execute_json_request};

const FORECAST_ENDPOINT: &str = "https://api.open-meteo.com/v1/forecast";
const ARCHIVE_ENDPOINT: &str = "https://archive-api.open-meteo.com/v1/archive";
pub const DAILY_FIELDS: &str =
    "temperature_2m_max,temperature_2m_min,precipitation_sum,windspeed_10m_max,weathercode";

#[derive(Debug, Serialize)]
struct DailyQuery<'a> {
    latitude: f64,
    longitude: f64,
    start_date: String,
    end_date: String,
    daily: &'a str,
    timezone: &'a str,
}

pub fn endpoint(backend: Backend) -> &'static str {
    match backend {
        Backend::Forecast => FORECAST_ENDPOINT,
        Backend::Archive => ARCHIVE_ENDPOINT,
    }
}

pub fn fetch_daily(
    client: &Client,
    backend: Backend,
    coords: Coordinates,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Value, ProviderError> {
    let query = DailyQuery {
        latitude: coords.lat,
        longitude: coords.lon,
        start_date: start.to_string(),
        end_date: end.to_string(),
        daily: DAILY_FIELDS,
        timezone: "auto",
    };

    execute_json_request(client.get(endpoint(backend)).query(&query))
}

/// Days parsed from a daily payload, plus how many entries were dropped
/// because their date did not parse.
#[derive(Debug, Clone, PartialEq)]
pub struct DailySeries {
    pub days: Vec<WeatherDay>,
    pub skipped_days: usize,
}

/// Walks `daily.time` and reads the other arrays by the same index. A bad
/// date drops the day; a bad or missing value only blanks that field.
pub fn parse_daily_payload(payload: &Value) -> DailySeries {
    let empty = Value::Null;
    let daily = payload.get("daily").unwrap_or(&empty);
    let times = daily
        .get("time")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let tmin = daily_array(daily, &["temperature_2m_min"]);
    let tmax = daily_array(daily, &["temperature_2m_max"]);
    let precip = daily_array(daily, &["precipitation_sum"]);
    let wind = daily_array(daily, &["windspeed_10m_max", "wind_speed_10m_max"]);
    let code = daily_array(daily, &["weathercode", "weather_code"]);

    let mut days = Vec::with_capacity(times.len());
    let mut skipped_days = 0;
    for (index, time) in times.iter().enumerate() {
        let Some(date) = time
            .as_str()
            .and_then(|raw| NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok())
        else {
            skipped_days += 1;
            continue;
        };

        days.push(WeatherDay {
            date,
            temp_min_c: float_at(tmin, index),
            temp_max_c: float_at(tmax, index),
            precipitation_mm: float_at(precip, index),
            wind_max_kmh: float_at(wind, index),
            weather_code: int_at(code, index),
        });
    }

    DailySeries { days, skipped_days }
}

fn daily_array<'a>(daily: &'a Value, names: &[&str]) -> &'a [Value] {
    names
        .iter()
        .find_map(|name| daily.get(*name).and_then(Value::as_array))
        .map(Vec::as_slice)
        .unwrap_or_default()
}

fn float_at(values: &[Value], index: usize) -> Option<f64> {
    let value = match values.get(index)? {
        Value::Number(number) => number.as_f64(),
        Value::String(raw) => raw.trim().parse::<f64>().ok(),
        _ => None,
    };
    value.filter(|value| value.is_finite())
}

fn int_at(values: &[Value], index: usize) -> Option<i32> {
    let value = match values.get(index)? {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().filter(|v| v.is_finite()).map(|v| v.trunc() as i64)),
        Value::String(raw) => raw.trim().parse::<i64>().ok(),
        _ => None,
    };
    value.and_then(|value| i32::try_from(value).ok())
}
