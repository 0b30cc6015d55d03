use std::collections::HashSet;

use reqwest::blocking::Client;
use serde_json::{Map, Value};

use crate::model::{Coordinates, Spot};

use super::{ProviderError, execute_json_request};

const INTERPRETER_ENDPOINT: &str = "https://overpass-api.de/api/interpreter";
const QUERY_TIMEOUT_SECS: u32 = 25;

pub fn fetch_interpreter(client: &Client, query: &str) -> Result<Value, ProviderError> {
    execute_json_request(client.post(INTERPRETER_ENDPOINT).form(&[("data", query)]))
}

/// Overpass QL union of `selectors` around a point, each selector given as
/// `(element, filter)`, e.g. `("node", r#"["natural"="peak"]"#)`.
pub fn build_around_query(
    selectors: &[(&str, &str)],
    center: Coordinates,
    radius_m: u32,
    max_elements: usize,
) -> String {
    let parts = selectors
        .iter()
        .map(|(element, filter)| {
            format!(
                "  {element}{filter}(around:{radius_m},{},{});",
                center.lat, center.lon
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!("[out:json][timeout:{QUERY_TIMEOUT_SECS}];\n(\n{parts}\n);\nout center {max_elements};")
}

pub fn radius_to_meters(radius_km: f64) -> u32 {
    (radius_km.max(1.0) * 1000.0).round() as u32
}

/// Named elements with usable coordinates, de-duplicated by lower-cased name
/// and coordinates rounded to 5 decimals. Ways fall back to their `center`.
pub fn parse_elements(payload: &Value, activity: &str) -> Vec<Spot> {
    let elements = payload
        .get("elements")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let mut seen = HashSet::new();
    let mut spots = Vec::new();
    for element in elements {
        let tags = element
            .get("tags")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        let Some(name) = tags
            .get("name")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
        else {
            continue;
        };
        let Some((lat, lon)) = element_position(element) else {
            continue;
        };

        let dedup_key = (name.to_lowercase(), round5_key(lat), round5_key(lon));
        if !seen.insert(dedup_key) {
            continue;
        }

        spots.push(Spot {
            name,
            lat,
            lon,
            tags,
            activity: Some(activity.to_string()),
            distance_km: None,
            travel_time_min: None,
            score: None,
        });
    }

    spots
}

fn element_position(element: &Value) -> Option<(f64, f64)> {
    let direct = number_pair(element);
    direct.or_else(|| element.get("center").and_then(number_pair))
}

fn number_pair(value: &Value) -> Option<(f64, f64)> {
    let lat = value.get("lat").and_then(Value::as_f64)?;
    let lon = value.get("lon").and_then(Value::as_f64)?;
    Some((lat, lon))
}

fn round5_key(value: f64) -> i64 {
    (value * 100_000.0).round() as i64
}

pub fn tags_with(mut tags: Map<String, Value>, key: &str, value: f64) -> Map<String, Value> {
    if let Some(number) = serde_json::Number::from_f64(value) {
        tags.insert(key.to_string(), Value::Number(number));
    }
    tags
}
