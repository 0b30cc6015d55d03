use std::cmp::Ordering;

use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::cache::Cache;
use crate::geo::haversine_km;
use crate::model::{Coordinates, Spot};
use crate::providers::overpass::{build_around_query, parse_elements, radius_to_meters, tags_with};
use crate::providers::{ProviderApi, ProviderError};

pub const DEFAULT_MAX_ELEMENTS: usize = 80;
pub const DEFAULT_PARKS_RADIUS_KM: f64 = 5.0;
pub const DEFAULT_PARKS_MAX_ELEMENTS: usize = 5;
pub const PARKS_ACTIVITY: &str = "parks";

const HIKING: &[(&str, &str)] = &[
    ("node", r#"["tourism"="viewpoint"]"#),
    ("node", r#"["natural"="peak"]"#),
    ("way", r#"["route"="hiking"]"#),
];
const RUNNING: &[(&str, &str)] = &[
    ("node", r#"["leisure"="park"]"#),
    ("way", r#"["leisure"="park"]"#),
    ("way", r#"["highway"="pedestrian"]"#),
];
const BEACH: &[(&str, &str)] = &[
    ("node", r#"["natural"="beach"]"#),
    ("way", r#"["natural"="beach"]"#),
];
const SIGHTSEEING: &[(&str, &str)] = &[
    ("node", r#"["tourism"="attraction"]"#),
    ("node", r#"["historic"]"#),
    ("node", r#"["amenity"="museum"]"#),
];
const PARKS: &[(&str, &str)] = &[
    ("node", r#"["leisure"="park"]"#),
    ("way", r#"["leisure"="park"]"#),
];

/// Canonical activity for user input in English or German. Anything
/// unrecognized is treated as sightseeing.
pub fn normalize_activity(raw: &str) -> &'static str {
    match raw.trim().to_lowercase().as_str() {
        "wandern" | "hike" | "hiking" => "hiking",
        "laufen" | "joggen" | "jogging" | "running" => "running",
        "strand" | "beach" => "beach",
        _ => "sightseeing",
    }
}

fn selectors_for(activity: &str) -> &'static [(&'static str, &'static str)] {
    match activity {
        "hiking" => HIKING,
        "running" => RUNNING,
        "beach" => BEACH,
        _ => SIGHTSEEING,
    }
}

pub fn query_digest(query: &str) -> String {
    hex::encode(Sha256::digest(query.as_bytes()))
}

pub fn activity_cache_key(activity: &str, coords: Coordinates, radius_km: f64, query: &str) -> String {
    format!(
        "overpass:{activity}:{}:{radius_km:.2}:{}",
        coords.key_label(),
        query_digest(query)
    )
}

pub fn parks_cache_key(coords: Coordinates, radius_km: f64, max_elements: usize) -> String {
    format!(
        "overpass:{PARKS_ACTIVITY}:{}:{radius_km:.2}:{max_elements}",
        coords.key_label()
    )
}

/// Named places around `coords` suited to `activity`.
pub fn get_activity_spots(
    providers: &dyn ProviderApi,
    cache: Option<&dyn Cache>,
    coords: Coordinates,
    radius_km: f64,
    activity: &str,
    max_elements: usize,
) -> Result<Vec<Spot>, ProviderError> {
    let activity = normalize_activity(activity);
    let query = build_around_query(
        selectors_for(activity),
        coords,
        radius_to_meters(radius_km),
        max_elements,
    );
    let key = activity_cache_key(activity, coords, radius_km, &query);

    let payload = fetch_overpass_cached(providers, cache, &key, &query)?;
    let spots = parse_elements(&payload, activity);
    tracing::debug!(activity, count = spots.len(), "activity spots");
    Ok(spots)
}

/// Parks around `coords`, nearest first. Each spot carries its distance in
/// `distance_km` and in the `distance_km` tag.
pub fn get_parks_nearby(
    providers: &dyn ProviderApi,
    cache: Option<&dyn Cache>,
    coords: Coordinates,
    radius_km: f64,
    max_elements: usize,
) -> Result<Vec<Spot>, ProviderError> {
    let query = build_around_query(PARKS, coords, radius_to_meters(radius_km), max_elements);
    let key = parks_cache_key(coords, radius_km, max_elements);

    let payload = fetch_overpass_cached(providers, cache, &key, &query)?;
    let mut parks = parse_elements(&payload, PARKS_ACTIVITY)
        .into_iter()
        .map(|mut spot| {
            let distance_km = haversine_km(coords, Coordinates::new(spot.lat, spot.lon));
            spot.tags = tags_with(spot.tags, "distance_km", distance_km);
            spot.distance_km = Some(distance_km);
            spot
        })
        .collect::<Vec<_>>();
    parks.sort_by(|left, right| {
        let left = left.distance_km.unwrap_or(f64::MAX);
        let right = right.distance_km.unwrap_or(f64::MAX);
        left.partial_cmp(&right).unwrap_or(Ordering::Equal)
    });
    Ok(parks)
}

fn fetch_overpass_cached(
    providers: &dyn ProviderApi,
    cache: Option<&dyn Cache>,
    key: &str,
    query: &str,
) -> Result<Value, ProviderError> {
    if let Some(payload) = cache.and_then(|cache| cache.get(key)) {
        tracing::debug!(%key, "overpass cache hit");
        return Ok(payload);
    }

    let payload = providers.fetch_overpass(query)?;
    if let Some(cache) = cache
        && let Err(error) = cache.set(key, &payload)
    {
        tracing::warn!(%key, %error, "failed to store overpass result in cache");
    }
    Ok(payload)
}
