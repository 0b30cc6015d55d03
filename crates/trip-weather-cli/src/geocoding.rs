use serde_json::json;

use crate::cache::Cache;
use crate::error::AppError;
use crate::model::{Coordinates, normalize_destination};
use crate::providers::ProviderApi;
use crate::providers::nominatim::parse_search_response;

pub fn geocode_cache_key(destination: &str) -> String {
    format!("nominatim:{destination}")
}

/// Resolves a free-text destination to coordinates. Only the `{lat, lon}` of
/// the first hit is cached.
pub fn geocode_destination(
    providers: &dyn ProviderApi,
    cache: Option<&dyn Cache>,
    destination: &str,
) -> Result<Coordinates, AppError> {
    let destination = normalize_destination(destination)?;
    let key = geocode_cache_key(&destination);

    if let Some(cached) = cache.and_then(|cache| cache.get(&key)) {
        match parse_search_response(&cached, &destination) {
            Ok(coords) => return Ok(coords),
            Err(error) => tracing::debug!(%key, %error, "ignoring unusable geocode cache entry"),
        }
    }

    let payload = providers.geocode(&destination)?;
    let coords = parse_search_response(&payload, &destination)?;
    tracing::debug!(%destination, %coords, "geocoded destination");

    if let Some(cache) = cache
        && let Err(error) = cache.set(&key, &json!({"lat": coords.lat, "lon": coords.lon}))
    {
        tracing::warn!(%key, %error, "failed to store geocode result in cache");
    }

    Ok(coords)
}
