use chrono::NaiveDate;

use crate::cache::Cache;
use crate::error::WeatherError;
use crate::model::{Backend, Coordinates, WeatherProfile};
use crate::providers::ProviderApi;
use crate::providers::open_meteo::parse_daily_payload;

pub fn daily_cache_key(
    backend: Backend,
    coords: Coordinates,
    start: NaiveDate,
    end: NaiveDate,
) -> String {
    format!(
        "openmeteo:{backend}:daily:{}:{start}:{end}",
        coords.key_label()
    )
}

/// Fetches one daily series from `backend`, reading through `cache`.
///
/// The returned profile carries the parsed days but no aggregates; callers
/// aggregate once they know the final day sequence.
pub fn fetch_daily(
    providers: &dyn ProviderApi,
    cache: Option<&dyn Cache>,
    backend: Backend,
    coords: Coordinates,
    start: NaiveDate,
    end: NaiveDate,
    include_raw: bool,
) -> Result<WeatherProfile, WeatherError> {
    let key = daily_cache_key(backend, coords, start, end);

    let payload = match cache.and_then(|cache| cache.get(&key)) {
        Some(payload) => {
            tracing::debug!(%key, "daily weather cache hit");
            payload
        }
        None => {
            let payload = providers
                .fetch_daily_weather(backend, coords, start, end)
                .map_err(|error| {
                    WeatherError::from_provider(
                        format!("{backend} {} {start}..{end}", coords.key_label()),
                        error,
                    )
                })?;
            if let Some(cache) = cache
                && let Err(error) = cache.set(&key, &payload)
            {
                tracing::warn!(%key, %error, "failed to store daily weather in cache");
            }
            payload
        }
    };

    let series = parse_daily_payload(&payload);
    if series.skipped_days > 0 {
        tracing::debug!(
            %key,
            skipped = series.skipped_days,
            "skipped daily entries with unparseable dates"
        );
    }

    let mut profile = WeatherProfile::new(start, end, series.days, backend.source());
    if include_raw {
        profile.raw = Some(payload);
    }
    Ok(profile)
}
