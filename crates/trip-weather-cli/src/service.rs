use chrono::NaiveDate;

use crate::cache::Cache;
use crate::classifier::classify;
use crate::config::FORECAST_HORIZON_DAYS;
use crate::daily::fetch_daily;
use crate::error::{AppError, WeatherError};
use crate::fallback::{FallbackPolicy, synthesize};
use crate::model::{Backend, Coordinates, RequestedMode, Spot, WeatherMode, WeatherProfile};
use crate::providers::ProviderApi;
use crate::scoring::score_spots;
use crate::spots::{DEFAULT_MAX_ELEMENTS, get_activity_spots};

pub const DEFAULT_RANK_RADIUS_KM: f64 = 15.0;
pub const DEFAULT_TOP_K: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolveOptions {
    pub mode: RequestedMode,
    pub fallback: FallbackPolicy,
    pub include_raw: bool,
    pub forecast_horizon_days: u32,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            mode: RequestedMode::Auto,
            fallback: FallbackPolicy::default(),
            include_raw: false,
            forecast_horizon_days: FORECAST_HORIZON_DAYS,
        }
    }
}

/// Resolves the weather for `[start, end]` at `coords` through the live
/// forecast, the archive, or an estimate built from past years.
pub fn resolve_weather_profile(
    providers: &dyn ProviderApi,
    cache: Option<&dyn Cache>,
    today: NaiveDate,
    coords: Coordinates,
    start: NaiveDate,
    end: NaiveDate,
    options: &ResolveOptions,
) -> Result<WeatherProfile, WeatherError> {
    if end < start {
        return Err(WeatherError::InvalidRange { start, end });
    }

    let mode = classify(
        today,
        start,
        end,
        options.mode,
        options.forecast_horizon_days,
    )?;
    tracing::info!(
        %mode,
        requested = ?options.mode,
        %coords,
        %start,
        %end,
        "resolving weather profile"
    );

    match mode {
        WeatherMode::Forecast => {
            fetch_live(providers, cache, Backend::Forecast, coords, start, end, options)
        }
        WeatherMode::Archive => {
            fetch_live(providers, cache, Backend::Archive, coords, start, end, options)
        }
        WeatherMode::HistoricalFallback => synthesize(
            providers,
            cache,
            coords,
            start,
            end,
            today,
            &options.fallback,
            options.include_raw,
        ),
    }
}

fn fetch_live(
    providers: &dyn ProviderApi,
    cache: Option<&dyn Cache>,
    backend: Backend,
    coords: Coordinates,
    start: NaiveDate,
    end: NaiveDate,
    options: &ResolveOptions,
) -> Result<WeatherProfile, WeatherError> {
    let profile = fetch_daily(
        providers,
        cache,
        backend,
        coords,
        start,
        end,
        options.include_raw,
    )?;
    Ok(profile.with_aggregates())
}

#[derive(Debug, Clone, PartialEq)]
pub struct RankRequest {
    pub coords: Coordinates,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub activity: String,
    pub radius_km: f64,
    pub top_k: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RankedSpots {
    pub weather: WeatherProfile,
    pub spots: Vec<Spot>,
}

/// Weather for the trip dates, spots for the activity, scored and cut to
/// the best `max(1, top_k)`.
pub fn rank_spots(
    providers: &dyn ProviderApi,
    cache: Option<&dyn Cache>,
    today: NaiveDate,
    request: &RankRequest,
    options: &ResolveOptions,
) -> Result<RankedSpots, AppError> {
    let weather = resolve_weather_profile(
        providers,
        cache,
        today,
        request.coords,
        request.start,
        request.end,
        options,
    )?;
    let spots = get_activity_spots(
        providers,
        cache,
        request.coords,
        request.radius_km,
        &request.activity,
        DEFAULT_MAX_ELEMENTS,
    )?;

    let mut ranked = score_spots(request.coords, spots, Some(&weather));
    ranked.truncate(request.top_k.max(1));
    tracing::debug!(count = ranked.len(), "ranked spots");

    Ok(RankedSpots {
        weather,
        spots: ranked,
    })
}
