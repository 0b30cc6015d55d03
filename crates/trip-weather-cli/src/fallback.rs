use std::collections::BTreeMap;
use std::thread;

use chrono::{Datelike, NaiveDate};
use serde_json::{Map, Value};

use crate::cache::Cache;
use crate::config::{FALLBACK_MIN_YEARS, FALLBACK_YEARS_BACK, MAX_FALLBACK_YEARS_BACK};
use crate::daily::fetch_daily;
use crate::error::WeatherError;
use crate::model::{
    Backend, Coordinates, ProfileSource, ValidationError, WeatherDay, WeatherProfile,
};
use crate::providers::ProviderApi;

/// Archive fetches in flight at once during a fallback.
pub const MAX_PARALLEL_YEARS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FallbackPolicy {
    pub years_back: u32,
    pub min_years: usize,
}

impl Default for FallbackPolicy {
    fn default() -> Self {
        Self {
            years_back: FALLBACK_YEARS_BACK,
            min_years: FALLBACK_MIN_YEARS,
        }
    }
}

impl FallbackPolicy {
    /// Checked constructor for caller input: `years_back` in
    /// `1..=MAX_FALLBACK_YEARS_BACK` and `min_years` in `1..=years_back`.
    pub fn new(years_back: u32, min_years: usize) -> Result<Self, ValidationError> {
        if !(1..=MAX_FALLBACK_YEARS_BACK).contains(&years_back) {
            return Err(ValidationError::InvalidYearsBack(years_back));
        }
        let in_range = usize::try_from(years_back).is_ok_and(|max| (1..=max).contains(&min_years));
        if !in_range {
            return Err(ValidationError::InvalidMinYears {
                min_years,
                years_back,
            });
        }
        Ok(Self {
            years_back,
            min_years,
        })
    }

    /// Years that must succeed; never below one so an estimate always has a
    /// reference year.
    pub fn required_years(&self) -> usize {
        self.min_years.max(1)
    }
}

/// The `years_back` full years before `current_year`, most recent first.
pub fn candidate_years(current_year: i32, years_back: u32) -> Vec<i32> {
    (1..=years_back)
        .filter_map(|offset| i32::try_from(offset).ok())
        .map(|offset| current_year - offset)
        .collect()
}

/// Moves `date` onto `year`, keeping month and day. Feb 29 lands on Feb 28
/// in a non-leap year; any other invalid day is walked back until it fits.
pub fn replace_year_clamped(date: NaiveDate, year: i32) -> Option<NaiveDate> {
    if let Some(mapped) = date.with_year(year) {
        return Some(mapped);
    }
    if date.month() == 2 && date.day() == 29 {
        return NaiveDate::from_ymd_opt(year, 2, 28);
    }
    (1..date.day())
        .rev()
        .find_map(|day| NaiveDate::from_ymd_opt(year, date.month(), day))
}

pub fn date_range_inclusive(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    start.iter_days().take_while(|date| *date <= end).collect()
}

/// Most frequent code; ties go to the smallest code.
pub fn mode_smallest(codes: &[i32]) -> Option<i32> {
    let mut counts = BTreeMap::new();
    for code in codes {
        *counts.entry(*code).or_insert(0_usize) += 1;
    }

    let mut best: Option<(i32, usize)> = None;
    for (code, count) in counts {
        if best.is_none_or(|(_, best_count)| count > best_count) {
            best = Some((code, count));
        }
    }
    best.map(|(code, _)| code)
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0_u32), |(sum, count), value| (sum + value, count + 1));
    (count > 0).then(|| sum / f64::from(count))
}

/// Averages the per-year sequences onto `requested`, matching days by
/// position. A year shorter than `requested` only contributes to the
/// positions it has.
pub fn merge_years(requested: &[NaiveDate], years: &[Vec<WeatherDay>]) -> Vec<WeatherDay> {
    requested
        .iter()
        .enumerate()
        .map(|(index, date)| {
            let at_index = years
                .iter()
                .filter_map(|days| days.get(index))
                .collect::<Vec<_>>();
            let field_mean =
                |field: fn(&WeatherDay) -> Option<f64>| mean(at_index.iter().filter_map(|day| field(day)));
            let codes = at_index
                .iter()
                .filter_map(|day| day.weather_code)
                .collect::<Vec<_>>();

            WeatherDay {
                date: *date,
                temp_min_c: field_mean(|day| day.temp_min_c),
                temp_max_c: field_mean(|day| day.temp_max_c),
                precipitation_mm: field_mean(|day| day.precipitation_mm),
                wind_max_kmh: field_mean(|day| day.wind_max_kmh),
                weather_code: mode_smallest(&codes),
            }
        })
        .collect()
}

/// Estimates `[start, end]` from the same calendar span in past years.
///
/// Years are fetched from the archive in parallel, at most
/// `MAX_PARALLEL_YEARS` at a time; a year that fails is dropped. Fails with
/// `InsufficientHistory` when fewer than `policy.required_years()` remain.
#[allow(clippy::too_many_arguments)]
pub fn synthesize(
    providers: &dyn ProviderApi,
    cache: Option<&dyn Cache>,
    coords: Coordinates,
    start: NaiveDate,
    end: NaiveDate,
    today: NaiveDate,
    policy: &FallbackPolicy,
    include_raw: bool,
) -> Result<WeatherProfile, WeatherError> {
    let plans = candidate_years(today.year(), policy.years_back)
        .into_iter()
        .filter_map(|year| {
            let mapped_start = replace_year_clamped(start, year)?;
            let mapped_end = replace_year_clamped(end, year)?;
            if mapped_end < mapped_start {
                tracing::debug!(year, "remapped range is reversed, skipping year");
                return None;
            }
            Some((year, mapped_start, mapped_end))
        })
        .collect::<Vec<_>>();

    let mut outcomes = Vec::with_capacity(plans.len());
    for batch in plans.chunks(MAX_PARALLEL_YEARS) {
        thread::scope(|scope| {
            let handles = batch
                .iter()
                .map(|&(year, mapped_start, mapped_end)| {
                    let handle = scope.spawn(move || {
                        fetch_daily(
                            providers,
                            cache,
                            Backend::Archive,
                            coords,
                            mapped_start,
                            mapped_end,
                            include_raw,
                        )
                    });
                    (year, handle)
                })
                .collect::<Vec<_>>();

            outcomes.extend(handles.into_iter().map(|(year, handle)| {
                let outcome = handle.join().unwrap_or_else(|_| {
                    Err(WeatherError::Transport {
                        request: format!("archive year {year}"),
                        message: "worker thread panicked".to_string(),
                    })
                });
                (year, outcome)
            }));
        });
    }

    let mut years = Vec::new();
    for (year, outcome) in outcomes {
        match outcome {
            Ok(mut profile) => {
                profile.source = ProfileSource::ArchiveYear(year);
                years.push(profile);
            }
            Err(error) => tracing::warn!(year, %error, "dropping fallback year"),
        }
    }

    let required = policy.required_years();
    if years.len() < required {
        return Err(WeatherError::InsufficientHistory {
            succeeded: years.len(),
            required,
            attempted: plans.len(),
        });
    }

    let reference_years = years
        .iter()
        .filter_map(|profile| match profile.source {
            ProfileSource::ArchiveYear(year) => Some(year),
            _ => None,
        })
        .collect::<Vec<_>>();
    tracing::debug!(?reference_years, "historical fallback years merged");

    let raw = include_raw.then(|| {
        let by_year = years
            .iter_mut()
            .filter_map(|profile| Some((profile.source.to_string(), profile.raw.take()?)))
            .collect::<Map<String, Value>>();
        Value::Object(by_year)
    });

    let sequences = years
        .into_iter()
        .map(|profile| profile.days)
        .collect::<Vec<_>>();
    let days = merge_years(&date_range_inclusive(start, end), &sequences);

    let mut profile =
        WeatherProfile::new(start, end, days, ProfileSource::HistoricalFallback).with_aggregates();
    profile.reference_years = reference_years;
    profile.raw = raw;
    Ok(profile)
}
