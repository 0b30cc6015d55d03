use chrono::{Days, NaiveDate};

use crate::error::WeatherError;
use crate::model::{RequestedMode, WeatherMode};

/// Picks the weather strategy for `[start, end]` as seen from `today`.
///
/// A fixed mode is returned as-is. In auto mode a range that ended before
/// today goes to the archive, a range ending within `horizon_days` of today
/// goes to the live forecast, and anything later is estimated from past years.
pub fn classify(
    today: NaiveDate,
    start: NaiveDate,
    end: NaiveDate,
    requested: RequestedMode,
    horizon_days: u32,
) -> Result<WeatherMode, WeatherError> {
    if end < start {
        return Err(WeatherError::InvalidRange { start, end });
    }

    let mode = match requested {
        RequestedMode::Fixed(mode) => mode,
        RequestedMode::Auto => {
            let horizon = today
                .checked_add_days(Days::new(u64::from(horizon_days)))
                .unwrap_or(NaiveDate::MAX);
            if end < today {
                WeatherMode::Archive
            } else if end <= horizon {
                WeatherMode::Forecast
            } else {
                WeatherMode::HistoricalFallback
            }
        }
    };

    Ok(mode)
}
