use crate::model::{WeatherDay, WeatherProfile};

pub const RAINY_DAY_THRESHOLD_MM: f64 = 1.0;

/// Range-level summary of a day sequence. Absent values stay absent: a range
/// with no precipitation readings has no total rather than a zero total.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProfileAggregates {
    pub temp_min_c: Option<f64>,
    pub temp_max_c: Option<f64>,
    pub precip_total_mm: Option<f64>,
    pub rainy_days: u32,
    pub wind_max_kmh: Option<f64>,
}

pub fn aggregate(days: &[WeatherDay]) -> ProfileAggregates {
    let mut precip_total_mm = None;
    let mut rainy_days = 0;
    for precipitation in days.iter().filter_map(|day| day.precipitation_mm) {
        precip_total_mm = Some(precip_total_mm.unwrap_or(0.0) + precipitation);
        if precipitation >= RAINY_DAY_THRESHOLD_MM {
            rainy_days += 1;
        }
    }

    ProfileAggregates {
        temp_min_c: fold_present(days.iter().map(|day| day.temp_min_c), f64::min),
        temp_max_c: fold_present(days.iter().map(|day| day.temp_max_c), f64::max),
        precip_total_mm,
        rainy_days,
        wind_max_kmh: fold_present(days.iter().map(|day| day.wind_max_kmh), f64::max),
    }
}

fn fold_present(
    values: impl Iterator<Item = Option<f64>>,
    combine: fn(f64, f64) -> f64,
) -> Option<f64> {
    values.flatten().reduce(combine)
}

impl WeatherProfile {
    /// Recomputes the range aggregates from the current day sequence.
    pub fn with_aggregates(mut self) -> Self {
        let aggregates = aggregate(&self.days);
        self.temp_min_c = aggregates.temp_min_c;
        self.temp_max_c = aggregates.temp_max_c;
        self.precip_total_mm = aggregates.precip_total_mm;
        self.rainy_days = Some(aggregates.rainy_days);
        self.wind_max_kmh = aggregates.wind_max_kmh;
        self
    }
}
