use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use chrono::{Datelike, NaiveDate};
use serde_json::{Value, json};

use crate::model::{Backend, Coordinates};
use crate::providers::{ProviderApi, ProviderError};

/// Canned upstream. Daily payloads are generated for the requested range:
/// `temperature_2m_max` is the last two digits of the year, every other field
/// is constant, so merged fallback values are easy to predict.
pub(crate) struct FakeProviders {
    pub daily_calls: AtomicUsize,
    pub geocode_calls: AtomicUsize,
    pub overpass_calls: AtomicUsize,
    pub daily_requests: Mutex<Vec<(Backend, NaiveDate, NaiveDate)>>,
    pub overpass_queries: Mutex<Vec<String>>,
    pub failing_years: Vec<i32>,
    pub truncated_years: HashMap<i32, usize>,
    pub daily_error: Option<ProviderError>,
    pub daily_delay: Option<Duration>,
    pub daily_in_flight: AtomicUsize,
    pub daily_max_in_flight: AtomicUsize,
    pub geocode_result: Result<Value, ProviderError>,
    pub overpass_result: Result<Value, ProviderError>,
}

impl FakeProviders {
    pub fn ok() -> Self {
        Self {
            daily_calls: AtomicUsize::new(0),
            geocode_calls: AtomicUsize::new(0),
            overpass_calls: AtomicUsize::new(0),
            daily_requests: Mutex::new(Vec::new()),
            overpass_queries: Mutex::new(Vec::new()),
            failing_years: Vec::new(),
            truncated_years: HashMap::new(),
            daily_error: None,
            daily_delay: None,
            daily_in_flight: AtomicUsize::new(0),
            daily_max_in_flight: AtomicUsize::new(0),
            geocode_result: Ok(json!([{"lat": "41.3828939", "lon": "2.1774322"}])),
            overpass_result: Ok(json!({"elements": []})),
        }
    }

    pub fn failing_years(mut self, years: &[i32]) -> Self {
        self.failing_years = years.to_vec();
        self
    }

    pub fn daily_calls(&self) -> usize {
        self.daily_calls.load(Ordering::SeqCst)
    }

    pub fn daily_max_in_flight(&self) -> usize {
        self.daily_max_in_flight.load(Ordering::SeqCst)
    }

    pub fn geocode_calls(&self) -> usize {
        self.geocode_calls.load(Ordering::SeqCst)
    }

    pub fn overpass_calls(&self) -> usize {
        self.overpass_calls.load(Ordering::SeqCst)
    }
}

impl ProviderApi for FakeProviders {
    fn fetch_daily_weather(
        &self,
        backend: Backend,
        _coords: Coordinates,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Value, ProviderError> {
        self.daily_calls.fetch_add(1, Ordering::SeqCst);
        self.daily_requests
            .lock()
            .expect("lock")
            .push((backend, start, end));

        if let Some(delay) = self.daily_delay {
            let in_flight = self.daily_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.daily_max_in_flight.fetch_max(in_flight, Ordering::SeqCst);
            thread::sleep(delay);
            self.daily_in_flight.fetch_sub(1, Ordering::SeqCst);
        }
        if let Some(error) = &self.daily_error {
            return Err(error.clone());
        }
        if self.failing_years.contains(&start.year()) {
            return Err(ProviderError::Http {
                status: 500,
                reason: Some(format!("simulated failure for {}", start.year())),
            });
        }

        let mut dates = start
            .iter_days()
            .take_while(|date| *date <= end)
            .collect::<Vec<_>>();
        if let Some(len) = self.truncated_years.get(&start.year()) {
            dates.truncate(*len);
        }
        Ok(daily_payload(&dates, f64::from(start.year() % 100)))
    }

    fn geocode(&self, _destination: &str) -> Result<Value, ProviderError> {
        self.geocode_calls.fetch_add(1, Ordering::SeqCst);
        self.geocode_result.clone()
    }

    fn fetch_overpass(&self, query: &str) -> Result<Value, ProviderError> {
        self.overpass_calls.fetch_add(1, Ordering::SeqCst);
        self.overpass_queries
            .lock()
            .expect("lock")
            .push(query.to_string());
        self.overpass_result.clone()
    }
}

pub(crate) fn daily_payload(dates: &[NaiveDate], temp_max: f64) -> Value {
    let len = dates.len();
    json!({
        "daily": {
            "time": dates.iter().map(ToString::to_string).collect::<Vec<_>>(),
            "temperature_2m_max": vec![temp_max; len],
            "temperature_2m_min": vec![10.0; len],
            "precipitation_sum": vec![2.0; len],
            "windspeed_10m_max": vec![20.0; len],
            "weathercode": vec![3; len]
        }
    })
}

pub(crate) fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("date")
}
