use std::collections::HashMap;
use std::path::PathBuf;

pub const CACHE_TTL_SECS: u64 = 24 * 60 * 60;
pub const FORECAST_HORIZON_DAYS: u32 = 16;
pub const PROVIDER_TIMEOUT_SECS: u64 = 30;
pub const FALLBACK_YEARS_BACK: u32 = 10;
pub const FALLBACK_MIN_YEARS: usize = 3;
pub const MAX_FALLBACK_YEARS_BACK: u32 = 50;
pub const DEFAULT_USER_AGENT: &str = concat!("trip-weather-cli/", env!("CARGO_PKG_VERSION"));

pub const CACHE_DIR_ENV: &str = "TRIP_WEATHER_CACHE_DIR";
pub const CACHE_TTL_SECS_ENV: &str = "TRIP_WEATHER_CACHE_TTL_SECS";
pub const NO_CACHE_ENV: &str = "TRIP_WEATHER_NO_CACHE";
pub const FORECAST_HORIZON_DAYS_ENV: &str = "TRIP_WEATHER_FORECAST_HORIZON_DAYS";
pub const TIMEOUT_SECS_ENV: &str = "TRIP_WEATHER_TIMEOUT_SECS";
pub const USER_AGENT_ENV: &str = "TRIP_WEATHER_USER_AGENT";
pub const LOG_FILTER_ENV: &str = "TRIP_WEATHER_LOG";
const XDG_CACHE_HOME_ENV: &str = "XDG_CACHE_HOME";
const HOME_ENV: &str = "HOME";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub cache_dir: PathBuf,
    pub cache_ttl_secs: u64,
    pub cache_enabled: bool,
    pub forecast_horizon_days: u32,
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl RuntimeConfig {
    pub fn from_env() -> Self {
        Self::from_pairs(std::env::vars())
    }

    pub(crate) fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let map: HashMap<String, String> = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            cache_dir: resolve_cache_dir(&map),
            cache_ttl_secs: resolve_positive(&map, CACHE_TTL_SECS_ENV).unwrap_or(CACHE_TTL_SECS),
            cache_enabled: !resolve_flag(&map, NO_CACHE_ENV),
            forecast_horizon_days: resolve_positive(&map, FORECAST_HORIZON_DAYS_ENV)
                .unwrap_or(FORECAST_HORIZON_DAYS),
            timeout_secs: resolve_positive(&map, TIMEOUT_SECS_ENV).unwrap_or(PROVIDER_TIMEOUT_SECS),
            user_agent: non_empty(&map, USER_AGENT_ENV)
                .map(str::to_string)
                .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
        }
    }
}

fn non_empty<'a>(env_map: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    env_map
        .get(key)
        .map(String::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn resolve_cache_dir(env_map: &HashMap<String, String>) -> PathBuf {
    let home = env_map.get(HOME_ENV).map(String::as_str);
    non_empty(env_map, CACHE_DIR_ENV)
        .or_else(|| non_empty(env_map, XDG_CACHE_HOME_ENV))
        .map(|value| expand_home_path(value, home))
        .map(PathBuf::from)
        .unwrap_or_else(std::env::temp_dir)
}

fn expand_home_path(raw: &str, home: Option<&str>) -> String {
    let trimmed = raw.trim();
    let Some(home) = home.map(str::trim).filter(|value| !value.is_empty()) else {
        return trimmed.to_string();
    };

    let home = home.trim_end_matches('/');
    let mut expanded = trimmed.replace("$HOME", home);

    if expanded == "~" {
        expanded = home.to_string();
    } else if let Some(rest) = expanded.strip_prefix("~/") {
        expanded = format!("{home}/{rest}");
    }

    expanded
}

fn resolve_positive<T>(env_map: &HashMap<String, String>, key: &str) -> Option<T>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    non_empty(env_map, key)
        .and_then(|value| value.parse::<T>().ok())
        .filter(|value| *value > T::default())
}

fn resolve_flag(env_map: &HashMap<String, String>, key: &str) -> bool {
    non_empty(env_map, key)
        .map(|value| matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}
