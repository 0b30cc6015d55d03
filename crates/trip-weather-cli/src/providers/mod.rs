use std::time::Duration;

use chrono::NaiveDate;
use reqwest::blocking::{Client, RequestBuilder};
use serde_json::Value;
use thiserror::Error;

use crate::config::RuntimeConfig;
use crate::model::{Backend, Coordinates};

pub mod nominatim;
pub mod open_meteo;
pub mod overpass;

/// Raw upstream access. Every method returns the unprocessed JSON payload so
/// callers can cache it before transforming it.
pub trait ProviderApi: Sync {
    fn fetch_daily_weather(
        &self,
        backend: Backend,
        coords: Coordinates,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Value, ProviderError>;
    fn geocode(&self, destination: &str) -> Result<Value, ProviderError>;
    fn fetch_overpass(&self, query: &str) -> Result<Value, ProviderError>;
}

#[derive(Debug, Clone)]
pub struct HttpProviders {
    client: Client,
}

impl HttpProviders {
    pub fn new(config: &RuntimeConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|error| ProviderError::Transport(error.to_string()))?;

        Ok(Self { client })
    }
}

impl ProviderApi for HttpProviders {
    fn fetch_daily_weather(
        &self,
        backend: Backend,
        coords: Coordinates,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Value, ProviderError> {
        open_meteo::fetch_daily(&self.client, backend, coords, start, end)
    }

    fn geocode(&self, destination: &str) -> Result<Value, ProviderError> {
        nominatim::fetch_search(&self.client, destination)
    }

    fn fetch_overpass(&self, query: &str) -> Result<Value, ProviderError> {
        overpass::fetch_interpreter(&self.client, query)
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("http error ({status}){}", reason_suffix(.reason))]
    Http { status: u16, reason: Option<String> },
    #[error("invalid provider response: {0}")]
    InvalidResponse(String),
    #[error("not found: {0}")]
    NotFound(String),
}

/// Sends the request and parses a JSON body. Status >= 400 becomes
/// `ProviderError::Http` with the upstream's own reason when it sent one.
pub(crate) fn execute_json_request(request: RequestBuilder) -> Result<Value, ProviderError> {
    let response = request
        .send()
        .map_err(|error| ProviderError::Transport(error.to_string()))?;
    let status = response.status();
    let body = response
        .text()
        .map_err(|error| ProviderError::Transport(error.to_string()))?;

    if status.is_client_error() || status.is_server_error() {
        return Err(ProviderError::Http {
            status: status.as_u16(),
            reason: extract_error_reason(&body),
        });
    }

    serde_json::from_str(&body)
        .map_err(|error| ProviderError::InvalidResponse(format!("json payload: {error}")))
}

pub(crate) fn reason_suffix(reason: &Option<String>) -> String {
    reason
        .as_deref()
        .map(|reason| format!(": {reason}"))
        .unwrap_or_default()
}

pub(crate) fn extract_error_reason(body: &str) -> Option<String> {
    let json = serde_json::from_str::<Value>(body.trim()).ok()?;
    ["reason", "message", "error", "detail"]
        .into_iter()
        .filter_map(|key| json.get(key).and_then(Value::as_str))
        .map(str::trim)
        .find(|message| !message.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_error_reason_prefers_reason_field() {
        let body = r#"{"error": true, "reason": "Cannot initialize WeatherVariable from invalid String value tempeture_2m_max"}"#;
        assert_eq!(
            extract_error_reason(body),
            Some("Cannot initialize WeatherVariable from invalid String value tempeture_2m_max".to_string())
        );
    }

    #[test]
    fn extract_error_reason_ignores_non_json_and_blank_fields() {
        assert_eq!(extract_error_reason("<html>502 Bad Gateway</html>"), None);
        assert_eq!(extract_error_reason(r#"{"reason": "  "}"#), None);
        assert_eq!(
            extract_error_reason(r#"{"reason": " ", "message": "slow down"}"#),
            Some("slow down".to_string())
        );
    }

    #[test]
    fn http_error_display_includes_optional_reason() {
        let with_reason = ProviderError::Http {
            status: 429,
            reason: Some("rate limited".to_string()),
        };
        assert_eq!(with_reason.to_string(), "http error (429): rate limited");

        let bare = ProviderError::Http {
            status: 503,
            reason: None,
        };
        assert_eq!(bare.to_string(), "http error (503)");
    }
}
