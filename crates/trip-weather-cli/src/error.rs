use chrono::NaiveDate;
use thiserror::Error;

use crate::model::ValidationError;
use crate::providers::{ProviderError, reason_suffix};

pub const ERROR_CODE_USER_INVALID_INPUT: &str = "user.invalid_input";
pub const ERROR_CODE_USER_INVALID_RANGE: &str = "user.invalid_range";
pub const ERROR_CODE_USER_INVALID_MODE: &str = "user.invalid_mode";
pub const ERROR_CODE_USER_OUTPUT_MODE_CONFLICT: &str = "user.output_mode_conflict";
pub const ERROR_CODE_USER_NOT_FOUND: &str = "user.not_found";
pub const ERROR_CODE_RUNTIME_UPSTREAM: &str = "runtime.upstream_failed";
pub const ERROR_CODE_RUNTIME_INSUFFICIENT_HISTORY: &str = "runtime.insufficient_history";
pub const ERROR_CODE_RUNTIME_PROVIDER_INIT: &str = "runtime.provider_init_failed";
pub const ERROR_CODE_RUNTIME_SERIALIZE: &str = "runtime.serialize_failed";

/// Failures of weather profile resolution. `request` fields carry a
/// human-readable description of the upstream call that failed.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum WeatherError {
    #[error("invalid range: end date {end} precedes start date {start}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },
    #[error("invalid mode '{0}': expected one of auto, forecast, archive, historical_fallback")]
    InvalidMode(String),
    #[error("upstream error for {request} (status {status}){}", reason_suffix(.reason))]
    Upstream {
        request: String,
        status: u16,
        reason: Option<String>,
    },
    #[error("transport error for {request}: {message}")]
    Transport { request: String, message: String },
    #[error("invalid payload for {request}: {message}")]
    InvalidPayload { request: String, message: String },
    #[error(
        "historical fallback failed: {succeeded} succeeded, need {required} \
         (attempted {attempted} archive years)"
    )]
    InsufficientHistory {
        succeeded: usize,
        required: usize,
        attempted: usize,
    },
}

impl WeatherError {
    pub fn from_provider(request: impl Into<String>, error: ProviderError) -> Self {
        let request = request.into();
        match error {
            ProviderError::Http { status, reason } => Self::Upstream {
                request,
                status,
                reason,
            },
            ProviderError::Transport(message) => Self::Transport { request, message },
            ProviderError::InvalidResponse(message) | ProviderError::NotFound(message) => {
                Self::InvalidPayload { request, message }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    User,
    Runtime,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppError {
    pub kind: ErrorKind,
    pub code: &'static str,
    pub message: String,
}

impl AppError {
    pub fn user(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::User,
            code,
            message: message.into(),
        }
    }

    pub fn runtime(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Runtime,
            code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self.kind {
            ErrorKind::User => 2,
            ErrorKind::Runtime => 1,
        }
    }

    pub fn kind_label(&self) -> &'static str {
        match self.kind {
            ErrorKind::User => "user",
            ErrorKind::Runtime => "runtime",
        }
    }
}

impl From<ValidationError> for AppError {
    fn from(value: ValidationError) -> Self {
        Self::user(ERROR_CODE_USER_INVALID_INPUT, value.to_string())
    }
}

impl From<WeatherError> for AppError {
    fn from(value: WeatherError) -> Self {
        let code = match &value {
            WeatherError::InvalidRange { .. } => ERROR_CODE_USER_INVALID_RANGE,
            WeatherError::InvalidMode(_) => ERROR_CODE_USER_INVALID_MODE,
            WeatherError::InsufficientHistory { .. } => ERROR_CODE_RUNTIME_INSUFFICIENT_HISTORY,
            WeatherError::Upstream { .. }
            | WeatherError::Transport { .. }
            | WeatherError::InvalidPayload { .. } => ERROR_CODE_RUNTIME_UPSTREAM,
        };
        match value {
            WeatherError::InvalidRange { .. } | WeatherError::InvalidMode(_) => {
                Self::user(code, value.to_string())
            }
            _ => Self::runtime(code, value.to_string()),
        }
    }
}

impl From<ProviderError> for AppError {
    fn from(value: ProviderError) -> Self {
        match value {
            ProviderError::NotFound(_) => Self::user(ERROR_CODE_USER_NOT_FOUND, value.to_string()),
            _ => Self::runtime(ERROR_CODE_RUNTIME_UPSTREAM, value.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_code_mapping_user_and_runtime_are_stable() {
        assert_eq!(AppError::user(ERROR_CODE_USER_INVALID_INPUT, "x").exit_code(), 2);
        assert_eq!(AppError::runtime(ERROR_CODE_RUNTIME_UPSTREAM, "x").exit_code(), 1);
    }

    #[test]
    fn insufficient_history_message_reports_counts() {
        let error = WeatherError::InsufficientHistory {
            succeeded: 3,
            required: 4,
            attempted: 5,
        };
        assert!(error.to_string().contains("3 succeeded, need 4"));

        let app: AppError = error.into();
        assert_eq!(app.code, ERROR_CODE_RUNTIME_INSUFFICIENT_HISTORY);
        assert_eq!(app.kind, ErrorKind::Runtime);
    }

    #[test]
    fn upstream_error_carries_status_and_reason() {
        let error = WeatherError::from_provider(
            "archive 41.38506,2.17340 2024-07-01..2024-07-05",
            ProviderError::Http {
                status: 400,
                reason: Some("Parameter 'start_date' is out of allowed range".to_string()),
            },
        );

        let message = error.to_string();
        assert!(message.contains("status 400"));
        assert!(message.contains("out of allowed range"));
        assert!(message.contains("2024-07-01..2024-07-05"));
    }

    #[test]
    fn range_and_mode_errors_are_user_errors() {
        let start = NaiveDate::from_ymd_opt(2026, 7, 5).expect("date");
        let end = NaiveDate::from_ymd_opt(2026, 7, 1).expect("date");
        let app: AppError = WeatherError::InvalidRange { start, end }.into();
        assert_eq!(app.code, ERROR_CODE_USER_INVALID_RANGE);
        assert_eq!(app.exit_code(), 2);

        let app: AppError = WeatherError::InvalidMode("weekly".into()).into();
        assert_eq!(app.code, ERROR_CODE_USER_INVALID_MODE);
    }

    #[test]
    fn provider_not_found_maps_to_user_error() {
        let app: AppError = ProviderError::NotFound("Atlantis".to_string()).into();
        assert_eq!(app.code, ERROR_CODE_USER_NOT_FOUND);
        assert_eq!(app.kind, ErrorKind::User);
    }
}
