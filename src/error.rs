//! Typed failures surfaced by the prediction pipeline.
//!
//! Each variant renders a message meant to be shown to the user as-is.

use thiserror::Error;

/// Failures while loading the traffic-signal catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("signal catalog unavailable: {0}")]
    Unavailable(String),
    #[error("signal catalog malformed: none of {rows} data rows could be parsed")]
    Malformed { rows: usize },
}

/// Failures while turning user input into a request window.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WindowError {
    #[error("invalid date format: {0}. Use MM/DD and HH:MM AM/PM")]
    InvalidDateFormat(String),
    #[error("interval must be a positive number of minutes, got {0}")]
    InvalidInterval(u32),
}

/// Failures from a single call to the prediction service.
#[derive(Debug, Error)]
pub enum PredictionError {
    #[error("invalid prediction service URL: {0}")]
    InvalidUrl(String),
    #[error("prediction request timed out")]
    RequestTimeout,
    #[error("{message}")]
    ServerError { status: u16, message: String },
    #[error("invalid response from prediction service: {0}")]
    InvalidResponse(String),
    #[error("network failure: {0}")]
    TransportFailure(String),
}

impl PredictionError {
    /// Maps a reqwest failure onto the pipeline's error set.
    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            PredictionError::RequestTimeout
        } else if err.is_builder() {
            PredictionError::InvalidUrl(err.to_string())
        } else {
            PredictionError::TransportFailure(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_error_displays_message_verbatim() {
        let err = PredictionError::ServerError {
            status: 500,
            message: "model unavailable".to_string(),
        };
        assert_eq!(err.to_string(), "model unavailable");
    }

    #[test]
    fn test_malformed_reports_row_count() {
        let err = CatalogError::Malformed { rows: 4 };
        assert!(err.to_string().contains("4 data rows"));
    }
}
