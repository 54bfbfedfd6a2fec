//! Client and catalog settings.
//!
//! Nothing here reads the environment; the binary fills these in from
//! `.env`, environment variables and CLI flags.

use reqwest::Url;
use std::time::Duration;

use crate::catalog::Coordinate;
use crate::error::PredictionError;

/// Port the prediction service listens on when run locally.
pub const DEFAULT_BASE_URL: &str = "http://localhost:6000";
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_secs(300);

/// Which contract of the prediction service to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Endpoint {
    /// `POST <base>/fetch-volume` with a JSON window body.
    #[default]
    FetchVolume,
    /// `GET <base>/predictions?timestamp=<local time>`.
    TimestampQuery,
}

impl Endpoint {
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::FetchVolume => "fetch-volume",
            Endpoint::TimestampQuery => "predictions",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub endpoint: Endpoint,
    /// Budget for establishing the connection and sending the request.
    pub connect_timeout: Duration,
    /// Ceiling for the whole call, including receiving the full body.
    pub response_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            endpoint: Endpoint::default(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            response_timeout: DEFAULT_RESPONSE_TIMEOUT,
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    pub fn with_endpoint(mut self, endpoint: Endpoint) -> Self {
        self.endpoint = endpoint;
        self
    }

    pub fn with_timeouts(mut self, connect: Duration, response: Duration) -> Self {
        self.connect_timeout = connect;
        self.response_timeout = response;
        self
    }

    /// Resolves the full URL of the configured endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`PredictionError::InvalidUrl`] if the base URL is not an
    /// absolute http(s) URL.
    pub fn endpoint_url(&self) -> Result<Url, PredictionError> {
        let mut base = Url::parse(self.base_url.trim())
            .map_err(|e| PredictionError::InvalidUrl(format!("{}: {}", self.base_url, e)))?;

        if !matches!(base.scheme(), "http" | "https") || base.cannot_be_a_base() {
            return Err(PredictionError::InvalidUrl(format!(
                "{}: expected an http or https URL",
                self.base_url
            )));
        }

        // Url::join drops the last path segment unless it ends with '/'
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        base.join(self.endpoint.path())
            .map_err(|e| PredictionError::InvalidUrl(format!("{}: {}", self.base_url, e)))
    }
}

/// How the catalog orders the signals it returns.
#[derive(Debug, Clone, Copy, Default)]
pub struct CatalogOptions {
    /// When set, signals are stable-sorted by distance from this point.
    pub sort_from: Option<Coordinate>,
}

impl CatalogOptions {
    pub fn sort_from(origin: Coordinate) -> Self {
        Self {
            sort_from: Some(origin),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_endpoint_url() {
        let url = ClientConfig::default().endpoint_url().unwrap();
        assert_eq!(url.as_str(), "http://localhost:6000/fetch-volume");
    }

    #[test]
    fn test_endpoint_url_keeps_base_path() {
        let config =
            ClientConfig::new("https://example.com/api").with_endpoint(Endpoint::TimestampQuery);
        let url = config.endpoint_url().unwrap();
        assert_eq!(url.as_str(), "https://example.com/api/predictions");
    }

    #[test]
    fn test_endpoint_url_rejects_garbage() {
        let err = ClientConfig::new("not a url").endpoint_url().unwrap_err();
        assert!(matches!(err, PredictionError::InvalidUrl(_)));
    }

    #[test]
    fn test_endpoint_url_rejects_non_http_scheme() {
        let err = ClientConfig::new("ftp://example.com")
            .endpoint_url()
            .unwrap_err();
        assert!(matches!(err, PredictionError::InvalidUrl(_)));
    }
}
