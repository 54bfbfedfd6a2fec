use super::client::HttpClient;
use async_trait::async_trait;

use crate::config::ClientConfig;
use crate::error::PredictionError;

/// reqwest-backed client carrying the configured connect and response timeouts.
pub struct BasicClient(reqwest::Client);

impl BasicClient {
    pub fn new(config: &ClientConfig) -> Result<Self, PredictionError> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.response_timeout)
            .build()
            .map_err(|e| PredictionError::TransportFailure(e.to_string()))?;
        Ok(Self(client))
    }
}

#[async_trait]
impl HttpClient for BasicClient {
    async fn execute(&self, req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        self.0.execute(req).await
    }
}
