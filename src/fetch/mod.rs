//! Client for the remote volume prediction service.
//!
//! One HTTP call per invocation, no retries. Transport, status and decoding
//! failures are classified into [`PredictionError`].

mod basic;
mod client;

pub use basic::BasicClient;
pub use client::HttpClient;

use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderValue};
use reqwest::{Method, Request};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::config::{ClientConfig, Endpoint};
use crate::error::PredictionError;
use crate::parser::{PredictionResponse, VolumePrediction, parse_error_message, parse_response};
use crate::window::{PredictionRequestWindow, QUERY_TIME_FORMAT, SERVICE_TIME_FORMAT};

/// JSON body of `POST /fetch-volume`. The service format has no year.
fn window_body(window: &PredictionRequestWindow) -> String {
    if window.spans_year_boundary() {
        warn!(%window, "Window crosses a year boundary; service timestamps carry no year");
    }

    json!({
        "start_time": window.start_time().format(SERVICE_TIME_FORMAT).to_string(),
        "end_time": window.end_time().format(SERVICE_TIME_FORMAT).to_string(),
        "interval_minutes": window.interval_minutes(),
    })
    .to_string()
}

/// Builds the HTTP request for `window` against the configured endpoint.
pub fn build_request(
    config: &ClientConfig,
    window: &PredictionRequestWindow,
) -> Result<Request, PredictionError> {
    let mut url = config.endpoint_url()?;

    let mut req = match config.endpoint {
        Endpoint::FetchVolume => {
            let mut req = Request::new(Method::POST, url);
            req.headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            *req.body_mut() = Some(window_body(window).into());
            req
        }
        Endpoint::TimestampQuery => {
            url.query_pairs_mut().append_pair(
                "timestamp",
                &window.start_time().format(QUERY_TIME_FORMAT).to_string(),
            );
            Request::new(Method::GET, url)
        }
    };

    req.headers_mut()
        .insert(ACCEPT, HeaderValue::from_static("application/json"));
    *req.timeout_mut() = Some(config.response_timeout);
    Ok(req)
}

/// Sends one request and decodes whichever response shape comes back.
#[tracing::instrument(skip(client, config, window), fields(endpoint = ?config.endpoint, window = %window))]
pub async fn submit<C: HttpClient>(
    client: &C,
    config: &ClientConfig,
    window: &PredictionRequestWindow,
) -> Result<PredictionResponse, PredictionError> {
    let req = build_request(config, window)?;
    debug!(method = %req.method(), url = %req.url(), "Sending prediction request");

    let resp = client
        .execute(req)
        .await
        .map_err(PredictionError::from_transport)?;
    let status = resp.status();
    let bytes = resp
        .bytes()
        .await
        .map_err(PredictionError::from_transport)?;

    if !status.is_success() {
        let message = parse_error_message(&bytes)
            .unwrap_or_else(|| format!("prediction service returned status {status}"));
        warn!(status = status.as_u16(), %message, "Prediction service error");
        return Err(PredictionError::ServerError {
            status: status.as_u16(),
            message,
        });
    }

    debug!(bytes = bytes.len(), "Prediction response received");
    parse_response(&bytes)
}

/// Fetches per-signal volume predictions for `window`.
///
/// # Errors
///
/// Any [`PredictionError`]; an acknowledgement-only reply carries no data
/// and is reported as [`PredictionError::InvalidResponse`].
pub async fn fetch_predictions<C: HttpClient>(
    client: &C,
    config: &ClientConfig,
    window: &PredictionRequestWindow,
) -> Result<Vec<VolumePrediction>, PredictionError> {
    match submit(client, config, window).await? {
        PredictionResponse::Volumes(predictions) => {
            info!(predictions = predictions.len(), "Volume predictions fetched");
            Ok(predictions)
        }
        PredictionResponse::Acknowledged(ack) => Err(PredictionError::InvalidResponse(format!(
            "service acknowledged the request ({}) without volume predictions",
            ack.status
        ))),
    }
}
