//! JSON decoding for prediction service responses.
//!
//! The service answers in one of two shapes: a data-bearing body with
//! `volume_predictions`, or an older acknowledgement that only echoes the
//! request parameters. Both decode into [`PredictionResponse`].

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::PredictionError;

/// Predicted traffic volume for one signal over the requested window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolumePrediction {
    #[serde(deserialize_with = "integral_id")]
    pub signal_id: i64,
    pub predicted_total_volume: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AcknowledgedParameters {
    pub start_time: String,
    pub end_time: String,
    pub interval_minutes: u32,
}

/// Body returned by the acknowledgement-only variant of the service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Acknowledgement {
    pub status: String,
    #[serde(default)]
    pub message: String,
    pub parameters: Option<AcknowledgedParameters>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PredictionResponse {
    Volumes(Vec<VolumePrediction>),
    Acknowledged(Acknowledgement),
}

#[derive(Deserialize)]
struct VolumesBody {
    volume_predictions: Vec<VolumePrediction>,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// Decodes a 2xx response body.
///
/// # Errors
///
/// [`PredictionError::InvalidResponse`] if the body is not JSON or matches
/// neither known shape. An unrecognised body never decodes to an empty list.
pub fn parse_response(bytes: &[u8]) -> Result<PredictionResponse, PredictionError> {
    let json: Value = serde_json::from_slice(bytes)
        .map_err(|e| PredictionError::InvalidResponse(format!("body is not JSON: {e}")))?;

    if json.get("volume_predictions").is_some() {
        let body: VolumesBody = serde_json::from_value(json)
            .map_err(|e| PredictionError::InvalidResponse(e.to_string()))?;
        return Ok(PredictionResponse::Volumes(body.volume_predictions));
    }

    if json.get("status").is_some() {
        let ack: Acknowledgement = serde_json::from_value(json)
            .map_err(|e| PredictionError::InvalidResponse(e.to_string()))?;
        return Ok(PredictionResponse::Acknowledged(ack));
    }

    Err(PredictionError::InvalidResponse(
        "expected `volume_predictions` or `status` in body".to_string(),
    ))
}

/// Extracts the message from an `{"error": "..."}` body, if there is one.
pub fn parse_error_message(bytes: &[u8]) -> Option<String> {
    let body: ErrorBody = serde_json::from_slice(bytes).ok()?;
    let message = body.error.trim();
    (!message.is_empty()).then(|| message.to_string())
}

/// Signal ids arrive as JSON numbers; integral floats such as `101.0` are
/// accepted, fractional ones are not.
fn integral_id<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let number = serde_json::Number::deserialize(deserializer)?;
    if let Some(id) = number.as_i64() {
        return Ok(id);
    }

    match number.as_f64() {
        Some(f) if f.fract() == 0.0 && f.abs() < 9.0e15 => Ok(f as i64),
        _ => Err(D::Error::custom(format!(
            "signal_id {number} is not an integer"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_volume_predictions() {
        let body = br#"{"volume_predictions":[
            {"signal_id": 1001, "predicted_total_volume": 412.5},
            {"signal_id": 1002.0, "predicted_total_volume": 87}
        ]}"#;

        let response = parse_response(body).unwrap();
        assert_eq!(
            response,
            PredictionResponse::Volumes(vec![
                VolumePrediction {
                    signal_id: 1001,
                    predicted_total_volume: 412.5
                },
                VolumePrediction {
                    signal_id: 1002,
                    predicted_total_volume: 87.0
                },
            ])
        );
    }

    #[test]
    fn test_parse_empty_prediction_list_is_ok() {
        let response = parse_response(br#"{"volume_predictions":[]}"#).unwrap();
        assert_eq!(response, PredictionResponse::Volumes(vec![]));
    }

    #[test]
    fn test_parse_acknowledgement() {
        let body = br#"{
            "status": "success",
            "message": "Data processing completed",
            "parameters": {"start_time": "03/15 02:30 PM", "end_time": "03/15 02:45 PM", "interval_minutes": 15}
        }"#;

        match parse_response(body).unwrap() {
            PredictionResponse::Acknowledged(ack) => {
                assert_eq!(ack.status, "success");
                assert_eq!(ack.parameters.unwrap().interval_minutes, 15);
            }
            other => panic!("expected acknowledgement, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_fractional_signal_id_is_invalid() {
        let body = br#"{"volume_predictions":[{"signal_id": 1.5, "predicted_total_volume": 3}]}"#;
        let err = parse_response(body).unwrap_err();
        assert!(matches!(err, PredictionError::InvalidResponse(_)));
    }

    #[test]
    fn test_parse_wrong_shape_is_invalid() {
        let bodies: [&[u8]; 4] = [b"not json", b"{}", b"[]", br#"{"volume_predictions": 3}"#];
        for body in bodies {
            let err = parse_response(body).unwrap_err();
            assert!(matches!(err, PredictionError::InvalidResponse(_)));
        }
    }

    #[test]
    fn test_parse_error_message() {
        let body = br#"{"error":"model unavailable","traceback":"..."}"#;
        assert_eq!(
            parse_error_message(body),
            Some("model unavailable".to_string())
        );
        assert_eq!(parse_error_message(br#"{"error":"  "}"#), None);
        assert_eq!(parse_error_message(b"<html>oops</html>"), None);
    }
}
