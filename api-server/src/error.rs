//! Error-to-response mapping
//!
//! Every failure leaves the facade as `{ "detail": ... }` with a status
//! picked from the adapter/sink error variant.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use sinks::SinkError;
use source_adapters::AdapterError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub detail: String,
}

impl ApiError {
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }

    pub fn not_found(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, detail)
    }

    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, detail)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}

impl From<AdapterError> for ApiError {
    fn from(err: AdapterError) -> Self {
        let status = match &err {
            AdapterError::NotFound(_) => StatusCode::NOT_FOUND,
            AdapterError::Forbidden(_) => StatusCode::FORBIDDEN,
            AdapterError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AdapterError::NotConfigured(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AdapterError::QuotaExceeded(_) => StatusCode::PAYMENT_REQUIRED,
            AdapterError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            AdapterError::Upstream { status, .. } if *status < 600 => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            AdapterError::Upstream { .. } => StatusCode::BAD_GATEWAY,
            AdapterError::Http(_) | AdapterError::Json(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, err.to_string())
    }
}

impl From<SinkError> for ApiError {
    fn from(err: SinkError) -> Self {
        let status = match &err {
            SinkError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            SinkError::NotConfigured(_) => StatusCode::INTERNAL_SERVER_ERROR,
            SinkError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            SinkError::Upstream { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            SinkError::Http(_) | SinkError::Json(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, err.to_string())
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adapter_error_mapping() {
        let cases = [
            (AdapterError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (AdapterError::Forbidden("x".into()), StatusCode::FORBIDDEN),
            (AdapterError::InvalidInput("x".into()), StatusCode::BAD_REQUEST),
            (
                AdapterError::QuotaExceeded("x".into()),
                StatusCode::PAYMENT_REQUIRED,
            ),
            (AdapterError::Timeout("x".into()), StatusCode::GATEWAY_TIMEOUT),
        ];
        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).status, expected);
        }
    }

    #[test]
    fn test_upstream_status_passthrough() {
        let err = AdapterError::Upstream {
            status: 429,
            detail: "slow down".into(),
        };
        assert_eq!(ApiError::from(err).status, StatusCode::TOO_MANY_REQUESTS);

        let err = AdapterError::Upstream {
            status: 999,
            detail: "weird".into(),
        };
        assert_eq!(ApiError::from(err).status, StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_sink_timeout_maps_to_504() {
        let err = SinkError::Timeout("sink gone".into());
        assert_eq!(ApiError::from(err).status, StatusCode::GATEWAY_TIMEOUT);
    }
}
