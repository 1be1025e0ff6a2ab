use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use jobcrawl_core::error::CrawlError;
use jobcrawl_core::models::FailureEnvelope;

/// Wrapper so we can implement `IntoResponse` for `CrawlError`.
#[derive(Debug)]
pub struct ApiError(pub CrawlError);

impl From<CrawlError> for ApiError {
    fn from(err: CrawlError) -> Self {
        Self(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(CrawlError::InvalidInput(rejection.body_text()))
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            CrawlError::InvalidInput(_) | CrawlError::SerializationError(_) => {
                StatusCode::BAD_REQUEST
            }
            CrawlError::LaunchFailure(_) => StatusCode::SERVICE_UNAVAILABLE,
            CrawlError::NavigationTimeout { .. } | CrawlError::Timeout { .. } => {
                StatusCode::GATEWAY_TIMEOUT
            }
            CrawlError::NavigationError(_)
            | CrawlError::ScriptError(_)
            | CrawlError::ContextError(_)
            | CrawlError::MissingLink(_) => StatusCode::BAD_GATEWAY,
            CrawlError::ConfigError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(error = %self.0, %status, "Request failed");
        }
        (status, axum::Json(FailureEnvelope::new(self.0.to_string()))).into_response()
    }
}
