use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use pixgate_contracts::envelope::{Envelope, CODE_INTERNAL, CODE_VALIDATION};
use thiserror::Error;
use tracing::error;

use crate::now_iso;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Unknown feature")]
    UnknownFeature(String),
    #[error("{0}")]
    Form(String),
    #[error("{0}")]
    Upstream(#[from] reqwest::Error),
    #[error("upstream returned invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::UnknownFeature(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            GatewayError::UnknownFeature(_) => CODE_VALIDATION,
            _ => CODE_INTERNAL,
        }
    }

    pub fn envelope(&self) -> Envelope {
        Envelope {
            timestamp: Some(now_iso()),
            ..Envelope::failure(self.to_string(), self.code())
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        if self.status().is_server_error() {
            error!(error = %self, "route handler error");
        }
        (self.status(), Json(self.envelope())).into_response()
    }
}
