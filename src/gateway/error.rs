//! Gateway error types.

use super::privileges::TokenError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error(transparent)]
    InvalidInput(#[from] TokenError),

    #[error("Failed to read admin token from {path}: {message}")]
    Token { path: String, message: String },

    #[error("Unity Catalog request failed: {0}")]
    Upstream(String),

    #[error("Unity Catalog returned {status}: {body}")]
    UpstreamStatus { status: u16, body: String },
}

impl GatewayError {
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::Token { .. } | Self::Upstream(_) | Self::UpstreamStatus { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}
