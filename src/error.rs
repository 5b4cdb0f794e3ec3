use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Missing env var: {0}")]
    MissingConfig(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Spotify token request failed: {status} {body}")]
    UpstreamAuth { status: u16, body: String },

    #[error("Spotify API error {status}: {body}")]
    UpstreamApi { status: u16, body: String },

    #[error("Contact relay error {status}: {body}")]
    Relay { status: u16, body: String },

    #[error("{0} endpoint not ready")]
    EndpointUnavailable(&'static str),

    #[error("{0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::MissingConfig(_) | AppError::Config(_) | AppError::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Relay { .. } => StatusCode::BAD_GATEWAY,
            AppError::UpstreamAuth { .. }
            | AppError::UpstreamApi { .. }
            | AppError::EndpointUnavailable(_)
            | AppError::Http(_)
            | AppError::Io(_)
            | AppError::Json(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Handlers return `Result<_, AppError>`; every error leaves the server as
/// `{"error": "<message>"}` with the status from [`AppError::status_code`].
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = self.to_string();

        if status.is_server_error() {
            error!("request failed ({}): {}", status, message);
        } else {
            warn!("request rejected ({}): {}", status, message);
        }

        (status, Json(json!({ "error": message }))).into_response()
    }
}
