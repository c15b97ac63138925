use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::validation::FieldError;

#[derive(Debug, Error)]
pub enum ImagesError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("Invalid {field}: {0}", field = .0.field())]
    Validation(#[from] FieldError),

    #[error("Invalid image url: {0:?}")]
    InvalidUrl(String),

    #[error("Image not found: {0}")]
    NotFound(String),

    #[error("Backend unavailable: {0}")]
    Unavailable(String),
}

impl IntoResponse for ImagesError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            ImagesError::Validation(error) => (
                StatusCode::BAD_REQUEST,
                json!({ "field": error.field(), "message": error.to_string() }),
            ),
            ImagesError::InvalidUrl(_) => (
                StatusCode::BAD_REQUEST,
                json!({ "field": "url", "message": "A valid uploaded image url is required." }),
            ),
            ImagesError::NotFound(_) => (
                StatusCode::NOT_FOUND,
                json!({ "message": "Image not found" }),
            ),
            ImagesError::Unavailable(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                json!({ "message": "Backend unavailable" }),
            ),
            ImagesError::IoError(_) | ImagesError::SerdeError(_) => {
                tracing::error!("Image backend failure: {}", self);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "message": "Internal server error" }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}
