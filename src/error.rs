//! Detector error types

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;

/// Detector error types
#[derive(Debug, thiserror::Error)]
pub enum DetectorError {
    // Upload errors
    #[error("no image was uploaded")]
    EmptyUpload,

    #[error("unsupported file type: {0} (expected JPEG or PNG)")]
    UnsupportedType(String),

    #[error("file is too large: {size} bytes (limit {limit} bytes)")]
    TooLarge { size: usize, limit: usize },

    #[error("upload error: {0}")]
    Upload(String),

    // Image errors
    #[error("could not decode image: {0}")]
    Decode(String),

    // Model errors
    #[error("model loading failed: {0}")]
    Model(String),

    #[error("inference failed: {0}")]
    Inference(String),

    #[error("invalid score vector: {0}")]
    InvalidScores(String),

    // Configuration errors
    #[error("invalid class set: {0}")]
    InvalidClassSet(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using [`DetectorError`].
pub type Result<T> = std::result::Result<T, DetectorError>;

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl DetectorError {
    /// Whether the error was caused by the uploaded file rather than the service.
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }
}

impl ResponseError for DetectorError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::EmptyUpload | Self::Upload(_) | Self::Decode(_) => StatusCode::BAD_REQUEST,
            Self::UnsupportedType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Model(_)
            | Self::Inference(_)
            | Self::InvalidScores(_)
            | Self::InvalidClassSet(_)
            | Self::Configuration(_)
            | Self::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorBody {
            error: self.to_string(),
        })
    }
}
