//! Request-level error taxonomy.
//!
//! Parsing and validation never produce these; only upload checks and the OCR
//! collaborator do.

use axum::http::StatusCode;
use thiserror::Error;

pub const MISSING_IMAGE_MESSAGE: &str =
    "No image provided. Please upload a JPG, PNG, or WEBP file under 10MB.";
pub const IMAGE_TOO_LARGE_MESSAGE: &str =
    "Image is too large. Please upload a JPG, PNG, or WEBP file under 10MB.";
pub const INVALID_FORMAT_MESSAGE: &str =
    "Unsupported image format. Please upload a JPG, PNG, or WEBP file.";
pub const INVALID_CONTENT_MESSAGE: &str =
    "Invalid image content. Please upload a JPG, PNG, or WEBP file.";

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("{0}")]
    InvalidImage(String),

    #[error("OCR service unavailable: {0}")]
    OcrUnavailable(String),

    #[error("OCR request timed out")]
    OcrTimeout,

    #[error("OCR failed: {0}")]
    OcrFailed(String),
}

impl ScanError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidImage(_) => "INVALID_IMAGE",
            Self::OcrUnavailable(_) => "OCR_UNAVAILABLE",
            Self::OcrTimeout => "OCR_TIMEOUT",
            Self::OcrFailed(_) => "OCR_FAILED",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidImage(_) => StatusCode::BAD_REQUEST,
            Self::OcrUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::OcrTimeout => StatusCode::GATEWAY_TIMEOUT,
            Self::OcrFailed(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// Message safe to show the end user; collaborator details stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            Self::InvalidImage(message) => message.clone(),
            Self::OcrUnavailable(_) => "OCR service is unavailable. Please try again later.".to_string(),
            Self::OcrTimeout => "OCR timed out. Please try again.".to_string(),
            Self::OcrFailed(_) => "OCR failed to read the image. Please try a clearer photo.".to_string(),
        }
    }
}
