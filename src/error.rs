use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use image::ColorType;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EnhanceError {
    #[error("Unsupported scale factor: {0} (expected 2, 3 or 4)")]
    InvalidScaleFactor(i64),

    #[error("Image has zero area ({width}x{height})")]
    EmptyImage { width: u32, height: u32 },

    #[error("Expected an 8-bit image with 3 channels, got {0:?}")]
    MalformedChannelLayout(ColorType),

    #[error("Invalid enhancement parameter: {0}")]
    InvalidParameter(String),

    #[error("Scaled size of {width}x{height} by {factor} is out of range")]
    DimensionOverflow { width: u32, height: u32, factor: u32 },

    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to decode image: {0}")]
    DecodeError(String),

    #[error("Failed to encode image: {0}")]
    EncodeError(String),

    #[error("Image too large: {size} bytes (max: {max} bytes)")]
    ImageTooLarge { size: usize, max: usize },

    #[error("Missing file in request")]
    MissingFile,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl EnhanceError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            EnhanceError::InvalidScaleFactor(_) => {
                (StatusCode::BAD_REQUEST, "INVALID_SCALE_FACTOR")
            }
            EnhanceError::EmptyImage { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "EMPTY_IMAGE"),
            EnhanceError::MalformedChannelLayout(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "MALFORMED_CHANNEL_LAYOUT")
            }
            EnhanceError::InvalidParameter(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INVALID_PARAMETER")
            }
            EnhanceError::DimensionOverflow { .. } => {
                (StatusCode::PAYLOAD_TOO_LARGE, "DIMENSION_OVERFLOW")
            }
            EnhanceError::UnsupportedFormat(_) => {
                (StatusCode::UNSUPPORTED_MEDIA_TYPE, "UNSUPPORTED_FORMAT")
            }
            EnhanceError::DecodeError(_) => (StatusCode::BAD_REQUEST, "DECODE_ERROR"),
            EnhanceError::EncodeError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "ENCODE_ERROR"),
            EnhanceError::ImageTooLarge { .. } => {
                (StatusCode::PAYLOAD_TOO_LARGE, "IMAGE_TOO_LARGE")
            }
            EnhanceError::MissingFile => (StatusCode::BAD_REQUEST, "MISSING_FILE"),
            EnhanceError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "INVALID_REQUEST"),
            EnhanceError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl IntoResponse for EnhanceError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let body = Json(ErrorResponse {
            error: self.to_string(),
            code: code.to_string(),
        });

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_errors_map_to_client_errors() {
        let (status, code) = EnhanceError::InvalidScaleFactor(5).status_and_code();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(code, "INVALID_SCALE_FACTOR");

        let (status, code) = EnhanceError::EmptyImage {
            width: 0,
            height: 3,
        }
        .status_and_code();
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(code, "EMPTY_IMAGE");

        let (status, _) = EnhanceError::MalformedChannelLayout(ColorType::L8).status_and_code();
        assert!(status.is_client_error());
    }

    #[test]
    fn test_error_message_names_the_rejected_value() {
        let message = EnhanceError::InvalidScaleFactor(5).to_string();
        assert!(message.contains('5'), "unexpected message: {}", message);
    }
}
