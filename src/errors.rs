//! Request-level error types.
//!
//! Every variant maps to an HTTP status and renders as a JSON body of the
//! form `{"error": "<message>"}`.  Handlers return
//! `Result<_, EnergyError>` and never let a fault escape unformatted.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use crate::handlers::ErrorBody;

/// Errors returned by the energy endpoints.
#[derive(Debug, Error)]
pub enum EnergyError {
    /// `date` or `usage` missing or empty.
    #[error("Both date and usage are required")]
    MissingReadingFields,

    /// Multipart body carried no `file` field.
    #[error("No file part")]
    NoFilePart,

    /// The `file` part carried `filename=""`. A part with no filename
    /// parameter at all is a plain form field and yields [`EnergyError::NoFilePart`].
    #[error("No selected file")]
    NoSelectedFile,

    /// Filename does not end in `.csv`.
    #[error("Invalid file format. Only CSV files are allowed.")]
    InvalidFileFormat,

    /// The request body could not be decoded (bad multipart framing,
    /// body cut off by the size limit, ...).
    #[error("{message}")]
    MalformedBody { status: StatusCode, message: String },

    /// The storage backend failed to accept the file.
    #[error("Error uploading file to S3: {0}")]
    Upload(#[source] anyhow::Error),
}

impl EnergyError {
    /// Return the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            EnergyError::MissingReadingFields
            | EnergyError::NoFilePart
            | EnergyError::NoSelectedFile
            | EnergyError::InvalidFileFormat => StatusCode::BAD_REQUEST,
            EnergyError::MalformedBody { status, .. } => *status,
            EnergyError::Upload(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<axum::extract::multipart::MultipartError> for EnergyError {
    fn from(err: axum::extract::multipart::MultipartError) -> Self {
        EnergyError::MalformedBody {
            status: err.status(),
            message: err.body_text(),
        }
    }
}

impl IntoResponse for EnergyError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.to_string(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_validation_errors_are_bad_request() {
        for err in [
            EnergyError::MissingReadingFields,
            EnergyError::NoFilePart,
            EnergyError::NoSelectedFile,
            EnergyError::InvalidFileFormat,
        ] {
            assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        }
    }

    #[test]
    fn test_upload_error_message_includes_cause() {
        let err = EnergyError::Upload(anyhow::anyhow!("AccessDenied"));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "Error uploading file to S3: AccessDenied");
    }

    #[test]
    fn test_malformed_body_keeps_status() {
        let err = EnergyError::MalformedBody {
            status: StatusCode::PAYLOAD_TOO_LARGE,
            message: "length limit exceeded".to_string(),
        };
        assert_eq!(err.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(err.to_string(), "length limit exceeded");
    }

    #[tokio::test]
    async fn test_into_response_renders_json_error() {
        let response = EnergyError::NoFilePart.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value, json!({ "error": "No file part" }));
    }
}
