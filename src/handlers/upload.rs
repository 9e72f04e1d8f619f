//! `POST /energy/upload` -- forward a CSV file to object storage.
//!
//! The handler looks for the first multipart part named `file` that
//! carries a filename, validates the name, then hands the content to the
//! configured [`ObjectStore`](crate::storage::backend::ObjectStore) under
//! the sanitized filename.  Nothing is written to local disk.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::multipart::{Field, MultipartRejection};
use axum::extract::{Multipart, State};
use axum::Json;
use bytes::Bytes;
use tracing::{error, info};

use super::Acknowledgement;
use crate::errors::EnergyError;
use crate::filename::{is_csv, sanitize_filename};
use crate::metrics;
use crate::AppState;

/// Success message returned once the file is stored.
pub const UPLOAD_SUCCEEDED: &str = "File uploaded successfully to S3";

/// Multipart field name that carries the file.
const FILE_FIELD: &str = "file";

/// A file received from the client, ready to be stored.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Filename as sent by the client.
    pub filename: String,
    /// Full file content.
    pub content: Bytes,
}

impl UploadedFile {
    /// Validate the client filename and derive the object key.
    ///
    /// Checks run in order: non-empty name, `.csv` suffix on the raw name,
    /// then `.csv` suffix on the sanitized name.
    pub fn object_key(filename: &str) -> Result<String, EnergyError> {
        if filename.is_empty() {
            return Err(EnergyError::NoSelectedFile);
        }
        if !is_csv(filename) {
            return Err(EnergyError::InvalidFileFormat);
        }
        let key = sanitize_filename(filename);
        if !is_csv(&key) {
            return Err(EnergyError::InvalidFileFormat);
        }
        Ok(key)
    }
}

#[utoipa::path(
    post,
    path = "/energy/upload",
    tag = "Energy",
    operation_id = "UploadFile",
    responses(
        (status = 200, description = "File stored"),
        (status = 400, description = "No file part, no selected file, or not a CSV file"),
        (status = 413, description = "Body too large"),
        (status = 500, description = "Object storage rejected the upload")
    )
)]
pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Acknowledgement>, EnergyError> {
    let result = match multipart {
        Ok(multipart) => receive_and_store(&state, multipart).await,
        // Not a multipart body at all, so there is no file part.
        Err(_) => Err(EnergyError::NoFilePart),
    };

    match &result {
        Ok(_) => {}
        Err(EnergyError::Upload(_)) => metrics::record_upload("failed", 0),
        Err(err) => {
            error!(error = %err, "Rejected file upload");
            metrics::record_upload("rejected", 0);
        }
    }
    result
}

async fn receive_and_store(
    state: &AppState,
    mut multipart: Multipart,
) -> Result<Json<Acknowledgement>, EnergyError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        // A `file` part without a filename is a plain form field.
        let Some(filename) = field.file_name().map(str::to_string) else {
            continue;
        };
        return store_field(state, filename, field).await;
    }
    Err(EnergyError::NoFilePart)
}

async fn store_field(
    state: &AppState,
    filename: String,
    field: Field<'_>,
) -> Result<Json<Acknowledgement>, EnergyError> {
    let key = UploadedFile::object_key(&filename)?;
    let file = UploadedFile {
        filename,
        content: field.bytes().await?,
    };

    let bucket = &state.config.storage.bucket;
    let size = file.content.len();
    let timeout_secs = state.config.storage.upload_timeout_secs;

    let outcome = tokio::time::timeout(
        Duration::from_secs(timeout_secs),
        state.storage.put_object(bucket, &key, file.content),
    )
    .await;

    match outcome {
        Ok(Ok(())) => {
            info!(
                bucket = %bucket,
                key = %key,
                original = %file.filename,
                size,
                "File uploaded successfully"
            );
            metrics::record_upload("stored", size);
            Ok(Json(Acknowledgement::new(UPLOAD_SUCCEEDED)))
        }
        Ok(Err(err)) => {
            error!(bucket = %bucket, key = %key, error = %err, "Error uploading file");
            Err(EnergyError::Upload(err))
        }
        Err(_) => {
            error!(bucket = %bucket, key = %key, timeout_secs, "File upload timed out");
            Err(EnergyError::Upload(anyhow::anyhow!(
                "upload timed out after {timeout_secs}s"
            )))
        }
    }
}
