//! `POST /energy/input` -- accept a meter reading.
//!
//! Readings are not stored anywhere; they are written to the log and
//! acknowledged.  Fields may arrive URL-encoded or as multipart form
//! fields.  A body of any other type simply yields no fields.

use axum::extract::{FromRequest, Multipart, Request};
use axum::http::{header, StatusCode};
use axum::Json;
use tracing::{error, info};

use super::Acknowledgement;
use crate::errors::EnergyError;
use crate::metrics;

/// Success message returned for an accepted reading.
pub const READING_SAVED: &str = "Energy data saved successfully";

/// A single meter reading. Values are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnergyReading {
    pub date: String,
    pub usage: String,
}

impl EnergyReading {
    /// Build a reading from decoded form fields.
    ///
    /// The first occurrence of each name wins.  Empty values count as
    /// missing; whitespace is not trimmed.
    pub fn from_fields(fields: &[(String, String)]) -> Result<Self, EnergyError> {
        let lookup = |name: &str| {
            fields
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.clone())
                .filter(|v| !v.is_empty())
        };

        match (lookup("date"), lookup("usage")) {
            (Some(date), Some(usage)) => Ok(Self { date, usage }),
            _ => Err(EnergyError::MissingReadingFields),
        }
    }
}

#[utoipa::path(
    post,
    path = "/energy/input",
    tag = "Energy",
    operation_id = "SubmitReading",
    responses(
        (status = 200, description = "Reading accepted"),
        (status = 400, description = "date or usage missing"),
        (status = 413, description = "Body too large")
    )
)]
pub async fn submit_reading(request: Request) -> Result<Json<Acknowledgement>, EnergyError> {
    let fields = read_form_fields(request).await?;

    let reading = match EnergyReading::from_fields(&fields) {
        Ok(reading) => reading,
        Err(err) => {
            error!("Date or usage is missing in the form data");
            metrics::record_reading("rejected");
            return Err(err);
        }
    };

    info!(date = %reading.date, usage = %reading.usage, "Received energy reading");
    metrics::record_reading("accepted");

    Ok(Json(Acknowledgement::new(READING_SAVED)))
}

/// Decode the non-file form fields of `request`, in body order.
///
/// Only an oversized body is reported as an error; an unsupported or
/// unparsable body decodes to no fields.
async fn read_form_fields(request: Request) -> Result<Vec<(String, String)>, EnergyError> {
    let is_multipart = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("multipart/form-data"));

    if !is_multipart {
        return match axum::Form::<Vec<(String, String)>>::from_request(request, &()).await {
            Ok(axum::Form(fields)) => Ok(fields),
            Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
                Err(EnergyError::MalformedBody {
                    status: rejection.status(),
                    message: rejection.body_text(),
                })
            }
            Err(_) => Ok(Vec::new()),
        };
    }

    let Ok(mut multipart) = Multipart::from_request(request, &()).await else {
        return Ok(Vec::new());
    };

    let mut fields = Vec::new();
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(err) if err.status() == StatusCode::PAYLOAD_TOO_LARGE => return Err(err.into()),
            Err(_) => return Ok(Vec::new()),
        };
        // File parts are not form fields.
        if field.file_name().is_some() {
            continue;
        }
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        match field.text().await {
            Ok(value) => fields.push((name, value)),
            Err(err) if err.status() == StatusCode::PAYLOAD_TOO_LARGE => return Err(err.into()),
            Err(_) => return Ok(Vec::new()),
        }
    }
    Ok(fields)
}
