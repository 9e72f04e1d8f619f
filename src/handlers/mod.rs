//! Energy API handlers.
//!
//! Two independent request types share this module: meter readings
//! submitted as form fields ([`reading`]) and CSV files forwarded to
//! object storage ([`upload`]).

pub mod reading;
pub mod upload;

use serde::{Deserialize, Serialize};

/// Success body for both energy endpoints: `{"message": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Acknowledgement {
    pub message: String,
}

impl Acknowledgement {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Failure body for both energy endpoints: `{"error": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
