//! Error types for the ingestion service

use hyper::StatusCode;
use thiserror::Error;

/// Errors that can occur while ingesting a KYC record
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Unable to resolve public key for tenant {tenant_id}: {reason}")]
    KeyResolution { tenant_id: String, reason: String },

    #[error("Unable to encrypt {field} for tenant {tenant_id}: {reason}")]
    Encryption {
        tenant_id: String,
        field: &'static str,
        reason: String,
    },

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Failed to read request body: {0}")]
    BodyRead(String),

    #[error("Timed out reading request body")]
    BodyReadTimeout,

    #[error("Request body exceeds {limit} bytes")]
    PayloadTooLarge { limit: usize },

    #[error("Request timed out")]
    RequestTimeout,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl IngestError {
    /// HTTP status reported to the caller for this failure
    pub fn status_code(&self) -> StatusCode {
        match self {
            IngestError::Decode(_) => StatusCode::BAD_REQUEST,
            IngestError::KeyResolution { .. }
            | IngestError::Encryption { .. }
            | IngestError::Persistence(_) => StatusCode::BAD_GATEWAY,
            IngestError::BodyRead(_)
            | IngestError::BodyReadTimeout
            | IngestError::RequestTimeout => StatusCode::GATEWAY_TIMEOUT,
            IngestError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            IngestError::Serialization(_) | IngestError::Config(_) | IngestError::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, IngestError>;
