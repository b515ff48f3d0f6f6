//! Traits describing record sources and shared error types.

use async_trait::async_trait;
use csv::Error as CsvError;
use reqwest::Error as ReqwestError;
use serde_json::Error as JsonError;

use crate::model::{ProducerRecord, SourceMeta, TourMetric};

#[derive(thiserror::Error, Debug)]
/// Errors that can occur while loading records from a source.
pub enum PortError {
    /// Network layer failed.
    #[error("Network error: {0}")]
    Network(#[from] ReqwestError),
    /// The record store answered with an error status.
    #[error("Record store returned {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, for diagnostics.
        body: String,
    },
    /// The record store response is not the expected JSON.
    #[error("Invalid JSON response: {0}")]
    Json(#[from] JsonError),
    /// A CSV export could not be read.
    #[error("CSV error: {0}")]
    Csv(#[from] CsvError),
    /// A local file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// No source is registered under the requested id.
    #[error("Unknown source")]
    UnknownSource,
    /// Internal provider error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PortError {
    /// Whether the error means the source could not be reached at all.
    #[must_use]
    pub fn is_connectivity(&self) -> bool {
        matches!(self, PortError::Network(_) | PortError::Status { .. })
    }
}

/// What a source hands back on fetch.
#[derive(Debug, Clone)]
pub enum SourceBatch {
    /// Raw producer records that still need flattening.
    Records(Vec<ProducerRecord>),
    /// Rows that are already one per tour.
    Metrics(Vec<TourMetric>),
}

#[async_trait]
/// Trait for backends that supply producer tours.
pub trait RecordPort: Send + Sync {
    /// Metadata describing the source handled by this port.
    fn source(&self) -> &SourceMeta;

    /// Load every record currently held by the source.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the source cannot be reached or read.
    async fn fetch(&self) -> Result<SourceBatch, PortError>;
}
