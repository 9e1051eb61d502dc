//! Error types for sheet sync operations.

use std::io;
use thiserror::Error;

/// Errors that can occur while preparing or configuring a sync run.
///
/// Per-sheet download failures are not errors; they are reported as
/// [`FetchOutcome`](crate::FetchOutcome) values in the run report.
#[derive(Error, Debug)]
pub enum SyncError {
    /// I/O error while reading configuration.
    #[error(transparent)]
    IoError(#[from] io::Error),

    /// HTTP client construction error.
    #[error(transparent)]
    ReqwestError(#[from] reqwest::Error),

    /// JSON serialization/deserialization error.
    #[error(transparent)]
    SerdeJsonError(#[from] serde_json::Error),

    /// A sheet descriptor failed validation.
    #[error("Invalid sheet descriptor {name:?}: {reason}")]
    InvalidDescriptor { name: String, reason: &'static str },
}
