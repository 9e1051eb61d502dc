//! Data structures for sheet sync operations.

use crate::error::SyncError;
use crate::retry::RetryPolicy;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Identifies one published sheet to download.
///
/// The name doubles as the output file stem, so it is validated to be a
/// single safe path component on construction. Fields are private; a
/// descriptor never changes once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceDescriptor {
    name: String,
    remote_key: String,
}

impl ResourceDescriptor {
    /// Creates a descriptor after checking that `name` can be used as a file stem.
    ///
    /// # Example
    ///
    /// ```
    /// use sheetsync::ResourceDescriptor;
    ///
    /// let sheet = ResourceDescriptor::new("Items", "1AbCdEf").unwrap();
    /// assert_eq!(sheet.name(), "Items");
    /// assert!(ResourceDescriptor::new("../etc", "1AbCdEf").is_err());
    /// ```
    pub fn new(name: impl Into<String>, remote_key: impl Into<String>) -> Result<Self, SyncError> {
        let name = name.into();
        let remote_key = remote_key.into();

        let reason = if name.is_empty() {
            Some("name must not be empty")
        } else if name == "." || name == ".." {
            Some("name must not be a relative directory")
        } else if name.contains(['/', '\\', '\0']) {
            Some("name must not contain path separators or NUL")
        } else if remote_key.is_empty() {
            Some("remote key must not be empty")
        } else {
            None
        };

        match reason {
            Some(reason) => Err(SyncError::InvalidDescriptor { name, reason }),
            None => Ok(Self { name, remote_key }),
        }
    }

    /// Sheet name, also used as the output file stem.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Spreadsheet document key.
    pub fn remote_key(&self) -> &str {
        &self.remote_key
    }

    /// CSV export endpoint for this sheet under `base_url`.
    ///
    /// Key and name are percent-encoded, so names such as `R&D` or `Q#2`
    /// select the right sheet.
    pub fn source_url(&self, base_url: &str) -> String {
        format!(
            "{}/spreadsheets/d/{}/gviz/tq?tqx=out:csv&sheet={}",
            base_url.trim_end_matches('/'),
            urlencoding::encode(&self.remote_key),
            urlencoding::encode(&self.name)
        )
    }

    /// Local file the sheet is written to.
    pub fn output_path(&self, output_dir: &Path) -> PathBuf {
        output_dir.join(format!("{}.csv", self.name))
    }
}

/// Result of one fetch attempt, or the terminal state of a fetch task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The sheet was written to this path.
    Success(PathBuf),
    /// The endpoint served an HTML page instead of CSV (sign-in wall or unpublished sheet).
    PermissionDenied,
    /// The body could not be written to the local filesystem.
    WriteFailure,
    /// Transport-level failure. Retried; only terminal under a bounded [`RetryPolicy`].
    NetworkError(String),
}

impl FetchOutcome {
    /// Whether this outcome ends a task's retry loop.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, FetchOutcome::NetworkError(_))
    }

    /// Failure code reported to sinks, `None` for [`FetchOutcome::Success`].
    pub fn failure_code(&self) -> Option<FailureCode> {
        match self {
            FetchOutcome::Success(_) => None,
            FetchOutcome::PermissionDenied => Some(FailureCode::PermissionDenied),
            FetchOutcome::WriteFailure => Some(FailureCode::WriteFailure),
            FetchOutcome::NetworkError(_) => Some(FailureCode::NetworkError),
        }
    }
}

/// Failure kinds delivered through [`ReportSink::on_failure`](crate::ReportSink::on_failure).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureCode {
    PermissionDenied,
    WriteFailure,
    /// Only produced when retries are bounded and exhausted.
    NetworkError,
}

impl fmt::Display for FailureCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureCode::PermissionDenied => "permission denied",
            FailureCode::WriteFailure => "write failure",
            FailureCode::NetworkError => "network error",
        };
        f.write_str(s)
    }
}

/// Configuration for syncing sheets.
///
/// # Example
///
/// ```
/// use sheetsync::{RetryPolicy, SyncConfig};
/// use std::time::Duration;
///
/// let config = SyncConfig {
///     base_url: "https://docs.google.com".to_string(),
///     output_dir: "Spreadsheets".into(),
///     request_timeout: Duration::from_secs(30),
///     retry: RetryPolicy::default(),
/// };
/// ```
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Base URL of the spreadsheet service (e.g., `<https://docs.google.com>`)
    pub base_url: String,
    /// Directory the CSV files are written to
    pub output_dir: PathBuf,
    /// Per-request timeout. A timed out request counts as a network error and is retried.
    pub request_timeout: Duration,
    /// Retry behaviour for network errors
    pub retry: RetryPolicy,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            base_url: "https://docs.google.com".to_string(),
            output_dir: PathBuf::from("Spreadsheets"),
            request_timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
        }
    }
}

impl SyncConfig {
    /// Output paths for `descriptors`, in the same order.
    pub fn output_paths(&self, descriptors: &[ResourceDescriptor]) -> Vec<PathBuf> {
        descriptors
            .iter()
            .map(|d| d.output_path(&self.output_dir))
            .collect()
    }
}
