//! SheetSync - Parallel downloader for published spreadsheet sheets
//!
//! This library downloads a set of spreadsheet sheets as CSV files, one
//! concurrent task per sheet, and reports which sheets were saved and which
//! failed and why.
//!
//! # Features
//!
//! - **Parallel Downloads**: Every sheet is fetched at the same time
//! - **Automatic Retry**: Network errors are retried on a fixed interval, forever by default
//! - **Access Detection**: HTML sign-in pages are reported instead of being saved as CSV
//! - **Single Report**: Each run delivers exactly one aggregated report
//! - **Cancellation**: An in-flight run can be cancelled without leaking tasks
//!
//! # Example
//!
//! ```no_run
//! use sheetsync::{Orchestrator, ResourceDescriptor, RunStatus, SyncConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = SyncConfig::default();
//! let sheets = vec![
//!     ResourceDescriptor::new("Items", "1AbCdEf")?,
//!     ResourceDescriptor::new("Quests", "1AbCdEf")?,
//! ];
//!
//! let orchestrator = Orchestrator::new(&config)?;
//! if let RunStatus::Completed(report) = orchestrator.start_run(sheets).await {
//!     for (name, outcome) in &report.failures {
//!         eprintln!("{}: {:?}", name, outcome);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

mod classify;
mod config;
mod error;
mod fetch;
mod orchestrator;
mod report;
mod retry;
mod transport;
mod types;

pub use classify::{classify, Classification};
pub use config::{parse_entries, SheetEntry, SheetList};
pub use error::SyncError;
pub use fetch::{FetchTask, Fetcher};
pub use orchestrator::{Orchestrator, RunStatus};
pub use report::{NoopSink, ReportSink, RunReport};
pub use retry::RetryPolicy;
pub use transport::{HttpResponse, HttpTransport, Transport, TransportError};
pub use types::{FailureCode, FetchOutcome, ResourceDescriptor, SyncConfig};
