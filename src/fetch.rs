//! Single-sheet download with retry and outcome classification.

use crate::classify::{classify, Classification};
use crate::retry::RetryPolicy;
use crate::transport::Transport;
use crate::types::{FetchOutcome, ResourceDescriptor, SyncConfig};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio_retry2::{Retry, RetryError};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// A sheet that reached a terminal outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTask {
    pub descriptor: ResourceDescriptor,
    /// Network-error retries performed before the terminal outcome.
    pub retries: usize,
    pub outcome: FetchOutcome,
}

/// Downloads sheets through a [`Transport`] and writes them under the output directory.
pub struct Fetcher {
    transport: Arc<dyn Transport>,
    base_url: String,
    output_dir: PathBuf,
    retry: RetryPolicy,
}

impl Fetcher {
    pub fn new(transport: Arc<dyn Transport>, config: &SyncConfig) -> Self {
        Self {
            transport,
            base_url: config.base_url.clone(),
            output_dir: config.output_dir.clone(),
            retry: config.retry,
        }
    }

    /// Fetches one sheet until it reaches a terminal outcome.
    ///
    /// Network errors are retried according to the retry policy; an HTML
    /// body or a failed write ends the task immediately. Returns `None` if
    /// `cancel` fires first.
    ///
    /// # Arguments
    ///
    /// * `descriptor` - The sheet to fetch
    /// * `cancel` - Token observed while requesting and while waiting between retries
    pub async fn fetch(
        &self,
        descriptor: &ResourceDescriptor,
        cancel: &CancellationToken,
    ) -> Option<FetchTask> {
        let name = descriptor.name();
        let url = descriptor.source_url(&self.base_url);
        let url = url.as_str();
        let output_path = descriptor.output_path(&self.output_dir);
        let output_path = output_path.as_path();

        info!("⬇️  Downloading {} from {}", name, url);

        let mut attempts = 0usize;
        let result = {
            let retry = Retry::spawn(self.retry.delays(), || {
                attempts += 1;
                let attempt = attempts;
                async move {
                    match self.attempt(url, output_path).await {
                        FetchOutcome::NetworkError(detail) => {
                            warn!(
                                sheet = name,
                                attempt,
                                error = %detail,
                                "Network error, retrying"
                            );
                            RetryError::to_transient(detail)
                        }
                        outcome => Ok(outcome),
                    }
                }
            });

            tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                result = retry => Some(result),
            }
        };

        let Some(result) = result else {
            info!("Download of {} cancelled after {} attempt(s)", name, attempts);
            return None;
        };

        let outcome = result.unwrap_or_else(|detail| {
            error!("❌ Giving up on {} after {} attempt(s): {}", name, attempts, detail);
            FetchOutcome::NetworkError(detail)
        });

        match &outcome {
            FetchOutcome::Success(path) => info!("✅ Saved {} to {}", name, path.display()),
            FetchOutcome::PermissionDenied => warn!(
                "❌ {} is not accessible: the link requires sign-in or the sheet is not published",
                name
            ),
            FetchOutcome::WriteFailure => {
                warn!("❌ {} could not be written to {}", name, output_path.display())
            }
            FetchOutcome::NetworkError(_) => {}
        }

        Some(FetchTask {
            descriptor: descriptor.clone(),
            retries: attempts.saturating_sub(1),
            outcome,
        })
    }

    /// One request/classify/persist cycle.
    async fn attempt(&self, url: &str, output_path: &Path) -> FetchOutcome {
        let response = match self.transport.get(url).await {
            Ok(response) => response,
            Err(e) => return FetchOutcome::NetworkError(e.to_string()),
        };

        match response.status {
            200..=299 => {}
            408 | 429 | 500..=599 => {
                return FetchOutcome::NetworkError(format!("HTTP {}", response.status));
            }
            status => {
                warn!("HTTP {} from {}", status, url);
                return FetchOutcome::PermissionDenied;
            }
        }

        if classify(&response.body) == Classification::PermissionDenied {
            return FetchOutcome::PermissionDenied;
        }

        match write_output(output_path, &response.body).await {
            Ok(()) => FetchOutcome::Success(output_path.to_path_buf()),
            Err(e) => {
                error!("Failed to write {}: {}", output_path.display(), e);
                FetchOutcome::WriteFailure
            }
        }
    }
}

/// Writes `body` to `path`, creating parent directories and replacing any previous file.
///
/// The body goes to a sibling `.tmp` file that is renamed over `path` once
/// complete, so an interrupted write leaves the previous export intact.
async fn write_output(path: &Path, body: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let tmp_path = temp_path(path);
    let written = async {
        let mut file = BufWriter::new(tokio::fs::File::create(&tmp_path).await?);
        file.write_all(body).await?;
        file.flush().await?;
        file.into_inner().sync_all().await?;
        tokio::fs::rename(&tmp_path, path).await?;
        Ok::<(), io::Error>(())
    }
    .await;

    if written.is_err() {
        let _ = tokio::fs::remove_file(&tmp_path).await;
    }
    written
}

fn temp_path(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}
