//! Main orchestration logic for syncing sheets.

use crate::error::SyncError;
use crate::fetch::{FetchTask, Fetcher};
use crate::report::{NoopSink, ReportSink, RunReport};
use crate::transport::{HttpTransport, Transport};
use crate::types::{ResourceDescriptor, SyncConfig};
use futures_util::future::join_all;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// How a call to [`Orchestrator::start_run`] ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    /// Every sheet reached a terminal outcome and the report was delivered.
    Completed(RunReport),
    /// Another run was in flight; nothing was started.
    AlreadyRunning,
    /// The run was cancelled before all sheets finished; no report was delivered.
    Cancelled,
}

#[derive(Debug)]
enum RunState {
    Idle,
    Running(CancellationToken),
}

/// Runs one parallel download per sheet and reports the combined result.
///
/// At most one run is in flight per orchestrator. The report of a completed
/// run is delivered to the configured [`ReportSink`] exactly once.
///
/// # Example
///
/// ```no_run
/// use sheetsync::{Orchestrator, ResourceDescriptor, RunStatus, SyncConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let orchestrator = Orchestrator::new(&SyncConfig::default())?;
/// let sheets = vec![ResourceDescriptor::new("Items", "1AbCdEf")?];
///
/// if let RunStatus::Completed(report) = orchestrator.start_run(sheets).await {
///     println!("{} saved, {} failed", report.successes.len(), report.failures.len());
/// }
/// # Ok(())
/// # }
/// ```
pub struct Orchestrator {
    fetcher: Arc<Fetcher>,
    sink: Arc<dyn ReportSink>,
    progress: indicatif::ProgressBar,
    state: Mutex<RunState>,
}

impl Orchestrator {
    /// Creates an orchestrator that downloads over HTTP.
    pub fn new(config: &SyncConfig) -> Result<Self, SyncError> {
        let transport = HttpTransport::new(config.request_timeout)?;
        Ok(Self::with_transport(Arc::new(transport), config))
    }

    /// Creates an orchestrator on top of a custom [`Transport`].
    pub fn with_transport(transport: Arc<dyn Transport>, config: &SyncConfig) -> Self {
        Self {
            fetcher: Arc::new(Fetcher::new(transport, config)),
            sink: Arc::new(NoopSink),
            progress: indicatif::ProgressBar::hidden(),
            state: Mutex::new(RunState::Idle),
        }
    }

    /// Sets the sink that receives each completed run's report.
    pub fn with_sink(mut self, sink: Arc<dyn ReportSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Ticks `progress` once per sheet that reaches a terminal outcome.
    pub fn with_progress(mut self, progress: indicatif::ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// Whether a run is currently in flight.
    pub fn is_running(&self) -> bool {
        matches!(*self.lock_state(), RunState::Running(_))
    }

    /// Cancels the in-flight run, if any.
    ///
    /// The pending [`start_run`](Self::start_run) call returns
    /// [`RunStatus::Cancelled`] once all of its downloads have stopped.
    pub fn cancel(&self) {
        if let RunState::Running(token) = &*self.lock_state() {
            info!("Cancelling sheet sync run");
            token.cancel();
        }
    }

    /// Downloads every sheet in parallel and waits until all of them finish.
    ///
    /// Returns [`RunStatus::AlreadyRunning`] without side effects if a run is
    /// already in flight. Dropping the returned future cancels the run.
    ///
    /// # Arguments
    ///
    /// * `descriptors` - Sheets to fetch; the report keeps this order
    pub async fn start_run(&self, descriptors: Vec<ResourceDescriptor>) -> RunStatus {
        let cancel = {
            let mut state = self.lock_state();
            if let RunState::Running(_) = *state {
                info!("Sheet sync already in progress, ignoring start request");
                return RunStatus::AlreadyRunning;
            }
            let token = CancellationToken::new();
            *state = RunState::Running(token.clone());
            token
        };
        let idle_on_exit = IdleOnDrop { state: &self.state };
        let _cancel_on_drop = cancel.clone().drop_guard();

        info!("🚀 Starting sync of {} sheet(s)", descriptors.len());
        self.progress.set_length(descriptors.len() as u64);
        self.progress.set_position(0);

        let handles: Vec<_> = descriptors
            .into_iter()
            .map(|descriptor| {
                let fetcher = Arc::clone(&self.fetcher);
                let cancel = cancel.clone();
                let pb = self.progress.clone();
                tokio::spawn(async move {
                    let task = fetcher.fetch(&descriptor, &cancel).await;
                    if task.is_some() {
                        pb.inc(1);
                    }
                    task
                })
            })
            .collect();

        let mut tasks: Vec<FetchTask> = Vec::with_capacity(handles.len());
        let mut cancelled = false;
        for joined in join_all(handles).await {
            match joined {
                Ok(Some(task)) => tasks.push(task),
                Ok(None) => cancelled = true,
                Err(e) if e.is_panic() => {
                    error!("Download task panicked: {}", e);
                    std::panic::resume_unwind(e.into_panic());
                }
                Err(e) => {
                    error!("Task join error: {}", e);
                    cancelled = true;
                }
            }
        }

        drop(idle_on_exit);

        if cancelled {
            self.progress.abandon_with_message("❌ Sync cancelled");
            info!("Sheet sync cancelled, {} sheet(s) had finished", tasks.len());
            return RunStatus::Cancelled;
        }

        let report = RunReport::aggregate(tasks);
        info!(
            "🏁 Sheet sync finished: {} saved, {} failed",
            report.successes.len(),
            report.failures.len()
        );
        self.progress.finish();
        report.deliver(self.sink.as_ref());
        RunStatus::Completed(report)
    }

    fn lock_state(&self) -> MutexGuard<'_, RunState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Returns the orchestrator to idle when the run ends, however it ends.
struct IdleOnDrop<'a> {
    state: &'a Mutex<RunState>,
}

impl Drop for IdleOnDrop<'_> {
    fn drop(&mut self) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = RunState::Idle;
    }
}
