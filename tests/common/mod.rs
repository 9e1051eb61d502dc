//! Shared test doubles: a scripted transport and a recording report sink.

#![allow(dead_code)]

use async_trait::async_trait;
use sheetsync::{
    FailureCode, HttpResponse, ReportSink, ResourceDescriptor, RetryPolicy, SyncConfig, Transport,
    TransportError,
};
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::Semaphore;

pub const BASE_URL: &str = "http://sheets.test";

pub const SIGN_IN_PAGE: &str =
    "<!DOCTYPE html><html><head><title>Sign in</title></head><body>Sign in</body></html>";

pub fn test_config(output_dir: &Path) -> SyncConfig {
    SyncConfig {
        base_url: BASE_URL.to_string(),
        output_dir: output_dir.to_path_buf(),
        request_timeout: Duration::from_secs(5),
        retry: RetryPolicy {
            interval: Duration::from_millis(10),
            jitter: false,
            max_retries: None,
        },
    }
}

pub fn sheet_url(key: &str, name: &str) -> String {
    ResourceDescriptor::new(name, key).unwrap().source_url(BASE_URL)
}

type Reply = Result<HttpResponse, TransportError>;

/// Replays queued replies per URL; once a queue is drained its last reply repeats.
///
/// With a gate, every request first waits for a permit released by the test.
#[derive(Default)]
pub struct ScriptedTransport {
    replies: Mutex<HashMap<String, VecDeque<Reply>>>,
    last: Mutex<HashMap<String, Reply>>,
    calls: Mutex<HashMap<String, usize>>,
    total: AtomicUsize,
    gate: Option<Semaphore>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gated() -> Self {
        Self {
            gate: Some(Semaphore::new(0)),
            ..Self::default()
        }
    }

    pub fn push(&self, url: &str, reply: Reply) -> &Self {
        self.replies
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .push_back(reply);
        self
    }

    pub fn push_network_errors(&self, url: &str, count: usize) -> &Self {
        for i in 0..count {
            self.push(url, Err(TransportError(format!("connection reset #{}", i))));
        }
        self
    }

    pub fn release(&self, permits: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(permits);
        }
    }

    pub fn calls(&self, url: &str) -> usize {
        self.calls.lock().unwrap().get(url).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn get(&self, url: &str) -> Result<HttpResponse, TransportError> {
        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }

        self.total.fetch_add(1, Ordering::SeqCst);
        *self.calls.lock().unwrap().entry(url.to_string()).or_default() += 1;

        let queued = self
            .replies
            .lock()
            .unwrap()
            .get_mut(url)
            .and_then(|q| q.pop_front());
        let mut last = self.last.lock().unwrap();
        match queued {
            Some(reply) => {
                last.insert(url.to_string(), reply.clone());
                reply
            }
            None => last
                .get(url)
                .cloned()
                .unwrap_or_else(|| Err(TransportError(format!("no route to {}", url)))),
        }
    }
}

/// Records every sink call.
#[derive(Default)]
pub struct RecordingSink {
    pub successes: Mutex<Vec<Vec<PathBuf>>>,
    pub failures: Mutex<Vec<Vec<FailureCode>>>,
}

impl ReportSink for RecordingSink {
    fn on_success(&self, paths: &[PathBuf]) {
        self.successes.lock().unwrap().push(paths.to_vec());
    }

    fn on_failure(&self, codes: &[FailureCode]) {
        self.failures.lock().unwrap().push(codes.to_vec());
    }
}
