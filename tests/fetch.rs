//! Fetcher behaviour: retry, classification and persistence.

mod common;

use common::{sheet_url, test_config, ScriptedTransport, SIGN_IN_PAGE};
use sheetsync::{FetchOutcome, Fetcher, HttpResponse, ResourceDescriptor, RetryPolicy};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::tempdir;
use tokio_util::sync::CancellationToken;

const CSV: &str = "\"id\",\"name\"\n\"1\",\"Sword\"\n";

#[tokio::test]
async fn retries_network_errors_until_success() {
    let dir = tempdir().unwrap();
    let url = sheet_url("K1", "Items");
    let transport = Arc::new(ScriptedTransport::new());
    transport
        .push_network_errors(&url, 4)
        .push(&url, Ok(HttpResponse::ok(CSV)));

    let config = test_config(dir.path());
    let fetcher = Fetcher::new(transport.clone(), &config);
    let sheet = ResourceDescriptor::new("Items", "K1").unwrap();

    let start = Instant::now();
    let task = fetcher
        .fetch(&sheet, &CancellationToken::new())
        .await
        .expect("not cancelled");

    let expected = dir.path().join("Items.csv");
    assert_eq!(task.outcome, FetchOutcome::Success(expected.clone()));
    assert_eq!(task.retries, 4);
    assert_eq!(transport.calls(&url), 5);
    assert!(
        start.elapsed() >= Duration::from_millis(40),
        "each retry waits the interval, took {:?}",
        start.elapsed()
    );
    assert_eq!(std::fs::read_to_string(expected).unwrap(), CSV);
}

#[tokio::test]
async fn server_errors_are_retried() {
    let dir = tempdir().unwrap();
    let url = sheet_url("K1", "Items");
    let transport = Arc::new(ScriptedTransport::new());
    transport
        .push(&url, Ok(HttpResponse { status: 503, body: Vec::new() }))
        .push(&url, Ok(HttpResponse { status: 429, body: Vec::new() }))
        .push(&url, Ok(HttpResponse { status: 408, body: Vec::new() }))
        .push(&url, Ok(HttpResponse::ok(CSV)));

    let fetcher = Fetcher::new(transport.clone(), &test_config(dir.path()));
    let sheet = ResourceDescriptor::new("Items", "K1").unwrap();
    let task = fetcher.fetch(&sheet, &CancellationToken::new()).await.unwrap();

    assert!(matches!(task.outcome, FetchOutcome::Success(_)));
    assert_eq!(task.retries, 3);
}

#[tokio::test]
async fn sign_in_page_is_permission_denied_without_retry() {
    let dir = tempdir().unwrap();
    let url = sheet_url("K1", "Private");
    let transport = Arc::new(ScriptedTransport::new());
    transport.push(&url, Ok(HttpResponse::ok(SIGN_IN_PAGE)));

    let fetcher = Fetcher::new(transport.clone(), &test_config(dir.path()));
    let sheet = ResourceDescriptor::new("Private", "K1").unwrap();
    let task = fetcher.fetch(&sheet, &CancellationToken::new()).await.unwrap();

    assert_eq!(task.outcome, FetchOutcome::PermissionDenied);
    assert_eq!(task.retries, 0);
    assert_eq!(transport.calls(&url), 1);
    assert!(!dir.path().join("Private.csv").exists());
}

#[tokio::test]
async fn client_error_status_is_permission_denied() {
    let dir = tempdir().unwrap();
    let url = sheet_url("K1", "Items");
    let transport = Arc::new(ScriptedTransport::new());
    transport.push(&url, Ok(HttpResponse { status: 403, body: b"Forbidden".to_vec() }));

    let fetcher = Fetcher::new(transport.clone(), &test_config(dir.path()));
    let sheet = ResourceDescriptor::new("Items", "K1").unwrap();
    let task = fetcher.fetch(&sheet, &CancellationToken::new()).await.unwrap();

    assert_eq!(task.outcome, FetchOutcome::PermissionDenied);
    assert_eq!(transport.calls(&url), 1);
}

#[tokio::test]
async fn write_error_is_write_failure_without_retry() {
    let dir = tempdir().unwrap();
    let blocker = dir.path().join("out");
    std::fs::write(&blocker, b"a file where the output directory should be").unwrap();

    let url = sheet_url("K1", "Items");
    let transport = Arc::new(ScriptedTransport::new());
    transport.push(&url, Ok(HttpResponse::ok(CSV)));

    let fetcher = Fetcher::new(transport.clone(), &test_config(&blocker));
    let sheet = ResourceDescriptor::new("Items", "K1").unwrap();
    let task = fetcher.fetch(&sheet, &CancellationToken::new()).await.unwrap();

    assert_eq!(task.outcome, FetchOutcome::WriteFailure);
    assert_eq!(task.retries, 0);
    assert_eq!(transport.calls(&url), 1);
}

#[tokio::test]
async fn bounded_policy_gives_up_with_network_error() {
    let dir = tempdir().unwrap();
    let url = sheet_url("K1", "Items");
    let transport = Arc::new(ScriptedTransport::new());
    transport.push_network_errors(&url, 1);

    let mut config = test_config(dir.path());
    config.retry = RetryPolicy {
        interval: Duration::from_millis(1),
        jitter: false,
        max_retries: Some(3),
    };
    let fetcher = Fetcher::new(transport.clone(), &config);
    let sheet = ResourceDescriptor::new("Items", "K1").unwrap();
    let task = fetcher.fetch(&sheet, &CancellationToken::new()).await.unwrap();

    assert!(matches!(task.outcome, FetchOutcome::NetworkError(_)));
    assert_eq!(task.retries, 3);
    assert_eq!(transport.calls(&url), 4);
}

#[tokio::test]
async fn cancellation_stops_retry_loop() {
    let dir = tempdir().unwrap();
    let url = sheet_url("K1", "Items");
    let transport = Arc::new(ScriptedTransport::new());
    transport.push_network_errors(&url, 1);

    let fetcher = Fetcher::new(transport.clone(), &test_config(dir.path()));
    let sheet = ResourceDescriptor::new("Items", "K1").unwrap();
    let cancel = CancellationToken::new();

    let canceller = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            cancel.cancel();
        })
    };

    let task = tokio::time::timeout(Duration::from_secs(5), fetcher.fetch(&sheet, &cancel))
        .await
        .expect("fetch should stop once cancelled");
    canceller.await.unwrap();

    assert!(task.is_none());
    assert!(transport.calls(&url) >= 1);
}

#[tokio::test]
async fn cancelling_during_write_keeps_previous_export() {
    let dir = tempdir().unwrap();
    let previous = "\"id\"\n\"previous\"\n";
    let output = dir.path().join("Items.csv");
    let staging = dir.path().join("Items.csv.tmp");
    std::fs::write(&output, previous).unwrap();

    let fresh: Vec<u8> = b"id,name\n".iter().copied().cycle().take(32 * 1024 * 1024).collect();
    let url = sheet_url("K1", "Items");
    let transport = Arc::new(ScriptedTransport::new());
    transport.push(&url, Ok(HttpResponse::ok(fresh.clone())));

    let fetcher = Fetcher::new(transport.clone(), &test_config(dir.path()));
    let sheet = ResourceDescriptor::new("Items", "K1").unwrap();
    let cancel = CancellationToken::new();

    let canceller = {
        let cancel = cancel.clone();
        let staging = staging.clone();
        tokio::spawn(async move {
            let deadline = Instant::now() + Duration::from_secs(5);
            while !staging.exists() && Instant::now() < deadline {
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
            cancel.cancel();
        })
    };

    let task = fetcher.fetch(&sheet, &cancel).await;
    canceller.await.unwrap();

    let on_disk = std::fs::read(&output).unwrap();
    match task {
        None => assert_eq!(on_disk, previous.as_bytes()),
        Some(task) => {
            assert_eq!(task.outcome, FetchOutcome::Success(output.clone()));
            assert_eq!(on_disk.len(), fresh.len());
        }
    }
}
