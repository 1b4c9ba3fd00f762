//! Aborting and superseding merges.

use pagemerge::config::Config;
use pagemerge::error::ErrorKind;
use pagemerge::MergeClient;
use std::time::{Duration, Instant};

use crate::common::{identity_plan, large_plan, page_labels};

fn slow_config() -> Config {
    Config::default().with_batch_size(1)
}

async fn wait_until_stopped(client: &MergeClient, limit: Duration) -> bool {
    let deadline = Instant::now() + limit;
    while client.is_stopping() {
        if Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    true
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_abort_resolves_cancelled_quickly() {
    let client = MergeClient::spawn(slow_config()).unwrap();

    let pending = client.request_merge(large_plan(50, 10));
    tokio::time::sleep(Duration::from_millis(20)).await;

    let started = Instant::now();
    assert!(client.abort());
    let outcome = pending.await;

    assert_eq!(outcome.unwrap_err().kind(), ErrorKind::Cancelled);
    assert!(started.elapsed() < Duration::from_millis(500));
    assert!(!client.is_busy());

    client.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_worker_acknowledges_abort() {
    let client = MergeClient::spawn(slow_config()).unwrap();

    let pending = client.request_merge(large_plan(200, 10));
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(client.abort());

    assert!(pending.await.unwrap_err().is_cancelled());
    assert!(wait_until_stopped(&client, Duration::from_secs(5)).await);

    client.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_new_request_supersedes_running_one() {
    let client = MergeClient::spawn(slow_config()).unwrap();

    let first = client.request_merge(large_plan(200, 10));
    let second = client.request_merge(identity_plan(&[2]));

    assert!(first.await.unwrap_err().is_cancelled());

    let merged = second.await.unwrap();
    assert_eq!(page_labels(&merged.bytes), vec!["F0-Page-1", "F0-Page-2"]);
    assert!(!client.is_busy());

    client.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_client_usable_after_abort() {
    let client = MergeClient::spawn(slow_config()).unwrap();

    let aborted = client.request_merge(large_plan(100, 10));
    assert!(client.abort());
    assert!(aborted.await.unwrap_err().is_cancelled());

    let merged = client.request_merge(identity_plan(&[1, 1])).await.unwrap();
    assert_eq!(merged.page_count, 2);

    client.shutdown().await;
}

#[tokio::test]
async fn test_abort_when_idle_is_noop() {
    let client = MergeClient::spawn(Config::default()).unwrap();

    assert!(!client.abort());
    assert!(!client.resend_abort());
    assert!(!client.is_stopping());

    client.shutdown().await;
}

#[tokio::test]
async fn test_abort_after_completion_is_noop() {
    let client = MergeClient::spawn(Config::default()).unwrap();

    let merged = client.request_merge(identity_plan(&[1])).await.unwrap();
    assert_eq!(merged.page_count, 1);

    assert!(!client.abort());

    client.shutdown().await;
}
