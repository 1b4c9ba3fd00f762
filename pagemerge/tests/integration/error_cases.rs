//! Failures reported back to the caller instead of producing a document.

use pagemerge::config::Config;
use pagemerge::error::{ErrorKind, MergeError};
use pagemerge::plan::MergePlan;
use pagemerge::MergeClient;
use rstest::rstest;

use crate::common::{entries, identity_plan, labelled_pdf};

#[tokio::test]
async fn test_page_beyond_document_is_malformed_plan() {
    let client = MergeClient::spawn(Config::default()).unwrap();
    let plan = MergePlan::new()
        .with_file(labelled_pdf("A", 3, None), entries(&[(1, 1, 0)]))
        .with_file(labelled_pdf("B", 3, None), entries(&[(4, 1, 0)]));

    let err = client.request_merge(plan).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::MalformedPlan);
    assert_eq!(err.file_index(), Some(1));
    assert!(err.to_string().contains("page 4"));
    assert!(!client.is_busy());

    client.shutdown().await;
}

#[rstest]
#[case::order_gap(&[(1, 1, 0), (2, 3, 0)])]
#[case::order_repeated(&[(1, 1, 0), (2, 1, 0)])]
#[case::order_zero(&[(1, 0, 0)])]
#[case::page_zero(&[(0, 1, 0)])]
#[tokio::test]
async fn test_bad_entries_rejected(#[case] spec: &[(u32, u32, u16)]) {
    let client = MergeClient::spawn(Config::default()).unwrap();
    let plan = MergePlan::new().with_file(labelled_pdf("A", 3, None), entries(spec));

    let err = client.request_merge(plan).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::MalformedPlan);
    assert_eq!(err.file_index(), Some(0));

    client.shutdown().await;
}

#[tokio::test]
async fn test_empty_plan_rejected() {
    let client = MergeClient::spawn(Config::default()).unwrap();

    let err = client.request_merge(MergePlan::new()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedPlan);

    let no_pages = MergePlan::new().with_file(labelled_pdf("A", 1, None), Vec::new());
    let err = client.request_merge(no_pages).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedPlan);

    client.shutdown().await;
}

#[tokio::test]
async fn test_corrupt_buffer_is_decode_failure() {
    let client = MergeClient::spawn(Config::default()).unwrap();
    let plan = MergePlan::new()
        .with_file(labelled_pdf("A", 1, None), entries(&[(1, 1, 0)]))
        .with_file(b"this is not a pdf".to_vec(), entries(&[(1, 1, 0)]));

    let err = client.request_merge(plan).await.unwrap_err();

    assert!(matches!(err, MergeError::DecodeFailure { file_index: 1, .. }));
    assert!(!err.is_retryable());

    client.shutdown().await;
}

#[tokio::test]
async fn test_failure_does_not_poison_worker() {
    let client = MergeClient::spawn(Config::default()).unwrap();

    let bad = MergePlan::new().with_file(b"%PDF-broken".to_vec(), entries(&[(1, 1, 0)]));
    assert!(client.request_merge(bad).await.is_err());

    let merged = client.request_merge(identity_plan(&[2])).await.unwrap();
    assert_eq!(merged.page_count, 2);

    client.shutdown().await;
}

#[rstest]
#[case(0)]
#[case(9)]
#[tokio::test]
async fn test_invalid_batch_size_rejected(#[case] batch_size: usize) {
    let result = MergeClient::spawn(Config::default().with_batch_size(batch_size));

    let err = result.err().expect("spawn should reject the configuration");
    assert_eq!(err.kind(), ErrorKind::InvalidConfig);
}
