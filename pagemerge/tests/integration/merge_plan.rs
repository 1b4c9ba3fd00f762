//! End-to-end merges through the client and the worker.

use pagemerge::config::{Config, Metadata};
use pagemerge::merge::{Merger, MetadataManager, NeverCancel};
use pagemerge::plan::MergePlan;
use pagemerge::protocol::TaskId;
use pagemerge::MergeClient;
use rstest::rstest;

use crate::common::{entries, identity_plan, labelled_pdf, page_labels, page_rotations};

fn reorder_plan() -> MergePlan {
    MergePlan::new()
        .with_file(labelled_pdf("A", 3, None), entries(&[(1, 2, 0), (2, 1, 90)]))
        .with_file(labelled_pdf("B", 3, None), entries(&[(1, 1, 0)]))
}

#[tokio::test]
async fn test_reorder_and_rotate_across_files() {
    let client = MergeClient::spawn(Config::default()).unwrap();

    let merged = client.request_merge(reorder_plan()).await.unwrap();

    assert_eq!(merged.page_count, 3);
    assert_eq!(
        page_labels(&merged.bytes),
        vec!["A-Page-2", "A-Page-1", "B-Page-1"]
    );
    assert_eq!(page_rotations(&merged.bytes), vec![90, 0, 0]);
    assert!(!client.is_busy());

    client.shutdown().await;
}

#[rstest]
#[case(&[1])]
#[case(&[3, 2])]
#[case(&[4, 1, 5])]
#[tokio::test]
async fn test_page_count_is_sum_of_entries(#[case] counts: &[u32]) {
    let client = MergeClient::spawn(Config::default().with_batch_size(2)).unwrap();

    let merged = client.request_merge(identity_plan(counts)).await.unwrap();

    let expected: u32 = counts.iter().sum();
    assert_eq!(merged.page_count, expected as usize);
    assert_eq!(page_labels(&merged.bytes).len(), expected as usize);
    assert_eq!(merged.statistics.files_merged, counts.len());

    client.shutdown().await;
}

#[tokio::test]
async fn test_same_page_twice_with_different_rotations() {
    let client = MergeClient::spawn(Config::default()).unwrap();
    let plan = MergePlan::new().with_file(
        labelled_pdf("D", 2, None),
        entries(&[(2, 1, 0), (2, 2, 180), (2, 3, 270)]),
    );

    let merged = client.request_merge(plan).await.unwrap();

    assert_eq!(
        page_labels(&merged.bytes),
        vec!["D-Page-2", "D-Page-2", "D-Page-2"]
    );
    assert_eq!(page_rotations(&merged.bytes), vec![0, 180, 270]);

    client.shutdown().await;
}

#[tokio::test]
async fn test_rotation_replaces_source_rotation() {
    let client = MergeClient::spawn(Config::default()).unwrap();
    let plan = MergePlan::new().with_file(
        labelled_pdf("R", 2, Some(90)),
        entries(&[(1, 1, 0), (2, 2, 270)]),
    );

    let merged = client.request_merge(plan).await.unwrap();

    assert_eq!(page_rotations(&merged.bytes), vec![0, 270]);

    client.shutdown().await;
}

#[tokio::test]
async fn test_file_with_no_entries_contributes_nothing() {
    let client = MergeClient::spawn(Config::default()).unwrap();
    let plan = MergePlan::new()
        .with_file(labelled_pdf("A", 2, None), entries(&[(2, 1, 0)]))
        .with_file(labelled_pdf("B", 2, None), Vec::new())
        .with_file(labelled_pdf("C", 2, None), entries(&[(1, 1, 0)]));

    let merged = client.request_merge(plan).await.unwrap();

    assert_eq!(page_labels(&merged.bytes), vec!["A-Page-2", "C-Page-1"]);

    client.shutdown().await;
}

#[tokio::test]
async fn test_merging_twice_gives_same_pages() {
    let client = MergeClient::spawn(Config::default()).unwrap();

    let first = client.request_merge(reorder_plan()).await.unwrap();
    let second = client.request_merge(reorder_plan()).await.unwrap();

    assert_eq!(page_labels(&first.bytes), page_labels(&second.bytes));
    assert_eq!(page_rotations(&first.bytes), page_rotations(&second.bytes));
    assert_eq!(first.page_count, second.page_count);

    client.shutdown().await;
}

#[test]
fn test_synchronous_merge_matches_worker_output() {
    let merger = Merger::new(Config::default());

    let merged = merger
        .merge(TaskId::next(), reorder_plan(), &NeverCancel)
        .unwrap();

    assert_eq!(
        page_labels(&merged.bytes),
        vec!["A-Page-2", "A-Page-1", "B-Page-1"]
    );
}

#[test]
fn test_metadata_written_to_output() {
    let metadata = Metadata::new(
        Some("Quarterly Report".to_string()),
        Some("Finance".to_string()),
        None,
        None,
    );
    let merger = Merger::new(Config::default().with_metadata(metadata));

    let merged = merger
        .merge(TaskId::next(), identity_plan(&[1]), &NeverCancel)
        .unwrap();

    let doc = lopdf::Document::load_mem(&merged.bytes).unwrap();
    let written = MetadataManager::read(&doc);
    assert_eq!(written.title.as_deref(), Some("Quarterly Report"));
    assert_eq!(written.author.as_deref(), Some("Finance"));
    assert_eq!(written.subject, None);
}
