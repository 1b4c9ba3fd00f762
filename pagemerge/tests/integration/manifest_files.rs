//! Merging files named by a JSON manifest, from disk to disk.

use pagemerge::config::Config;
use pagemerge::io::{PdfWriter, SourceReader, page_count};
use pagemerge::manifest::{PlanManifest, entries_for};
use pagemerge::plan::{MergePlan, Rotation};
use pagemerge::MergeClient;
use tempfile::TempDir;

use crate::common::{page_labels, page_rotations, write_pdf};

const MANIFEST: &str = r#"{
  "files": [
    {
      "path": "a.pdf",
      "pages": [
        { "sourcePageNumber": 1, "order": 2, "rotation": 0 },
        { "sourcePageNumber": 2, "order": 1, "rotation": 90 }
      ]
    },
    { "path": "b.pdf" }
  ]
}"#;

async fn plan_from_manifest(manifest: &PlanManifest) -> MergePlan {
    let reader = SourceReader::new();
    let (sources, stats) = reader.read_all(&manifest.paths(), 2).await.unwrap();
    assert_eq!(stats.file_count, manifest.files.len());

    let mut plan = MergePlan::new();
    for (index, (file, source)) in manifest.files.iter().zip(sources).enumerate() {
        let pages = match &file.pages {
            Some(pages) => pages.clone(),
            None => {
                let count = page_count(index, source.buffer.as_bytes()).unwrap();
                entries_for(count, None, Rotation::None)
            }
        };
        plan.push(source.buffer, pages);
    }
    plan
}

#[tokio::test]
async fn test_manifest_merge_to_file() {
    let dir = TempDir::new().unwrap();
    write_pdf(dir.path(), "a.pdf", "A", 3);
    write_pdf(dir.path(), "b.pdf", "B", 2);
    let manifest_path = dir.path().join("plan.json");
    std::fs::write(&manifest_path, MANIFEST).unwrap();

    let manifest = PlanManifest::load(&manifest_path).await.unwrap();
    let plan = plan_from_manifest(&manifest).await;

    let client = MergeClient::spawn(Config::default()).unwrap();
    let merged = client.request_merge(plan).await.unwrap();
    client.shutdown().await;

    let output = dir.path().join("out.pdf");
    let stats = PdfWriter::new().write(merged.bytes, &output).await.unwrap();
    assert!(stats.file_size > 0);

    let written = std::fs::read(&output).unwrap();
    assert_eq!(
        page_labels(&written),
        vec!["A-Page-2", "A-Page-1", "B-Page-1", "B-Page-2"]
    );
    assert_eq!(page_rotations(&written), vec![90, 0, 0, 0]);
}

#[tokio::test]
async fn test_manifest_survives_serialization() {
    let manifest = PlanManifest::from_json(MANIFEST).unwrap();

    let reparsed = PlanManifest::from_json(&manifest.to_json().unwrap()).unwrap();

    assert_eq!(manifest, reparsed);
    assert!(reparsed.files[1].pages.is_none());
}

#[tokio::test]
async fn test_missing_source_is_io_error() {
    let dir = TempDir::new().unwrap();
    write_pdf(dir.path(), "a.pdf", "A", 3);
    let manifest_path = dir.path().join("plan.json");
    std::fs::write(&manifest_path, MANIFEST).unwrap();

    let manifest = PlanManifest::load(&manifest_path).await.unwrap();
    let err = SourceReader::new()
        .read_all(&manifest.paths(), 2)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), pagemerge::ErrorKind::Io);
    assert!(err.to_string().contains("b.pdf"));
}
