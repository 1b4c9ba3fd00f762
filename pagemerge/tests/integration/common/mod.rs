//! Shared helpers for the integration tests.
//!
//! Test PDFs are generated in memory; every page draws the text
//! `{label}-Page-{n}` so the output order can be read back.

#![allow(dead_code)]

use lopdf::{Document, Object, ObjectId, Stream, dictionary};
use pagemerge::plan::{MergePlan, PagePlanEntry, Rotation};
use std::path::{Path, PathBuf};

/// Build a serialized PDF with `pages` labelled pages.
///
/// When `rotate` is set, each page carries its own `/Rotate`.
pub fn labelled_pdf(label: &str, pages: u32, rotate: Option<i64>) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");

    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });

    let mut kids: Vec<Object> = Vec::new();
    for n in 1..=pages {
        let content = format!("BT /F1 12 Tf 50 700 Td ({label}-Page-{n}) Tj ET");
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));

        let mut page = dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        };
        if let Some(degrees) = rotate {
            page.set("Rotate", degrees);
        }
        kids.push(doc.add_object(page).into());
    }

    doc.objects.insert(
        pages_id,
        dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => pages as i64,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => font_id },
            },
        }
        .into(),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("Failed to serialize test PDF");
    bytes
}

/// Write a labelled PDF into `dir` and return its path.
pub fn write_pdf(dir: &Path, name: &str, label: &str, pages: u32) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, labelled_pdf(label, pages, None)).expect("Failed to write test PDF");
    path
}

fn page_ids(doc: &Document) -> Vec<ObjectId> {
    doc.get_pages().into_values().collect()
}

/// The label drawn on each page, in page order.
pub fn page_labels(bytes: &[u8]) -> Vec<String> {
    let doc = Document::load_mem(bytes).expect("Output is not a readable PDF");
    page_ids(&doc)
        .into_iter()
        .map(|id| {
            let content = doc.get_page_content(id).expect("Page has no content");
            let text = String::from_utf8_lossy(&content);
            let start = text.find('(').expect("Missing label") + 1;
            let end = text.find(')').expect("Missing label");
            text[start..end].to_string()
        })
        .collect()
}

/// The `/Rotate` of each page, 0 when absent.
pub fn page_rotations(bytes: &[u8]) -> Vec<i64> {
    let doc = Document::load_mem(bytes).expect("Output is not a readable PDF");
    page_ids(&doc)
        .into_iter()
        .map(|id| {
            doc.get_dictionary(id)
                .expect("Page is not a dictionary")
                .get(b"Rotate")
                .and_then(Object::as_i64)
                .unwrap_or(0)
        })
        .collect()
}

/// Shorthand for an entry list from `(page, order, degrees)` triples.
pub fn entries(spec: &[(u32, u32, u16)]) -> Vec<PagePlanEntry> {
    spec.iter()
        .map(|&(page, order, degrees)| {
            PagePlanEntry::new(
                page,
                order,
                Rotation::from_degrees(degrees).expect("Invalid test rotation"),
            )
        })
        .collect()
}

/// Every page of each file in source order, one labelled file per count.
pub fn identity_plan(page_counts: &[u32]) -> MergePlan {
    let mut plan = MergePlan::new();
    for (index, &pages) in page_counts.iter().enumerate() {
        let spec: Vec<(u32, u32, u16)> = (1..=pages).map(|p| (p, p, 0)).collect();
        plan.push(labelled_pdf(&format!("F{index}"), pages, None), entries(&spec));
    }
    plan
}

/// A plan big enough that merging it takes many checkpoints.
pub fn large_plan(files: u32, pages: u32) -> MergePlan {
    let counts = vec![pages; files as usize];
    identity_plan(&counts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labelled_pdf_reads_back() {
        let bytes = labelled_pdf("X", 3, None);
        assert_eq!(page_labels(&bytes), vec!["X-Page-1", "X-Page-2", "X-Page-3"]);
        assert_eq!(page_rotations(&bytes), vec![0, 0, 0]);
    }

    #[test]
    fn test_identity_plan_shape() {
        let plan = identity_plan(&[2, 3]);
        assert_eq!(plan.len(), 2);
        assert_eq!(plan.total_pages(), 5);
    }
}
