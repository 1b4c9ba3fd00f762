//! In-memory PDF fixtures for unit tests.

use lopdf::{Document, Object, ObjectId, Stream, dictionary};

/// Build a document whose page `n` shows the text `{label}-Page-{n}`.
///
/// Resources and MediaBox live on the page tree root, so every page inherits
/// them. When `rotate` is set, each page carries its own `/Rotate`.
pub(crate) fn sample_document(label: &str, pages: u32, rotate: Option<i64>) -> Document {
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

        let page_id = doc.add_object(page);
        kids.push(page_id.into());
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

    doc
}

/// A one-page document whose page hangs a chain of `depth` nested indirect
/// arrays off `/PieceInfo`.
pub(crate) fn deep_reference_document(depth: usize) -> Document {
    let mut doc = sample_document("Deep", 1, None);

    let mut head = doc.add_object(Object::Array(Vec::new()));
    for _ in 1..depth {
        head = doc.add_object(Object::Array(vec![Object::Reference(head)]));
    }

    let page_id = page_ids(&doc)[0];
    doc.get_object_mut(page_id)
        .unwrap()
        .as_dict_mut()
        .unwrap()
        .set("PieceInfo", head);
    doc
}

/// Serialized [`deep_reference_document`].
pub(crate) fn deep_reference_pdf(depth: usize) -> Vec<u8> {
    save(deep_reference_document(depth))
}

/// Serialized [`sample_document`] without intrinsic rotation.
pub(crate) fn sample_pdf(label: &str, pages: u32) -> Vec<u8> {
    save(sample_document(label, pages, None))
}

/// Serialized [`sample_document`] whose pages carry `/Rotate rotate`.
pub(crate) fn rotated_sample_pdf(label: &str, pages: u32, rotate: i64) -> Vec<u8> {
    save(sample_document(label, pages, Some(rotate)))
}

fn save(mut doc: Document) -> Vec<u8> {
    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

fn page_ids(doc: &Document) -> Vec<ObjectId> {
    doc.get_pages().into_values().collect()
}

/// The `X-Page-N` label drawn on each page of a serialized PDF, in page order.
pub(crate) fn page_labels(bytes: &[u8]) -> Vec<String> {
    let doc = Document::load_mem(bytes).unwrap();
    page_ids(&doc)
        .into_iter()
        .map(|id| {
            let content = doc.get_page_content(id).unwrap();
            let text = String::from_utf8_lossy(&content);
            let start = text.find('(').unwrap() + 1;
            let end = text.find(')').unwrap();
            text[start..end].to_string()
        })
        .collect()
}

/// The `/Rotate` value of each page of a serialized PDF, 0 when absent.
pub(crate) fn page_rotations(bytes: &[u8]) -> Vec<i64> {
    let doc = Document::load_mem(bytes).unwrap();
    page_ids(&doc)
        .into_iter()
        .map(|id| {
            doc.get_dictionary(id)
                .unwrap()
                .get(b"Rotate")
                .and_then(Object::as_i64)
                .unwrap_or(0)
        })
        .collect()
}
