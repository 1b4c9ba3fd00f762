//! PDF metadata management.
//!
//! This module handles the output's Info dictionary:
//! - Title, Author, Subject, Keywords
//! - Producer
//! - Creation and modification dates

use chrono::{DateTime, Utc};
use lopdf::{Dictionary, Document, Object, StringFormat};

use crate::config::Metadata;

/// Writes the Info dictionary of merged documents.
pub struct MetadataManager {
    producer: String,
}

impl MetadataManager {
    /// Create a manager stamping documents with the given producer name.
    pub fn new(producer: impl Into<String>) -> Self {
        Self {
            producer: producer.into(),
        }
    }

    /// Replace the document's Info dictionary.
    ///
    /// Producer and dates are always written; the descriptive fields only
    /// when set in `metadata`. Source documents never contribute an Info
    /// dictionary, so whatever the merged document has is replaced.
    pub fn apply(&self, doc: &mut Document, metadata: &Metadata, now: DateTime<Utc>) {
        let mut info = Dictionary::new();

        let fields = [
            ("Title", &metadata.title),
            ("Author", &metadata.author),
            ("Subject", &metadata.subject),
            ("Keywords", &metadata.keywords),
        ];
        for (key, value) in fields {
            if let Some(value) = value {
                info.set(key, text(value));
            }
        }

        info.set("Producer", text(&self.producer));
        let date = format_pdf_date(now);
        info.set("CreationDate", text(&date));
        info.set("ModDate", text(&date));

        let info_id = doc.add_object(info);
        doc.trailer.set("Info", Object::Reference(info_id));
    }

    /// Read the descriptive fields back from a document.
    pub fn read(doc: &Document) -> Metadata {
        let Some(info) = doc
            .trailer
            .get(b"Info")
            .and_then(Object::as_reference)
            .ok()
            .and_then(|id| doc.get_dictionary(id).ok())
        else {
            return Metadata::default();
        };

        Metadata::new(
            string_field(info, b"Title"),
            string_field(info, b"Author"),
            string_field(info, b"Subject"),
            string_field(info, b"Keywords"),
        )
    }
}

const UTF16_BOM: [u8; 2] = [0xFE, 0xFF];

/// Encode a text string: ASCII as a literal, anything else as UTF-16BE with
/// a byte order mark.
fn text(value: &str) -> Object {
    if value.is_ascii() {
        return Object::String(value.as_bytes().to_vec(), StringFormat::Literal);
    }

    let mut bytes = UTF16_BOM.to_vec();
    bytes.extend(value.encode_utf16().flat_map(u16::to_be_bytes));
    Object::String(bytes, StringFormat::Hexadecimal)
}

fn string_field(dict: &Dictionary, key: &[u8]) -> Option<String> {
    match dict.get(key).ok()? {
        Object::String(bytes, _) => decode_text(bytes),
        _ => None,
    }
}

fn decode_text(bytes: &[u8]) -> Option<String> {
    match bytes.strip_prefix(&UTF16_BOM) {
        Some(utf16) => {
            let units: Vec<u16> = utf16
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .collect();
            String::from_utf16(&units).ok()
        }
        None => String::from_utf8(bytes.to_vec()).ok(),
    }
}

/// Format a timestamp as a PDF date string (`D:YYYYMMDDHHmmSSZ`).
fn format_pdf_date(time: DateTime<Utc>) -> String {
    time.format("D:%Y%m%d%H%M%SZ").to_string()
}
