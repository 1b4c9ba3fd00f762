//! Page copying between documents.
//!
//! This module handles page-level operations including:
//! - Building the destination document and its flat page tree
//! - Copying single pages out of a decoded source document
//! - Resolving attributes a page inherits from its page tree ancestors
//! - Setting the absolute rotation of copied pages

use lopdf::{Dictionary, Document, Object, ObjectId, dictionary};
use std::collections::BTreeSet;

use crate::error::{MergeError, Result};
use crate::plan::Rotation;

/// Page attributes that may be inherited from ancestor page tree nodes.
///
/// `Rotate` is inheritable too, but every copied page gets an explicit one.
const INHERITABLE_KEYS: [&[u8]; 3] = [b"Resources", b"MediaBox", b"CropBox"];

/// Guard against cyclic `Parent` chains in broken files.
const MAX_TREE_DEPTH: usize = 64;

/// A decoded source document prepared for copying.
///
/// Its object ids have been shifted above the destination's, so objects can
/// move across without renumbering again.
pub struct SourceDocument {
    file_index: usize,
    document: Document,
    pages: Vec<ObjectId>,
    tree_nodes: BTreeSet<ObjectId>,
}

impl SourceDocument {
    /// Number of pages in the source.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

/// The merged document under construction.
pub struct OutputDocument {
    document: Document,
    pages_id: ObjectId,
    kids: Vec<ObjectId>,
}

impl OutputDocument {
    /// Create an empty document with a catalog and an empty page tree.
    pub fn new(version: &str) -> Self {
        let mut document = Document::with_version(version);
        let pages_id = document.new_object_id();
        let catalog_id = document.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        document.trailer.set("Root", catalog_id);

        Self {
            document,
            pages_id,
            kids: Vec::new(),
        }
    }

    /// Number of pages appended so far.
    pub fn page_count(&self) -> usize {
        self.kids.len()
    }

    /// Take ownership of a decoded source and move its object ids out of the
    /// way of everything already in (or later added to) this document.
    pub fn adopt(&mut self, file_index: usize, mut source: Document) -> SourceDocument {
        source.renumber_objects_with(self.document.max_id + 1);
        self.document.max_id = self.document.max_id.max(source.max_id);

        let pages: Vec<ObjectId> = source.get_pages().into_values().collect();

        let mut tree_nodes = BTreeSet::new();
        if let Ok(root) = source.trailer.get(b"Root").and_then(Object::as_reference) {
            tree_nodes.insert(root);
        }
        for &page_id in &pages {
            collect_ancestors(&source, page_id, &mut tree_nodes);
        }

        SourceDocument {
            file_index,
            document: source,
            pages,
            tree_nodes,
        }
    }

    /// Append a copy of the source page at `index` (0-based) and set its
    /// rotation.
    ///
    /// Objects the page refers to move into this document the first time any
    /// page needs them; later copies of the same source page share them.
    /// References back into the source's page tree become `null`.
    ///
    /// # Errors
    ///
    /// Returns [`MergeError::DecodeFailure`] if the page does not exist or is
    /// not a dictionary.
    pub fn append_page(
        &mut self,
        source: &mut SourceDocument,
        index: usize,
        rotation: Rotation,
    ) -> Result<ObjectId> {
        let file_index = source.file_index;
        let page_id = *source.pages.get(index).ok_or_else(|| {
            MergeError::decode(file_index, format!("page {} not found", index + 1))
        })?;

        let mut page = source
            .document
            .get_dictionary(page_id)
            .map_err(|e| MergeError::decode(file_index, format!("page {}: {e}", index + 1)))?
            .clone();

        for key in INHERITABLE_KEYS {
            if !page.has(key)
                && let Some(value) = inherited_attribute(&source.document, page_id, key)
            {
                page.set(key, value.clone());
            }
        }
        page.remove(b"Parent");

        let mut importer = Importer {
            target: &mut self.document,
            source: &mut source.document,
            excluded: &source.tree_nodes,
        };
        importer.import_page(&mut page);

        page.set("Parent", self.pages_id);
        page.set("Rotate", i64::from(rotation.as_degrees()));

        let new_id = self.document.add_object(page);
        self.kids.push(new_id);
        Ok(new_id)
    }

    /// Write the page tree root and return the finished document.
    pub fn finish(mut self) -> Document {
        let kids: Vec<Object> = self.kids.iter().map(|&id| Object::Reference(id)).collect();
        self.document.objects.insert(
            self.pages_id,
            dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => self.kids.len() as i64,
            }
            .into(),
        );
        self.document
    }
}

/// Record `page_id` and every page tree node above it.
fn collect_ancestors(doc: &Document, page_id: ObjectId, nodes: &mut BTreeSet<ObjectId>) {
    let mut current = page_id;
    for _ in 0..MAX_TREE_DEPTH {
        if !nodes.insert(current) {
            return;
        }
        match doc
            .get_dictionary(current)
            .and_then(|dict| dict.get(b"Parent"))
            .and_then(Object::as_reference)
        {
            Ok(parent) => current = parent,
            Err(_) => return,
        }
    }
}

/// Find `key` on the nearest ancestor of `page_id` that defines it.
fn inherited_attribute<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut node: &Dictionary = doc.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_TREE_DEPTH {
        let parent_id = node.get(b"Parent").and_then(Object::as_reference).ok()?;
        node = doc.get_dictionary(parent_id).ok()?;
        if let Ok(value) = node.get(key) {
            return Some(value);
        }
    }
    None
}

/// Moves the objects reachable from a page into the target document.
///
/// Reference chains in source files can be arbitrarily long, so the object
/// graph is walked with explicit work lists rather than recursion.
struct Importer<'a> {
    target: &'a mut Document,
    source: &'a mut Document,
    excluded: &'a BTreeSet<ObjectId>,
}

impl Importer<'_> {
    fn import_page(&mut self, page: &mut Dictionary) {
        let mut pending = Vec::new();
        collect_references(page.iter().map(|(_, value)| value), &mut pending);

        let mut moved: Vec<(ObjectId, Object)> = Vec::new();
        let mut imported = BTreeSet::new();
        while let Some(id) = pending.pop() {
            if self.excluded.contains(&id)
                || self.target.objects.contains_key(&id)
                || imported.contains(&id)
            {
                continue;
            }
            if let Some(object) = self.source.objects.remove(&id) {
                collect_references([&object], &mut pending);
                imported.insert(id);
                moved.push((id, object));
            }
        }

        let target = &*self.target;
        let excluded = self.excluded;
        let keep = |id: ObjectId| {
            !excluded.contains(&id)
                && (imported.contains(&id) || target.objects.contains_key(&id))
        };
        rewrite_references(page.iter_mut().map(|(_, value)| value), &keep);
        rewrite_references(moved.iter_mut().map(|(_, object)| object), &keep);

        self.target.objects.extend(moved);
    }
}

/// Push the targets of every reference nested in `roots` onto `out`.
fn collect_references<'a>(roots: impl IntoIterator<Item = &'a Object>, out: &mut Vec<ObjectId>) {
    let mut stack: Vec<&Object> = roots.into_iter().collect();
    while let Some(object) = stack.pop() {
        match object {
            Object::Reference(id) => out.push(*id),
            Object::Array(items) => stack.extend(items.iter()),
            Object::Dictionary(dict) => stack.extend(dict.iter().map(|(_, value)| value)),
            Object::Stream(stream) => stack.extend(stream.dict.iter().map(|(_, value)| value)),
            _ => {}
        }
    }
}

/// Replace every nested reference `keep` rejects with `null`.
fn rewrite_references<'a>(
    roots: impl IntoIterator<Item = &'a mut Object>,
    keep: &impl Fn(ObjectId) -> bool,
) {
    let mut stack: Vec<&mut Object> = roots.into_iter().collect();
    while let Some(object) = stack.pop() {
        if let Object::Reference(id) = *object {
            if !keep(id) {
                *object = Object::Null;
            }
            continue;
        }
        match object {
            Object::Array(items) => stack.extend(items.iter_mut()),
            Object::Dictionary(dict) => stack.extend(dict.iter_mut().map(|(_, value)| value)),
            Object::Stream(stream) => {
                stack.extend(stream.dict.iter_mut().map(|(_, value)| value));
            }
            _ => {}
        }
    }
}
