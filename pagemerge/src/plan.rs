//! Merge plan model.
//!
//! A [`MergePlan`] is the complete input of a merge: an ordered list of source
//! files, each with the pages to take from it, where to put them and how to
//! rotate them. Plans are built upstream (by a UI or the CLI) and validated
//! here before any PDF work starts.
//!
//! # Examples
//!
//! ```
//! use pagemerge::plan::{MergePlan, PagePlanEntry, Rotation};
//!
//! # fn example(file_a: Vec<u8>, file_b: Vec<u8>) -> pagemerge::Result<()> {
//! let mut plan = MergePlan::new();
//! plan.push(
//!     file_a,
//!     vec![
//!         PagePlanEntry::new(1, 2, Rotation::None),
//!         PagePlanEntry::new(2, 1, Rotation::Clockwise90),
//!     ],
//! );
//! plan.push(file_b, vec![PagePlanEntry::new(1, 1, Rotation::None)]);
//!
//! plan.validate()?;
//! assert_eq!(plan.total_pages(), 3);
//! # Ok(())
//! # }
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{MergeError, Result};

/// Page rotation in degrees, clockwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub enum Rotation {
    /// Upright.
    #[default]
    None,
    /// Rotate 90 degrees clockwise.
    Clockwise90,
    /// Rotate 180 degrees.
    Rotate180,
    /// Rotate 270 degrees clockwise (90 counter-clockwise).
    Clockwise270,
}

impl Rotation {
    /// Parse rotation from degrees.
    ///
    /// # Errors
    ///
    /// Returns an error unless `degrees` is 0, 90, 180 or 270.
    pub fn from_degrees(degrees: u16) -> Result<Self> {
        match degrees {
            0 => Ok(Self::None),
            90 => Ok(Self::Clockwise90),
            180 => Ok(Self::Rotate180),
            270 => Ok(Self::Clockwise270),
            _ => Err(MergeError::malformed(format!(
                "Invalid rotation: {degrees}. Must be 0, 90, 180, or 270"
            ))),
        }
    }

    /// Get rotation as degrees.
    pub fn as_degrees(&self) -> u16 {
        match self {
            Self::None => 0,
            Self::Clockwise90 => 90,
            Self::Rotate180 => 180,
            Self::Clockwise270 => 270,
        }
    }
}

impl TryFrom<u16> for Rotation {
    type Error = MergeError;

    fn try_from(degrees: u16) -> Result<Self> {
        Self::from_degrees(degrees)
    }
}

impl From<Rotation> for u16 {
    fn from(rotation: Rotation) -> Self {
        rotation.as_degrees()
    }
}

/// One page's placement and orientation in the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagePlanEntry {
    /// 1-based page number in the original source document.
    pub source_page_number: u32,

    /// 1-based position among the pages taken from the same file.
    pub order: u32,

    /// Absolute rotation of the output page.
    #[serde(default)]
    pub rotation: Rotation,
}

impl PagePlanEntry {
    /// Create a plan entry.
    pub fn new(source_page_number: u32, order: u32, rotation: Rotation) -> Self {
        Self {
            source_page_number,
            order,
            rotation,
        }
    }

    /// Zero-based index of the source page; `None` for page number zero.
    pub fn source_index(&self) -> Option<usize> {
        (self.source_page_number as usize).checked_sub(1)
    }
}

/// The raw bytes of one uploaded PDF.
///
/// Not `Clone`. A buffer moves into the worker with the request that carries
/// it and is gone from the caller afterwards.
#[derive(PartialEq, Eq, Default)]
pub struct SourceBuffer(Vec<u8>);

impl SourceBuffer {
    /// Wrap raw PDF bytes.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Borrow the raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Size in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the buffer holds no bytes at all.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Take the bytes back out.
    pub fn into_inner(self) -> Vec<u8> {
        self.0
    }
}

impl From<Vec<u8>> for SourceBuffer {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl fmt::Debug for SourceBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SourceBuffer")
            .field(&format_args!("{} bytes", self.0.len()))
            .finish()
    }
}

/// One source file and the pages to take from it.
#[derive(Debug)]
pub struct FilePlan {
    /// The file's bytes.
    pub source: SourceBuffer,

    /// Pages to copy, in any order; `order` decides placement.
    pub pages: Vec<PagePlanEntry>,
}

/// Complete input of a merge operation.
#[derive(Debug, Default)]
pub struct MergePlan {
    files: Vec<FilePlan>,
}

impl MergePlan {
    /// Create an empty plan.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a file; files are concatenated in push order.
    pub fn push(&mut self, source: impl Into<SourceBuffer>, pages: Vec<PagePlanEntry>) {
        self.files.push(FilePlan {
            source: source.into(),
            pages,
        });
    }

    /// Builder-style [`MergePlan::push`].
    pub fn with_file(mut self, source: impl Into<SourceBuffer>, pages: Vec<PagePlanEntry>) -> Self {
        self.push(source, pages);
        self
    }

    /// Files in output order.
    pub fn files(&self) -> &[FilePlan] {
        &self.files
    }

    /// Number of files.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether the plan has no files.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Number of pages the output will have.
    pub fn total_pages(&self) -> usize {
        self.files.iter().map(|f| f.pages.len()).sum()
    }

    /// Combined size of all source buffers.
    pub fn total_bytes(&self) -> u64 {
        self.files.iter().map(|f| f.source.len() as u64).sum()
    }

    /// Check the invariants that do not need the decoded documents.
    ///
    /// # Errors
    ///
    /// Returns [`MergeError::MalformedPlan`] if:
    /// - the plan has no files, or selects no pages at all
    /// - a file's `order` values are not a permutation of `1..=N`
    /// - a `source_page_number` is zero
    pub fn validate(&self) -> Result<()> {
        if self.files.is_empty() {
            return Err(MergeError::malformed("plan contains no files"));
        }

        for (file_index, file) in self.files.iter().enumerate() {
            validate_entries(file_index, &file.pages)?;
        }

        if self.total_pages() == 0 {
            return Err(MergeError::malformed("plan selects no pages"));
        }

        Ok(())
    }

    /// Split the plan into its buffers and page lists, positionally matched.
    pub fn into_parts(self) -> (Vec<SourceBuffer>, Vec<Vec<PagePlanEntry>>) {
        self.files.into_iter().map(|f| (f.source, f.pages)).unzip()
    }

    /// Reassemble a plan from positionally matched parts.
    ///
    /// # Errors
    ///
    /// Returns [`MergeError::MalformedPlan`] if the two lists differ in length.
    pub fn from_parts(
        buffers: Vec<SourceBuffer>,
        pages_by_file: Vec<Vec<PagePlanEntry>>,
    ) -> Result<Self> {
        if buffers.len() != pages_by_file.len() {
            return Err(MergeError::malformed(format!(
                "{} buffer(s) but {} page list(s)",
                buffers.len(),
                pages_by_file.len()
            )));
        }

        let files = buffers
            .into_iter()
            .zip(pages_by_file)
            .map(|(source, pages)| FilePlan { source, pages })
            .collect();

        Ok(Self { files })
    }

    pub(crate) fn into_files(self) -> Vec<FilePlan> {
        self.files
    }
}

/// Validate one file's entries: positive page numbers, orders forming `1..=N`.
pub fn validate_entries(file_index: usize, entries: &[PagePlanEntry]) -> Result<()> {
    let count = entries.len();
    let mut seen = vec![false; count];

    for entry in entries {
        if entry.source_page_number == 0 {
            return Err(MergeError::malformed_in(
                file_index,
                "page numbers must be positive (1-indexed)",
            ));
        }

        let order = entry.order as usize;
        if order == 0 || order > count {
            return Err(MergeError::malformed_in(
                file_index,
                format!("order {order} is outside 1..={count}"),
            ));
        }

        if std::mem::replace(&mut seen[order - 1], true) {
            return Err(MergeError::malformed_in(
                file_index,
                format!("order {order} appears more than once"),
            ));
        }
    }

    Ok(())
}

/// Check every entry against the decoded document's page count.
pub fn check_page_bounds(
    file_index: usize,
    entries: &[PagePlanEntry],
    page_count: usize,
) -> Result<()> {
    match entries
        .iter()
        .find(|e| e.source_page_number as usize > page_count)
    {
        Some(entry) => Err(MergeError::malformed_in(
            file_index,
            format!(
                "page {} requested but the document has {page_count} page(s)",
                entry.source_page_number
            ),
        )),
        None => Ok(()),
    }
}

/// Arrange entries by ascending `order`.
pub fn in_output_order(entries: &[PagePlanEntry]) -> Vec<PagePlanEntry> {
    let mut sorted = entries.to_vec();
    sorted.sort_by_key(|e| e.order);
    sorted
}
