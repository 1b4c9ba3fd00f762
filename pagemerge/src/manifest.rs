//! Building merge plans from page ranges and JSON manifests.
//!
//! A manifest names the source files and, optionally, the exact page plan for
//! each one:
//!
//! ```json
//! {
//!   "files": [
//!     { "path": "a.pdf", "pages": [ { "sourcePageNumber": 2, "order": 1, "rotation": 90 } ] },
//!     { "path": "b.pdf" }
//!   ]
//! }
//! ```
//!
//! A file without `pages` contributes all its pages in source order.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{MergeError, Result};
use crate::plan::{PagePlanEntry, Rotation};

/// Page range specification, e.g. `"1-5,10,15-20"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRange {
    ranges: Vec<PageRangeItem>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum PageRangeItem {
    Single(u32),
    Range(u32, u32),
}

impl PageRange {
    /// Parse a page range string.
    ///
    /// # Errors
    ///
    /// Returns [`MergeError::InvalidConfig`] if the string format is invalid
    /// or contains invalid page numbers.
    ///
    /// # Examples
    ///
    /// ```
    /// use pagemerge::manifest::PageRange;
    ///
    /// let range = PageRange::parse("1-5,10").unwrap();
    /// assert!(range.contains(3));
    /// assert!(range.contains(10));
    /// assert!(!range.contains(7));
    /// ```
    pub fn parse(s: &str) -> Result<Self> {
        let mut ranges = Vec::new();

        for part in s.split(',').map(str::trim) {
            if part.is_empty() {
                continue;
            }

            if let Some((start, end)) = part.split_once('-') {
                let start = parse_page(start)?;
                let end = parse_page(end)?;

                if start > end {
                    return Err(MergeError::invalid_config(format!(
                        "Invalid range {start}-{end}: start page must be less than or equal to end page"
                    )));
                }

                ranges.push(PageRangeItem::Range(start, end));
            } else {
                ranges.push(PageRangeItem::Single(parse_page(part)?));
            }
        }

        if ranges.is_empty() {
            return Err(MergeError::invalid_config("Page range cannot be empty"));
        }

        Ok(Self { ranges })
    }

    /// Check if a 1-indexed page number is included in this range.
    pub fn contains(&self, page: u32) -> bool {
        self.ranges.iter().any(|item| match item {
            PageRangeItem::Single(p) => *p == page,
            PageRangeItem::Range(start, end) => (*start..=*end).contains(&page),
        })
    }

    /// All included page numbers up to `max_pages`, ascending.
    pub fn to_pages(&self, max_pages: u32) -> Vec<u32> {
        (1..=max_pages).filter(|p| self.contains(*p)).collect()
    }
}

fn parse_page(s: &str) -> Result<u32> {
    let s = s.trim();
    let page: u32 = s
        .parse()
        .map_err(|_| MergeError::invalid_config(format!("Invalid page number: {s}")))?;

    if page == 0 {
        return Err(MergeError::invalid_config(
            "Page numbers must be positive (1-indexed)",
        ));
    }

    Ok(page)
}

/// Plan entries keeping the selected pages in source order, all with the
/// same rotation. No range selects every page.
pub fn entries_for(
    page_count: usize,
    range: Option<&PageRange>,
    rotation: Rotation,
) -> Vec<PagePlanEntry> {
    let page_count = u32::try_from(page_count).unwrap_or(u32::MAX);
    let pages = match range {
        Some(range) => range.to_pages(page_count),
        None => (1..=page_count).collect(),
    };

    pages
        .into_iter()
        .zip(1..)
        .map(|(page, order)| PagePlanEntry::new(page, order, rotation))
        .collect()
}

/// One file listed in a manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ManifestFile {
    /// Path of the PDF, relative to the manifest's directory unless absolute.
    pub path: PathBuf,

    /// Page plan; absent means every page in source order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pages: Option<Vec<PagePlanEntry>>,
}

/// A merge described as JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlanManifest {
    /// Files in output order.
    pub files: Vec<ManifestFile>,
}

impl PlanManifest {
    /// Parse a manifest from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`MergeError::MalformedPlan`] for invalid JSON, unknown fields,
    /// bad rotations or an empty file list.
    pub fn from_json(json: &str) -> Result<Self> {
        let manifest: Self = serde_json::from_str(json)
            .map_err(|e| MergeError::malformed(format!("invalid manifest: {e}")))?;

        if manifest.files.is_empty() {
            return Err(MergeError::malformed("manifest lists no files"));
        }

        Ok(manifest)
    }

    /// Read and parse a manifest file, resolving relative paths against its
    /// directory.
    ///
    /// # Errors
    ///
    /// Returns [`MergeError::Io`] if the file cannot be read, otherwise as
    /// [`PlanManifest::from_json`].
    pub async fn load(path: &Path) -> Result<Self> {
        let json = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| MergeError::io(path, e))?;

        let mut manifest = Self::from_json(&json)?;
        if let Some(base) = path.parent() {
            manifest.resolve_paths(base);
        }
        Ok(manifest)
    }

    /// Prefix relative file paths with `base`.
    pub fn resolve_paths(&mut self, base: &Path) {
        for file in &mut self.files {
            if file.path.is_relative() {
                file.path = base.join(&file.path);
            }
        }
    }

    /// Paths of all listed files, in order.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.files.iter().map(|f| f.path.clone()).collect()
    }

    /// Serialize to pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`MergeError::MalformedPlan`] if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| MergeError::malformed(format!("cannot serialize manifest: {e}")))
    }
}
