//! Core PDF merging implementation.
//!
//! This module implements the merge algorithm: decode the sources batch by
//! batch, copy the planned pages into a fresh document in plan order, then
//! serialize it. Cancellation is observed at coarse checkpoints between
//! batches, between files and before serializing.

use chrono::Utc;
use lopdf::Document;
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, info, info_span};

use crate::config::{CompressionLevel, Config};
use crate::error::{MergeError, Result};
use crate::merge::metadata::MetadataManager;
use crate::merge::pages::OutputDocument;
use crate::plan::{FilePlan, MergePlan, PagePlanEntry, check_page_bounds, in_output_order};
use crate::protocol::TaskId;
use crate::utils::format_bytes;

/// Asked at every checkpoint whether the running merge should stop.
pub trait CancelCheck: Send + Sync {
    /// `true` once the merge should give up.
    fn is_cancelled(&self) -> bool;
}

/// A [`CancelCheck`] that never cancels.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverCancel;

impl CancelCheck for NeverCancel {
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// Statistics about a merge operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeStatistics {
    /// Number of source files that contributed at least one page.
    pub files_merged: usize,

    /// Total number of pages in the merged document.
    pub total_pages: usize,

    /// Total time taken for the merge.
    pub merge_time: Duration,

    /// Combined size of the source buffers.
    pub input_size: u64,

    /// Size of the serialized output.
    pub output_size: u64,
}

impl MergeStatistics {
    /// Format input size as a human-readable string.
    pub fn format_input_size(&self) -> String {
        format_bytes(self.input_size)
    }

    /// Format output size as a human-readable string.
    pub fn format_output_size(&self) -> String {
        format_bytes(self.output_size)
    }
}

/// A serialized merged document.
pub struct MergedPdf {
    /// The PDF file contents.
    pub bytes: Vec<u8>,

    /// Number of pages in the document.
    pub page_count: usize,

    /// Statistics about the merge.
    pub statistics: MergeStatistics,
}

impl MergedPdf {
    /// Take the PDF bytes, dropping the statistics.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

impl fmt::Debug for MergedPdf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MergedPdf")
            .field("bytes", &format_args!("{} bytes", self.bytes.len()))
            .field("page_count", &self.page_count)
            .field("statistics", &self.statistics)
            .finish()
    }
}

/// PDF merger that combines pages of several documents.
pub struct Merger {
    config: Config,
    metadata_manager: MetadataManager,
}

impl Merger {
    /// Create a merger with the given settings.
    pub fn new(config: Config) -> Self {
        let metadata_manager = MetadataManager::new(config.producer.clone());
        Self {
            config,
            metadata_manager,
        }
    }

    /// Settings this merger runs with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run a merge plan to completion.
    ///
    /// The output holds, for each file in plan order, that file's entries
    /// sorted by `order`, each page carrying exactly the entry's rotation.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The plan is malformed, or names a page a source does not have
    /// - A source cannot be decoded
    /// - `cancel` reports cancellation at a checkpoint
    /// - The output cannot be serialized
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use pagemerge::merge::{Merger, NeverCancel};
    /// # use pagemerge::plan::{MergePlan, PagePlanEntry, Rotation};
    /// # use pagemerge::protocol::TaskId;
    /// # use pagemerge::Config;
    /// # fn example(pdf: Vec<u8>) -> pagemerge::Result<()> {
    /// let plan = MergePlan::new().with_file(
    ///     pdf,
    ///     vec![
    ///         PagePlanEntry::new(2, 1, Rotation::None),
    ///         PagePlanEntry::new(1, 2, Rotation::Clockwise90),
    ///     ],
    /// );
    ///
    /// let merger = Merger::new(Config::default());
    /// let merged = merger.merge(TaskId::next(), plan, &NeverCancel)?;
    /// println!("Merged {} pages", merged.page_count);
    /// # Ok(())
    /// # }
    /// ```
    pub fn merge(
        &self,
        task_id: TaskId,
        plan: MergePlan,
        cancel: &dyn CancelCheck,
    ) -> Result<MergedPdf> {
        let span = info_span!("merge", task = %task_id);
        let _guard = span.enter();

        let merge_start = Instant::now();
        plan.validate()?;

        let input_size = plan.total_bytes();
        let file_count = plan.len();
        debug!(
            files = file_count,
            pages = plan.total_pages(),
            input = %format_bytes(input_size),
            "starting merge"
        );

        let mut output = OutputDocument::new(&self.config.pdf_version);
        let mut files_merged = 0;

        let mut files = plan.into_files().into_iter().enumerate().peekable();
        let mut batch_number = 0;
        while files.peek().is_some() {
            checkpoint(cancel, "batch")?;
            batch_number += 1;

            let batch: Vec<(usize, FilePlan)> =
                files.by_ref().take(self.config.batch_size).collect();
            debug!(batch = batch_number, files = batch.len(), "decoding batch");

            let decoded = batch
                .into_iter()
                .filter(|(_, file)| !file.pages.is_empty())
                .map(|(index, file)| decode(index, file))
                .collect::<Result<Vec<_>>>()?;

            for (file_index, document, entries) in decoded {
                checkpoint(cancel, "file")?;
                self.copy_pages(&mut output, file_index, document, &entries)?;
                files_merged += 1;
            }
        }

        checkpoint(cancel, "serialize")?;
        let total_pages = output.page_count();
        let bytes = self.serialize(output.finish())?;

        let statistics = MergeStatistics {
            files_merged,
            total_pages,
            merge_time: merge_start.elapsed(),
            input_size,
            output_size: bytes.len() as u64,
        };
        info!(
            files = files_merged,
            pages = total_pages,
            output = %statistics.format_output_size(),
            elapsed_ms = statistics.merge_time.as_millis() as u64,
            "merge finished"
        );

        Ok(MergedPdf {
            bytes,
            page_count: total_pages,
            statistics,
        })
    }

    /// Append the planned pages of one decoded source.
    fn copy_pages(
        &self,
        output: &mut OutputDocument,
        file_index: usize,
        document: Document,
        entries: &[PagePlanEntry],
    ) -> Result<()> {
        let mut source = output.adopt(file_index, document);
        check_page_bounds(file_index, entries, source.page_count())?;

        for entry in in_output_order(entries) {
            let index = entry.source_index().ok_or_else(|| {
                MergeError::malformed_in(file_index, "page numbers must be positive (1-indexed)")
            })?;
            output.append_page(&mut source, index, entry.rotation)?;
        }

        debug!(file = file_index, pages = entries.len(), "copied pages");
        Ok(())
    }

    /// Stamp metadata, compress and write the document out.
    fn serialize(&self, mut document: Document) -> Result<Vec<u8>> {
        self.metadata_manager
            .apply(&mut document, &self.config.metadata, Utc::now());

        match self.config.compression {
            CompressionLevel::None => {
                document.renumber_objects();
            }
            CompressionLevel::Standard => {
                document.renumber_objects();
                document.compress();
            }
            CompressionLevel::Maximum => {
                document.prune_objects();
                document.renumber_objects();
                document.compress();
            }
        }

        let mut bytes = Vec::new();
        document
            .save_to(&mut bytes)
            .map_err(|e| MergeError::serialize(e.to_string()))?;
        Ok(bytes)
    }
}

/// Decode one source. Its buffer is dropped once parsed.
fn decode(
    file_index: usize,
    file: FilePlan,
) -> Result<(usize, Document, Vec<PagePlanEntry>)> {
    let FilePlan { source, pages } = file;
    let document = Document::load_mem(source.as_bytes())
        .map_err(|e| MergeError::decode(file_index, e.to_string()))?;
    Ok((file_index, document, pages))
}

fn checkpoint(cancel: &dyn CancelCheck, stage: &'static str) -> Result<()> {
    if cancel.is_cancelled() {
        info!(stage, "cancellation observed");
        return Err(MergeError::Cancelled);
    }
    Ok(())
}
