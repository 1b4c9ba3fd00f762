//! Output formatting and display for pagemerge.
//!
//! This module handles all user-facing console output including:
//! - Formatted status messages
//! - Plan listings for dry runs
//! - Summary reports
//! - Quiet and verbose modes
//!
//! Diagnostics for developers go through `tracing` instead.
//!
//! # Examples
//!
//! ```no_run
//! use pagemerge::output::OutputFormatter;
//!
//! let formatter = OutputFormatter::new(false, true);
//! formatter.info("Starting merge operation");
//! formatter.success("Merge completed successfully");
//! ```

pub mod formatter;

pub use formatter::{MessageLevel, OutputFormatter};

use crate::io::{ReadStatistics, WriteStatistics};
use crate::merge::MergeStatistics;
use crate::plan::{PagePlanEntry, Rotation, in_output_order};

/// Describe a file's pages in output order, e.g. `3, 1, 2@90`.
///
/// Rotated pages carry `@degrees`; an empty list reads `(no pages)`.
pub fn describe_entries(entries: &[PagePlanEntry]) -> String {
    if entries.is_empty() {
        return "(no pages)".to_string();
    }

    in_output_order(entries)
        .iter()
        .map(|entry| match entry.rotation {
            Rotation::None => entry.source_page_number.to_string(),
            rotation => format!("{}@{}", entry.source_page_number, rotation.as_degrees()),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Display read statistics to the user.
pub fn display_read_statistics(formatter: &OutputFormatter, stats: &ReadStatistics) {
    formatter.debug(&format!(
        "Read {} file(s) in {:.2}s: {}",
        stats.file_count,
        stats.total_time.as_secs_f64(),
        stats.format_total_size()
    ));
}

/// Display the outcome of a merge and its write to disk.
pub fn display_merge_summary(
    formatter: &OutputFormatter,
    merge: &MergeStatistics,
    write: &WriteStatistics,
) {
    formatter.success(&format!(
        "Merged {} page(s) from {} file(s) into {}",
        merge.total_pages,
        merge.files_merged,
        write.output_path.display()
    ));
    formatter.detail("Input size", &merge.format_input_size());
    formatter.detail("Output size", &write.format_file_size());
    formatter.detail(
        "Merge time",
        &format!("{:.2}s", merge.merge_time.as_secs_f64()),
    );
    formatter.detail(
        "Write time",
        &format!("{:.2}s", write.write_time.as_secs_f64()),
    );
}
