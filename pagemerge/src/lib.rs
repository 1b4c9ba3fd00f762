//! pagemerge - Page-level PDF merging with cooperative cancellation.
//!
//! This library builds one PDF out of pages taken from several source
//! documents. Each source page can be dropped, reordered, duplicated and
//! rotated. It provides:
//!
//! - A validated plan model ([`plan`])
//! - The synchronous merge engine ([`merge`])
//! - A background worker and a client for it ([`worker`], [`client`])
//! - Plan manifests and file I/O helpers for front ends ([`manifest`], [`io`])
//!
//! # Examples
//!
//! ## Merging through the worker
//!
//! ```no_run
//! use pagemerge::client::MergeClient;
//! use pagemerge::plan::{MergePlan, PagePlanEntry, Rotation};
//! use pagemerge::Config;
//!
//! # async fn example(report: Vec<u8>, appendix: Vec<u8>) -> pagemerge::Result<()> {
//! let mut plan = MergePlan::new();
//! // Swap the first two pages of the report and turn the second one.
//! plan.push(
//!     report,
//!     vec![
//!         PagePlanEntry::new(2, 1, Rotation::None),
//!         PagePlanEntry::new(1, 2, Rotation::Clockwise90),
//!     ],
//! );
//! plan.push(appendix, vec![PagePlanEntry::new(1, 1, Rotation::None)]);
//!
//! let client = MergeClient::spawn(Config::default())?;
//! let merged = client.request_merge(plan).await?;
//! println!("Created {} page document", merged.page_count);
//! # Ok(())
//! # }
//! ```
//!
//! ## Merging synchronously
//!
//! ```no_run
//! use pagemerge::merge::{Merger, NeverCancel};
//! use pagemerge::plan::MergePlan;
//! use pagemerge::protocol::TaskId;
//! use pagemerge::Config;
//!
//! # fn example(plan: MergePlan) -> pagemerge::Result<()> {
//! let merger = Merger::new(Config::default());
//! let merged = merger.merge(TaskId::next(), plan, &NeverCancel)?;
//! std::fs::write("merged.pdf", merged.bytes).ok();
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod config;
pub mod error;
pub mod io;
pub mod manifest;
pub mod merge;
pub mod output;
pub mod plan;
pub mod protocol;
pub mod utils;
pub mod worker;

#[cfg(test)]
mod test_support;

// Re-export commonly used types
pub use client::MergeClient;
pub use config::Config;
pub use error::{ErrorKind, MergeError, Result};
pub use merge::MergedPdf;
pub use plan::{MergePlan, PagePlanEntry, Rotation, SourceBuffer};
pub use protocol::{MergeResult, TaskId};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
