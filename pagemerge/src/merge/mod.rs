//! PDF merge engine.
//!
//! [`Merger`] runs one [`MergePlan`](crate::plan::MergePlan) synchronously;
//! the [`worker`](crate::worker) module runs it off the async runtime.

pub mod merger;
pub mod metadata;
pub mod pages;

pub use merger::{CancelCheck, MergeStatistics, MergedPdf, Merger, NeverCancel};
pub use metadata::MetadataManager;
