//! Error types for pagemerge.
//!
//! Every failure a merge can run into is reported as a [`MergeError`]. The
//! worker never panics its way out of a task: whatever goes wrong is turned
//! into one of these variants and sent back as the task's response.
//!
//! # Error Categories
//!
//! - **Plan errors**: the caller handed in a plan that breaks its invariants
//! - **Decode errors**: a source buffer is not a readable PDF
//! - **Cancellation**: the task was aborted or superseded
//! - **Serialize errors**: producing the output bytes failed
//! - **Host errors**: worker gone, file I/O, configuration

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for pagemerge operations.
pub type Result<T> = std::result::Result<T, MergeError>;

/// Coarse classification of a [`MergeError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Input contract violation.
    MalformedPlan,
    /// A source buffer could not be parsed.
    DecodeFailure,
    /// The task was aborted or superseded.
    Cancelled,
    /// The merged document could not be serialized.
    SerializeFailure,
    /// The background worker is no longer running.
    WorkerUnavailable,
    /// File system access failed.
    Io,
    /// Configuration was rejected.
    InvalidConfig,
}

/// Main error type for merge operations.
#[derive(Debug, Error)]
pub enum MergeError {
    /// The merge plan violates its invariants.
    #[error("Malformed merge plan{}: {reason}", file_suffix(.file_index))]
    MalformedPlan {
        /// Index of the offending file in the plan, if the problem is file specific.
        file_index: Option<usize>,
        /// What is wrong with the plan.
        reason: String,
    },

    /// A source buffer is corrupt or not a PDF.
    #[error("Failed to decode PDF (file index {file_index}): {reason}")]
    DecodeFailure {
        /// Index of the file in the plan.
        file_index: usize,
        /// Parser error message.
        reason: String,
    },

    /// The task was aborted before it produced a result.
    #[error("Merging is cancelled")]
    Cancelled,

    /// Writing the merged document to bytes failed.
    #[error("Failed to produce the merged PDF: {reason}\n  Hint: this is usually transient, try merging again")]
    SerializeFailure {
        /// Underlying failure.
        reason: String,
    },

    /// The worker stopped and can no longer accept or answer requests.
    #[error("Merge worker is not running")]
    WorkerUnavailable,

    /// A file could not be read or written.
    #[error("Cannot access file: {}\n  Reason: {source}", .path.display())]
    Io {
        /// Path that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Invalid configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// Description of what's wrong with the configuration.
        message: String,
    },
}

fn file_suffix(file_index: &Option<usize>) -> String {
    match file_index {
        Some(index) => format!(" (file index {index})"),
        None => String::new(),
    }
}

impl MergeError {
    /// Create a plan-wide MalformedPlan error.
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedPlan {
            file_index: None,
            reason: reason.into(),
        }
    }

    /// Create a MalformedPlan error for one file of the plan.
    pub fn malformed_in(file_index: usize, reason: impl Into<String>) -> Self {
        Self::MalformedPlan {
            file_index: Some(file_index),
            reason: reason.into(),
        }
    }

    /// Create a DecodeFailure error.
    pub fn decode(file_index: usize, reason: impl Into<String>) -> Self {
        Self::DecodeFailure {
            file_index,
            reason: reason.into(),
        }
    }

    /// Create a SerializeFailure error.
    pub fn serialize(reason: impl Into<String>) -> Self {
        Self::SerializeFailure {
            reason: reason.into(),
        }
    }

    /// Create an Io error.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create an InvalidConfig error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MalformedPlan { .. } => ErrorKind::MalformedPlan,
            Self::DecodeFailure { .. } => ErrorKind::DecodeFailure,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::SerializeFailure { .. } => ErrorKind::SerializeFailure,
            Self::WorkerUnavailable => ErrorKind::WorkerUnavailable,
            Self::Io { .. } => ErrorKind::Io,
            Self::InvalidConfig { .. } => ErrorKind::InvalidConfig,
        }
    }

    /// Whether this is a cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Check if the same request may succeed when submitted again as a new task.
    ///
    /// Plan and decode failures need a fixed input first; cancellation and
    /// serialization failures do not.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Cancelled | Self::SerializeFailure { .. } | Self::WorkerUnavailable
        )
    }

    /// The plan file index this error points at, if any.
    pub fn file_index(&self) -> Option<usize> {
        match self {
            Self::MalformedPlan { file_index, .. } => *file_index,
            Self::DecodeFailure { file_index, .. } => Some(*file_index),
            _ => None,
        }
    }

    /// Get the process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::MalformedPlan { .. } => 1,
            Self::InvalidConfig { .. } => 1,
            Self::Io { .. } => 2,
            Self::DecodeFailure { .. } => 3,
            Self::SerializeFailure { .. } => 5,
            Self::WorkerUnavailable => 6,
            Self::Cancelled => 130, // Standard exit code for SIGINT
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_malformed_plan_display() {
        let err = MergeError::malformed_in(2, "order values must be a permutation of 1..=3");
        let msg = err.to_string();
        assert!(msg.contains("Malformed merge plan"));
        assert!(msg.contains("file index 2"));
        assert!(msg.contains("permutation"));

        let err = MergeError::malformed("plan contains no files");
        assert_eq!(err.to_string(), "Malformed merge plan: plan contains no files");
    }

    #[test]
    fn test_decode_failure_names_file() {
        let err = MergeError::decode(1, "invalid file header");
        let msg = err.to_string();
        assert!(msg.contains("file index 1"));
        assert!(msg.contains("invalid file header"));
        assert_eq!(err.file_index(), Some(1));
    }

    #[test]
    fn test_cancelled_display() {
        assert_eq!(MergeError::Cancelled.to_string(), "Merging is cancelled");
        assert!(MergeError::Cancelled.is_cancelled());
    }

    #[test]
    fn test_serialize_failure_suggests_retry() {
        let msg = MergeError::serialize("disk full").to_string();
        assert!(msg.contains("try merging again"));
    }

    #[test]
    fn test_is_retryable() {
        assert!(MergeError::Cancelled.is_retryable());
        assert!(MergeError::serialize("x").is_retryable());
        assert!(MergeError::WorkerUnavailable.is_retryable());

        assert!(!MergeError::malformed("x").is_retryable());
        assert!(!MergeError::decode(0, "x").is_retryable());
    }

    #[test]
    fn test_kind() {
        assert_eq!(MergeError::malformed("x").kind(), ErrorKind::MalformedPlan);
        assert_eq!(MergeError::decode(0, "x").kind(), ErrorKind::DecodeFailure);
        assert_eq!(MergeError::Cancelled.kind(), ErrorKind::Cancelled);
        assert_eq!(
            MergeError::serialize("x").kind(),
            ErrorKind::SerializeFailure
        );
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(MergeError::malformed("x").exit_code(), 1);
        assert_eq!(MergeError::decode(0, "x").exit_code(), 3);
        assert_eq!(MergeError::Cancelled.exit_code(), 130);
    }

    #[test]
    fn test_error_source() {
        let err = MergeError::io(
            "missing.pdf",
            io::Error::new(io::ErrorKind::NotFound, "not found"),
        );
        assert!(err.source().is_some());
        assert!(err.to_string().contains("missing.pdf"));

        assert!(MergeError::Cancelled.source().is_none());
    }
}
