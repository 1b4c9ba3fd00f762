//! Configuration for the merge engine.
//!
//! A [`Config`] travels with a worker for its whole lifetime and shapes every
//! merge it runs: how many source files are decoded at once, how the output is
//! compressed and which document metadata it carries.

use crate::error::{MergeError, Result};
use std::str::FromStr;

/// Default number of source files decoded together.
pub const DEFAULT_BATCH_SIZE: usize = 2;

/// Largest accepted batch size.
pub const MAX_BATCH_SIZE: usize = 8;

/// Compression level for the output PDF.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompressionLevel {
    /// No compression - streams are written exactly as copied.
    None,
    /// Compress uncompressed streams.
    #[default]
    Standard,
    /// Compress and drop objects nothing references any more.
    Maximum,
}

impl FromStr for CompressionLevel {
    type Err = MergeError;

    /// Parse compression level from "none", "standard" or "maximum".
    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "none" => Ok(Self::None),
            "standard" => Ok(Self::Standard),
            "maximum" => Ok(Self::Maximum),
            _ => Err(MergeError::invalid_config(format!(
                "Invalid compression level: {s}. Must be one of: none, standard, maximum"
            ))),
        }
    }
}

/// Document metadata to set on the output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    /// Document title.
    pub title: Option<String>,
    /// Document author.
    pub author: Option<String>,
    /// Document subject.
    pub subject: Option<String>,
    /// Document keywords (comma-separated).
    pub keywords: Option<String>,
}

impl Metadata {
    /// Check if any metadata fields are set.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.author.is_none()
            && self.subject.is_none()
            && self.keywords.is_none()
    }

    /// Create metadata from optional strings, trimming whitespace.
    pub fn new(
        title: Option<String>,
        author: Option<String>,
        subject: Option<String>,
        keywords: Option<String>,
    ) -> Self {
        let to_string_opt = |opt: Option<String>| {
            opt.filter(|s| !s.trim().is_empty())
                .map(|s| s.trim().to_string())
        };

        Self {
            title: to_string_opt(title),
            author: to_string_opt(author),
            subject: to_string_opt(subject),
            keywords: to_string_opt(keywords),
        }
    }
}

/// Settings shared by every merge a worker runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Source files decoded per batch. Bounds how many decoded documents are
    /// alive at the same time.
    pub batch_size: usize,

    /// Compression applied before serializing.
    pub compression: CompressionLevel,

    /// Metadata written into the output's Info dictionary.
    pub metadata: Metadata,

    /// PDF header version of the output.
    pub pdf_version: String,

    /// Value of the output's Producer entry.
    pub producer: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            compression: CompressionLevel::Standard,
            metadata: Metadata::default(),
            pdf_version: "1.7".to_string(),
            producer: crate::NAME.to_string(),
        }
    }
}

impl Config {
    /// Set the batch size.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Set the compression level.
    pub fn with_compression(mut self, compression: CompressionLevel) -> Self {
        self.compression = compression;
        self
    }

    /// Set the output metadata.
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Batch size is outside `1..=MAX_BATCH_SIZE`
    /// - PDF version is not of the form `1.x` or `2.x`
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 || self.batch_size > MAX_BATCH_SIZE {
            return Err(MergeError::invalid_config(format!(
                "Batch size must be between 1 and {MAX_BATCH_SIZE}, got {}",
                self.batch_size
            )));
        }

        let version_ok = matches!(
            self.pdf_version.split_once('.'),
            Some(("1" | "2", minor)) if minor.len() == 1 && minor.bytes().all(|b| b.is_ascii_digit())
        );
        if !version_ok {
            return Err(MergeError::invalid_config(format!(
                "Unsupported PDF version: {}",
                self.pdf_version
            )));
        }

        Ok(())
    }
}
