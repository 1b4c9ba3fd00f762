//! Reading source files into memory.
//!
//! This module provides source loading with support for:
//! - Concurrent reads with bounded parallelism
//! - Input order preservation
//! - Page counting for plan building
//!
//! # Examples
//!
//! ```no_run
//! use pagemerge::io::reader::SourceReader;
//! use std::path::PathBuf;
//!
//! # async fn example() -> pagemerge::Result<()> {
//! let reader = SourceReader::new();
//! let paths = vec![PathBuf::from("a.pdf"), PathBuf::from("b.pdf")];
//! let (sources, stats) = reader.read_all(&paths, 4).await?;
//! println!("Read {} files ({})", sources.len(), stats.format_total_size());
//! # Ok(())
//! # }
//! ```

use futures::stream::{self, StreamExt, TryStreamExt};
use lopdf::Document;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::task;
use tracing::debug;

use crate::error::{MergeError, Result};
use crate::plan::SourceBuffer;
use crate::utils::format_bytes;

/// A source file read into memory.
#[derive(Debug)]
pub struct LoadedSource {
    /// Path the bytes came from.
    pub path: PathBuf,

    /// The file contents.
    pub buffer: SourceBuffer,
}

impl LoadedSource {
    /// Size of the file in bytes.
    pub fn size(&self) -> u64 {
        self.buffer.len() as u64
    }
}

/// Statistics for a batch read.
#[derive(Debug, Clone)]
pub struct ReadStatistics {
    /// Number of files read.
    pub file_count: usize,

    /// Total time taken.
    pub total_time: Duration,

    /// Total size of the files.
    pub total_size: u64,
}

impl ReadStatistics {
    /// Format total size as human-readable string.
    pub fn format_total_size(&self) -> String {
        format_bytes(self.total_size)
    }
}

/// Reads source PDFs from disk.
#[derive(Debug, Clone, Default)]
pub struct SourceReader {
    _private: (),
}

impl SourceReader {
    /// Create a new reader.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read one file.
    ///
    /// # Errors
    ///
    /// Returns [`MergeError::Io`] if the file cannot be read.
    pub async fn read(&self, path: &Path) -> Result<LoadedSource> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| MergeError::io(path, e))?;

        debug!(path = %path.display(), size = bytes.len(), "read source");
        Ok(LoadedSource {
            path: path.to_path_buf(),
            buffer: SourceBuffer::new(bytes),
        })
    }

    /// Read many files concurrently, keeping input order.
    ///
    /// At most `workers` reads are in flight at once. The first failure
    /// aborts the whole read.
    pub async fn read_all(
        &self,
        paths: &[PathBuf],
        workers: usize,
    ) -> Result<(Vec<LoadedSource>, ReadStatistics)> {
        let start = Instant::now();

        let sources: Vec<LoadedSource> = stream::iter(paths)
            .map(|path| self.read(path))
            .buffered(workers.max(1))
            .try_collect()
            .await?;

        let stats = ReadStatistics {
            file_count: sources.len(),
            total_time: start.elapsed(),
            total_size: sources.iter().map(LoadedSource::size).sum(),
        };

        Ok((sources, stats))
    }
}

/// Count the pages of a PDF held in memory.
///
/// `file_index` only labels the error.
///
/// # Errors
///
/// Returns [`MergeError::DecodeFailure`] if the bytes are not a readable PDF.
pub fn page_count(file_index: usize, bytes: &[u8]) -> Result<usize> {
    let document =
        Document::load_mem(bytes).map_err(|e| MergeError::decode(file_index, e.to_string()))?;
    Ok(document.get_pages().len())
}

/// Count the pages of a loaded source on the blocking thread pool.
///
/// The source is handed back with its count so its buffer is never copied.
///
/// # Errors
///
/// Returns [`MergeError::DecodeFailure`] if the bytes are not a readable PDF.
pub async fn count_pages(file_index: usize, source: LoadedSource) -> Result<(LoadedSource, usize)> {
    task::spawn_blocking(move || {
        let count = page_count(file_index, source.buffer.as_bytes())?;
        Ok((source, count))
    })
    .await
    .map_err(|e| MergeError::decode(file_index, format!("page count task failed: {e}")))?
}
