//! Writing merged PDFs to disk.
//!
//! This module provides safe PDF writing with:
//! - Atomic writes (write to temp file, then rename)
//! - Output directory pre-flight checks
//! - Write statistics
//!
//! # Examples
//!
//! ```no_run
//! use pagemerge::io::writer::PdfWriter;
//! use std::path::Path;
//!
//! # async fn example(bytes: Vec<u8>) -> pagemerge::Result<()> {
//! let writer = PdfWriter::new();
//! let stats = writer.write(bytes, Path::new("output.pdf")).await?;
//! println!("Wrote {}", stats.format_file_size());
//! # Ok(())
//! # }
//! ```

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::task;

use crate::error::{MergeError, Result};
use crate::utils::format_bytes;

/// Statistics about a write operation.
#[derive(Debug, Clone)]
pub struct WriteStatistics {
    /// Time taken to write the file.
    pub write_time: Duration,

    /// Size of the written file in bytes.
    pub file_size: u64,

    /// Path where the file was written.
    pub output_path: PathBuf,
}

impl WriteStatistics {
    /// Format file size as human-readable string.
    pub fn format_file_size(&self) -> String {
        format_bytes(self.file_size)
    }
}

/// Writes serialized PDFs to files.
#[derive(Debug, Clone)]
pub struct PdfWriter {
    atomic: bool,
}

impl PdfWriter {
    /// Create a writer using atomic writes.
    pub fn new() -> Self {
        Self { atomic: true }
    }

    /// Create a writer without atomic writes (faster but less safe).
    pub fn non_atomic() -> Self {
        Self { atomic: false }
    }

    /// Write `bytes` to `path` and return statistics about the operation.
    ///
    /// With atomic writes the data first goes to a sibling temp file which is
    /// then renamed over `path`, so readers never see a partial file.
    ///
    /// # Errors
    ///
    /// Returns [`MergeError::Io`] if:
    /// - Output directory doesn't exist
    /// - Insufficient permissions
    /// - Disk full
    pub async fn write(&self, bytes: Vec<u8>, path: &Path) -> Result<WriteStatistics> {
        let path_buf = path.to_path_buf();
        let atomic = self.atomic;

        task::spawn_blocking(move || {
            let start = Instant::now();

            let write_path = if atomic {
                temp_path(&path_buf)
            } else {
                path_buf.clone()
            };

            let result = write_file(&write_path, &bytes);
            if let Err(e) = result {
                if atomic {
                    let _ = std::fs::remove_file(&write_path);
                }
                return Err(e);
            }

            if atomic {
                std::fs::rename(&write_path, &path_buf).map_err(|e| {
                    let _ = std::fs::remove_file(&write_path);
                    MergeError::io(&path_buf, e)
                })?;
            }

            Ok(WriteStatistics {
                write_time: start.elapsed(),
                file_size: bytes.len() as u64,
                output_path: path_buf,
            })
        })
        .await
        .map_err(|e| MergeError::io(path, std::io::Error::other(format!("write task failed: {e}"))))?
    }

    /// Check if a file can be written to the given path.
    ///
    /// Performs pre-flight checks without actually writing.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Parent directory doesn't exist
    /// - Parent directory is not writable
    pub async fn can_write(&self, path: &Path) -> Result<()> {
        let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) else {
            return Ok(());
        };

        let metadata = tokio::fs::metadata(parent).await.map_err(|_| {
            MergeError::invalid_config(format!(
                "Output directory does not exist: {}",
                parent.display()
            ))
        })?;

        if !metadata.is_dir() {
            return Err(MergeError::invalid_config(format!(
                "Output parent is not a directory: {}",
                parent.display()
            )));
        }

        if metadata.permissions().readonly() {
            return Err(MergeError::invalid_config(format!(
                "Output directory is not writable: {}",
                parent.display()
            )));
        }

        Ok(())
    }
}

impl Default for PdfWriter {
    fn default() -> Self {
        Self::new()
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".pagemerge-tmp");
    path.with_file_name(name)
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    let file = std::fs::File::create(path).map_err(|e| MergeError::io(path, e))?;
    let mut writer = std::io::BufWriter::new(file);
    writer
        .write_all(bytes)
        .and_then(|()| writer.flush())
        .map_err(|e| MergeError::io(path, e))
}
