//! File I/O for pagemerge.
//!
//! This module handles all disk access:
//! - Reading source PDFs into memory
//! - Writing merged PDFs to disk
//!
//! The merge engine itself never touches the filesystem; it works on the
//! buffers produced here.
//!
//! # Examples
//!
//! ```no_run
//! use pagemerge::io::{PdfWriter, SourceReader};
//! use std::path::Path;
//!
//! # async fn example() -> pagemerge::Result<()> {
//! let source = SourceReader::new().read(Path::new("input.pdf")).await?;
//!
//! let writer = PdfWriter::new();
//! writer.write(source.buffer.into_inner(), Path::new("copy.pdf")).await?;
//! # Ok(())
//! # }
//! ```

pub mod reader;
pub mod writer;

pub use reader::{LoadedSource, ReadStatistics, SourceReader, count_pages, page_count};
pub use writer::{PdfWriter, WriteStatistics};
