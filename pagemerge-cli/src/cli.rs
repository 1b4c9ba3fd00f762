//! CLI argument parsing for pagemerge.
//!
//! This module defines the command-line interface structure using `clap`.
//! It is also compiled by the build script to render the man page, so it
//! depends on nothing but `clap` and `std`.

use clap::Parser;
use std::path::PathBuf;

/// Merge pages of several PDF files into a single document.
///
/// Pages can be selected, reordered, duplicated and rotated per file, either
/// with --pages/--rotate (same selection for every input) or with a JSON plan
/// file giving the exact pages of each input.
#[derive(Parser, Debug)]
#[command(name = "pagemerge")]
#[command(version)]
#[command(about = "Merge pages of PDF files into a single document", long_about = None)]
#[command(author)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Input PDF files to merge (in order)
    ///
    /// Specify multiple files or use glob patterns.
    /// Files are merged in the order provided.
    ///
    /// Examples:
    ///   pagemerge file1.pdf file2.pdf -o output.pdf
    ///   pagemerge 'chapter*.pdf' -o book.pdf
    #[arg(value_name = "FILE", required_unless_present = "plan")]
    pub inputs: Vec<String>,

    /// JSON merge plan listing files and the pages to take from each
    ///
    /// Example plan:
    ///   {"files": [{"path": "a.pdf", "pages": [{"sourcePageNumber": 2, "order": 1, "rotation": 90}]},
    ///              {"path": "b.pdf"}]}
    ///
    /// Relative paths are resolved against the plan file's directory.
    /// A file without "pages" contributes all of its pages.
    #[arg(short = 'P', long, value_name = "FILE", conflicts_with_all = ["inputs", "pages", "rotate"])]
    pub plan: Option<PathBuf>,

    /// Output PDF file path
    #[arg(short, long, value_name = "FILE")]
    pub output: PathBuf,

    /// Dry run - show which pages would be merged without creating output
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Verbose output - show statistics and log progress
    #[arg(short, long)]
    pub verbose: bool,

    /// Force overwrite of existing output file without confirmation
    #[arg(short, long)]
    pub force: bool,

    /// Never overwrite existing output file
    #[arg(long, conflicts_with = "force")]
    pub no_clobber: bool,

    /// Suppress all non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Page ranges to take from each input (e.g., "1-5,10,15-20")
    ///
    /// Page numbers are 1-indexed. Pages past the end of a file are ignored.
    #[arg(long, value_name = "RANGE")]
    pub pages: Option<String>,

    /// Rotate every selected page to an absolute angle (0, 90, 180, 270)
    ///
    /// The angle replaces any rotation the page already had.
    #[arg(long, value_name = "DEGREES")]
    #[arg(value_parser = ["0", "90", "180", "270"])]
    pub rotate: Option<String>,

    /// Number of input files decoded at a time (1-8)
    #[arg(long, value_name = "N", env = "PAGEMERGE_BATCH_SIZE", default_value_t = 2)]
    pub batch_size: usize,

    /// Number of input files read from disk concurrently
    #[arg(short, long, value_name = "N", default_value_t = 4)]
    pub jobs: usize,

    /// Compression level for output PDF
    ///
    /// - none: No compression
    /// - standard: Compress streams (default)
    /// - maximum: Compress streams and drop unused objects
    #[arg(short, long, value_name = "LEVEL", default_value = "standard")]
    #[arg(value_parser = ["none", "standard", "maximum"])]
    pub compression: String,

    /// Set title metadata for output PDF
    #[arg(long, value_name = "TEXT")]
    pub title: Option<String>,

    /// Set author metadata for output PDF
    #[arg(long, value_name = "TEXT")]
    pub author: Option<String>,

    /// Set subject metadata for output PDF
    #[arg(long, value_name = "TEXT")]
    pub subject: Option<String>,

    /// Set keywords metadata for output PDF (comma-separated)
    #[arg(long, value_name = "TEXT")]
    pub keywords: Option<String>,

    /// Abort the merge if it takes longer than this many seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Resend the abort signal if the merge has not stopped after this many milliseconds
    #[arg(long, value_name = "MS", default_value_t = 250)]
    pub abort_retry_ms: u64,
}
