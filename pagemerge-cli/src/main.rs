//! pagemerge - Merge pages of PDF files into a single document.
//!
//! Reads the inputs, builds a merge plan, runs it on a background worker and
//! writes the result. Ctrl-C and --timeout abort the running merge.

mod cli;

use clap::Parser;
use std::path::{Path, PathBuf};
use std::process;
use std::str::FromStr;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;
use pagemerge::client::MergeClient;
use pagemerge::config::{CompressionLevel, Config, Metadata};
use pagemerge::error::{MergeError, Result};
use pagemerge::io::{LoadedSource, PdfWriter, SourceReader, count_pages};
use pagemerge::manifest::{ManifestFile, PageRange, PlanManifest, entries_for};
use pagemerge::output::{
    OutputFormatter, describe_entries, display_merge_summary, display_read_statistics,
};
use pagemerge::plan::{MergePlan, PagePlanEntry, Rotation};
use pagemerge::utils::{collect_paths_for_patterns, is_glob_pattern};
use pagemerge::{MergeResult, MergedPdf};

/// Output file overwrite behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OverwriteMode {
    /// Prompt the user before overwriting.
    Prompt,
    /// Always overwrite without prompting.
    Force,
    /// Never overwrite, error if file exists.
    NoClobber,
}

impl OverwriteMode {
    fn from_cli(cli: &Cli) -> Self {
        if cli.force {
            Self::Force
        } else if cli.no_clobber {
            Self::NoClobber
        } else {
            Self::Prompt
        }
    }
}

/// Page selection applied to every input when no plan file is given.
#[derive(Debug, Clone, Default)]
struct Selection {
    range: Option<PageRange>,
    rotation: Rotation,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(err) = run(cli).await {
        eprintln!("Error: {err}");
        process::exit(err.exit_code());
    }
}

/// Log to stderr; `RUST_LOG` overrides the verbosity flags.
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Main application logic.
async fn run(cli: Cli) -> Result<()> {
    let config = build_config(&cli)?;
    let selection = build_selection(&cli)?;
    let formatter = OutputFormatter::new(cli.quiet, cli.verbose);

    if formatter.is_verbose() {
        formatter.section(&format!("{} v{}", pagemerge::NAME, pagemerge::VERSION));
    }

    let manifest = match &cli.plan {
        Some(path) => PlanManifest::load(path).await?,
        None => manifest_from_inputs(&cli.inputs)?,
    };

    let paths = manifest.paths();
    let (sources, read_stats) = SourceReader::new().read_all(&paths, cli.jobs).await?;
    display_read_statistics(&formatter, &read_stats);

    let plan = build_plan(&manifest.files, sources, &selection).await?;

    if cli.dry_run {
        show_plan(&formatter, &paths, &plan);
        formatter.success("Dry run completed successfully");
        formatter.info(&format!("  Output would be: {}", cli.output.display()));
        return Ok(());
    }

    let writer = PdfWriter::new();
    writer.can_write(&cli.output).await?;
    handle_output_overwrite(&cli.output, OverwriteMode::from_cli(&cli), &formatter)?;

    formatter.info(&format!(
        "Merging {} page(s) from {} file(s)...",
        plan.total_pages(),
        plan.len()
    ));

    let client = MergeClient::spawn(config)?;
    let stop = StopPolicy {
        timeout: cli.timeout.map(Duration::from_secs),
        abort_retry: Duration::from_millis(cli.abort_retry_ms),
    };
    let MergedPdf {
        bytes, statistics, ..
    } = run_until_stopped(&client, plan, &stop, &formatter).await?;
    let write_stats = writer.write(bytes, &cli.output).await?;
    display_merge_summary(&formatter, &statistics, &write_stats);

    client.shutdown().await;
    Ok(())
}

/// Build the engine configuration from CLI arguments.
fn build_config(cli: &Cli) -> Result<Config> {
    let metadata = Metadata::new(
        cli.title.clone(),
        cli.author.clone(),
        cli.subject.clone(),
        cli.keywords.clone(),
    );

    let config = Config::default()
        .with_batch_size(cli.batch_size)
        .with_compression(CompressionLevel::from_str(&cli.compression)?)
        .with_metadata(metadata);

    config.validate()?;
    Ok(config)
}

fn build_selection(cli: &Cli) -> Result<Selection> {
    let range = cli.pages.as_deref().map(PageRange::parse).transpose()?;

    let rotation = match cli.rotate.as_deref() {
        Some(degrees) => {
            let degrees: u16 = degrees.parse().map_err(|_| {
                MergeError::invalid_config(format!("Invalid rotation degrees: {degrees}"))
            })?;
            Rotation::from_degrees(degrees)?
        }
        None => Rotation::None,
    };

    Ok(Selection { range, rotation })
}

/// Expand glob patterns among the inputs; plain paths are kept as given.
fn manifest_from_inputs(inputs: &[String]) -> Result<PlanManifest> {
    let mut files = Vec::new();

    for input in inputs {
        let paths = if is_glob_pattern(input) {
            let matched = collect_paths_for_patterns([input])?;
            if matched.is_empty() {
                return Err(MergeError::invalid_config(format!(
                    "No files match pattern: {input}"
                )));
            }
            matched
        } else {
            vec![PathBuf::from(input)]
        };

        files.extend(paths.into_iter().map(|path| ManifestFile { path, pages: None }));
    }

    if files.is_empty() {
        return Err(MergeError::invalid_config("No input files specified"));
    }

    Ok(PlanManifest { files })
}

/// Pair each source with its page list.
///
/// Files that carry no explicit page list get `selection` applied to all
/// of their pages; counting those decodes them off the runtime threads.
async fn build_plan(
    files: &[ManifestFile],
    sources: Vec<LoadedSource>,
    selection: &Selection,
) -> Result<MergePlan> {
    let mut plan = MergePlan::new();

    for (index, (file, mut source)) in files.iter().zip(sources).enumerate() {
        let entries: Vec<PagePlanEntry> = match &file.pages {
            Some(pages) => pages.clone(),
            None => {
                let (counted, count) = count_pages(index, source).await?;
                source = counted;
                entries_for(count, selection.range.as_ref(), selection.rotation)
            }
        };

        if entries.is_empty() {
            warn!(path = %file.path.display(), "no pages selected from file");
        }
        plan.push(source.buffer, entries);
    }

    plan.validate()?;
    Ok(plan)
}

fn show_plan(formatter: &OutputFormatter, paths: &[PathBuf], plan: &MergePlan) {
    formatter.section("Merge plan");
    for (index, (path, file)) in paths.iter().zip(plan.files()).enumerate() {
        formatter.list_item(
            index + 1,
            &format!("{}: {}", path.display(), describe_entries(&file.pages)),
        );
    }
    formatter.info(&format!("Total: {} page(s)", plan.total_pages()));
}

/// When to give up on a running merge.
#[derive(Debug, Clone)]
struct StopPolicy {
    timeout: Option<Duration>,
    abort_retry: Duration,
}

/// Run the merge, aborting it on Ctrl-C or when the timeout expires.
async fn run_until_stopped(
    client: &MergeClient,
    plan: MergePlan,
    stop: &StopPolicy,
    formatter: &OutputFormatter,
) -> MergeResult {
    let result = client.request_merge(plan);
    tokio::pin!(result);

    let deadline = async {
        match stop.timeout {
            Some(timeout) => tokio::time::sleep(timeout).await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(deadline);

    let reason = tokio::select! {
        outcome = &mut result => return outcome,
        _ = tokio::signal::ctrl_c() => "Interrupted",
        _ = &mut deadline => "Timed out",
    };

    formatter.warning(&format!("{reason}, stopping merge..."));
    client.abort();
    wait_for_stop(client, stop.abort_retry).await;
    result.await
}

/// Wait for the worker to acknowledge an abort, resending it once.
async fn wait_for_stop(client: &MergeClient, retry_after: Duration) {
    for attempt in 0..2 {
        let deadline = Instant::now() + retry_after;
        while client.is_stopping() && Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        if !client.is_stopping() {
            debug!("merge stopped");
            return;
        }
        if attempt == 0 {
            client.resend_abort();
        }
    }
    warn!("merge worker has not acknowledged the abort yet");
}

/// Handle output file overwrite scenarios.
fn handle_output_overwrite(
    output: &Path,
    mode: OverwriteMode,
    formatter: &OutputFormatter,
) -> Result<()> {
    if !output.exists() {
        return Ok(());
    }

    let exists = || {
        MergeError::invalid_config(format!(
            "Output file already exists: {} (use --force to overwrite)",
            output.display()
        ))
    };

    match mode {
        OverwriteMode::Force => Ok(()),
        OverwriteMode::NoClobber => Err(exists()),
        OverwriteMode::Prompt => {
            // In quiet mode, treat as no-clobber
            if formatter.is_quiet() {
                return Err(exists());
            }

            formatter.warning(&format!(
                "Output file already exists: {}",
                output.display()
            ));

            use std::io::{self, Write};
            print!("Overwrite? [y/N]: ");
            io::stdout().flush().ok();

            let mut response = String::new();
            io::stdin()
                .read_line(&mut response)
                .map_err(|err| MergeError::io("<stdin>", err))?;

            match response.trim().to_lowercase().as_str() {
                "y" | "yes" => Ok(()),
                _ => Err(MergeError::Cancelled),
            }
        }
    }
}
