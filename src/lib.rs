//! flickr8k-prep: fetch and lay out the Flickr8k captioning dataset.
//!
//! The dataset ships as two zip archives (images and annotation text). This
//! crate downloads them into a dataset root, extracts them in place, and moves
//! the extracted files into the canonical layout downstream code expects. It
//! also loads `safetensors` model checkpoints for the captioning pipeline.
//!
//! # Modules
//!
//! - [`dataset`]: acquisition, reconciliation, and layout checks
//! - [`checkpoint`]: checkpoint deserialization
//! - [`error`]: Error types for all operations

pub mod checkpoint;
pub mod dataset;
pub mod error;

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use serde::Serialize;

pub use error::PrepError;

use dataset::{DatasetSource, HttpFetcher};

/// The flickr8k-prep CLI application.
#[derive(Parser)]
#[command(name = "flickr8k-prep")]
#[command(version, about)]
#[command(propagate_version = true)]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// With no subcommand, acquire using these arguments.
    #[command(flatten)]
    acquire: AcquireArgs,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Download and extract the dataset unless it is already present.
    Acquire(AcquireArgs),
    /// Move extracted files into the canonical layout.
    Reconcile(ReconcileArgs),
    /// Report which required files and directories exist.
    Status(StatusArgs),
    /// Load a safetensors checkpoint and summarize its tensors.
    Checkpoint(CheckpointArgs),
}

#[derive(clap::Args)]
struct RootArg {
    /// Dataset root directory.
    #[arg(long, env = "FLICKR8K_ROOT", default_value = dataset::DEFAULT_ROOT)]
    root: PathBuf,
}

/// Archive URLs; local archive names come from their last path segment.
#[derive(clap::Args)]
struct SourceArgs {
    /// URL of the image archive.
    #[arg(long, env = "FLICKR8K_IMAGE_URL", default_value = dataset::DEFAULT_IMAGE_ARCHIVE_URL)]
    image_url: String,

    /// URL of the annotation text archive.
    #[arg(long, env = "FLICKR8K_TEXT_URL", default_value = dataset::DEFAULT_TEXT_ARCHIVE_URL)]
    text_url: String,
}

impl SourceArgs {
    fn into_source(self, timeout: Option<Duration>) -> DatasetSource {
        DatasetSource {
            image_archive_url: self.image_url,
            text_archive_url: self.text_url,
            timeout,
        }
    }
}

#[derive(clap::Args)]
struct OutputArg {
    /// Output format for the report ('text' or 'json').
    #[arg(long, default_value = "text")]
    output: String,
}

/// Arguments for the acquire subcommand.
#[derive(clap::Args)]
struct AcquireArgs {
    #[command(flatten)]
    root: RootArg,

    /// Also reconcile the extracted layout afterwards.
    #[arg(long)]
    reconcile: bool,

    #[command(flatten)]
    source: SourceArgs,

    /// Give up on a request after this many seconds (no limit by default).
    #[arg(long)]
    timeout_secs: Option<u64>,

    #[command(flatten)]
    output: OutputArg,
}

/// Arguments for the reconcile subcommand.
#[derive(clap::Args)]
struct ReconcileArgs {
    #[command(flatten)]
    root: RootArg,

    #[command(flatten)]
    source: SourceArgs,

    /// Exit non-zero if any required artifact is still missing.
    #[arg(long)]
    strict: bool,

    #[command(flatten)]
    output: OutputArg,
}

/// Arguments for the status subcommand.
#[derive(clap::Args)]
struct StatusArgs {
    #[command(flatten)]
    root: RootArg,

    #[command(flatten)]
    output: OutputArg,
}

/// Arguments for the checkpoint subcommand.
#[derive(clap::Args)]
struct CheckpointArgs {
    /// Path to a .safetensors checkpoint.
    path: PathBuf,

    #[command(flatten)]
    output: OutputArg,
}

/// Run the flickr8k-prep CLI.
///
/// This is the main entry point for the CLI, called from `main.rs`.
pub fn run() -> Result<(), PrepError> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Acquire(args)) => run_acquire(args),
        Some(Commands::Reconcile(args)) => run_reconcile(args),
        Some(Commands::Status(args)) => run_status(args),
        Some(Commands::Checkpoint(args)) => run_checkpoint(args),
        None => run_acquire(cli.acquire),
    }
}

fn run_acquire(args: AcquireArgs) -> Result<(), PrepError> {
    let output = OutputFormat::parse(&args.output.output)?;
    let source = args
        .source
        .into_source(args.timeout_secs.map(Duration::from_secs));
    let fetcher = HttpFetcher::new(source.timeout);

    let report = dataset::acquire(&args.root.root, &source, &fetcher)?;
    output.emit(&report)?;

    if args.reconcile {
        let reconciled = dataset::reconcile_with_source(&args.root.root, &source)?;
        output.emit(&reconciled)?;
    }
    Ok(())
}

fn run_reconcile(args: ReconcileArgs) -> Result<(), PrepError> {
    let output = OutputFormat::parse(&args.output.output)?;
    let source = args.source.into_source(None);
    let report = dataset::reconcile_with_source(&args.root.root, &source)?;
    output.emit(&report)?;

    let missing = report.missing();
    if args.strict && !missing.is_empty() {
        return Err(PrepError::IncompleteLayout { missing });
    }
    Ok(())
}

fn run_status(args: StatusArgs) -> Result<(), PrepError> {
    let output = OutputFormat::parse(&args.output.output)?;
    let status = dataset::check_layout(&args.root.root);
    output.emit(&status)?;

    let missing = status.missing();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(PrepError::IncompleteLayout { missing })
    }
}

fn run_checkpoint(args: CheckpointArgs) -> Result<(), PrepError> {
    let output = OutputFormat::parse(&args.output.output)?;
    let checkpoint = checkpoint::load(&args.path)?;
    output.emit(&checkpoint)
}

/// How reports are written to stdout.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    fn parse(value: &str) -> Result<Self, PrepError> {
        match value {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(PrepError::UnsupportedFormat(format!(
                "'{}' (supported: text, json)",
                other
            ))),
        }
    }

    fn emit<R: Serialize + std::fmt::Display>(self, report: &R) -> Result<(), PrepError> {
        match self {
            OutputFormat::Text => print!("{}", report),
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(report)?),
        }
        Ok(())
    }
}
