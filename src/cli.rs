//! CLI definitions for xport.
//!
//! Uses clap for argument parsing with derive macros.

use crate::processor::OnDuplicate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// xport - Twitter/X archive importer
#[derive(Parser, Debug)]
#[command(name = "xport")]
#[command(version)]
#[command(about = "Import a Twitter/X data archive into a local content store")]
#[command(long_about = r#"
xport - A command-line tool for turning a Twitter/X data archive into
block-structured documents in a local SQLite content store.

Features:
  - Batched, resumable imports driven by a tweet-id cursor
  - Reply threads flattened into collapsible blocks
  - Hashtag, mention, and URL rewriting to durable markup
  - Photo sideloading with optional mirror rewriting
  - Duplicate policies: create, update, or skip

Quick start:
  1. Download your archive from x.com/settings
  2. Inspect it: xport check path/to/tweets.js
  3. Import it: xport import path/to/tweets.js --all
"#)]
pub struct Cli {
    /// Path to the database file
    #[arg(long, env = "XPORT_DB", global = true)]
    pub db: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'f', default_value = "text", global = true)]
    pub format: OutputFormat,

    /// Be verbose (show debug info)
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Be quiet (suppress non-error output)
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Import tweets from an archive file
    Import(ImportArgs),

    /// Preview which tweets an import would visit
    Preview(PreviewArgs),

    /// Show archive statistics
    Stats(StatsArgs),

    /// Check an archive file for import readiness
    Check(CheckArgs),

    /// Show or manage configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args, Debug)]
pub struct ImportArgs {
    /// Path to the archive file (tweets.js or plain JSON)
    pub archive_path: PathBuf,

    /// Processor to run each tweet through
    #[arg(long, short = 'p')]
    pub processor: Option<String>,

    /// What to do when a tweet already has a document
    #[arg(long, value_enum)]
    pub on_duplicate: Option<DuplicatePolicy>,

    /// Maximum tweets to attempt this run
    #[arg(long, short = 'n')]
    pub batch_size: Option<usize>,

    /// Resume after this tweet id instead of the archive start
    #[arg(long)]
    pub resume_from: Option<String>,

    /// Fetch photos from this mirror base URL instead of the archived URLs
    #[arg(long)]
    pub media_base_url: Option<String>,

    /// Directory sideloaded media is written to
    #[arg(long)]
    pub media_dir: Option<PathBuf>,

    /// Author recorded on created documents
    #[arg(long)]
    pub author: Option<String>,

    /// Run against an in-memory store; nothing is persisted
    #[arg(long)]
    pub dry_run: bool,

    /// Keep running batches until the archive is exhausted
    #[arg(long)]
    pub all: bool,

    /// Seconds to wait between batches (with --all)
    #[arg(long)]
    pub delay: Option<u64>,
}

#[derive(Args, Debug)]
pub struct PreviewArgs {
    /// Path to the archive file
    pub archive_path: PathBuf,

    /// Start after this tweet id
    #[arg(long)]
    pub after: Option<String>,

    /// Maximum tweets to show
    #[arg(long, short = 'n', default_value = "10")]
    pub limit: usize,

    /// Only show tweets an import would visit (skip replies)
    #[arg(long)]
    pub roots_only: bool,

    /// Show the reply thread under each tweet
    #[arg(long, short = 't')]
    pub thread: bool,
}

#[derive(Args, Debug)]
pub struct StatsArgs {
    /// Path to the archive file
    pub archive_path: PathBuf,

    /// Number of top hashtags to show
    #[arg(long, short = 'n', default_value = "10")]
    pub top: usize,
}

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Path to the archive file
    pub archive_path: PathBuf,
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Show current configuration
    #[arg(long)]
    pub show: bool,

    /// Write a default config file to the standard location
    #[arg(long)]
    pub init: bool,
}

#[derive(Args, Debug, Clone)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}

/// Duplicate policy as a strict CLI value (the config file is lenient).
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DuplicatePolicy {
    #[default]
    New,
    Update,
    Skip,
}

impl From<DuplicatePolicy> for OnDuplicate {
    fn from(policy: DuplicatePolicy) -> Self {
        match policy {
            DuplicatePolicy::New => Self::New,
            DuplicatePolicy::Update => Self::Update,
            DuplicatePolicy::Skip => Self::Skip,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    JsonPretty,
}
