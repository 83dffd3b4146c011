//! CLI parse: clap types for canvass. No behavior; definitions only.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Canvass CLI - resumable two-phase question batches
#[derive(Parser)]
#[command(name = "canvass")]
#[command(about = "Resumable two-phase batch lookups against a remote answering service")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root directory (config files and relative paths)
    #[arg(long, global = true, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Disable logging
    #[arg(long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long, global = true)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file)
    #[arg(long, global = true)]
    pub log_output: Option<String>,

    /// Log file path (when output is "file")
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,
}

/// Options shared by the commands that run domains.
#[derive(Args, Debug, Clone, Default)]
pub struct RunOptions {
    /// Output directory (default: batch.output_root)
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Parallel workers per domain (default: batch.max_concurrency)
    #[arg(long)]
    pub workers: Option<usize>,

    /// Subject list CSV (default: bundled country list)
    #[arg(long)]
    pub subjects_file: Option<PathBuf>,

    /// Re-ask every question and overwrite cached answers
    #[arg(long)]
    pub force: bool,

    /// Output format (text or json)
    #[arg(long, default_value = "text")]
    pub format: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run both phases for several domains, one domain at a time
    Run {
        /// Comma-separated list of domains (e.g. "Justice,Defense,Health")
        #[arg(long, required_unless_present = "all_domains", conflicts_with = "all_domains")]
        domains: Option<String>,

        /// Process every domain in the domain list
        #[arg(long)]
        all_domains: bool,

        #[command(flatten)]
        options: RunOptions,
    },
    /// Run both phases for a single domain
    Domain {
        /// Domain name
        name: String,

        #[command(flatten)]
        options: RunOptions,
    },
    /// Show cached answer counts per domain
    Status {
        /// Output directory (default: batch.output_root)
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Comma-separated domains (default: the domain list)
        #[arg(long)]
        domains: Option<String>,

        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// List known domains
    Domains,
    /// Print the effective configuration as TOML
    Config,
}
