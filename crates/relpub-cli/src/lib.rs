//! relpub - Release Publisher
#![allow(missing_docs)]
#![allow(clippy::missing_errors_doc)]
//!
//! Publishes release directories to content-addressed storage and resolves
//! release downloads.
//!
//! # Commands
//!
//! - `publish`: pin a directory on several endpoints, hand the identifier to CI
//! - `daemon`: start a local daemon and wait until it is ready
//! - `resolve`: release reference + file name to download URL
//! - `config`: print the effective configuration

pub mod cmd;
pub mod ui;

pub use relpub_core::USER_AGENT;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "relpub")]
#[command(author, version, about = "relpub - publish release artifacts to content-addressed storage")]
pub struct Cli {
    /// Config file (defaults to ./relpub.toml when present)
    #[arg(long, short = 'c', global = true, env = "RELPUB_CONFIG")]
    pub config: Option<PathBuf>,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Pin a directory on every endpoint and report the first success
    Publish {
        /// Directory to publish
        directory: PathBuf,
        /// Endpoint address, repeat in priority order (overrides config)
        #[arg(long = "endpoint", short = 'e')]
        endpoints: Vec<String>,
        /// Bound on the whole publish in seconds, 0 for none
        #[arg(long)]
        timeout: Option<u64>,
        /// CI output key for the selected identifier
        #[arg(long)]
        output_key: Option<String>,
        /// Do not write the identifier to the CI output channel
        #[arg(long)]
        no_ci_output: bool,
    },
    /// Start a daemon and exit once it reports readiness
    Daemon {
        /// Readiness line to wait for
        #[arg(long)]
        ready_line: Option<String>,
        /// Seconds to wait for readiness, 0 for no limit
        #[arg(long)]
        timeout: Option<u64>,
        /// File the daemon writes its output to (default: a new temp file)
        #[arg(long)]
        log_file: Option<PathBuf>,
        /// Program and arguments (overrides config)
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },
    /// Resolve a release and file name to a download URL
    Resolve {
        /// Release id, tag, or "latest"
        release: String,
        /// Asset file name
        filename: String,
        /// Repository as owner/name (overrides config)
        #[arg(long)]
        repo: Option<String>,
        /// Releases API base URL (overrides config)
        #[arg(long)]
        api_base: Option<String>,
        /// Print the redirect target instead of following "latest"
        #[arg(long)]
        no_follow: bool,
    },
    /// Print the effective configuration as TOML
    Config,
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}
