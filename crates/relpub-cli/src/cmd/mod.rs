//! Subcommand implementations.

pub mod completions;
pub mod config;
pub mod daemon;
pub mod publish;
pub mod resolve;
