//! Daemon command

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use relpub_core::Config;
use relpub_core::daemon::launch;

use crate::ui::Output;

/// Flags given on the command line; `None` falls back to the config.
#[derive(Debug, Clone)]
pub struct DaemonArgs {
    pub ready_line: Option<String>,
    pub timeout: Option<u64>,
    pub log_file: Option<PathBuf>,
    pub command: Vec<String>,
}

/// Start the configured daemon (or `command`) and wait for readiness.
pub async fn daemon(config: &Config, args: DaemonArgs, output: &Output) -> Result<()> {
    let mut spec = config.daemon_spec();
    if let Some((program, rest)) = args.command.split_first() {
        spec.program.clone_from(program);
        spec.args = rest.to_vec();
    }
    if let Some(line) = args.ready_line {
        spec.ready_line = line;
    }
    if let Some(secs) = args.timeout {
        spec.timeout = (secs > 0).then(|| Duration::from_secs(secs));
    }
    if args.log_file.is_some() {
        spec.log_file = args.log_file;
    }

    output.section(&format!(
        "Starting {} {}",
        spec.program,
        spec.args.join(" ")
    ));

    let daemon = launch(&spec)
        .await
        .with_context(|| format!("Daemon {} did not become ready", spec.program))?;

    match daemon.pid() {
        Some(pid) => output.success(&format!("{} is ready (pid {pid})", spec.program)),
        None => output.success(&format!("{} is ready", spec.program)),
    }
    output.info(&format!("logging to {}", daemon.log_file().display()));
    Ok(())
}
