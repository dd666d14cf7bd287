//! relpub - Release Publisher CLI

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use relpub_cli::cmd;
use relpub_cli::ui::Output;
use relpub_cli::{Cli, Commands};
use relpub_core::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging; stdout is reserved for machine-readable output
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output = Output::new(cli.quiet);

    if let Commands::Completions { shell } = cli.command {
        cmd::completions::completions(shell);
        return Ok(());
    }

    let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;

    match cli.command {
        Commands::Publish {
            directory,
            endpoints,
            timeout,
            output_key,
            no_ci_output,
        } => {
            let args = cmd::publish::PublishArgs {
                directory,
                endpoints,
                timeout,
                output_key,
                no_ci_output,
            };
            cmd::publish::publish(&config, args, &output).await
        }
        Commands::Daemon {
            ready_line,
            timeout,
            log_file,
            command,
        } => {
            let args = cmd::daemon::DaemonArgs {
                ready_line,
                timeout,
                log_file,
                command,
            };
            cmd::daemon::daemon(&config, args, &output).await
        }
        Commands::Resolve {
            release,
            filename,
            repo,
            api_base,
            no_follow,
        } => {
            let args = cmd::resolve::ResolveArgs {
                release,
                filename,
                repo,
                api_base,
                no_follow,
            };
            cmd::resolve::resolve(&config, args, &output).await
        }
        Commands::Config => cmd::config::show(&config),
        Commands::Completions { .. } => Ok(()),
    }
}
