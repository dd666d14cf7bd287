//! Publish command

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use relpub_core::{CiOutput, Config, Endpoint, HttpTransport, PublishError, Publisher};

use crate::ui::{ConsoleReporter, Output};

/// Flags given on the command line; `None` falls back to the config.
#[derive(Debug, Clone)]
pub struct PublishArgs {
    pub directory: PathBuf,
    pub endpoints: Vec<String>,
    pub timeout: Option<u64>,
    pub output_key: Option<String>,
    pub no_ci_output: bool,
}

/// Pin a directory on every endpoint and hand the identifier to CI.
pub async fn publish(config: &Config, args: PublishArgs, output: &Output) -> Result<()> {
    let endpoints = if args.endpoints.is_empty() {
        config.endpoints().context("Invalid endpoint in configuration")?
    } else {
        args.endpoints
            .iter()
            .map(|e| Endpoint::parse(e))
            .collect::<Result<Vec<_>, _>>()
            .context("Invalid --endpoint")?
    };

    let timeout = match args.timeout {
        Some(0) => None,
        Some(secs) => Some(Duration::from_secs(secs)),
        None => config.publish_timeout(),
    };
    let key = args
        .output_key
        .unwrap_or_else(|| config.publish.output_key.clone());

    output.section(&format!(
        "Publishing {} to {} endpoint(s)",
        args.directory.display(),
        endpoints.len()
    ));

    let client = reqwest::Client::builder()
        .user_agent(relpub_core::USER_AGENT)
        .build()
        .context("Failed to build HTTP client")?;
    let publisher = Publisher::new(HttpTransport::new(client))
        .with_reporter(ConsoleReporter::new(*output))
        .with_timeout(timeout);

    let outcome = match publisher.publish(&args.directory, &endpoints).await {
        Ok(outcome) => outcome,
        Err(PublishError::AllEndpointsFailed { submissions }) => {
            let reasons: Vec<String> = submissions
                .iter()
                .map(|s| format!("{}: {:?}", s.endpoint, s.result))
                .collect();
            tracing::debug!(?reasons, "publish failed everywhere");
            bail!("No endpoint accepted {}", args.directory.display());
        }
        Err(e) => return Err(e).context("Publish aborted"),
    };

    let channel = if args.no_ci_output {
        CiOutput::Disabled
    } else {
        CiOutput::from_env()
    };
    channel
        .set(&key, outcome.selected_cid().as_str())
        .context("Failed to write CI output")?;

    Ok(())
}
