//! Resolve command

use anyhow::{Context, Result, bail};
use relpub_core::{AssetResolver, Config, GithubReleases, ReleaseRef};

use crate::ui::Output;

/// Flags given on the command line; `None` falls back to the config.
#[derive(Debug, Clone)]
pub struct ResolveArgs {
    pub release: String,
    pub filename: String,
    pub repo: Option<String>,
    pub api_base: Option<String>,
    pub no_follow: bool,
}

/// Print the download URL (or redirect target) of a release file.
pub async fn resolve(config: &Config, args: ResolveArgs, output: &Output) -> Result<()> {
    let repository = args.repo.as_deref().unwrap_or(&config.release.repository);
    let api_base = args.api_base.as_deref().unwrap_or(&config.release.api_base);

    let client = reqwest::Client::builder()
        .user_agent(relpub_core::USER_AGENT)
        .build()
        .context("Failed to build HTTP client")?;
    let source = GithubReleases::new(client, repository)?
        .with_api_base(api_base)
        .with_token(config.release.token.clone());
    let resolver = AssetResolver::new(source);
    let reference = ReleaseRef::parse(&args.release);

    let location = if args.no_follow {
        resolver
            .resolve(&reference, &args.filename)
            .await
            .with_context(|| format!("Failed to resolve release {}", args.release))?
            .location(&config.release.route_base, &args.filename)
    } else {
        resolver
            .resolve_download(&reference, &args.filename)
            .await
            .with_context(|| format!("Failed to resolve release {}", args.release))?
    };

    let Some(location) = location else {
        output.error(&format!(
            "release {} of {repository} has no asset named {}",
            args.release, args.filename
        ));
        bail!("Asset not found");
    };

    println!("{location}");
    Ok(())
}
