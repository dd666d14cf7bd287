//! Release asset resolution.
//!
//! Turns a release reference (`latest`, a numeric id, or a tag) plus a file
//! name into the download URL of the matching asset. Named references are
//! looked up by id first and by tag second.

use async_trait::async_trait;
use relpub_schema::GithubRelease;
use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

use crate::fallback::first_ok;

/// Default GitHub REST API base.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// Default route prefix under which releases are served by the host.
pub const DEFAULT_ROUTE_BASE: &str = "/api/release";

/// Errors raised while resolving a release.
#[derive(Error, Debug)]
pub enum ReleaseError {
    /// Transport or decode failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered 404 for the given URL.
    #[error("not found: {0}")]
    NotFound(String),

    /// The repository has no releases at all.
    #[error("repository has no releases")]
    NoReleases,

    /// Neither the id nor the tag lookup succeeded.
    #[error("could not resolve release {reference:?}: {}", .attempts.join("; "))]
    Unresolved {
        /// The reference as given.
        reference: String,
        /// Error message of each attempted lookup, in order.
        attempts: Vec<String>,
    },

    /// The repository slug is not `owner/name`.
    #[error("invalid repository {0:?}, expected owner/name")]
    InvalidRepository(String),

    /// The API base is not an absolute http(s) URL.
    #[error("invalid API base {0:?}")]
    InvalidApiBase(String),
}

/// Which release to look at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseRef {
    /// The newest release.
    Latest,
    /// A release id or tag name.
    Named(String),
}

impl ReleaseRef {
    /// `latest` maps to [`ReleaseRef::Latest`], everything else is a name.
    pub fn parse(input: &str) -> Self {
        if input == "latest" {
            Self::Latest
        } else {
            Self::Named(input.to_string())
        }
    }
}

/// Where a request for a release file should go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Redirect straight to the asset download.
    Asset {
        /// Public download URL of the asset.
        url: String,
    },
    /// `latest` was pinned to a concrete release; redirect to its own route.
    Canonical {
        /// Id of the newest release.
        release_id: u64,
    },
    /// The release has no asset with that name.
    NotFound,
}

impl Resolution {
    /// Redirect target for a host serving releases under `route_base`.
    ///
    /// `None` means the host should answer "not found".
    pub fn location(&self, route_base: &str, filename: &str) -> Option<String> {
        match self {
            Self::Asset { url } => Some(url.clone()),
            Self::Canonical { release_id } => Some(format!(
                "{}/{release_id}/{filename}",
                route_base.trim_end_matches('/')
            )),
            Self::NotFound => None,
        }
    }
}

/// Something that can look up releases.
#[async_trait]
pub trait ReleaseSource: Send + Sync {
    /// The newest release.
    async fn latest(&self) -> Result<GithubRelease, ReleaseError>;

    /// A release by numeric id.
    async fn by_id(&self, id: &str) -> Result<GithubRelease, ReleaseError>;

    /// A release by tag name.
    async fn by_tag(&self, tag: &str) -> Result<GithubRelease, ReleaseError>;
}

/// [`ReleaseSource`] backed by the GitHub REST API.
#[derive(Debug, Clone)]
pub struct GithubReleases {
    client: Client,
    api_base: String,
    owner: String,
    repo: String,
    token: Option<String>,
}

impl GithubReleases {
    /// Releases of `repository` (`owner/name`) on the public API.
    ///
    /// # Errors
    ///
    /// Returns [`ReleaseError::InvalidRepository`] for a malformed slug.
    pub fn new(client: Client, repository: &str) -> Result<Self, ReleaseError> {
        let (owner, repo) = repository
            .split_once('/')
            .filter(|(o, r)| !o.is_empty() && !r.is_empty() && !r.contains('/'))
            .ok_or_else(|| ReleaseError::InvalidRepository(repository.to_string()))?;

        Ok(Self {
            client,
            api_base: DEFAULT_API_BASE.to_string(),
            owner: owner.to_string(),
            repo: repo.to_string(),
            token: None,
        })
    }

    /// Point at a different API base (GitHub Enterprise, tests).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Authenticate requests with a bearer token.
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.is_empty());
        self
    }

    /// `<api_base>/repos/<owner>/<repo>/releases/<segments..>`, each segment
    /// percent-encoded.
    fn releases_url(&self, segments: &[&str]) -> Result<Url, ReleaseError> {
        let invalid = || ReleaseError::InvalidApiBase(self.api_base.clone());
        let mut url = Url::parse(&self.api_base).map_err(|_| invalid())?;
        url.path_segments_mut()
            .map_err(|()| invalid())?
            .pop_if_empty()
            .extend(["repos", self.owner.as_str(), self.repo.as_str(), "releases"])
            .extend(segments);
        Ok(url)
    }

    async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, ReleaseError> {
        let url = self.releases_url(segments)?;
        debug!(%url, "fetching release metadata");

        let mut request = self
            .client
            .get(url.clone())
            .header(reqwest::header::USER_AGENT, crate::USER_AGENT)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(ReleaseError::NotFound(url.to_string()));
        }
        Ok(response.error_for_status()?.json().await?)
    }
}

#[async_trait]
impl ReleaseSource for GithubReleases {
    async fn latest(&self) -> Result<GithubRelease, ReleaseError> {
        let releases: Vec<GithubRelease> = self.get(&[]).await?;
        releases.into_iter().next().ok_or(ReleaseError::NoReleases)
    }

    async fn by_id(&self, id: &str) -> Result<GithubRelease, ReleaseError> {
        self.get(&[id]).await
    }

    async fn by_tag(&self, tag: &str) -> Result<GithubRelease, ReleaseError> {
        self.get(&["tags", tag]).await
    }
}

/// Maps release references and file names to download locations.
#[derive(Debug, Clone)]
pub struct AssetResolver<S> {
    source: S,
}

impl<S: ReleaseSource> AssetResolver<S> {
    /// Resolve against `source`.
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Resolve one step: `latest` becomes [`Resolution::Canonical`], a named
    /// release becomes the matching asset or [`Resolution::NotFound`].
    ///
    /// # Errors
    ///
    /// Returns an error if the newest release cannot be fetched, or if a
    /// named release is found neither by id nor by tag.
    pub async fn resolve(
        &self,
        reference: &ReleaseRef,
        filename: &str,
    ) -> Result<Resolution, ReleaseError> {
        let name = match reference {
            ReleaseRef::Latest => {
                let latest = self.source.latest().await?;
                return Ok(Resolution::Canonical {
                    release_id: latest.id,
                });
            }
            ReleaseRef::Named(name) => name,
        };

        let release = first_ok(vec![self.source.by_id(name), self.source.by_tag(name)])
            .await
            .map_err(|errors| ReleaseError::Unresolved {
                reference: name.clone(),
                attempts: errors.iter().map(ToString::to_string).collect(),
            })?;

        Ok(match release.find_asset(filename) {
            Some(asset) => Resolution::Asset {
                url: asset.browser_download_url.clone(),
            },
            None => {
                debug!(release = %release.tag_name, filename, "no asset with that name");
                Resolution::NotFound
            }
        })
    }

    /// Resolve all the way to a download URL, following `latest` once.
    ///
    /// # Errors
    ///
    /// Same as [`AssetResolver::resolve`].
    pub async fn resolve_download(
        &self,
        reference: &ReleaseRef,
        filename: &str,
    ) -> Result<Option<String>, ReleaseError> {
        let resolution = match self.resolve(reference, filename).await? {
            Resolution::Canonical { release_id } => {
                self.resolve(&ReleaseRef::Named(release_id.to_string()), filename)
                    .await?
            }
            other => other,
        };

        Ok(match resolution {
            Resolution::Asset { url } => Some(url),
            Resolution::Canonical { .. } | Resolution::NotFound => None,
        })
    }
}
