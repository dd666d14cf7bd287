//! relpub-core - publishing, readiness and release resolution for release pipelines.
//!
//! # Overview
//!
//! - [`publish`]: submit one directory to several content-addressing endpoints
//!   at once and select the first success in endpoint priority order.
//! - [`daemon`]: start a background daemon and wait for its readiness line.
//! - [`release`]: resolve a release reference and file name to a download URL.
//! - [`ci`]: hand results to the orchestrating pipeline.
//!
//! # Architecture
//!
//! - **Injected collaborators**: [`DirectorySource`], [`ContentTransport`] and
//!   [`ReleaseSource`] are traits so tests run without disk or network.
//! - **Join, then select**: all submissions settle before one is chosen, so the
//!   full outcome is always available for reporting.

pub mod ci;
pub mod config;
pub mod daemon;
pub mod endpoint;
pub mod fallback;
pub mod publish;
pub mod release;
pub mod reporter;
pub mod source;
pub mod transport;

pub use ci::CiOutput;
pub use config::Config;
pub use endpoint::{Endpoint, EndpointError};
pub use publish::{PublishError, PublishOutcome, Publisher, Submission, SubmissionResult};
pub use release::{AssetResolver, GithubReleases, ReleaseRef, ReleaseSource, Resolution};
pub use reporter::{NullReporter, PublishReporter};
pub use source::{Bundle, DirectorySource, FsDirectorySource};
pub use transport::{ContentTransport, HttpTransport, SubmitError};

pub use relpub_schema::Cid;

/// User Agent string for outgoing requests
pub const USER_AGENT: &str = concat!("relpub/", env!("CARGO_PKG_VERSION"));
