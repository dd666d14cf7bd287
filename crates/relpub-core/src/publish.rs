//! Multi-endpoint publishing.
//!
//! One directory is submitted to every endpoint at once. Each submission is
//! isolated: a failure only marks that endpoint's result as absent. Once every
//! submission has settled, the first success in endpoint order is selected.
//!
//! ```text
//! publish(dir, [e1, e2, e3])
//!   -> load dir once
//!   -> add(e1) | add(e2) | add(e3)      (concurrent)
//!   -> join all
//!   -> [Failed, Pinned(a), Pinned(b)]   (input order)
//!   -> selected = a
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use relpub_schema::Cid;
use thiserror::Error;
use tracing::{info, warn};

use crate::endpoint::Endpoint;
use crate::reporter::{NullReporter, PublishReporter};
use crate::source::{Bundle, DirectorySource, FsDirectorySource};
use crate::transport::{ContentTransport, SubmitError};

/// Result of submitting to one endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionResult {
    /// The endpoint pinned the bundle under this identifier.
    Pinned(Cid),
    /// The submission failed; the reason is kept for diagnostics.
    Failed(String),
}

impl SubmissionResult {
    /// The identifier, if the submission succeeded.
    pub fn cid(&self) -> Option<&Cid> {
        match self {
            Self::Pinned(cid) => Some(cid),
            Self::Failed(_) => None,
        }
    }
}

/// An endpoint together with what happened when submitting to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    /// Target endpoint.
    pub endpoint: Endpoint,
    /// Outcome of the single attempt.
    pub result: SubmissionResult,
}

/// Settled submissions of a successful publish call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishOutcome {
    submissions: Vec<Submission>,
    selected: usize,
    cid: Cid,
}

impl PublishOutcome {
    /// Every submission, in endpoint-list order.
    pub fn submissions(&self) -> &[Submission] {
        &self.submissions
    }

    /// Per-endpoint identifiers in endpoint-list order, `None` for failures.
    pub fn results(&self) -> Vec<Option<&Cid>> {
        self.submissions.iter().map(|s| s.result.cid()).collect()
    }

    /// The first successful identifier in endpoint order.
    pub fn selected_cid(&self) -> &Cid {
        &self.cid
    }

    /// The endpoint the selected identifier came from.
    pub fn selected_endpoint(&self) -> &Endpoint {
        &self.submissions[self.selected].endpoint
    }

    /// Number of endpoints that pinned the bundle.
    pub fn success_count(&self) -> usize {
        self.submissions
            .iter()
            .filter(|s| s.result.cid().is_some())
            .count()
    }

    /// Whether successful endpoints disagree on the identifier.
    ///
    /// Identical content should always hash to the same identifier, so a
    /// disagreement points at differing chunking settings or a misbehaving
    /// endpoint.
    pub fn divergent(&self) -> bool {
        let mut cids = self.submissions.iter().filter_map(|s| s.result.cid());
        let Some(first) = cids.next() else {
            return false;
        };
        cids.any(|cid| cid != first)
    }
}

/// Call-level publish failures.
#[derive(Error, Debug)]
pub enum PublishError {
    /// The directory is missing, not a directory, or unreadable.
    #[error("invalid input {}: {reason}", .path.display())]
    InvalidInput {
        /// Directory that was requested.
        path: PathBuf,
        /// What went wrong while reading it.
        reason: String,
    },

    /// The endpoint set is unusable.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// No endpoint pinned the bundle.
    #[error("all {} endpoints failed", .submissions.len())]
    AllEndpointsFailed {
        /// Every submission, all of them failed.
        submissions: Vec<Submission>,
    },
}

/// Publishes a directory to several endpoints and selects one identifier.
#[derive(Debug)]
pub struct Publisher<T, S = FsDirectorySource, R = NullReporter> {
    transport: T,
    source: Arc<S>,
    reporter: R,
    timeout: Option<Duration>,
}

impl<T: ContentTransport> Publisher<T> {
    /// Publisher reading from the local filesystem with no reporting.
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            source: Arc::new(FsDirectorySource::new()),
            reporter: NullReporter,
            timeout: None,
        }
    }
}

impl<T, S, R> Publisher<T, S, R>
where
    T: ContentTransport,
    S: DirectorySource + 'static,
    R: PublishReporter,
{
    /// Replace the directory source.
    pub fn with_source<S2: DirectorySource + 'static>(self, source: S2) -> Publisher<T, S2, R> {
        Publisher {
            transport: self.transport,
            source: Arc::new(source),
            reporter: self.reporter,
            timeout: self.timeout,
        }
    }

    /// Replace the reporter.
    pub fn with_reporter<R2: PublishReporter>(self, reporter: R2) -> Publisher<T, S, R2> {
        Publisher {
            transport: self.transport,
            source: self.source,
            reporter,
            timeout: self.timeout,
        }
    }

    /// Bound the wall-clock time of a publish call.
    ///
    /// Submissions still running when the limit expires count as failed.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Submit `directory` to every endpoint and select the first success.
    ///
    /// Dropping the returned future abandons every in-flight submission.
    ///
    /// # Errors
    ///
    /// - [`PublishError::Configuration`] if `endpoints` is empty.
    /// - [`PublishError::InvalidInput`] if `directory` cannot be read. No
    ///   request is sent in this case.
    /// - [`PublishError::AllEndpointsFailed`] if no endpoint succeeded.
    pub async fn publish(
        &self,
        directory: &Path,
        endpoints: &[Endpoint],
    ) -> Result<PublishOutcome, PublishError> {
        if endpoints.is_empty() {
            return Err(PublishError::Configuration(
                "no endpoints configured".to_string(),
            ));
        }

        let bundle = self.load(directory).await?;

        info!(
            root = bundle.root(),
            files = bundle.file_count(),
            bytes = bundle.total_bytes(),
            endpoints = endpoints.len(),
            "publishing directory"
        );

        let pending = endpoints
            .iter()
            .map(|endpoint| self.submit(endpoint, &bundle));
        let submissions = join_all(pending).await;

        let first = submissions
            .iter()
            .enumerate()
            .find_map(|(idx, s)| s.result.cid().map(|cid| (idx, cid.clone())));
        match first {
            Some((selected, cid)) => {
                let outcome = PublishOutcome {
                    submissions,
                    selected,
                    cid,
                };
                if outcome.divergent() {
                    warn!(
                        selected = %outcome.selected_cid(),
                        "endpoints returned different identifiers for the same content"
                    );
                }
                info!(
                    cid = %outcome.selected_cid(),
                    endpoint = %outcome.selected_endpoint(),
                    succeeded = outcome.success_count(),
                    "publish complete"
                );
                self.reporter.selected(&outcome);
                Ok(outcome)
            }
            None => {
                warn!(endpoints = submissions.len(), "no endpoint accepted the bundle");
                self.reporter.all_failed(&submissions);
                Err(PublishError::AllEndpointsFailed { submissions })
            }
        }
    }

    /// Walk and read the tree on the blocking pool.
    async fn load(&self, directory: &Path) -> Result<Bundle, PublishError> {
        let invalid = |reason: String| PublishError::InvalidInput {
            path: directory.to_path_buf(),
            reason,
        };

        let source = Arc::clone(&self.source);
        let root = directory.to_path_buf();
        tokio::task::spawn_blocking(move || source.load(&root))
            .await
            .map_err(|e| invalid(e.to_string()))?
            .map_err(|e| invalid(e.to_string()))
    }

    async fn submit(&self, endpoint: &Endpoint, bundle: &Bundle) -> Submission {
        self.reporter.submitting(endpoint);

        let attempt = self.transport.add(endpoint, bundle);
        let result = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, attempt)
                .await
                .unwrap_or_else(|_| Err(SubmitError::Timeout(limit))),
            None => attempt.await,
        };

        let result = match result {
            Ok(cid) => {
                info!(%endpoint, %cid, "endpoint pinned bundle");
                SubmissionResult::Pinned(cid)
            }
            Err(e) => {
                warn!(%endpoint, error = %e, "submission failed");
                SubmissionResult::Failed(e.to_string())
            }
        };

        let submission = Submission {
            endpoint: endpoint.clone(),
            result,
        };
        self.reporter.settled(&submission);
        submission
    }
}
