//! Reporter trait for dependency injection
//!
//! The publisher announces every submission through this trait so callers can
//! render progress without the core depending on a terminal.

use std::sync::Arc;

use crate::endpoint::Endpoint;
use crate::publish::{PublishOutcome, Submission};

/// Observer of a publish call.
pub trait PublishReporter: Send + Sync {
    /// A submission to `endpoint` has started.
    fn submitting(&self, endpoint: &Endpoint);

    /// A submission has settled, successfully or not.
    fn settled(&self, submission: &Submission);

    /// All submissions settled and one identifier was selected.
    fn selected(&self, outcome: &PublishOutcome);

    /// All submissions settled without a single success.
    fn all_failed(&self, submissions: &[Submission]);
}

impl<T: PublishReporter + ?Sized> PublishReporter for Arc<T> {
    fn submitting(&self, endpoint: &Endpoint) {
        (**self).submitting(endpoint);
    }
    fn settled(&self, submission: &Submission) {
        (**self).settled(submission);
    }
    fn selected(&self, outcome: &PublishOutcome) {
        (**self).selected(outcome);
    }
    fn all_failed(&self, submissions: &[Submission]) {
        (**self).all_failed(submissions);
    }
}

/// A no-op reporter for silent operations (e.g., testing).
#[derive(Debug, Clone, Copy, Default)]
pub struct NullReporter;

impl PublishReporter for NullReporter {
    fn submitting(&self, _: &Endpoint) {}
    fn settled(&self, _: &Submission) {}
    fn selected(&self, _: &PublishOutcome) {}
    fn all_failed(&self, _: &[Submission]) {}
}
