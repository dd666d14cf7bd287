//! Console implementation of the publish reporter.

use relpub_core::{Endpoint, PublishOutcome, PublishReporter, Submission, SubmissionResult};

use super::Output;

/// Prints one line per endpoint as submissions start and settle.
#[derive(Debug, Clone, Copy)]
pub struct ConsoleReporter {
    output: Output,
}

impl ConsoleReporter {
    pub fn new(output: Output) -> Self {
        Self { output }
    }

    fn print_table(&self, submissions: &[Submission]) {
        for (idx, submission) in submissions.iter().enumerate() {
            let result = match &submission.result {
                SubmissionResult::Pinned(cid) => cid.to_string(),
                SubmissionResult::Failed(_) => "-".to_string(),
            };
            self.output
                .info(&format!("{:>2}. {:<48} {result}", idx + 1, submission.endpoint));
        }
    }
}

impl PublishReporter for ConsoleReporter {
    fn submitting(&self, endpoint: &Endpoint) {
        self.output.info(&format!("submitting to {endpoint}"));
    }

    fn settled(&self, submission: &Submission) {
        match &submission.result {
            SubmissionResult::Pinned(cid) => self
                .output
                .success(&format!("{} pinned {cid}", submission.endpoint)),
            SubmissionResult::Failed(reason) => self
                .output
                .warning(&format!("{} failed: {reason}", submission.endpoint)),
        }
    }

    fn selected(&self, outcome: &PublishOutcome) {
        self.output.section("Results");
        self.print_table(outcome.submissions());
        if outcome.divergent() {
            self.output
                .warning("endpoints returned different identifiers for the same directory");
        }
        self.output.success(&format!(
            "selected {} from {}",
            outcome.selected_cid(),
            outcome.selected_endpoint()
        ));
    }

    fn all_failed(&self, submissions: &[Submission]) {
        self.output.section("Results");
        self.print_table(submissions);
        self.output
            .error(&format!("all {} endpoints failed", submissions.len()));
    }
}
