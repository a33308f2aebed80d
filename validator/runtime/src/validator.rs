use crate::{
    core::{ResultSink, Source, ValidationApi},
    poller::{Completion, Poller},
};
use anyhow::{Context, Result};
use std::future::Future;
use tracing::{info, warn};

/// Runs the validation pipeline: collect manifests, submit them, wait for
/// the results, and hand them to the sink.
#[derive(Clone, Debug)]
pub struct Validator<S, A, R> {
    source: S,
    poller: Poller<A>,
    sink: R,
    policy: FailurePolicy,
}

/// Controls whether operations that did not produce results fail the run.
///
/// By default they are only logged.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct FailurePolicy {
    pub fail_on_operation_error: bool,
    pub fail_on_unresolved: bool,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("validation was cancelled with {} operation(s) unresolved", unresolved.len())]
pub struct Cancelled {
    pub unresolved: Vec<String>,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error(
    "validation is incomplete: {} operation(s) failed and {} did not resolve",
    failed.len(),
    unresolved.len()
)]
pub struct Incomplete {
    pub failed: Vec<String>,
    pub unresolved: Vec<String>,
}

// === impl Validator ===

impl<S, A, R> Validator<S, A, R>
where
    S: Source,
    A: ValidationApi,
    R: ResultSink,
{
    pub fn new(source: S, poller: Poller<A>, sink: R) -> Self {
        Self {
            source,
            poller,
            sink,
            policy: FailurePolicy::default(),
        }
    }

    pub fn with_failure_policy(self, policy: FailurePolicy) -> Self {
        Self { policy, ..self }
    }

    /// Validates every manifest the source prepares.
    ///
    /// Fails if the sink rejects the results, if polling is interrupted by
    /// `shutdown`, or if the failure policy rejects operations that did not
    /// resolve cleanly.
    pub async fn validate(&self, shutdown: impl Future<Output = ()>) -> Result<()> {
        let requests = self
            .source
            .prepare_content()
            .await
            .context("failed to prepare manifests for validation")?;
        info!(manifests = requests.len(), "Submitting manifests for validation");

        let pending = self
            .poller
            .submit(requests)
            .await
            .context("failed to submit manifests for validation")?;

        let outcome = self.poller.poll(pending, shutdown).await;
        match outcome.completion {
            Completion::Drained => {}
            Completion::DeadlineElapsed => warn!(
                unresolved = ?outcome.unresolved,
                "Reporting partial results; some operations did not resolve before the deadline"
            ),
            Completion::Cancelled => {
                return Err(Cancelled {
                    unresolved: outcome.unresolved,
                }
                .into())
            }
        }
        if !outcome.failed.is_empty() {
            warn!(
                failed = outcome.failed.len(),
                "Some operations failed; their resources were not validated"
            );
        }

        let verdict = self
            .sink
            .handle_result(outcome.results)
            .await
            .context("failed to handle validation results");

        let failed = if self.policy.fail_on_operation_error {
            outcome.failed.into_iter().map(|op| op.resource).collect()
        } else {
            Vec::new()
        };
        let unresolved = if self.policy.fail_on_unresolved {
            outcome.unresolved
        } else {
            Vec::new()
        };
        if !failed.is_empty() || !unresolved.is_empty() {
            let incomplete = Incomplete { failed, unresolved };
            return Err(match verdict {
                Ok(()) => incomplete.into(),
                Err(error) => error.context(incomplete),
            });
        }

        verdict
    }
}
