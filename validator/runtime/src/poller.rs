use crate::core::{RequestObject, ResultObject, State, ValidationApi};
use anyhow::{ensure, Context, Result};
use std::{collections::VecDeque, future::Future, time::Duration};
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info, trace, warn};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(120 * 60);

/// Submits manifests and waits for their validation operations to resolve.
///
/// Operations are checked one at a time, round-robin, at most once per
/// interval. Checking stops when every operation has resolved, when the
/// deadline elapses, or when the caller signals shutdown.
#[derive(Clone, Debug)]
pub struct Poller<A> {
    api: A,
    interval: Duration,
    deadline: Duration,
}

/// A submitted operation that has not resolved yet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingOperation {
    pub operation: String,
    pub resource: String,
}

/// An operation that completed with an error, or whose response could not be
/// decoded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FailedOperation {
    pub operation: String,
    pub resource: String,
    pub error: String,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct PollOutcome {
    pub results: Vec<ResultObject>,
    pub failed: Vec<FailedOperation>,

    /// Resources whose operations were still pending when polling stopped.
    pub unresolved: Vec<String>,

    pub completion: Completion,
}

/// Why polling stopped.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Completion {
    #[default]
    Drained,
    DeadlineElapsed,
    Cancelled,
}

// === impl Poller ===

impl<A: ValidationApi> Poller<A> {
    /// Fails if `interval` is zero.
    pub fn new(api: A, interval: Duration, deadline: Duration) -> Result<Self> {
        ensure!(!interval.is_zero(), "poll interval must be greater than zero");
        Ok(Self {
            api,
            interval,
            deadline,
        })
    }

    /// Submits each request in turn. The first failure aborts submission.
    pub async fn submit(&self, requests: Vec<RequestObject>) -> Result<Vec<PendingOperation>> {
        let mut pending = Vec::with_capacity(requests.len());
        for req in requests {
            let (resource, content) = req.into_parts();
            let operation = self
                .api
                .submit(&content)
                .await
                .with_context(|| format!("failed to submit {resource}"))?;
            info!(%resource, operation = %operation.name, "Submitted manifest");
            pending.push(PendingOperation {
                operation: operation.name,
                resource,
            });
        }
        Ok(pending)
    }

    /// Polls the operations until they resolve.
    ///
    /// The first check happens immediately. A check that has started always
    /// finishes before the deadline or shutdown is observed.
    pub async fn poll(
        &self,
        pending: Vec<PendingOperation>,
        shutdown: impl Future<Output = ()>,
    ) -> PollOutcome {
        let mut outcome = PollOutcome::default();
        if pending.is_empty() {
            return outcome;
        }

        let mut queue = VecDeque::from(pending);
        let deadline = time::sleep(self.deadline);
        tokio::pin!(deadline, shutdown);
        let mut interval = time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        while !queue.is_empty() {
            tokio::select! {
                biased;
                () = &mut shutdown => {
                    info!(pending = queue.len(), "Polling cancelled");
                    outcome.completion = Completion::Cancelled;
                    break;
                }
                () = &mut deadline => {
                    warn!(pending = queue.len(), deadline = ?self.deadline, "Deadline elapsed before all operations resolved");
                    outcome.completion = Completion::DeadlineElapsed;
                    break;
                }
                _ = interval.tick() => {}
            }

            if let Some(op) = queue.pop_front() {
                self.check(op, &mut queue, &mut outcome).await;
            }
        }

        outcome.unresolved = queue.into_iter().map(|op| op.resource).collect();
        debug!(
            results = outcome.results.len(),
            failed = outcome.failed.len(),
            unresolved = outcome.unresolved.len(),
            "Polling finished"
        );
        outcome
    }

    async fn check(
        &self,
        pending: PendingOperation,
        queue: &mut VecDeque<PendingOperation>,
        outcome: &mut PollOutcome,
    ) {
        let operation = match self.api.get_operation(&pending.operation).await {
            Ok(operation) => operation,
            Err(error) => {
                warn!(
                    operation = %pending.operation,
                    resource = %pending.resource,
                    error = format_args!("{error:#}"),
                    "Failed to fetch operation"
                );
                queue.push_back(pending);
                return;
            }
        };

        let failure = match operation.state() {
            State::Pending => {
                trace!(operation = %pending.operation, "Pending");
                queue.push_back(pending);
                return;
            }
            State::Failed(status) => status.to_string(),
            State::Succeeded => match self.api.extract_violations(&operation) {
                Ok(mut violations) => {
                    for violation in &mut violations {
                        violation.stamp_resource(&pending.resource);
                    }
                    info!(
                        resource = %pending.resource,
                        violations = violations.len(),
                        "Validation completed"
                    );
                    outcome.results.push(ResultObject {
                        resource_name: pending.resource,
                        violations,
                    });
                    return;
                }
                Err(error) => format!("{error:#}"),
            },
        };

        error!(
            operation = %pending.operation,
            resource = %pending.resource,
            error = %failure,
            "Validation operation failed"
        );
        outcome.failed.push(FailedOperation {
            operation: pending.operation,
            resource: pending.resource,
            error: failure,
        });
    }
}
