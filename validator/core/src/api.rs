use crate::{Content, Operation, RequestObject, ResultObject, Violation};
use anyhow::Result;

/// Produces the manifests that should be submitted for validation.
///
/// Implementations may snapshot a cluster, render a chart, or read files
/// from disk; the pipeline only depends on this signature.
#[async_trait::async_trait]
pub trait Source {
    async fn prepare_content(&self) -> Result<Vec<RequestObject>>;
}

/// Consumes resolved validation results and decides whether the run passed.
#[async_trait::async_trait]
pub trait ResultSink {
    async fn handle_result(&self, results: Vec<ResultObject>) -> Result<()>;
}

/// Models the remote policy-validation service.
#[async_trait::async_trait]
pub trait ValidationApi {
    /// Submits a manifest for validation, returning a handle to the
    /// asynchronous job.
    async fn submit(&self, content: &Content) -> Result<Operation>;

    /// Fetches the current state of a previously submitted job.
    async fn get_operation(&self, name: &str) -> Result<Operation>;

    /// Decodes the violations carried by a completed job.
    ///
    /// A job without a response payload has no findings.
    fn extract_violations(&self, operation: &Operation) -> Result<Vec<Violation>> {
        operation.violations().map_err(Into::into)
    }
}
