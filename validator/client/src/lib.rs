#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

mod token;

pub use self::token::{CommandToken, StaticToken, TokenSource};

use manifest_validator_core::{Content, Operation, ValidationApi};
use reqwest::StatusCode;
use serde::Serialize;
use std::{sync::Arc, time::Duration};
use tracing::{debug, trace};

const VALIDATE_PATH: &str = "v1:validateResources";
const OPERATIONS_PATH: &str = "v1";
const USER_PROJECT_HEADER: &str = "x-goog-user-project";

/// A stateless client for the remote policy-validation service.
///
/// Every request carries a freshly fetched bearer token and the project the
/// call is billed to.
#[derive(Clone)]
pub struct ValidationClient {
    http: reqwest::Client,
    endpoint: String,
    project: String,
    tokens: Arc<dyn TokenSource>,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to obtain an access token: {0:#}")]
    Credentials(anyhow::Error),

    #[error("failed to call the validation service: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("expected a successful response, but got {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("failed to decode the validation service response: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Serialize)]
struct ValidateRequest<'a> {
    resources: &'a Content,
}

// === impl ValidationClient ===

impl ValidationClient {
    pub fn new(
        endpoint: impl Into<String>,
        project: impl Into<String>,
        tokens: impl TokenSource + 'static,
        timeout: Duration,
    ) -> Result<Self, Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        let endpoint = endpoint.into().trim_end_matches('/').to_string();
        Ok(Self {
            http,
            endpoint,
            project: project.into(),
            tokens: Arc::new(tokens),
        })
    }

    /// Submits a manifest, returning the long-running operation that
    /// validates it.
    pub async fn validate_resources(&self, content: &Content) -> Result<Operation, Error> {
        let url = format!("{}/{VALIDATE_PATH}", self.endpoint);
        debug!(%url, "Submitting manifest");
        let req = self
            .http
            .post(url)
            .json(&ValidateRequest { resources: content });
        self.send(req).await
    }

    pub async fn operation(&self, name: &str) -> Result<Operation, Error> {
        let url = format!(
            "{}/{OPERATIONS_PATH}/{}",
            self.endpoint,
            name.trim_start_matches('/')
        );
        debug!(%url, "Fetching operation");
        self.send(self.http.get(url)).await
    }

    async fn send(&self, req: reqwest::RequestBuilder) -> Result<Operation, Error> {
        let token = self.tokens.token().await.map_err(Error::Credentials)?;
        let rsp = req
            .bearer_auth(token)
            .header(USER_PROJECT_HEADER, &self.project)
            .send()
            .await?;

        let status = rsp.status();
        let body = rsp.bytes().await?;
        if !status.is_success() {
            return Err(Error::Status {
                status,
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        let operation = serde_json::from_slice::<Operation>(&body)?;
        trace!(?operation);
        Ok(operation)
    }
}

impl std::fmt::Debug for ValidationClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidationClient")
            .field("endpoint", &self.endpoint)
            .field("project", &self.project)
            .finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl ValidationApi for ValidationClient {
    async fn submit(&self, content: &Content) -> anyhow::Result<Operation> {
        Ok(self.validate_resources(content).await?)
    }

    async fn get_operation(&self, name: &str) -> anyhow::Result<Operation> {
        Ok(self.operation(name).await?)
    }
}
