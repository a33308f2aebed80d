use crate::Violation;
use serde::{Deserialize, Serialize};

/// A handle to an asynchronous remote validation job.
///
/// Operations are only ever replaced by re-fetching them from the service;
/// they are never mutated locally.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    pub name: String,

    #[serde(default)]
    pub done: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Status>,

    /// Opaque response payload, present once the job completes successfully.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<serde_json::Value>,
}

/// The terminal error reported for a failed operation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    #[serde(default)]
    pub code: i32,

    #[serde(default)]
    pub message: String,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum State<'a> {
    Pending,
    Failed(&'a Status),
    Succeeded,
}

#[derive(Debug, Default, Deserialize)]
struct ValidateResponse {
    #[serde(default)]
    violations: Vec<Violation>,
}

// === impl Operation ===

impl Operation {
    pub fn state(&self) -> State<'_> {
        match (self.done, &self.error) {
            (false, _) => State::Pending,
            (true, Some(status)) => State::Failed(status),
            (true, None) => State::Succeeded,
        }
    }

    /// Decodes the violations from the response payload.
    ///
    /// An absent or null payload means the service found nothing.
    pub fn violations(&self) -> Result<Vec<Violation>, serde_json::Error> {
        match &self.response {
            None | Some(serde_json::Value::Null) => Ok(Vec::new()),
            Some(rsp) => {
                let ValidateResponse { violations } = ValidateResponse::deserialize(rsp)?;
                Ok(violations)
            }
        }
    }
}

// === impl Status ===

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "code {}: {}", self.code, self.message)
    }
}
