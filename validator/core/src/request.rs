use crate::Violation;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

/// The largest encoded payload the validation service accepts (32 MiB).
pub const REQUEST_SIZE_LIMIT: usize = 32 * 1024 * 1024;

/// Content type the service uses for YAML manifests.
pub const YAML_CONTENT_TYPE: &str = "1";

/// An encoded manifest as it is sent to the validation service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Content {
    pub content_type: String,

    /// Base64-encoded manifest bytes.
    pub data: String,
}

/// A named manifest queued for submission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestObject {
    resource_name: String,
    content: Content,
}

/// The violations resolved for one submitted manifest.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResultObject {
    pub resource_name: String,
    pub violations: Vec<Violation>,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("{resource} encodes to {encoded_len} bytes, which exceeds the {limit} byte request limit")]
pub struct PayloadTooLarge {
    pub resource: String,
    pub encoded_len: usize,
    pub limit: usize,
}

// === impl RequestObject ===

impl RequestObject {
    /// Encodes a YAML manifest for submission.
    ///
    /// Fails without encoding anything if the encoded payload would be at
    /// least [`REQUEST_SIZE_LIMIT`] bytes.
    pub fn from_manifest(
        resource_name: impl Into<String>,
        manifest: impl AsRef<[u8]>,
    ) -> Result<Self, PayloadTooLarge> {
        let resource_name = resource_name.into();
        let manifest = manifest.as_ref();

        let encoded_len = base64::encoded_len(manifest.len(), true).unwrap_or(usize::MAX);
        if encoded_len >= REQUEST_SIZE_LIMIT {
            return Err(PayloadTooLarge {
                resource: resource_name,
                encoded_len,
                limit: REQUEST_SIZE_LIMIT,
            });
        }

        Ok(Self {
            resource_name,
            content: Content {
                content_type: YAML_CONTENT_TYPE.to_string(),
                data: STANDARD.encode(manifest),
            },
        })
    }

    pub fn resource_name(&self) -> &str {
        &self.resource_name
    }

    pub fn content(&self) -> &Content {
        &self.content
    }

    pub fn into_parts(self) -> (String, Content) {
        (self.resource_name, self.content)
    }
}
