use crate::{
    core::{RequestObject, Source},
    FocusComponents,
};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    sync::Arc,
};
use tracing::{debug, info, trace, warn};
use walkdir::WalkDir;

const UNKNOWN_NAME: &str = "unknown";
const DOCUMENT_SEPARATOR: &str = "\n---\n";

/// Reads rendered YAML manifests from a local directory.
///
/// Every document is classified by its `metadata.name`. Documents that are
/// not focus components are skipped; the rest are bundled into one request
/// per category. When no focus components are configured, each file is
/// submitted as its own request, named by its path relative to the root.
#[derive(Clone, Debug)]
pub struct ManifestDir {
    root: PathBuf,
    focus: Arc<FocusComponents>,
}

// === impl ManifestDir ===

impl ManifestDir {
    pub fn new(root: impl Into<PathBuf>, focus: Arc<FocusComponents>) -> Self {
        Self {
            root: root.into(),
            focus,
        }
    }

    /// Groups the documents under the root by the name they are submitted
    /// as. Documents keep the order in which they were read.
    fn bundles(&self) -> Result<BTreeMap<String, Vec<String>>> {
        let mut bundles = BTreeMap::<String, Vec<String>>::new();
        for entry in WalkDir::new(&self.root)
            .follow_links(true)
            .sort_by_file_name()
        {
            let entry = entry.with_context(|| format!("failed to walk {}", self.root.display()))?;
            let path = entry.path();
            if !entry.file_type().is_file() || !is_yaml(path) {
                continue;
            }

            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            for document in serde_yaml::Deserializer::from_str(&text) {
                let value = serde_yaml::Value::deserialize(document)
                    .with_context(|| format!("failed to parse {}", path.display()))?;
                if value.is_null() {
                    continue;
                }

                let name = value
                    .get("metadata")
                    .and_then(|m| m.get("name"))
                    .and_then(serde_yaml::Value::as_str)
                    .unwrap_or(UNKNOWN_NAME);
                let bundle = if self.focus.is_empty() {
                    relative_name(&self.root, path)
                } else if let Some(category) = self.focus.classify(name) {
                    category.to_string()
                } else {
                    trace!(%name, path = %path.display(), "Skipping resource outside of focus");
                    continue;
                };

                let manifest = serde_yaml::to_string(&value)
                    .with_context(|| format!("failed to encode {name} from {}", path.display()))?;
                debug!(%name, %bundle, "Collected resource");
                bundles
                    .entry(bundle)
                    .or_default()
                    .push(manifest.trim_end().to_string());
            }
        }
        Ok(bundles)
    }
}

#[async_trait::async_trait]
impl Source for ManifestDir {
    async fn prepare_content(&self) -> Result<Vec<RequestObject>> {
        let bundles = self.bundles()?;
        let requests = requests_from_manifests(
            bundles
                .into_iter()
                .map(|(name, documents)| (name, documents.join(DOCUMENT_SEPARATOR))),
        );
        info!(root = %self.root.display(), requests = requests.len(), "Prepared manifests");
        Ok(requests)
    }
}

/// Encodes named manifests for submission.
///
/// Manifests that are too large to submit are logged and left out; they are
/// not validated.
pub fn requests_from_manifests<I, N, M>(manifests: I) -> Vec<RequestObject>
where
    I: IntoIterator<Item = (N, M)>,
    N: Into<String>,
    M: AsRef<[u8]>,
{
    manifests
        .into_iter()
        .filter_map(
            |(name, manifest)| match RequestObject::from_manifest(name, manifest) {
                Ok(req) => Some(req),
                Err(error) => {
                    warn!(resource = %error.resource, %error, "Skipping manifest");
                    None
                }
            },
        )
        .collect()
}

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("yaml" | "yml")
    )
}

fn relative_name(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .display()
        .to_string()
}
