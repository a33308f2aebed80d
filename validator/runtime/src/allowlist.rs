use crate::core::{ResourceKey, Violation};
use anyhow::{Context, Result};
use std::{collections::BTreeMap, path::Path};
use tracing::{debug, error, info, trace};
use walkdir::WalkDir;

/// Violations that were previously reviewed and accepted, keyed by the
/// resource they were found in.
#[derive(Clone, Debug, Default)]
pub struct Allowlist {
    entries: BTreeMap<ResourceKey, Vec<Violation>>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Format {
    Json,
    Yaml,
}

// === impl Allowlist ===

impl Allowlist {
    /// Loads every allowlist file under `root`.
    ///
    /// If anything under `root` cannot be read, the failure is logged and an
    /// empty allowlist is returned so that every violation is reported.
    pub fn load(root: &Path) -> Self {
        match Self::try_load(root) {
            Ok(allowlist) => {
                info!(path = %root.display(), entries = allowlist.len(), "Loaded allowlist");
                allowlist
            }
            Err(error) => {
                error!(
                    path = %root.display(),
                    error = format_args!("{error:#}"),
                    "Failed to load allowlist; all violations will be reported"
                );
                Self::default()
            }
        }
    }

    /// Reads every `*.json`, `*.yaml`, and `*.yml` file under `root`, each of
    /// which holds a list of violations. Other files are ignored.
    pub fn try_load(root: &Path) -> Result<Self> {
        let mut violations = Vec::new();
        for entry in WalkDir::new(root).follow_links(true).sort_by_file_name() {
            let entry = entry.with_context(|| format!("failed to walk {}", root.display()))?;
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            let Some(format) = Format::from_path(path) else {
                trace!(path = %path.display(), "Skipping");
                continue;
            };

            let data = std::fs::read(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let mut file = format
                .decode(&data)
                .with_context(|| format!("failed to decode {}", path.display()))?;
            debug!(path = %path.display(), violations = file.len(), "Read allowlist file");
            violations.append(&mut file);
        }

        Ok(violations.into_iter().collect())
    }

    /// Returns true if the violation's resource has an accepted violation.
    ///
    /// Violations without a resource identity are never allowed.
    pub fn contains(&self, violation: &Violation) -> bool {
        violation
            .resource_key()
            .is_some_and(|key| self.entries.contains_key(&key))
    }

    pub fn get(&self, key: &ResourceKey) -> &[Violation] {
        self.entries.get(key).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The number of distinct resource keys in the allowlist.
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

impl FromIterator<Violation> for Allowlist {
    fn from_iter<T: IntoIterator<Item = Violation>>(iter: T) -> Self {
        let mut entries = BTreeMap::<ResourceKey, Vec<Violation>>::new();
        for violation in iter {
            match violation.resource_key() {
                Some(key) => entries.entry(key).or_default().push(violation),
                None => debug!(?violation, "Ignoring allowlist entry without a resource"),
            }
        }
        Self { entries }
    }
}

// === impl Format ===

impl Format {
    fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "json" => Some(Self::Json),
            "yaml" | "yml" => Some(Self::Yaml),
            _ => None,
        }
    }

    fn decode(self, data: &[u8]) -> Result<Vec<Violation>> {
        match self {
            Self::Json => Ok(serde_json::from_slice(data)?),
            Self::Yaml => Ok(serde_yaml::from_slice(data)?),
        }
    }
}
