use crate::{Allowlist, FocusComponents};
use anyhow::Result;
use std::{path::PathBuf, sync::Arc};
use tracing::info;

/// The locations validation settings are loaded from.
#[derive(Clone, Debug, Default)]
pub struct ConfigPaths {
    /// A directory tree of allowlist files (`*.json`, `*.yaml`, `*.yml`),
    /// each holding a list of accepted violations.
    pub allowlist_dir: Option<PathBuf>,

    /// A JSON file mapping focus component categories to resource name
    /// patterns.
    pub focus_components: Option<PathBuf>,
}

/// Settings shared by the pipeline, loaded once at startup and read-only
/// afterwards.
#[derive(Clone, Debug, Default)]
pub struct Config {
    pub allowlist: Arc<Allowlist>,
    pub focus: Arc<FocusComponents>,
}

// === impl Config ===

impl Config {
    /// Loads the configuration.
    ///
    /// An allowlist that cannot be read is logged and treated as empty, so
    /// every violation is reported. A focus component file that cannot be
    /// read is an error.
    pub fn load(paths: &ConfigPaths) -> Result<Self> {
        let allowlist = match &paths.allowlist_dir {
            Some(dir) => Allowlist::load(dir),
            None => {
                info!("No allowlist configured; all violations will be reported");
                Allowlist::default()
            }
        };

        let focus = match &paths.focus_components {
            Some(path) => FocusComponents::load(path)?,
            None => {
                info!("No focus components configured; all resources will be validated");
                FocusComponents::default()
            }
        };

        Ok(Self {
            allowlist: Arc::new(allowlist),
            focus: Arc::new(focus),
        })
    }
}
