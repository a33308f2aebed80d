use anyhow::{Context, Result};
use regex::Regex;
use std::{collections::BTreeMap, path::Path};
use tracing::{info, warn};

/// Maps resource names to the component categories that should be
/// validated.
///
/// Categories are matched in ascending name order, so the first matching
/// category wins. With no categories at all, every resource matches the
/// empty category.
#[derive(Clone, Debug, Default)]
pub struct FocusComponents {
    categories: Vec<(String, Regex)>,
}

// === impl FocusComponents ===

impl FocusComponents {
    /// Reads a JSON object mapping category names to name patterns.
    ///
    /// Patterns that do not compile are logged and skipped.
    pub fn load(path: &Path) -> Result<Self> {
        let data =
            std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
        let patterns = serde_json::from_slice::<BTreeMap<String, String>>(&data)
            .with_context(|| format!("failed to decode {}", path.display()))?;
        let focus = Self::from_patterns(patterns);
        info!(path = %path.display(), categories = focus.len(), "Loaded focus components");
        Ok(focus)
    }

    pub fn from_patterns<I, K, V>(patterns: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: AsRef<str>,
    {
        let mut categories = BTreeMap::new();
        for (category, pattern) in patterns {
            let category = category.into();
            match Regex::new(pattern.as_ref()) {
                Ok(re) => {
                    categories.insert(category, re);
                }
                Err(error) => {
                    warn!(%category, %error, "Skipping focus component with an invalid pattern")
                }
            }
        }
        Self {
            categories: categories.into_iter().collect(),
        }
    }

    /// Returns the category of the named resource, or `None` if it is not a
    /// focus component and should not be validated.
    pub fn classify(&self, name: &str) -> Option<&str> {
        if self.categories.is_empty() {
            return Some("");
        }

        self.categories
            .iter()
            .find(|(_, re)| re.is_match(name))
            .map(|(category, _)| category.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unscoped_matches_everything() {
        let focus = FocusComponents::default();
        assert_eq!(focus.classify("anything"), Some(""));
        assert_eq!(focus.classify(""), Some(""));
    }

    #[test]
    fn classify() {
        let focus = FocusComponents::from_patterns([
            ("hub", "^hub$"),
            ("ray-cluster-kuberay-head", "^ray-cluster-kuberay-head-[a-zA-Z0-9]+$"),
            ("ray-sa", "ray-sa-.*"),
        ]);
        assert_eq!(focus.classify("hub"), Some("hub"));
        assert_eq!(focus.classify("hub-db-dir"), None);
        assert_eq!(
            focus.classify("ray-cluster-kuberay-head-x7k2p"),
            Some("ray-cluster-kuberay-head")
        );
        assert_eq!(focus.classify("my-ray-sa-1"), Some("ray-sa"));
        assert_eq!(focus.classify("proxy-public"), None);
    }

    #[test]
    fn first_category_in_name_order_wins() {
        let focus = FocusComponents::from_patterns([("zeta", "^ray-"), ("alpha", "^ray-head")]);
        assert_eq!(focus.classify("ray-head-0"), Some("alpha"));
        assert_eq!(focus.classify("ray-worker-0"), Some("zeta"));
    }

    #[test]
    fn invalid_patterns_are_skipped() {
        let focus = FocusComponents::from_patterns([("broken", "(unclosed"), ("hub", "^hub$")]);
        assert_eq!(focus.len(), 1);
        assert_eq!(focus.classify("hub"), Some("hub"));
    }

    #[test]
    fn load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("focus.json");
        std::fs::write(&path, r#"{"hub": "^hub$", "rag-frontend": "^rag-frontend$"}"#).unwrap();

        let focus = FocusComponents::load(&path).unwrap();
        assert_eq!(focus.len(), 2);
        assert_eq!(focus.classify("rag-frontend"), Some("rag-frontend"));

        assert!(FocusComponents::load(&dir.path().join("missing.json")).is_err());

        std::fs::write(&path, "[]").unwrap();
        assert!(FocusComponents::load(&path).is_err());
    }
}
