use serde::{Deserialize, Serialize};

/// One policy finding reported by the validation service.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Violation {
    #[serde(default)]
    pub policy_name: String,

    #[serde(default)]
    pub message: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_key: Option<ResourceRef>,

    /// Any other fields the service attached to the finding.
    #[serde(flatten)]
    pub details: serde_json::Map<String, serde_json::Value>,
}

/// Identifies the manifest resource a violation was found in.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceRef {
    #[serde(default)]
    pub group: String,

    #[serde(default)]
    pub kind: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub version: String,
}

/// The identity used to deduplicate violations and to match them against
/// the allowlist.
///
/// Keys are derived from a [`Violation`] and never constructed on their own.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceKey {
    pub policy: String,
    pub group: String,
    pub kind: String,
    pub name: String,
    pub version: String,
}

// === impl Violation ===

impl Violation {
    /// Returns the key for this violation, if it identifies a resource.
    pub fn resource_key(&self) -> Option<ResourceKey> {
        let ResourceRef {
            group,
            kind,
            name,
            version,
        } = self.resource_key.as_ref()?;
        Some(ResourceKey {
            policy: self.policy_name.clone(),
            group: group.clone(),
            kind: kind.clone(),
            name: name.clone(),
            version: version.clone(),
        })
    }

    /// Replaces the resource name with the caller's logical name.
    ///
    /// The service only sees the submitted manifest, so it cannot know how the
    /// caller named it.
    pub fn stamp_resource(&mut self, name: &str) {
        if let Some(resource) = self.resource_key.as_mut() {
            resource.name = name.to_string();
        }
    }
}

// === impl ResourceKey ===

impl std::fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "policyName: {}, group: {}, kind: {}, name: {}, version: {}",
            self.policy, self.group, self.kind, self.name, self.version
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn deployment(policy: &str, name: &str) -> Violation {
        Violation {
            policy_name: policy.to_string(),
            message: "runs as root".to_string(),
            resource_key: Some(ResourceRef {
                group: "apps".to_string(),
                kind: "Deployment".to_string(),
                name: name.to_string(),
                version: "v1".to_string(),
            }),
            ..Default::default()
        }
    }

    #[test]
    fn key_includes_policy() {
        let a = deployment("no-root", "web").resource_key().unwrap();
        let b = deployment("no-privileged", "web").resource_key().unwrap();
        assert_ne!(a, b);
        assert_eq!(a, deployment("no-root", "web").resource_key().unwrap());
        assert_eq!(
            a.to_string(),
            "policyName: no-root, group: apps, kind: Deployment, name: web, version: v1"
        );
    }

    #[test]
    fn no_key_without_resource() {
        let v = Violation {
            policy_name: "no-root".to_string(),
            ..Default::default()
        };
        assert_eq!(v.resource_key(), None);
    }

    #[test]
    fn stamp_resource() {
        let mut v = deployment("no-root", "web-7d9f");
        v.stamp_resource("web");
        assert_eq!(v.resource_key().unwrap().name, "web");

        let mut v = Violation::default();
        v.stamp_resource("web");
        assert_eq!(v.resource_key, None);
    }

    #[test]
    fn keeps_unknown_fields() {
        let v: Violation = serde_json::from_value(json!({
            "policyName": "no-root",
            "message": "runs as root",
            "severity": "HIGH",
        }))
        .unwrap();
        assert_eq!(v.details.get("severity"), Some(&json!("HIGH")));
        assert_eq!(
            serde_json::to_value(&v).unwrap(),
            json!({
                "policyName": "no-root",
                "message": "runs as root",
                "severity": "HIGH",
            })
        );
    }
}
