use crate::{
    core::{ResourceKey, ResultObject, ResultSink, Violation},
    Allowlist,
};
use anyhow::{Context, Result};
use std::{collections::BTreeMap, sync::Arc};
use tracing::{debug, info, warn};

/// Normalizes a violation before it is deduplicated, e.g. to strip fields
/// that vary between runs.
pub type Purify = fn(Violation) -> Violation;

/// Deduplicates validation results, suppresses allowlisted violations, and
/// reports the rest.
#[derive(Clone, Debug)]
pub struct Report {
    allowlist: Arc<Allowlist>,
    purify: Purify,
}

/// The violations found for a single resource.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResourceReport {
    pub resource_name: String,

    /// Every distinct violation, including allowlisted ones.
    pub recorded: Vec<Violation>,

    /// Violations that are not allowlisted.
    pub reported: Vec<Violation>,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("found {count} new policy violation(s)")]
pub struct NewViolations {
    pub count: usize,
}

// === impl Report ===

impl Report {
    pub fn new(allowlist: Arc<Allowlist>) -> Self {
        Self {
            allowlist,
            purify: std::convert::identity,
        }
    }

    pub fn with_purify(self, purify: Purify) -> Self {
        Self { purify, ..self }
    }

    pub fn review(&self, result: ResultObject) -> ResourceReport {
        let ResultObject {
            resource_name,
            violations,
        } = result;
        let recorded = dedup(violations.into_iter().map(self.purify));
        let reported = filter(&self.allowlist, &recorded);
        debug!(
            resource = %resource_name,
            recorded = recorded.len(),
            reported = reported.len(),
            "Reviewed violations"
        );
        ResourceReport {
            resource_name,
            recorded,
            reported,
        }
    }

    pub fn review_all(&self, results: Vec<ResultObject>) -> Vec<ResourceReport> {
        results.into_iter().map(|r| self.review(r)).collect()
    }
}

#[async_trait::async_trait]
impl ResultSink for Report {
    async fn handle_result(&self, results: Vec<ResultObject>) -> Result<()> {
        let reports = self.review_all(results);

        let mut recorded = 0;
        let mut reported = 0;
        for report in &reports {
            recorded += report.recorded.len();
            reported += report.reported.len();

            let mut by_policy = BTreeMap::<&str, Vec<&Violation>>::new();
            for violation in &report.reported {
                by_policy
                    .entry(violation.policy_name.as_str())
                    .or_default()
                    .push(violation);
            }

            for (policy, violations) in by_policy {
                let record = format!("{}-{policy}.json", report.resource_name);
                let json = serde_json::to_string_pretty(&violations)
                    .with_context(|| format!("failed to encode {record}"))?;
                warn!(
                    resource = %report.resource_name,
                    %policy,
                    %record,
                    violations = violations.len(),
                    "New policy violations:\n{json}"
                );
            }
        }

        info!(
            resources = reports.len(),
            recorded,
            reported,
            suppressed = recorded - reported,
            "Reviewed validation results"
        );

        if reported > 0 {
            return Err(NewViolations { count: reported }.into());
        }
        Ok(())
    }
}

/// Collapses violations with the same resource key and message, keeping the
/// first of each.
///
/// Violations without a resource key are kept as they are, in order, ahead
/// of the keyed violations, which are ordered by key and message.
pub fn dedup(violations: impl IntoIterator<Item = Violation>) -> Vec<Violation> {
    let mut keyless = Vec::new();
    let mut keyed = BTreeMap::<(ResourceKey, String), Violation>::new();
    for violation in violations {
        match violation.resource_key() {
            Some(key) => {
                keyed
                    .entry((key, violation.message.clone()))
                    .or_insert(violation);
            }
            None => keyless.push(violation),
        }
    }
    keyless.extend(keyed.into_values());
    keyless
}

/// Returns the violations that are not allowlisted.
///
/// An empty allowlist suppresses nothing.
pub fn filter(allowlist: &Allowlist, violations: &[Violation]) -> Vec<Violation> {
    if allowlist.is_empty() {
        return violations.to_vec();
    }

    violations
        .iter()
        .filter(|v| !allowlist.contains(v))
        .cloned()
        .collect()
}
