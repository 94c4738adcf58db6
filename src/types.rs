use std::str::FromStr;
use serde::Deserialize;

/// Canonical job identifier type used throughout the scheduler.
pub type JobId = String;

/// Name of the resource pool every job falls back to.
pub const DEFAULT_RESOURCE: &str = "default";

/// How the scheduler reacts once a job has failed.
///
/// - `Strict`: fail fast. No *new* job is dispatched after the first failure;
///   jobs that were already dispatched are allowed to finish.
/// - `BestEffort`: keep dispatching every job whose blockers can still be
///   satisfied; only jobs transitively blocked by a failure are abandoned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    Strict,
    BestEffort,
}

impl Default for FailurePolicy {
    fn default() -> Self {
        FailurePolicy::Strict
    }
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "strict" => Ok(FailurePolicy::Strict),
            "best_effort" => Ok(FailurePolicy::BestEffort),
            other => Err(format!(
                "invalid failure policy: {other} (expected \"strict\" or \"best_effort\")"
            )),
        }
    }
}

impl std::fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailurePolicy::Strict => write!(f, "strict"),
            FailurePolicy::BestEffort => write!(f, "best_effort"),
        }
    }
}
