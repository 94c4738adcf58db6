// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::types::{FailurePolicy, DEFAULT_RESOURCE};

/// Key prefix of resource multiplexity entries (`parallel.<resource>`).
pub const PARALLEL_PREFIX: &str = "parallel.";

/// Configuration file as read from TOML, before validation.
///
/// TOML dotted keys line up with the property keys the scheduler understands:
///
/// ```toml
/// failure_policy = "best_effort"
///
/// parallel.default = 2
/// parallel.db = "1"
///
/// [job.extract]
/// cmd = "echo extract"
///
/// [job.load]
/// cmd = "echo load"
/// blockers = ["extract"]
/// resource = "db"
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    /// Resource multiplexities keyed by resource id. Values are kept as raw
    /// TOML so that integers and strings go through the same validation.
    #[serde(default)]
    pub parallel: BTreeMap<String, toml::Value>,

    /// Failure policy used when the caller does not override it.
    #[serde(default)]
    pub failure_policy: FailurePolicy,

    /// Shell-command jobs from `[job.<id>]`, used by the `parajob` binary.
    #[serde(default)]
    pub job: BTreeMap<String, JobConfig>,
}

/// `[job.<id>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct JobConfig {
    /// Shell command to run.
    pub cmd: String,

    /// Ids of jobs that must complete before this one starts.
    #[serde(default)]
    pub blockers: Vec<String>,

    /// Resource pool this job competes for; `default` when absent.
    #[serde(default)]
    pub resource: Option<String>,

    /// Human readable label for progress reporting.
    #[serde(default)]
    pub label: Option<String>,
}

impl JobConfig {
    pub fn effective_resource(&self) -> &str {
        self.resource.as_deref().unwrap_or(DEFAULT_RESOURCE)
    }
}

/// Validated resource configuration.
///
/// Always contains an entry for [`DEFAULT_RESOURCE`], and every multiplexity
/// is at least 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    resources: BTreeMap<String, usize>,
}

impl SchedulerConfig {
    /// Build without validation. Callers must uphold the invariants above;
    /// use [`SchedulerConfig::from_properties`] otherwise.
    pub(crate) fn new_unchecked(resources: BTreeMap<String, usize>) -> Self {
        Self { resources }
    }

    /// Configured multiplexity of `resource`, if explicitly configured.
    pub fn multiplexity(&self, resource: &str) -> Option<usize> {
        self.resources.get(resource).copied()
    }

    /// Multiplexity of the mandatory default pool.
    pub fn default_multiplexity(&self) -> usize {
        self.resources.get(DEFAULT_RESOURCE).copied().unwrap_or(1)
    }

    /// All configured resources and their multiplexities.
    pub fn resources(&self) -> impl Iterator<Item = (&str, usize)> {
        self.resources.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

/// Validated configuration file.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub scheduler: SchedulerConfig,
    pub failure_policy: FailurePolicy,
    pub job: BTreeMap<String, JobConfig>,
}
