// src/config/validate.rs

use std::collections::BTreeMap;

use tracing::debug;

use crate::config::model::{ConfigFile, RawConfigFile, SchedulerConfig, PARALLEL_PREFIX};
use crate::errors::ConfigError;
use crate::types::DEFAULT_RESOURCE;

impl SchedulerConfig {
    /// Build a resource configuration from `key = value` properties.
    ///
    /// Only `parallel.<resource>` keys are interpreted; anything else is
    /// ignored. Fails if `parallel.default` is absent or if any multiplexity
    /// is not a positive integer.
    pub fn from_properties<I, K, V>(props: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut resources = BTreeMap::new();

        for (key, value) in props {
            let key = key.as_ref();
            let Some(resource) = key.strip_prefix(PARALLEL_PREFIX) else {
                debug!(key, "ignoring non-scheduler property");
                continue;
            };
            if resource.is_empty() {
                return Err(ConfigError::InvalidValue(format!(
                    "property '{key}' does not name a resource"
                )));
            }
            let multiplexity = parse_multiplexity(resource, value.as_ref())?;
            resources.insert(resource.to_string(), multiplexity);
        }

        if !resources.contains_key(DEFAULT_RESOURCE) {
            return Err(ConfigError::MissingDefault);
        }

        Ok(SchedulerConfig::new_unchecked(resources))
    }
}

/// Parse a multiplexity value, rejecting anything that is not an integer >= 1.
pub fn parse_multiplexity(resource: &str, value: &str) -> Result<usize, ConfigError> {
    match value.trim().parse::<usize>() {
        Ok(n) if n >= 1 => Ok(n),
        _ => Err(ConfigError::InvalidMultiplexity {
            resource: resource.to_string(),
            value: value.to_string(),
        }),
    }
}

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = ConfigError;

    fn try_from(raw: RawConfigFile) -> Result<Self, Self::Error> {
        let mut props = Vec::with_capacity(raw.parallel.len());
        for (resource, value) in raw.parallel.iter() {
            props.push((format!("{PARALLEL_PREFIX}{resource}"), scalar_to_string(resource, value)?));
        }
        let scheduler = SchedulerConfig::from_properties(props)?;

        for (id, job) in raw.job.iter() {
            if job.cmd.trim().is_empty() {
                return Err(ConfigError::InvalidValue(format!(
                    "job '{id}' has an empty `cmd`"
                )));
            }
        }

        Ok(ConfigFile {
            scheduler,
            failure_policy: raw.failure_policy,
            job: raw.job,
        })
    }
}

fn scalar_to_string(resource: &str, value: &toml::Value) -> Result<String, ConfigError> {
    match value {
        toml::Value::Integer(i) => Ok(i.to_string()),
        toml::Value::String(s) => Ok(s.clone()),
        other => Err(ConfigError::InvalidMultiplexity {
            resource: resource.to_string(),
            value: other.to_string(),
        }),
    }
}
