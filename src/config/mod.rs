// src/config/mod.rs

//! Scheduler configuration.
//!
//! - [`model`] holds the raw TOML model and the validated [`SchedulerConfig`].
//! - [`validate`] implements the `parallel.<resource> = <N>` rules.
//! - [`loader`] reads configuration from files, strings or property maps.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path, load_from_str};
pub use model::{ConfigFile, JobConfig, RawConfigFile, SchedulerConfig, PARALLEL_PREFIX};
