// src/errors.rs

//! Crate-wide error types.
//!
//! - [`ConfigError`]: resource configuration problems, raised at construction.
//! - [`GraphError`]: malformed job sets, raised before any job is dispatched.
//! - [`ScheduleError`]: the outcome of a run that did not complete every job.
//!   Every run-level variant carries the [`RunReport`] so callers can still
//!   inspect which jobs never reached `Done`.

use thiserror::Error;

use crate::engine::RunReport;
use crate::types::JobId;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing mandatory resource configuration `parallel.default`")]
    MissingDefault,

    #[error("invalid multiplexity for resource '{resource}': {value:?} (expected a positive integer)")]
    InvalidMultiplexity { resource: String, value: String },

    #[error("invalid configuration value: {0}")]
    InvalidValue(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("job '{job}' is blocked by unknown job '{blocker}'")]
    DanglingBlocker { job: JobId, blocker: JobId },

    #[error("job id '{0}' was submitted more than once")]
    DuplicateJob(JobId),

    #[error("job ids must not be empty")]
    EmptyJobId,
}

#[derive(Error, Debug)]
pub enum ScheduleError {
    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(
        "{} job(s) failed and {} job(s) never ran",
        .report.failed().len(),
        .report.incomplete().len()
    )]
    JobsFailed { report: Box<RunReport> },

    #[error("run interrupted; {} job(s) did not complete", .report.not_done().len())]
    Interrupted { report: Box<RunReport> },

    #[error("dependency cycle detected involving job(s): {}", .cycle.join(", "))]
    DependencyCycle {
        cycle: Vec<JobId>,
        report: Box<RunReport>,
    },
}

impl ScheduleError {
    /// Report of the run, if the error happened after the run started.
    pub fn report(&self) -> Option<&RunReport> {
        match self {
            ScheduleError::Graph(_) => None,
            ScheduleError::JobsFailed { report }
            | ScheduleError::Interrupted { report }
            | ScheduleError::DependencyCycle { report, .. } => Some(report),
        }
    }

    /// Ids of jobs that never ran. Empty for graph errors, where nothing ran
    /// and no report exists.
    pub fn incomplete(&self) -> Vec<JobId> {
        self.report().map(|r| r.incomplete()).unwrap_or_default()
    }
}

/// Top-level error used by the binary.
#[derive(Error, Debug)]
pub enum ParajobError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Scheduling error: {0}")]
    Schedule(#[from] ScheduleError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, ParajobError>;
