// src/exec/command.rs

//! A job that runs a shell command.

use std::collections::BTreeMap;
use std::process::Stdio;

use anyhow::{Context, Result, bail};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::config::JobConfig;
use crate::exec::job::{Job, JobContext, JobFuture};
use crate::types::DEFAULT_RESOURCE;

/// Runs `sh -c <cmd>` (`cmd /C` on Windows).
///
/// The job's stdout is inherited; stderr is logged at debug level. The
/// execution context's environment is passed to the child, together with
/// `PARAJOB_BATCH_ID`, `PARAJOB_FLOW_ID`, `PARAJOB_EXECUTION_ID` and
/// `PARAJOB_JOB_ID`. Run arguments become `PARAJOB_ARG_<KEY>`. A non-zero
/// exit status fails the job. If the run is interrupted the child is killed.
#[derive(Debug, Clone)]
pub struct CommandJob {
    id: String,
    cmd: String,
    blockers: Vec<String>,
    resource: String,
    label: String,
}

impl CommandJob {
    pub fn new(id: impl Into<String>, cmd: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            label: id.clone(),
            id,
            cmd: cmd.into(),
            blockers: Vec::new(),
            resource: DEFAULT_RESOURCE.to_string(),
        }
    }

    pub fn from_config(id: &str, cfg: &JobConfig) -> Self {
        let mut job = Self::new(id, cfg.cmd.clone())
            .with_blockers(cfg.blockers.iter().cloned())
            .with_resource(cfg.effective_resource());
        if let Some(label) = &cfg.label {
            job = job.with_label(label.clone());
        }
        job
    }

    pub fn with_blockers(mut self, blockers: impl IntoIterator<Item = String>) -> Self {
        self.blockers.extend(blockers);
        self
    }

    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = resource.into();
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn cmd(&self) -> &str {
        &self.cmd
    }

    async fn run(&self, ctx: &JobContext) -> Result<()> {
        info!(job = %self.id, cmd = %self.cmd, "starting command");

        let mut cmd = if cfg!(windows) {
            let mut c = Command::new("cmd");
            c.arg("/C").arg(&self.cmd);
            c
        } else {
            let mut c = Command::new("sh");
            c.arg("-c").arg(&self.cmd);
            c
        };

        let exec = ctx.execution();
        cmd.envs(exec.environment())
            .envs(argument_env(exec.arguments()))
            .env("PARAJOB_BATCH_ID", exec.batch_id())
            .env("PARAJOB_FLOW_ID", exec.flow_id())
            .env("PARAJOB_EXECUTION_ID", exec.execution_id())
            .env("PARAJOB_JOB_ID", &self.id)
            .stdout(Stdio::inherit())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .with_context(|| format!("spawning process for job '{}'", self.id))?;

        // Always consume stderr so buffers don't fill; log at debug.
        if let Some(stderr) = child.stderr.take() {
            let job = self.id.clone();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!(job = %job, "stderr: {}", line);
                }
            });
        }

        tokio::select! {
            status = child.wait() => {
                let status = status
                    .with_context(|| format!("waiting for process of job '{}'", self.id))?;
                let code = status.code().unwrap_or(-1);
                info!(job = %self.id, exit_code = code, success = status.success(), "command exited");
                if !status.success() {
                    bail!("command for job '{}' exited with status {}", self.id, code);
                }
                Ok(())
            }
            _ = ctx.interrupted() => {
                warn!(job = %self.id, "interrupted; killing command");
                if let Err(e) = child.kill().await {
                    warn!(job = %self.id, error = %e, "failed to kill child process");
                }
                bail!("command for job '{}' was interrupted", self.id)
            }
        }
    }
}

/// Run arguments as `PARAJOB_ARG_<KEY>` variables.
fn argument_env(arguments: &BTreeMap<String, String>) -> impl Iterator<Item = (String, &str)> {
    arguments.iter().map(|(key, value)| {
        let key: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
            .collect();
        (format!("PARAJOB_ARG_{key}"), value.as_str())
    })
}

impl Job for CommandJob {
    fn id(&self) -> &str {
        &self.id
    }

    fn blocker_ids(&self) -> &[String] {
        &self.blockers
    }

    fn resource_id(&self) -> &str {
        &self.resource
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn execute<'a>(&'a self, ctx: &'a JobContext) -> JobFuture<'a> {
        Box::pin(self.run(ctx))
    }
}
