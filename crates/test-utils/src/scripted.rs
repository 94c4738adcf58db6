use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::{anyhow, bail};
use parajob::{DEFAULT_RESOURCE, Job, JobContext, JobFuture};

use crate::timeline::Timeline;

/// What a [`ScriptedJob`] does once it holds its slot.
#[derive(Debug, Clone)]
pub enum Script {
    Succeed,
    Fail(String),
    Panic(String),
    /// Block until the run is interrupted, then fail.
    WaitForInterrupt,
    /// Ignore interrupts entirely and sleep this long.
    Stubborn(Duration),
}

/// A job whose behaviour is fixed up front, for scheduler tests.
///
/// Every execution is recorded in the shared [`Timeline`]; the end mark is
/// written even when the job fails, panics or is aborted.
#[derive(Debug)]
pub struct ScriptedJob {
    id: String,
    blockers: Vec<String>,
    resource: String,
    label: Option<String>,
    sleep: Duration,
    script: Script,
    timeline: Timeline,
    executions: AtomicUsize,
}

impl ScriptedJob {
    pub fn new(id: &str, timeline: &Timeline) -> Self {
        Self {
            id: id.to_string(),
            blockers: Vec::new(),
            resource: DEFAULT_RESOURCE.to_string(),
            label: None,
            sleep: Duration::ZERO,
            script: Script::Succeed,
            timeline: timeline.clone(),
            executions: AtomicUsize::new(0),
        }
    }

    pub fn after(mut self, blockers: &[&str]) -> Self {
        self.blockers.extend(blockers.iter().map(|b| b.to_string()));
        self
    }

    pub fn resource(mut self, resource: &str) -> Self {
        self.resource = resource.to_string();
        self
    }

    pub fn label(mut self, label: &str) -> Self {
        self.label = Some(label.to_string());
        self
    }

    /// Sleep this long before acting out the script.
    pub fn sleep_ms(mut self, ms: u64) -> Self {
        self.sleep = Duration::from_millis(ms);
        self
    }

    pub fn fails(mut self, message: &str) -> Self {
        self.script = Script::Fail(message.to_string());
        self
    }

    pub fn panics(mut self, message: &str) -> Self {
        self.script = Script::Panic(message.to_string());
        self
    }

    pub fn waits_for_interrupt(mut self) -> Self {
        self.script = Script::WaitForInterrupt;
        self
    }

    pub fn stubborn_ms(mut self, ms: u64) -> Self {
        self.script = Script::Stubborn(Duration::from_millis(ms));
        self
    }

    pub fn build(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// How many times `execute` was entered.
    pub fn executions(&self) -> usize {
        self.executions.load(Ordering::SeqCst)
    }

    async fn act(&self, ctx: &JobContext) -> anyhow::Result<()> {
        self.executions.fetch_add(1, Ordering::SeqCst);
        self.timeline.start(&self.id, &self.resource);
        let _end = EndMark {
            timeline: &self.timeline,
            job: &self.id,
            resource: &self.resource,
        };

        if !self.sleep.is_zero() {
            tokio::select! {
                _ = tokio::time::sleep(self.sleep) => {}
                _ = ctx.interrupted(), if !matches!(self.script, Script::Stubborn(_)) => {
                    bail!("job '{}' interrupted while sleeping", self.id);
                }
            }
        }

        match &self.script {
            Script::Succeed => Ok(()),
            Script::Fail(message) => Err(anyhow!("{message}")),
            Script::Panic(message) => panic!("{message}"),
            Script::WaitForInterrupt => {
                ctx.interrupted().await;
                bail!("job '{}' interrupted", self.id)
            }
            Script::Stubborn(duration) => {
                tokio::time::sleep(*duration).await;
                Ok(())
            }
        }
    }
}

impl Job for ScriptedJob {
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
        self.label.as_deref().unwrap_or(&self.id)
    }

    fn execute<'a>(&'a self, ctx: &'a JobContext) -> JobFuture<'a> {
        Box::pin(self.act(ctx))
    }
}

struct EndMark<'a> {
    timeline: &'a Timeline,
    job: &'a str,
    resource: &'a str,
}

impl Drop for EndMark<'_> {
    fn drop(&mut self) {
        self.timeline.end(self.job, self.resource);
    }
}
