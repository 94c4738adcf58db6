use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// Start or end of one job execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mark {
    Start,
    End,
}

#[derive(Debug, Clone)]
pub struct Entry {
    pub job: String,
    pub resource: String,
    pub mark: Mark,
    pub at: Instant,
}

#[derive(Debug, Default)]
struct Gauge {
    current: usize,
    max: usize,
}

impl Gauge {
    fn up(&mut self) {
        self.current += 1;
        self.max = self.max.max(self.current);
    }

    fn down(&mut self) {
        self.current = self.current.saturating_sub(1);
    }
}

#[derive(Debug, Default)]
struct Inner {
    entries: Vec<Entry>,
    per_resource: HashMap<String, Gauge>,
    total: Gauge,
}

/// Shared, ordered record of job starts and ends.
///
/// Also keeps a concurrency gauge per resource (and overall), so tests can
/// check that a pool never ran more jobs at once than its multiplexity.
#[derive(Debug, Clone, Default)]
pub struct Timeline {
    inner: Arc<Mutex<Inner>>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&self, job: &str, resource: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.per_resource.entry(resource.to_string()).or_default().up();
        inner.total.up();
        inner.entries.push(Entry {
            job: job.to_string(),
            resource: resource.to_string(),
            mark: Mark::Start,
            at: Instant::now(),
        });
    }

    pub fn end(&self, job: &str, resource: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.per_resource.entry(resource.to_string()).or_default().down();
        inner.total.down();
        inner.entries.push(Entry {
            job: job.to_string(),
            resource: resource.to_string(),
            mark: Mark::End,
            at: Instant::now(),
        });
    }

    pub fn entries(&self) -> Vec<Entry> {
        self.inner.lock().unwrap().entries.clone()
    }

    /// Jobs in the order they started.
    pub fn started(&self) -> Vec<String> {
        self.jobs_with(Mark::Start)
    }

    /// Jobs in the order they ended.
    pub fn ended(&self) -> Vec<String> {
        self.jobs_with(Mark::End)
    }

    pub fn was_started(&self, job: &str) -> bool {
        self.start_count(job) > 0
    }

    pub fn start_count(&self, job: &str) -> usize {
        self.entries()
            .iter()
            .filter(|e| e.mark == Mark::Start && e.job == job)
            .count()
    }

    /// `first` ended before `second` started. False if either is missing.
    pub fn ended_before_start(&self, first: &str, second: &str) -> bool {
        let entries = self.entries();
        let end = entries
            .iter()
            .position(|e| e.mark == Mark::End && e.job == first);
        let start = entries
            .iter()
            .position(|e| e.mark == Mark::Start && e.job == second);
        matches!((end, start), (Some(end), Some(start)) if end < start)
    }

    /// Highest number of jobs of `resource` that were executing at once.
    pub fn max_concurrency(&self, resource: &str) -> usize {
        self.inner
            .lock()
            .unwrap()
            .per_resource
            .get(resource)
            .map(|g| g.max)
            .unwrap_or(0)
    }

    /// Highest number of jobs executing at once across every resource.
    pub fn max_total_concurrency(&self) -> usize {
        self.inner.lock().unwrap().total.max
    }

    fn jobs_with(&self, mark: Mark) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|e| e.mark == mark)
            .map(|e| e.job)
            .collect()
    }
}
