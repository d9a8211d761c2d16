#![allow(dead_code)]

use std::collections::HashMap;
use std::time::Duration;

use cl_limit::Backend;
use cl_limit::BackendFuture;
use cl_limit::RequestId;
use parking_lot::Mutex;
use thiserror::Error;
use tokio::time::Instant;

/// Request used by the test backends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Job {
    pub key: &'static str,
    pub label: u32,
    pub fail: bool,
}

impl Job {
    pub fn new(key: &'static str, label: u32) -> Self {
        Self { key, label, fail: false }
    }

    pub fn failing(key: &'static str, label: u32) -> Self {
        Self { key, label, fail: true }
    }
}

pub fn by_job_key(job: &Job) -> &'static str {
    job.key
}

/// Backend-side record of one executed job
#[derive(Debug, Clone, Copy)]
pub struct Span {
    pub label: u32,
    pub started: Instant,
    pub finished: Instant,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("job {0} failed")]
pub struct JobFailed(pub u32);

/// Backend that sleeps for a fixed time and records what it saw
pub struct Recorder {
    delay: Duration,
    live: Mutex<HashMap<&'static str, usize>>,
    peak: Mutex<HashMap<&'static str, usize>>,
    spans: Mutex<Vec<Span>>,
    canceled: Mutex<Vec<RequestId>>,
}

impl Recorder {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            live: Mutex::new(HashMap::new()),
            peak: Mutex::new(HashMap::new()),
            spans: Mutex::new(Vec::new()),
            canceled: Mutex::new(Vec::new()),
        }
    }

    /// Highest number of simultaneous executions seen for `key`
    pub fn peak(&self, key: &str) -> usize {
        self.peak.lock().get(key).copied().unwrap_or(0)
    }

    /// Executions finished so far, ordered by start time
    pub fn spans(&self) -> Vec<Span> {
        let mut spans = self.spans.lock().clone();
        spans.sort_by_key(|span| span.started);
        spans
    }

    pub fn labels(&self) -> Vec<u32> {
        self.spans().iter().map(|span| span.label).collect()
    }

    /// Ids passed to `Backend::cancel`
    pub fn canceled(&self) -> Vec<RequestId> {
        self.canceled.lock().clone()
    }
}

impl Backend<Job> for Recorder {
    type Response = Span;
    type Error = JobFailed;

    fn execute(&self, _id: RequestId, job: Job) -> BackendFuture<'_, Span, JobFailed> {
        Box::pin(async move {
            let started = Instant::now();
            {
                let mut live = self.live.lock();
                let now = live.entry(job.key).or_default();
                *now += 1;
                let mut peak = self.peak.lock();
                let max = peak.entry(job.key).or_default();
                *max = (*max).max(*now);
            }

            tokio::time::sleep(self.delay).await;

            *self.live.lock().entry(job.key).or_default() -= 1;
            let span = Span { label: job.label, started, finished: Instant::now() };
            self.spans.lock().push(span);

            if job.fail { Err(JobFailed(job.label)) } else { Ok(span) }
        })
    }

    fn cancel(&self, id: RequestId) {
        self.canceled.lock().push(id);
    }
}

/// Let spawned tasks run up to `millis` of (possibly paused) time
pub async fn settle(millis: u64) {
    tokio::time::sleep(Duration::from_millis(millis)).await;
}
