use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

use anyhow::{bail, Result};

/// Task lifecycle. The numeric order matters: a job's status is the
/// minimum over its tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TaskStatus {
    Created,
    Running,
    Cached,
    Errored,
    Canceled,
    Completed,
    Unknown,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Created => "created",
            TaskStatus::Running => "running",
            TaskStatus::Cached => "cached",
            TaskStatus::Errored => "errored",
            TaskStatus::Canceled => "canceled",
            TaskStatus::Completed => "completed",
            TaskStatus::Unknown => "unknown",
        }
    }
}

#[derive(Debug)]
struct TaskInner {
    id: String,
    description: String,
    status: TaskStatus,
    start_time: Option<SystemTime>,
    end_time: Option<SystemTime>,
    logs: Vec<u8>,
    current: u64,
    total: u64,
}

/// One unit of solver work, keyed by vertex digest. Written only by the
/// status consumer; read by UI consumers.
#[derive(Debug, Clone)]
pub struct Task {
    inner: Arc<Mutex<TaskInner>>,
}

impl Task {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(TaskInner {
                id: id.into(),
                description: String::new(),
                status: TaskStatus::Created,
                start_time: None,
                end_time: None,
                logs: Vec::new(),
                current: 0,
                total: 0,
            })),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, TaskInner> {
        // a poisoned task mutex means a panicking consumer; propagate state
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn id(&self) -> String {
        self.lock().id.clone()
    }

    pub fn status(&self) -> TaskStatus {
        self.lock().status
    }

    pub fn description(&self) -> String {
        self.lock().description.clone()
    }

    pub fn set_description(&self, description: impl Into<String>) {
        self.lock().description = description.into();
    }

    pub fn has_logs(&self) -> bool {
        !self.lock().logs.is_empty()
    }

    pub fn write(&self, data: &[u8]) {
        self.lock().logs.extend_from_slice(data);
    }

    pub fn logs(&self) -> Vec<u8> {
        self.lock().logs.clone()
    }

    pub fn progress(&self) -> (u64, u64) {
        let inner = self.lock();
        (inner.current, inner.total)
    }

    pub fn set_progress(&self, current: u64, total: u64) {
        let mut inner = self.lock();
        inner.current = current;
        inner.total = total;
    }

    pub fn start(&self, start_time: SystemTime) -> Result<()> {
        let mut inner = self.lock();
        if inner.status != TaskStatus::Created {
            bail!("task already at status: {}", inner.status.as_str());
        }
        inner.status = TaskStatus::Running;
        inner.start_time = Some(start_time);
        Ok(())
    }

    pub fn complete(&self, end_time: SystemTime, outcome: TaskOutcome) {
        let mut inner = self.lock();
        inner.end_time = Some(end_time);
        inner.status = match outcome {
            TaskOutcome::Success => TaskStatus::Completed,
            TaskOutcome::Cached => TaskStatus::Cached,
            TaskOutcome::Canceled => TaskStatus::Canceled,
            TaskOutcome::Error => TaskStatus::Errored,
        };
    }

    pub fn elapsed(&self) -> Duration {
        let inner = self.lock();
        let Some(start) = inner.start_time else {
            return Duration::ZERO;
        };
        let end = inner.end_time.unwrap_or_else(SystemTime::now);
        end.duration_since(start).unwrap_or(Duration::ZERO)
    }

    pub fn start_time(&self) -> Option<SystemTime> {
        self.lock().start_time
    }

    pub fn end_time(&self) -> Option<SystemTime> {
        self.lock().end_time
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    Success,
    Cached,
    Canceled,
    Error,
}
