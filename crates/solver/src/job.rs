use std::collections::HashMap;
use std::sync::mpsc::{self, SyncSender};
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, SystemTime};

use crate::manager::{Shared, TaggedStatus};
use crate::status::SolveStatus;
use crate::task::{Task, TaskStatus};

struct JobInner {
    name: String,
    shared: Arc<Shared>,
    tasks: RwLock<HashMap<String, Task>>,
}

/// A named solver job. Jobs hand out status sinks and own the tasks their
/// statuses create.
#[derive(Clone)]
pub struct Job {
    inner: Arc<JobInner>,
}

fn lock<'a, T>(m: &'a Mutex<T>) -> std::sync::MutexGuard<'a, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

impl Job {
    pub(crate) fn new(shared: Arc<Shared>, name: String) -> Self {
        Self {
            inner: Arc::new(JobInner {
                name,
                shared,
                tasks: RwLock::new(HashMap::new()),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// A fresh unbuffered status sink. A forwarder tags each status with
    /// this job and relays it to the manager's consumer; dropping the
    /// sender ends the forwarder.
    pub fn new_channel(&self) -> SyncSender<SolveStatus> {
        let (tx, rx) = mpsc::sync_channel::<SolveStatus>(0);
        // capture the consumer sender now, before a release can drop it
        let proto = lock(&self.inner.shared.status_tx).clone();
        let job = self.clone();
        self.inner.shared.go(move || {
            let Some(proto) = proto else {
                return Ok(());
            };
            for status in rx.iter() {
                if proto
                    .send(TaggedStatus {
                        status,
                        job: job.clone(),
                    })
                    .is_err()
                {
                    break;
                }
            }
            Ok(())
        });
        tx
    }

    /// Get or create the task for a vertex digest. New tasks register in
    /// the manager's map and are published on the task stream.
    pub fn new_task(&self, id: &str) -> Task {
        let task = {
            let mut managed = lock(&self.inner.shared.tasks);
            match managed.get(id) {
                Some(t) => t.clone(),
                None => {
                    let t = Task::new(id);
                    managed.insert(id.to_string(), t.clone());
                    let shared = self.inner.shared.clone();
                    let published = t.clone();
                    self.inner.shared.go(move || {
                        let tx = shared.task_tx.clone();
                        shared.stream_send(&tx, published)
                    });
                    t
                }
            }
        };
        let mut mine = self.inner.tasks.write().unwrap_or_else(|e| e.into_inner());
        mine.insert(id.to_string(), task.clone());
        task
    }

    pub fn depends(&self, id: &str) -> bool {
        let mine = self.inner.tasks.read().unwrap_or_else(|e| e.into_inner());
        mine.contains_key(id)
    }

    /// The least-advanced status over this job's tasks.
    pub fn status(&self) -> TaskStatus {
        let mine = self.inner.tasks.read().unwrap_or_else(|e| e.into_inner());
        if mine.is_empty() {
            return TaskStatus::Created;
        }
        mine.values()
            .map(|t| t.status())
            .min()
            .unwrap_or(TaskStatus::Unknown)
    }

    /// Wall time spanned by this job's tasks.
    pub fn elapsed(&self) -> Duration {
        let mine = self.inner.tasks.read().unwrap_or_else(|e| e.into_inner());
        if mine.is_empty() {
            return Duration::ZERO;
        }
        let now = SystemTime::now();
        let mut earliest = now;
        let mut latest = SystemTime::UNIX_EPOCH;
        for task in mine.values() {
            if let Some(start) = task.start_time() {
                if start < earliest {
                    earliest = start;
                }
            }
            match task.end_time() {
                None => latest = now,
                Some(end) if end > latest => latest = end,
                _ => {}
            }
        }
        latest.duration_since(earliest).unwrap_or(Duration::ZERO)
    }
}
