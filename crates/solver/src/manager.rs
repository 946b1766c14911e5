//! The progress manager: coordinates solver jobs and tasks, folding the
//! daemon's status stream into vertex-keyed task state for UI consumers.
//!
//! One consumer thread owns the task and vertex maps; producers hand it
//! work over rendezvous channels, so the solver is throttled to the
//! consumer's rate.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::sync::{Arc, Mutex, RwLock};
use std::thread::{self, JoinHandle};
use std::time::{Duration, SystemTime};

use anyhow::Result;

use crate::job::Job;
use crate::status::{SolveStatus, VertexUpdate};
use crate::task::{Task, TaskOutcome};

/// Raised by submissions that observe a canceled run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("context canceled")]
pub struct Canceled;

/// Shared cancellation flag for the whole run. Cancellation and release
/// are idempotent.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_canceled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStatus {
    Unknown,
    Building,
    Finished,
    Failed,
    Canceled,
}

impl BuildStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            BuildStatus::Unknown => "Unknown",
            BuildStatus::Building => "Building",
            BuildStatus::Finished => "Finished",
            BuildStatus::Failed => "Failed",
            BuildStatus::Canceled => "Canceled",
        }
    }
}

/// A solve status tagged with the job whose channel delivered it.
pub struct TaggedStatus {
    pub status: SolveStatus,
    pub job: Job,
}

pub(crate) struct Shared {
    pub(crate) interrupt: AtomicBool,
    pub(crate) cancel: CancelToken,
    pub(crate) first_err: Mutex<Option<anyhow::Error>>,
    pub(crate) handles: Mutex<Vec<JoinHandle<()>>>,
    pub(crate) status_tx: Mutex<Option<SyncSender<TaggedStatus>>>,
    pub(crate) job_tx: SyncSender<Job>,
    pub(crate) task_tx: SyncSender<Task>,
    pub(crate) tasks: Mutex<HashMap<String, Task>>,
    pub(crate) vtx: RwLock<HashMap<String, VertexUpdate>>,
    pub(crate) build: Mutex<BuildStatus>,
    pub(crate) start_time: Mutex<Option<SystemTime>>,
    pub(crate) end_time: Mutex<Option<SystemTime>>,
}

fn lock<'a, T>(m: &'a Mutex<T>) -> std::sync::MutexGuard<'a, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

impl Shared {
    /// Submit a unit of work. The first error cancels the run; the rest
    /// observe the canceled token and return promptly.
    pub(crate) fn go(self: &Arc<Self>, f: impl FnOnce() -> Result<()> + Send + 'static) {
        let shared = self.clone();
        let handle = thread::spawn(move || {
            if let Err(e) = f() {
                shared.cancel.cancel();
                let mut first = lock(&shared.first_err);
                if first.is_none() {
                    *first = Some(e);
                }
            }
        });
        lock(&self.handles).push(handle);
    }

    /// Send onto an unbuffered stream, giving up when the run is
    /// interrupted or the receiver is gone. Emulates a select over
    /// {interrupt, send}.
    pub(crate) fn stream_send<T>(&self, tx: &SyncSender<T>, mut item: T) -> Result<()> {
        loop {
            if self.interrupt.load(Ordering::SeqCst) || self.cancel.is_canceled() {
                return Ok(());
            }
            match tx.try_send(item) {
                Ok(()) => return Ok(()),
                Err(TrySendError::Full(it)) => {
                    item = it;
                    thread::sleep(Duration::from_millis(5));
                }
                Err(TrySendError::Disconnected(_)) => return Ok(()),
            }
        }
    }
}

/// Coordinator for concurrent solver jobs. See the module docs for the
/// threading model.
pub struct Manager {
    shared: Arc<Shared>,
    consumer: Option<JoinHandle<Result<()>>>,
    job_rx: Option<Receiver<Job>>,
    task_rx: Option<Receiver<Task>>,
}

impl Default for Manager {
    fn default() -> Self {
        Self::new()
    }
}

impl Manager {
    pub fn new() -> Self {
        let (status_tx, status_rx) = mpsc::sync_channel::<TaggedStatus>(0);
        let (job_tx, job_rx) = mpsc::sync_channel::<Job>(0);
        let (task_tx, task_rx) = mpsc::sync_channel::<Task>(0);

        let shared = Arc::new(Shared {
            interrupt: AtomicBool::new(false),
            cancel: CancelToken::new(),
            first_err: Mutex::new(None),
            handles: Mutex::new(Vec::new()),
            status_tx: Mutex::new(Some(status_tx)),
            job_tx,
            task_tx,
            tasks: Mutex::new(HashMap::new()),
            vtx: RwLock::new(HashMap::new()),
            build: Mutex::new(BuildStatus::Building),
            start_time: Mutex::new(None),
            end_time: Mutex::new(None),
        });

        let consumer = {
            let shared = shared.clone();
            thread::spawn(move || handle_status(shared, status_rx))
        };

        Self {
            shared,
            consumer: Some(consumer),
            job_rx: Some(job_rx),
            task_rx: Some(task_rx),
        }
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.shared.cancel.clone()
    }

    pub fn go(&self, f: impl FnOnce() -> Result<()> + Send + 'static) {
        self.shared.go(f);
    }

    pub fn new_job(&self, name: impl Into<String>) -> Job {
        let job = Job::new(self.shared.clone(), name.into());
        let shared = self.shared.clone();
        let published = job.clone();
        self.shared.go(move || {
            let tx = shared.job_tx.clone();
            shared.stream_send(&tx, published)
        });
        job
    }

    /// Stream of registered jobs. Single consumer; callable once.
    pub fn jobs(&mut self) -> Option<Receiver<Job>> {
        self.job_rx.take()
    }

    /// Stream of newly seen tasks. Single consumer; callable once.
    pub fn tasks(&mut self) -> Option<Receiver<Task>> {
        self.task_rx.take()
    }

    pub fn status(&self) -> BuildStatus {
        *lock(&self.shared.build)
    }

    /// Look up a task by vertex digest.
    pub fn task(&self, id: &str) -> Option<Task> {
        lock(&self.shared.tasks).get(id).cloned()
    }

    /// Completed, non-errored vertices.
    pub fn current(&self) -> usize {
        let vtx = self.shared.vtx.read().unwrap_or_else(|e| e.into_inner());
        vtx.values()
            .filter(|v| v.completed.is_some() && v.error.is_empty())
            .count()
    }

    /// The larger of the task count and the vertex count, so the ratio
    /// stays monotonic during ramp-up.
    pub fn total(&self) -> usize {
        let tasks = lock(&self.shared.tasks).len();
        let vtx = self.shared.vtx.read().unwrap_or_else(|e| e.into_inner());
        tasks.max(vtx.len())
    }

    pub fn elapsed(&self) -> Duration {
        let start = *lock(&self.shared.start_time);
        let Some(start) = start else {
            return Duration::ZERO;
        };
        let end = lock(&self.shared.end_time).unwrap_or_else(SystemTime::now);
        end.duration_since(start).unwrap_or(Duration::ZERO)
    }

    /// Mark the producer side done. Idempotent.
    pub fn release(&self) {
        self.shared.interrupt.store(true, Ordering::SeqCst);
        lock(&self.shared.status_tx).take();
        let mut end = lock(&self.shared.end_time);
        if end.is_none() {
            *end = Some(SystemTime::now());
        }
    }

    /// Block until every submission returns and the status consumer has
    /// drained, then settle the final build status. Call [`release`] first.
    ///
    /// [`release`]: Manager::release
    pub fn wait(&mut self) -> Result<()> {
        loop {
            let handles: Vec<JoinHandle<()>> = lock(&self.shared.handles).drain(..).collect();
            if handles.is_empty() {
                break;
            }
            for h in handles {
                let _ = h.join();
            }
        }

        self.release();

        let consumer_err = match self.consumer.take() {
            Some(h) => match h.join() {
                Ok(Ok(())) => None,
                Ok(Err(e)) => Some(e),
                Err(_) => Some(anyhow::anyhow!("status consumer panicked")),
            },
            None => None,
        };

        let err = lock(&self.shared.first_err).take().or(consumer_err);

        let mut build = lock(&self.shared.build);
        match &err {
            None => *build = BuildStatus::Finished,
            Some(e) if e.downcast_ref::<Canceled>().is_some() => *build = BuildStatus::Canceled,
            Some(_) => *build = BuildStatus::Failed,
        }
        drop(build);

        match err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// The single consumer: folds every incoming status into the task and
/// vertex maps. Newly seen digests create tasks; started/completed
/// timestamps advance state; logs append to the task buffer.
fn handle_status(shared: Arc<Shared>, rx: Receiver<TaggedStatus>) -> Result<()> {
    for tagged in rx.iter() {
        let TaggedStatus { status, job } = tagged;

        for vtx in status.vertexes {
            let prev = {
                let mut map = shared.vtx.write().unwrap_or_else(|e| e.into_inner());
                map.insert(vtx.digest.clone(), vtx.clone())
            };

            let task = {
                let existing = lock(&shared.tasks).get(&vtx.digest).cloned();
                match existing {
                    Some(t) => t,
                    None => job.new_task(&vtx.digest),
                }
            };

            if !vtx.name.is_empty() {
                task.set_description(&vtx.name);
            }

            if let Some(started) = vtx.started {
                if prev.as_ref().map_or(true, |p| p.started.is_none()) {
                    task.start(started)?;
                    let mut global_start = lock(&shared.start_time);
                    if global_start.is_none() {
                        *global_start = Some(started);
                    }
                }
            }

            if let Some(completed) = vtx.completed {
                let outcome = if vtx.error.is_empty() {
                    if vtx.cached {
                        TaskOutcome::Cached
                    } else {
                        TaskOutcome::Success
                    }
                } else if vtx.error.contains("context canceled") {
                    TaskOutcome::Canceled
                } else {
                    TaskOutcome::Error
                };
                task.complete(completed, outcome);
            }
        }

        for row in status.statuses {
            let task = lock(&shared.tasks).get(&row.vertex).cloned();
            if let Some(task) = task {
                task.set_progress(row.current, row.total);
            }
        }

        for l in status.logs {
            let task = lock(&shared.tasks).get(&l.vertex).cloned();
            if let Some(task) = task {
                task.write(&l.data);
            }
        }
    }
    Ok(())
}
