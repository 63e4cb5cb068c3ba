//! Job, JobResult and the JobRunner execution contract
//!
//! A [`Job`] is an independent, serializable unit of work; it is immutable once
//! submitted and its identity survives serialization. A [`JobRunner`] executes
//! a batch of jobs and reports completion per job through an explicit list of
//! observer handles owned by the runner instance; there is no process-wide
//! listener registry.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::batch::JobBatch;
use crate::error::Result;

/// An independent, serializable unit of work.
///
/// Jobs are plain data: cheap to clone, safe to share with a worker thread,
/// and executable without any context beyond their own fields.
pub trait Job: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Execute the job, producing exactly one result.
    fn execute(&self) -> JobResult;
}

/// The outcome of exactly one job: success/failure plus payload or error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobResult {
    pub success: bool,
    pub payload: Option<String>,
    pub error: Option<String>,
}

impl JobResult {
    /// A successful result without payload.
    pub fn ok() -> Self {
        Self {
            success: true,
            payload: None,
            error: None,
        }
    }

    /// A successful result carrying a payload.
    pub fn ok_with(payload: impl Into<String>) -> Self {
        Self {
            success: true,
            payload: Some(payload.into()),
            error: None,
        }
    }

    /// A failed result carrying an error message.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            payload: None,
            error: Some(error.into()),
        }
    }
}

/// Lifecycle of a runner instance.
///
/// `Terminated` is reachable from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RunnerState {
    Idle = 0,
    Running = 1,
    Paused = 2,
    Stopped = 3,
    Terminated = 4,
}

impl RunnerState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => RunnerState::Running,
            2 => RunnerState::Paused,
            3 => RunnerState::Stopped,
            4 => RunnerState::Terminated,
            _ => RunnerState::Idle,
        }
    }

    /// Stopped and Terminated are terminal.
    pub fn is_terminal(self) -> bool {
        matches!(self, RunnerState::Stopped | RunnerState::Terminated)
    }
}

impl fmt::Display for RunnerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunnerState::Idle => "idle",
            RunnerState::Running => "running",
            RunnerState::Paused => "paused",
            RunnerState::Stopped => "stopped",
            RunnerState::Terminated => "terminated",
        };
        write!(f, "{}", name)
    }
}

/// Shared, cloneable view of a runner's lifecycle state.
///
/// Wait loops read it on every iteration; other threads may toggle pause or
/// request termination through a clone of the handle.
#[derive(Debug, Clone, Default)]
pub struct RunnerHandle {
    state: Arc<AtomicU8>,
}

impl RunnerHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> RunnerState {
        RunnerState::from_u8(self.state.load(Ordering::SeqCst))
    }

    pub(crate) fn set(&self, state: RunnerState) {
        self.state.store(state as u8, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.state() == RunnerState::Running
    }

    pub fn is_paused(&self) -> bool {
        self.state() == RunnerState::Paused
    }

    /// Suspend a running runner. No-op in any other state.
    pub fn pause(&self) {
        let _ = self.state.compare_exchange(
            RunnerState::Running as u8,
            RunnerState::Paused as u8,
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
    }

    /// Resume a paused runner. No-op in any other state.
    pub fn resume(&self) {
        let _ = self.state.compare_exchange(
            RunnerState::Paused as u8,
            RunnerState::Running as u8,
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
    }

    /// Move to `Terminated` unless already stopped.
    pub fn terminate(&self) {
        if self.state() != RunnerState::Stopped {
            self.set(RunnerState::Terminated);
        }
    }
}

/// Observer handle fired synchronously once per completed job.
pub type CompletionListener<J> = Arc<dyn Fn(&J, &JobResult) + Send + Sync>;

/// Executes a batch of jobs, reporting completion per job.
pub trait JobRunner<J: Job> {
    /// Begin executing the queued jobs.
    fn start(&mut self) -> Result<()>;

    /// Block until the current phase completes or cancels.
    fn stop(&mut self) -> Result<()>;

    /// Forcibly abort execution.
    fn terminate(&mut self) -> Result<()>;

    fn is_running(&self) -> bool;

    fn is_paused(&self) -> bool;

    /// A cloneable handle for external pause/terminate toggling.
    fn handle(&self) -> RunnerHandle;

    /// Register an observer fired once per finished job with its result.
    fn add_completion_listener(&mut self, listener: CompletionListener<J>);
}

/// Interval at which a paused worker re-checks its state.
const PAUSE_POLL: Duration = Duration::from_millis(10);

/// Plain local execution engine.
///
/// `start()` launches a worker thread that executes queued jobs in submission
/// order, records each [`JobResult`] and fires the registered listeners.
/// `stop()` joins the worker; `terminate()` raises the abort flag, which is
/// honored between jobs (the job currently executing runs to completion).
pub struct LocalJobRunner<J: Job> {
    jobs: Arc<Vec<J>>,
    results: Arc<Mutex<Vec<Option<JobResult>>>>,
    listeners: Vec<CompletionListener<J>>,
    handle: RunnerHandle,
    worker: Option<JoinHandle<()>>,
}

impl<J: Job> LocalJobRunner<J> {
    /// Create a runner over an unexecuted set of jobs.
    pub fn new(jobs: Vec<J>) -> Self {
        let count = jobs.len();
        Self {
            jobs: Arc::new(jobs),
            results: Arc::new(Mutex::new(vec![None; count])),
            listeners: Vec::new(),
            handle: RunnerHandle::new(),
            worker: None,
        }
    }

    /// Rehydrate a runner from a deserialized batch.
    ///
    /// Jobs that already carry a result are skipped on the next `start()`.
    pub fn from_batch(batch: JobBatch<J>) -> Self {
        let JobBatch { jobs, results, .. } = batch;
        Self {
            jobs: Arc::new(jobs),
            results: Arc::new(Mutex::new(results)),
            listeners: Vec::new(),
            handle: RunnerHandle::new(),
            worker: None,
        }
    }

    pub fn jobs(&self) -> &[J] {
        &self.jobs
    }

    /// Current per-job results, `None` where not yet executed.
    pub fn results(&self) -> Vec<Option<JobResult>> {
        self.results.lock().expect("results lock poisoned").clone()
    }

    /// Snapshot of jobs plus current results, suitable for the handoff codec.
    pub fn snapshot(&self) -> JobBatch<J> {
        JobBatch {
            jobs: (*self.jobs).clone(),
            results: self.results(),
            return_to: None,
        }
    }

    /// Replace this runner's state cell with a shared one. Only meaningful
    /// before `start()`; used by wrappers that expose a single handle for
    /// themselves and their inner runner.
    pub(crate) fn share_handle(&mut self, handle: RunnerHandle) {
        self.handle = handle;
    }

    fn join_worker(&mut self) {
        if let Some(worker) = self.worker.take() {
            // A panicking job poisons nothing we read afterwards; surface it.
            if worker.join().is_err() {
                tracing::error!("job worker thread panicked");
            }
        }
    }
}

impl<J: Job> JobRunner<J> for LocalJobRunner<J> {
    fn start(&mut self) -> Result<()> {
        if self.worker.is_some() {
            return Ok(());
        }

        self.handle.set(RunnerState::Running);

        let jobs = Arc::clone(&self.jobs);
        let results = Arc::clone(&self.results);
        let listeners = self.listeners.clone();
        let handle = self.handle.clone();

        self.worker = Some(thread::spawn(move || {
            for (index, job) in jobs.iter().enumerate() {
                while handle.is_paused() {
                    thread::sleep(PAUSE_POLL);
                }
                if !handle.is_running() {
                    break;
                }
                if results.lock().expect("results lock poisoned")[index].is_some() {
                    continue;
                }

                let result = job.execute();
                tracing::debug!(index, success = result.success, "job completed");
                results.lock().expect("results lock poisoned")[index] = Some(result.clone());
                for listener in &listeners {
                    listener(job, &result);
                }
            }
        }));

        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        // A paused worker would never finish; clear the pause before joining.
        self.handle.resume();
        self.join_worker();
        if self.handle.state() != RunnerState::Terminated {
            self.handle.set(RunnerState::Stopped);
        }
        Ok(())
    }

    fn terminate(&mut self) -> Result<()> {
        self.handle.terminate();
        self.join_worker();
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.handle.is_running()
    }

    fn is_paused(&self) -> bool {
        self.handle.is_paused()
    }

    fn handle(&self) -> RunnerHandle {
        self.handle.clone()
    }

    fn add_completion_listener(&mut self, listener: CompletionListener<J>) {
        self.listeners.push(listener);
    }
}
