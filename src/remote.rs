//! Remote-side mirror of the dispatch protocol
//!
//! [`RemoteJobRunner`] is populated by deserializing a dropped batch file;
//! it never creates jobs itself. It executes the batch synchronously and
//! ships the executed results back to the origin's inbox through its own
//! transport session. There is no fallback on the return leg: if the copy
//! back fails, there is nowhere else to deliver the answer.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::batch::{handoff_path, JobBatch};
use crate::error::{Result, SkyhookError};
use crate::job::{CompletionListener, Job, JobRunner, LocalJobRunner, RunnerHandle};
use crate::transport::TransportSession;

/// Filename prefix for return-trip (executed) batches.
const RESULTS_PREFIX: &str = "skyhook-results";

/// Executes a received job batch and returns results via file transfer.
pub struct RemoteJobRunner<J: Job, S: TransportSession> {
    session: S,
    return_file: PathBuf,
    runner: LocalJobRunner<J>,
}

impl<J: Job, S: TransportSession> RemoteJobRunner<J, S> {
    /// Wrap an already-deserialized batch. `return_file` is the path on the
    /// origin host where the executed batch must land.
    pub fn new(session: S, return_file: impl Into<PathBuf>, batch: JobBatch<J>) -> Self {
        Self {
            session,
            return_file: return_file.into(),
            runner: LocalJobRunner::from_batch(batch),
        }
    }

    /// Load the dropped batch file and wrap it.
    pub fn load(session: S, return_file: impl Into<PathBuf>, batch_file: &Path) -> Result<Self> {
        let batch = JobBatch::read(batch_file)?;
        info!(
            file = %batch_file.display(),
            jobs = batch.len(),
            "loaded job batch for remote execution"
        );
        Ok(Self::new(session, return_file, batch))
    }

    /// Load a dropped batch file and ship results to the return address the
    /// origin embedded in it. Fails when the batch carries none.
    pub fn from_dropped(session: S, batch_file: &Path) -> Result<Self> {
        let batch = JobBatch::read(batch_file)?;
        let address = batch.return_to.clone().ok_or(SkyhookError::NoReturnAddress)?;
        info!(
            file = %batch_file.display(),
            jobs = batch.len(),
            endpoint = %address.endpoint,
            inbox = %address.inbox.display(),
            "loaded job batch with embedded return address"
        );
        Ok(Self::new(session, address.inbox, batch))
    }

    /// Where the executed batch will be delivered.
    pub fn return_file(&self) -> &Path {
        &self.return_file
    }

    pub fn results(&self) -> Vec<Option<crate::job::JobResult>> {
        self.runner.results()
    }

    /// Serialize the executed batch and copy it back to the origin's inbox.
    fn ship_results(&mut self) -> Result<()> {
        let batch = self.runner.snapshot();
        let tmp_file = handoff_path(RESULTS_PREFIX, self.session.host());

        debug!(file = %tmp_file.display(), jobs = batch.len(), "serializing executed jobs");
        if let Err(e) = batch.write(&tmp_file) {
            let _ = fs::remove_file(&tmp_file);
            return Err(e);
        }

        debug!(
            host = self.session.host(),
            port = self.session.port(),
            return_file = %self.return_file.display(),
            "copying executed jobs back to origin"
        );
        let transfer = self.session.copy_to(&tmp_file, &self.return_file);
        let _ = fs::remove_file(&tmp_file);
        transfer
    }
}

impl<J: Job, S: TransportSession> std::fmt::Debug for RemoteJobRunner<J, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteJobRunner")
            .field("return_file", &self.return_file)
            .finish_non_exhaustive()
    }
}

impl<J: Job, S: TransportSession> JobRunner<J> for RemoteJobRunner<J, S> {
    /// Run the wrapped runner synchronously: start, then immediately stop.
    /// No asynchronous boundary is exposed here.
    fn start(&mut self) -> Result<()> {
        self.runner.start()?;
        self.runner.stop()
    }

    /// Ship the executed batch back to the origin. Fatal on failure.
    fn stop(&mut self) -> Result<()> {
        self.ship_results()
    }

    fn terminate(&mut self) -> Result<()> {
        self.runner.terminate()
    }

    fn is_running(&self) -> bool {
        self.runner.is_running()
    }

    fn is_paused(&self) -> bool {
        self.runner.is_paused()
    }

    fn handle(&self) -> RunnerHandle {
        self.runner.handle()
    }

    fn add_completion_listener(&mut self, listener: CompletionListener<J>) {
        self.runner.add_completion_listener(listener);
    }
}
