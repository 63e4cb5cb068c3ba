//! Origin-side dispatch orchestrator
//!
//! [`ScpJobRunner`] makes an inherently asynchronous, unreliable,
//! multi-process handoff look like a synchronous local execution call:
//! serialize the unexecuted batch, drop it on the remote host through the
//! transport session, then block in `stop()` polling for the executed batch
//! to come back. Bounded by a max-wait deadline, guarded against reading a
//! half-written result file, and able to degrade to plain local execution
//! when the transfer fails.
//!
//! The local-vs-remote decision is a tagged variant fixed once at start time;
//! the two code paths never probe each other.

use std::fs;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::batch::{handoff_path, JobBatch, ReturnAddress};
use crate::config::DispatchConfig;
use crate::error::{Result, SkyhookError};
use crate::job::{CompletionListener, Job, JobResult, JobRunner, LocalJobRunner, RunnerHandle, RunnerState};
use crate::poll::{is_file_open, WaitLoop, WaitOutcome, POLL_INTERVAL};
use crate::transport::TransportSession;

/// Filename prefix for outbound (unexecuted) batches.
const JOBS_PREFIX: &str = "skyhook-jobs";

enum Mode<J: Job> {
    /// Not yet started.
    Idle,
    /// The remote side owns execution; `stop()` waits for the result file.
    RemoteDispatch,
    /// Transfer failed and degradation was allowed; jobs run here.
    LocalFallback(LocalJobRunner<J>),
}

/// Offloads a job batch to a remote host over a one-way file-copy channel.
///
/// Per-job completion listeners fire only on the local-fallback path; during
/// normal remote dispatch nothing surfaces until the batch-level result has
/// made the full round trip. Remote cancellation does not exist; the channel
/// is one-way, so `terminate()` only affects the wait loop or a spawned
/// fallback runner.
pub struct ScpJobRunner<J: Job, S: TransportSession> {
    config: DispatchConfig,
    session: Option<S>,
    jobs: Vec<J>,
    results: Vec<Option<JobResult>>,
    listeners: Vec<CompletionListener<J>>,
    handle: RunnerHandle,
    mode: Mode<J>,
    started_at: Option<Instant>,
}

impl<J: Job, S: TransportSession> ScpJobRunner<J, S> {
    pub fn new(config: DispatchConfig) -> Self {
        Self {
            config,
            session: None,
            jobs: Vec::new(),
            results: Vec::new(),
            listeners: Vec::new(),
            handle: RunnerHandle::new(),
            mode: Mode::Idle,
            started_at: None,
        }
    }

    /// Supply the externally established transport session.
    pub fn set_session(&mut self, session: S) {
        self.session = Some(session);
    }

    pub fn add_job(&mut self, job: J) {
        self.jobs.push(job);
    }

    pub fn add_jobs(&mut self, jobs: impl IntoIterator<Item = J>) {
        self.jobs.extend(jobs);
    }

    pub fn jobs(&self) -> &[J] {
        &self.jobs
    }

    /// Per-job results, populated once `stop()` has adopted the executed
    /// batch (remote mode) or the fallback runner has finished (local mode).
    pub fn results(&self) -> Vec<Option<JobResult>> {
        match &self.mode {
            Mode::LocalFallback(local) => local.results(),
            _ => self.results.clone(),
        }
    }

    /// Whether the start-time decision degraded to local execution.
    pub fn is_local_fallback(&self) -> bool {
        matches!(self.mode, Mode::LocalFallback(_))
    }

    /// Checks performed before any job is touched.
    fn pre_start(&self) -> Result<()> {
        self.config.validate()?;
        if self.session.is_none() {
            return Err(SkyhookError::MissingSession);
        }
        Ok(())
    }

    /// Degrade to local execution, forwarding listener registrations and
    /// bypassing the remote protocol entirely.
    fn start_local_fallback(&mut self) -> Result<()> {
        let mut local = LocalJobRunner::new(self.jobs.clone());
        local.share_handle(self.handle.clone());
        for listener in &self.listeners {
            local.add_completion_listener(listener.clone());
        }
        local.start()?;
        self.mode = Mode::LocalFallback(local);
        Ok(())
    }

    /// Block until the executed batch lands at the configured local file,
    /// then adopt its results.
    fn wait_for_results(&mut self) -> Result<()> {
        let local_file = self.config.local_file.clone();
        let deadline = self
            .config
            .max_wait()
            .map(|max| self.started_at.unwrap_or_else(Instant::now) + max);

        let wait = WaitLoop::new(POLL_INTERVAL, deadline);
        match wait.run(&self.handle, || local_file.exists()) {
            WaitOutcome::Satisfied => {}
            WaitOutcome::Cancelled => return Ok(()),
            WaitOutcome::DeadlineExceeded => {
                self.handle.terminate();
                return Err(SkyhookError::MaxWaitReached {
                    msec: self.config.max_wait_msec,
                });
            }
        }

        // Strict single-writer-then-single-reader handoff: never read a file
        // its producer still has open. A pause suspends the re-checks without
        // consuming attempts; the read is gated on the guard's verdict alone.
        let settle = Duration::from_millis(self.config.attempt_interval_msec.min(100));
        let mut attempts = 0;
        let closed = loop {
            while self.handle.is_paused() {
                thread::sleep(POLL_INTERVAL);
            }
            if !self.handle.is_running() {
                return Ok(());
            }
            if !is_file_open(&local_file, settle)? {
                break true;
            }
            attempts += 1;
            if attempts >= self.config.num_attempts {
                break false;
            }
            thread::sleep(self.config.attempt_interval());
        };

        if !closed {
            self.handle.terminate();
            return Err(SkyhookError::FileInUse {
                path: local_file,
                attempts: self.config.num_attempts,
                interval_msec: self.config.attempt_interval_msec,
            });
        }

        debug!(file = %local_file.display(), attempts, "reading executed jobs");
        let batch = match JobBatch::<J>::read(&local_file) {
            Ok(batch) => batch,
            Err(e) => {
                self.handle.terminate();
                return Err(e);
            }
        };

        info!(jobs = batch.len(), "adopted executed job batch");
        self.jobs = batch.jobs;
        self.results = batch.results;
        self.handle.set(RunnerState::Stopped);
        Ok(())
    }
}

impl<J: Job, S: TransportSession> JobRunner<J> for ScpJobRunner<J, S> {
    /// Serialize the unexecuted jobs, transfer them, and hand ownership of
    /// execution to the remote side, or fall back to local execution when
    /// the transfer fails and degradation is allowed.
    fn start(&mut self) -> Result<()> {
        self.pre_start()?;
        let session = match self.session.as_mut() {
            Some(session) => session,
            None => return Err(SkyhookError::MissingSession),
        };

        // The remote side learns where to ship results from the batch itself.
        let batch = JobBatch::unexecuted(self.jobs.clone()).with_return(ReturnAddress {
            endpoint: self.config.local_endpoint(),
            inbox: self.config.local_file.clone(),
        });
        let tmp_file = handoff_path(JOBS_PREFIX, session.host());
        self.started_at = Some(Instant::now());

        debug!(file = %tmp_file.display(), jobs = batch.len(), "serializing jobs");
        if let Err(e) = batch.write(&tmp_file) {
            let _ = fs::remove_file(&tmp_file);
            return Err(e);
        }

        debug!(
            host = session.host(),
            port = session.port(),
            remote = %self.config.remote_file.display(),
            "transferring jobs to remote host"
        );
        let transfer = session.copy_to(&tmp_file, &self.config.remote_file);
        let _ = fs::remove_file(&tmp_file);

        match transfer {
            Ok(()) => {
                info!(
                    return_endpoint = %self.config.local_endpoint(),
                    inbox = %self.config.local_file.display(),
                    "jobs handed to remote host"
                );
                self.mode = Mode::RemoteDispatch;
                self.handle.set(RunnerState::Running);
                Ok(())
            }
            Err(e) if self.config.allow_local_execution => {
                warn!(error = %e, "transfer failed, executing jobs locally instead");
                self.start_local_fallback()
            }
            Err(e) => Err(e),
        }
    }

    /// In remote mode, poll for the result file and adopt the executed
    /// batch; in fallback mode, wait for the local runner to finish.
    fn stop(&mut self) -> Result<()> {
        match &mut self.mode {
            Mode::Idle => {
                self.handle.set(RunnerState::Stopped);
                Ok(())
            }
            Mode::LocalFallback(local) => {
                local.stop()?;
                self.results = local.results();
                Ok(())
            }
            Mode::RemoteDispatch => self.wait_for_results(),
        }
    }

    /// Aborts the wait loop and any spawned fallback runner. An in-flight
    /// remote batch is unaffected; the channel offers no remote cancel.
    fn terminate(&mut self) -> Result<()> {
        if let Mode::LocalFallback(local) = &mut self.mode {
            local.terminate()?;
        }
        self.handle.terminate();
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

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct EchoJob {
        message: String,
    }

    impl Job for EchoJob {
        fn execute(&self) -> JobResult {
            JobResult::ok_with(self.message.clone())
        }
    }

    /// Session whose copy always fails, for degradation tests.
    struct BrokenSession;

    impl TransportSession for BrokenSession {
        fn host(&self) -> &str {
            "unreachable"
        }

        fn port(&self) -> u16 {
            22
        }

        fn copy_to(&mut self, _local: &Path, _remote: &Path) -> Result<()> {
            Err(SkyhookError::Transfer {
                host: "unreachable".to_string(),
                port: 22,
                message: "no route to host".to_string(),
            })
        }
    }

    fn config_in(temp: &TempDir) -> DispatchConfig {
        DispatchConfig {
            remote_file: temp.path().join("drop/jobs.bin"),
            local_file: temp.path().join("inbox/results.bin"),
            ..Default::default()
        }
    }

    fn echo_jobs(n: usize) -> Vec<EchoJob> {
        (0..n)
            .map(|i| EchoJob {
                message: format!("echo-{}", i),
            })
            .collect()
    }

    #[test]
    fn test_missing_session_is_fatal_before_any_job() {
        let temp = TempDir::new().unwrap();
        let mut runner: ScpJobRunner<EchoJob, BrokenSession> = ScpJobRunner::new(config_in(&temp));
        runner.add_jobs(echo_jobs(2));

        let err = runner.start().unwrap_err();
        assert!(matches!(err, SkyhookError::MissingSession));
        assert!(err.is_fatal());
        // Nothing was written anywhere.
        assert!(!temp.path().join("drop").exists());
    }

    #[test]
    fn test_broken_transport_without_fallback_is_fatal() {
        let temp = TempDir::new().unwrap();
        let mut runner = ScpJobRunner::new(config_in(&temp));
        runner.set_session(BrokenSession);
        runner.add_jobs(echo_jobs(2));

        let err = runner.start().unwrap_err();
        assert!(matches!(err, SkyhookError::Transfer { .. }));
        assert!(!runner.is_local_fallback());
    }

    #[test]
    fn test_broken_transport_with_fallback_runs_locally() {
        crate::logging::init_test_logging();
        let temp = TempDir::new().unwrap();
        let config = DispatchConfig {
            allow_local_execution: true,
            ..config_in(&temp)
        };
        let mut runner = ScpJobRunner::new(config);
        runner.set_session(BrokenSession);
        runner.add_jobs(echo_jobs(3));

        runner.start().unwrap();
        assert!(runner.is_local_fallback());
        runner.stop().unwrap();

        let results = runner.results();
        assert_eq!(results.len(), 3);
        for (i, result) in results.iter().enumerate() {
            let result = result.as_ref().unwrap();
            assert!(result.success);
            assert_eq!(result.payload.as_deref(), Some(format!("echo-{}", i).as_str()));
        }
    }

    #[test]
    fn test_temp_file_removed_after_failed_transfer() {
        let temp = TempDir::new().unwrap();
        let mut runner = ScpJobRunner::new(config_in(&temp));
        runner.set_session(BrokenSession);
        runner.add_jobs(echo_jobs(1));
        let _ = runner.start();

        let leftovers: Vec<_> = std::fs::read_dir(std::env::temp_dir())
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|name| name.starts_with("skyhook-jobs-unreachable-"))
            .collect();
        assert!(leftovers.is_empty(), "leftover temp files: {:?}", leftovers);
    }

    #[test]
    fn test_max_wait_reached_when_results_never_appear() {
        let temp = TempDir::new().unwrap();
        let config = DispatchConfig {
            max_wait_msec: 500,
            ..config_in(&temp)
        };
        // LocalSession transfer succeeds, but nothing ever writes the inbox.
        let mut runner = ScpJobRunner::new(config);
        runner.set_session(crate::transport::LocalSession::new());
        runner.add_jobs(echo_jobs(1));

        runner.start().unwrap();
        assert!(runner.is_running());

        let started = Instant::now();
        let err = runner.stop().unwrap_err();
        let elapsed = started.elapsed();

        assert_eq!(err.to_string(), "Max wait reached (500msec)");
        assert!(elapsed >= Duration::from_millis(450), "too early: {:?}", elapsed);
        assert!(elapsed < Duration::from_millis(2000), "too late: {:?}", elapsed);
        assert_eq!(runner.handle().state(), RunnerState::Terminated);
    }

    #[test]
    fn test_terminate_cancels_the_wait_loop() {
        let temp = TempDir::new().unwrap();
        let mut runner = ScpJobRunner::new(config_in(&temp));
        runner.set_session(crate::transport::LocalSession::new());
        runner.add_jobs(echo_jobs(1));
        runner.start().unwrap();

        let handle = runner.handle();
        let canceller = thread::spawn(move || {
            thread::sleep(Duration::from_millis(150));
            handle.terminate();
        });

        // Unbounded max wait; only the terminate can end this.
        runner.stop().unwrap();
        canceller.join().unwrap();
        assert_eq!(runner.handle().state(), RunnerState::Terminated);
        assert!(runner.results().iter().all(|r| r.is_none()));
    }

    #[test]
    fn test_result_file_still_in_use_fails_after_attempts() {
        let temp = TempDir::new().unwrap();
        let config = DispatchConfig {
            num_attempts: 3,
            attempt_interval_msec: 50,
            ..config_in(&temp)
        };
        let local_file: PathBuf = config.local_file.clone();
        std::fs::create_dir_all(local_file.parent().unwrap()).unwrap();
        std::fs::write(&local_file, b"partial").unwrap();

        // A producer that keeps the file growing for the whole check window.
        let writer_path = local_file.clone();
        let writer = thread::spawn(move || {
            use std::io::Write;
            let mut file = std::fs::OpenOptions::new()
                .append(true)
                .open(&writer_path)
                .unwrap();
            for _ in 0..100 {
                file.write_all(b"still writing").unwrap();
                file.flush().unwrap();
                thread::sleep(Duration::from_millis(10));
            }
        });

        let mut runner = ScpJobRunner::new(config);
        runner.set_session(crate::transport::LocalSession::new());
        runner.add_jobs(echo_jobs(1));
        runner.start().unwrap();

        let err = runner.stop().unwrap_err();
        writer.join().unwrap();

        let message = err.to_string();
        assert!(message.contains("still in use"), "got: {}", message);
        assert!(message.contains("3 * 50msec"), "got: {}", message);
    }

    #[test]
    fn test_pause_during_in_use_recheck_keeps_the_guard() {
        let temp = TempDir::new().unwrap();
        let config = DispatchConfig {
            num_attempts: 3,
            attempt_interval_msec: 50,
            ..config_in(&temp)
        };
        let local_file: PathBuf = config.local_file.clone();
        std::fs::create_dir_all(local_file.parent().unwrap()).unwrap();
        std::fs::write(&local_file, b"partial").unwrap();

        // Producer keeps writing well past the pause window.
        let writer_path = local_file.clone();
        let writer = thread::spawn(move || {
            use std::io::Write;
            let mut file = std::fs::OpenOptions::new()
                .append(true)
                .open(&writer_path)
                .unwrap();
            for _ in 0..150 {
                file.write_all(b"still writing").unwrap();
                file.flush().unwrap();
                thread::sleep(Duration::from_millis(10));
            }
        });

        let mut runner = ScpJobRunner::new(config);
        runner.set_session(crate::transport::LocalSession::new());
        runner.add_jobs(echo_jobs(1));
        runner.start().unwrap();

        // Pause lands inside the re-check phase and lifts 200ms later.
        let handle = runner.handle();
        let toggler = thread::spawn(move || {
            thread::sleep(Duration::from_millis(75));
            handle.pause();
            thread::sleep(Duration::from_millis(200));
            handle.resume();
        });

        let started = Instant::now();
        let err = runner.stop().unwrap_err();
        let elapsed = started.elapsed();
        toggler.join().unwrap();
        writer.join().unwrap();

        // The pause must not bypass the guard: the still-open file is never
        // read, and the attempts resume where they left off.
        assert!(matches!(err, SkyhookError::FileInUse { .. }), "got: {}", err);
        assert!(
            elapsed >= Duration::from_millis(300),
            "guard did not wait out the pause: {:?}",
            elapsed
        );
    }

    #[test]
    fn test_corrupt_result_file_surfaces_deserialize_error() {
        let temp = TempDir::new().unwrap();
        let config = config_in(&temp);
        std::fs::create_dir_all(config.local_file.parent().unwrap()).unwrap();
        std::fs::write(&config.local_file, b"not a batch").unwrap();

        let mut runner = ScpJobRunner::new(config);
        runner.set_session(crate::transport::LocalSession::new());
        runner.add_jobs(echo_jobs(1));
        runner.start().unwrap();

        let err = runner.stop().unwrap_err();
        assert!(matches!(err, SkyhookError::Deserialize { .. }));
    }
}
