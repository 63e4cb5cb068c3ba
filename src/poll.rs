//! Cancellable wait primitives for the result-file poll loop
//!
//! The dispatch protocol has exactly one suspension point: the origin blocks
//! on its caller's thread, sleeping in small fixed increments, until the
//! result file appears. Every iteration re-checks the externally toggled
//! pause flag, the terminate flag and the monotonic max-wait deadline. No
//! async runtime is involved; this is a cross-process protocol, not an
//! in-process concurrency problem.

use std::fs::OpenOptions;
use std::io;
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant, SystemTime};

use crate::job::RunnerHandle;

/// Fixed sleep increment for the appearance poll loop.
pub const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Why a wait loop returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The awaited condition became true.
    Satisfied,
    /// The runner left the Running/Paused states (external terminate).
    Cancelled,
    /// The monotonic deadline passed first.
    DeadlineExceeded,
}

/// A blocking wait loop with optional monotonic deadline.
#[derive(Debug, Clone)]
pub struct WaitLoop {
    interval: Duration,
    deadline: Option<Instant>,
}

impl WaitLoop {
    pub fn new(interval: Duration, deadline: Option<Instant>) -> Self {
        Self { interval, deadline }
    }

    /// Block until `condition` holds, the runner is cancelled, or the
    /// deadline passes, whichever happens first.
    ///
    /// While the runner is paused the condition is not evaluated, but the
    /// deadline still is.
    pub fn run(&self, handle: &RunnerHandle, mut condition: impl FnMut() -> bool) -> WaitOutcome {
        loop {
            if !handle.is_running() && !handle.is_paused() {
                return WaitOutcome::Cancelled;
            }
            if !handle.is_paused() && condition() {
                return WaitOutcome::Satisfied;
            }
            if let Some(deadline) = self.deadline {
                if Instant::now() >= deadline {
                    return WaitOutcome::DeadlineExceeded;
                }
                let remaining = deadline.saturating_duration_since(Instant::now());
                thread::sleep(self.interval.min(remaining));
            } else {
                thread::sleep(self.interval);
            }
        }
    }
}

/// Check whether `path` is still open for writing by another process.
///
/// There is no portable "who has this file open" query, so this combines an
/// append-open probe (fails on platforms with mandatory sharing semantics)
/// with a size/mtime stability probe across a short settle window. A file
/// whose producer is still streaming into it keeps changing; a completed
/// handoff file does not.
pub fn is_file_open(path: &Path, settle: Duration) -> io::Result<bool> {
    let before = observe(path)?;

    if OpenOptions::new().append(true).open(path).is_err() {
        return Ok(true);
    }

    thread::sleep(settle);
    let after = observe(path)?;
    Ok(before != after)
}

fn observe(path: &Path) -> io::Result<(u64, Option<SystemTime>)> {
    let meta = std::fs::metadata(path)?;
    Ok((meta.len(), meta.modified().ok()))
}
