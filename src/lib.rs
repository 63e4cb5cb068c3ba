//! Skyhook: remote job dispatch over one-way file-transfer channels
//!
//! # Overview
//!
//! Skyhook offloads a batch of serializable jobs to a machine that is only
//! reachable through a poll-based file-copy channel (scp, a shared mount, a
//! watched drop directory) and makes the round trip look like a synchronous
//! local call:
//!
//! 1. The origin-side [`ScpJobRunner`] serializes the unexecuted batch,
//!    copies it to the remote drop path through an externally established
//!    [`transport::TransportSession`], and blocks in `stop()` polling for
//!    the executed batch to land in its local inbox, bounded by a max-wait
//!    deadline and guarded against reading a file still being written.
//! 2. The remote-side [`RemoteJobRunner`] deserializes the dropped batch,
//!    executes it with a plain [`LocalJobRunner`], and ships the results
//!    back the same way.
//!
//! When the outbound transfer fails and degradation is allowed, the origin
//! executes the jobs itself with a local runner instead: same results,
//! no remote protocol.
//!
//! The independent [`connection`] module moves control commands between
//! endpoints: point-to-point ([`DefaultConnection`]), round-robin
//! ([`LoadBalancer`]) and broadcast ([`Multicast`]) delivery.
//!
//! # Example
//!
//! ```no_run
//! use skyhook::{
//!     DispatchConfig, Job, JobRunner, LocalSession, ScpJobRunner, ShellJob,
//! };
//!
//! fn main() -> skyhook::Result<()> {
//!     let config = DispatchConfig {
//!         remote_file: "/mnt/worker/drop/jobs.bin".into(),
//!         local_file: "/var/skyhook/inbox/results.bin".into(),
//!         max_wait_msec: 60_000,
//!         allow_local_execution: true,
//!         ..Default::default()
//!     };
//!
//!     let mut runner = ScpJobRunner::new(config);
//!     runner.set_session(LocalSession::new());
//!     runner.add_job(ShellJob::new("make check"));
//!
//!     runner.start()?; // serialize + transfer (or degrade to local)
//!     runner.stop()?; // block until the executed batch is back
//!
//!     for result in runner.results().into_iter().flatten() {
//!         println!("success={} {:?}", result.success, result.payload);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Guarantees and non-goals
//!
//! Delivery is best effort: the channel is one-way, so there is no remote
//! cancellation and no exactly-once guarantee. A remote host that receives
//! the batch but dies before replying is indistinguishable from a slow one;
//! the max-wait deadline is the only backstop.

pub mod batch;
pub mod config;
pub mod connection;
pub mod dispatch;
pub mod error;
pub mod job;
pub mod logging;
pub mod net;
pub mod poll;
pub mod remote;
pub mod shell;
pub mod transport;

pub use batch::{JobBatch, ReturnAddress};
pub use config::DispatchConfig;
pub use connection::{Connection, DefaultConnection, LoadBalancer, Multicast, RawCommand, RemoteCommand};
pub use dispatch::ScpJobRunner;
pub use error::{Result, SkyhookError};
pub use job::{CompletionListener, Job, JobResult, JobRunner, LocalJobRunner, RunnerHandle, RunnerState};
pub use net::HostPort;
pub use remote::RemoteJobRunner;
pub use shell::ShellJob;
pub use transport::{LocalSession, TransportSession};

#[cfg(feature = "ssh")]
pub use transport::ScpSession;
