//! Handoff file format for job batches
//!
//! A [`JobBatch`] is the serialized representation of a runner's full job
//! state: either "jobs, unexecuted" on the outbound leg or "jobs + results,
//! executed" on the return trip. The codec is bincode over serde; both ends of
//! the channel agree on it by construction.

use bincode::Options;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use crate::error::{Result, SkyhookError};
use crate::job::JobResult;
use crate::net::HostPort;

/// Upper bound on a serialized batch, in bytes.
const MAX_BATCH_BYTES: u64 = 1 << 30;

/// Upper bound on the job count a batch file may claim. A corrupt file whose
/// leading bytes decode to a larger count is rejected before any element is
/// visited.
const MAX_BATCH_JOBS: u64 = 1_000_000;

/// Codec shared by both legs of the handoff: fixed-width integers, bounded
/// input, trailing bytes tolerated.
fn codec() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .allow_trailing_bytes()
        .with_limit(MAX_BATCH_BYTES)
}

/// Where the executed batch must be delivered: the origin's callback
/// endpoint plus the inbox path on that host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnAddress {
    pub endpoint: HostPort,
    pub inbox: PathBuf,
}

/// Jobs plus their (possibly missing) results, 1:1 by index.
///
/// The `jobs` vector must stay the first field: `read` sanity-checks the
/// leading count before decoding the rest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobBatch<J> {
    pub jobs: Vec<J>,
    pub results: Vec<Option<JobResult>>,
    /// Origin delivery address, embedded on the outbound leg so the remote
    /// side needs no out-of-band configuration.
    pub return_to: Option<ReturnAddress>,
}

impl<J> JobBatch<J> {
    /// An outbound batch: all results missing.
    pub fn unexecuted(jobs: Vec<J>) -> Self {
        let count = jobs.len();
        Self {
            jobs,
            results: vec![None; count],
            return_to: None,
        }
    }

    /// Embed the origin's return address.
    pub fn with_return(mut self, address: ReturnAddress) -> Self {
        self.return_to = Some(address);
        self
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// True once every job carries a result.
    pub fn is_executed(&self) -> bool {
        !self.jobs.is_empty() && self.results.iter().all(|r| r.is_some())
    }
}

impl<J: Serialize> JobBatch<J> {
    /// Serialize the batch to `path`.
    pub fn write(&self, path: &Path) -> Result<()> {
        let file = File::create(path)?;
        codec()
            .serialize_into(BufWriter::new(file), self)
            .map_err(|source| SkyhookError::Serialize {
                path: path.to_path_buf(),
                source,
            })
    }
}

impl<J: DeserializeOwned> JobBatch<J> {
    /// Deserialize a batch from `path`, surfacing the originating error.
    ///
    /// The claimed job count is checked against [`MAX_BATCH_JOBS`] before
    /// decoding; without the check a corrupt file claiming an enormous count
    /// of zero-sized elements would spin instead of erroring.
    pub fn read(path: &Path) -> Result<Self> {
        let data = fs::read(path)?;

        if data.len() >= 8 {
            let mut prefix = [0u8; 8];
            prefix.copy_from_slice(&data[..8]);
            let claimed = u64::from_le_bytes(prefix);
            if claimed > MAX_BATCH_JOBS {
                return Err(SkyhookError::Deserialize {
                    path: path.to_path_buf(),
                    source: Box::new(bincode::ErrorKind::Custom(format!(
                        "implausible job count {}",
                        claimed
                    ))),
                });
            }
        }

        codec()
            .deserialize(&data)
            .map_err(|source| SkyhookError::Deserialize {
                path: path.to_path_buf(),
                source,
            })
    }
}

/// Build a uniquely named handoff path under the system temp directory.
///
/// Names follow `prefix-host-disambiguator.bin`; the random disambiguator
/// keeps concurrently in-flight batches to the same host from colliding.
pub fn handoff_path(prefix: &str, host: &str) -> PathBuf {
    let nonce: u32 = rand::random();
    std::env::temp_dir().join(format!("{}-{}-{:08x}.bin", prefix, host, nonce))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{Job, JobResult};
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

    fn sample_batch(n: usize) -> JobBatch<EchoJob> {
        let jobs = (0..n)
            .map(|i| EchoJob {
                message: format!("job-{}", i),
            })
            .collect();
        JobBatch::unexecuted(jobs)
    }

    #[test]
    fn test_round_trip_preserves_jobs_and_results() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("batch.bin");

        let mut batch = sample_batch(5);
        for (i, job) in batch.jobs.iter().enumerate() {
            batch.results[i] = Some(job.execute());
        }
        assert!(batch.is_executed());

        batch.write(&path).unwrap();
        let restored = JobBatch::<EchoJob>::read(&path).unwrap();
        assert_eq!(restored, batch);
    }

    #[test]
    fn test_unexecuted_batch_has_no_results() {
        let batch = sample_batch(3);
        assert_eq!(batch.len(), 3);
        assert!(!batch.is_executed());
        assert!(batch.results.iter().all(|r| r.is_none()));
    }

    #[test]
    fn test_read_garbage_surfaces_deserialize_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("garbage.bin");
        std::fs::write(&path, b"this is not bincode").unwrap();

        let err = JobBatch::<EchoJob>::read(&path).unwrap_err();
        assert!(matches!(err, SkyhookError::Deserialize { .. }));
        assert!(err.to_string().contains("garbage.bin"));
    }

    #[test]
    fn test_return_address_round_trips() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("addressed.bin");

        let batch = sample_batch(2).with_return(ReturnAddress {
            endpoint: HostPort::new("origin.lan", 2222),
            inbox: PathBuf::from("/var/inbox/results.bin"),
        });
        batch.write(&path).unwrap();

        let restored = JobBatch::<EchoJob>::read(&path).unwrap();
        let address = restored.return_to.unwrap();
        assert_eq!(address.endpoint.to_string(), "origin.lan:2222");
        assert_eq!(address.inbox, PathBuf::from("/var/inbox/results.bin"));
    }

    #[test]
    fn test_implausible_job_count_is_rejected() {
        // A job with no fields decodes from zero bytes, so a corrupt length
        // prefix must be rejected up front or decoding would never finish.
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        struct NoopJob;

        impl Job for NoopJob {
            fn execute(&self) -> JobResult {
                JobResult::ok()
            }
        }

        let temp = TempDir::new().unwrap();
        let path = temp.path().join("bogus.bin");
        std::fs::write(&path, b"partial still writing into this file").unwrap();

        let err = JobBatch::<NoopJob>::read(&path).unwrap_err();
        assert!(matches!(err, SkyhookError::Deserialize { .. }));
        assert!(
            err.to_string().contains("implausible job count"),
            "got: {}",
            err
        );
    }

    #[test]
    fn test_handoff_paths_do_not_collide() {
        let a = handoff_path("skyhook-jobs", "worker-1");
        let b = handoff_path("skyhook-jobs", "worker-1");
        assert_ne!(a, b);

        let name = a.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("skyhook-jobs-worker-1-"));
        assert!(name.ends_with(".bin"));
    }
}
