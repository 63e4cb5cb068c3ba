/*!
 * Configuration types for skyhook
 */

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Result, SkyhookError};
use crate::net::{resolve_local_host, HostPort};

/// Configuration for a remote dispatch round trip.
///
/// The origin serializes unexecuted jobs, drops them at `remote_file` through
/// the transport session, and then waits for the executed batch to appear at
/// `local_file`. The remote side uses `local_host`/`local_port` to address the
/// origin when shipping results back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Path on the remote host where the unexecuted batch is dropped
    pub remote_file: PathBuf,

    /// Local path where the executed batch is expected to appear
    pub local_file: PathBuf,

    /// Host name/IP the remote side connects back to (empty = auto-detect)
    #[serde(default)]
    pub local_host: String,

    /// Port the remote side uses when sending back the executed jobs
    #[serde(default = "default_local_port")]
    pub local_port: u16,

    /// Maximum time in milliseconds to wait for the result file (-1 = unbounded)
    #[serde(default = "default_max_wait")]
    pub max_wait_msec: i64,

    /// Number of "file still in use" re-check attempts once the result file exists
    #[serde(default = "default_num_attempts")]
    pub num_attempts: u32,

    /// Delay in milliseconds between re-check attempts
    #[serde(default = "default_attempt_interval")]
    pub attempt_interval_msec: u64,

    /// Execute jobs locally when the transfer to the remote host fails
    #[serde(default)]
    pub allow_local_execution: bool,
}

fn default_local_port() -> u16 {
    22
}

fn default_max_wait() -> i64 {
    -1
}

fn default_num_attempts() -> u32 {
    10
}

fn default_attempt_interval() -> u64 {
    100
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            remote_file: PathBuf::from("."),
            local_file: PathBuf::from("."),
            local_host: String::new(),
            local_port: default_local_port(),
            max_wait_msec: default_max_wait(),
            num_attempts: default_num_attempts(),
            attempt_interval_msec: default_attempt_interval(),
            allow_local_execution: false,
        }
    }
}

impl DispatchConfig {
    /// Validate field ranges before any job is touched.
    pub fn validate(&self) -> Result<()> {
        if self.num_attempts < 1 {
            return Err(SkyhookError::Config(
                "num_attempts must be at least 1".to_string(),
            ));
        }
        if self.attempt_interval_msec < 1 {
            return Err(SkyhookError::Config(
                "attempt_interval_msec must be at least 1".to_string(),
            ));
        }
        if self.max_wait_msec < -1 {
            return Err(SkyhookError::Config(
                "max_wait_msec must be -1 (unbounded) or non-negative".to_string(),
            ));
        }
        Ok(())
    }

    /// The inter-attempt delay as a `Duration`.
    pub fn attempt_interval(&self) -> Duration {
        Duration::from_millis(self.attempt_interval_msec)
    }

    /// The endpoint the remote side ships results back to, auto-detecting
    /// the host when `local_host` is blank.
    pub fn local_endpoint(&self) -> HostPort {
        HostPort::new(resolve_local_host(&self.local_host), self.local_port)
    }

    /// The maximum wait as a `Duration`, `None` when unbounded.
    pub fn max_wait(&self) -> Option<Duration> {
        if self.max_wait_msec < 0 {
            None
        } else {
            Some(Duration::from_millis(self.max_wait_msec as u64))
        }
    }
}
