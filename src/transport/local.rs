//! Shared-filesystem transport
//!
//! Treats the "remote" path as locally reachable: a mounted share, a drop
//! directory watched by another process, or a test tempdir. The staged
//! write-then-rename keeps the single-writer-then-single-reader handoff
//! intact: the destination file appears atomically, never half-written.

use std::fs;
use std::path::Path;

use super::TransportSession;
use crate::error::{Result, SkyhookError};

/// Transport session over a locally reachable destination path.
#[derive(Debug, Clone)]
pub struct LocalSession {
    host: String,
    port: u16,
}

impl LocalSession {
    pub fn new() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 22,
        }
    }

    /// Label the session with the endpoint it stands in for; only affects
    /// handoff filenames and error messages.
    pub fn with_identity(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl Default for LocalSession {
    fn default() -> Self {
        Self::new()
    }
}

impl TransportSession for LocalSession {
    fn host(&self) -> &str {
        &self.host
    }

    fn port(&self) -> u16 {
        self.port
    }

    fn copy_to(&mut self, local: &Path, remote: &Path) -> Result<()> {
        let stage = || -> std::io::Result<()> {
            if let Some(parent) = remote.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent)?;
                }
            }
            let staged = remote.with_extension("part");
            fs::copy(local, &staged)?;
            fs::rename(&staged, remote)?;
            Ok(())
        };

        stage().map_err(|e| SkyhookError::Transfer {
            host: self.host.clone(),
            port: self.port,
            message: e.to_string(),
        })
    }
}
