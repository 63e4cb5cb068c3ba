//! SCP transport over an established ssh2 session
//!
//! The session must already be connected and authenticated; skyhook treats
//! authentication as someone else's problem by design.

use std::fs::File;
use std::io;
use std::path::Path;

use ssh2::Session;

use super::TransportSession;
use crate::error::{Result, SkyhookError};

/// Transport session copying files via SCP.
pub struct ScpSession {
    host: String,
    port: u16,
    session: Session,
}

impl ScpSession {
    /// Wrap an authenticated `ssh2::Session` reaching `host:port`.
    pub fn new(host: impl Into<String>, port: u16, session: Session) -> Self {
        Self {
            host: host.into(),
            port,
            session,
        }
    }

    fn scp_copy(&self, local: &Path, remote: &Path) -> std::result::Result<(), String> {
        let mut source = File::open(local).map_err(|e| e.to_string())?;
        let size = source.metadata().map_err(|e| e.to_string())?.len();

        let mut channel = self
            .session
            .scp_send(remote, 0o644, size, None)
            .map_err(|e| e.to_string())?;
        io::copy(&mut source, &mut channel).map_err(|e| e.to_string())?;
        channel.send_eof().map_err(|e| e.to_string())?;
        channel.wait_eof().map_err(|e| e.to_string())?;
        channel.close().map_err(|e| e.to_string())?;
        channel.wait_close().map_err(|e| e.to_string())?;
        Ok(())
    }
}

impl TransportSession for ScpSession {
    fn host(&self) -> &str {
        &self.host
    }

    fn port(&self) -> u16 {
        self.port
    }

    fn copy_to(&mut self, local: &Path, remote: &Path) -> Result<()> {
        tracing::debug!(
            host = %self.host,
            port = self.port,
            remote = %remote.display(),
            "scp'ing file to remote host"
        );
        self.scp_copy(local, remote)
            .map_err(|message| SkyhookError::Transfer {
                host: self.host.clone(),
                port: self.port,
                message,
            })
    }
}
