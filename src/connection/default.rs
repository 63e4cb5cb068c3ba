//! Point-to-point connection
//!
//! Opens one outbound TCP connection to a fixed host:port per call, writes
//! the assembled payload, flushes and closes. Fire-and-forget: no pooling,
//! no acknowledgement.

use std::io::Write;
use std::net::TcpStream;
use std::time::Duration;

use super::{ensure_request, ensure_response, Connection, RemoteCommand};
use crate::error::Result;

/// Sends each command over a fresh connection to one endpoint.
#[derive(Debug, Clone)]
pub struct DefaultConnection {
    host: String,
    port: u16,
    write_timeout: Duration,
}

impl DefaultConnection {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            write_timeout: Duration::from_secs(30),
        }
    }

    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    fn transmit(&self, payload: &str) -> Result<()> {
        let mut stream = TcpStream::connect((self.host.as_str(), self.port))?;
        stream.set_write_timeout(Some(self.write_timeout))?;
        stream.write_all(payload.as_bytes())?;
        stream.flush()?;
        // Dropping the stream closes the connection.
        Ok(())
    }
}

impl Connection for DefaultConnection {
    fn send_request(&mut self, cmd: &dyn RemoteCommand) -> Result<()> {
        ensure_request(cmd)?;
        let payload = cmd.assemble_request()?;
        tracing::trace!(host = %self.host, port = self.port, bytes = payload.len(), "sending request");
        self.transmit(&payload)
    }

    fn send_response(&mut self, cmd: &dyn RemoteCommand) -> Result<()> {
        ensure_response(cmd)?;
        let payload = cmd.assemble_response()?;
        tracing::trace!(host = %self.host, port = self.port, bytes = payload.len(), "sending response");
        self.transmit(&payload)
    }
}
