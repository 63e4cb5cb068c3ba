//! Command transport: point-to-point, load-balanced and broadcast delivery
//!
//! A [`RemoteCommand`] distinguishes request from response roles and carries
//! an independent wire serialization for each. A [`Connection`] delivers an
//! assembled payload somewhere; every implementation validates the command's
//! role flag against the method before any I/O. Payloads are UTF-8 text
//! written verbatim, the one fixed, process-wide encoding.

use crate::error::{Result, SkyhookError};

mod balancer;
mod default;
mod multicast;

pub use balancer::LoadBalancer;
pub use default::DefaultConnection;
pub use multicast::Multicast;

/// A message moving between endpoints, either as a request or a response.
pub trait RemoteCommand {
    /// Whether this command plays the request role.
    fn is_request(&self) -> bool;

    /// Assemble the request-leg wire payload.
    fn assemble_request(&self) -> Result<String>;

    /// Assemble the response-leg wire payload.
    fn assemble_response(&self) -> Result<String>;
}

/// A plain flag-plus-payload command, sufficient for most control traffic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCommand {
    request: bool,
    payload: String,
}

impl RawCommand {
    pub fn request(payload: impl Into<String>) -> Self {
        Self {
            request: true,
            payload: payload.into(),
        }
    }

    pub fn response(payload: impl Into<String>) -> Self {
        Self {
            request: false,
            payload: payload.into(),
        }
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }
}

impl RemoteCommand for RawCommand {
    fn is_request(&self) -> bool {
        self.request
    }

    fn assemble_request(&self) -> Result<String> {
        Ok(self.payload.clone())
    }

    fn assemble_response(&self) -> Result<String> {
        Ok(self.payload.clone())
    }
}

/// Request/response send contract shared by the whole connection family.
pub trait Connection: Send {
    /// Deliver a request command.
    fn send_request(&mut self, cmd: &dyn RemoteCommand) -> Result<()>;

    /// Deliver a response command.
    fn send_response(&mut self, cmd: &dyn RemoteCommand) -> Result<()>;
}

/// Role check performed before any I/O on the request path.
pub(crate) fn ensure_request(cmd: &dyn RemoteCommand) -> Result<()> {
    if cmd.is_request() {
        Ok(())
    } else {
        Err(SkyhookError::NotARequest)
    }
}

/// Role check performed before any I/O on the response path.
pub(crate) fn ensure_response(cmd: &dyn RemoteCommand) -> Result<()> {
    if cmd.is_request() {
        Err(SkyhookError::NotAResponse)
    } else {
        Ok(())
    }
}
