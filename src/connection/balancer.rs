//! Round-robin fan-out over an ordered connection list
//!
//! Requests and responses rotate through independent cursors, so a request
//! and the response for the same logical exchange may land on different
//! physical connections. Cursors are mutated without internal
//! synchronization; one caller context owns an instance at a time.

use super::{Connection, RemoteCommand};
use crate::error::{Result, SkyhookError};

/// Distributes commands across sub-connections, round-robin.
pub struct LoadBalancer {
    connections: Vec<Box<dyn Connection>>,
    next_request: usize,
    next_response: usize,
}

impl LoadBalancer {
    pub fn new(connections: Vec<Box<dyn Connection>>) -> Self {
        Self {
            connections,
            next_request: 0,
            next_response: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

impl Connection for LoadBalancer {
    fn send_request(&mut self, cmd: &dyn RemoteCommand) -> Result<()> {
        if self.connections.is_empty() {
            return Err(SkyhookError::NoConnections);
        }
        let index = self.next_request;
        let result = self.connections[index].send_request(cmd);
        // Advance after dispatch, success or not; errors propagate directly.
        self.next_request = (index + 1) % self.connections.len();
        result
    }

    fn send_response(&mut self, cmd: &dyn RemoteCommand) -> Result<()> {
        if self.connections.is_empty() {
            return Err(SkyhookError::NoConnections);
        }
        let index = self.next_response;
        let result = self.connections[index].send_response(cmd);
        self.next_response = (index + 1) % self.connections.len();
        result
    }
}
