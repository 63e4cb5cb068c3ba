//! Broadcast fan-out over an ordered connection list
//!
//! Every call iterates the full list unconditionally; a failing connection
//! never short-circuits delivery to the rest. Failures are collected, tagged
//! by 1-based position, and surfaced as one combined error.

use super::{ensure_request, ensure_response, Connection, RemoteCommand};
use crate::error::{Result, SkyhookError};

/// Best-effort broadcast to every sub-connection.
pub struct Multicast {
    connections: Vec<Box<dyn Connection>>,
}

enum Role {
    Request,
    Response,
}

impl Multicast {
    pub fn new(connections: Vec<Box<dyn Connection>>) -> Self {
        Self { connections }
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    fn fan_out(&mut self, cmd: &dyn RemoteCommand, role: Role) -> Result<()> {
        if self.connections.is_empty() {
            return Err(SkyhookError::NoConnections);
        }

        let mut failures = Vec::new();
        for (index, connection) in self.connections.iter_mut().enumerate() {
            let outcome = match role {
                Role::Request => connection.send_request(cmd),
                Role::Response => connection.send_response(cmd),
            };
            if let Err(e) = outcome {
                failures.push(format!("#{}: {}", index + 1, e));
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(SkyhookError::Fanout(failures.join(", ")))
        }
    }
}

impl Connection for Multicast {
    fn send_request(&mut self, cmd: &dyn RemoteCommand) -> Result<()> {
        ensure_request(cmd)?;
        self.fan_out(cmd, Role::Request)
    }

    fn send_response(&mut self, cmd: &dyn RemoteCommand) -> Result<()> {
        ensure_response(cmd)?;
        self.fan_out(cmd, Role::Response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::testing::RecordingConnection;
    use crate::connection::RawCommand;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_all_connections_receive_every_call() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let connections: Vec<Box<dyn Connection>> = vec![
            Box::new(RecordingConnection::new("A", Arc::clone(&log))),
            Box::new(RecordingConnection::new("B", Arc::clone(&log))),
            Box::new(RecordingConnection::new("C", Arc::clone(&log))),
        ];
        let mut multicast = Multicast::new(connections);

        multicast.send_request(&RawCommand::request("r")).unwrap();
        let labels: Vec<String> = log.lock().unwrap().iter().map(|e| e.0.clone()).collect();
        assert_eq!(labels, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_failure_does_not_short_circuit() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let connections: Vec<Box<dyn Connection>> = vec![
            Box::new(RecordingConnection::new("A", Arc::clone(&log))),
            Box::new(RecordingConnection::failing(
                "B",
                "connection refused",
                Arc::clone(&log),
            )),
            Box::new(RecordingConnection::new("C", Arc::clone(&log))),
        ];
        let mut multicast = Multicast::new(connections);

        let err = multicast.send_request(&RawCommand::request("r")).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("#2"), "got: {}", message);
        assert!(message.contains("connection refused"), "got: {}", message);
        assert!(!message.contains("#1"), "got: {}", message);

        // A and C were still invoked despite B's failure.
        let labels: Vec<String> = log.lock().unwrap().iter().map(|e| e.0.clone()).collect();
        assert_eq!(labels, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_empty_list_fails_fast() {
        let mut multicast = Multicast::new(Vec::new());
        let err = multicast.send_request(&RawCommand::request("r")).unwrap_err();
        assert!(matches!(err, SkyhookError::NoConnections));
    }

    #[test]
    fn test_role_mismatch_checked_before_fan_out() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let connections: Vec<Box<dyn Connection>> =
            vec![Box::new(RecordingConnection::new("A", Arc::clone(&log)))];
        let mut multicast = Multicast::new(connections);

        let err = multicast
            .send_request(&RawCommand::response("pong"))
            .unwrap_err();
        assert!(matches!(err, SkyhookError::NotARequest));
        assert!(log.lock().unwrap().is_empty());
    }
}
