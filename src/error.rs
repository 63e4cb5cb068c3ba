/*!
 * Error types for skyhook
 */

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SkyhookError>;

#[derive(Error, Debug)]
pub enum SkyhookError {
    /// No transport session was supplied before starting a dispatch.
    #[error("No transport session available, aborting")]
    MissingSession,

    /// Writing the serialized job batch failed.
    #[error("Failed to serialize job batch to '{path}': {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: bincode::Error,
    },

    /// Reading a serialized job batch back failed.
    #[error("Failed to deserialize job batch from '{path}': {source}")]
    Deserialize {
        path: PathBuf,
        #[source]
        source: bincode::Error,
    },

    /// Copying the handoff file to the other side failed.
    #[error("Failed to copy serialized job batch to {host}:{port}: {message}")]
    Transfer {
        host: String,
        port: u16,
        message: String,
    },

    /// The result file did not appear within the configured maximum wait.
    #[error("Max wait reached ({msec}msec)")]
    MaxWaitReached { msec: i64 },

    /// The result file was still being written after all re-check attempts.
    #[error("File '{path}' is still in use after {attempts} * {interval_msec}msec")]
    FileInUse {
        path: PathBuf,
        attempts: u32,
        interval_msec: u64,
    },

    /// A dropped batch file carries no embedded return address.
    #[error("Batch file carries no return address")]
    NoReturnAddress,

    /// A response command was handed to a request-sending method.
    #[error("Command is not a request")]
    NotARequest,

    /// A request command was handed to a response-sending method.
    #[error("Command is not a response")]
    NotAResponse,

    /// A connection list was empty at dispatch time.
    #[error("No connections available")]
    NoConnections,

    /// Aggregated per-connection failures from a broadcast, tagged by
    /// 1-based position in the connection list.
    #[error("{0}")]
    Fanout(String),

    /// A command failed to assemble its wire payload.
    #[error("Failed to assemble command: {0}")]
    Command(String),

    /// Invalid "hostname:port" descriptor.
    #[error("Invalid host:port descriptor '{0}'")]
    InvalidHostPort(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl SkyhookError {
    /// Check if this error halts the owning component (no retry, no salvage).
    pub fn is_fatal(&self) -> bool {
        match self {
            // Setup, timeout and codec errors halt the component.
            SkyhookError::MissingSession
            | SkyhookError::Serialize { .. }
            | SkyhookError::Deserialize { .. }
            | SkyhookError::MaxWaitReached { .. }
            | SkyhookError::FileInUse { .. }
            | SkyhookError::NoReturnAddress
            | SkyhookError::NoConnections
            | SkyhookError::Config(_) => true,

            // Transfer errors may degrade to local execution instead.
            SkyhookError::Transfer { .. } => false,

            // Pre-transmission command validation; caller can fix and resend.
            SkyhookError::NotARequest
            | SkyhookError::NotAResponse
            | SkyhookError::Command(_)
            | SkyhookError::InvalidHostPort(_) => false,

            // Individually non-fatal by contract.
            SkyhookError::Fanout(_) => false,

            SkyhookError::Io(_) | SkyhookError::Other(_) => false,
        }
    }
}
