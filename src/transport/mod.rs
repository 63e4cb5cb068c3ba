//! Transport sessions: the one-way file-copy channel
//!
//! A [`TransportSession`] is an already-authenticated channel that can copy a
//! local file to a path on the other side, plus the host/port identity of
//! that side. Establishing and authenticating the channel is the caller's
//! responsibility; the dispatch protocol only uses it.

use std::path::Path;

use crate::error::Result;

mod local;
pub use local::LocalSession;

#[cfg(feature = "ssh")]
mod ssh;
#[cfg(feature = "ssh")]
pub use ssh::ScpSession;

/// An established file-copy channel to one endpoint.
pub trait TransportSession: Send {
    /// Host name/IP of the endpoint this session reaches.
    fn host(&self) -> &str;

    /// Port of the endpoint this session reaches.
    fn port(&self) -> u16;

    /// Copy `local` to `remote` on the other side. Best effort, no
    /// acknowledgement beyond the error result.
    fn copy_to(&mut self, local: &Path, remote: &Path) -> Result<()>;
}
