//! Library Error Types
//!
//! Errors are `exn` trees: collaborators raise their own failures and the
//! pipeline wraps them in one of the kinds below, so the top-level kind says
//! which stage gave up and the children say why.

use crate::sink::TaskKind;
use derive_more::{Display, Error};
use std::io::Error as IoError;

/// A pipeline error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Talking to the remote catalog failed.
    #[display("remote catalog unavailable")]
    Catalog,
    /// A persistent store rejected a read or write.
    #[display("library store error")]
    Store,
    /// Walking the local filesystem failed.
    #[display("scan failed")]
    Scan,
    #[display("I/O error: {_0}")]
    Io(IoError),
    /// Not enough memory to build the library list.
    #[display("ran out of memory while building the library list")]
    Exhausted,
    /// A pipeline task panicked.
    #[display("task {task} panicked: {message}")]
    Panicked {
        #[error(not(source))]
        task: TaskKind,
        #[error(not(source))]
        message: String,
    },
    /// The session was shut down before the request could be handled.
    #[display("library session closed")]
    Closed,
}
impl From<IoError> for ErrorKind {
    fn from(err: IoError) -> Self {
        Self::Io(err)
    }
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Catalog | Self::Store | Self::Io(_) => true,
            Self::Scan | Self::Exhausted | Self::Panicked { .. } | Self::Closed => false,
        }
    }
}
