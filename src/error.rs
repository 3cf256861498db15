//! CLI Error Types

use derive_more::{Display, Error};

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// An input file could not be read or parsed.
    #[display("could not load {_0}")]
    Input(#[error(not(source))] String),
    #[display("invalid value for --{_0}")]
    Argument(#[error(not(source))] &'static str),
    #[display("invalid configuration")]
    Config,
    /// The library pipeline rejected a request.
    #[display("library pipeline failed")]
    Library,
    #[display("timed out waiting for {_0}")]
    Timeout(#[error(not(source))] &'static str),
    #[display("could not write output")]
    Output,
}

impl ErrorKind {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}
