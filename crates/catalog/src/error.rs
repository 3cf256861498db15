//! Catalog Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A catalog model error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for catalog model operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The language code is not part of the known locale table.
    #[display("unknown language code: {_0}")]
    UnknownLanguage(#[error(not(source))] String),
    /// A value could not be parsed into a model type.
    #[display("failed to parse field '{field}', found value: {value}")]
    ParseError {
        /// The field that failed to parse.
        field: &'static str,
        /// The offending input.
        value: String,
    },
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // Model values are either valid or they are not.
        false
    }
}
