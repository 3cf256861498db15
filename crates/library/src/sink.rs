//! Where errors go that the pipeline cannot handle itself.

use crate::error::Error;
use derive_more::Display;

/// The long-running tasks of a session.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    #[display("books")]
    Books,
    #[display("downloads")]
    Downloads,
    #[display("languages")]
    Languages,
    #[display("language-sync")]
    LanguageSync,
    /// The catalog fetch controller.
    #[display("catalog")]
    Catalog,
    /// Forwards published catalogs into the combiner.
    #[display("catalog-feed")]
    CatalogFeed,
    #[display("capability")]
    Capability,
    #[display("network")]
    Network,
    #[display("combiner")]
    Combiner,
    #[display("rescan")]
    Rescan,
}

/// Receives failures that escaped a session task.
///
/// A panicking catalog task is restarted with an empty catalog published in
/// its place. Its panic only reaches the sink once it has been restarted three
/// times in a row. Every other failure goes straight here.
pub trait ErrorSink {
    fn escalate(&self, task: TaskKind, error: Error);
}

/// Logs escalated errors at `error` level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingErrorSink;

impl ErrorSink for TracingErrorSink {
    fn escalate(&self, task: TaskKind, error: Error) {
        tracing::error!(task = %task, error = ?error, "Library task failed");
    }
}
