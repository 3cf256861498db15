//! Merges books on disk, active downloads, the remote catalog and the language
//! table into one sectioned list, and tracks selection over the books on disk.
//!
//! A [`LibrarySession`] owns the background tasks. Its results are read from
//! the [`LibraryView`] returned alongside it.

mod channel;
mod combine;
pub mod error;
pub mod fetch;
pub mod language;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
mod outputs;
pub mod scan;
pub mod section;
pub mod selection;
mod session;
pub mod sink;
pub mod source;

pub use crate::fetch::{CatalogProgress, FetchProgress, FetchState};
pub use crate::language::reconcile;
pub use crate::outputs::{LibraryView, SideEffect};
pub use crate::scan::DirectoryScanner;
pub use crate::section::{SectionInputs, build_sections};
pub use crate::selection::{FileSelectAction, FileSelectListState, SelectionMode, reduce};
pub use crate::session::{Collaborators, ErrorSinkHandle, LibrarySession, SessionOptions};
pub use crate::sink::{ErrorSink, TaskKind, TracingErrorSink};
