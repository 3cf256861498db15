//! Domain model for the shelf library.
//!
//! Everything the reconciliation pipeline passes around lives here: catalog
//! [`Book`](models::Book)s, the local [`BookOnDisk`](models::BookOnDisk)
//! records, in-flight [`DownloadModel`](models::DownloadModel)s, the
//! [`Language`](models::Language) preference table and the
//! [`LibraryListItem`](models::LibraryListItem)s that end up on screen.
//!
//! The types are plain values. Nothing in this crate performs I/O.

pub mod error;
pub mod models;

pub use crate::models::{
    Book, BookItem, BookOnDisk, Catalog, DownloadModel, DownloadStatus, FileSystemCapability, ItemId, Language,
    LibraryListItem, Locale, NetworkState, Section,
};
