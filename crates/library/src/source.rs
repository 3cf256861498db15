//! Collaborators the pipeline consumes.
//!
//! Everything the pipeline reads from or writes to lives behind one of these
//! traits: the persistent stores, the remote catalog, the filesystem, device
//! connectivity and user preferences. Streams returned here are "hot": the
//! first item is the current value, later items are changes.

use crate::error::Result;
use crate::fetch::FetchProgress;
use async_trait::async_trait;
use futures::Stream;
use shelf_catalog::{BookOnDisk, Catalog, DownloadModel, FileSystemCapability, Language, NetworkState};
use std::pin::Pin;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub type SourceStream<T> = Pin<Box<dyn Stream<Item = T> + Send + 'static>>;

/// Called with `(directories scanned, directories discovered)` while a scan
/// walks the filesystem. The total may grow as the walk goes deeper.
pub type ScanProgress = Arc<dyn Fn(usize, usize) + Send + Sync>;

/// Books already stored on the device.
#[async_trait]
pub trait BookStore {
    fn books(&self) -> SourceStream<Vec<BookOnDisk>>;

    /// The currently stored books, read once.
    async fn snapshot(&self) -> Result<Vec<BookOnDisk>>;

    async fn insert(&self, books: Vec<BookOnDisk>) -> Result<()>;
}

/// Downloads that have been requested and not yet removed.
pub trait DownloadStore {
    fn downloads(&self) -> SourceStream<Vec<DownloadModel>>;
}

#[async_trait]
pub trait LanguageStore {
    fn languages(&self) -> SourceStream<Vec<Language>>;

    /// Replaces the stored language table.
    async fn upsert(&self, languages: Vec<Language>) -> Result<()>;
}

/// Everything needed to build a catalog client.
pub struct ConnectRequest {
    pub url: String,
    /// Size of the catalog document, when the probe could find out.
    pub content_length: Option<u64>,
    /// Sink the transport reports received bytes to.
    pub progress: FetchProgress,
}

/// Builds clients for the remote catalog.
#[async_trait]
pub trait CatalogService {
    /// Probes the size of the catalog document without downloading it.
    async fn content_length(&self, url: &str) -> Result<u64>;

    async fn connect(&self, request: ConnectRequest) -> Result<CatalogClientHandle>;
}

#[async_trait]
pub trait CatalogClient {
    /// Downloads and parses the catalog.
    async fn fetch(&self) -> Result<Catalog>;
}

/// Discovers book files on local storage.
pub trait FileSystemScanner {
    /// Walks the filesystem, yielding books as they are found.
    ///
    /// Implementations must stop promptly once `cancel` fires. An `Err` item
    /// aborts the scan it belongs to.
    fn scan(&self, progress: ScanProgress, cancel: CancellationToken) -> SourceStream<Result<BookOnDisk>>;
}

pub trait CapabilityProber {
    fn capabilities(&self) -> SourceStream<FileSystemCapability>;
}

pub trait ConnectivityObserver {
    fn network_states(&self) -> SourceStream<NetworkState>;

    /// Whether the active connection is Wi-Fi right now.
    fn is_wifi(&self) -> bool;

    /// Stops observing; called once when the session shuts down.
    fn stop(&self);
}

pub trait PreferenceStore {
    /// Whether catalog downloads are restricted to Wi-Fi.
    fn wifi_only(&self) -> SourceStream<bool>;
}

pub type BookStoreHandle = Arc<dyn BookStore + Send + Sync>;
pub type DownloadStoreHandle = Arc<dyn DownloadStore + Send + Sync>;
pub type LanguageStoreHandle = Arc<dyn LanguageStore + Send + Sync>;
pub type CatalogServiceHandle = Arc<dyn CatalogService + Send + Sync>;
pub type CatalogClientHandle = Arc<dyn CatalogClient + Send + Sync>;
pub type ScannerHandle = Arc<dyn FileSystemScanner + Send + Sync>;
pub type CapabilityHandle = Arc<dyn CapabilityProber + Send + Sync>;
pub type ConnectivityHandle = Arc<dyn ConnectivityObserver + Send + Sync>;
pub type PreferenceHandle = Arc<dyn PreferenceStore + Send + Sync>;
