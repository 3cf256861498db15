//! In-memory collaborators for tests and demos.
//!
//! Every source is backed by a `watch` channel, so streams start with the
//! current value and follow later changes just like a live database would.

use crate::channel::watch_stream;
use crate::error::{Error, ErrorKind, Result};
use crate::fetch::FetchProgress;
use crate::sink::{ErrorSink, TaskKind};
use crate::source::{
    BookStore, CapabilityProber, CatalogClient, CatalogClientHandle, CatalogService, ConnectRequest,
    ConnectivityObserver, DownloadStore, FileSystemScanner, LanguageStore, PreferenceStore, ScanProgress, SourceStream,
};
use async_stream::stream;
use async_trait::async_trait;
use shelf_catalog::{BookOnDisk, Catalog, DownloadModel, FileSystemCapability, Language, NetworkState};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct MockBookStore {
    books: watch::Sender<Vec<BookOnDisk>>,
    inserted: Mutex<Vec<Vec<BookOnDisk>>>,
}

impl MockBookStore {
    pub fn new(books: Vec<BookOnDisk>) -> Self {
        Self { books: watch::channel(books).0, inserted: Mutex::new(Vec::new()) }
    }

    pub fn set(&self, books: Vec<BookOnDisk>) {
        self.books.send_replace(books);
    }

    /// Every batch passed to [`insert`](BookStore::insert), in order.
    pub fn inserted(&self) -> Vec<Vec<BookOnDisk>> {
        lock(&self.inserted).clone()
    }
}

#[async_trait]
impl BookStore for MockBookStore {
    fn books(&self) -> SourceStream<Vec<BookOnDisk>> {
        Box::pin(watch_stream(self.books.subscribe()))
    }

    async fn snapshot(&self) -> Result<Vec<BookOnDisk>> {
        Ok(self.books.borrow().clone())
    }

    async fn insert(&self, books: Vec<BookOnDisk>) -> Result<()> {
        lock(&self.inserted).push(books.clone());
        self.books.send_modify(|stored| stored.extend(books));
        Ok(())
    }
}

pub struct MockDownloadStore {
    downloads: watch::Sender<Vec<DownloadModel>>,
}

impl MockDownloadStore {
    pub fn new(downloads: Vec<DownloadModel>) -> Self {
        Self { downloads: watch::channel(downloads).0 }
    }

    pub fn set(&self, downloads: Vec<DownloadModel>) {
        self.downloads.send_replace(downloads);
    }
}

impl DownloadStore for MockDownloadStore {
    fn downloads(&self) -> SourceStream<Vec<DownloadModel>> {
        Box::pin(watch_stream(self.downloads.subscribe()))
    }
}

pub struct MockLanguageStore {
    table: watch::Sender<Vec<Language>>,
    upserts: AtomicUsize,
}

impl MockLanguageStore {
    pub fn new(table: Vec<Language>) -> Self {
        Self { table: watch::channel(table).0, upserts: AtomicUsize::new(0) }
    }

    pub fn table(&self) -> Vec<Language> {
        self.table.borrow().clone()
    }

    /// Number of times the table was written.
    pub fn upserts(&self) -> usize {
        self.upserts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LanguageStore for MockLanguageStore {
    fn languages(&self) -> SourceStream<Vec<Language>> {
        Box::pin(watch_stream(self.table.subscribe()))
    }

    async fn upsert(&self, languages: Vec<Language>) -> Result<()> {
        self.upserts.fetch_add(1, Ordering::SeqCst);
        self.table.send_replace(languages);
        Ok(())
    }
}

/// Serves a fixed catalog, after an optional run of panics and failures.
///
/// Fetch number `n` (counting from zero across all clients) panics while
/// `n < panics`, fails while `n < panics + failures` and succeeds afterwards.
pub struct MockCatalogService {
    catalog: Catalog,
    panics: usize,
    failures: usize,
    fetches: Arc<AtomicUsize>,
    connects: AtomicUsize,
}

impl MockCatalogService {
    pub fn new(catalog: Catalog) -> Self {
        Self::failing(0, catalog)
    }

    pub fn failing(failures: usize, catalog: Catalog) -> Self {
        Self { catalog, panics: 0, failures, fetches: Arc::default(), connects: AtomicUsize::new(0) }
    }

    pub fn panicking(panics: usize, catalog: Catalog) -> Self {
        Self { panics, ..Self::new(catalog) }
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CatalogService for MockCatalogService {
    async fn content_length(&self, _url: &str) -> Result<u64> {
        Ok(u64::try_from(self.catalog.len()).unwrap_or(u64::MAX).saturating_mul(1024))
    }

    async fn connect(&self, request: ConnectRequest) -> Result<CatalogClientHandle> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        // Stay in flight for a poll so concurrent builds can join this one.
        tokio::task::yield_now().await;
        Ok(Arc::new(MockCatalogClient {
            catalog: self.catalog.clone(),
            panics: self.panics,
            failures: self.failures,
            fetches: self.fetches.clone(),
            progress: request.progress,
        }))
    }
}

struct MockCatalogClient {
    catalog: Catalog,
    panics: usize,
    failures: usize,
    fetches: Arc<AtomicUsize>,
    progress: FetchProgress,
}

#[async_trait]
impl CatalogClient for MockCatalogClient {
    async fn fetch(&self) -> Result<Catalog> {
        let n = self.fetches.fetch_add(1, Ordering::SeqCst);
        if n < self.panics {
            panic!("catalog transport exploded");
        }
        if n < self.panics.saturating_add(self.failures) {
            exn::bail!(ErrorKind::Catalog);
        }
        self.progress.update(self.progress.total().unwrap_or(0));
        Ok(self.catalog.clone())
    }
}

/// Yields a fixed list of books.
///
/// Every scan announces its cancellation token through
/// [`started`](Self::started). A [`blocking`](Self::blocking) scanner then
/// waits for [`release`](Self::release) (or cancellation) before yielding.
pub struct MockScanner {
    books: Vec<BookOnDisk>,
    progress: Vec<(usize, usize)>,
    fail: bool,
    blocking: bool,
    started_tx: mpsc::UnboundedSender<CancellationToken>,
    started_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<CancellationToken>>,
    released: watch::Sender<bool>,
}

impl MockScanner {
    pub fn new(books: Vec<BookOnDisk>) -> Self {
        let (started_tx, started_rx) = mpsc::unbounded_channel();
        Self {
            books,
            progress: Vec::new(),
            fail: false,
            blocking: false,
            started_tx,
            started_rx: tokio::sync::Mutex::new(started_rx),
            released: watch::channel(false).0,
        }
    }

    /// Yields `books`, then fails.
    pub fn failing(books: Vec<BookOnDisk>) -> Self {
        Self { fail: true, ..Self::new(books) }
    }

    pub fn blocking(books: Vec<BookOnDisk>) -> Self {
        Self { blocking: true, ..Self::new(books) }
    }

    /// Progress reports made before any book is yielded.
    pub fn with_progress(mut self, progress: Vec<(usize, usize)>) -> Self {
        self.progress = progress;
        self
    }

    /// Waits for the next scan to start and returns its cancellation token.
    pub async fn started(&self) -> CancellationToken {
        self.started_rx.lock().await.recv().await.unwrap_or_default()
    }

    /// Lets blocked scans (current and future) continue.
    pub fn release(&self) {
        self.released.send_replace(true);
    }
}

async fn released(mut released: watch::Receiver<bool>) {
    while !*released.borrow_and_update() {
        if released.changed().await.is_err() {
            return;
        }
    }
}

impl FileSystemScanner for MockScanner {
    fn scan(&self, progress: ScanProgress, cancel: CancellationToken) -> SourceStream<Result<BookOnDisk>> {
        let (books, reports, fail, blocking) = (self.books.clone(), self.progress.clone(), self.fail, self.blocking);
        let started = self.started_tx.clone();
        let gate = self.released.subscribe();
        Box::pin(stream! {
            if started.send(cancel.clone()).is_err() {
                tracing::debug!("Nobody is waiting for scans to start");
            }
            if blocking {
                tokio::select! {
                    () = cancel.cancelled() => return,
                    () = released(gate) => {},
                }
            }
            for (scanned, total) in reports {
                progress(scanned, total);
            }
            for book in books {
                if cancel.is_cancelled() {
                    return;
                }
                yield Ok(book);
            }
            if fail {
                yield Err(exn::Exn::from(ErrorKind::Scan));
            }
        })
    }
}

pub struct MockCapability {
    capability: watch::Sender<FileSystemCapability>,
}

impl MockCapability {
    pub fn new(capability: FileSystemCapability) -> Self {
        Self { capability: watch::channel(capability).0 }
    }

    pub fn set(&self, capability: FileSystemCapability) {
        self.capability.send_replace(capability);
    }
}

impl CapabilityProber for MockCapability {
    fn capabilities(&self) -> SourceStream<FileSystemCapability> {
        Box::pin(watch_stream(self.capability.subscribe()))
    }
}

pub struct MockConnectivity {
    state: watch::Sender<NetworkState>,
    wifi: AtomicBool,
    stopped: AtomicBool,
}

impl MockConnectivity {
    pub fn new(state: NetworkState, wifi: bool) -> Self {
        Self { state: watch::channel(state).0, wifi: AtomicBool::new(wifi), stopped: AtomicBool::new(false) }
    }

    pub fn set_state(&self, state: NetworkState) {
        self.state.send_replace(state);
    }

    pub fn set_wifi(&self, wifi: bool) {
        self.wifi.store(wifi, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

impl ConnectivityObserver for MockConnectivity {
    fn network_states(&self) -> SourceStream<NetworkState> {
        Box::pin(watch_stream(self.state.subscribe()))
    }

    fn is_wifi(&self) -> bool {
        self.wifi.load(Ordering::SeqCst)
    }

    fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }
}

pub struct MockPreferences {
    wifi_only: watch::Sender<bool>,
}

impl MockPreferences {
    pub fn new(wifi_only: bool) -> Self {
        Self { wifi_only: watch::channel(wifi_only).0 }
    }

    pub fn set_wifi_only(&self, wifi_only: bool) {
        self.wifi_only.send_replace(wifi_only);
    }
}

impl PreferenceStore for MockPreferences {
    fn wifi_only(&self) -> SourceStream<bool> {
        Box::pin(watch_stream(self.wifi_only.subscribe()))
    }
}

/// Records escalated errors.
#[derive(Default)]
pub struct MockErrorSink {
    errors: Mutex<Vec<(TaskKind, String)>>,
}

impl MockErrorSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Escalated tasks with the rendered error.
    pub fn errors(&self) -> Vec<(TaskKind, String)> {
        lock(&self.errors).clone()
    }
}

impl ErrorSink for MockErrorSink {
    fn escalate(&self, task: TaskKind, error: Error) {
        lock(&self.errors).push((task, (*error).to_string()));
    }
}
