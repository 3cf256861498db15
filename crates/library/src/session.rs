//! A running library pipeline.
//!
//! [`LibrarySession::start`] wires the collaborators into a set of background
//! tasks:
//!
//! - one forwarder per source, feeding the combiner;
//! - the combiner, which publishes the library list;
//! - the catalog fetch controller;
//! - the language table reconciler;
//! - the rescan driver;
//! - the network state publisher.
//!
//! Every task runs under a supervisor. A panicking catalog task is replaced
//! by an empty catalog and restarted, so the library list stays up; a fourth
//! panic in a row is escalated. Any other panic goes to the [`ErrorSink`]. Shutting the session down (or dropping it)
//! cancels all tasks, after which nothing is published any more.

use crate::channel::{receiver_stream, watch_stream};
use crate::combine::{Combiner, Update};
use crate::error::{ErrorKind, Result};
use crate::fetch::CatalogFetcher;
use crate::language::sync_languages;
use crate::outputs::{LibraryView, Outputs};
use crate::scan::Rescanner;
use crate::selection::{FileSelectAction, FileSelectListState, SelectionMachine};
use crate::sink::{ErrorSink, TaskKind};
use crate::source::{
    BookStoreHandle, CapabilityHandle, CatalogServiceHandle, ConnectivityHandle, DownloadStoreHandle,
    LanguageStoreHandle, PreferenceHandle, ScannerHandle, SourceStream,
};
use futures::{FutureExt, StreamExt, future};
use shelf_catalog::{Catalog, Language, NetworkState};
use shelf_config::Config;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::AbortHandle;
use tokio_util::sync::CancellationToken;

/// How many times in a row a panicking catalog task is restarted before the
/// panic is escalated instead.
const MAX_CATALOG_RESTARTS: u32 = 3;

pub type ErrorSinkHandle = Arc<dyn ErrorSink + Send + Sync>;

/// Everything a session reads from and writes to.
#[derive(Clone)]
pub struct Collaborators {
    pub books: BookStoreHandle,
    pub downloads: DownloadStoreHandle,
    pub languages: LanguageStoreHandle,
    pub catalog: CatalogServiceHandle,
    pub scanner: ScannerHandle,
    pub capability: CapabilityHandle,
    pub connectivity: ConnectivityHandle,
    pub preferences: PreferenceHandle,
    pub errors: ErrorSinkHandle,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    pub catalog_url: String,
    /// Total catalog fetch attempts per trigger.
    pub attempts: u32,
    /// Row used when there is neither a catalog nor a language table.
    pub default_language: Language,
}

impl SessionOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            catalog_url: config.catalog.url(),
            attempts: config.catalog.attempts,
            default_language: Language::new(config.default_locale().iso3, true, 1),
        }
    }
}

pub struct LibrarySession {
    token: CancellationToken,
    tasks: Vec<AbortHandle>,
    updates: mpsc::UnboundedSender<Update>,
    catalog_requests: watch::Sender<u64>,
    rescans: mpsc::UnboundedSender<()>,
    selection: SelectionMachine,
    connectivity: ConnectivityHandle,
}

impl LibrarySession {
    /// Starts the pipeline. Must be called from within a Tokio runtime.
    ///
    /// The catalog counts as requested from the start; it is fetched as soon
    /// as the device is connected (and, off Wi-Fi, allowed to).
    pub fn start(collaborators: Collaborators, options: SessionOptions) -> (Self, LibraryView) {
        let token = CancellationToken::new();
        let (outputs, view) = Outputs::new(token.clone());
        let (updates, updates_rx) = mpsc::unbounded_channel();
        let (catalog_tx, catalog_rx) = watch::channel(None::<Arc<Catalog>>);
        let (catalog_requests, requests_rx) = watch::channel(0_u64);
        let (rescans, rescans_rx) = mpsc::unbounded_channel();
        let selection = SelectionMachine::new(outputs.clone());
        let supervisor =
            Supervisor { token: token.clone(), errors: collaborators.errors.clone(), catalog: catalog_tx.clone() };
        tracing::debug!(url = %options.catalog_url, attempts = options.attempts, "Starting library session");

        let fetcher = Arc::new(CatalogFetcher::new(
            collaborators.catalog.clone(),
            collaborators.connectivity.clone(),
            collaborators.preferences.clone(),
            outputs.clone(),
            catalog_tx,
            options.catalog_url,
            options.attempts,
        ));
        let catalogs = watch_stream(catalog_rx.clone()).filter_map(future::ready);

        let tasks = vec![
            supervisor.spawn(TaskKind::Combiner, Combiner::new(outputs.clone()).run(updates_rx)),
            supervisor.spawn(
                TaskKind::Books,
                forward_books(collaborators.books.books(), updates.clone(), selection.clone()),
            ),
            supervisor.spawn(
                TaskKind::Downloads,
                forward(TaskKind::Downloads, collaborators.downloads.downloads(), updates.clone(), Update::Downloads),
            ),
            supervisor.spawn(
                TaskKind::Languages,
                forward(TaskKind::Languages, collaborators.languages.languages(), updates.clone(), Update::Languages),
            ),
            supervisor.spawn(
                TaskKind::Capability,
                forward(
                    TaskKind::Capability,
                    collaborators.capability.capabilities(),
                    updates.clone(),
                    Update::Capability,
                ),
            ),
            supervisor.spawn(
                TaskKind::CatalogFeed,
                forward(TaskKind::CatalogFeed, Box::pin(catalogs), updates.clone(), Update::Catalog),
            ),
            supervisor.spawn(
                TaskKind::LanguageSync,
                sync_languages(catalog_rx, collaborators.languages.clone(), options.default_language),
            ),
            supervisor.spawn(
                TaskKind::Network,
                publish_network(collaborators.connectivity.network_states(), outputs.clone()),
            ),
            supervisor.spawn(
                TaskKind::Rescan,
                Rescanner::new(collaborators.scanner.clone(), collaborators.books.clone(), outputs.clone())
                    .run(receiver_stream(rescans_rx)),
            ),
            supervisor.spawn_restarting(TaskKind::Catalog, move || fetcher.clone().run(requests_rx.clone())),
        ];

        let session = Self {
            token,
            tasks,
            updates,
            catalog_requests,
            rescans,
            selection,
            connectivity: collaborators.connectivity,
        };
        (session, view)
    }

    /// Asks for the remote catalog to be fetched again.
    pub fn request_catalog(&self) -> Result<()> {
        self.ensure_live()?;
        self.catalog_requests.send_modify(|requests| *requests = requests.wrapping_add(1));
        Ok(())
    }

    /// Filters the library list by the words in `filter`.
    pub fn set_filter(&self, filter: impl Into<String>) -> Result<()> {
        self.ensure_live()?;
        self.updates.send(Update::Filter(filter.into())).map_err(|_| ErrorKind::Closed)?;
        Ok(())
    }

    /// Scans the filesystem for books, cancelling any scan still running.
    pub fn request_rescan(&self) -> Result<()> {
        self.ensure_live()?;
        self.rescans.send(()).map_err(|_| ErrorKind::Closed)?;
        Ok(())
    }

    pub fn dispatch(&self, action: FileSelectAction) -> Result<()> {
        self.ensure_live()?;
        self.selection.dispatch(action);
        Ok(())
    }

    pub fn selection(&self) -> FileSelectListState {
        self.selection.current()
    }

    pub fn is_shut_down(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Stops every task and the connectivity observer. Idempotent.
    pub fn shutdown(&mut self) {
        if self.token.is_cancelled() {
            return;
        }
        tracing::debug!(tasks = self.tasks.len(), "Shutting down library session");
        self.token.cancel();
        for task in self.tasks.drain(..) {
            task.abort();
        }
        self.connectivity.stop();
    }

    fn ensure_live(&self) -> Result<()> {
        if self.token.is_cancelled() {
            exn::bail!(ErrorKind::Closed);
        }
        Ok(())
    }
}

impl Drop for LibrarySession {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[derive(Clone)]
struct Supervisor {
    token: CancellationToken,
    errors: ErrorSinkHandle,
    catalog: watch::Sender<Option<Arc<Catalog>>>,
}

impl Supervisor {
    fn spawn<F>(&self, task: TaskKind, future: F) -> AbortHandle
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let this = self.clone();
        tokio::spawn(async move {
            tokio::select! {
                () = this.token.cancelled() => {},
                result = AssertUnwindSafe(future).catch_unwind() => {
                    if let Err(panic) = result {
                        this.escalate(task, &*panic);
                    }
                },
            }
        })
        .abort_handle()
    }

    /// Like [`spawn`](Self::spawn), but a panic publishes an empty catalog and
    /// starts a fresh instance of the task.
    fn spawn_restarting<F, Fut>(&self, task: TaskKind, make: F) -> AbortHandle
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let this = self.clone();
        tokio::spawn(async move {
            let mut restarts = 0;
            loop {
                let result = tokio::select! {
                    () = this.token.cancelled() => return,
                    result = AssertUnwindSafe(make()).catch_unwind() => result,
                };
                let Err(panic) = result else {
                    return;
                };
                if restarts >= MAX_CATALOG_RESTARTS {
                    this.escalate(task, &*panic);
                    return;
                }
                restarts += 1;
                tracing::warn!(
                    task = %task,
                    restarts,
                    message = %panic_message(&*panic),
                    "Task broke; publishing an empty catalog and restarting it"
                );
                if !this.token.is_cancelled() {
                    this.catalog.send_replace(Some(Arc::new(Catalog::empty())));
                }
            }
        })
        .abort_handle()
    }

    fn escalate(&self, task: TaskKind, panic: &(dyn Any + Send)) {
        if self.token.is_cancelled() {
            return;
        }
        let error = exn::Exn::from(ErrorKind::Panicked { task, message: panic_message(panic) });
        self.errors.escalate(task, error);
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|message| (*message).to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

async fn forward<T>(
    task: TaskKind,
    mut source: SourceStream<T>,
    updates: mpsc::UnboundedSender<Update>,
    wrap: fn(T) -> Update,
) {
    while let Some(value) = source.next().await {
        if updates.send(wrap(value)).is_err() {
            return;
        }
    }
    tracing::debug!(task = %task, "Source closed");
}

async fn forward_books(
    mut books: SourceStream<Vec<shelf_catalog::BookOnDisk>>,
    updates: mpsc::UnboundedSender<Update>,
    selection: SelectionMachine,
) {
    while let Some(mut books) = books.next().await {
        books.sort_by(|a, b| a.title().cmp(b.title()));
        selection.regenerate(books.clone());
        if updates.send(Update::Books(books)).is_err() {
            return;
        }
    }
    tracing::debug!(task = %TaskKind::Books, "Source closed");
}

async fn publish_network(mut states: SourceStream<NetworkState>, outputs: Arc<Outputs>) {
    while let Some(state) = states.next().await {
        tracing::debug!(?state, "Network state changed");
        outputs.network_state(state);
    }
}
