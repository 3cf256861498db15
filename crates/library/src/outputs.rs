//! Presentation outputs.
//!
//! Every observable value the pipeline produces is a last-value-wins slot
//! (`tokio::sync::watch`); one-shot requests to the presentation layer go
//! through an unbounded channel. Once the session is shut down nothing is
//! published any more.

use crate::fetch::{CatalogProgress, FetchState};
use crate::selection::FileSelectListState;
use shelf_catalog::{BookOnDisk, LibraryListItem, NetworkState};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

/// One-shot requests for the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SideEffect {
    OpenFile(BookOnDisk),
    StartMultiSelection,
    DeleteFiles(Vec<BookOnDisk>),
    ShareFiles(Vec<BookOnDisk>),
    NavigateToDownloads,
    /// Ask the user whether to fetch the catalog without Wi-Fi.
    ShowWifiOnlyDialog,
}

/// Receiving ends of everything a [`LibrarySession`](crate::LibrarySession)
/// publishes.
pub struct LibraryView {
    pub library_items: watch::Receiver<Vec<LibraryListItem>>,
    pub file_select: watch::Receiver<FileSelectListState>,
    /// Percentage of the running rescan, `0..=100`.
    pub scan_progress: watch::Receiver<u8>,
    /// `true` between a filter change and the list it produces.
    pub refreshing: watch::Receiver<bool>,
    pub catalog_progress: watch::Receiver<CatalogProgress>,
    pub fetch_state: watch::Receiver<FetchState>,
    pub network_state: watch::Receiver<NetworkState>,
    pub side_effects: mpsc::UnboundedReceiver<SideEffect>,
}

pub(crate) struct Outputs {
    token: CancellationToken,
    library_items: watch::Sender<Vec<LibraryListItem>>,
    file_select: watch::Sender<FileSelectListState>,
    scan_progress: watch::Sender<u8>,
    refreshing: watch::Sender<bool>,
    catalog_progress: watch::Sender<CatalogProgress>,
    fetch_state: watch::Sender<FetchState>,
    network_state: watch::Sender<NetworkState>,
    side_effects: mpsc::UnboundedSender<SideEffect>,
}

impl Outputs {
    pub(crate) fn new(token: CancellationToken) -> (Arc<Self>, LibraryView) {
        let (library_items, library_items_rx) = watch::channel(Vec::new());
        let (file_select, file_select_rx) = watch::channel(FileSelectListState::default());
        let (scan_progress, scan_progress_rx) = watch::channel(0);
        let (refreshing, refreshing_rx) = watch::channel(false);
        let (catalog_progress, catalog_progress_rx) = watch::channel(CatalogProgress::default());
        let (fetch_state, fetch_state_rx) = watch::channel(FetchState::default());
        let (network_state, network_state_rx) = watch::channel(NetworkState::default());
        let (side_effects, side_effects_rx) = mpsc::unbounded_channel();
        let outputs = Arc::new(Self {
            token,
            library_items,
            file_select,
            scan_progress,
            refreshing,
            catalog_progress,
            fetch_state,
            network_state,
            side_effects,
        });
        let view = LibraryView {
            library_items: library_items_rx,
            file_select: file_select_rx,
            scan_progress: scan_progress_rx,
            refreshing: refreshing_rx,
            catalog_progress: catalog_progress_rx,
            fetch_state: fetch_state_rx,
            network_state: network_state_rx,
            side_effects: side_effects_rx,
        };
        (outputs, view)
    }

    pub(crate) fn is_live(&self) -> bool {
        !self.token.is_cancelled()
    }

    pub(crate) fn library_items(&self, items: Vec<LibraryListItem>) {
        if self.is_live() {
            self.library_items.send_replace(items);
        }
    }

    pub(crate) fn scan_progress(&self, percent: u8) {
        if self.is_live() {
            self.scan_progress.send_replace(percent.min(100));
        }
    }

    pub(crate) fn refreshing(&self, refreshing: bool) {
        if self.is_live() {
            self.refreshing.send_replace(refreshing);
        }
    }

    pub(crate) fn catalog_progress(&self, progress: CatalogProgress) {
        if self.is_live() {
            self.catalog_progress.send_replace(progress);
        }
    }

    pub(crate) fn fetch_state(&self, state: FetchState) {
        if self.is_live() {
            self.fetch_state.send_replace(state);
        }
    }

    pub(crate) fn network_state(&self, state: NetworkState) {
        if self.is_live() {
            self.network_state.send_replace(state);
        }
    }

    pub(crate) fn side_effect(&self, effect: SideEffect) {
        if self.is_live() && self.side_effects.send(effect).is_err() {
            tracing::debug!("Side effect dropped; nobody is listening");
        }
    }

    /// Atomically updates the selection state. `f` returns whether it changed
    /// anything, plus a value handed back to the caller.
    pub(crate) fn modify_selection<R>(&self, f: impl FnOnce(&mut FileSelectListState) -> (bool, R)) -> Option<R> {
        if !self.is_live() {
            return None;
        }
        let mut output = None;
        self.file_select.send_if_modified(|state| {
            let (changed, value) = f(state);
            output = Some(value);
            changed
        });
        output
    }

    pub(crate) fn selection(&self) -> FileSelectListState {
        self.file_select.borrow().clone()
    }
}
