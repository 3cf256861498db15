//! The combiner node.
//!
//! Each source feeds its latest value into one slot. Once every slot has a
//! value, any update recomputes the library list from a consistent snapshot
//! of all slots. Updates that arrive while a recomputation runs are coalesced
//! into the next one.

use crate::outputs::Outputs;
use crate::section::{SectionInputs, build_sections};
use shelf_catalog::{BookOnDisk, Catalog, DownloadModel, FileSystemCapability, Language};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::mpsc;

/// A new value for one of the combiner's inputs.
#[derive(Debug, Clone)]
pub(crate) enum Update {
    Books(Vec<BookOnDisk>),
    Downloads(Vec<DownloadModel>),
    Languages(Vec<Language>),
    Catalog(Arc<Catalog>),
    Filter(String),
    Capability(FileSystemCapability),
}

/// Latest value of every input, once known.
#[derive(Debug, Default)]
pub(crate) struct Slots {
    books: Option<Vec<BookOnDisk>>,
    downloads: Option<Vec<DownloadModel>>,
    languages: Option<Vec<Language>>,
    catalog: Option<Arc<Catalog>>,
    filter: Option<String>,
    capability: Option<FileSystemCapability>,
}

impl Slots {
    /// Slots with the filter seeded to the empty string.
    pub(crate) fn new() -> Self {
        Self { filter: Some(String::new()), ..Self::default() }
    }

    /// Stores `update`, returning `true` if it was a filter change.
    pub(crate) fn apply(&mut self, update: Update) -> bool {
        match update {
            Update::Books(books) => self.books = Some(books),
            Update::Downloads(downloads) => self.downloads = Some(downloads),
            // An empty table means the reconciler has not caught up yet.
            Update::Languages(languages) if languages.is_empty() => {},
            Update::Languages(languages) => self.languages = Some(languages),
            Update::Catalog(catalog) => self.catalog = Some(catalog),
            Update::Filter(filter) => {
                self.filter = Some(filter);
                return true;
            },
            Update::Capability(capability) => self.capability = Some(capability),
        }
        false
    }

    pub(crate) fn inputs(&self) -> Option<SectionInputs<'_>> {
        Some(SectionInputs {
            on_disk: self.books.as_deref()?,
            downloads: self.downloads.as_deref()?,
            languages: self.languages.as_deref()?,
            catalog: self.catalog.as_deref()?,
            filter: self.filter.as_deref()?,
            capability: self.capability?,
        })
    }
}

pub(crate) struct Combiner {
    slots: Slots,
    outputs: Arc<Outputs>,
}

impl Combiner {
    pub(crate) fn new(outputs: Arc<Outputs>) -> Self {
        Self { slots: Slots::new(), outputs }
    }

    /// Runs until every sender is dropped.
    pub(crate) async fn run(mut self, mut updates: mpsc::UnboundedReceiver<Update>) {
        while let Some(update) = updates.recv().await {
            let mut filtered = self.slots.apply(update);
            while let Ok(update) = updates.try_recv() {
                filtered |= self.slots.apply(update);
            }
            if filtered {
                self.outputs.refreshing(true);
            }
            self.recompute();
        }
        tracing::debug!("Combiner inputs closed");
    }

    fn recompute(&self) {
        let Some(inputs) = self.slots.inputs() else {
            return;
        };
        match std::panic::catch_unwind(AssertUnwindSafe(|| build_sections(&inputs))) {
            Ok(Ok(items)) => {
                self.outputs.library_items(items);
                self.outputs.refreshing(false);
            },
            Ok(Err(err)) => tracing::error!(error = ?err, "Could not build the library list; keeping the previous one"),
            Err(_) => tracing::error!("Building the library list panicked; keeping the previous one"),
        }
    }
}
