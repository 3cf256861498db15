//! Filesystem rescans.
//!
//! Every rescan request starts a new scan and cancels the one before it. A
//! scan publishes its progress, then inserts the books it found that the book
//! store does not know about yet.

mod directory;

pub use self::directory::DirectoryScanner;
use crate::outputs::Outputs;
use crate::source::{BookStoreHandle, ScanProgress, ScannerHandle};
use async_stream::stream;
use futures::{Stream, StreamExt};
use shelf_asyncutils::StreamUtils;
use shelf_catalog::BookOnDisk;
use std::collections::HashSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Clone)]
pub(crate) struct Rescanner {
    scanner: ScannerHandle,
    store: BookStoreHandle,
    outputs: Arc<Outputs>,
}

impl Rescanner {
    pub(crate) fn new(scanner: ScannerHandle, store: BookStoreHandle, outputs: Arc<Outputs>) -> Self {
        Self { scanner, store, outputs }
    }

    /// Scans once per request, latest request wins.
    pub(crate) async fn run(self, requests: impl Stream<Item = ()> + Send) {
        let this = self.clone();
        let mut found = Box::pin(requests.switch_latest(move |()| this.scan()));
        while let Some(books) = found.next().await {
            tracing::info!(books = books.len(), "Storing newly found books");
            if let Err(err) = self.store.insert(books).await {
                tracing::warn!(error = ?err, "Could not store scanned books");
            }
        }
        tracing::debug!("Rescan requests closed");
    }

    /// One scan. Yields the new books, if there are any, once the scan is
    /// complete. Dropping the stream cancels the scan.
    fn scan(&self) -> impl Stream<Item = Vec<BookOnDisk>> + Send + use<> {
        let Self { scanner, store, outputs } = self.clone();
        stream! {
            let cancel = CancellationToken::new();
            let _guard = cancel.clone().drop_guard();
            outputs.scan_progress(0);

            let progress: ScanProgress = {
                let (cancel, outputs) = (cancel.clone(), outputs.clone());
                Arc::new(move |scanned, total| {
                    if cancel.is_cancelled() || total == 0 {
                        return;
                    }
                    let percent = scanned.saturating_mul(100) / total;
                    // 100 is reserved for the end of the whole scan.
                    if percent < 100 {
                        outputs.scan_progress(u8::try_from(percent).unwrap_or(99));
                    }
                })
            };

            let mut books = Vec::new();
            let mut seen = HashSet::new();
            let mut found = scanner.scan(progress, cancel.clone());
            while let Some(book) = found.next().await {
                match book {
                    Ok(book) if seen.insert(book.id().to_string()) => books.push(book),
                    Ok(_) => {},
                    Err(err) => {
                        tracing::warn!(error = ?err, "Scan failed");
                        return;
                    },
                }
            }
            if cancel.is_cancelled() {
                return;
            }

            let known: HashSet<String> = match store.snapshot().await {
                Ok(stored) => stored.iter().map(|book| book.id().to_string()).collect(),
                Err(err) => {
                    tracing::warn!(error = ?err, "Could not read stored books");
                    return;
                },
            };
            books.retain(|book| !known.contains(book.id()));
            outputs.scan_progress(100);
            tracing::debug!(new = books.len(), "Scan complete");
            if !books.is_empty() {
                yield books;
            }
        }
    }
}
