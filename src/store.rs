//! Collaborators backed by JSON files and a fixed device.
//!
//! Each store keeps its table in a `watch` channel, so the pipeline sees the
//! file's contents first and every later write after that. Writes go back to
//! the file when one was given.

use crate::error::Result;
use crate::input::load;
use async_trait::async_trait;
use exn::ResultExt;
use futures::{StreamExt, future, stream};
use serde::Serialize;
use serde::de::DeserializeOwned;
use shelf_catalog::{BookOnDisk, DownloadModel, FileSystemCapability, Language, NetworkState};
use shelf_library::error::{ErrorKind as LibraryErrorKind, Result as LibraryResult};
use shelf_library::source::{
    BookStore, CapabilityProber, ConnectivityObserver, DownloadStore, LanguageStore, PreferenceStore, SourceStream,
};
use std::path::{Path, PathBuf};
use tokio::sync::{Mutex, watch};

/// Replays the current value, then every change.
fn hot<T>(rx: watch::Receiver<T>) -> SourceStream<T>
where
    T: Clone + Send + Sync + 'static,
{
    Box::pin(stream::unfold((rx, true), |(mut rx, first)| async move {
        if !first && rx.changed().await.is_err() {
            return None;
        }
        let value = rx.borrow_and_update().clone();
        Some((value, (rx, false)))
    }))
}

/// Yields `value` once and then stays open.
fn constant<T: Send + 'static>(value: T) -> SourceStream<T> {
    Box::pin(stream::once(future::ready(value)).chain(stream::pending()))
}

/// One table persisted as a JSON document.
pub struct JsonStore<T> {
    path: Option<PathBuf>,
    table: watch::Sender<T>,
    writes: Mutex<()>,
}

impl<T> JsonStore<T>
where
    T: Serialize + DeserializeOwned + Default + Clone + Send + Sync + 'static,
{
    /// Loads the table from `path`; without a path the store starts empty and
    /// only lives in memory.
    pub async fn open(path: Option<&Path>) -> Result<Self> {
        let (table, _) = watch::channel(load(path).await?);
        Ok(Self { path: path.map(Path::to_path_buf), table, writes: Mutex::new(()) })
    }

    pub fn current(&self) -> T {
        self.table.borrow().clone()
    }

    fn subscribe(&self) -> SourceStream<T> {
        hot(self.table.subscribe())
    }

    async fn update(&self, change: impl FnOnce(&mut T)) -> LibraryResult<()> {
        let _write = self.writes.lock().await;
        let mut table = self.current();
        change(&mut table);
        if let Some(path) = &self.path {
            let json = serde_json::to_vec_pretty(&table).or_raise(|| LibraryErrorKind::Store)?;
            tokio::fs::write(path, json).await.or_raise(|| LibraryErrorKind::Store)?;
        }
        tracing::debug!(path = ?self.path, "Store updated");
        self.table.send_replace(table);
        Ok(())
    }
}

#[async_trait]
impl BookStore for JsonStore<Vec<BookOnDisk>> {
    fn books(&self) -> SourceStream<Vec<BookOnDisk>> {
        self.subscribe()
    }

    async fn snapshot(&self) -> LibraryResult<Vec<BookOnDisk>> {
        Ok(self.current())
    }

    async fn insert(&self, books: Vec<BookOnDisk>) -> LibraryResult<()> {
        self.update(|table| table.extend(books)).await
    }
}

impl DownloadStore for JsonStore<Vec<DownloadModel>> {
    fn downloads(&self) -> SourceStream<Vec<DownloadModel>> {
        self.subscribe()
    }
}

#[async_trait]
impl LanguageStore for JsonStore<Vec<Language>> {
    fn languages(&self) -> SourceStream<Vec<Language>> {
        self.subscribe()
    }

    async fn upsert(&self, languages: Vec<Language>) -> LibraryResult<()> {
        self.update(|table| *table = languages).await
    }
}

/// Device state that never changes during a run: always connected, with a
/// fixed storage capability and Wi-Fi answer.
#[derive(Debug, Clone, Copy)]
pub struct FixedDevice {
    pub capability: FileSystemCapability,
    pub wifi: bool,
    pub wifi_only: bool,
}

impl CapabilityProber for FixedDevice {
    fn capabilities(&self) -> SourceStream<FileSystemCapability> {
        constant(self.capability)
    }
}

impl ConnectivityObserver for FixedDevice {
    fn network_states(&self) -> SourceStream<NetworkState> {
        constant(NetworkState::Connected)
    }

    fn is_wifi(&self) -> bool {
        self.wifi
    }

    fn stop(&self) {
        tracing::debug!("Connectivity observer stopped");
    }
}

impl PreferenceStore for FixedDevice {
    fn wifi_only(&self) -> SourceStream<bool> {
        constant(self.wifi_only)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use shelf_catalog::Book;

    fn on_disk(id: &str, title: &str) -> BookOnDisk {
        BookOnDisk::new(Book::new(id, title), format!("/books/{id}.zim"))
    }

    #[tokio::test]
    async fn test_upsert_writes_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("languages.json");
        std::fs::write(&path, r#"[{"code": "eng", "active": true}]"#).unwrap();

        let store = JsonStore::<Vec<Language>>::open(Some(&path)).await.unwrap();
        assert_eq!(store.current(), vec![Language::new("eng", true, 0)]);

        let table = vec![Language::new("eng", true, 2), Language::new("fra", false, 1)];
        store.upsert(table.clone()).await.unwrap();
        assert_eq!(store.current(), table);
        assert_eq!(load::<Vec<Language>>(Some(&path)).await.unwrap(), table);
    }

    #[tokio::test]
    async fn test_books_stream_follows_inserts() {
        let store = JsonStore::<Vec<BookOnDisk>>::open(None).await.unwrap();
        let mut books = store.books();
        assert_eq!(books.next().await, Some(vec![]));

        store.insert(vec![on_disk("a", "Alpha")]).await.unwrap();
        store.insert(vec![on_disk("b", "Beta")]).await.unwrap();
        assert_eq!(store.snapshot().await.unwrap(), vec![on_disk("a", "Alpha"), on_disk("b", "Beta")]);
        assert_eq!(books.next().await, Some(vec![on_disk("a", "Alpha"), on_disk("b", "Beta")]));
    }

    #[tokio::test]
    async fn test_missing_file_is_an_input_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("downloads.json");
        assert!(JsonStore::<Vec<DownloadModel>>::open(Some(&path)).await.is_err());
    }

    #[tokio::test]
    async fn test_fixed_device_streams_stay_open() {
        let device = FixedDevice { capability: FileSystemCapability::CanWriteLargeFiles, wifi: false, wifi_only: true };

        let mut states = device.network_states();
        assert_eq!(states.next().await, Some(NetworkState::Connected));
        assert!(states.next().now_or_never().is_none());

        assert_eq!(device.capabilities().next().await, Some(FileSystemCapability::CanWriteLargeFiles));
        assert_eq!(device.wifi_only().next().await, Some(true));
        assert!(!device.is_wifi());
    }
}
