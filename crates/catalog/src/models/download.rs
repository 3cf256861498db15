use super::Book;

/// Lifecycle of a download as reported by the download store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DownloadStatus {
    #[default]
    Pending,
    Running,
    Paused,
    Failed,
    Successful,
}

/// One in-flight download. Records disappear from the store once the
/// download completes or is cancelled.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DownloadModel {
    /// Identifier assigned by the downloader.
    pub download_id: i64,
    /// The catalog book being downloaded.
    pub book: Book,
    pub status: DownloadStatus,
    pub bytes_downloaded: u64,
    pub total_bytes: u64,
}

impl DownloadModel {
    pub fn new(download_id: i64, book: Book) -> Self {
        let total_bytes = book.size;
        Self { download_id, book, status: DownloadStatus::Pending, bytes_downloaded: 0, total_bytes }
    }

    pub fn with_progress(mut self, bytes_downloaded: u64, status: DownloadStatus) -> Self {
        self.bytes_downloaded = bytes_downloaded;
        self.status = status;
        self
    }

    pub fn book_id(&self) -> &str {
        &self.book.id
    }

    /// Progress as a whole percentage in `0..=100`.
    pub fn progress(&self) -> u8 {
        if self.total_bytes == 0 {
            return 0;
        }
        let percent = self.bytes_downloaded.saturating_mul(100) / self.total_bytes;
        u8::try_from(percent.min(100)).unwrap_or(100)
    }
}
