//! Scanner over local directories.

use crate::error::{ErrorKind, Result};
use crate::source::{FileSystemScanner, ScanProgress, SourceStream};
use async_stream::stream;
use shelf_catalog::{Book, BookOnDisk, Locale};
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use tokio::fs::{self, DirEntry};
use tokio_util::sync::CancellationToken;

enum WalkEntry {
    Book(BookOnDisk),
    Descend(PathBuf),
    Skip,
}

/// Finds book files under a set of root directories.
///
/// Directories are walked depth-first without recursion. Progress is
/// reported after each directory as `(directories scanned, directories
/// discovered so far)`. Roots that do not exist are skipped; a root that
/// exists but cannot be read fails the scan. Unreadable directories below a
/// root are logged and skipped.
#[derive(Debug, Clone)]
pub struct DirectoryScanner {
    roots: Vec<PathBuf>,
    extensions: Vec<String>,
}

impl DirectoryScanner {
    pub fn new(roots: impl IntoIterator<Item = impl Into<PathBuf>>, extensions: &[String]) -> Self {
        Self {
            roots: roots.into_iter().map(Into::into).collect(),
            extensions: extensions.iter().map(|ext| ext.to_lowercase()).collect(),
        }
    }

    pub fn from_config(config: &shelf_config::ScanConfig) -> Self {
        Self::new(config.directories.iter().cloned(), &config.extensions)
    }

    fn is_book(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|wanted| wanted.eq_ignore_ascii_case(ext)))
    }

    async fn process_entry(&self, entry: DirEntry) -> Result<WalkEntry> {
        let path = entry.path();
        let metadata = entry.metadata().await.map_err(ErrorKind::Io)?;
        if metadata.is_dir() {
            return Ok(WalkEntry::Descend(path));
        }
        if metadata.is_file() && self.is_book(&path) {
            return Ok(book_from_path(&path, &metadata).map_or(WalkEntry::Skip, WalkEntry::Book));
        }
        Ok(WalkEntry::Skip)
    }
}

/// Derives a book from a file name such as `wikipedia_en_all_maxi_2024-01.zim`:
/// the stem is the id, the title is the stem with underscores as spaces, and
/// a second `_`-separated segment naming a known language sets the language.
fn book_from_path(path: &Path, metadata: &Metadata) -> Option<BookOnDisk> {
    let stem = path.file_stem()?.to_str()?;
    let mut book = Book::new(stem, stem.replace('_', " ")).with_size(metadata.len());
    if let Some(locale) = stem.split('_').nth(1).and_then(Locale::from_iso1) {
        book = book.with_language(locale.iso3);
    }
    Some(BookOnDisk::new(book, path))
}

impl FileSystemScanner for DirectoryScanner {
    fn scan(&self, progress: ScanProgress, cancel: CancellationToken) -> SourceStream<Result<BookOnDisk>> {
        let scanner = self.clone();
        let mut stack: Vec<(PathBuf, bool)> = self.roots.iter().map(|root| (root.clone(), true)).collect();
        let mut discovered = stack.len();
        let mut scanned = 0;

        Box::pin(stream! {
            'dirs: while let Some((current, is_root)) = stack.pop() {
                if cancel.is_cancelled() {
                    tracing::debug!(scanned, "Scan cancelled");
                    return;
                }
                let mut entries = match fs::read_dir(&current).await {
                    Ok(entries) => entries,
                    Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                        scanned += 1;
                        progress(scanned, discovered);
                        continue 'dirs;
                    },
                    Err(err) if is_root => {
                        yield Err(exn::Exn::from(ErrorKind::Io(err)));
                        return;
                    },
                    Err(err) => {
                        tracing::warn!(path = %current.display(), error = %err, "Skipping unreadable directory");
                        scanned += 1;
                        progress(scanned, discovered);
                        continue 'dirs;
                    },
                };

                'entries: loop {
                    let entry = match entries.next_entry().await {
                        Ok(Some(entry)) => entry,
                        Ok(None) => break 'entries,
                        Err(err) => {
                            tracing::warn!(path = %current.display(), error = %err, "Could not read directory entry");
                            break 'entries;
                        },
                    };
                    match scanner.process_entry(entry).await {
                        Ok(WalkEntry::Book(book)) => yield Ok(book),
                        Ok(WalkEntry::Descend(dir)) => {
                            discovered += 1;
                            stack.push((dir, false));
                        },
                        Ok(WalkEntry::Skip) => {},
                        Err(err) => tracing::debug!(error = ?err, "Skipping unreadable entry"),
                    }
                }
                scanned += 1;
                progress(scanned, discovered);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use std::fs;
    use std::sync::{Arc, Mutex};

    fn extensions() -> Vec<String> {
        vec!["zim".to_string()]
    }

    fn ignore_progress() -> ScanProgress {
        Arc::new(|_, _| {})
    }

    #[tokio::test]
    async fn test_finds_books_recursively() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("nested/deeper")).unwrap();
        fs::write(dir.path().join("wikipedia_en_all_maxi_2024-01.zim"), b"1234").unwrap();
        fs::write(dir.path().join("nested/deeper/gutenberg_fr_all.ZIM"), b"12").unwrap();
        fs::write(dir.path().join("nested/notes.txt"), b"ignored").unwrap();

        let scanner = DirectoryScanner::new([dir.path()], &extensions());
        let mut books: Vec<_> = scanner
            .scan(ignore_progress(), CancellationToken::new())
            .map(|book| book.unwrap())
            .collect()
            .await;
        books.sort_by(|a, b| a.id().cmp(b.id()));

        assert_eq!(books.len(), 2);
        assert_eq!(books[0].id(), "gutenberg_fr_all");
        assert_eq!(books[0].book.language.as_deref(), Some("fra"));
        assert_eq!(books[0].book.size, 2);
        assert_eq!(books[1].title(), "wikipedia en all maxi 2024-01");
        assert_eq!(books[1].book.language.as_deref(), Some("eng"));
    }

    #[tokio::test]
    async fn test_reports_directory_progress() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("a")).unwrap();
        fs::create_dir_all(dir.path().join("b")).unwrap();

        let reports = Arc::new(Mutex::new(Vec::new()));
        let sink = reports.clone();
        let progress: ScanProgress = Arc::new(move |scanned, total| sink.lock().unwrap().push((scanned, total)));
        let scanner = DirectoryScanner::new([dir.path()], &extensions());
        let books: Vec<_> = scanner.scan(progress, CancellationToken::new()).collect().await;

        assert!(books.is_empty());
        assert_eq!(*reports.lock().unwrap(), vec![(1, 3), (2, 3), (3, 3)]);
    }

    #[tokio::test]
    async fn test_missing_root_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let scanner = DirectoryScanner::new([dir.path().join("missing")], &extensions());
        let books: Vec<_> = scanner.scan(ignore_progress(), CancellationToken::new()).collect().await;
        assert!(books.is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_scan_yields_nothing() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.zim"), b"").unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let scanner = DirectoryScanner::new([dir.path()], &extensions());
        let books: Vec<_> = scanner.scan(ignore_progress(), cancel).collect().await;
        assert!(books.is_empty());
    }
}
