mod book;
mod catalog;
mod disk;
mod download;
mod item;
mod language;
mod locale;
mod state;

pub use self::book::Book;
pub use self::catalog::Catalog;
pub use self::disk::BookOnDisk;
pub use self::download::{DownloadModel, DownloadStatus};
pub use self::item::{BookItem, ItemId, LARGE_FILE_THRESHOLD, LibraryListItem, Section};
pub use self::language::Language;
pub use self::locale::Locale;
pub use self::state::{FileSystemCapability, NetworkState};

fn sanitize(s: impl AsRef<str>) -> String {
    s.as_ref().trim().to_lowercase().replace(['-', '_', ' '], "")
}
