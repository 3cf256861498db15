use super::Book;
use std::path::PathBuf;

/// A book whose content file already exists on local storage.
///
/// Identity is the identity of the wrapped [`Book`]; the path is where it was
/// found. Selection state is deliberately *not* stored here, see the selection
/// state machine in `shelf-library`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BookOnDisk {
    pub book: Book,
    pub path: PathBuf,
}

impl BookOnDisk {
    pub fn new(book: Book, path: impl Into<PathBuf>) -> Self {
        Self { book, path: path.into() }
    }

    pub fn id(&self) -> &str {
        &self.book.id
    }

    pub fn title(&self) -> &str {
        &self.book.title
    }
}
