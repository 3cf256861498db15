use super::{Book, DownloadModel, FileSystemCapability};

/// Books of this size (in bytes) or larger cannot be stored on a filesystem
/// that is unable to write large files.
pub const LARGE_FILE_THRESHOLD: u64 = 4 * 1024 * 1024 * 1024;

/// The sections of the library list, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    /// Catalog books with an active download.
    Downloading,
    /// Catalog books in one of the user's active languages.
    YourLanguages,
    /// Everything else.
    OtherLanguages,
}

impl Section {
    /// Sort (and identity) key of the section's divider. Higher sorts first.
    pub const fn sort_key(self) -> i64 {
        match self {
            Self::Downloading => i64::MAX,
            Self::YourLanguages => i64::MAX - 1,
            Self::OtherLanguages => i64::MIN,
        }
    }

    /// Key of the localized section title.
    pub const fn title_key(self) -> &'static str {
        match self {
            Self::Downloading => "downloading",
            Self::YourLanguages => "your_languages",
            Self::OtherLanguages => "other_languages",
        }
    }
}

/// A catalog book offered for download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookItem {
    pub book: Book,
    pub capability: FileSystemCapability,
}

impl BookItem {
    pub fn new(book: Book, capability: FileSystemCapability) -> Self {
        Self { book, capability }
    }

    /// Whether the book may be installed onto the current filesystem.
    ///
    /// Only an affirmative capability report lifts the large-file limit.
    pub fn can_be_downloaded(&self) -> bool {
        match self.capability {
            FileSystemCapability::CanWriteLargeFiles => true,
            FileSystemCapability::Unknown | FileSystemCapability::CannotWriteLargeFiles => {
                self.book.size < LARGE_FILE_THRESHOLD
            },
        }
    }
}

/// Stable identity of a list item, for diffing consecutive lists.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ItemId {
    Section(i64),
    Book(String),
}

/// One row of the displayed library list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LibraryListItem {
    Divider(Section),
    Book(BookItem),
    Download(DownloadModel),
}

impl LibraryListItem {
    pub fn id(&self) -> ItemId {
        match self {
            Self::Divider(section) => ItemId::Section(section.sort_key()),
            Self::Book(item) => ItemId::Book(item.book.id.clone()),
            Self::Download(download) => ItemId::Book(download.book.id.clone()),
        }
    }

    /// The book shown by this row, if it shows one.
    pub fn book(&self) -> Option<&Book> {
        match self {
            Self::Divider(_) => None,
            Self::Book(item) => Some(&item.book),
            Self::Download(download) => Some(&download.book),
        }
    }

    pub fn is_divider(&self) -> bool {
        matches!(self, Self::Divider(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_section_keys_sort_in_display_order() {
        let mut sections = [Section::OtherLanguages, Section::Downloading, Section::YourLanguages];
        sections.sort_by_key(|section| std::cmp::Reverse(section.sort_key()));
        assert_eq!(sections, [Section::Downloading, Section::YourLanguages, Section::OtherLanguages]);
    }

    #[rstest]
    #[case(FileSystemCapability::Unknown, LARGE_FILE_THRESHOLD - 1, true)]
    #[case(FileSystemCapability::Unknown, LARGE_FILE_THRESHOLD, false)]
    #[case(FileSystemCapability::CannotWriteLargeFiles, LARGE_FILE_THRESHOLD + 1, false)]
    #[case(FileSystemCapability::CannotWriteLargeFiles, 1024, true)]
    #[case(FileSystemCapability::CanWriteLargeFiles, LARGE_FILE_THRESHOLD * 2, true)]
    fn test_can_be_downloaded(#[case] capability: FileSystemCapability, #[case] size: u64, #[case] expected: bool) {
        let item = BookItem::new(Book::new("a", "A").with_size(size), capability);
        assert_eq!(item.can_be_downloaded(), expected);
    }

    #[test]
    fn test_item_ids() {
        let book = Book::new("a", "A");
        assert_eq!(LibraryListItem::Divider(Section::Downloading).id(), ItemId::Section(i64::MAX));
        assert_eq!(
            LibraryListItem::Book(BookItem::new(book.clone(), FileSystemCapability::Unknown)).id(),
            ItemId::Book("a".into())
        );
        assert_eq!(LibraryListItem::Download(DownloadModel::new(7, book)).id(), ItemId::Book("a".into()));
    }
}
