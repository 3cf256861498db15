//! Plain-text rendering of pipeline output.

use shelf_catalog::{Language, LibraryListItem, Section};
use shelf_library::{FileSelectListState, SelectionMode};
use std::fmt::Write;

fn section_title(section: Section) -> &'static str {
    match section {
        Section::Downloading => "Downloading",
        Section::YourLanguages => "Your languages",
        Section::OtherLanguages => "Other languages",
    }
}

pub fn library(items: &[LibraryListItem]) -> String {
    let mut out = String::new();
    for item in items {
        // Writing to a String cannot fail.
        let _ = match item {
            LibraryListItem::Divider(section) => writeln!(out, "# {}", section_title(*section)),
            LibraryListItem::Book(item) => {
                let language = item.book.language.as_deref().unwrap_or("---");
                let marker = if item.can_be_downloaded() { "" } else { " (too large)" };
                writeln!(out, "  [{language}] {} {}{marker}", item.book.id, item.book.title)
            },
            LibraryListItem::Download(download) => {
                writeln!(out, "  {:>3}% {} {}", download.progress(), download.book.id, download.book.title)
            },
        };
    }
    out
}

pub fn languages(languages: &[Language]) -> String {
    let mut out = String::new();
    for language in languages {
        let marker = if language.active { '*' } else { ' ' };
        let _ = writeln!(out, "{marker} {} {} ({})", language.code, language.name(), language.occurrences);
    }
    out
}

pub fn selection(state: &FileSelectListState) -> String {
    let mut out = String::new();
    if state.mode == SelectionMode::Multi {
        out.push_str("# Selecting\n");
    }
    for book in &state.items {
        let marker = if state.is_selected(book.id()) { 'x' } else { ' ' };
        let _ = writeln!(out, "[{marker}] {} {}", book.id(), book.path.display());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use shelf_catalog::{Book, BookItem, BookOnDisk, DownloadModel, DownloadStatus, FileSystemCapability};

    #[test]
    fn test_library_rows() {
        let items = vec![
            LibraryListItem::Divider(Section::Downloading),
            LibraryListItem::Download(
                DownloadModel::new(1, Book::new("d", "Delta").with_size(200)).with_progress(50, DownloadStatus::Running),
            ),
            LibraryListItem::Divider(Section::OtherLanguages),
            LibraryListItem::Book(BookItem::new(
                Book::new("c", "Charlie").with_language("fra").with_size(5 * 1024 * 1024 * 1024),
                FileSystemCapability::CannotWriteLargeFiles,
            )),
        ];
        assert_eq!(
            library(&items),
            "# Downloading\n   25% d Delta\n# Other languages\n  [fra] c Charlie (too large)\n"
        );
    }

    #[rstest]
    #[case(true, "* eng English (3)\n")]
    #[case(false, "  eng English (3)\n")]
    fn test_language_rows(#[case] active: bool, #[case] expected: &str) {
        assert_eq!(languages(&[Language::new("eng", active, 3)]), expected);
    }

    #[test]
    fn test_selection_rows() {
        let mut state = FileSelectListState::new(vec![
            BookOnDisk::new(Book::new("a", "Alpha"), "/books/a.zim"),
            BookOnDisk::new(Book::new("b", "Beta"), "/books/b.zim"),
        ]);
        state.mode = SelectionMode::Multi;
        state.selected.insert("b".to_string());
        assert_eq!(selection(&state), "# Selecting\n[ ] a /books/a.zim\n[x] b /books/b.zim\n");
    }
}
