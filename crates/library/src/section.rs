//! Builds the sectioned library list from the current inputs.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use shelf_catalog::{
    Book, BookItem, BookOnDisk, Catalog, DownloadModel, FileSystemCapability, Language, LibraryListItem, Section,
};
use std::collections::HashSet;
use tracing::instrument;

/// A consistent snapshot of every input the library list depends on.
#[derive(Debug, Clone, Copy)]
pub struct SectionInputs<'a> {
    pub on_disk: &'a [BookOnDisk],
    pub downloads: &'a [DownloadModel],
    pub languages: &'a [Language],
    pub catalog: &'a Catalog,
    pub filter: &'a str,
    pub capability: FileSystemCapability,
}

/// Produces the library list shown to the user:
///
/// 1. Catalog books with an active download, under a
///    [`Downloading`](Section::Downloading) divider. Rows carry the download
///    record when there is one.
/// 2. Books in an active language, under [`YourLanguages`](Section::YourLanguages).
/// 3. Everything else, under [`OtherLanguages`](Section::OtherLanguages).
///
/// Books already on disk never appear. A blank filter keeps every book;
/// otherwise only books matching at least one filter word are kept. Empty
/// sections are left out entirely, divider included.
#[instrument(level = "debug", skip_all, fields(catalog = inputs.catalog.len(), filter = inputs.filter))]
pub fn build_sections(inputs: &SectionInputs<'_>) -> Result<Vec<LibraryListItem>> {
    let on_disk: HashSet<&str> = inputs.on_disk.iter().map(BookOnDisk::id).collect();
    let available: Vec<&Book> = inputs.catalog.books.iter().filter(|book| !on_disk.contains(book.id.as_str())).collect();

    let mut downloading: Vec<&Book> = Vec::new();
    for download in inputs.downloads {
        let Some(book) = available.iter().copied().find(|book| book.id == download.book_id()) else {
            continue;
        };
        if !downloading.iter().any(|seen| seen.id == book.id) {
            downloading.push(book);
        }
    }
    let downloading_ids: HashSet<&str> = downloading.iter().map(|book| book.id.as_str()).collect();

    let filter = inputs.filter.trim();
    let candidates = available.into_iter().filter(|book| !downloading_ids.contains(book.id.as_str()));
    let matching: Vec<Book> = if filter.is_empty() {
        candidates.cloned().collect()
    } else {
        candidates
            .map(|book| book.clone().with_search_matches(filter))
            .filter(|book| book.search_matches > 0)
            .collect()
    };

    let active: HashSet<&str> =
        inputs.languages.iter().filter(|language| language.active).map(|language| language.code.as_str()).collect();
    let (yours, others): (Vec<Book>, Vec<Book>) = matching
        .into_iter()
        .partition(|book| book.language.as_deref().is_some_and(|code| active.contains(code)));

    let mut items = Vec::new();
    items
        .try_reserve_exact(downloading.len() + yours.len() + others.len() + 3)
        .or_raise(|| ErrorKind::Exhausted)?;

    if !downloading.is_empty() {
        items.push(LibraryListItem::Divider(Section::Downloading));
        items.extend(downloading.into_iter().map(|book| {
            match inputs.downloads.iter().find(|download| download.book_id() == book.id) {
                Some(download) => LibraryListItem::Download(download.clone()),
                None => LibraryListItem::Book(BookItem::new(book.clone(), inputs.capability)),
            }
        }));
    }
    for (section, books) in [(Section::YourLanguages, yours), (Section::OtherLanguages, others)] {
        if books.is_empty() {
            continue;
        }
        items.push(LibraryListItem::Divider(section));
        items.extend(books.into_iter().map(|book| LibraryListItem::Book(BookItem::new(book, inputs.capability))));
    }
    tracing::debug!(items = items.len(), "Library list built");
    Ok(items)
}
