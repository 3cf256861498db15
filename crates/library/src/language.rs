//! Language table reconciliation.
//!
//! The persisted language table is kept in step with the remote catalog: any
//! language that occurs in the catalog gets a row with its occurrence count,
//! and the `active` flag is carried over from the table it replaces.

use crate::channel::watch_stream;
use crate::source::LanguageStoreHandle;
use futures::StreamExt;
use shelf_catalog::{Book, Catalog, Language, Locale};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::instrument;

/// Derives the language table for `catalog` from the current `table`.
///
/// | catalog | table     | result                                           |
/// |---------|-----------|--------------------------------------------------|
/// | empty   | empty     | `[default]`                                      |
/// | empty   | non-empty | nothing (the stored table stays as it is)        |
/// | books   | empty     | catalog languages, `default` active if present   |
/// | books   | non-empty | catalog languages, activation taken from `table` |
///
/// The result is sorted by display name and holds each code once.
#[instrument(level = "debug", skip_all, fields(books = catalog.len(), table = table.len()))]
pub fn reconcile(catalog: &[Book], table: &[Language], default: &Language) -> Vec<Language> {
    let languages = match (catalog.is_empty(), table.is_empty()) {
        (true, true) => vec![default.clone()],
        (true, false) => Vec::new(),
        (false, true) => from_catalog(catalog, std::slice::from_ref(default)),
        (false, false) => from_catalog(catalog, table),
    };
    sorted(languages)
}

fn from_catalog(catalog: &[Book], reference: &[Language]) -> Vec<Language> {
    let mut occurrences: HashMap<&str, u32> = HashMap::new();
    for code in catalog.iter().filter_map(|book| book.language.as_deref()) {
        *occurrences.entry(code).or_default() += 1;
    }
    Locale::all()
        .iter()
        .filter_map(|locale| {
            let count = occurrences.get(locale.iso3)?;
            let active = reference.iter().any(|language| language.code == locale.iso3 && language.active);
            Some(Language::new(locale.iso3, active, *count))
        })
        .collect()
}

fn sorted(mut languages: Vec<Language>) -> Vec<Language> {
    languages.sort_by(|a, b| a.name().cmp(b.name()).then_with(|| a.code.cmp(&b.code)));
    languages.dedup_by(|a, b| a.code == b.code);
    languages
}

/// Keeps the stored language table reconciled with the latest catalog.
///
/// Runs until either input closes. The table is only written when the
/// reconciled result is non-empty and differs from what is stored, so the
/// write (which the store echoes back) settles instead of looping.
pub(crate) async fn sync_languages(
    catalog: watch::Receiver<Option<Arc<Catalog>>>,
    store: LanguageStoreHandle,
    default: Language,
) {
    let mut catalogs = Box::pin(watch_stream(catalog));
    let mut tables = store.languages().fuse();
    let (mut catalog, mut table): (Option<Arc<Catalog>>, Option<Vec<Language>>) = (None, None);

    loop {
        tokio::select! {
            Some(next) = catalogs.next() => catalog = next,
            Some(next) = tables.next() => table = Some(next),
            else => break,
        }
        let (Some(catalog), Some(table)) = (&catalog, &table) else {
            continue;
        };
        let reconciled = reconcile(&catalog.books, table, &default);
        if reconciled.is_empty() || &reconciled == table {
            continue;
        }
        tracing::debug!(languages = reconciled.len(), "Updating language table");
        if let Err(err) = store.upsert(reconciled).await {
            tracing::warn!(error = ?err, "Could not store the language table");
        }
    }
    tracing::debug!("Language sources closed");
}
