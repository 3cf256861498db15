use super::Locale;
use std::hash::{Hash, Hasher};

/// A book published in the remote catalog (or discovered on disk).
///
/// Books are compared and hashed by [`id`](Self::id) only: the same book
/// fetched twice with a different description is still the same book.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Book {
    /// Catalog identifier (UUID in practice, opaque here).
    pub id: String,
    pub title: String,
    pub description: String,
    /// ISO 639-2/T language code, e.g. `"eng"`.
    pub language: Option<String>,
    pub creator: Option<String>,
    pub publisher: Option<String>,
    pub tags: Vec<String>,
    /// Size of the content file in bytes.
    pub size: u64,
    /// Download location of the content file.
    pub url: String,
    /// Number of filter words matched by the most recent search, see
    /// [`with_search_matches`](Self::with_search_matches).
    #[cfg_attr(feature = "serde", serde(skip))]
    pub search_matches: usize,
}

impl Book {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self { id: id.into(), title: title.into(), ..Self::default() }
    }

    pub fn with_language(mut self, code: impl Into<String>) -> Self {
        self.language = Some(code.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.size = size;
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Counts how many whitespace-separated words of `filter` occur
    /// (case-insensitively) in the book's searchable text.
    ///
    /// # Examples
    ///
    /// ```
    /// use shelf_catalog::models::Book;
    ///
    /// let book = Book::new("a", "Wikipedia Medicine").with_language("eng");
    /// assert_eq!(book.search_matches("wiki english"), 2);
    /// assert_eq!(book.search_matches("wiktionary"), 0);
    /// ```
    pub fn search_matches(&self, filter: &str) -> usize {
        let haystack = self.searchable_text();
        filter.split_whitespace().filter(|word| haystack.contains(&word.to_lowercase())).count()
    }

    /// Returns a copy of this book carrying the score of `filter`.
    pub fn with_search_matches(mut self, filter: &str) -> Self {
        self.search_matches = self.search_matches(filter);
        self
    }

    fn searchable_text(&self) -> String {
        let language = self.language.as_deref().and_then(Locale::from_iso3).map(|locale| locale.name);
        [
            Some(self.title.as_str()),
            Some(self.description.as_str()),
            language,
            self.creator.as_deref(),
            self.publisher.as_deref(),
        ]
        .into_iter()
        .flatten()
        .chain(self.tags.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join("|")
        .to_lowercase()
    }
}

impl PartialEq for Book {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
impl Eq for Book {}
impl Hash for Book {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}
