use super::Book;

/// A parsed remote catalog document.
///
/// An empty catalog is a legitimate value: it is what the pipeline falls back
/// to when the remote fetch cannot be completed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Catalog {
    #[cfg_attr(feature = "serde", serde(default))]
    pub books: Vec<Book>,
}

impl Catalog {
    pub fn new(books: impl IntoIterator<Item = Book>) -> Self {
        Self { books: books.into_iter().collect() }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }
}

impl FromIterator<Book> for Catalog {
    fn from_iter<T: IntoIterator<Item = Book>>(iter: T) -> Self {
        Self::new(iter)
    }
}
