//! JSON fixtures standing in for the stores and the remote catalog.

use crate::error::{ErrorKind, Result};
use async_trait::async_trait;
use exn::ResultExt;
use serde::de::DeserializeOwned;
use shelf_catalog::{BookOnDisk, Catalog, DownloadModel, Language};
use shelf_library::FetchProgress;
use shelf_library::error::{ErrorKind as LibraryErrorKind, Result as LibraryResult};
use shelf_library::source::{CatalogClient, CatalogClientHandle, CatalogService, ConnectRequest};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Reads a JSON document, or returns the default value when no path is given.
pub async fn load<T>(path: Option<&Path>) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    let Some(path) = path else {
        return Ok(T::default());
    };
    let describe = || ErrorKind::Input(path.display().to_string());
    let bytes = tokio::fs::read(path).await.or_raise(describe)?;
    serde_json::from_slice(&bytes).or_raise(describe)
}

/// Everything the CLI feeds into the pipeline.
#[derive(Debug, Default)]
pub struct Inputs {
    pub catalog: Catalog,
    pub books: Vec<BookOnDisk>,
    pub downloads: Vec<DownloadModel>,
    pub languages: Vec<Language>,
}

impl Inputs {
    pub async fn load(
        catalog: Option<&Path>,
        books: Option<&Path>,
        downloads: Option<&Path>,
        languages: Option<&Path>,
    ) -> Result<Self> {
        Ok(Self {
            catalog: load(catalog).await?,
            books: load(books).await?,
            downloads: load(downloads).await?,
            languages: load(languages).await?,
        })
    }
}

/// Serves the catalog from a local JSON file; the request URL is the path.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileCatalogService;

#[async_trait]
impl CatalogService for FileCatalogService {
    async fn content_length(&self, url: &str) -> LibraryResult<u64> {
        let metadata = tokio::fs::metadata(url).await.map_err(LibraryErrorKind::Io)?;
        Ok(metadata.len())
    }

    async fn connect(&self, request: ConnectRequest) -> LibraryResult<CatalogClientHandle> {
        tracing::debug!(url = %request.url, length = ?request.content_length, "Opening catalog file");
        Ok(Arc::new(FileCatalogClient { path: PathBuf::from(request.url), progress: request.progress }))
    }
}

struct FileCatalogClient {
    path: PathBuf,
    progress: FetchProgress,
}

#[async_trait]
impl CatalogClient for FileCatalogClient {
    async fn fetch(&self) -> LibraryResult<Catalog> {
        let bytes = tokio::fs::read(&self.path).await.or_raise(|| LibraryErrorKind::Catalog)?;
        self.progress.update(u64::try_from(bytes.len()).unwrap_or(u64::MAX));
        serde_json::from_slice(&bytes).or_raise(|| LibraryErrorKind::Catalog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shelf_catalog::Book;
    use std::fs;

    #[tokio::test]
    async fn test_missing_path_loads_default() {
        let books: Vec<BookOnDisk> = load(None).await.unwrap();
        assert!(books.is_empty());
    }

    #[tokio::test]
    async fn test_load_reports_the_offending_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("languages.json");
        fs::write(&path, "{ not json").unwrap();

        let error = load::<Vec<Language>>(Some(&path)).await.unwrap_err();
        assert_eq!(*error, ErrorKind::Input(path.display().to_string()));
    }

    #[tokio::test]
    async fn test_inputs_parse_partial_records() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = dir.path().join("catalog.json");
        let languages = dir.path().join("languages.json");
        fs::write(&catalog, r#"{"books": [{"id": "a", "title": "Alpha", "language": "eng"}]}"#).unwrap();
        fs::write(&languages, r#"[{"code": "eng", "active": true}]"#).unwrap();

        let inputs = Inputs::load(Some(&catalog), None, None, Some(&languages)).await.unwrap();
        assert_eq!(inputs.catalog, Catalog::new([Book::new("a", "Alpha").with_language("eng")]));
        assert_eq!(inputs.languages, vec![Language::new("eng", true, 0)]);
        assert!(inputs.books.is_empty());
        assert!(inputs.downloads.is_empty());
    }

    #[tokio::test]
    async fn test_file_catalog_service_reads_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        let body = r#"{"books": [{"id": "a", "title": "Alpha"}, {"id": "b", "title": "Beta"}]}"#;
        fs::write(&path, body).unwrap();
        let url = path.display().to_string();

        let service = FileCatalogService;
        assert_eq!(service.content_length(&url).await.unwrap(), body.len() as u64);
        let request = ConnectRequest { url, content_length: None, progress: FetchProgress::detached() };
        let catalog = service.connect(request).await.unwrap().fetch().await.unwrap();
        assert_eq!(catalog.len(), 2);
    }

    #[tokio::test]
    async fn test_file_catalog_client_fails_on_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        fs::write(&path, "<library/>").unwrap();

        let request =
            ConnectRequest { url: path.display().to_string(), content_length: None, progress: FetchProgress::detached() };
        let error = FileCatalogService.connect(request).await.unwrap().fetch().await.unwrap_err();
        assert!(matches!(*error, LibraryErrorKind::Catalog));
    }
}
