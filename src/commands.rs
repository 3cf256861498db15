use crate::InputArgs;
use crate::error::{ErrorKind, Result};
use crate::input::{FileCatalogService, Inputs};
use crate::render;
use crate::store::{FixedDevice, JsonStore};
use exn::ResultExt;
use shelf_catalog::{BookOnDisk, DownloadModel, FileSystemCapability, Language};
use shelf_config::Config;
use shelf_library::{
    Collaborators, DirectoryScanner, FetchState, LibrarySession, LibraryView, SectionInputs, SessionOptions,
    TracingErrorSink, build_sections, reconcile,
};
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, timeout, timeout_at};

/// The list counts as settled once it has not changed for this long.
const QUIET_PERIOD: Duration = Duration::from_millis(100);

fn load_config(path: Option<&Path>) -> Result<Config> {
    Config::load(path).or_raise(|| ErrorKind::Config)
}

fn parse_capability(value: &str) -> Result<FileSystemCapability> {
    value.parse::<FileSystemCapability>().or_raise(|| ErrorKind::Argument("capability"))
}

async fn load_inputs(args: &InputArgs) -> Result<Inputs> {
    Inputs::load(args.catalog.as_deref(), args.books.as_deref(), args.downloads.as_deref(), args.languages.as_deref())
        .await
}

pub async fn sections(args: &InputArgs, filter: &str, capability: &str) -> Result<String> {
    let capability = parse_capability(capability)?;
    let inputs = load_inputs(args).await?;
    let items = build_sections(&SectionInputs {
        on_disk: &inputs.books,
        downloads: &inputs.downloads,
        languages: &inputs.languages,
        catalog: &inputs.catalog,
        filter,
        capability,
    })
    .or_raise(|| ErrorKind::Library)?;
    Ok(render::library(&items))
}

pub async fn languages(config: Option<&Path>, args: &InputArgs) -> Result<String> {
    let options = SessionOptions::from_config(&load_config(config)?);
    let inputs = load_inputs(args).await?;
    let table = reconcile(&inputs.catalog.books, &inputs.languages, &options.default_language);
    Ok(render::languages(&table))
}

pub fn config(path: Option<&Path>) -> Result<String> {
    let config = load_config(path)?;
    let mut json = serde_json::to_string_pretty(&config).or_raise(|| ErrorKind::Output)?;
    json.push('\n');
    Ok(json)
}

pub struct RunArgs {
    pub filter: String,
    pub capability: String,
    pub metered: bool,
    pub rescan: bool,
    pub timeout_ms: u64,
}

pub async fn run(config: Option<&Path>, args: &InputArgs, run: RunArgs) -> Result<String> {
    let config = load_config(config)?;
    let capability = parse_capability(&run.capability)?;
    let Some(catalog) = args.catalog.as_deref() else {
        exn::bail!(ErrorKind::Argument("catalog"));
    };

    let languages = Arc::new(JsonStore::<Vec<Language>>::open(args.languages.as_deref()).await?);
    let device = Arc::new(FixedDevice { capability, wifi: !run.metered, wifi_only: config.library.wifi_only });
    let collaborators = Collaborators {
        books: Arc::new(JsonStore::<Vec<BookOnDisk>>::open(args.books.as_deref()).await?),
        downloads: Arc::new(JsonStore::<Vec<DownloadModel>>::open(args.downloads.as_deref()).await?),
        languages: languages.clone(),
        catalog: Arc::new(FileCatalogService),
        scanner: Arc::new(DirectoryScanner::from_config(&config.scan)),
        capability: device.clone(),
        connectivity: device.clone(),
        preferences: device,
        errors: Arc::new(TracingErrorSink),
    };
    let mut options = SessionOptions::from_config(&config);
    options.catalog_url = catalog.display().to_string();

    let (mut session, mut view) = LibrarySession::start(collaborators, options);
    let settled = settle(&session, &mut view, &run).await;
    session.shutdown();
    let state = settled?;

    let mut out = render::library(&view.library_items.borrow());
    if state == FetchState::AwaitingWifiDecision {
        out.push_str("# Catalog not fetched: Wi-Fi only\n");
    }
    out.push_str("# Languages\n");
    out.push_str(&render::languages(&languages.current()));
    let selection = view.file_select.borrow().clone();
    if !selection.items.is_empty() {
        out.push_str("# On disk\n");
        out.push_str(&render::selection(&selection));
    }
    Ok(out)
}

async fn within<F: Future>(deadline: Instant, waiting_for: &'static str, future: F) -> Result<F::Output> {
    timeout_at(deadline, future).await.or_raise(|| ErrorKind::Timeout(waiting_for))
}

/// Drives the session until the catalog fetch has finished (or stalled on the
/// Wi-Fi question) and the list has stopped changing.
async fn settle(session: &LibrarySession, view: &mut LibraryView, run: &RunArgs) -> Result<FetchState> {
    let deadline = Instant::now() + Duration::from_millis(run.timeout_ms);
    if !run.filter.trim().is_empty() {
        session.set_filter(run.filter.clone()).or_raise(|| ErrorKind::Library)?;
    }
    if run.rescan {
        session.request_rescan().or_raise(|| ErrorKind::Library)?;
        within(deadline, "scan", view.scan_progress.wait_for(|progress| *progress == 100))
            .await?
            .or_raise(|| ErrorKind::Library)?;
    }

    let state = within(
        deadline,
        "catalog",
        view.fetch_state.wait_for(|state| matches!(state, FetchState::Settled | FetchState::AwaitingWifiDecision)),
    )
    .await?
    .map(|state| *state)
    .or_raise(|| ErrorKind::Library)?;

    while Instant::now() < deadline {
        match timeout(QUIET_PERIOD, view.library_items.changed()).await {
            Ok(Ok(())) => continue,
            Ok(Err(_)) | Err(_) => break,
        }
    }
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    const CATALOG: &str = r#"{"books": [
        {"id": "a", "title": "Alpha", "language": "eng"},
        {"id": "b", "title": "Beta", "language": "fra"}
    ]}"#;

    fn fixture(dir: &TempDir, name: &str, body: &str) -> Option<PathBuf> {
        let path = dir.path().join(name);
        fs::write(&path, body).unwrap();
        Some(path)
    }

    fn run_args(metered: bool) -> RunArgs {
        RunArgs { filter: String::new(), capability: "unknown".to_string(), metered, rescan: false, timeout_ms: 5000 }
    }

    #[tokio::test]
    async fn test_sections_split_by_active_language() {
        let dir = tempfile::tempdir().unwrap();
        let args = InputArgs {
            catalog: fixture(&dir, "catalog.json", CATALOG),
            languages: fixture(&dir, "languages.json", r#"[{"code": "eng", "active": true}]"#),
            ..InputArgs::default()
        };

        let output = sections(&args, "", "unknown").await.unwrap();
        assert_eq!(output, "# Your languages\n  [eng] a Alpha\n# Other languages\n  [fra] b Beta\n");
    }

    #[tokio::test]
    async fn test_sections_reject_unknown_capability() {
        let error = sections(&InputArgs::default(), "", "floppy").await.unwrap_err();
        assert_eq!(*error, ErrorKind::Argument("capability"));
    }

    #[tokio::test]
    async fn test_languages_keep_existing_activation() {
        let dir = tempfile::tempdir().unwrap();
        let args = InputArgs {
            catalog: fixture(&dir, "catalog.json", CATALOG),
            languages: fixture(&dir, "languages.json", r#"[{"code": "fra", "active": true}]"#),
            ..InputArgs::default()
        };

        let output = languages(None, &args).await.unwrap();
        assert_eq!(output, "  eng English (1)\n* fra French (1)\n");
    }

    #[tokio::test]
    async fn test_run_requires_catalog() {
        let error = run(None, &InputArgs::default(), run_args(false)).await.unwrap_err();
        assert_eq!(*error, ErrorKind::Argument("catalog"));
    }

    #[tokio::test]
    async fn test_run_prints_settled_list() {
        let dir = tempfile::tempdir().unwrap();
        let args = InputArgs {
            catalog: fixture(&dir, "catalog.json", CATALOG),
            books: fixture(&dir, "books.json", r#"[{"book": {"id": "z", "title": "Zulu"}, "path": "/books/z.zim"}]"#),
            languages: fixture(&dir, "languages.json", r#"[{"code": "eng", "active": true}]"#),
            ..InputArgs::default()
        };

        let output = run(None, &args, run_args(false)).await.unwrap();
        assert!(output.starts_with("# Your languages\n  [eng] a Alpha\n# Other languages\n  [fra] b Beta\n"));
        assert!(output.ends_with("# On disk\n[ ] z /books/z.zim\n"));

        let stored: Vec<Language> = crate::input::load(args.languages.as_deref()).await.unwrap();
        assert_eq!(stored, vec![Language::new("eng", true, 1), Language::new("fra", false, 1)]);
    }
}
