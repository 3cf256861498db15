//! Layered configuration for shelf.
//!
//! Sources are merged in increasing order of precedence:
//!
//! 1. Built-in defaults ([`Config::default`]).
//! 2. `config.{toml,yaml,json}` in the platform configuration directory
//!    (e.g. `~/.config/shelf/` on Linux).
//! 3. An explicit file handed to [`Config::load`], format picked by extension.
//! 4. Environment variables prefixed with `SHELF_`, nested keys separated by a
//!    double underscore (`SHELF_CATALOG__ATTEMPTS=3`).
//!
//! The merged result is validated before it is returned.

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use shelf_catalog::Locale;
use std::path::{Path, PathBuf};

/// ISO 639-2/T code used when neither the configuration nor the environment
/// names a usable language.
pub const FALLBACK_LANGUAGE: &str = "eng";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub catalog: CatalogConfig,
    pub library: LibraryConfig,
    pub scan: ScanConfig,
}

/// Where and how the remote catalog is fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub base_url: String,
    /// Path of the catalog document, relative to `base_url`.
    pub path: String,
    /// Total number of fetch attempts before falling back to an empty catalog.
    pub attempts: u32,
}
impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: "https://download.kiwix.org/".to_string(),
            path: "library/library_zim.xml".to_string(),
            attempts: 5,
        }
    }
}
impl CatalogConfig {
    /// Full URL of the catalog document.
    pub fn url(&self) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), self.path.trim_start_matches('/'))
    }
}

/// User preferences that seed the library pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    /// Language activated when no language table exists yet. Two- or
    /// three-letter code; derived from the environment locale when unset.
    pub default_language: Option<String>,
    /// Only fetch the catalog over Wi-Fi.
    pub wifi_only: bool,
}
impl Default for LibraryConfig {
    fn default() -> Self {
        Self { default_language: None, wifi_only: true }
    }
}

/// Local directories searched for book files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub directories: Vec<PathBuf>,
    /// File extensions (without the dot) treated as books.
    pub extensions: Vec<String>,
}
impl Default for ScanConfig {
    fn default() -> Self {
        Self { directories: Vec::new(), extensions: vec!["zim".to_string()] }
    }
}

impl Config {
    /// Loads and validates the configuration from every source, optionally
    /// including an explicit file.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config: Self = Self::figment(path).extract().or_raise(|| ErrorKind::Load)?;
        config.validate()?;
        tracing::debug!(?config, "Configuration loaded");
        Ok(config)
    }

    /// The un-extracted provider stack, exposed so callers can merge extra
    /// providers (command line overrides) on top.
    pub fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(dir) = Self::config_dir() {
            figment = figment
                .merge(Toml::file(dir.join("config.toml")))
                .merge(Yaml::file(dir.join("config.yaml")))
                .merge(Json::file(dir.join("config.json")));
        }
        if let Some(path) = path {
            figment = match path.extension().and_then(|ext| ext.to_str()) {
                Some("yaml" | "yml") => figment.merge(Yaml::file(path)),
                Some("json") => figment.merge(Json::file(path)),
                _ => figment.merge(Toml::file(path)),
            };
        }
        figment.merge(Env::prefixed("SHELF_").split("__"))
    }

    /// Platform configuration directory, if the platform has one.
    pub fn config_dir() -> Option<PathBuf> {
        ProjectDirs::from("org", "shelf", "shelf").map(|dirs| dirs.config_dir().to_path_buf())
    }

    pub fn validate(&self) -> Result<()> {
        if self.catalog.base_url.trim().is_empty() {
            exn::bail!(ErrorKind::Validation("catalog.base_url"));
        }
        if self.catalog.attempts == 0 {
            exn::bail!(ErrorKind::Validation("catalog.attempts"));
        }
        if let Some(code) = &self.library.default_language {
            Locale::resolve(code).or_raise(|| ErrorKind::Validation("library.default_language"))?;
        }
        if self.scan.extensions.iter().any(|ext| ext.is_empty() || ext.starts_with('.')) {
            exn::bail!(ErrorKind::Validation("scan.extensions"));
        }
        Ok(())
    }

    /// The locale used as the initial active language.
    ///
    /// Order: configured value, `LC_ALL`, `LANG`, then [`FALLBACK_LANGUAGE`].
    pub fn default_locale(&self) -> &'static Locale {
        let lc_all = std::env::var("LC_ALL").ok();
        let lang = std::env::var("LANG").ok();
        resolve_default_locale(self.library.default_language.as_deref(), lc_all.as_deref(), lang.as_deref())
    }
}

fn resolve_default_locale(configured: Option<&str>, lc_all: Option<&str>, lang: Option<&str>) -> &'static Locale {
    configured
        .and_then(|code| Locale::resolve(code).ok())
        .or_else(|| lc_all.and_then(Locale::from_posix))
        .or_else(|| lang.and_then(Locale::from_posix))
        .or_else(|| Locale::from_iso3(FALLBACK_LANGUAGE))
        .unwrap_or(&Locale::all()[0])
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::fs;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.catalog.attempts, 5);
        assert!(config.library.wifi_only);
        assert_eq!(config.catalog.url(), "https://download.kiwix.org/library/library_zim.xml");
    }

    #[rstest]
    #[case("https://example.org", "/catalog.json", "https://example.org/catalog.json")]
    #[case("https://example.org///", "catalog.json", "https://example.org/catalog.json")]
    fn test_catalog_url(#[case] base_url: &str, #[case] path: &str, #[case] expected: &str) {
        let catalog = CatalogConfig { base_url: base_url.into(), path: path.into(), ..CatalogConfig::default() };
        assert_eq!(catalog.url(), expected);
    }

    #[test]
    fn test_explicit_toml_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shelf.toml");
        fs::write(&path, "[catalog]\nattempts = 2\n\n[library]\nwifi_only = false\ndefault_language = \"fr\"\n")
            .unwrap();
        let config: Config = Config::figment(Some(&path)).extract().unwrap();
        assert_eq!(config.catalog.attempts, 2);
        assert_eq!(config.catalog.path, "library/library_zim.xml");
        assert!(!config.library.wifi_only);
        assert_eq!(config.default_locale().iso3, "fra");
    }

    #[test]
    fn test_explicit_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shelf.json");
        fs::write(&path, r#"{"scan": {"directories": ["/media/books"], "extensions": ["zim", "zimaa"]}}"#).unwrap();
        let config: Config = Config::figment(Some(&path)).extract().unwrap();
        assert_eq!(config.scan.directories, vec![PathBuf::from("/media/books")]);
        assert_eq!(config.scan.extensions.len(), 2);
    }

    #[rstest]
    #[case(Config { catalog: CatalogConfig { attempts: 0, ..CatalogConfig::default() }, ..Config::default() }, "catalog.attempts")]
    #[case(Config { catalog: CatalogConfig { base_url: " ".into(), ..CatalogConfig::default() }, ..Config::default() }, "catalog.base_url")]
    #[case(Config { library: LibraryConfig { default_language: Some("klingon".into()), wifi_only: true }, ..Config::default() }, "library.default_language")]
    #[case(Config { scan: ScanConfig { directories: vec![], extensions: vec![".zim".into()] }, ..Config::default() }, "scan.extensions")]
    fn test_validation(#[case] config: Config, #[case] field: &'static str) {
        let err = config.validate().unwrap_err();
        assert_eq!(&*err, &ErrorKind::Validation(field));
    }

    #[rstest]
    #[case(Some("de"), Some("fr_FR.UTF-8"), Some("es_ES.UTF-8"), "deu")]
    #[case(None, Some("fr_FR.UTF-8"), Some("es_ES.UTF-8"), "fra")]
    #[case(None, None, Some("es_ES.UTF-8"), "spa")]
    #[case(None, Some("C"), Some("POSIX"), "eng")]
    #[case(Some("nope"), None, None, "eng")]
    fn test_default_locale(
        #[case] configured: Option<&str>,
        #[case] lc_all: Option<&str>,
        #[case] lang: Option<&str>,
        #[case] expected: &str,
    ) {
        assert_eq!(resolve_default_locale(configured, lc_all, lang).iso3, expected);
    }
}
