use super::Locale;

/// One row of the language preference table.
///
/// Codes are unique within a table. `occurrences` is the number of catalog
/// books tagged with this language at the time the table was reconciled.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Language {
    /// ISO 639-2/T code.
    pub code: String,
    pub active: bool,
    #[cfg_attr(feature = "serde", serde(default))]
    pub occurrences: u32,
}

impl Language {
    pub fn new(code: impl Into<String>, active: bool, occurrences: u32) -> Self {
        Self { code: code.into(), active, occurrences }
    }

    /// English display name, falling back to the raw code for languages
    /// outside the locale table.
    ///
    /// # Examples
    ///
    /// ```
    /// use shelf_catalog::models::Language;
    /// assert_eq!(Language::new("deu", true, 1).name(), "German");
    /// assert_eq!(Language::new("tlh", true, 1).name(), "tlh");
    /// ```
    pub fn name(&self) -> &str {
        Locale::from_iso3(&self.code).map(|locale| locale.name).unwrap_or(self.code.as_str())
    }
}

impl From<&Locale> for Language {
    fn from(locale: &Locale) -> Self {
        Self::new(locale.iso3, false, 0)
    }
}
