//! ISO 639 locale table.
//!
//! Every two-letter ISO 639-1 language together with its three-letter
//! ISO 639-2/T code (the code catalog books are tagged with) and an English
//! display name. The table is ordered by ISO 639-1 code, which is the order the
//! language reconciler enumerates it in.

use crate::error::{ErrorKind, Result};
use std::collections::HashMap;
use std::sync::LazyLock;

/// A language known to the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Locale {
    /// ISO 639-1 code, e.g. `"en"`.
    pub iso1: &'static str,
    /// ISO 639-2/T code, e.g. `"eng"`.
    pub iso3: &'static str,
    /// English display name, e.g. `"English"`.
    pub name: &'static str,
}

impl Locale {
    const fn new(iso1: &'static str, iso3: &'static str, name: &'static str) -> Self {
        Self { iso1, iso3, name }
    }

    /// All known locales, ordered by ISO 639-1 code.
    pub fn all() -> &'static [Locale] {
        LOCALES
    }

    /// Looks up a locale by its three-letter code.
    ///
    /// # Examples
    ///
    /// ```
    /// use shelf_catalog::Locale;
    /// assert_eq!(Locale::from_iso3("fra").map(|l| l.name), Some("French"));
    /// assert_eq!(Locale::from_iso3("xxx"), None);
    /// ```
    pub fn from_iso3(code: &str) -> Option<&'static Locale> {
        BY_ISO3.get(code).copied()
    }

    /// Looks up a locale by its two-letter code.
    pub fn from_iso1(code: &str) -> Option<&'static Locale> {
        BY_ISO1.get(code).copied()
    }

    /// Resolves either a two- or three-letter code (case-insensitive).
    pub fn resolve(code: &str) -> Result<&'static Locale> {
        let lower = code.trim().to_lowercase();
        Self::from_iso3(&lower)
            .or_else(|| Self::from_iso1(&lower))
            .ok_or_else(|| exn::Exn::from(ErrorKind::UnknownLanguage(code.to_string())))
    }

    /// Parses a POSIX locale string such as `fr_FR.UTF-8` or `de-AT`.
    ///
    /// # Examples
    ///
    /// ```
    /// use shelf_catalog::Locale;
    /// assert_eq!(Locale::from_posix("fr_FR.UTF-8").map(|l| l.iso3), Some("fra"));
    /// assert_eq!(Locale::from_posix("C"), None);
    /// ```
    pub fn from_posix(value: &str) -> Option<&'static Locale> {
        let language = value.split(['_', '-', '.', '@']).next()?;
        Self::resolve(language).ok()
    }
}

static BY_ISO3: LazyLock<HashMap<&'static str, &'static Locale>> =
    LazyLock::new(|| LOCALES.iter().map(|locale| (locale.iso3, locale)).collect());

static BY_ISO1: LazyLock<HashMap<&'static str, &'static Locale>> =
    LazyLock::new(|| LOCALES.iter().map(|locale| (locale.iso1, locale)).collect());

static LOCALES: &[Locale] = &[
    Locale::new("aa", "aar", "Afar"),
    Locale::new("ab", "abk", "Abkhazian"),
    Locale::new("ae", "ave", "Avestan"),
    Locale::new("af", "afr", "Afrikaans"),
    Locale::new("ak", "aka", "Akan"),
    Locale::new("am", "amh", "Amharic"),
    Locale::new("an", "arg", "Aragonese"),
    Locale::new("ar", "ara", "Arabic"),
    Locale::new("as", "asm", "Assamese"),
    Locale::new("av", "ava", "Avaric"),
    Locale::new("ay", "aym", "Aymara"),
    Locale::new("az", "aze", "Azerbaijani"),
    Locale::new("ba", "bak", "Bashkir"),
    Locale::new("be", "bel", "Belarusian"),
    Locale::new("bg", "bul", "Bulgarian"),
    Locale::new("bh", "bih", "Bihari"),
    Locale::new("bi", "bis", "Bislama"),
    Locale::new("bm", "bam", "Bambara"),
    Locale::new("bn", "ben", "Bangla"),
    Locale::new("bo", "bod", "Tibetan"),
    Locale::new("br", "bre", "Breton"),
    Locale::new("bs", "bos", "Bosnian"),
    Locale::new("ca", "cat", "Catalan"),
    Locale::new("ce", "che", "Chechen"),
    Locale::new("ch", "cha", "Chamorro"),
    Locale::new("co", "cos", "Corsican"),
    Locale::new("cr", "cre", "Cree"),
    Locale::new("cs", "ces", "Czech"),
    Locale::new("cu", "chu", "Church Slavic"),
    Locale::new("cv", "chv", "Chuvash"),
    Locale::new("cy", "cym", "Welsh"),
    Locale::new("da", "dan", "Danish"),
    Locale::new("de", "deu", "German"),
    Locale::new("dv", "div", "Divehi"),
    Locale::new("dz", "dzo", "Dzongkha"),
    Locale::new("ee", "ewe", "Ewe"),
    Locale::new("el", "ell", "Greek"),
    Locale::new("en", "eng", "English"),
    Locale::new("eo", "epo", "Esperanto"),
    Locale::new("es", "spa", "Spanish"),
    Locale::new("et", "est", "Estonian"),
    Locale::new("eu", "eus", "Basque"),
    Locale::new("fa", "fas", "Persian"),
    Locale::new("ff", "ful", "Fula"),
    Locale::new("fi", "fin", "Finnish"),
    Locale::new("fj", "fij", "Fijian"),
    Locale::new("fo", "fao", "Faroese"),
    Locale::new("fr", "fra", "French"),
    Locale::new("fy", "fry", "Western Frisian"),
    Locale::new("ga", "gle", "Irish"),
    Locale::new("gd", "gla", "Scottish Gaelic"),
    Locale::new("gl", "glg", "Galician"),
    Locale::new("gn", "grn", "Guarani"),
    Locale::new("gu", "guj", "Gujarati"),
    Locale::new("gv", "glv", "Manx"),
    Locale::new("ha", "hau", "Hausa"),
    Locale::new("he", "heb", "Hebrew"),
    Locale::new("hi", "hin", "Hindi"),
    Locale::new("ho", "hmo", "Hiri Motu"),
    Locale::new("hr", "hrv", "Croatian"),
    Locale::new("ht", "hat", "Haitian Creole"),
    Locale::new("hu", "hun", "Hungarian"),
    Locale::new("hy", "hye", "Armenian"),
    Locale::new("hz", "her", "Herero"),
    Locale::new("ia", "ina", "Interlingua"),
    Locale::new("id", "ind", "Indonesian"),
    Locale::new("ie", "ile", "Interlingue"),
    Locale::new("ig", "ibo", "Igbo"),
    Locale::new("ii", "iii", "Sichuan Yi"),
    Locale::new("ik", "ipk", "Inupiaq"),
    Locale::new("io", "ido", "Ido"),
    Locale::new("is", "isl", "Icelandic"),
    Locale::new("it", "ita", "Italian"),
    Locale::new("iu", "iku", "Inuktitut"),
    Locale::new("ja", "jpn", "Japanese"),
    Locale::new("jv", "jav", "Javanese"),
    Locale::new("ka", "kat", "Georgian"),
    Locale::new("kg", "kon", "Kongo"),
    Locale::new("ki", "kik", "Kikuyu"),
    Locale::new("kj", "kua", "Kuanyama"),
    Locale::new("kk", "kaz", "Kazakh"),
    Locale::new("kl", "kal", "Kalaallisut"),
    Locale::new("km", "khm", "Khmer"),
    Locale::new("kn", "kan", "Kannada"),
    Locale::new("ko", "kor", "Korean"),
    Locale::new("kr", "kau", "Kanuri"),
    Locale::new("ks", "kas", "Kashmiri"),
    Locale::new("ku", "kur", "Kurdish"),
    Locale::new("kv", "kom", "Komi"),
    Locale::new("kw", "cor", "Cornish"),
    Locale::new("ky", "kir", "Kyrgyz"),
    Locale::new("la", "lat", "Latin"),
    Locale::new("lb", "ltz", "Luxembourgish"),
    Locale::new("lg", "lug", "Ganda"),
    Locale::new("li", "lim", "Limburgish"),
    Locale::new("ln", "lin", "Lingala"),
    Locale::new("lo", "lao", "Lao"),
    Locale::new("lt", "lit", "Lithuanian"),
    Locale::new("lu", "lub", "Luba-Katanga"),
    Locale::new("lv", "lav", "Latvian"),
    Locale::new("mg", "mlg", "Malagasy"),
    Locale::new("mh", "mah", "Marshallese"),
    Locale::new("mi", "mri", "Maori"),
    Locale::new("mk", "mkd", "Macedonian"),
    Locale::new("ml", "mal", "Malayalam"),
    Locale::new("mn", "mon", "Mongolian"),
    Locale::new("mr", "mar", "Marathi"),
    Locale::new("ms", "msa", "Malay"),
    Locale::new("mt", "mlt", "Maltese"),
    Locale::new("my", "mya", "Burmese"),
    Locale::new("na", "nau", "Nauru"),
    Locale::new("nb", "nob", "Norwegian Bokmål"),
    Locale::new("nd", "nde", "North Ndebele"),
    Locale::new("ne", "nep", "Nepali"),
    Locale::new("ng", "ndo", "Ndonga"),
    Locale::new("nl", "nld", "Dutch"),
    Locale::new("nn", "nno", "Norwegian Nynorsk"),
    Locale::new("no", "nor", "Norwegian"),
    Locale::new("nr", "nbl", "South Ndebele"),
    Locale::new("nv", "nav", "Navajo"),
    Locale::new("ny", "nya", "Nyanja"),
    Locale::new("oc", "oci", "Occitan"),
    Locale::new("oj", "oji", "Ojibwa"),
    Locale::new("om", "orm", "Oromo"),
    Locale::new("or", "ori", "Odia"),
    Locale::new("os", "oss", "Ossetic"),
    Locale::new("pa", "pan", "Punjabi"),
    Locale::new("pi", "pli", "Pali"),
    Locale::new("pl", "pol", "Polish"),
    Locale::new("ps", "pus", "Pashto"),
    Locale::new("pt", "por", "Portuguese"),
    Locale::new("qu", "que", "Quechua"),
    Locale::new("rm", "roh", "Romansh"),
    Locale::new("rn", "run", "Rundi"),
    Locale::new("ro", "ron", "Romanian"),
    Locale::new("ru", "rus", "Russian"),
    Locale::new("rw", "kin", "Kinyarwanda"),
    Locale::new("sa", "san", "Sanskrit"),
    Locale::new("sc", "srd", "Sardinian"),
    Locale::new("sd", "snd", "Sindhi"),
    Locale::new("se", "sme", "Northern Sami"),
    Locale::new("sg", "sag", "Sango"),
    Locale::new("si", "sin", "Sinhala"),
    Locale::new("sk", "slk", "Slovak"),
    Locale::new("sl", "slv", "Slovenian"),
    Locale::new("sm", "smo", "Samoan"),
    Locale::new("sn", "sna", "Shona"),
    Locale::new("so", "som", "Somali"),
    Locale::new("sq", "sqi", "Albanian"),
    Locale::new("sr", "srp", "Serbian"),
    Locale::new("ss", "ssw", "Swati"),
    Locale::new("st", "sot", "Southern Sotho"),
    Locale::new("su", "sun", "Sundanese"),
    Locale::new("sv", "swe", "Swedish"),
    Locale::new("sw", "swa", "Swahili"),
    Locale::new("ta", "tam", "Tamil"),
    Locale::new("te", "tel", "Telugu"),
    Locale::new("tg", "tgk", "Tajik"),
    Locale::new("th", "tha", "Thai"),
    Locale::new("ti", "tir", "Tigrinya"),
    Locale::new("tk", "tuk", "Turkmen"),
    Locale::new("tl", "tgl", "Tagalog"),
    Locale::new("tn", "tsn", "Tswana"),
    Locale::new("to", "ton", "Tongan"),
    Locale::new("tr", "tur", "Turkish"),
    Locale::new("ts", "tso", "Tsonga"),
    Locale::new("tt", "tat", "Tatar"),
    Locale::new("tw", "twi", "Twi"),
    Locale::new("ty", "tah", "Tahitian"),
    Locale::new("ug", "uig", "Uyghur"),
    Locale::new("uk", "ukr", "Ukrainian"),
    Locale::new("ur", "urd", "Urdu"),
    Locale::new("uz", "uzb", "Uzbek"),
    Locale::new("ve", "ven", "Venda"),
    Locale::new("vi", "vie", "Vietnamese"),
    Locale::new("vo", "vol", "Volapük"),
    Locale::new("wa", "wln", "Walloon"),
    Locale::new("wo", "wol", "Wolof"),
    Locale::new("xh", "xho", "Xhosa"),
    Locale::new("yi", "yid", "Yiddish"),
    Locale::new("yo", "yor", "Yoruba"),
    Locale::new("za", "zha", "Zhuang"),
    Locale::new("zh", "zho", "Chinese"),
    Locale::new("zu", "zul", "Zulu"),
];
