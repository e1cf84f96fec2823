//! Language codes for per-language deliverables.

use std::fmt;

use serde::Serialize;

use crate::foundation::error::{SketchError, SketchResult};

/// A known narration language.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Language {
    pub code: &'static str,
    pub name: &'static str,
    pub native_name: &'static str,
}

const fn lang(code: &'static str, name: &'static str, native_name: &'static str) -> Language {
    Language {
        code,
        name,
        native_name,
    }
}

/// Languages with display names. Any other well-formed code is still accepted.
pub const KNOWN_LANGUAGES: &[Language] = &[
    lang("en-US", "English (US)", "English (United States)"),
    lang("en-GB", "English (UK)", "English (United Kingdom)"),
    lang("en-AU", "English (AU)", "English (Australia)"),
    lang("es-ES", "Spanish (Spain)", "Español (España)"),
    lang("es-MX", "Spanish (Mexico)", "Español (México)"),
    lang("es-AR", "Spanish (Argentina)", "Español (Argentina)"),
    lang("fr-FR", "French (France)", "Français (France)"),
    lang("fr-CA", "French (Canada)", "Français (Canada)"),
    lang("de-DE", "German (Germany)", "Deutsch (Deutschland)"),
    lang("de-AT", "German (Austria)", "Deutsch (Österreich)"),
    lang("de-CH", "German (Switzerland)", "Deutsch (Schweiz)"),
    lang("it-IT", "Italian", "Italiano"),
    lang("pt-BR", "Portuguese (Brazil)", "Português (Brasil)"),
    lang("pt-PT", "Portuguese (Portugal)", "Português (Portugal)"),
    lang("nl-NL", "Dutch (Netherlands)", "Nederlands (Nederland)"),
    lang("sv-SE", "Swedish", "Svenska"),
    lang("no-NO", "Norwegian", "Norsk"),
    lang("da-DK", "Danish", "Dansk"),
    lang("fi-FI", "Finnish", "Suomi"),
    lang("pl-PL", "Polish", "Polski"),
    lang("cs-CZ", "Czech", "Čeština"),
    lang("ru-RU", "Russian", "Русский"),
    lang("uk-UA", "Ukrainian", "Українська"),
    lang("el-GR", "Greek", "Ελληνικά"),
    lang("tr-TR", "Turkish", "Türkçe"),
    lang("ar-SA", "Arabic (Saudi Arabia)", "العربية (السعودية)"),
    lang("he-IL", "Hebrew", "עברית"),
    lang("fa-IR", "Persian (Iran)", "فارسی (ایران)"),
    lang("hi-IN", "Hindi", "हिन्दी"),
    lang("bn-IN", "Bengali (India)", "বাংলা (ভারত)"),
    lang("ta-IN", "Tamil (India)", "தமிழ் (இந்தியா)"),
    lang("zh-CN", "Chinese (Mandarin)", "中文 (普通话)"),
    lang("zh-TW", "Chinese (Traditional)", "中文 (繁體)"),
    lang("ja-JP", "Japanese", "日本語"),
    lang("ko-KR", "Korean", "한국어"),
    lang("th-TH", "Thai", "ไทย"),
    lang("vi-VN", "Vietnamese", "Tiếng Việt"),
    lang("id-ID", "Indonesian", "Bahasa Indonesia"),
    lang("ms-MY", "Malay", "Bahasa Melayu"),
    lang("fil-PH", "Filipino", "Filipino"),
];

/// A validated language code: `ll`, `lll`, or either followed by `-RR`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct LanguageTag(String);

impl LanguageTag {
    /// Validate and normalize (`EN-us` becomes `en-US`).
    pub fn parse(code: &str) -> SketchResult<Self> {
        let code = code.trim();
        let (base, region) = match code.split_once('-') {
            Some((b, r)) => (b, Some(r)),
            None => (code, None),
        };
        let base_ok = (2..=3).contains(&base.len()) && base.chars().all(|c| c.is_ascii_alphabetic());
        let region_ok = region
            .map(|r| r.len() == 2 && r.chars().all(|c| c.is_ascii_alphabetic()))
            .unwrap_or(true);
        if !base_ok || !region_ok {
            return Err(SketchError::input(format!(
                "invalid language code '{code}' (expected e.g. 'en' or 'en-US')"
            )));
        }
        let mut normalized = base.to_ascii_lowercase();
        if let Some(r) = region {
            normalized.push('-');
            normalized.push_str(&r.to_ascii_uppercase());
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Language part without the region.
    pub fn base(&self) -> &str {
        self.0.split('-').next().unwrap_or(&self.0)
    }

    pub fn known(&self) -> Option<&'static Language> {
        lookup(&self.0)
    }

    /// English display name, falling back to the code itself.
    pub fn display_name(&self) -> String {
        match lookup(&self.0) {
            Some(l) if l.code == self.0 => l.name.to_owned(),
            Some(l) => strip_region(l.name).to_owned(),
            None => self.0.clone(),
        }
    }

    /// Native display name, falling back to the code itself.
    pub fn native_name(&self) -> String {
        match lookup(&self.0) {
            Some(l) if l.code == self.0 => l.native_name.to_owned(),
            Some(l) => strip_region(l.native_name).to_owned(),
            None => self.0.clone(),
        }
    }
}

impl fmt::Display for LanguageTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Exact match first, then the first entry sharing the base language.
pub fn lookup(code: &str) -> Option<&'static Language> {
    if let Some(l) = KNOWN_LANGUAGES.iter().find(|l| l.code.eq_ignore_ascii_case(code)) {
        return Some(l);
    }
    let base = code.split('-').next().unwrap_or(code);
    KNOWN_LANGUAGES.iter().find(|l| {
        l.code
            .split('-')
            .next()
            .is_some_and(|b| b.eq_ignore_ascii_case(base))
    })
}

fn strip_region(name: &str) -> &str {
    name.split(" (").next().unwrap_or(name)
}
