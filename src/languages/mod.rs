use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::TranslatorError;

/// Target languages a turn may translate into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    English,
    Spanish,
    French,
    German,
    Italian,
    Portuguese,
    Chinese,
    Japanese,
    Korean,
    Russian,
    Arabic,
    Hindi,
    Dutch,
    Swedish,
    Norwegian,
}

impl Language {
    pub const ALL: [Language; 15] = [
        Language::English,
        Language::Spanish,
        Language::French,
        Language::German,
        Language::Italian,
        Language::Portuguese,
        Language::Chinese,
        Language::Japanese,
        Language::Korean,
        Language::Russian,
        Language::Arabic,
        Language::Hindi,
        Language::Dutch,
        Language::Swedish,
        Language::Norwegian,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Language::English => "english",
            Language::Spanish => "spanish",
            Language::French => "french",
            Language::German => "german",
            Language::Italian => "italian",
            Language::Portuguese => "portuguese",
            Language::Chinese => "chinese",
            Language::Japanese => "japanese",
            Language::Korean => "korean",
            Language::Russian => "russian",
            Language::Arabic => "arabic",
            Language::Hindi => "hindi",
            Language::Dutch => "dutch",
            Language::Swedish => "swedish",
            Language::Norwegian => "norwegian",
        }
    }

    /// ISO 639-1 code.
    pub fn code(&self) -> &'static str {
        match self {
            Language::English => "en",
            Language::Spanish => "es",
            Language::French => "fr",
            Language::German => "de",
            Language::Italian => "it",
            Language::Portuguese => "pt",
            Language::Chinese => "zh",
            Language::Japanese => "ja",
            Language::Korean => "ko",
            Language::Russian => "ru",
            Language::Arabic => "ar",
            Language::Hindi => "hi",
            Language::Dutch => "nl",
            Language::Swedish => "sv",
            Language::Norwegian => "no",
        }
    }

    pub fn flag(&self) -> &'static str {
        match self {
            Language::English => "🇬🇧",
            Language::Spanish => "🇪🇸",
            Language::French => "🇫🇷",
            Language::German => "🇩🇪",
            Language::Italian => "🇮🇹",
            Language::Portuguese => "🇵🇹",
            Language::Chinese => "🇨🇳",
            Language::Japanese => "🇯🇵",
            Language::Korean => "🇰🇷",
            Language::Russian => "🇷🇺",
            Language::Arabic => "🇸🇦",
            Language::Hindi => "🇮🇳",
            Language::Dutch => "🇳🇱",
            Language::Swedish => "🇸🇪",
            Language::Norwegian => "🇳🇴",
        }
    }

    /// Looks a language up by name or ISO code, ignoring case.
    pub fn lookup(value: &str) -> Option<Language> {
        let value = normalize(value);
        Language::ALL
            .into_iter()
            .find(|lang| lang.name() == value || lang.code() == value)
    }

    /// Title-cased name, e.g. "Spanish".
    pub fn display_name(&self) -> String {
        let name = self.name();
        let mut chars = name.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }
}

impl FromStr for Language {
    type Err = TranslatorError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Language::lookup(value)
            .ok_or_else(|| TranslatorError::UnsupportedLanguage(value.trim().to_string()))
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for Language {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

pub fn supported_names() -> Vec<&'static str> {
    Language::ALL.iter().map(Language::name).collect()
}

fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}
