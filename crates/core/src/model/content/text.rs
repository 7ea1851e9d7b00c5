use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TextError {
    #[error("Text must not be empty.")]
    Empty,

    #[error("unknown locale: {0}")]
    UnknownLocale(String),
}

/// Interface language of the learner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    Ru,
    Tg,
}

impl Locale {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Locale::Ru => "ru",
            Locale::Tg => "tg",
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Locale {
    type Err = TextError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ru" => Ok(Locale::Ru),
            "tg" => Ok(Locale::Tg),
            other => Err(TextError::UnknownLocale(other.to_owned())),
        }
    }
}

/// Russian text with an optional Tajik translation.
///
/// Russian is the authoring language and is always present; lookups for
/// Tajik fall back to it when no translation exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalizedText {
    ru: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tg: Option<String>,
}

impl LocalizedText {
    /// # Errors
    ///
    /// Returns `TextError::Empty` if the Russian text is blank.
    pub fn new(ru: impl Into<String>, tg: Option<String>) -> Result<Self, TextError> {
        let ru = ru.into();
        if ru.trim().is_empty() {
            return Err(TextError::Empty);
        }
        let tg = tg.filter(|t| !t.trim().is_empty());
        Ok(Self { ru, tg })
    }

    /// # Errors
    ///
    /// Returns `TextError::Empty` if the text is blank.
    pub fn ru_only(ru: impl Into<String>) -> Result<Self, TextError> {
        Self::new(ru, None)
    }

    /// Re-check a value that came in through deserialization.
    ///
    /// # Errors
    ///
    /// Returns `TextError::Empty` if the Russian text is blank.
    pub fn validate(&self) -> Result<(), TextError> {
        if self.ru.trim().is_empty() {
            return Err(TextError::Empty);
        }
        Ok(())
    }

    #[must_use]
    pub fn get(&self, locale: Locale) -> &str {
        match (locale, self.tg.as_deref()) {
            (Locale::Tg, Some(tg)) if !tg.trim().is_empty() => tg,
            _ => &self.ru,
        }
    }

    #[must_use]
    pub fn ru(&self) -> &str {
        &self.ru
    }

    #[must_use]
    pub fn tg(&self) -> Option<&str> {
        self.tg.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_russian_is_rejected() {
        assert_eq!(LocalizedText::ru_only("  ").unwrap_err(), TextError::Empty);
    }

    #[test]
    fn tajik_falls_back_to_russian() {
        let t = LocalizedText::ru_only("Вопрос").unwrap();
        assert_eq!(t.get(Locale::Tg), "Вопрос");

        let t = LocalizedText::new("Вопрос", Some("Савол".into())).unwrap();
        assert_eq!(t.get(Locale::Tg), "Савол");
        assert_eq!(t.get(Locale::Ru), "Вопрос");
    }

    #[test]
    fn blank_translation_is_dropped() {
        let t = LocalizedText::new("Вопрос", Some(" ".into())).unwrap();
        assert_eq!(t.tg(), None);
    }

    #[test]
    fn locale_parses_case_insensitively() {
        assert_eq!("TG".parse::<Locale>().unwrap(), Locale::Tg);
        assert!("en".parse::<Locale>().is_err());
    }
}
