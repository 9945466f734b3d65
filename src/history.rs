use serde::Serialize;
use time::OffsetDateTime;

use crate::detection::DetectionResult;
use crate::providers::ProviderUsage;
use crate::translations::TranslationResult;

/// One completed detection + translation turn.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Exchange {
    pub input_text: String,
    pub detection: DetectionResult,
    pub translation: TranslationResult,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<ProviderUsage>,
}

/// Chronological log of the exchanges of one session.
///
/// Appends are not synchronized; callers sharing a session across tasks must
/// serialize turns themselves.
#[derive(Debug, Clone, Default)]
pub struct History {
    exchanges: Vec<Exchange>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, exchange: Exchange) {
        self.exchanges.push(exchange);
    }

    /// Oldest first.
    pub fn all(&self) -> &[Exchange] {
        &self.exchanges
    }

    pub fn clear(&mut self) {
        self.exchanges.clear();
    }

    pub fn len(&self) -> usize {
        self.exchanges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exchanges.is_empty()
    }

    pub fn last(&self) -> Option<&Exchange> {
        self.exchanges.last()
    }

    /// Up to `limit` exchanges, newest first.
    pub fn recent(&self, limit: usize) -> impl Iterator<Item = &Exchange> {
        self.exchanges.iter().rev().take(limit)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::detection::Formality;
    use crate::languages::Language;

    pub(crate) fn exchange(input: &str) -> Exchange {
        Exchange {
            input_text: input.to_string(),
            detection: DetectionResult {
                language: "english".to_string(),
                confidence: 0.9,
                formality: Formality::Neutral,
                is_idiom_or_slang: false,
                notes: None,
            },
            translation: TranslationResult {
                primary_translation: format!("{} (es)", input),
                literal_translation: None,
                alternatives: Vec::new(),
                cultural_note: None,
                target_language: Language::Spanish,
            },
            timestamp: OffsetDateTime::UNIX_EPOCH,
            model: None,
            usage: None,
        }
    }

    #[test]
    fn keeps_insertion_order() {
        let mut history = History::new();
        for input in ["one", "two", "three"] {
            history.append(exchange(input));
        }
        let inputs = history
            .all()
            .iter()
            .map(|exchange| exchange.input_text.as_str())
            .collect::<Vec<_>>();
        assert_eq!(inputs, vec!["one", "two", "three"]);
        assert_eq!(history.last().map(|e| e.input_text.as_str()), Some("three"));
    }

    #[test]
    fn duplicates_are_kept() {
        let mut history = History::new();
        history.append(exchange("same"));
        history.append(exchange("same"));
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn clear_empties_the_log() {
        let mut history = History::new();
        history.append(exchange("hello"));
        history.clear();
        assert!(history.is_empty());
        assert!(history.all().is_empty());
        assert!(history.last().is_none());
    }

    #[test]
    fn recent_is_newest_first_and_bounded() {
        let mut history = History::new();
        for input in ["a", "b", "c", "d"] {
            history.append(exchange(input));
        }
        let recent = history
            .recent(2)
            .map(|exchange| exchange.input_text.as_str())
            .collect::<Vec<_>>();
        assert_eq!(recent, vec!["d", "c"]);
        assert_eq!(history.recent(10).count(), 4);
    }

    #[test]
    fn serializes_with_camel_case_and_rfc3339() {
        let value = serde_json::to_value(exchange("hi")).unwrap();
        assert_eq!(value["inputText"], "hi");
        assert_eq!(value["timestamp"], "1970-01-01T00:00:00Z");
        assert_eq!(value["detection"]["isIdiomOrSlang"], false);
        assert_eq!(value["translation"]["targetLanguage"], "spanish");
        assert_eq!(value["translation"]["alternatives"], serde_json::json!([]));
        assert!(value["translation"].get("literalTranslation").is_none());
        assert!(value.get("usage").is_none());
    }
}
