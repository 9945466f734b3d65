use time::OffsetDateTime;
use tracing::{debug, info, warn};

use crate::detection;
use crate::error::{Result, TranslatorError};
use crate::history::{Exchange, History};
use crate::languages::Language;
use crate::providers::{Provider, ProviderUsage};
use crate::translations;

/// Per-conversation state: the history and the selected target language.
#[derive(Debug, Clone)]
pub struct Session {
    target_language: Language,
    history: History,
}

impl Session {
    pub fn new(target_language: Language) -> Self {
        Self {
            target_language,
            history: History::new(),
        }
    }

    pub fn target_language(&self) -> Language {
        self.target_language
    }

    pub fn history(&self) -> &History {
        &self.history
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(Language::English)
    }
}

/// Runs detection then translation for each turn and records the result.
#[derive(Debug, Clone)]
pub struct Translator<P: Provider> {
    provider: P,
    session: Session,
}

impl<P: Provider> Translator<P> {
    pub fn new(provider: P, session: Session) -> Self {
        Self { provider, session }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn target_language(&self) -> Language {
        self.session.target_language
    }

    pub fn set_target_language(&mut self, target: &str) -> Result<Language> {
        let language = target.parse::<Language>()?;
        self.session.target_language = language;
        Ok(language)
    }

    pub fn history(&self) -> &[Exchange] {
        self.session.history.all()
    }

    pub fn clear_history(&mut self) {
        self.session.history.clear();
    }

    /// Translates into the session's current target language.
    pub async fn run_turn_in_session(&mut self, input: &str) -> Result<Exchange> {
        let target = self.session.target_language;
        self.execute(input, target).await
    }

    /// One full turn. Nothing is recorded unless both stages succeed.
    pub async fn run_turn(&mut self, input: &str, target: &str) -> Result<Exchange> {
        let target = target.parse::<Language>()?;
        self.execute(input, target).await
    }

    async fn execute(&mut self, input: &str, target: Language) -> Result<Exchange> {
        match self.build_exchange(input, target).await {
            Ok(exchange) => {
                info!(
                    "turn completed: {} -> {}",
                    exchange.detection.language, target
                );
                debug!(
                    "model: {}, usage: {:?}",
                    exchange.model.as_deref().unwrap_or("unavailable"),
                    exchange.usage
                );
                self.session.history.append(exchange.clone());
                Ok(exchange)
            }
            Err(err) => {
                warn!("turn failed ({}): {}", err.kind(), err);
                Err(err)
            }
        }
    }

    async fn build_exchange(&self, input: &str, target: Language) -> Result<Exchange> {
        if input.trim().is_empty() {
            return Err(TranslatorError::EmptyInput);
        }

        let detection = detection::detect(&self.provider, input).await?;
        let translation =
            translations::translate(&self.provider, input, &detection.result, target).await?;

        Ok(Exchange {
            input_text: input.to_string(),
            detection: detection.result,
            translation: translation.result,
            timestamp: OffsetDateTime::now_utc(),
            model: translation.model.or(detection.model),
            usage: ProviderUsage::combine(detection.usage, translation.usage),
        })
    }
}
