use anyhow::{Context, Result, anyhow};
use std::path::Path;

pub mod detection;
pub mod error;
pub mod format;
pub mod history;
pub mod languages;
pub mod logging;
pub mod providers;
mod reply;
pub mod settings;
#[cfg(test)]
mod test_util;
pub mod translations;
pub mod translator;

pub use detection::{DetectionResult, Formality};
pub use error::{Stage, TranslatorError};
pub use history::{Exchange, History};
pub use languages::Language;
pub use providers::{Claude, OpenAI, Provider, ProviderImpl, ProviderKind, ProviderUsage};
pub use settings::Settings;
pub use translations::TranslationResult;
pub use translator::{Session, Translator};

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub lang: Option<String>,
    pub model: Option<String>,
    pub key: Option<String>,
    pub settings_path: Option<String>,
    pub json: bool,
    pub show_languages: bool,
    pub with_using_tokens: bool,
    pub with_using_model: bool,
}

/// One-shot mode: a single turn in a fresh session.
pub async fn run(config: Config, input: Option<String>) -> Result<String> {
    if config.show_languages {
        return Ok(format_languages());
    }

    let settings = load_settings(&config)?;
    let input = input.unwrap_or_default();
    let input = input.trim();
    if input.is_empty() {
        return Err(anyhow!("stdin is empty"));
    }

    let mut translator = build_translator(&config, &settings)?;
    let exchange = translator.run_turn_in_session(input).await?;
    format_turn(&exchange, &config)
}

pub fn load_settings(config: &Config) -> Result<Settings> {
    let settings_path = config.settings_path.as_deref().map(Path::new);
    settings::load_settings(settings_path)
}

/// Gateway and session for `config`, with CLI flags taking precedence over settings.
pub fn build_translator(config: &Config, settings: &Settings) -> Result<Translator<ProviderImpl>> {
    let target = match config.lang.as_deref() {
        Some(lang) => lang.parse::<Language>()?,
        None => settings.target_language,
    };

    let selection =
        providers::resolve_provider_selection(config.model.as_deref(), &settings.provider)?;
    let key = providers::resolve_key(selection.provider, config.key.as_deref())
        .with_context(|| "no API key found for selected provider")?;
    let mut options = settings.provider_options();
    // A configured model only applies to the configured provider.
    if config.model.is_some() {
        options.model = selection.requested_model;
    }

    let provider = providers::build_provider(selection.provider, key, options);
    Ok(Translator::new(provider, Session::new(target)))
}

/// Renders a finished exchange, plus the optional model / token lines.
pub fn format_turn(exchange: &Exchange, config: &Config) -> Result<String> {
    let mut output = if config.json {
        serde_json::to_string_pretty(exchange).with_context(|| "failed to serialize exchange")?
    } else {
        format::render_exchange(exchange)
    };
    let mut meta_lines = Vec::new();

    if config.with_using_model {
        let model = exchange.model.as_deref().unwrap_or("unavailable");
        meta_lines.push(format!("model: {}", model));
    }

    if config.with_using_tokens {
        meta_lines.push(format_usage(exchange.usage.as_ref()));
    }

    if !meta_lines.is_empty() {
        output.push('\n');
        output.push_str(&meta_lines.join("\n"));
    }

    Ok(output)
}

pub fn format_languages() -> String {
    Language::ALL
        .iter()
        .map(|language| {
            format!(
                "{}\t{} {}",
                language.code(),
                language.flag(),
                language.display_name()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_usage(usage: Option<&ProviderUsage>) -> String {
    let Some(usage) = usage else {
        return "tokens: unavailable".to_string();
    };
    let total = usage.total_tokens.or_else(|| {
        usage
            .prompt_tokens
            .zip(usage.completion_tokens)
            .map(|(prompt, completion)| prompt + completion)
    });

    let mut parts = Vec::new();
    if let Some(prompt) = usage.prompt_tokens {
        parts.push(format!("prompt={}", prompt));
    }
    if let Some(completion) = usage.completion_tokens {
        parts.push(format!("completion={}", completion));
    }
    if let Some(total) = total {
        parts.push(format!("total={}", total));
    }

    if parts.is_empty() {
        "tokens: unavailable".to_string()
    } else {
        format!("tokens: {}", parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::tests::exchange;
    use crate::test_util::with_temp_home;

    #[test]
    fn usage_line_sums_missing_total() {
        let usage = ProviderUsage {
            prompt_tokens: Some(12),
            completion_tokens: Some(30),
            total_tokens: None,
        };
        assert_eq!(
            format_usage(Some(&usage)),
            "tokens: prompt=12, completion=30, total=42"
        );
        assert_eq!(format_usage(None), "tokens: unavailable");
        assert_eq!(
            format_usage(Some(&ProviderUsage::default())),
            "tokens: unavailable"
        );
    }

    #[test]
    fn meta_lines_follow_the_reply() {
        let mut exchange = exchange("hello");
        exchange.model = Some("openai/gpt-4o-mini".to_string());
        let config = Config {
            with_using_model: true,
            with_using_tokens: true,
            ..Config::default()
        };
        let output = format_turn(&exchange, &config).unwrap();
        assert!(output.ends_with("\nmodel: openai/gpt-4o-mini\ntokens: unavailable"));
    }

    #[test]
    fn json_output_is_the_serialized_exchange() {
        let config = Config {
            json: true,
            ..Config::default()
        };
        let output = format_turn(&exchange("hello"), &config).unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["inputText"], "hello");
        assert_eq!(value["translation"]["primaryTranslation"], "hello (es)");
    }

    #[test]
    fn languages_are_listed_with_codes_and_flags() {
        let listing = format_languages();
        assert_eq!(listing.lines().count(), 15);
        assert!(listing.lines().any(|line| line == "es\t🇪🇸 Spanish"));
    }

    #[test]
    fn cli_language_overrides_settings() {
        with_temp_home(|_| {
            let config = Config {
                lang: Some("ja".to_string()),
                key: Some("sk-test".to_string()),
                ..Config::default()
            };
            let translator = build_translator(&config, &Settings::default()).unwrap();
            assert_eq!(translator.target_language(), Language::Japanese);

            let translator = build_translator(
                &Config {
                    lang: None,
                    ..config
                },
                &Settings::default(),
            )
            .unwrap();
            assert_eq!(translator.target_language(), Language::English);
        });
    }

    #[test]
    fn unsupported_cli_language_is_rejected() {
        with_temp_home(|_| {
            let config = Config {
                lang: Some("klingon".to_string()),
                key: Some("sk-test".to_string()),
                ..Config::default()
            };
            let err = build_translator(&config, &Settings::default()).unwrap_err();
            assert!(err.to_string().contains("klingon"));
        });
    }

    #[test]
    fn empty_stdin_is_rejected() {
        let result = with_temp_home(|_| {
            tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap()
                .block_on(run(Config::default(), Some("  ".into())))
        });
        assert_eq!(result.unwrap_err().to_string(), "stdin is empty");
    }
}
