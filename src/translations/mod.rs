use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tera::{Context as TeraContext, Tera};
use tracing::debug;

use crate::detection::DetectionResult;
use crate::error::{Result, Stage, TranslatorError};
use crate::languages::Language;
use crate::providers::{Provider, ProviderUsage};
use crate::reply::{non_empty, parse_object};

const TRANSLATION_PROMPT: &str = include_str!("prompts/translation.tera");
pub const MAX_ALTERNATIVES: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationResult {
    pub primary_translation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub literal_translation: Option<String>,
    pub alternatives: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cultural_note: Option<String>,
    pub target_language: Language,
}

#[derive(Debug, Clone)]
pub struct TranslationOutput {
    pub result: TranslationResult,
    pub model: Option<String>,
    pub usage: Option<ProviderUsage>,
}

/// Second stage. Needs the finished detection of the same input.
pub async fn translate<P: Provider>(
    provider: &P,
    input: &str,
    detection: &DetectionResult,
    target: Language,
) -> Result<TranslationOutput> {
    let system_prompt = render_system_prompt(detection, target)?;
    let completion = provider.complete(&system_prompt, input).await?;
    debug!("translation reply: {}", completion.text);
    let result = parse_reply(&completion.text, target)?;
    Ok(TranslationOutput {
        result,
        model: completion.model,
        usage: completion.usage,
    })
}

pub fn render_system_prompt(detection: &DetectionResult, target: Language) -> Result<String> {
    let mut context = TeraContext::new();
    context.insert("target_lang", target.name());
    context.insert("source_lang", detection.language.as_str());
    context.insert("formality", detection.formality.as_str());
    context.insert("idiom", &detection.is_idiom_or_slang);
    context.insert("notes", &detection.notes);
    context.insert("max_alternatives", &MAX_ALTERNATIVES);
    Tera::one_off(TRANSLATION_PROMPT, &context, false)
        .map_err(|err| TranslatorError::Prompt(Stage::Translation, err.to_string()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TranslationReply {
    primary_translation: String,
    #[serde(default)]
    literal_translation: Option<String>,
    #[serde(default)]
    alternatives: Option<Vec<String>>,
    #[serde(default)]
    cultural_note: Option<String>,
    target_language: String,
}

/// Validates a raw translation reply against the requested target.
pub fn parse_reply(text: &str, target: Language) -> Result<TranslationResult> {
    let reply: TranslationReply = parse_object(Stage::Translation, text)?;

    let primary = reply.primary_translation.trim().to_string();
    if primary.is_empty() {
        return Err(TranslatorError::schema(
            Stage::Translation,
            "primaryTranslation is empty",
        ));
    }
    if Language::lookup(&reply.target_language) != Some(target) {
        return Err(TranslatorError::schema(
            Stage::Translation,
            format!(
                "targetLanguage mismatch (expected '{}', got '{}')",
                target, reply.target_language
            ),
        ));
    }

    let literal = non_empty(reply.literal_translation)
        .filter(|literal| !eq_insensitive(literal, &primary));
    let alternatives = normalize_alternatives(reply.alternatives.unwrap_or_default(), &primary);

    Ok(TranslationResult {
        primary_translation: primary,
        literal_translation: literal,
        alternatives,
        cultural_note: non_empty(reply.cultural_note),
        target_language: target,
    })
}

fn normalize_alternatives(alternatives: Vec<String>, primary: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    seen.insert(primary.trim().to_lowercase());
    let mut out = Vec::new();
    for alternative in alternatives {
        let trimmed = alternative.trim();
        if trimmed.is_empty() {
            continue;
        }
        if seen.insert(trimmed.to_lowercase()) {
            out.push(trimmed.to_string());
        }
        if out.len() >= MAX_ALTERNATIVES {
            break;
        }
    }
    out
}

fn eq_insensitive(left: &str, right: &str) -> bool {
    left.trim().to_lowercase() == right.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::Formality;

    fn detection(idiom: bool, notes: Option<&str>) -> DetectionResult {
        DetectionResult {
            language: "english".to_string(),
            confidence: 0.98,
            formality: Formality::Informal,
            is_idiom_or_slang: idiom,
            notes: notes.map(str::to_string),
        }
    }

    #[test]
    fn parses_full_reply() {
        let text = r#"{
            "primaryTranslation": "Está lloviendo a cántaros",
            "literalTranslation": "Está lloviendo gatos y perros",
            "alternatives": ["Está diluviando", "Llueve a mares"],
            "culturalNote": "Spanish speakers say it rains 'by the pitcherful'.",
            "targetLanguage": "Spanish"
        }"#;
        let result = parse_reply(text, Language::Spanish).unwrap();
        assert_eq!(result.primary_translation, "Está lloviendo a cántaros");
        assert_eq!(
            result.literal_translation.as_deref(),
            Some("Está lloviendo gatos y perros")
        );
        assert_eq!(result.alternatives, vec!["Está diluviando", "Llueve a mares"]);
        assert!(result.cultural_note.is_some());
        assert_eq!(result.target_language, Language::Spanish);
    }

    #[test]
    fn optional_fields_default_to_absent_and_empty() {
        let text = r#"{"primaryTranslation": "Bonjour", "targetLanguage": "fr"}"#;
        let result = parse_reply(text, Language::French).unwrap();
        assert!(result.literal_translation.is_none());
        assert!(result.alternatives.is_empty());
        assert!(result.cultural_note.is_none());

        let text = r#"{"primaryTranslation": "Bonjour", "alternatives": null, "culturalNote": "", "targetLanguage": "french"}"#;
        let result = parse_reply(text, Language::French).unwrap();
        assert!(result.alternatives.is_empty());
        assert!(result.cultural_note.is_none());
    }

    #[test]
    fn literal_equal_to_primary_is_dropped() {
        let text = r#"{"primaryTranslation": "Hallo Welt", "literalTranslation": " hallo welt ", "targetLanguage": "german"}"#;
        let result = parse_reply(text, Language::German).unwrap();
        assert!(result.literal_translation.is_none());
    }

    #[test]
    fn alternatives_are_deduplicated_and_capped() {
        let text = r#"{
            "primaryTranslation": "Ciao",
            "alternatives": ["ciao", "Salve", "  ", "salve", "Buongiorno", "Ehi", "Buonasera"],
            "targetLanguage": "italian"
        }"#;
        let result = parse_reply(text, Language::Italian).unwrap();
        assert_eq!(result.alternatives, vec!["Salve", "Buongiorno", "Ehi"]);
    }

    #[test]
    fn missing_or_empty_primary_is_rejected() {
        let err = parse_reply(r#"{"targetLanguage": "spanish"}"#, Language::Spanish).unwrap_err();
        assert!(matches!(
            err,
            TranslatorError::SchemaValidation {
                stage: Stage::Translation,
                ..
            }
        ));
        let err = parse_reply(
            r#"{"primaryTranslation": " ", "targetLanguage": "spanish"}"#,
            Language::Spanish,
        )
        .unwrap_err();
        assert!(err.to_string().contains("primaryTranslation"));
    }

    #[test]
    fn target_language_must_match_request() {
        let err = parse_reply(
            r#"{"primaryTranslation": "Hola"}"#,
            Language::Spanish,
        )
        .unwrap_err();
        assert!(err.to_string().contains("targetLanguage"));

        let err = parse_reply(
            r#"{"primaryTranslation": "Olá", "targetLanguage": "portuguese"}"#,
            Language::Spanish,
        )
        .unwrap_err();
        assert!(err.to_string().contains("mismatch"));
    }

    #[test]
    fn alternatives_must_be_strings() {
        let text = r#"{"primaryTranslation": "Hej", "alternatives": [1, 2], "targetLanguage": "swedish"}"#;
        assert!(parse_reply(text, Language::Swedish).is_err());
    }

    #[test]
    fn prompt_embeds_detection_and_target() {
        let prompt =
            render_system_prompt(&detection(true, Some("weather idiom")), Language::Japanese)
                .unwrap();
        assert!(prompt.contains("into japanese."));
        assert!(prompt.contains("- source language: english"));
        assert!(prompt.contains("- formality: informal"));
        assert!(prompt.contains("- idiom or slang: yes"));
        assert!(prompt.contains("- detection notes: weather idiom"));
        assert!(prompt.contains("\"targetLanguage\": \"japanese\""));

        let prompt = render_system_prompt(&detection(false, None), Language::Korean).unwrap();
        assert!(prompt.contains("- idiom or slang: no"));
        assert!(!prompt.contains("detection notes"));
        assert!(prompt.contains("omit it."));
    }
}
