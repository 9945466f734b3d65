//! First pipeline stage: language, confidence, register and idiom detection.

use serde::{Deserialize, Serialize};
use std::fmt;
use tera::{Context as TeraContext, Tera};
use tracing::debug;

use crate::error::{Result, Stage, TranslatorError};
use crate::providers::{Provider, ProviderUsage};
use crate::reply::{non_empty, parse_object};

const DETECTION_PROMPT: &str = include_str!("prompts/detection.tera");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Formality {
    Formal,
    Informal,
    Neutral,
}

impl Formality {
    pub const ALL: [Formality; 3] = [Formality::Formal, Formality::Informal, Formality::Neutral];

    pub fn as_str(&self) -> &'static str {
        match self {
            Formality::Formal => "formal",
            Formality::Informal => "informal",
            Formality::Neutral => "neutral",
        }
    }

    pub fn parse(value: &str) -> Option<Formality> {
        let value = value.trim();
        Formality::ALL
            .into_iter()
            .find(|formality| formality.as_str().eq_ignore_ascii_case(value))
    }
}

impl fmt::Display for Formality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionResult {
    pub language: String,
    pub confidence: f64,
    pub formality: Formality,
    pub is_idiom_or_slang: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Detection result plus the metadata of the call that produced it.
#[derive(Debug, Clone)]
pub struct DetectionOutput {
    pub result: DetectionResult,
    pub model: Option<String>,
    pub usage: Option<ProviderUsage>,
}

pub async fn detect<P: Provider>(provider: &P, input: &str) -> Result<DetectionOutput> {
    let system_prompt = render_system_prompt()?;
    let completion = provider.complete(&system_prompt, input).await?;
    debug!("detection reply: {}", completion.text);
    let result = parse_reply(&completion.text)?;
    Ok(DetectionOutput {
        result,
        model: completion.model,
        usage: completion.usage,
    })
}

pub fn render_system_prompt() -> Result<String> {
    let mut context = TeraContext::new();
    let values = Formality::ALL
        .iter()
        .map(Formality::as_str)
        .collect::<Vec<_>>();
    context.insert("formality_values", &values);
    Tera::one_off(DETECTION_PROMPT, &context, false)
        .map_err(|err| TranslatorError::Prompt(Stage::Detection, err.to_string()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DetectionReply {
    language: String,
    confidence: f64,
    formality: String,
    is_idiom_or_slang: bool,
    #[serde(default)]
    notes: Option<String>,
}

/// Validates a raw detection reply. Out-of-range values are rejected, never clamped.
pub fn parse_reply(text: &str) -> Result<DetectionResult> {
    let reply: DetectionReply = parse_object(Stage::Detection, text)?;

    let language = reply.language.trim().to_lowercase();
    if language.is_empty() {
        return Err(TranslatorError::schema(Stage::Detection, "language is empty"));
    }
    if !reply.confidence.is_finite() || !(0.0..=1.0).contains(&reply.confidence) {
        return Err(TranslatorError::schema(
            Stage::Detection,
            format!("confidence {} is outside [0, 1]", reply.confidence),
        ));
    }
    let formality = Formality::parse(&reply.formality).ok_or_else(|| {
        TranslatorError::schema(
            Stage::Detection,
            format!(
                "formality '{}' is not one of formal, informal, neutral",
                reply.formality
            ),
        )
    })?;

    Ok(DetectionResult {
        language,
        confidence: reply.confidence,
        formality,
        is_idiom_or_slang: reply.is_idiom_or_slang,
        notes: non_empty(reply.notes),
    })
}
