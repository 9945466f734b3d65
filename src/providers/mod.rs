use anyhow::anyhow;
use serde::Serialize;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use crate::error::{Result, TranslatorError};

mod claude;
mod failure;
mod openai;

pub use claude::Claude;
pub use openai::OpenAI;

pub(crate) const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    OpenRouter,
    OpenAI,
    Claude,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenRouter => "openrouter",
            ProviderKind::OpenAI => "openai",
            ProviderKind::Claude => "claude",
        }
    }

    pub fn from_name(name: &str) -> Option<ProviderKind> {
        match name.trim().to_lowercase().as_str() {
            "openrouter" => Some(ProviderKind::OpenRouter),
            "openai" => Some(ProviderKind::OpenAI),
            "claude" | "anthropic" => Some(ProviderKind::Claude),
            _ => None,
        }
    }

    pub fn key_env(&self) -> &'static str {
        match self {
            ProviderKind::OpenRouter => "OPENROUTER_API_KEY",
            ProviderKind::OpenAI => "OPENAI_API_KEY",
            ProviderKind::Claude => "ANTHROPIC_API_KEY",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderKind::OpenRouter => openai::OPENROUTER_DEFAULT_MODEL,
            ProviderKind::OpenAI => openai::OPENAI_DEFAULT_MODEL,
            ProviderKind::Claude => claude::DEFAULT_MODEL,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProviderSelection {
    pub provider: ProviderKind,
    pub requested_model: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderUsage {
    pub prompt_tokens: Option<u64>,
    pub completion_tokens: Option<u64>,
    pub total_tokens: Option<u64>,
}

impl ProviderUsage {
    /// Sums two usage reports; a count stays unknown only if both sides lack it.
    pub fn combine(left: Option<ProviderUsage>, right: Option<ProviderUsage>) -> Option<Self> {
        match (left, right) {
            (None, None) => None,
            (Some(usage), None) | (None, Some(usage)) => Some(usage),
            (Some(a), Some(b)) => Some(ProviderUsage {
                prompt_tokens: add_counts(a.prompt_tokens, b.prompt_tokens),
                completion_tokens: add_counts(a.completion_tokens, b.completion_tokens),
                total_tokens: add_counts(a.total_tokens, b.total_tokens),
            }),
        }
    }
}

fn add_counts(left: Option<u64>, right: Option<u64>) -> Option<u64> {
    match (left, right) {
        (None, None) => None,
        (left, right) => Some(left.unwrap_or(0) + right.unwrap_or(0)),
    }
}

/// Raw reply of one completion call.
#[derive(Debug, Clone, Serialize)]
pub struct Completion {
    pub text: String,
    pub model: Option<String>,
    pub usage: Option<ProviderUsage>,
}

/// Connection parameters shared by every provider.
#[derive(Debug, Clone)]
pub struct ProviderOptions {
    pub model: Option<String>,
    pub temperature: f64,
    pub max_tokens: u32,
    pub timeout: Duration,
    pub base_url: Option<String>,
    pub referer: Option<String>,
}

impl Default for ProviderOptions {
    fn default() -> Self {
        Self {
            model: None,
            temperature: 0.1,
            max_tokens: 500,
            timeout: DEFAULT_TIMEOUT,
            base_url: None,
            referer: None,
        }
    }
}

pub type ProviderFuture = Pin<Box<dyn Future<Output = Result<Completion>> + Send>>;

/// Gateway to a hosted completion service.
///
/// Every call is independent: one system instruction, one user prompt, one
/// HTTP request. Implementations never retry.
pub trait Provider: Clone + Send + Sync {
    fn complete(&self, system_instruction: &str, user_prompt: &str) -> ProviderFuture;
}

#[derive(Debug, Clone)]
pub enum ProviderImpl {
    OpenAI(OpenAI),
    Claude(Claude),
}

impl Provider for ProviderImpl {
    fn complete(&self, system_instruction: &str, user_prompt: &str) -> ProviderFuture {
        match self {
            ProviderImpl::OpenAI(provider) => provider.complete(system_instruction, user_prompt),
            ProviderImpl::Claude(provider) => provider.complete(system_instruction, user_prompt),
        }
    }
}

pub fn build_provider(kind: ProviderKind, key: String, options: ProviderOptions) -> ProviderImpl {
    match kind {
        ProviderKind::OpenRouter => {
            ProviderImpl::OpenAI(OpenAI::openrouter(key).with_options(options))
        }
        ProviderKind::OpenAI => ProviderImpl::OpenAI(OpenAI::new(key).with_options(options)),
        ProviderKind::Claude => ProviderImpl::Claude(Claude::new(key).with_options(options)),
    }
}

/// Picks the provider from `provider[:model]`, falling back to the configured one.
pub fn resolve_provider_selection(
    model_arg: Option<&str>,
    configured: &str,
) -> anyhow::Result<ProviderSelection> {
    match model_arg {
        Some(model) => parse_model_arg(model),
        None => {
            let provider = ProviderKind::from_name(configured)
                .ok_or_else(|| anyhow!("unknown provider '{}' in settings", configured))?;
            Ok(ProviderSelection {
                provider,
                requested_model: None,
            })
        }
    }
}

pub fn resolve_key(provider: ProviderKind, override_key: Option<&str>) -> Result<String> {
    if let Some(key) = override_key.filter(|key| !key.trim().is_empty()) {
        return Ok(key.trim().to_string());
    }
    get_env(provider.key_env()).ok_or_else(|| {
        TranslatorError::Auth(format!(
            "no API key for {} (set {} or pass --key)",
            provider.as_str(),
            provider.key_env()
        ))
    })
}

fn parse_model_arg(model_arg: &str) -> anyhow::Result<ProviderSelection> {
    let raw = model_arg.trim();
    if let Some(provider) = ProviderKind::from_name(raw) {
        return Ok(ProviderSelection {
            provider,
            requested_model: None,
        });
    }

    if let Some((provider_part, model_part)) = raw.split_once(':')
        && let Some(provider) = ProviderKind::from_name(provider_part)
    {
        let model = model_part.trim();
        return Ok(ProviderSelection {
            provider,
            requested_model: (!model.is_empty()).then(|| model.to_string()),
        });
    }

    Err(anyhow!(
        "unable to infer provider from '{}'. Use provider:model (openrouter:, openai:, claude:)",
        raw
    ))
}

pub(crate) fn get_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
}

/// Both gateway arguments must carry text; checked before any request is built.
pub(crate) fn check_inputs(system_instruction: &str, user_prompt: &str) -> Result<()> {
    if system_instruction.trim().is_empty() {
        return Err(TranslatorError::EmptyInstruction);
    }
    if user_prompt.trim().is_empty() {
        return Err(TranslatorError::EmptyInput);
    }
    Ok(())
}
