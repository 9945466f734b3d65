use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use super::failure::{format_error_parts, retry_after, status_error, transport_error};
use super::{
    Completion, DEFAULT_TIMEOUT, Provider, ProviderFuture, ProviderOptions, ProviderUsage,
    check_inputs, get_env,
};
use crate::error::{Result, TranslatorError};

const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";
const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub(crate) const OPENROUTER_DEFAULT_MODEL: &str = "openai/gpt-4o-mini";
pub(crate) const OPENAI_DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Chat-completions client for OpenAI and OpenAI-compatible hosts such as OpenRouter.
#[derive(Debug, Clone)]
pub struct OpenAI {
    label: &'static str,
    key: String,
    model: String,
    base_url: String,
    referer: Option<String>,
    temperature: f64,
    max_tokens: u32,
    timeout: Duration,
}

impl OpenAI {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            label: "OpenAI",
            key: key.into(),
            model: OPENAI_DEFAULT_MODEL.to_string(),
            base_url: get_env("OPENAI_BASE_URL").unwrap_or_else(|| OPENAI_BASE_URL.to_string()),
            referer: None,
            temperature: 0.1,
            max_tokens: 500,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn openrouter(key: impl Into<String>) -> Self {
        Self {
            label: "OpenRouter",
            model: OPENROUTER_DEFAULT_MODEL.to_string(),
            base_url: get_env("OPENROUTER_BASE_URL")
                .unwrap_or_else(|| OPENROUTER_BASE_URL.to_string()),
            ..Self::new(key)
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        let model = model.into();
        if !model.trim().is_empty() {
            self.model = model;
        }
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        if !base_url.trim().is_empty() {
            self.base_url = base_url.trim_end_matches('/').to_string();
        }
        self
    }

    pub fn with_referer(mut self, referer: impl Into<String>) -> Self {
        let referer = referer.into();
        self.referer = (!referer.trim().is_empty()).then_some(referer);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_options(mut self, options: ProviderOptions) -> Self {
        if let Some(model) = options.model {
            self = self.with_model(model);
        }
        if let Some(base_url) = options.base_url {
            self = self.with_base_url(base_url);
        }
        if let Some(referer) = options.referer {
            self = self.with_referer(referer);
        }
        self.temperature = options.temperature;
        self.max_tokens = options.max_tokens;
        self.with_timeout(options.timeout)
    }
}

impl Provider for OpenAI {
    fn complete(&self, system_instruction: &str, user_prompt: &str) -> ProviderFuture {
        let provider = self.clone();
        let system = system_instruction.to_string();
        let user = user_prompt.to_string();
        Box::pin(async move {
            check_inputs(&system, &user)?;
            if provider.key.trim().is_empty() {
                return Err(TranslatorError::Auth(format!(
                    "{} API key is empty",
                    provider.label
                )));
            }
            call_chat_completions(provider, system, user).await
        })
    }
}

async fn call_chat_completions(provider: OpenAI, system: String, user: String) -> Result<Completion> {
    let client = reqwest::Client::builder()
        .timeout(provider.timeout)
        .build()
        .map_err(|err| TranslatorError::Network(format!("failed to build HTTP client: {}", err)))?;
    let url = format!("{}/chat/completions", provider.base_url);

    let body = json!({
        "model": provider.model,
        "messages": [
            {"role": "system", "content": system},
            {"role": "user", "content": user}
        ],
        "temperature": provider.temperature,
        "max_tokens": provider.max_tokens,
        "response_format": {"type": "json_object"}
    });

    let mut request = client
        .post(&url)
        .bearer_auth(provider.key.as_str())
        .json(&body);
    if let Some(referer) = provider.referer.as_deref() {
        request = request.header("HTTP-Referer", referer);
    }

    let response = request
        .send()
        .await
        .map_err(|err| transport_error(provider.label, err, provider.timeout))?;
    let status = response.status();
    let retry_after = retry_after(response.headers());
    let text = response
        .text()
        .await
        .map_err(|err| transport_error(provider.label, err, provider.timeout))?;

    if status.is_success() {
        return extract_completion(&text, status.as_u16(), &provider.model);
    }
    Err(status_error(
        provider.label,
        status,
        retry_after,
        &text,
        extract_openai_error(&text),
    ))
}

fn extract_completion(text: &str, status: u16, fallback_model: &str) -> Result<Completion> {
    let payload: OpenAIResponse = serde_json::from_str(text).map_err(|err| {
        TranslatorError::envelope(status, format!("failed to parse response JSON: {}", err))
    })?;

    if let Some(error) = payload.error {
        return Err(TranslatorError::envelope(
            status,
            format_error_parts(error.message, error.kind, error.code.map(code_to_string)),
        ));
    }

    let content = payload
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|content| !content.trim().is_empty())
        .ok_or_else(|| TranslatorError::envelope(status, "no completion text returned"))?;

    let model = payload
        .model
        .filter(|value| !value.trim().is_empty())
        .or_else(|| Some(fallback_model.to_string()));
    let usage = payload.usage.map(|usage| ProviderUsage {
        prompt_tokens: usage.prompt_tokens,
        completion_tokens: usage.completion_tokens,
        total_tokens: usage.total_tokens,
    });
    Ok(Completion {
        text: content,
        model,
        usage,
    })
}

fn extract_openai_error(body: &str) -> Option<String> {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: Option<OpenAIError>,
    }

    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    let error = parsed.error?;
    Some(format_error_parts(
        error.message,
        error.kind,
        error.code.map(code_to_string),
    ))
}

// OpenRouter reports numeric codes, OpenAI string codes.
fn code_to_string(code: serde_json::Value) -> String {
    match code {
        serde_json::Value::String(value) => value,
        other => other.to_string(),
    }
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    model: Option<String>,
    #[serde(default)]
    choices: Vec<OpenAIChoice>,
    usage: Option<OpenAIUsage>,
    error: Option<OpenAIError>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAIMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIError {
    message: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    code: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct OpenAIUsage {
    prompt_tokens: Option<u64>,
    completion_tokens: Option<u64>,
    total_tokens: Option<u64>,
}
