use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use super::failure::{format_error_parts, retry_after, status_error, transport_error};
use super::{
    Completion, DEFAULT_TIMEOUT, Provider, ProviderFuture, ProviderOptions, ProviderUsage,
    check_inputs, get_env,
};
use crate::error::{Result, TranslatorError};

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";
const API_VERSION: &str = "2023-06-01";
pub(crate) const DEFAULT_MODEL: &str = "claude-3-5-haiku-latest";

#[derive(Debug, Clone)]
pub struct Claude {
    key: String,
    model: String,
    base_url: String,
    temperature: f64,
    max_tokens: u32,
    timeout: Duration,
}

impl Claude {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: get_env("ANTHROPIC_BASE_URL")
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            temperature: 0.1,
            max_tokens: 500,
            timeout: DEFAULT_TIMEOUT,
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

    pub fn with_options(mut self, options: ProviderOptions) -> Self {
        if let Some(model) = options.model {
            self = self.with_model(model);
        }
        if let Some(base_url) = options.base_url {
            self = self.with_base_url(base_url);
        }
        self.temperature = options.temperature;
        self.max_tokens = options.max_tokens;
        self.timeout = options.timeout;
        self
    }
}

impl Provider for Claude {
    fn complete(&self, system_instruction: &str, user_prompt: &str) -> ProviderFuture {
        let provider = self.clone();
        let system = system_instruction.to_string();
        let user = user_prompt.to_string();
        Box::pin(async move {
            check_inputs(&system, &user)?;
            if provider.key.trim().is_empty() {
                return Err(TranslatorError::Auth("Claude API key is empty".to_string()));
            }

            let client = reqwest::Client::builder()
                .timeout(provider.timeout)
                .build()
                .map_err(|err| {
                    TranslatorError::Network(format!("failed to build HTTP client: {}", err))
                })?;
            let url = format!("{}/messages", provider.base_url);

            let body = json!({
                "model": provider.model,
                "max_tokens": provider.max_tokens,
                "temperature": provider.temperature,
                "system": system,
                "messages": [
                    {"role": "user", "content": user}
                ]
            });

            let response = client
                .post(&url)
                .header("x-api-key", provider.key.as_str())
                .header("anthropic-version", API_VERSION)
                .json(&body)
                .send()
                .await
                .map_err(|err| transport_error("Claude", err, provider.timeout))?;

            let status = response.status();
            let retry_after = retry_after(response.headers());
            let text = response
                .text()
                .await
                .map_err(|err| transport_error("Claude", err, provider.timeout))?;
            if status.is_success() {
                return extract_completion(&text, status.as_u16(), &provider.model);
            }
            Err(status_error(
                "Claude",
                status,
                retry_after,
                &text,
                extract_claude_error(&text),
            ))
        })
    }
}

fn extract_completion(text: &str, status: u16, fallback_model: &str) -> Result<Completion> {
    let payload: ClaudeResponse = serde_json::from_str(text).map_err(|err| {
        TranslatorError::envelope(
            status,
            format!("failed to parse Claude response JSON: {}", err),
        )
    })?;

    let joined = payload
        .content
        .into_iter()
        .filter(|block| block.kind == "text")
        .filter_map(|block| block.text)
        .collect::<Vec<_>>()
        .join("");
    if joined.trim().is_empty() {
        return Err(TranslatorError::envelope(
            status,
            "no text content returned from Claude",
        ));
    }

    let model = payload
        .model
        .filter(|value| !value.trim().is_empty())
        .or_else(|| Some(fallback_model.to_string()));
    let usage = payload.usage.map(|usage| ProviderUsage {
        prompt_tokens: usage.input_tokens,
        completion_tokens: usage.output_tokens,
        total_tokens: usage
            .input_tokens
            .zip(usage.output_tokens)
            .map(|(input, output)| input + output),
    });
    Ok(Completion {
        text: joined,
        model,
        usage,
    })
}

fn extract_claude_error(body: &str) -> Option<String> {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: Option<ClaudeError>,
    }

    #[derive(Deserialize)]
    struct ClaudeError {
        #[serde(rename = "type")]
        kind: Option<String>,
        message: Option<String>,
    }

    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    let error = parsed.error?;
    Some(format_error_parts(error.message, error.kind, None))
}

#[derive(Debug, Deserialize)]
struct ClaudeResponse {
    #[serde(default)]
    content: Vec<ClaudeContent>,
    model: Option<String>,
    usage: Option<ClaudeUsage>,
}

#[derive(Debug, Deserialize)]
struct ClaudeUsage {
    input_tokens: Option<u64>,
    output_tokens: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ClaudeContent {
    #[serde(rename = "type")]
    kind: String,
    text: Option<String>,
}
