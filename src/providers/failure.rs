use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use std::time::Duration;
use tracing::warn;

use crate::error::TranslatorError;

pub(crate) fn is_rate_limited(status: StatusCode, body: &str) -> bool {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return true;
    }
    let code = status.as_u16();
    if code == 529 || code == 503 {
        return true;
    }
    let lower = body.to_lowercase();
    lower.contains("rate limit")
        || lower.contains("rate_limit")
        || lower.contains("too many requests")
        || lower.contains("resource_exhausted")
        || lower.contains("quota")
        || lower.contains("overloaded")
}

pub(crate) fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    let value = headers.get("retry-after")?.to_str().ok()?.trim();
    if value.is_empty() {
        return None;
    }
    value.parse::<u64>().ok().map(Duration::from_secs)
}

/// Maps a non-2xx reply onto the error taxonomy.
pub(crate) fn status_error(
    provider: &str,
    status: StatusCode,
    retry_after: Option<Duration>,
    body: &str,
    detail: Option<String>,
) -> TranslatorError {
    let message = detail.unwrap_or_else(|| body_excerpt(body));
    if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
        return TranslatorError::Auth(format!(
            "{} rejected the credential ({}): {}",
            provider, status, message
        ));
    }
    let rate_limited = is_rate_limited(status, body);
    if rate_limited {
        warn!(
            "{} rate limited (status {}); retry after {}",
            provider,
            status.as_u16(),
            retry_after
                .map(|wait| format!("{}s", wait.as_secs()))
                .unwrap_or_else(|| "unspecified".to_string())
        );
    }
    TranslatorError::Provider {
        status: Some(status.as_u16()),
        message: format!("{} API error: {}", provider, message),
        rate_limited,
        retry_after,
    }
}

pub(crate) fn transport_error(
    provider: &str,
    err: reqwest::Error,
    timeout: Duration,
) -> TranslatorError {
    if err.is_timeout() {
        return TranslatorError::Network(format!(
            "{} did not answer within {}s",
            provider,
            timeout.as_secs()
        ));
    }
    if err.is_connect() {
        return TranslatorError::Network(format!("failed to reach {}: {}", provider, err));
    }
    TranslatorError::Network(format!("{} request failed: {}", provider, err))
}

pub(crate) fn format_error_parts(
    message: Option<String>,
    kind: Option<String>,
    code: Option<String>,
) -> String {
    let mut parts = Vec::new();
    if let Some(message) = message
        && !message.trim().is_empty()
    {
        parts.push(message);
    }
    if let Some(kind) = kind
        && !kind.trim().is_empty()
    {
        parts.push(format!("type: {}", kind));
    }
    if let Some(code) = code
        && !code.trim().is_empty()
    {
        parts.push(format!("code: {}", code));
    }
    if parts.is_empty() {
        "unknown error".to_string()
    } else {
        parts.join(" | ")
    }
}

fn body_excerpt(body: &str) -> String {
    const MAX_CHARS: usize = 200;
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "empty response body".to_string();
    }
    if trimmed.chars().count() <= MAX_CHARS {
        return trimmed.to_string();
    }
    let mut excerpt = trimmed.chars().take(MAX_CHARS).collect::<String>();
    excerpt.push('…');
    excerpt
}
