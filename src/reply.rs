use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{Result, Stage, TranslatorError};

/// Decodes a model reply into `T`, treating the text as untrusted.
///
/// The reply must be a single JSON object. One surrounding markdown fence is
/// stripped; anything else around the object is rejected.
pub(crate) fn parse_object<T: DeserializeOwned>(stage: Stage, text: &str) -> Result<T> {
    let payload = strip_code_fence(text.trim());
    if !payload.starts_with('{') {
        return Err(TranslatorError::schema(stage, "reply is not a JSON object"));
    }
    let value: Value = serde_json::from_str(payload).map_err(|err| {
        TranslatorError::schema(stage, format!("reply is not valid JSON: {}", err))
    })?;
    if !value.is_object() {
        return Err(TranslatorError::schema(stage, "reply is not a JSON object"));
    }
    serde_json::from_value(value).map_err(|err| TranslatorError::schema(stage, err.to_string()))
}

/// Empty or whitespace-only strings become `None`.
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let Some(body) = rest.strip_suffix("```") else {
        return text;
    };
    // Drop the info string ("json") on the opening line.
    match body.split_once('\n') {
        Some((_, inner)) => inner.trim(),
        None => text,
    }
}
