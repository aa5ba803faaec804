use serde::Serialize;
use serde_json::Value;

use crate::error::AppError;

/// Normalized success payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractedResult {
    pub url: String,
}

/// Normalizes the provider's output into an [`ExtractedResult`].
///
/// Accepted shapes:
/// - a single string: `"https://cdn/img.png"`
/// - a sequence of strings, first element wins: `["https://cdn/img.png", ...]`
///
/// Anything else (object, empty sequence, null, non-string first element,
/// empty string) is [`AppError::MalformedOutput`] carrying the raw payload.
#[derive(Debug, Default, Clone, Copy)]
pub struct ResultExtractor;

impl ResultExtractor {
    pub fn extract(raw: &Value) -> Result<ExtractedResult, AppError> {
        let url = match raw {
            Value::String(s) => Some(s.as_str()),
            Value::Array(items) => items.first().and_then(Value::as_str),
            _ => None,
        };

        match url {
            Some(url) if !url.trim().is_empty() => Ok(ExtractedResult {
                url: url.to_string(),
            }),
            _ => Err(AppError::MalformedOutput { raw: raw.clone() }),
        }
    }
}
