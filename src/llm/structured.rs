//! Typed structured output
//!
//! Models are asked to answer in JSON. The answer is extracted (bare or
//! fenced), deserialised into an explicit result type and validated. Any
//! step failing is a `SchemaViolation` for that boundary; nothing is coerced
//! into a default.

use serde::de::DeserializeOwned;

use super::LanguageModel;
use crate::error::{Boundary, FactCheckError};

/// Post-deserialisation checks for a structured result
pub trait Validate {
    /// Return a description of the first violated constraint
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

/// Locate the JSON object inside a model response.
///
/// Accepts a ```json fenced block, a bare fence, or the outermost `{...}`.
pub fn extract_json(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();

    if let Some(start) = trimmed.find("```") {
        let after = &trimmed[start + 3..];
        let body_start = after.find('\n').map(|i| i + 1).unwrap_or(0);
        let body = &after[body_start..];
        if let Some(end) = body.find("```") {
            let inner = body[..end].trim();
            if inner.starts_with('{') {
                return Some(inner);
            }
        }
    }

    let open = trimmed.find('{')?;
    let close = trimmed.rfind('}')?;
    (close > open).then(|| &trimmed[open..=close])
}

/// Parse and validate a structured model response
pub fn parse_structured<T>(boundary: Boundary, raw: &str) -> Result<T, FactCheckError>
where
    T: DeserializeOwned + Validate,
{
    let json = extract_json(raw)
        .ok_or_else(|| FactCheckError::schema(boundary, "response contains no JSON object"))?;

    let value: T = serde_json::from_str(json)
        .map_err(|e| FactCheckError::schema(boundary, e.to_string()))?;

    value
        .validate()
        .map_err(|detail| FactCheckError::schema(boundary, detail))?;

    Ok(value)
}

/// Run one completion and parse it as `T`
pub async fn complete_structured<T>(
    model: &dyn LanguageModel,
    boundary: Boundary,
    preamble: &str,
    prompt: &str,
) -> Result<T, FactCheckError>
where
    T: DeserializeOwned + Validate,
{
    let raw = model.complete(preamble, prompt).await?;
    parse_structured(boundary, &raw)
}
