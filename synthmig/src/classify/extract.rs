//! Best-effort extraction of a classification from free-form inference output.
//!
//! Inference output is not schema-guaranteed: the JSON object may be wrapped in prose or code
//! fences, truncated, or carry the wrong keys. Everything that can go wrong here is reported as an
//! [`InferenceError`] so the caller can degrade to the fallback classifier.

use serde_json::{Map, Value};

use super::inference::InferenceError;
use crate::models::{Archetype, Classification, ClassificationOrigin, RecommendedConfig};

const REQUIRED_KEYS: [&str; 4] = ["elastic_type", "confidence", "reasoning", "recommended_config"];

/// The span from the first `{` to the last `}` in `text`, inclusive.
///
/// Returns `None` when either brace is missing or the last `}` comes before the first `{`.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Parse inference output into a classification tagged with the inference origin.
pub fn parse_inference_payload(text: &str) -> Result<Classification, InferenceError> {
    let span = extract_json_object(text).ok_or(InferenceError::MissingJsonSpan)?;
    let value: Value = serde_json::from_str(span)?;
    let Value::Object(payload) = value else {
        return Err(InferenceError::MissingKey(REQUIRED_KEYS[0]));
    };

    if let Some(missing) = REQUIRED_KEYS.into_iter().find(|key| !payload.contains_key(*key)) {
        return Err(InferenceError::MissingKey(missing));
    }

    let archetype = parse_archetype(&payload)?;
    let confidence = parse_confidence(&payload)?;
    let reasoning = match &payload["reasoning"] {
        Value::String(reasoning) => reasoning.clone(),
        other => other.to_string(),
    };
    let recommended_config: RecommendedConfig =
        serde_json::from_value(payload["recommended_config"].clone()).map_err(|e| InferenceError::InvalidField {
            key: "recommended_config",
            reason: e.to_string(),
        })?;

    Ok(Classification::new(
        archetype,
        confidence,
        ClassificationOrigin::Inference,
        reasoning,
        recommended_config,
    ))
}

fn parse_archetype(payload: &Map<String, Value>) -> Result<Archetype, InferenceError> {
    match &payload["elastic_type"] {
        Value::String(raw) => raw.parse().map_err(|_| InferenceError::UnknownArchetype(raw.clone())),
        other => Err(InferenceError::UnknownArchetype(other.to_string())),
    }
}

fn parse_confidence(payload: &Map<String, Value>) -> Result<f64, InferenceError> {
    let confidence = payload["confidence"].as_f64().ok_or_else(|| InferenceError::InvalidField {
        key: "confidence",
        reason: format!("expected a number, got {}", payload["confidence"]),
    })?;
    if (0.0..=1.0).contains(&confidence) {
        Ok(confidence)
    } else {
        Err(InferenceError::ConfidenceOutOfRange(confidence))
    }
}
