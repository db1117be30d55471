//! Defensive parser for generation-service output.
//!
//! The upstream model is asked for a bare JSON object but routinely wraps it
//! in markdown code fences or surrounds it with prose. This module strips
//! that noise, extracts the first `{` to the last `}` as the candidate
//! payload (greedy, not nested-aware) and decodes it structurally.
//!
//! The parser does NOT clamp out-of-range ratings; it only requires the
//! rating field to be present and numeric. Clamping, if any, is the caller's
//! responsibility.

use serde::Deserialize;

/// Structured fields extracted from a generation response.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedFood {
    pub health_rating: i32,
    pub nutrition_note: String,
    pub image_prompt: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// No decodable payload, or required fields missing. The raw text is
    /// attached for diagnostics.
    #[error("malformed generation output: no usable structured payload")]
    Malformed { raw: String },
}

impl ParseError {
    fn malformed(raw: &str) -> Self {
        ParseError::Malformed { raw: raw.to_string() }
    }
}

/// Wire shape of the payload; the service replies in camelCase.
#[derive(Debug, Deserialize)]
struct RawGenerated {
    #[serde(rename = "healthRating")]
    health_rating: f64,
    #[serde(rename = "nutritionNote")]
    nutrition_note: String,
    #[serde(rename = "imagePrompt", default)]
    image_prompt: Option<String>,
}

/// Extract a structured food payload from untrusted generation output.
///
/// Pure function of its input; never panics on malformed text.
pub fn parse(raw: &str) -> Result<GeneratedFood, ParseError> {
    let cleaned = raw.replace("```json", "").replace("```", "");
    let cleaned = cleaned.trim();

    let start = cleaned.find('{');
    let end = cleaned.rfind('}');
    let span = match (start, end) {
        (Some(start), Some(end)) if start < end => &cleaned[start..=end],
        _ => return Err(ParseError::malformed(raw)),
    };

    let decoded: RawGenerated =
        serde_json::from_str(span).map_err(|_| ParseError::malformed(raw))?;

    if decoded.nutrition_note.trim().is_empty() {
        return Err(ParseError::malformed(raw));
    }

    Ok(GeneratedFood {
        health_rating: decoded.health_rating.round() as i32,
        nutrition_note: decoded.nutrition_note,
        image_prompt: decoded.image_prompt,
    })
}
