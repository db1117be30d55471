//! Illustration URL derivation.
//!
//! The illustration service is a read-only mapping from an encoded prompt to
//! an image URI. Nothing is fetched here; the URL is derived deterministically
//! and stored on the record, so record creation can never block on artwork.

use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};

const IMAGE_SERVICE_BASE: &str = "https://image.pollinations.ai/prompt";

/// Derive the illustration URL for a food, preferring an AI-supplied image
/// prompt over the default template built from the food name.
pub fn illustration_url(food_name: &str, image_prompt: Option<&str>) -> String {
    let default_prompt;
    let prompt = match image_prompt {
        Some(p) if !p.trim().is_empty() => p,
        _ => {
            default_prompt = format!(
                "{} food delicious photo realistic 8k highly detailed cinematic lighting",
                food_name
            );
            &default_prompt
        }
    };

    format!(
        "{}/{}",
        IMAGE_SERVICE_BASE,
        utf8_percent_encode(prompt, NON_ALPHANUMERIC)
    )
}
