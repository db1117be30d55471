//! Domain models for food records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Subjective reaction category for a food record.
///
/// Stored as a lowercase string (see [`FoodCategory::as_str`]); the serde
/// representation matches so documents written through serde and documents
/// written through the string codec are identical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FoodCategory {
    NeverTried,
    DontLike,
    AlwaysLike,
    Depends,
}

impl FoodCategory {
    /// All categories, in display order.
    pub const ALL: [FoodCategory; 4] = [
        FoodCategory::NeverTried,
        FoodCategory::DontLike,
        FoodCategory::AlwaysLike,
        FoodCategory::Depends,
    ];

    /// Convert to string for document storage
    pub fn as_str(&self) -> &'static str {
        match self {
            FoodCategory::NeverTried => "never_tried",
            FoodCategory::DontLike => "dont_like",
            FoodCategory::AlwaysLike => "always_like",
            FoodCategory::Depends => "depends",
        }
    }

    /// Parse from string for document loading
    pub fn from_string(s: &str) -> Result<Self, String> {
        match s {
            "never_tried" => Ok(FoodCategory::NeverTried),
            "dont_like" => Ok(FoodCategory::DontLike),
            "always_like" => Ok(FoodCategory::AlwaysLike),
            "depends" => Ok(FoodCategory::Depends),
            _ => Err(format!("Invalid food category: {}", s)),
        }
    }

    /// Presentation metadata for this category.
    pub fn style(&self) -> CategoryStyle {
        match self {
            FoodCategory::NeverTried => CategoryStyle {
                label: "Never Tried",
                background: "gray-200",
                pattern: "dots",
                text: "gray-800",
            },
            FoodCategory::DontLike => CategoryStyle {
                label: "Don't Like",
                background: "red-300",
                pattern: "cross",
                text: "red-900",
            },
            FoodCategory::AlwaysLike => CategoryStyle {
                label: "Always Like",
                background: "green-300",
                pattern: "checkers",
                text: "green-900",
            },
            FoodCategory::Depends => CategoryStyle {
                label: "Depends",
                background: "yellow-300",
                pattern: "zigzag",
                text: "yellow-900",
            },
        }
    }
}

impl Default for FoodCategory {
    fn default() -> Self {
        FoodCategory::NeverTried
    }
}

/// Display styling associated with a category. Consumers render these however
/// they like; the core only guarantees the mapping is total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryStyle {
    pub label: &'static str,
    pub background: &'static str,
    pub pattern: &'static str,
    pub text: &'static str,
}

/// A food record owned by exactly one child profile.
///
/// `category` and `reward_promise` are the only fields that may change after
/// creation; everything else is immutable for the record's lifetime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodRecord {
    pub id: String,
    pub child_id: String,
    pub name: String,
    #[serde(default)]
    pub image_url: Option<String>,
    pub health_rating: i32,
    pub nutrition_note: String,
    #[serde(default)]
    pub category: FoodCategory,
    #[serde(default)]
    pub reward_promise: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Generated fields for a food record prior to storage.
#[derive(Debug, Clone, PartialEq)]
pub struct FoodDraft {
    pub health_rating: i32,
    pub nutrition_note: String,
    pub image_prompt: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum FoodError {
    #[error("No child profile is selected")]
    NoChildSelected,
    #[error("Food name cannot be empty")]
    EmptyFoodName,
    #[error("Field '{0}' cannot be mutated after creation")]
    InvalidMutationTarget(String),
    #[error("Invalid category value: {0}")]
    InvalidCategory(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_string_round_trip() {
        for category in FoodCategory::ALL {
            assert_eq!(FoodCategory::from_string(category.as_str()).unwrap(), category);
        }
        assert!(FoodCategory::from_string("loves-it").is_err());
    }

    #[test]
    fn test_category_serde_matches_string_codec() {
        for category in FoodCategory::ALL {
            let json = serde_json::to_value(category).unwrap();
            assert_eq!(json, serde_json::Value::String(category.as_str().to_string()));
        }
    }

    #[test]
    fn test_default_category_is_never_tried() {
        assert_eq!(FoodCategory::default(), FoodCategory::NeverTried);
    }

    #[test]
    fn test_style_lookup_is_total() {
        for category in FoodCategory::ALL {
            assert!(!category.style().label.is_empty());
        }
        assert_eq!(FoodCategory::DontLike.style().label, "Don't Like");
    }
}
