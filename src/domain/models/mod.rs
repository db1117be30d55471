pub mod food;

pub use food::{CategoryStyle, FoodCategory, FoodDraft, FoodError, FoodRecord};
