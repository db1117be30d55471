//! Domain layer: models, the food record service, the category state
//! machine and the session scope.

pub mod category;
pub mod food_service;
pub mod models;
pub mod session;

pub use category::{transition, CategoryChange};
pub use food_service::{FoodService, RecordsCallback};
pub use session::SessionScope;
