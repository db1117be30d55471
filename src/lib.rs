//! # Food Tracker Core
//!
//! Generation and synchronization core for a kids' food tracker: a caregiver
//! submits a free-text food name, an external generative service supplies a
//! health rating and a child-friendly nutrition note (with a deterministic
//! fallback when the service is unavailable or returns noise), and the
//! resulting record joins a per-child collection that live subscribers
//! observe as it changes.
//!
//! The persistence and generation boundaries are injected; nothing in this
//! crate reaches for ambient global state.

pub mod domain;
pub mod generation;
pub mod storage;

use std::sync::Arc;

pub use domain::category::{transition, CategoryChange};
pub use domain::food_service::{FoodService, RecordsCallback};
pub use domain::models::food::{
    CategoryStyle, FoodCategory, FoodDraft, FoodError, FoodRecord,
};
pub use domain::session::SessionScope;
pub use generation::{FoodDataGenerator, GenerationBackend, GenerationConfig};
pub use storage::memory::MemoryStore;
pub use storage::traits::{Document, DocumentStore, SnapshotCallback, Subscription};

/// Main backend struct that wires the injected boundaries into the services.
pub struct Backend {
    pub foods: Arc<FoodService>,
    pub generator: Arc<FoodDataGenerator>,
}

impl Backend {
    /// Create a backend over a document store and a content generator. The
    /// caller owns the choice of store (in-memory, remote document database)
    /// and of generation credential handling.
    pub fn new(store: Arc<dyn DocumentStore>, generator: FoodDataGenerator) -> Self {
        Backend {
            foods: Arc::new(FoodService::new(store)),
            generator: Arc::new(generator),
        }
    }

    /// Start a client session, optionally seeded with the child id the
    /// client remembered from its session-local storage.
    pub fn session(&self, initial_child: Option<String>) -> SessionScope {
        SessionScope::new(self.foods.clone(), self.generator.clone(), initial_child)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_backend_wires_sessions_over_shared_store() {
        let store = Arc::new(MemoryStore::new());
        let backend = Backend::new(store, FoodDataGenerator::disabled());

        let session1 = backend.session(Some("child-1".to_string()));
        let session2 = backend.session(Some("child-1".to_string()));

        let emissions = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = emissions.clone();
        session2.watch(Arc::new(move |records| sink.lock().unwrap().push(records)));

        // Session 2 observes session 1's write without writing anything itself.
        let record = session1.add_food("Broccoli").await.unwrap();
        let emissions = emissions.lock().unwrap();
        assert_eq!(emissions.len(), 2);
        assert_eq!(emissions[1].len(), 1);
        assert_eq!(emissions[1][0].id, record.id);
    }
}
