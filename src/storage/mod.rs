//! # Storage Module
//!
//! Document-store boundary consumed by the domain layer, plus the in-memory
//! implementation used for tests and local operation.

pub mod memory;
pub mod traits;

pub use memory::MemoryStore;
pub use traits::{Document, DocumentStore, SnapshotCallback, Subscription};
