//! # Storage Traits
//!
//! This module defines the document-store abstraction the domain layer is
//! written against. The core consumes exactly four operations — add, update,
//! delete and a live query — so any document-collection backend (in-memory,
//! cloud document database, etc.) can sit behind it without the domain layer
//! changing.
//!
//! Live-query callbacks are delivered at least once, not exactly once.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Map, Value};

/// Field set of one stored document. The store injects the document id under
/// the `"id"` key when delivering snapshots.
pub type Document = Map<String, Value>;

/// Callback invoked with the full matching document set after registration
/// and after every affecting mutation.
pub type SnapshotCallback = Arc<dyn Fn(Vec<Document>) + Send + Sync>;

/// Trait defining the interface for document storage operations
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Store a new document and return its assigned id.
    async fn add(&self, collection: &str, fields: Document) -> Result<String>;

    /// Partially update an existing document. Fails if the document does not
    /// exist; the provided fields are merged over the stored ones.
    async fn update(&self, collection: &str, id: &str, fields: Document) -> Result<()>;

    /// Delete a document. Returns true if it existed. Deleting a missing
    /// document is a no-op and must not produce any snapshot emission.
    async fn delete(&self, collection: &str, id: &str) -> Result<bool>;

    /// Register a live observer over an exact-match filter. The callback
    /// fires promptly with the current snapshot and again after every
    /// mutation affecting a matching document, until the returned
    /// [`Subscription`] is cancelled.
    fn live_query(
        &self,
        collection: &str,
        field: &str,
        value: Value,
        callback: SnapshotCallback,
    ) -> Subscription;
}

/// Cancellation guard for a live query. Cancelling (explicitly or by drop)
/// guarantees the callback is never invoked again and releases the underlying
/// registration.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Stop the live query.
    pub fn unsubscribe(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}
