//! In-memory document store.
//!
//! Backs tests and local/offline operation with the same `DocumentStore`
//! contract as a remote document database: ids assigned on add, partial
//! updates merged over stored fields, and live queries that re-emit the full
//! matching set after every affecting mutation.
//!
//! Callbacks run synchronously after the write is applied, which gives
//! same-session causal ordering: when a mutation returns, its emissions have
//! already been delivered. The store never holds its lock while invoking
//! callbacks, so a callback may safely call back into the store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{bail, Result};
use async_trait::async_trait;
use log::debug;
use serde_json::Value;
use uuid::Uuid;

use super::traits::{Document, DocumentStore, SnapshotCallback, Subscription};

#[derive(Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    collections: HashMap<String, Vec<(String, Document)>>,
    watchers: Vec<Watcher>,
    next_watcher_id: u64,
}

struct Watcher {
    id: u64,
    collection: String,
    field: String,
    value: Value,
    callback: SnapshotCallback,
    cancelled: Arc<AtomicBool>,
}

/// An emission collected under the lock, delivered after it is released.
struct PendingEmission {
    callback: SnapshotCallback,
    snapshot: Vec<Document>,
    cancelled: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().expect("memory store lock poisoned")
    }

    fn deliver(pending: Vec<PendingEmission>) {
        for emission in pending {
            // A subscriber cancelled between collection and delivery must not
            // be invoked again.
            if !emission.cancelled.load(Ordering::SeqCst) {
                (emission.callback)(emission.snapshot);
            }
        }
    }
}

impl Inner {
    fn snapshot(&self, collection: &str, field: &str, value: &Value) -> Vec<Document> {
        let docs = match self.collections.get(collection) {
            Some(docs) => docs,
            None => return Vec::new(),
        };

        docs.iter()
            .filter(|(_, fields)| fields.get(field) == Some(value))
            .map(|(id, fields)| {
                let mut with_id = fields.clone();
                with_id.insert("id".to_string(), Value::String(id.clone()));
                with_id
            })
            .collect()
    }

    /// Emissions for every live watcher whose filter matches the mutated
    /// document.
    fn emissions_for(&self, collection: &str, mutated: &Document) -> Vec<PendingEmission> {
        self.watchers
            .iter()
            .filter(|w| {
                w.collection == collection
                    && !w.cancelled.load(Ordering::SeqCst)
                    && mutated.get(&w.field) == Some(&w.value)
            })
            .map(|w| PendingEmission {
                callback: w.callback.clone(),
                snapshot: self.snapshot(&w.collection, &w.field, &w.value),
                cancelled: w.cancelled.clone(),
            })
            .collect()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn add(&self, collection: &str, fields: Document) -> Result<String> {
        let id = Uuid::new_v4().to_string();

        let pending = {
            let mut inner = self.lock();
            inner
                .collections
                .entry(collection.to_string())
                .or_default()
                .push((id.clone(), fields.clone()));
            debug!("Added document {}/{}", collection, id);
            inner.emissions_for(collection, &fields)
        };

        Self::deliver(pending);
        Ok(id)
    }

    async fn update(&self, collection: &str, id: &str, fields: Document) -> Result<()> {
        let pending = {
            let mut inner = self.lock();

            let docs = inner.collections.get_mut(collection);
            let stored = docs.and_then(|docs| {
                docs.iter_mut()
                    .find(|(doc_id, _)| doc_id == id)
                    .map(|(_, fields)| fields)
            });

            let stored = match stored {
                Some(stored) => stored,
                None => bail!("document not found: {}/{}", collection, id),
            };

            for (key, value) in fields {
                stored.insert(key, value);
            }
            let updated = stored.clone();
            debug!("Updated document {}/{}", collection, id);
            inner.emissions_for(collection, &updated)
        };

        Self::deliver(pending);
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<bool> {
        let pending = {
            let mut inner = self.lock();

            let removed = match inner.collections.get_mut(collection) {
                Some(docs) => match docs.iter().position(|(doc_id, _)| doc_id == id) {
                    Some(position) => docs.remove(position).1,
                    // Idempotent: nothing removed, nothing emitted.
                    None => return Ok(false),
                },
                None => return Ok(false),
            };
            debug!("Deleted document {}/{}", collection, id);
            inner.emissions_for(collection, &removed)
        };

        Self::deliver(pending);
        Ok(true)
    }

    fn live_query(
        &self,
        collection: &str,
        field: &str,
        value: Value,
        callback: SnapshotCallback,
    ) -> Subscription {
        let cancelled = Arc::new(AtomicBool::new(false));

        let (watcher_id, initial) = {
            let mut inner = self.lock();
            let watcher_id = inner.next_watcher_id;
            inner.next_watcher_id += 1;
            inner.watchers.push(Watcher {
                id: watcher_id,
                collection: collection.to_string(),
                field: field.to_string(),
                value: value.clone(),
                callback: callback.clone(),
                cancelled: cancelled.clone(),
            });
            (watcher_id, inner.snapshot(collection, field, &value))
        };

        // Initial snapshot is delivered promptly, outside the lock.
        callback(initial);

        let inner = self.inner.clone();
        Subscription::new(move || {
            cancelled.store(true, Ordering::SeqCst);
            if let Ok(mut inner) = inner.lock() {
                inner.watchers.retain(|w| w.id != watcher_id);
            }
        })
    }
}
