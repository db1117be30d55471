//! Food record service: create, mutate, delete and observe the per-child
//! record collection.
//!
//! All operations are scoped to a single `child_id`; no cross-child queries
//! are exposed. Snapshot ordering is computed client-side on every emission —
//! the underlying store is never trusted to order.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use log::{debug, info, warn};
use serde_json::Value;

use crate::domain::category::{self, CategoryChange};
use crate::domain::models::food::{FoodCategory, FoodDraft, FoodError, FoodRecord};
use crate::generation::image::illustration_url;
use crate::storage::traits::{Document, DocumentStore, SnapshotCallback, Subscription};

/// Collection name at the persistence boundary.
pub const FOODS_COLLECTION: &str = "foods";

/// The only fields that may be mutated after creation.
pub const MUTABLE_FIELDS: &[&str] = &["category", "reward_promise"];

/// Callback receiving the ordered record set for a child.
pub type RecordsCallback = Arc<dyn Fn(Vec<FoodRecord>) + Send + Sync>;

/// Service for managing food records over a document store.
#[derive(Clone)]
pub struct FoodService {
    store: Arc<dyn DocumentStore>,
}

impl FoodService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Create a food record for a child from a generated draft.
    ///
    /// Assigns the creation timestamp and the `NeverTried` category, derives
    /// the illustration URL, and persists. The store assigns the id; every
    /// live subscriber scoped to this child receives exactly one emission
    /// reflecting the new record before this call returns.
    pub async fn create(&self, child_id: &str, name: &str, draft: FoodDraft) -> Result<FoodRecord> {
        let name = name.trim();
        if name.is_empty() {
            bail!(FoodError::EmptyFoodName);
        }
        if child_id.is_empty() {
            bail!(FoodError::NoChildSelected);
        }

        let record = FoodRecord {
            id: String::new(),
            child_id: child_id.to_string(),
            name: name.to_string(),
            image_url: Some(illustration_url(name, draft.image_prompt.as_deref())),
            health_rating: draft.health_rating,
            nutrition_note: draft.nutrition_note,
            category: FoodCategory::NeverTried,
            reward_promise: None,
            created_at: Utc::now(),
        };

        let mut fields = to_document(&record)?;
        fields.remove("id");

        let id = self.store.add(FOODS_COLLECTION, fields).await?;
        info!("Created food record '{}' ({}) for child {}", record.name, id, child_id);

        Ok(FoodRecord { id, ..record })
    }

    /// Partially update a record. Only `category` and `reward_promise` are
    /// legal targets; anything else is a caller contract violation and is
    /// rejected loudly.
    pub async fn update_field(&self, record_id: &str, field: &str, value: Value) -> Result<()> {
        if !MUTABLE_FIELDS.contains(&field) {
            log::error!(
                "Contract violation: attempted to mutate immutable food field '{}' on {}",
                field,
                record_id
            );
            bail!(FoodError::InvalidMutationTarget(field.to_string()));
        }

        match field {
            "category" => {
                let raw = value
                    .as_str()
                    .ok_or_else(|| FoodError::InvalidCategory(value.to_string()))?;
                FoodCategory::from_string(raw).map_err(FoodError::InvalidCategory)?;
            }
            "reward_promise" => {
                if !(value.is_string() || value.is_null()) {
                    bail!("reward_promise must be a string or null, got: {}", value);
                }
            }
            _ => unreachable!("field already checked against MUTABLE_FIELDS"),
        }

        let mut fields = Document::new();
        fields.insert(field.to_string(), value);

        self.store
            .update(FOODS_COLLECTION, record_id, fields)
            .await
            .with_context(|| format!("Failed to update {} on food record {}", field, record_id))?;

        debug!("Updated {} on food record {}", field, record_id);
        Ok(())
    }

    pub async fn set_category(&self, record_id: &str, category: FoodCategory) -> Result<()> {
        self.update_field(record_id, "category", Value::String(category.as_str().to_string()))
            .await
    }

    pub async fn set_reward_promise(
        &self,
        record_id: &str,
        promise: Option<String>,
    ) -> Result<()> {
        let value = match promise {
            Some(p) => Value::String(p),
            None => Value::Null,
        };
        self.update_field(record_id, "reward_promise", value).await
    }

    /// Apply a user-driven category transition: persists the new category and
    /// returns the [`CategoryChange`], including whether the celebratory
    /// side effect should fire. Rendering the celebration is the caller's
    /// choice.
    pub async fn change_category(
        &self,
        record_id: &str,
        from: FoodCategory,
        to: FoodCategory,
    ) -> Result<CategoryChange> {
        let change = category::transition(from, to);
        self.set_category(record_id, to).await?;
        if change.celebrate {
            debug!("Celebration signal for food record {}", record_id);
        }
        Ok(change)
    }

    /// Delete a record. Deleting a missing or already-deleted id is a no-op
    /// and produces no emission; returns whether anything was removed.
    pub async fn delete(&self, record_id: &str) -> Result<bool> {
        let removed = self.store.delete(FOODS_COLLECTION, record_id).await?;
        if removed {
            info!("Deleted food record {}", record_id);
        } else {
            debug!("Delete of missing food record {} ignored", record_id);
        }
        Ok(removed)
    }

    /// Register a live observer over one child's records. Fires promptly with
    /// the current snapshot and again on every affecting mutation, from this
    /// session or any other, until the subscription is cancelled. Records are
    /// ordered by descending creation time, ties broken by id.
    pub fn subscribe(&self, child_id: &str, on_change: RecordsCallback) -> Subscription {
        let callback: SnapshotCallback = Arc::new(move |documents: Vec<Document>| {
            let mut records: Vec<FoodRecord> = documents
                .into_iter()
                .filter_map(|doc| match from_document(doc) {
                    Ok(record) => Some(record),
                    Err(e) => {
                        warn!("Skipping undecodable food document: {}", e);
                        None
                    }
                })
                .collect();

            records.sort_by(|a, b| {
                b.created_at
                    .cmp(&a.created_at)
                    .then_with(|| b.id.cmp(&a.id))
            });

            on_change(records);
        });

        self.store.live_query(
            FOODS_COLLECTION,
            "child_id",
            Value::String(child_id.to_string()),
            callback,
        )
    }
}

fn to_document(record: &FoodRecord) -> Result<Document> {
    match serde_json::to_value(record)? {
        Value::Object(map) => Ok(map),
        other => bail!("food record serialized to non-object value: {}", other),
    }
}

fn from_document(document: Document) -> Result<FoodRecord> {
    serde_json::from_value(Value::Object(document)).context("invalid food document")
}
