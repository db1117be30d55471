//! Session scope: which child's records a client session is viewing.
//!
//! Every record operation is gated on an active child being selected.
//! Changing the active child tears the previous live subscription down
//! before the new scope takes effect, so no stale-scope emission can be
//! delivered afterwards. Observer callbacks are always invoked outside the
//! session lock, so an observer may call back into the session.

use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{bail, Result};
use log::{debug, info};

use crate::domain::category::CategoryChange;
use crate::domain::food_service::{FoodService, RecordsCallback};
use crate::domain::models::food::{FoodCategory, FoodError, FoodRecord};
use crate::generation::FoodDataGenerator;
use crate::storage::traits::Subscription;

pub struct SessionScope {
    foods: Arc<FoodService>,
    generator: Arc<FoodDataGenerator>,
    state: Mutex<SessionState>,
}

#[derive(Default)]
struct SessionState {
    active_child: Option<String>,
    observer: Option<RecordsCallback>,
    subscription: Option<Subscription>,
}

impl SessionScope {
    /// Create a session, optionally seeded with the child id the client
    /// remembered from its session-local storage.
    pub fn new(
        foods: Arc<FoodService>,
        generator: Arc<FoodDataGenerator>,
        initial_child: Option<String>,
    ) -> Self {
        let active_child = initial_child
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty());

        Self {
            foods,
            generator,
            state: Mutex::new(SessionState {
                active_child,
                ..SessionState::default()
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().expect("session state lock poisoned")
    }

    /// The currently selected child, if any.
    pub fn active_child(&self) -> Option<String> {
        self.state().active_child.clone()
    }

    fn require_child(&self) -> Result<String> {
        match self.active_child() {
            Some(child) => Ok(child),
            None => bail!(FoodError::NoChildSelected),
        }
    }

    /// Make `child_id` the active scope. Any existing subscription is torn
    /// down before the new scope is live; a registered observer is
    /// resubscribed to the new child and promptly receives its snapshot.
    pub fn select_child(&self, child_id: &str) -> Result<()> {
        let child_id = child_id.trim();
        if child_id.is_empty() {
            bail!("child id cannot be empty");
        }

        let (previous, observer) = {
            let mut state = self.state();
            let previous = state.subscription.take();
            state.active_child = Some(child_id.to_string());
            (previous, state.observer.clone())
        };

        if let Some(previous) = previous {
            previous.unsubscribe();
        }
        info!("Session scope switched to child {}", child_id);

        if let Some(observer) = observer {
            self.resubscribe(child_id, observer);
        }
        Ok(())
    }

    /// Drop the active scope. The observer, if any, receives the neutral
    /// empty snapshot.
    pub fn clear_selection(&self) {
        let (previous, observer) = {
            let mut state = self.state();
            state.active_child = None;
            (state.subscription.take(), state.observer.clone())
        };

        if let Some(previous) = previous {
            previous.unsubscribe();
        }
        info!("Session scope cleared");

        if let Some(observer) = observer {
            observer(Vec::new());
        }
    }

    /// Register this session's record observer. With a child selected it is
    /// subscribed immediately; otherwise it receives the neutral empty
    /// snapshot and no store subscription is attempted.
    pub fn watch(&self, observer: RecordsCallback) {
        let (previous, active) = {
            let mut state = self.state();
            let previous = state.subscription.take();
            state.observer = Some(observer.clone());
            (previous, state.active_child.clone())
        };

        if let Some(previous) = previous {
            previous.unsubscribe();
        }

        match active {
            Some(child) => self.resubscribe(&child, observer),
            None => observer(Vec::new()),
        }
    }

    /// Stop observing. No further emissions are delivered.
    pub fn unwatch(&self) {
        let previous = {
            let mut state = self.state();
            state.observer = None;
            state.subscription.take()
        };
        if let Some(previous) = previous {
            previous.unsubscribe();
        }
    }

    fn resubscribe(&self, child_id: &str, observer: RecordsCallback) {
        let subscription = self.foods.subscribe(child_id, observer);
        let mut state = self.state();
        if state.active_child.as_deref() == Some(child_id) {
            state.subscription = Some(subscription);
        } else {
            // Scope moved on while the subscription was being established.
            debug!("Discarding subscription for superseded scope {}", child_id);
            subscription.unsubscribe();
        }
    }

    /// Full pipeline for a user-submitted food name: generate descriptive
    /// data (never fails outward) and persist the record under the active
    /// child.
    pub async fn add_food(&self, name: &str) -> Result<FoodRecord> {
        let child = self.require_child()?;
        let name = name.trim().to_string();
        if name.is_empty() {
            bail!(FoodError::EmptyFoodName);
        }

        let draft = self.generator.generate(&name).await;
        self.foods.create(&child, &name, draft).await
    }

    /// Persist a category transition for a record in the active scope and
    /// report whether the celebratory effect should fire.
    pub async fn change_category(
        &self,
        record_id: &str,
        from: FoodCategory,
        to: FoodCategory,
    ) -> Result<CategoryChange> {
        self.require_child()?;
        self.foods.change_category(record_id, from, to).await
    }

    /// Attach or clear the caregiver's reward promise on a record.
    pub async fn set_reward_promise(
        &self,
        record_id: &str,
        promise: Option<String>,
    ) -> Result<()> {
        self.require_child()?;
        self.foods.set_reward_promise(record_id, promise).await
    }

    /// Delete a record in the active scope; missing ids are a no-op.
    pub async fn delete_food(&self, record_id: &str) -> Result<bool> {
        self.require_child()?;
        self.foods.delete(record_id).await
    }
}
