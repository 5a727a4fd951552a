//! Per-session conversation state.
//!
//! A [`Session`] is created by the interactive front-end and passed to every
//! action. It owns the question/answer history of each collection touched
//! during the session and a shared handle onto the active collection's
//! index. Nothing here is persisted.
//!
//! # Activation
//!
//! ```text
//! Inactive ──activate()──▶ Active ──activate(other)──▶ Inactive
//!                            │
//!                            └──forget() after delete──▶ no active collection
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use crate::index::VectorIndex;
use crate::models::HistoryEntry;

/// The collection questions are currently asked against.
#[derive(Clone)]
pub struct ActiveCollection {
    pub name: String,
    pub index: Arc<dyn VectorIndex>,
}

/// Session-scoped history map plus the active collection.
#[derive(Default)]
pub struct Session {
    histories: HashMap<String, Vec<HistoryEntry>>,
    active: Option<ActiveCollection>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `index` the active collection.
    ///
    /// The first activation of a collection in this session starts it with
    /// an empty history; later activations keep what was already asked.
    pub fn activate(&mut self, index: Arc<dyn VectorIndex>) {
        let name = index.name().to_string();
        self.histories.entry(name.clone()).or_default();
        tracing::debug!(collection = %name, "collection activated");
        self.active = Some(ActiveCollection { name, index });
    }

    pub fn active(&self) -> Option<&ActiveCollection> {
        self.active.as_ref()
    }

    pub fn active_name(&self) -> Option<&str> {
        self.active.as_ref().map(|a| a.name.as_str())
    }

    /// Append one exchange to the end of `collection`'s history.
    pub fn append(&mut self, collection: &str, question: &str, answer: &str) {
        self.histories
            .entry(collection.to_string())
            .or_default()
            .push(HistoryEntry::new(question, answer));
    }

    /// Replace `collection`'s history with an empty one.
    pub fn reset(&mut self, collection: &str) {
        self.histories.insert(collection.to_string(), Vec::new());
    }

    /// History of `collection` in insertion order; empty when unknown.
    pub fn get(&self, collection: &str) -> &[HistoryEntry] {
        self.histories
            .get(collection)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Drop everything the session knows about a deleted collection.
    ///
    /// Clears its history and, when it was active, leaves no active
    /// collection so the caller must select another.
    pub fn forget(&mut self, collection: &str) {
        self.histories.remove(collection);
        if self.active_name() == Some(collection) {
            self.active = None;
        }
    }
}
