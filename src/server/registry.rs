//! In-memory store of run groups
//!
//! The registry map sits behind an `RwLock`; each group has its own `Mutex`
//! so recording into one group never blocks another.

use crate::models::RunGroup;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// Handle to one registered group
pub type SharedGroup = Arc<Mutex<RunGroup>>;

#[derive(Default)]
struct Inner {
    groups: HashMap<String, SharedGroup>,
    order: Vec<String>,
}

/// Groups known to the server, kept in creation order
#[derive(Default)]
pub struct GroupRegistry {
    inner: RwLock<Inner>,
}

impl GroupRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a group under its own id, replacing nothing
    ///
    /// Returns `None` if the id is already taken.
    pub async fn insert(&self, group: RunGroup) -> Option<SharedGroup> {
        let mut inner = self.inner.write().await;
        if inner.groups.contains_key(group.id()) {
            return None;
        }

        let id = group.id().to_string();
        let shared = Arc::new(Mutex::new(group));
        inner.groups.insert(id.clone(), shared.clone());
        inner.order.push(id);
        Some(shared)
    }

    pub async fn get(&self, group_id: &str) -> Option<SharedGroup> {
        self.inner.read().await.groups.get(group_id).cloned()
    }

    /// Snapshot of every group in creation order
    pub async fn list(&self) -> Vec<RunGroup> {
        let handles: Vec<SharedGroup> = {
            let inner = self.inner.read().await;
            inner
                .order
                .iter()
                .filter_map(|id| inner.groups.get(id).cloned())
                .collect()
        };

        let mut groups = Vec::with_capacity(handles.len());
        for handle in handles {
            groups.push(handle.lock().await.clone());
        }
        groups
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.order.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
