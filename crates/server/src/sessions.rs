//! Live SSE sessions, keyed by the id handed out in the `endpoint` event.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

/// Routes POSTed message bodies to the session loop that owns them.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    inner: Arc<RwLock<HashMap<Uuid, mpsc::Sender<String>>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, id: Uuid, inbound: mpsc::Sender<String>) {
        self.inner.write().await.insert(id, inbound);
    }

    pub async fn get(&self, id: &Uuid) -> Option<mpsc::Sender<String>> {
        self.inner.read().await.get(id).cloned()
    }

    pub async fn remove(&self, id: &Uuid) -> bool {
        self.inner.write().await.remove(id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }
}
