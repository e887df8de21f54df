use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use uuid::Uuid;

struct SessionEntry<T> {
    value: T,
    touched_at: Instant,
}

/// In-process sessions that expire after a period of inactivity.
///
/// Every successful `update` counts as activity. Expired entries are dropped
/// lazily on access and by [`SessionStore::purge_expired`].
pub struct SessionStore<T> {
    ttl: Duration,
    entries: Mutex<HashMap<String, SessionEntry<T>>>,
}

impl<T> SessionStore<T>
where
    T: Clone + Send,
{
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, entries: Mutex::new(HashMap::new()) }
    }

    pub async fn insert(&self, value: T) -> String {
        let id = Uuid::new_v4().simple().to_string();
        self.entries
            .lock()
            .await
            .insert(id.clone(), SessionEntry { value, touched_at: Instant::now() });
        id
    }

    pub async fn get(&self, id: &str) -> Option<T> {
        let mut entries = self.entries.lock().await;
        if self.evict_if_expired(&mut entries, id) {
            return None;
        }
        entries.get(id).map(|entry| entry.value.clone())
    }

    pub async fn update<R>(&self, id: &str, apply: impl FnOnce(&mut T) -> R) -> Option<R> {
        let mut entries = self.entries.lock().await;
        if self.evict_if_expired(&mut entries, id) {
            return None;
        }
        let entry = entries.get_mut(id)?;
        entry.touched_at = Instant::now();
        Some(apply(&mut entry.value))
    }

    pub async fn remove(&self, id: &str) -> Option<T> {
        self.entries.lock().await.remove(id).map(|entry| entry.value)
    }

    pub async fn purge_expired(&self) -> usize {
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        let ttl = self.ttl;
        entries.retain(|_, entry| entry.touched_at.elapsed() < ttl);
        before - entries.len()
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn evict_if_expired(&self, entries: &mut HashMap<String, SessionEntry<T>>, id: &str) -> bool {
        let expired = entries.get(id).is_some_and(|entry| entry.touched_at.elapsed() >= self.ttl);
        if expired {
            entries.remove(id);
        }
        expired
    }
}
