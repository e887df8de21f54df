use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{oneshot, Mutex};

use zen_core::domain::ids::{ChannelId, UserId};

type WaiterKey = (UserId, ChannelId);

struct PendingWait {
    generation: u64,
    sender: oneshot::Sender<Vec<String>>,
}

/// Hands the next message with attachments from a user in a channel to whoever
/// is waiting for it.
///
/// A new wait for the same user and channel replaces the previous one, which then
/// resolves as if it had timed out.
#[derive(Clone, Default)]
pub struct AttachmentWaiter {
    pending: Arc<Mutex<HashMap<WaiterKey, PendingWait>>>,
    generation: Arc<AtomicU64>,
}

impl AttachmentWaiter {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn wait(
        &self,
        user: UserId,
        channel: ChannelId,
        timeout: Duration,
    ) -> Option<Vec<String>> {
        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = oneshot::channel();
        self.pending.lock().await.insert((user, channel), PendingWait { generation, sender });

        let outcome = tokio::time::timeout(timeout, receiver).await;

        let mut pending = self.pending.lock().await;
        if pending.get(&(user, channel)).is_some_and(|wait| wait.generation == generation) {
            pending.remove(&(user, channel));
        }

        match outcome {
            Ok(Ok(urls)) => Some(urls),
            _ => None,
        }
    }

    /// Returns true when the attachments were delivered to a waiter.
    pub async fn offer(&self, user: UserId, channel: ChannelId, attachments: Vec<String>) -> bool {
        if attachments.is_empty() {
            return false;
        }
        let Some(wait) = self.pending.lock().await.remove(&(user, channel)) else {
            return false;
        };
        wait.sender.send(attachments).is_ok()
    }

    pub async fn pending_count(&self) -> usize {
        self.pending.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use zen_core::domain::ids::{ChannelId, UserId};

    use super::AttachmentWaiter;

    #[tokio::test]
    async fn delivers_attachments_to_the_matching_waiter() {
        let waiter = AttachmentWaiter::new();
        let task = {
            let waiter = waiter.clone();
            tokio::spawn(async move {
                waiter.wait(UserId(1), ChannelId(2), Duration::from_secs(5)).await
            })
        };

        while waiter.pending_count().await == 0 {
            tokio::task::yield_now().await;
        }
        assert!(!waiter.offer(UserId(9), ChannelId(2), vec!["x".to_owned()]).await);
        assert!(!waiter.offer(UserId(1), ChannelId(2), Vec::new()).await);
        assert!(waiter.offer(UserId(1), ChannelId(2), vec!["https://cdn/a.png".to_owned()]).await);

        let urls = task.await.expect("join");
        assert_eq!(urls, Some(vec!["https://cdn/a.png".to_owned()]));
        assert_eq!(waiter.pending_count().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn wait_times_out_without_attachments() {
        let waiter = AttachmentWaiter::new();
        let result = waiter.wait(UserId(1), ChannelId(2), Duration::from_secs(60)).await;
        assert_eq!(result, None);
        assert_eq!(waiter.pending_count().await, 0);
    }
}
