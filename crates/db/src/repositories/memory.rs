use std::collections::HashMap;

use tokio::sync::{Mutex, RwLock};

use zen_core::domain::ids::{ChannelId, UserId};
use zen_core::domain::review::{Review, ReviewId};
use zen_core::domain::settings::{GuildSettings, SettingKey};
use zen_core::domain::ticket::{Ticket, TicketNumber};

use super::{
    EmojiRepository, RepositoryError, ReviewRepository, SettingsRepository,
    TicketCounterRepository, TicketRepository,
};

#[derive(Default)]
pub struct InMemorySettingsRepository {
    settings: RwLock<GuildSettings>,
}

impl InMemorySettingsRepository {
    pub fn with_settings(settings: GuildSettings) -> Self {
        Self { settings: RwLock::new(settings) }
    }
}

#[async_trait::async_trait]
impl SettingsRepository for InMemorySettingsRepository {
    async fn load(&self) -> Result<GuildSettings, RepositoryError> {
        Ok(self.settings.read().await.clone())
    }

    async fn set(&self, key: SettingKey, value: u64) -> Result<(), RepositoryError> {
        self.settings.write().await.set(key, value);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryEmojiRepository {
    entries: RwLock<HashMap<String, String>>,
}

#[async_trait::async_trait]
impl EmojiRepository for InMemoryEmojiRepository {
    async fn load_all(&self) -> Result<HashMap<String, String>, RepositoryError> {
        Ok(self.entries.read().await.clone())
    }

    async fn upsert(&self, name: &str, reference: &str) -> Result<(), RepositoryError> {
        self.entries.write().await.insert(name.to_owned(), reference.to_owned());
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryTicketCounterRepository {
    value: Mutex<u64>,
}

impl InMemoryTicketCounterRepository {
    pub fn starting_at(value: u64) -> Self {
        Self { value: Mutex::new(value) }
    }
}

#[async_trait::async_trait]
impl TicketCounterRepository for InMemoryTicketCounterRepository {
    async fn next(&self) -> Result<TicketNumber, RepositoryError> {
        let mut value = self.value.lock().await;
        *value += 1;
        Ok(TicketNumber(*value))
    }

    async fn current(&self) -> Result<u64, RepositoryError> {
        Ok(*self.value.lock().await)
    }

    async fn reset_to(&self, value: u64) -> Result<(), RepositoryError> {
        *self.value.lock().await = value;
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryReviewRepository {
    reviews: RwLock<HashMap<String, Review>>,
}

#[async_trait::async_trait]
impl ReviewRepository for InMemoryReviewRepository {
    async fn insert(&self, review: Review) -> Result<(), RepositoryError> {
        let mut reviews = self.reviews.write().await;
        if reviews.contains_key(review.id.as_str()) {
            return Err(RepositoryError::Conflict(format!("review {}", review.id)));
        }
        reviews.insert(review.id.0.clone(), review);
        Ok(())
    }

    async fn find(&self, id: &ReviewId) -> Result<Option<Review>, RepositoryError> {
        Ok(self.reviews.read().await.get(id.as_str()).cloned())
    }

    async fn list(&self, limit: u32) -> Result<Vec<Review>, RepositoryError> {
        let mut reviews: Vec<Review> = self.reviews.read().await.values().cloned().collect();
        reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        reviews.truncate(limit as usize);
        Ok(reviews)
    }
}

#[derive(Default)]
pub struct InMemoryTicketRepository {
    tickets: RwLock<HashMap<ChannelId, Ticket>>,
}

#[async_trait::async_trait]
impl TicketRepository for InMemoryTicketRepository {
    async fn find(&self, channel_id: ChannelId) -> Result<Option<Ticket>, RepositoryError> {
        Ok(self.tickets.read().await.get(&channel_id).cloned())
    }

    async fn find_active_by_owner(
        &self,
        owner: UserId,
        category: Option<ChannelId>,
    ) -> Result<Option<Ticket>, RepositoryError> {
        let tickets = self.tickets.read().await;
        let mut matches: Vec<&Ticket> = tickets
            .values()
            .filter(|ticket| ticket.owner_id == owner && ticket.is_active())
            .filter(|ticket| category.is_none() || ticket.category_id == category)
            .collect();
        matches.sort_by(|a, b| b.number.cmp(&a.number));
        Ok(matches.first().map(|ticket| (*ticket).clone()))
    }

    async fn save(&self, ticket: Ticket) -> Result<(), RepositoryError> {
        self.tickets.write().await.insert(ticket.channel_id, ticket);
        Ok(())
    }

    async fn count_active(&self) -> Result<u64, RepositoryError> {
        Ok(self.tickets.read().await.values().filter(|ticket| ticket.is_active()).count() as u64)
    }
}
