use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;

use zen_core::domain::ids::{ChannelId, UserId};
use zen_core::domain::review::{Review, ReviewId};
use zen_core::domain::settings::{GuildSettings, SettingKey};
use zen_core::domain::ticket::{Ticket, TicketNumber};

pub mod counter;
pub mod emoji;
pub mod memory;
pub mod review;
pub mod settings;
pub mod ticket;

pub use counter::SqlTicketCounterRepository;
pub use emoji::SqlEmojiRepository;
pub use memory::{
    InMemoryEmojiRepository, InMemoryReviewRepository, InMemorySettingsRepository,
    InMemoryTicketCounterRepository, InMemoryTicketRepository,
};
pub use review::SqlReviewRepository;
pub use settings::SqlSettingsRepository;
pub use ticket::SqlTicketRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("record already exists: {0}")]
    Conflict(String),
}

impl RepositoryError {
    pub(crate) fn decode(error: impl std::fmt::Display) -> Self {
        Self::Decode(error.to_string())
    }
}

/// Guild configuration written by the setup wizard.
#[async_trait]
pub trait SettingsRepository: Send + Sync {
    async fn load(&self) -> Result<GuildSettings, RepositoryError>;
    /// Per-key upsert; concurrent writers race and the last write wins.
    async fn set(&self, key: SettingKey, value: u64) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait EmojiRepository: Send + Sync {
    async fn load_all(&self) -> Result<HashMap<String, String>, RepositoryError>;
    async fn upsert(&self, name: &str, reference: &str) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait TicketCounterRepository: Send + Sync {
    /// Allocates and returns the next ticket number; the first allocation is 1.
    async fn next(&self) -> Result<TicketNumber, RepositoryError>;
    async fn current(&self) -> Result<u64, RepositoryError>;
    async fn reset_to(&self, value: u64) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait ReviewRepository: Send + Sync {
    /// Fails with [`RepositoryError::Conflict`] when the id is already taken.
    async fn insert(&self, review: Review) -> Result<(), RepositoryError>;
    async fn find(&self, id: &ReviewId) -> Result<Option<Review>, RepositoryError>;
    /// Newest first.
    async fn list(&self, limit: u32) -> Result<Vec<Review>, RepositoryError>;
}

#[async_trait]
pub trait TicketRepository: Send + Sync {
    async fn find(&self, channel_id: ChannelId) -> Result<Option<Ticket>, RepositoryError>;
    /// Active ticket owned by `owner`, restricted to `category` when given.
    async fn find_active_by_owner(
        &self,
        owner: UserId,
        category: Option<ChannelId>,
    ) -> Result<Option<Ticket>, RepositoryError>;
    async fn save(&self, ticket: Ticket) -> Result<(), RepositoryError>;
    async fn count_active(&self) -> Result<u64, RepositoryError>;
}
