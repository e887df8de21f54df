use std::sync::Arc;

use crate::repositories::{
    EmojiRepository, InMemoryEmojiRepository, InMemoryReviewRepository,
    InMemorySettingsRepository, InMemoryTicketCounterRepository, InMemoryTicketRepository,
    ReviewRepository, SettingsRepository, SqlEmojiRepository, SqlReviewRepository,
    SqlSettingsRepository, SqlTicketCounterRepository, SqlTicketRepository,
    TicketCounterRepository, TicketRepository,
};
use crate::DbPool;

/// Every repository the bot uses, shared behind trait objects.
#[derive(Clone)]
pub struct Stores {
    pub settings: Arc<dyn SettingsRepository>,
    pub emojis: Arc<dyn EmojiRepository>,
    pub counter: Arc<dyn TicketCounterRepository>,
    pub tickets: Arc<dyn TicketRepository>,
    pub reviews: Arc<dyn ReviewRepository>,
}

impl Stores {
    pub fn sql(pool: DbPool) -> Self {
        Self {
            settings: Arc::new(SqlSettingsRepository::new(pool.clone())),
            emojis: Arc::new(SqlEmojiRepository::new(pool.clone())),
            counter: Arc::new(SqlTicketCounterRepository::new(pool.clone())),
            tickets: Arc::new(SqlTicketRepository::new(pool.clone())),
            reviews: Arc::new(SqlReviewRepository::new(pool)),
        }
    }

    pub fn in_memory() -> Self {
        Self {
            settings: Arc::new(InMemorySettingsRepository::default()),
            emojis: Arc::new(InMemoryEmojiRepository::default()),
            counter: Arc::new(InMemoryTicketCounterRepository::default()),
            tickets: Arc::new(InMemoryTicketRepository::default()),
            reviews: Arc::new(InMemoryReviewRepository::default()),
        }
    }
}

impl std::fmt::Debug for Stores {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stores").finish_non_exhaustive()
    }
}
