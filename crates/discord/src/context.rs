use std::sync::Arc;

use tracing::warn;

use zen_core::config::TicketsConfig;
use zen_core::domain::ids::GuildId;
use zen_core::emojis::{EmojiKey, EmojiRef, EmojiRegistry};
use zen_db::Stores;

use crate::api::{ApiError, DiscordApi, GuildProfile};
use crate::components::FileUpload;

/// Shared handles every service works with.
#[derive(Clone)]
pub struct BotContext {
    pub api: Arc<dyn DiscordApi>,
    pub stores: Stores,
    pub emojis: EmojiRegistry,
    pub tickets: Arc<TicketsConfig>,
}

impl BotContext {
    pub fn new(
        api: Arc<dyn DiscordApi>,
        stores: Stores,
        emojis: EmojiRegistry,
        tickets: TicketsConfig,
    ) -> Self {
        Self { api, stores, emojis, tickets: Arc::new(tickets) }
    }

    pub fn emoji(&self, key: EmojiKey) -> EmojiRef {
        self.emojis.get(key)
    }

    pub async fn guild(&self, guild: GuildId) -> Result<GuildProfile, ApiError> {
        self.api.guild(guild).await
    }

    /// The banner attachment, when the assets directory has one.
    pub async fn banner(&self) -> Option<FileUpload> {
        let path = self.tickets.banner_path();
        match tokio::fs::read(&path).await {
            Ok(bytes) => Some(FileUpload::new(self.tickets.banner_file.clone(), bytes)),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => None,
            Err(error) => {
                warn!(path = %path.display(), error = %error, "could not read banner image");
                None
            }
        }
    }

    /// Name of the banner attachment without reading the image.
    pub async fn banner_name(&self) -> Option<String> {
        match tokio::fs::try_exists(self.tickets.banner_path()).await {
            Ok(true) => Some(self.tickets.banner_file.clone()),
            _ => None,
        }
    }

    /// Reloads the emoji registry from storage.
    pub async fn reload_emojis(&self) -> Result<usize, zen_db::repositories::RepositoryError> {
        let entries = self.stores.emojis.load_all().await?;
        let count = entries.len();
        self.emojis.reload(entries);
        Ok(count)
    }
}
