//! The chat-platform capabilities the services depend on.
//!
//! `zen-server` implements [`DiscordApi`] over serenity's REST client; tests use a
//! recording fake.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use zen_core::domain::ids::{ChannelId, EmojiId, GuildId, MessageId, RoleId, UserId};
use zen_core::emojis::EmojiRef;

use crate::components::{ChannelKind, Embed, MessageTemplate, Modal};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApiError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("missing permissions: {0}")]
    Forbidden(String),
    #[error("interaction was already acknowledged")]
    AlreadyAcknowledged,
    #[error("discord request failed: {0}")]
    Request(String),
}

/// Handle needed to answer an interaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InteractionRef {
    pub id: u64,
    pub token: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InteractionReply {
    Message { message: MessageTemplate, ephemeral: bool },
    /// Replaces the message the component lives on.
    UpdateMessage(MessageTemplate),
    Modal(Modal),
    Defer { ephemeral: bool },
    DeferUpdate,
}

impl InteractionReply {
    pub fn ephemeral(message: MessageTemplate) -> Self {
        Self::Message { message, ephemeral: true }
    }

    pub fn ephemeral_text(content: impl Into<String>) -> Self {
        Self::ephemeral(MessageTemplate::text(content))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GuildProfile {
    pub id: GuildId,
    pub name: String,
    pub icon_url: Option<String>,
}

impl GuildProfile {
    pub fn footer_text(&self) -> String {
        format!("© {}. All rights reserved.", self.name)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelInfo {
    pub id: ChannelId,
    pub name: String,
    pub kind: ChannelKind,
    pub parent_id: Option<ChannelId>,
    pub topic: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemberInfo {
    pub user_id: UserId,
    pub name: String,
    pub avatar_url: Option<String>,
    pub roles: Vec<RoleId>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HistoryMessage {
    pub id: MessageId,
    pub author_id: UserId,
    pub author_name: String,
    pub author_avatar: Option<String>,
    pub author_is_bot: bool,
    pub content: String,
    pub embeds: Vec<Embed>,
    pub attachments: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

/// Permission overwrite applied to a new ticket channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelAccess {
    HideFromEveryone,
    Requester(UserId),
    Staff(RoleId),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewTextChannel {
    pub name: String,
    pub category: ChannelId,
    pub topic: String,
    pub access: Vec<ChannelAccess>,
}

#[async_trait]
pub trait DiscordApi: Send + Sync {
    async fn respond(
        &self,
        interaction: &InteractionRef,
        reply: InteractionReply,
    ) -> Result<(), ApiError>;

    async fn followup(
        &self,
        interaction: &InteractionRef,
        message: MessageTemplate,
        ephemeral: bool,
    ) -> Result<MessageId, ApiError>;

    async fn edit_original(
        &self,
        interaction: &InteractionRef,
        message: MessageTemplate,
    ) -> Result<(), ApiError>;

    async fn guild(&self, guild: GuildId) -> Result<GuildProfile, ApiError>;

    async fn role_exists(&self, guild: GuildId, role: RoleId) -> Result<bool, ApiError>;

    async fn channel(&self, channel: ChannelId) -> Result<Option<ChannelInfo>, ApiError>;

    async fn guild_channels(&self, guild: GuildId) -> Result<Vec<ChannelInfo>, ApiError>;

    async fn create_text_channel(
        &self,
        guild: GuildId,
        request: NewTextChannel,
    ) -> Result<ChannelInfo, ApiError>;

    async fn move_channel(&self, channel: ChannelId, category: ChannelId) -> Result<(), ApiError>;

    async fn delete_channel(&self, channel: ChannelId) -> Result<(), ApiError>;

    async fn send_message(
        &self,
        channel: ChannelId,
        message: MessageTemplate,
    ) -> Result<MessageId, ApiError>;

    async fn edit_message(
        &self,
        channel: ChannelId,
        message_id: MessageId,
        message: MessageTemplate,
    ) -> Result<(), ApiError>;

    /// Oldest first. `None` reads the whole channel.
    async fn history(
        &self,
        channel: ChannelId,
        limit: Option<u16>,
    ) -> Result<Vec<HistoryMessage>, ApiError>;

    async fn member(&self, guild: GuildId, user: UserId) -> Result<Option<MemberInfo>, ApiError>;

    async fn send_dm(&self, user: UserId, message: MessageTemplate) -> Result<MessageId, ApiError>;

    async fn guild_emojis(&self, guild: GuildId) -> Result<Vec<EmojiId>, ApiError>;

    async fn create_emoji(
        &self,
        guild: GuildId,
        name: &str,
        file_name: &str,
        image: Vec<u8>,
    ) -> Result<EmojiRef, ApiError>;

    async fn create_thread(
        &self,
        channel: ChannelId,
        message_id: MessageId,
        name: &str,
        auto_archive_minutes: u16,
    ) -> Result<ChannelId, ApiError>;
}
