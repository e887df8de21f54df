//! Recording fake of the platform API and event builders shared by service tests.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;

use zen_core::config::{AppConfig, TicketsConfig};
use zen_core::domain::ids::{ChannelId, EmojiId, GuildId, MessageId, RoleId, UserId};
use zen_core::emojis::{EmojiRef, EmojiRegistry};
use zen_db::Stores;

use crate::api::{
    ApiError, ChannelInfo, DiscordApi, GuildProfile, HistoryMessage, InteractionRef,
    InteractionReply, MemberInfo, NewTextChannel,
};
use crate::components::{ChannelKind, MessageTemplate};
use crate::context::BotContext;
use crate::events::{Actor, ComponentEvent, SlashCommandEvent};

pub const GUILD: GuildId = GuildId(1);
pub const BOT_USER: UserId = UserId(900);

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ApiCall {
    Respond { interaction: u64, reply: InteractionReply },
    Followup { interaction: u64, message: MessageTemplate, ephemeral: bool },
    EditOriginal { interaction: u64, message: MessageTemplate },
    CreateChannel { request: NewTextChannel, channel: ChannelId },
    MoveChannel { channel: ChannelId, category: ChannelId },
    DeleteChannel { channel: ChannelId },
    SendMessage { channel: ChannelId, message: MessageTemplate },
    EditMessage { channel: ChannelId, message_id: MessageId, message: MessageTemplate },
    SendDm { user: UserId, message: MessageTemplate },
    CreateEmoji { name: String },
    CreateThread { channel: ChannelId, message_id: MessageId, name: String },
}

#[derive(Default)]
struct FakeState {
    roles: HashSet<RoleId>,
    channels: HashMap<ChannelId, ChannelInfo>,
    members: HashMap<UserId, MemberInfo>,
    history: HashMap<ChannelId, Vec<HistoryMessage>>,
    emojis: Vec<EmojiId>,
    acknowledged: HashSet<u64>,
    failing: HashSet<&'static str>,
    calls: Vec<ApiCall>,
    next_id: u64,
}

impl FakeState {
    fn allocate(&mut self) -> u64 {
        self.next_id += 1;
        10_000 + self.next_id
    }

    fn check(&self, operation: &'static str) -> Result<(), ApiError> {
        if self.failing.contains(operation) {
            Err(ApiError::Forbidden(format!("{operation} denied")))
        } else {
            Ok(())
        }
    }
}

/// In-memory guild that records every call made against it.
#[derive(Default)]
pub struct RecordingDiscordApi {
    state: Mutex<FakeState>,
}

impl RecordingDiscordApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().expect("fake api state lock")
    }

    pub fn add_role(&self, role: RoleId) {
        self.state().roles.insert(role);
    }

    pub fn add_category(&self, id: ChannelId, name: &str) {
        self.add_channel(ChannelInfo {
            id,
            name: name.to_owned(),
            kind: ChannelKind::Category,
            parent_id: None,
            topic: None,
        });
    }

    pub fn add_channel(&self, channel: ChannelInfo) {
        self.state().channels.insert(channel.id, channel);
    }

    pub fn add_member(&self, user_id: UserId, name: &str) {
        self.state().members.insert(
            user_id,
            MemberInfo { user_id, name: name.to_owned(), avatar_url: None, roles: Vec::new() },
        );
    }

    pub fn add_guild_emoji(&self, id: EmojiId) {
        self.state().emojis.push(id);
    }

    pub fn push_history(&self, channel: ChannelId, message: HistoryMessage) {
        self.state().history.entry(channel).or_default().push(message);
    }

    /// Removes a channel as if someone deleted it by hand.
    pub fn delete_channel_now(&self, channel: ChannelId) {
        self.state().channels.remove(&channel);
    }

    /// Makes every later call of `operation` fail with a permission error.
    pub fn fail(&self, operation: &'static str) {
        self.state().failing.insert(operation);
    }

    pub fn calls(&self) -> Vec<ApiCall> {
        self.state().calls.clone()
    }

    pub fn has_channel(&self, channel: ChannelId) -> bool {
        self.state().channels.contains_key(&channel)
    }

    pub fn channel_info(&self, channel: ChannelId) -> Option<ChannelInfo> {
        self.state().channels.get(&channel).cloned()
    }

    pub fn created_channels(&self) -> Vec<NewTextChannel> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                ApiCall::CreateChannel { request, .. } => Some(request),
                _ => None,
            })
            .collect()
    }

    pub fn replies(&self, interaction: u64) -> Vec<InteractionReply> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                ApiCall::Respond { interaction: id, reply } if id == interaction => Some(reply),
                _ => None,
            })
            .collect()
    }

    pub fn followups(&self, interaction: u64) -> Vec<(MessageTemplate, bool)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                ApiCall::Followup { interaction: id, message, ephemeral } if id == interaction => {
                    Some((message, ephemeral))
                }
                _ => None,
            })
            .collect()
    }

    pub fn sent_to(&self, channel: ChannelId) -> Vec<MessageTemplate> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                ApiCall::SendMessage { channel: target, message } if target == channel => {
                    Some(message)
                }
                _ => None,
            })
            .collect()
    }

    pub fn direct_messages(&self, user: UserId) -> Vec<MessageTemplate> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                ApiCall::SendDm { user: target, message } if target == user => Some(message),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl DiscordApi for RecordingDiscordApi {
    async fn respond(
        &self,
        interaction: &InteractionRef,
        reply: InteractionReply,
    ) -> Result<(), ApiError> {
        let mut state = self.state();
        state.check("respond")?;
        if !state.acknowledged.insert(interaction.id) {
            return Err(ApiError::AlreadyAcknowledged);
        }
        state.calls.push(ApiCall::Respond { interaction: interaction.id, reply });
        Ok(())
    }

    async fn followup(
        &self,
        interaction: &InteractionRef,
        message: MessageTemplate,
        ephemeral: bool,
    ) -> Result<MessageId, ApiError> {
        let mut state = self.state();
        state.check("followup")?;
        state.calls.push(ApiCall::Followup { interaction: interaction.id, message, ephemeral });
        Ok(MessageId(state.allocate()))
    }

    async fn edit_original(
        &self,
        interaction: &InteractionRef,
        message: MessageTemplate,
    ) -> Result<(), ApiError> {
        self.state().calls.push(ApiCall::EditOriginal { interaction: interaction.id, message });
        Ok(())
    }

    async fn guild(&self, guild: GuildId) -> Result<GuildProfile, ApiError> {
        Ok(GuildProfile { id: guild, name: "Zen Studios".to_owned(), icon_url: None })
    }

    async fn role_exists(&self, _guild: GuildId, role: RoleId) -> Result<bool, ApiError> {
        Ok(self.state().roles.contains(&role))
    }

    async fn channel(&self, channel: ChannelId) -> Result<Option<ChannelInfo>, ApiError> {
        Ok(self.channel_info(channel))
    }

    async fn guild_channels(&self, _guild: GuildId) -> Result<Vec<ChannelInfo>, ApiError> {
        Ok(self.state().channels.values().cloned().collect())
    }

    async fn create_text_channel(
        &self,
        _guild: GuildId,
        request: NewTextChannel,
    ) -> Result<ChannelInfo, ApiError> {
        let mut state = self.state();
        state.check("create_text_channel")?;
        let channel = ChannelInfo {
            id: ChannelId(state.allocate()),
            name: request.name.clone(),
            kind: ChannelKind::Text,
            parent_id: Some(request.category),
            topic: Some(request.topic.clone()),
        };
        state.channels.insert(channel.id, channel.clone());
        state.calls.push(ApiCall::CreateChannel { request, channel: channel.id });
        Ok(channel)
    }

    async fn move_channel(&self, channel: ChannelId, category: ChannelId) -> Result<(), ApiError> {
        let mut state = self.state();
        state.check("move_channel")?;
        let Some(info) = state.channels.get_mut(&channel) else {
            return Err(ApiError::NotFound(format!("channel {channel}")));
        };
        info.parent_id = Some(category);
        state.calls.push(ApiCall::MoveChannel { channel, category });
        Ok(())
    }

    async fn delete_channel(&self, channel: ChannelId) -> Result<(), ApiError> {
        let mut state = self.state();
        state.check("delete_channel")?;
        if state.channels.remove(&channel).is_none() {
            return Err(ApiError::NotFound(format!("channel {channel}")));
        }
        state.calls.push(ApiCall::DeleteChannel { channel });
        Ok(())
    }

    async fn send_message(
        &self,
        channel: ChannelId,
        message: MessageTemplate,
    ) -> Result<MessageId, ApiError> {
        let mut state = self.state();
        state.check("send_message")?;
        let id = MessageId(state.allocate());
        let entry = HistoryMessage {
            id,
            author_id: BOT_USER,
            author_name: "Zen".to_owned(),
            author_avatar: None,
            author_is_bot: true,
            content: message.content.clone().unwrap_or_default(),
            embeds: message.embeds.clone(),
            attachments: Vec::new(),
            timestamp: Utc::now(),
        };
        state.history.entry(channel).or_default().push(entry);
        state.calls.push(ApiCall::SendMessage { channel, message });
        Ok(id)
    }

    async fn edit_message(
        &self,
        channel: ChannelId,
        message_id: MessageId,
        message: MessageTemplate,
    ) -> Result<(), ApiError> {
        let mut state = self.state();
        state.check("edit_message")?;
        if let Some(entry) = state
            .history
            .get_mut(&channel)
            .and_then(|messages| messages.iter_mut().find(|entry| entry.id == message_id))
        {
            entry.embeds = message.embeds.clone();
        }
        state.calls.push(ApiCall::EditMessage { channel, message_id, message });
        Ok(())
    }

    async fn history(
        &self,
        channel: ChannelId,
        limit: Option<u16>,
    ) -> Result<Vec<HistoryMessage>, ApiError> {
        let state = self.state();
        state.check("history")?;
        let mut messages = state.history.get(&channel).cloned().unwrap_or_default();
        if let Some(limit) = limit {
            let keep = usize::from(limit);
            if messages.len() > keep {
                messages = messages.split_off(messages.len() - keep);
            }
        }
        Ok(messages)
    }

    async fn member(&self, _guild: GuildId, user: UserId) -> Result<Option<MemberInfo>, ApiError> {
        Ok(self.state().members.get(&user).cloned())
    }

    async fn send_dm(&self, user: UserId, message: MessageTemplate) -> Result<MessageId, ApiError> {
        let mut state = self.state();
        state.check("send_dm")?;
        state.calls.push(ApiCall::SendDm { user, message });
        Ok(MessageId(state.allocate()))
    }

    async fn guild_emojis(&self, _guild: GuildId) -> Result<Vec<EmojiId>, ApiError> {
        Ok(self.state().emojis.clone())
    }

    async fn create_emoji(
        &self,
        _guild: GuildId,
        name: &str,
        _file_name: &str,
        _image: Vec<u8>,
    ) -> Result<EmojiRef, ApiError> {
        let mut state = self.state();
        state.check("create_emoji")?;
        let id = EmojiId(state.allocate());
        state.emojis.push(id);
        state.calls.push(ApiCall::CreateEmoji { name: name.to_owned() });
        Ok(EmojiRef::Custom { name: name.to_owned(), id, animated: false })
    }

    async fn create_thread(
        &self,
        channel: ChannelId,
        message_id: MessageId,
        name: &str,
        _auto_archive_minutes: u16,
    ) -> Result<ChannelId, ApiError> {
        let mut state = self.state();
        state.check("create_thread")?;
        state.calls.push(ApiCall::CreateThread { channel, message_id, name: name.to_owned() });
        Ok(ChannelId(state.allocate()))
    }
}

/// Ticket settings with no delays so close flows finish immediately.
pub fn tickets_config(assets_dir: &std::path::Path) -> TicketsConfig {
    let mut tickets = AppConfig::default().tickets;
    tickets.close_delay_secs = 0;
    tickets.emoji_upload_pause_ms = 0;
    tickets.assets_dir = assets_dir.to_path_buf();
    tickets
}

pub fn context(api: Arc<RecordingDiscordApi>, stores: Stores, tickets: TicketsConfig) -> BotContext {
    BotContext::new(api, stores, EmojiRegistry::default(), tickets)
}

pub fn actor(user_id: u64, name: &str) -> Actor {
    Actor {
        user_id: UserId(user_id),
        name: name.to_owned(),
        avatar_url: None,
        roles: Vec::new(),
        is_admin: false,
    }
}

pub fn staff(user_id: u64, name: &str, role: RoleId) -> Actor {
    Actor { roles: vec![role], ..actor(user_id, name) }
}

pub fn admin(user_id: u64, name: &str) -> Actor {
    Actor { is_admin: true, ..actor(user_id, name) }
}

pub fn interaction(id: u64) -> InteractionRef {
    InteractionRef { id, token: format!("token-{id}") }
}

pub fn component(
    interaction_id: u64,
    channel: ChannelId,
    message: MessageId,
    actor: Actor,
    custom_id: impl Into<String>,
) -> ComponentEvent {
    ComponentEvent {
        interaction: interaction(interaction_id),
        guild_id: Some(GUILD),
        channel_id: channel,
        message_id: message,
        actor,
        custom_id: custom_id.into(),
        values: Vec::new(),
    }
}

pub fn slash_command(interaction_id: u64, channel: ChannelId, actor: Actor, command: &str) -> SlashCommandEvent {
    SlashCommandEvent {
        interaction: interaction(interaction_id),
        guild_id: Some(GUILD),
        channel_id: channel,
        actor,
        command: command.to_owned(),
    }
}
