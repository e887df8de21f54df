//! `DiscordApi` over serenity's REST client.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serenity::all::{
    AutoArchiveDuration, Channel, ChannelId as SerenityChannelId, ChannelType, CreateAttachment,
    CreateChannel, CreateInteractionResponse, CreateInteractionResponseMessage, CreateThread,
    EditChannel, GetMessages, GuildChannel, GuildId as SerenityGuildId, Http, InteractionId,
    Message, MessageId as SerenityMessageId, PermissionOverwrite, PermissionOverwriteType,
    Permissions, RoleId as SerenityRoleId, UserId as SerenityUserId,
};
use serenity::builder::Builder;
use serenity::http::HttpError;

use zen_core::domain::ids::{ChannelId, EmojiId, GuildId, MessageId, RoleId, UserId};
use zen_core::emojis::EmojiRef;
use zen_discord::api::{
    ApiError, ChannelAccess, ChannelInfo, DiscordApi, GuildProfile, HistoryMessage,
    InteractionRef, InteractionReply, MemberInfo, NewTextChannel,
};
use zen_discord::components::{
    ChannelKind, Colour, Embed, EmbedAuthor, EmbedField, EmbedFooter, MessageTemplate,
};

use crate::render;

const INTERACTION_ALREADY_ACKNOWLEDGED: isize = 40060;
const HISTORY_PAGE: u16 = 100;

pub struct SerenityApi {
    http: Arc<Http>,
}

impl SerenityApi {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }

    fn http(&self) -> &Http {
        &self.http
    }
}

fn api_error(error: serenity::Error) -> ApiError {
    if let serenity::Error::Http(HttpError::UnsuccessfulRequest(response)) = &error {
        if response.error.code == INTERACTION_ALREADY_ACKNOWLEDGED {
            return ApiError::AlreadyAcknowledged;
        }
        match response.status_code.as_u16() {
            404 => return ApiError::NotFound(response.error.message.clone()),
            403 => return ApiError::Forbidden(response.error.message.clone()),
            _ => {}
        }
    }
    ApiError::Request(error.to_string())
}

/// Maps a 404 to `None`.
fn optional<T>(result: Result<T, serenity::Error>) -> Result<Option<T>, ApiError> {
    match result.map_err(api_error) {
        Ok(value) => Ok(Some(value)),
        Err(ApiError::NotFound(_)) => Ok(None),
        Err(error) => Err(error),
    }
}

fn channel_info(channel: &GuildChannel) -> ChannelInfo {
    let kind = match channel.kind {
        ChannelType::Text => ChannelKind::Text,
        ChannelType::Category => ChannelKind::Category,
        _ => ChannelKind::Other,
    };
    ChannelInfo {
        id: ChannelId(channel.id.get()),
        name: channel.name.clone(),
        kind,
        parent_id: channel.parent_id.map(|parent| ChannelId(parent.get())),
        topic: channel.topic.clone(),
    }
}

fn overwrite(guild: SerenityGuildId, access: ChannelAccess) -> PermissionOverwrite {
    let participant = Permissions::VIEW_CHANNEL
        | Permissions::SEND_MESSAGES
        | Permissions::ATTACH_FILES
        | Permissions::READ_MESSAGE_HISTORY;
    match access {
        // The @everyone role shares the guild's id.
        ChannelAccess::HideFromEveryone => PermissionOverwrite {
            allow: Permissions::empty(),
            deny: Permissions::VIEW_CHANNEL,
            kind: PermissionOverwriteType::Role(SerenityRoleId::new(guild.get())),
        },
        ChannelAccess::Requester(user) => PermissionOverwrite {
            allow: participant,
            deny: Permissions::empty(),
            kind: PermissionOverwriteType::Member(SerenityUserId::new(user.get())),
        },
        ChannelAccess::Staff(role) => PermissionOverwrite {
            allow: participant,
            deny: Permissions::empty(),
            kind: PermissionOverwriteType::Role(SerenityRoleId::new(role.get())),
        },
    }
}

fn overwrites(guild: SerenityGuildId, access: &[ChannelAccess]) -> Vec<PermissionOverwrite> {
    access.iter().map(|access| overwrite(guild, *access)).collect()
}

fn history_message(message: &Message) -> HistoryMessage {
    HistoryMessage {
        id: MessageId(message.id.get()),
        author_id: UserId(message.author.id.get()),
        author_name: message.author.name.clone(),
        author_avatar: message.author.avatar_url(),
        author_is_bot: message.author.bot,
        content: message.content.clone(),
        embeds: message.embeds.iter().map(embed_from).collect(),
        attachments: message.attachments.iter().map(|attachment| attachment.url.clone()).collect(),
        timestamp: DateTime::from_timestamp(message.timestamp.unix_timestamp(), 0)
            .unwrap_or_else(Utc::now),
    }
}

fn embed_from(source: &serenity::all::Embed) -> Embed {
    Embed {
        title: source.title.clone(),
        description: source.description.clone(),
        colour: source.colour.map(|colour| Colour(colour.0)),
        author: source.author.as_ref().map(|author| EmbedAuthor {
            name: author.name.clone(),
            icon_url: author.icon_url.clone(),
        }),
        fields: source
            .fields
            .iter()
            .map(|field| EmbedField {
                name: field.name.clone(),
                value: field.value.clone(),
                inline: field.inline,
            })
            .collect(),
        footer: source.footer.as_ref().map(|footer| EmbedFooter {
            text: footer.text.clone(),
            icon_url: footer.icon_url.clone(),
        }),
        thumbnail_url: source.thumbnail.as_ref().map(|thumbnail| thumbnail.url.clone()),
        image_url: source.image.as_ref().map(|image| image.url.clone()),
    }
}

fn archive_duration(minutes: u16) -> AutoArchiveDuration {
    match minutes {
        0..=60 => AutoArchiveDuration::OneHour,
        61..=1440 => AutoArchiveDuration::OneDay,
        1441..=4320 => AutoArchiveDuration::ThreeDays,
        _ => AutoArchiveDuration::OneWeek,
    }
}

#[async_trait]
impl DiscordApi for SerenityApi {
    async fn respond(
        &self,
        interaction: &InteractionRef,
        reply: InteractionReply,
    ) -> Result<(), ApiError> {
        let response = match reply {
            InteractionReply::Message { message, ephemeral } => {
                CreateInteractionResponse::Message(render::interaction_message(message, ephemeral))
            }
            InteractionReply::UpdateMessage(message) => {
                CreateInteractionResponse::UpdateMessage(render::interaction_message(message, false))
            }
            InteractionReply::Modal(modal) => CreateInteractionResponse::Modal(render::modal(modal)),
            InteractionReply::Defer { ephemeral } => CreateInteractionResponse::Defer(
                CreateInteractionResponseMessage::new().ephemeral(ephemeral),
            ),
            InteractionReply::DeferUpdate => CreateInteractionResponse::Acknowledge,
        };
        response
            .execute(self.http(), (InteractionId::new(interaction.id), interaction.token.as_str()))
            .await
            .map_err(api_error)
    }

    async fn followup(
        &self,
        interaction: &InteractionRef,
        message: MessageTemplate,
        ephemeral: bool,
    ) -> Result<MessageId, ApiError> {
        let sent = render::followup(message, ephemeral)
            .execute(self.http(), (None, interaction.token.as_str()))
            .await
            .map_err(api_error)?;
        Ok(MessageId(sent.id.get()))
    }

    async fn edit_original(
        &self,
        interaction: &InteractionRef,
        message: MessageTemplate,
    ) -> Result<(), ApiError> {
        render::edit_response(message)
            .execute(self.http(), interaction.token.as_str())
            .await
            .map(|_| ())
            .map_err(api_error)
    }

    async fn guild(&self, guild: GuildId) -> Result<GuildProfile, ApiError> {
        let partial =
            SerenityGuildId::new(guild.get()).to_partial_guild(self.http()).await.map_err(api_error)?;
        Ok(GuildProfile { id: guild, name: partial.name.clone(), icon_url: partial.icon_url() })
    }

    async fn role_exists(&self, guild: GuildId, role: RoleId) -> Result<bool, ApiError> {
        let roles = SerenityGuildId::new(guild.get()).roles(self.http()).await.map_err(api_error)?;
        Ok(roles.contains_key(&SerenityRoleId::new(role.get())))
    }

    async fn channel(&self, channel: ChannelId) -> Result<Option<ChannelInfo>, ApiError> {
        let found = optional(SerenityChannelId::new(channel.get()).to_channel(self.http()).await)?;
        Ok(found.map(|channel| match channel {
            Channel::Guild(guild_channel) => channel_info(&guild_channel),
            other => ChannelInfo {
                id: ChannelId(other.id().get()),
                name: String::new(),
                kind: ChannelKind::Other,
                parent_id: None,
                topic: None,
            },
        }))
    }

    async fn guild_channels(&self, guild: GuildId) -> Result<Vec<ChannelInfo>, ApiError> {
        let channels =
            SerenityGuildId::new(guild.get()).channels(self.http()).await.map_err(api_error)?;
        let mut infos: Vec<ChannelInfo> = channels.values().map(channel_info).collect();
        infos.sort_by_key(|info| info.id);
        Ok(infos)
    }

    async fn create_text_channel(
        &self,
        guild: GuildId,
        request: NewTextChannel,
    ) -> Result<ChannelInfo, ApiError> {
        let guild = SerenityGuildId::new(guild.get());
        let overwrites = overwrites(guild, &request.access);
        let builder = CreateChannel::new(request.name)
            .kind(ChannelType::Text)
            .category(SerenityChannelId::new(request.category.get()))
            .topic(request.topic)
            .permissions(overwrites);
        let created = guild.create_channel(self.http(), builder).await.map_err(api_error)?;
        Ok(channel_info(&created))
    }

    async fn move_channel(&self, channel: ChannelId, category: ChannelId) -> Result<(), ApiError> {
        let edit = EditChannel::new().category(Some(SerenityChannelId::new(category.get())));
        SerenityChannelId::new(channel.get())
            .edit(self.http(), edit)
            .await
            .map(|_| ())
            .map_err(api_error)
    }

    async fn delete_channel(&self, channel: ChannelId) -> Result<(), ApiError> {
        SerenityChannelId::new(channel.get()).delete(self.http()).await.map(|_| ()).map_err(api_error)
    }

    async fn send_message(
        &self,
        channel: ChannelId,
        message: MessageTemplate,
    ) -> Result<MessageId, ApiError> {
        let sent = SerenityChannelId::new(channel.get())
            .send_message(self.http(), render::create_message(message))
            .await
            .map_err(api_error)?;
        Ok(MessageId(sent.id.get()))
    }

    async fn edit_message(
        &self,
        channel: ChannelId,
        message_id: MessageId,
        message: MessageTemplate,
    ) -> Result<(), ApiError> {
        SerenityChannelId::new(channel.get())
            .edit_message(
                self.http(),
                SerenityMessageId::new(message_id.get()),
                render::edit_message(message),
            )
            .await
            .map(|_| ())
            .map_err(api_error)
    }

    async fn history(
        &self,
        channel: ChannelId,
        limit: Option<u16>,
    ) -> Result<Vec<HistoryMessage>, ApiError> {
        let channel = SerenityChannelId::new(channel.get());
        let mut collected: Vec<Message> = Vec::new();
        let mut before: Option<SerenityMessageId> = None;

        loop {
            let wanted = match limit {
                Some(limit) => limit.saturating_sub(collected.len() as u16).min(HISTORY_PAGE),
                None => HISTORY_PAGE,
            };
            if wanted == 0 {
                break;
            }

            let mut request = GetMessages::new().limit(wanted as u8);
            if let Some(cursor) = before {
                request = request.before(cursor);
            }
            let page = channel.messages(self.http(), request).await.map_err(api_error)?;
            let exhausted = page.len() < usize::from(wanted);
            before = page.last().map(|message| message.id);
            collected.extend(page);
            if exhausted || before.is_none() {
                break;
            }
        }

        // Pages arrive newest first.
        Ok(collected.iter().rev().map(history_message).collect())
    }

    async fn member(&self, guild: GuildId, user: UserId) -> Result<Option<MemberInfo>, ApiError> {
        let member = optional(
            SerenityGuildId::new(guild.get())
                .member(self.http(), SerenityUserId::new(user.get()))
                .await,
        )?;
        Ok(member.map(|member| MemberInfo {
            user_id: user,
            name: member.display_name().to_owned(),
            avatar_url: Some(member.face()),
            roles: member.roles.iter().map(|role| RoleId(role.get())).collect(),
        }))
    }

    async fn send_dm(&self, user: UserId, message: MessageTemplate) -> Result<MessageId, ApiError> {
        let sent = SerenityUserId::new(user.get())
            .direct_message(self.http(), render::create_message(message))
            .await
            .map_err(api_error)?;
        Ok(MessageId(sent.id.get()))
    }

    async fn guild_emojis(&self, guild: GuildId) -> Result<Vec<EmojiId>, ApiError> {
        let emojis = SerenityGuildId::new(guild.get()).emojis(self.http()).await.map_err(api_error)?;
        Ok(emojis.iter().map(|emoji| EmojiId(emoji.id.get())).collect())
    }

    async fn create_emoji(
        &self,
        guild: GuildId,
        name: &str,
        file_name: &str,
        image: Vec<u8>,
    ) -> Result<EmojiRef, ApiError> {
        let encoded = CreateAttachment::bytes(image, file_name).to_base64();
        let emoji = SerenityGuildId::new(guild.get())
            .create_emoji(self.http(), name, &encoded)
            .await
            .map_err(api_error)?;
        Ok(EmojiRef::Custom { name: emoji.name.clone(), id: EmojiId(emoji.id.get()), animated: emoji.animated })
    }

    async fn create_thread(
        &self,
        channel: ChannelId,
        message_id: MessageId,
        name: &str,
        auto_archive_minutes: u16,
    ) -> Result<ChannelId, ApiError> {
        let thread = SerenityChannelId::new(channel.get())
            .create_thread_from_message(
                self.http(),
                SerenityMessageId::new(message_id.get()),
                CreateThread::new(name).auto_archive_duration(archive_duration(auto_archive_minutes)),
            )
            .await
            .map_err(api_error)?;
        Ok(ChannelId(thread.id.get()))
    }
}

#[cfg(test)]
mod tests {
    use serenity::all::{AutoArchiveDuration, GuildId, PermissionOverwriteType, Permissions};
    use zen_core::domain::ids::{RoleId, UserId};
    use zen_discord::api::ChannelAccess;

    use super::{archive_duration, overwrite, overwrites};

    #[test]
    fn everyone_is_denied_and_participants_may_talk() {
        let guild = GuildId::new(77);

        let hidden = overwrite(guild, ChannelAccess::HideFromEveryone);
        assert_eq!(hidden.deny, Permissions::VIEW_CHANNEL);
        assert!(matches!(hidden.kind, PermissionOverwriteType::Role(role) if role.get() == 77));

        let requester = overwrite(guild, ChannelAccess::Requester(UserId(5)));
        assert!(requester.allow.contains(Permissions::SEND_MESSAGES | Permissions::VIEW_CHANNEL));
        assert!(matches!(requester.kind, PermissionOverwriteType::Member(user) if user.get() == 5));

        let staff = overwrite(guild, ChannelAccess::Staff(RoleId(9)));
        assert!(staff.allow.contains(Permissions::READ_MESSAGE_HISTORY));
        assert!(matches!(staff.kind, PermissionOverwriteType::Role(role) if role.get() == 9));
    }

    #[test]
    fn ticket_channels_get_one_overwrite_per_access_entry() {
        let guild = GuildId::new(77);
        let access = [
            ChannelAccess::HideFromEveryone,
            ChannelAccess::Requester(UserId(5)),
            ChannelAccess::Staff(RoleId(9)),
        ];

        let built = overwrites(guild, &access);

        assert_eq!(built.len(), 3);
        assert!(matches!(built[0].kind, PermissionOverwriteType::Role(role) if role.get() == 77));
        assert!(matches!(built[1].kind, PermissionOverwriteType::Member(user) if user.get() == 5));
        assert!(matches!(built[2].kind, PermissionOverwriteType::Role(role) if role.get() == 9));
        assert!(overwrites(guild, &[]).is_empty());
    }

    #[test]
    fn review_threads_archive_after_a_day() {
        assert_eq!(archive_duration(1440), AutoArchiveDuration::OneDay);
        assert_eq!(archive_duration(60), AutoArchiveDuration::OneHour);
        assert_eq!(archive_duration(20_000), AutoArchiveDuration::OneWeek);
    }
}
