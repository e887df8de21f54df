//! Serenity gateway adapter.
//!
//! Serenity owns the websocket and its reconnects; this module turns its events
//! into [`GatewayEnvelope`]s and hands them to the `zen-discord` runner through a
//! channel.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serenity::all::{
    ActionRowComponent, Command, CommandInteraction, ComponentInteraction,
    ComponentInteractionDataKind, ConnectionStage, Context, CreateCommand,
    EventHandler as SerenityEventHandler, GatewayIntents, GuildId as SerenityGuildId, Http,
    Interaction, Member, Message, ModalInteraction, Permissions, Ready, ResumedEvent,
    ShardStageUpdateEvent, User,
};
use tokio::sync::{mpsc, watch, Mutex};
use tracing::{info, warn};

use zen_core::domain::ids::{ChannelId, GuildId, MessageId, RoleId, UserId};
use zen_discord::api::InteractionRef;
use zen_discord::commands::command_definitions;
use zen_discord::events::{
    Actor, ComponentEvent, GatewayEnvelope, GatewayEvent, MessageCreateEvent, ModalSubmitEvent,
    SlashCommandEvent,
};
use zen_discord::gateway::{GatewayTransport, TransportError};

use crate::status::BotStatus;

pub fn intents() -> GatewayIntents {
    GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MEMBERS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::DIRECT_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT
}

/// Builds the forwarding handler and the transport that drains it.
pub fn channel_transport(
    guild_id: Option<GuildId>,
    status: Arc<BotStatus>,
    shutdown: watch::Receiver<bool>,
) -> (ForwardingHandler, ChannelTransport) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (
        ForwardingHandler { sender, guild_id, status },
        ChannelTransport { receiver: Mutex::new(receiver), shutdown },
    )
}

pub struct ForwardingHandler {
    sender: mpsc::UnboundedSender<GatewayEnvelope>,
    guild_id: Option<GuildId>,
    status: Arc<BotStatus>,
}

impl ForwardingHandler {
    fn forward(&self, envelope_id: String, event: GatewayEvent) {
        if self.sender.send(GatewayEnvelope { envelope_id, event }).is_err() {
            warn!(event_name = "ingress.discord.dropped", "gateway runner stopped; event dropped");
        }
    }
}

#[async_trait]
impl SerenityEventHandler for ForwardingHandler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        self.status.mark_ready(&ready.user.name, ready.guilds.len());
        info!(
            event_name = "system.discord.ready",
            correlation_id = "bootstrap",
            user = %ready.user.name,
            guilds = ready.guilds.len(),
            "logged in"
        );

        match register_commands(&ctx.http, self.guild_id).await {
            Ok(count) => info!(
                event_name = "system.discord.commands_registered",
                correlation_id = "bootstrap",
                count,
                scope = if self.guild_id.is_some() { "guild" } else { "global" },
                "slash commands synced"
            ),
            Err(error) => warn!(
                event_name = "system.discord.commands_failed",
                correlation_id = "bootstrap",
                error = %error,
                "could not register slash commands"
            ),
        }
    }

    async fn resume(&self, _ctx: Context, _event: ResumedEvent) {
        self.status.set_connected(true);
        info!(event_name = "system.discord.resumed", "gateway session resumed");
    }

    async fn shard_stage_update(&self, _ctx: Context, event: ShardStageUpdateEvent) {
        self.status.set_connected(event.new == ConnectionStage::Connected);
        if event.new != ConnectionStage::Connected {
            info!(
                event_name = "system.discord.stage",
                shard = event.shard_id.0,
                stage = %event.new,
                "gateway shard changed stage"
            );
        }
    }

    async fn interaction_create(&self, _ctx: Context, interaction: Interaction) {
        let envelope_id = format!("interaction-{}", interaction.id().get());
        if let Some(event) = interaction_event(&interaction) {
            self.forward(envelope_id, event);
        }
    }

    async fn message(&self, _ctx: Context, message: Message) {
        // Only attachments matter; image collection is the sole consumer.
        if message.author.bot || message.attachments.is_empty() {
            return;
        }
        self.forward(format!("message-{}", message.id.get()), message_event(&message));
    }
}

/// Drains the forwarding channel until shutdown is signalled.
pub struct ChannelTransport {
    receiver: Mutex<mpsc::UnboundedReceiver<GatewayEnvelope>>,
    shutdown: watch::Receiver<bool>,
}

#[async_trait]
impl GatewayTransport for ChannelTransport {
    async fn connect(&self) -> Result<(), TransportError> {
        Ok(())
    }

    async fn next_envelope(&self) -> Result<Option<GatewayEnvelope>, TransportError> {
        let mut shutdown = self.shutdown.clone();
        if *shutdown.borrow() {
            return Ok(None);
        }
        let mut receiver = self.receiver.lock().await;
        tokio::select! {
            envelope = receiver.recv() => Ok(envelope),
            _ = shutdown.changed() => Ok(None),
        }
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        self.receiver.lock().await.close();
        Ok(())
    }
}

pub fn create_commands() -> Vec<CreateCommand> {
    command_definitions()
        .into_iter()
        .map(|definition| {
            let command = CreateCommand::new(definition.name)
                .description(definition.description)
                .dm_permission(false);
            if definition.admin_only {
                command.default_member_permissions(Permissions::ADMINISTRATOR)
            } else {
                command
            }
        })
        .collect()
}

pub async fn register_commands(
    http: &Http,
    guild_id: Option<GuildId>,
) -> Result<usize, serenity::Error> {
    let commands = create_commands();
    let registered = match guild_id {
        Some(guild) => SerenityGuildId::new(guild.get()).set_commands(http, commands).await?,
        None => Command::set_global_commands(http, commands).await?,
    };
    Ok(registered.len())
}

fn interaction_event(interaction: &Interaction) -> Option<GatewayEvent> {
    match interaction {
        Interaction::Command(command) => Some(GatewayEvent::SlashCommand(command_event(command))),
        Interaction::Component(component) => {
            Some(GatewayEvent::Component(component_event(component)))
        }
        Interaction::Modal(modal) => Some(GatewayEvent::ModalSubmit(modal_event(modal))),
        _ => None,
    }
}

fn actor(user: &User, member: Option<&Member>) -> Actor {
    Actor {
        user_id: UserId(user.id.get()),
        name: user.name.clone(),
        avatar_url: Some(member.map_or_else(|| user.face(), Member::face)),
        roles: member
            .map(|member| member.roles.iter().map(|role| RoleId(role.get())).collect())
            .unwrap_or_default(),
        is_admin: member
            .and_then(|member| member.permissions)
            .is_some_and(|permissions| permissions.administrator()),
    }
}

fn command_event(command: &CommandInteraction) -> SlashCommandEvent {
    SlashCommandEvent {
        interaction: InteractionRef { id: command.id.get(), token: command.token.clone() },
        guild_id: command.guild_id.map(|guild| GuildId(guild.get())),
        channel_id: ChannelId(command.channel_id.get()),
        actor: actor(&command.user, command.member.as_deref()),
        command: command.data.name.clone(),
    }
}

fn component_event(component: &ComponentInteraction) -> ComponentEvent {
    let values = match &component.data.kind {
        ComponentInteractionDataKind::StringSelect { values } => values.clone(),
        ComponentInteractionDataKind::RoleSelect { values } => {
            values.iter().map(|role| role.get().to_string()).collect()
        }
        ComponentInteractionDataKind::ChannelSelect { values } => {
            values.iter().map(|channel| channel.get().to_string()).collect()
        }
        ComponentInteractionDataKind::UserSelect { values } => {
            values.iter().map(|user| user.get().to_string()).collect()
        }
        _ => Vec::new(),
    };
    ComponentEvent {
        interaction: InteractionRef { id: component.id.get(), token: component.token.clone() },
        guild_id: component.guild_id.map(|guild| GuildId(guild.get())),
        channel_id: ChannelId(component.channel_id.get()),
        message_id: MessageId(component.message.id.get()),
        actor: actor(&component.user, component.member.as_ref()),
        custom_id: component.data.custom_id.clone(),
        values,
    }
}

fn modal_event(modal: &ModalInteraction) -> ModalSubmitEvent {
    let fields: BTreeMap<String, String> = modal
        .data
        .components
        .iter()
        .flat_map(|row| row.components.iter())
        .filter_map(|component| match component {
            ActionRowComponent::InputText(input) => {
                Some((input.custom_id.clone(), input.value.clone().unwrap_or_default()))
            }
            _ => None,
        })
        .collect();
    ModalSubmitEvent {
        interaction: InteractionRef { id: modal.id.get(), token: modal.token.clone() },
        guild_id: modal.guild_id.map(|guild| GuildId(guild.get())),
        channel_id: ChannelId(modal.channel_id.get()),
        message_id: modal.message.as_ref().map(|message| MessageId(message.id.get())),
        actor: actor(&modal.user, modal.member.as_ref()),
        custom_id: modal.data.custom_id.clone(),
        fields,
    }
}

fn message_event(message: &Message) -> GatewayEvent {
    GatewayEvent::MessageCreate(MessageCreateEvent {
        channel_id: ChannelId(message.channel_id.get()),
        author_id: UserId(message.author.id.get()),
        author_is_bot: message.author.bot,
        attachments: message.attachments.iter().map(|attachment| attachment.url.clone()).collect(),
    })
}
