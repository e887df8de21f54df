use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};

use zen_core::domain::ids::{ChannelId, GuildId, MessageId, RoleId, UserId};
use zen_core::errors::InteractionError;

use crate::api::{ApiError, DiscordApi, InteractionRef, InteractionReply};
use crate::commands::CommandRouter;
use crate::components::MessageTemplate;
use crate::custom_ids::{ComponentAction, FeedbackControl, ModalAction};
use crate::errors::{ServiceError, ServiceResult};
use crate::feedback::FeedbackService;
use crate::tickets::TicketService;
use crate::wizard::{WizardOutcome, WizardService};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GatewayEnvelope {
    pub envelope_id: String,
    pub event: GatewayEvent,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GatewayEvent {
    SlashCommand(SlashCommandEvent),
    Component(ComponentEvent),
    ModalSubmit(ModalSubmitEvent),
    MessageCreate(MessageCreateEvent),
    Unsupported { event_type: String },
}

impl GatewayEvent {
    pub fn event_type(&self) -> GatewayEventType {
        match self {
            Self::SlashCommand(_) => GatewayEventType::SlashCommand,
            Self::Component(_) => GatewayEventType::Component,
            Self::ModalSubmit(_) => GatewayEventType::ModalSubmit,
            Self::MessageCreate(_) => GatewayEventType::MessageCreate,
            Self::Unsupported { .. } => GatewayEventType::Unsupported,
        }
    }

    pub fn channel_id(&self) -> Option<ChannelId> {
        match self {
            Self::SlashCommand(event) => Some(event.channel_id),
            Self::Component(event) => Some(event.channel_id),
            Self::ModalSubmit(event) => Some(event.channel_id),
            Self::MessageCreate(event) => Some(event.channel_id),
            Self::Unsupported { .. } => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GatewayEventType {
    SlashCommand,
    Component,
    ModalSubmit,
    MessageCreate,
    Unsupported,
}

/// The member (or DM user) behind an interaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Actor {
    pub user_id: UserId,
    pub name: String,
    pub avatar_url: Option<String>,
    pub roles: Vec<RoleId>,
    pub is_admin: bool,
}

impl Actor {
    pub fn has_role(&self, role: RoleId) -> bool {
        self.roles.contains(&role)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlashCommandEvent {
    pub interaction: InteractionRef,
    pub guild_id: Option<GuildId>,
    pub channel_id: ChannelId,
    pub actor: Actor,
    pub command: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComponentEvent {
    pub interaction: InteractionRef,
    pub guild_id: Option<GuildId>,
    pub channel_id: ChannelId,
    pub message_id: MessageId,
    pub actor: Actor,
    pub custom_id: String,
    /// Selected ids for select menus; empty for buttons.
    pub values: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModalSubmitEvent {
    pub interaction: InteractionRef,
    pub guild_id: Option<GuildId>,
    pub channel_id: ChannelId,
    pub message_id: Option<MessageId>,
    pub actor: Actor,
    pub custom_id: String,
    pub fields: BTreeMap<String, String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageCreateEvent {
    pub channel_id: ChannelId,
    pub author_id: UserId,
    pub author_is_bot: bool,
    pub attachments: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventContext {
    pub correlation_id: String,
}

impl Default for EventContext {
    fn default() -> Self {
        Self { correlation_id: "unknown-correlation-id".to_owned() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HandlerResult {
    Processed,
    /// The user was shown a rejection and nothing changed.
    Rejected(InteractionError),
    Ignored,
}

#[derive(Debug, Error)]
pub enum EventHandlerError {
    #[error(transparent)]
    Service(#[from] ServiceError),
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Handler(#[from] EventHandlerError),
}

#[async_trait]
pub trait EventHandler: Send + Sync {
    fn event_type(&self) -> GatewayEventType;
    async fn handle(
        &self,
        envelope: &GatewayEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError>;
}

#[derive(Default)]
pub struct EventDispatcher {
    handlers: HashMap<GatewayEventType, Arc<dyn EventHandler>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<H>(&mut self, handler: H)
    where
        H: EventHandler + 'static,
    {
        self.handlers.insert(handler.event_type(), Arc::new(handler));
    }

    pub async fn dispatch(
        &self,
        envelope: &GatewayEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, DispatchError> {
        let Some(handler) = self.handlers.get(&envelope.event.event_type()) else {
            return Ok(HandlerResult::Ignored);
        };

        handler.handle(envelope, ctx).await.map_err(DispatchError::from)
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

/// Shows `error` to the user, falling back to a follow-up when the interaction was
/// already acknowledged.
pub async fn reply_with_error(
    api: &dyn DiscordApi,
    interaction: &InteractionRef,
    error: &InteractionError,
) {
    let text = error.user_message();
    match api.respond(interaction, InteractionReply::ephemeral_text(text.clone())).await {
        Ok(()) => {}
        Err(ApiError::AlreadyAcknowledged) => {
            if let Err(followup_error) =
                api.followup(interaction, MessageTemplate::text(text), true).await
            {
                warn!(error = %followup_error, "could not deliver error follow-up");
            }
        }
        Err(respond_error) => warn!(error = %respond_error, "could not deliver error reply"),
    }
}

async fn settle(
    api: &dyn DiscordApi,
    interaction: &InteractionRef,
    ctx: &EventContext,
    outcome: ServiceResult<bool>,
) -> Result<HandlerResult, EventHandlerError> {
    match outcome {
        Ok(true) => Ok(HandlerResult::Processed),
        Ok(false) => Ok(HandlerResult::Ignored),
        Err(ServiceError::Rejected(error)) => {
            info!(
                event_name = "interaction.rejected",
                correlation_id = %ctx.correlation_id,
                kind = error.kind(),
                reason = %error,
                "interaction rejected"
            );
            reply_with_error(api, interaction, &error).await;
            Ok(HandlerResult::Rejected(error))
        }
        Err(error) => {
            reply_with_error(api, interaction, &error.to_interaction_error()).await;
            Err(error.into())
        }
    }
}

pub struct SlashCommandHandler {
    router: CommandRouter,
    api: Arc<dyn DiscordApi>,
}

impl SlashCommandHandler {
    pub fn new(router: CommandRouter, api: Arc<dyn DiscordApi>) -> Self {
        Self { router, api }
    }
}

#[async_trait]
impl EventHandler for SlashCommandHandler {
    fn event_type(&self) -> GatewayEventType {
        GatewayEventType::SlashCommand
    }

    async fn handle(
        &self,
        envelope: &GatewayEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let GatewayEvent::SlashCommand(event) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };

        let outcome = self.router.route(event).await;
        settle(self.api.as_ref(), &event.interaction, ctx, outcome).await
    }
}

pub struct ComponentHandler {
    tickets: Arc<TicketService>,
    wizard: Arc<WizardService>,
    feedback: FeedbackService,
    api: Arc<dyn DiscordApi>,
}

impl ComponentHandler {
    pub fn new(
        tickets: Arc<TicketService>,
        wizard: Arc<WizardService>,
        feedback: FeedbackService,
        api: Arc<dyn DiscordApi>,
    ) -> Self {
        Self { tickets, wizard, feedback, api }
    }

    async fn route(&self, action: ComponentAction, event: &ComponentEvent) -> ServiceResult<bool> {
        match action {
            ComponentAction::OpenTicket => self.tickets.open(event).await.map(|_| true),
            ComponentAction::ClaimTicket => {
                self.tickets.claim(event).await.map(|report| report.is_some())
            }
            ComponentAction::CloseTicket => {
                self.tickets.close(event).await.map(|report| report.is_some())
            }
            ComponentAction::TicketInfo => self.tickets.info(event).await.map(|_| true),
            ComponentAction::Wizard { session, step } => self
                .wizard
                .handle(event, &session, step)
                .await
                .map(|outcome| outcome != WizardOutcome::Ignored),
            ComponentAction::Feedback { session, control } => match control {
                FeedbackControl::Star(value) => self.feedback.rate(event, &session, value).await,
                FeedbackControl::Comment => self.feedback.open_comment_form(event, &session).await,
                FeedbackControl::Images => {
                    self.feedback.request_images(event, &session).await.map(|task| task.is_some())
                }
                FeedbackControl::Finish => {
                    self.feedback.finish(event, &session).await.map(|report| report.is_some())
                }
            },
        }
    }
}

#[async_trait]
impl EventHandler for ComponentHandler {
    fn event_type(&self) -> GatewayEventType {
        GatewayEventType::Component
    }

    async fn handle(
        &self,
        envelope: &GatewayEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let GatewayEvent::Component(event) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };
        let Some(action) = ComponentAction::parse(&event.custom_id) else {
            return Ok(HandlerResult::Ignored);
        };

        let outcome = self.route(action, event).await;
        settle(self.api.as_ref(), &event.interaction, ctx, outcome).await
    }
}

pub struct ModalSubmitHandler {
    feedback: FeedbackService,
    api: Arc<dyn DiscordApi>,
}

impl ModalSubmitHandler {
    pub fn new(feedback: FeedbackService, api: Arc<dyn DiscordApi>) -> Self {
        Self { feedback, api }
    }
}

#[async_trait]
impl EventHandler for ModalSubmitHandler {
    fn event_type(&self) -> GatewayEventType {
        GatewayEventType::ModalSubmit
    }

    async fn handle(
        &self,
        envelope: &GatewayEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let GatewayEvent::ModalSubmit(event) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };
        let Some(ModalAction::FeedbackComment { session }) = ModalAction::parse(&event.custom_id)
        else {
            return Ok(HandlerResult::Ignored);
        };

        let outcome = self.feedback.submit_comment(event, &session).await;
        settle(self.api.as_ref(), &event.interaction, ctx, outcome).await
    }
}

/// Feeds user messages with attachments to pending image requests.
pub struct MessageCreateHandler {
    feedback: FeedbackService,
}

impl MessageCreateHandler {
    pub fn new(feedback: FeedbackService) -> Self {
        Self { feedback }
    }
}

#[async_trait]
impl EventHandler for MessageCreateHandler {
    fn event_type(&self) -> GatewayEventType {
        GatewayEventType::MessageCreate
    }

    async fn handle(
        &self,
        envelope: &GatewayEnvelope,
        _ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let GatewayEvent::MessageCreate(event) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };
        if event.author_is_bot || event.attachments.is_empty() {
            return Ok(HandlerResult::Ignored);
        }

        Ok(if self.feedback.accept_attachments(event).await {
            HandlerResult::Processed
        } else {
            HandlerResult::Ignored
        })
    }
}
