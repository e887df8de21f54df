use chrono::Utc;
use tracing::{info, warn};

use zen_core::domain::ids::{ChannelId, GuildId, MessageId, UserId};
use zen_core::domain::settings::GuildSettings;
use zen_core::domain::ticket::{
    channel_name, channel_topic, parse_topic, topic_mentions_owner, StaffRef, Ticket, TicketNumber,
    TicketStatus,
};
use zen_core::errors::{DomainError, InteractionError};
use zen_core::flows::feedback::FeedbackSession;
use zen_core::flows::ticket::{self, TicketEvent};
use zen_core::transcript::{Transcript, TranscriptMessage, TranscriptRenderer};

use crate::api::{
    ChannelAccess, GuildProfile, HistoryMessage, InteractionReply, MemberInfo, NewTextChannel,
};
use crate::components::{ChannelKind, Embed, FileUpload};
use crate::context::BotContext;
use crate::errors::ServiceResult;
use crate::events::{Actor, ComponentEvent, SlashCommandEvent};
use crate::feedback::FeedbackService;
use crate::outcome::StepOutcome;
use crate::views::{self, CLAIMED_BY_FIELD};

/// Field name older welcome messages used for the claim marker.
const LEGACY_CLAIMED_BY_FIELD: &str = "Ticket Assumido Por";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CloseStep {
    Transcript,
    OwnerLookup,
    Archive,
    DirectMessage,
    Record,
    Announcement,
    ChannelDelete,
}

impl CloseStep {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Transcript => "transcript",
            Self::OwnerLookup => "owner_lookup",
            Self::Archive => "archive",
            Self::DirectMessage => "direct_message",
            Self::Record => "record",
            Self::Announcement => "announcement",
            Self::ChannelDelete => "channel_delete",
        }
    }
}

/// What happened to each side effect of a close; failures never stop later steps.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CloseReport {
    pub channel_id: ChannelId,
    pub handler: String,
    pub steps: Vec<(CloseStep, StepOutcome)>,
}

impl CloseReport {
    fn new(channel_id: ChannelId) -> Self {
        Self { channel_id, handler: String::new(), steps: Vec::new() }
    }

    fn record(&mut self, step: CloseStep, outcome: StepOutcome) {
        if let StepOutcome::Failed(error) = &outcome {
            warn!(
                event_name = "ticket.close.step_failed",
                ticket_channel_id = %self.channel_id,
                step = step.as_str(),
                error = %error,
                "close step failed; continuing"
            );
        }
        self.steps.push((step, outcome));
    }

    pub fn outcome(&self, step: CloseStep) -> Option<&StepOutcome> {
        self.steps.iter().find(|(recorded, _)| *recorded == step).map(|(_, outcome)| outcome)
    }

    pub fn failures(&self) -> impl Iterator<Item = CloseStep> + '_ {
        self.steps.iter().filter(|(_, outcome)| outcome.is_failure()).map(|(step, _)| *step)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClaimReport {
    pub ticket: Ticket,
    pub moved: StepOutcome,
}

/// Ticket lifecycle behind the panel and welcome-message buttons.
pub struct TicketService {
    ctx: BotContext,
    feedback: FeedbackService,
    transcripts: TranscriptRenderer,
}

impl TicketService {
    pub fn new(ctx: BotContext, feedback: FeedbackService, transcripts: TranscriptRenderer) -> Self {
        Self { ctx, feedback, transcripts }
    }

    /// Posts the public "open a ticket" panel in the invoking channel.
    pub async fn post_panel(&self, event: &SlashCommandEvent) -> ServiceResult<MessageId> {
        let guild_id = require_guild(event.guild_id)?;
        self.ctx.api.respond(&event.interaction, InteractionReply::Defer { ephemeral: true }).await?;

        let guild = self.ctx.guild(guild_id).await?;
        let banner = self.ctx.banner().await;
        let panel = views::ticket_panel(&guild, &self.ctx.emojis, banner);
        let message_id = self.ctx.api.send_message(event.channel_id, panel).await?;
        info!(
            event_name = "ticket.panel_posted",
            channel_id = %event.channel_id,
            message_id = %message_id,
            "ticket panel posted"
        );

        self.ctx.api.followup(&event.interaction, views::panel_sent(), true).await?;
        Ok(message_id)
    }

    pub async fn open(&self, event: &ComponentEvent) -> ServiceResult<Ticket> {
        let guild_id = require_guild(event.guild_id)?;
        let prerequisites = self.ctx.stores.settings.load().await?.ticket_prerequisites()?;

        let category = self.ctx.api.channel(prerequisites.open_category).await?;
        if !category.is_some_and(|channel| channel.kind == ChannelKind::Category) {
            return Err(InteractionError::ConfigurationIncomplete(
                "the configured ticket category no longer exists.".to_owned(),
            )
            .into());
        }
        if !self.ctx.api.role_exists(guild_id, prerequisites.staff_role).await? {
            return Err(InteractionError::ConfigurationIncomplete(
                "the configured staff role no longer exists.".to_owned(),
            )
            .into());
        }

        self.ctx.api.respond(&event.interaction, InteractionReply::Defer { ephemeral: true }).await?;

        let actor = &event.actor;
        if let Some(existing) =
            self.find_open_ticket(guild_id, actor.user_id, prerequisites.open_category).await?
        {
            return Err(InteractionError::DuplicateRequest(format!(
                "You already have an open ticket: {}",
                existing.mention()
            ))
            .into());
        }

        let number = self.ctx.stores.counter.next().await?;
        let channel = self
            .ctx
            .api
            .create_text_channel(
                guild_id,
                NewTextChannel {
                    name: channel_name(&actor.name),
                    category: prerequisites.open_category,
                    topic: channel_topic(number, actor.user_id),
                    access: vec![
                        ChannelAccess::HideFromEveryone,
                        ChannelAccess::Requester(actor.user_id),
                        ChannelAccess::Staff(prerequisites.staff_role),
                    ],
                },
            )
            .await?;

        let mut ticket = Ticket {
            channel_id: channel.id,
            channel_name: channel.name.clone(),
            number,
            owner_id: actor.user_id,
            owner_name: actor.name.clone(),
            category_id: Some(prerequisites.open_category),
            status: TicketStatus::Open,
            claimed_by: None,
            welcome_message_id: None,
            opened_at: Utc::now(),
            closed_at: None,
        };
        self.ctx.stores.tickets.save(ticket.clone()).await?;

        let guild = self.ctx.guild(guild_id).await?;
        let banner = self.ctx.banner().await;
        let mut welcome = views::ticket_welcome(
            &guild,
            &ticket,
            &self.ctx.emojis,
            banner.as_ref().map(|file| file.file_name.as_str()),
        );
        welcome.files.extend(banner);
        ticket.welcome_message_id = Some(self.ctx.api.send_message(channel.id, welcome).await?);
        self.ctx.stores.tickets.save(ticket.clone()).await?;

        info!(
            event_name = "ticket.opened",
            ticket_channel_id = %channel.id,
            ticket_number = %number,
            owner_id = %actor.user_id,
            "ticket opened"
        );
        self.ctx
            .api
            .followup(&event.interaction, views::ticket_created(&self.ctx.emojis, channel.id), true)
            .await?;
        Ok(ticket)
    }

    /// Channel of an active ticket the requester already has under `category`.
    async fn find_open_ticket(
        &self,
        guild: GuildId,
        owner: UserId,
        category: ChannelId,
    ) -> ServiceResult<Option<ChannelId>> {
        while let Some(mut record) =
            self.ctx.stores.tickets.find_active_by_owner(owner, Some(category)).await?
        {
            if self.ctx.api.channel(record.channel_id).await?.is_some() {
                return Ok(Some(record.channel_id));
            }
            warn!(
                ticket_channel_id = %record.channel_id,
                owner_id = %owner,
                "ticket channel disappeared; closing stale record"
            );
            record.status = TicketStatus::Closed;
            record.closed_at = Some(Utc::now());
            self.ctx.stores.tickets.save(record).await?;
        }

        // Channels opened before ticket records existed only carry the owner in their topic.
        let channels = self.ctx.api.guild_channels(guild).await?;
        Ok(channels
            .into_iter()
            .find(|channel| {
                channel.parent_id == Some(category)
                    && channel.topic.as_deref().is_some_and(|topic| topic_mentions_owner(topic, owner))
            })
            .map(|channel| channel.id))
    }

    pub async fn claim(&self, event: &ComponentEvent) -> ServiceResult<Option<ClaimReport>> {
        let Some(guild_id) = event.guild_id else {
            return Ok(None);
        };
        let settings = self.require_staff(&event.actor).await?;
        let Some(mut ticket) = self.resolve_ticket(guild_id, event.channel_id).await? else {
            self.ctx
                .api
                .respond(&event.interaction, InteractionReply::ephemeral_text("This channel is not a ticket."))
                .await?;
            return Ok(None);
        };

        ticket::transition(ticket.status, TicketEvent::Claim).map_err(DomainError::from)?;
        ticket.status = TicketStatus::Claimed;
        ticket.claimed_by =
            Some(StaffRef { user_id: event.actor.user_id, name: event.actor.name.clone() });

        // The record is only marked claimed once the claim is visible in the channel.
        let guild = self.ctx.guild(guild_id).await?;
        let banner_name = self.ctx.banner_name().await;
        let welcome =
            views::ticket_welcome(&guild, &ticket, &self.ctx.emojis, banner_name.as_deref());
        let announcement = views::claim_announcement(&self.ctx.emojis, event.actor.user_id);

        match ticket.welcome_message_id {
            Some(welcome_id) if welcome_id != event.message_id => {
                self.ctx
                    .api
                    .respond(
                        &event.interaction,
                        InteractionReply::Message { message: announcement, ephemeral: false },
                    )
                    .await?;
                self.ctx.stores.tickets.save(ticket.clone()).await?;
                if let Err(error) =
                    self.ctx.api.edit_message(ticket.channel_id, welcome_id, welcome).await
                {
                    warn!(ticket_channel_id = %ticket.channel_id, error = %error, "could not refresh welcome message");
                }
            }
            _ => {
                self.ctx.api.respond(&event.interaction, InteractionReply::UpdateMessage(welcome)).await?;
                self.ctx.stores.tickets.save(ticket.clone()).await?;
                self.ctx.api.followup(&event.interaction, announcement, false).await?;
            }
        }

        let moved = match settings.claimed_category() {
            None => StepOutcome::skipped("no claimed category configured"),
            Some(category) => match self.ctx.api.move_channel(ticket.channel_id, category).await {
                Ok(()) => {
                    ticket.category_id = Some(category);
                    if let Err(error) = self.ctx.stores.tickets.save(ticket.clone()).await {
                        warn!(ticket_channel_id = %ticket.channel_id, error = %error, "could not record ticket move");
                    }
                    StepOutcome::Done
                }
                Err(error) => {
                    warn!(
                        event_name = "ticket.claim.move_failed",
                        ticket_channel_id = %ticket.channel_id,
                        error = %error,
                        "could not move claimed ticket"
                    );
                    StepOutcome::failed(error)
                }
            },
        };

        info!(
            event_name = "ticket.claimed",
            ticket_channel_id = %ticket.channel_id,
            staff_id = %event.actor.user_id,
            "ticket claimed"
        );
        Ok(Some(ClaimReport { ticket, moved }))
    }

    pub async fn close(&self, event: &ComponentEvent) -> ServiceResult<Option<CloseReport>> {
        let Some(guild_id) = event.guild_id else {
            return Ok(None);
        };
        let settings = self.require_staff(&event.actor).await?;
        self.ctx.api.respond(&event.interaction, InteractionReply::Defer { ephemeral: false }).await?;

        let channel_id = event.channel_id;
        let mut report = CloseReport::new(channel_id);
        let ticket = match self.resolve_ticket(guild_id, channel_id).await {
            Ok(ticket) => ticket,
            Err(error) => {
                warn!(ticket_channel_id = %channel_id, error = %error, "could not resolve ticket");
                None
            }
        };
        let channel_name = match &ticket {
            Some(ticket) => ticket.channel_name.clone(),
            None => match self.ctx.api.channel(channel_id).await {
                Ok(Some(channel)) => channel.name,
                _ => channel_id.to_string(),
            },
        };
        let guild = match self.ctx.guild(guild_id).await {
            Ok(guild) => guild,
            Err(error) => {
                warn!(guild_id = %guild_id, error = %error, "could not load guild profile");
                GuildProfile { id: guild_id, name: "Support".to_owned(), icon_url: None }
            }
        };

        report.handler = match ticket.as_ref().and_then(|ticket| ticket.claimed_by.as_ref()) {
            Some(staff) => staff.mention(),
            None => self
                .scan_claim_marker(channel_id)
                .await
                .unwrap_or_else(|| "Staff".to_owned()),
        };

        let transcript = match self.export_transcript(&guild, channel_id, &channel_name).await {
            Ok(transcript) => {
                report.record(CloseStep::Transcript, StepOutcome::Done);
                Some(transcript)
            }
            Err(error) => {
                report.record(CloseStep::Transcript, StepOutcome::Failed(error));
                None
            }
        };
        let transcript_file = |transcript: &Transcript| {
            FileUpload::new(transcript.file_name.clone(), transcript.html.clone().into_bytes())
        };

        let owner: Option<MemberInfo> = match ticket.as_ref().map(|ticket| ticket.owner_id) {
            None => {
                report.record(CloseStep::OwnerLookup, StepOutcome::skipped("ticket owner unknown"));
                None
            }
            Some(owner_id) => match self.ctx.api.member(guild_id, owner_id).await {
                Ok(Some(member)) => {
                    report.record(CloseStep::OwnerLookup, StepOutcome::Done);
                    Some(member)
                }
                Ok(None) => {
                    report.record(CloseStep::OwnerLookup, StepOutcome::skipped("owner left the server"));
                    None
                }
                Err(error) => {
                    report.record(CloseStep::OwnerLookup, StepOutcome::failed(error));
                    None
                }
            },
        };

        let archive = match (settings.transcript_channel(), &transcript) {
            (None, _) => StepOutcome::skipped("no transcript channel configured"),
            (_, None) => StepOutcome::skipped("transcript unavailable"),
            (Some(target), Some(transcript)) => {
                let summary = views::closure_summary(
                    &channel_name,
                    event.actor.user_id,
                    owner.as_ref().map(|member| member.user_id),
                    transcript_file(transcript),
                );
                self.ctx.api.send_message(target, summary).await.map(|_| ()).into()
            }
        };
        report.record(CloseStep::Archive, archive);

        let direct_message = match &owner {
            None => StepOutcome::skipped("owner unavailable"),
            Some(member) => {
                let session = FeedbackSession::new(
                    member.user_id,
                    member.name.clone(),
                    channel_name.clone(),
                    report.handler.clone(),
                );
                let session_id = self.feedback.start_session(session.clone(), guild.clone()).await;
                let mut panel =
                    views::feedback_panel(&session_id, &session, &guild, &self.ctx.emojis);
                panel.files.extend(transcript.as_ref().map(transcript_file));
                match self.ctx.api.send_dm(member.user_id, panel).await {
                    Ok(_) => StepOutcome::Done,
                    Err(error) => {
                        self.feedback.discard(&session_id).await;
                        StepOutcome::failed(error)
                    }
                }
            }
        };
        report.record(CloseStep::DirectMessage, direct_message);

        let record = match ticket {
            None => StepOutcome::skipped("no ticket record"),
            Some(mut ticket) => match ticket::transition(ticket.status, TicketEvent::Close) {
                Err(error) => StepOutcome::skipped(error.to_string()),
                Ok(_) => {
                    ticket.status = TicketStatus::Closed;
                    ticket.closed_at = Some(Utc::now());
                    self.ctx.stores.tickets.save(ticket).await.into()
                }
            },
        };
        report.record(CloseStep::Record, record);

        let notice = views::closing_notice(&self.ctx.emojis, self.ctx.tickets.close_delay_secs);
        let announcement =
            self.ctx.api.followup(&event.interaction, notice, false).await.map(|_| ());
        report.record(CloseStep::Announcement, announcement.into());

        tokio::time::sleep(self.ctx.tickets.close_delay()).await;
        report.record(CloseStep::ChannelDelete, self.ctx.api.delete_channel(channel_id).await.into());

        info!(
            event_name = "ticket.closed",
            ticket_channel_id = %channel_id,
            closed_by = %event.actor.user_id,
            failed_steps = report.failures().count(),
            "ticket closed"
        );
        Ok(Some(report))
    }

    pub async fn info(&self, event: &ComponentEvent) -> ServiceResult<()> {
        let ticket = self.ctx.stores.tickets.find(event.channel_id).await?;
        let message = views::ticket_info(&self.ctx.emojis, event.channel_id, ticket.as_ref());
        self.ctx.api.respond(&event.interaction, InteractionReply::ephemeral(message)).await?;
        Ok(())
    }

    async fn require_staff(&self, actor: &Actor) -> ServiceResult<GuildSettings> {
        let settings = self.ctx.stores.settings.load().await?;
        match settings.staff_role() {
            Some(role) if actor.has_role(role) => Ok(settings),
            _ => Err(InteractionError::Unauthorized("Staff only.".to_owned()).into()),
        }
    }

    /// Stored ticket for a channel, or one rebuilt from the channel topic and history.
    async fn resolve_ticket(
        &self,
        guild: GuildId,
        channel_id: ChannelId,
    ) -> ServiceResult<Option<Ticket>> {
        if let Some(ticket) = self.ctx.stores.tickets.find(channel_id).await? {
            return Ok(Some(ticket));
        }

        let Some(channel) = self.ctx.api.channel(channel_id).await? else {
            return Ok(None);
        };
        let Some(topic) = channel.topic.as_deref().and_then(parse_topic) else {
            return Ok(None);
        };

        let history = self.recent_history(channel_id).await;
        let claimed_by = history.iter().find_map(claim_marker).map(|marker| StaffRef {
            user_id: parse_user_mention(&marker).unwrap_or(UserId(0)),
            name: marker,
        });
        let welcome_message_id = history
            .iter()
            .find(|message| message.author_is_bot && !message.embeds.is_empty())
            .map(|message| message.id);
        let owner_name = match self.ctx.api.member(guild, topic.owner_id).await {
            Ok(Some(member)) => member.name,
            _ => topic.owner_id.to_string(),
        };

        Ok(Some(Ticket {
            channel_id,
            channel_name: channel.name,
            number: topic.number.unwrap_or(TicketNumber(0)),
            owner_id: topic.owner_id,
            owner_name,
            category_id: channel.parent_id,
            status: if claimed_by.is_some() { TicketStatus::Claimed } else { TicketStatus::Open },
            claimed_by,
            welcome_message_id,
            opened_at: Utc::now(),
            closed_at: None,
        }))
    }

    async fn recent_history(&self, channel_id: ChannelId) -> Vec<HistoryMessage> {
        match self.ctx.api.history(channel_id, Some(self.ctx.tickets.history_scan_limit)).await {
            Ok(history) => history,
            Err(error) => {
                warn!(ticket_channel_id = %channel_id, error = %error, "could not read ticket history");
                Vec::new()
            }
        }
    }

    async fn scan_claim_marker(&self, channel_id: ChannelId) -> Option<String> {
        self.recent_history(channel_id).await.iter().find_map(claim_marker)
    }

    async fn export_transcript(
        &self,
        guild: &GuildProfile,
        channel_id: ChannelId,
        channel_name: &str,
    ) -> Result<Transcript, String> {
        let history = self.ctx.api.history(channel_id, None).await.map_err(|error| error.to_string())?;
        let messages: Vec<TranscriptMessage> = history
            .into_iter()
            .map(|message| TranscriptMessage {
                author_name: message.author_name,
                author_avatar: message.author_avatar,
                author_is_bot: message.author_is_bot,
                timestamp: message.timestamp,
                content: message.content,
                embeds: message.embeds.iter().map(embed_text).collect(),
                attachments: message.attachments,
            })
            .collect();
        self.transcripts
            .render(&guild.name, channel_name, &messages, Utc::now())
            .map_err(|error| error.to_string())
    }
}

fn require_guild(guild: Option<GuildId>) -> Result<GuildId, InteractionError> {
    guild.ok_or_else(|| {
        InteractionError::ConfigurationIncomplete("this action only works inside a server.".to_owned())
    })
}

fn claim_marker(message: &HistoryMessage) -> Option<String> {
    message.embeds.iter().find_map(|embed| {
        embed
            .field_value(CLAIMED_BY_FIELD)
            .or_else(|| embed.field_value(LEGACY_CLAIMED_BY_FIELD))
            .map(str::to_owned)
    })
}

fn parse_user_mention(value: &str) -> Option<UserId> {
    value.trim().strip_prefix("<@")?.strip_suffix('>')?.trim_start_matches('!').parse().ok()
}

/// Plain-text rendering of an embed for the transcript.
fn embed_text(embed: &Embed) -> String {
    let mut parts: Vec<String> = Vec::new();
    parts.extend(embed.title.clone());
    parts.extend(embed.description.clone());
    parts.extend(embed.fields.iter().map(|field| format!("{}: {}", field.name, field.value)));
    parts.join("\n")
}
