use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use zen_core::domain::review::{Review, ReviewId};
use zen_core::errors::DomainError;
use zen_core::flows::feedback::{clip_comment, FeedbackEvent, FeedbackSession, FeedbackState};
use zen_db::repositories::RepositoryError;

use crate::api::{GuildProfile, InteractionReply};
use crate::context::BotContext;
use crate::custom_ids::COMMENT_INPUT;
use crate::errors::ServiceResult;
use crate::events::{ComponentEvent, MessageCreateEvent, ModalSubmitEvent};
use crate::outcome::StepOutcome;
use crate::sessions::SessionStore;
use crate::views;
use crate::waiter::AttachmentWaiter;

/// Rating panels stay usable for a week after the ticket closes.
const FEEDBACK_SESSION_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);
const REVIEW_ID_ATTEMPTS: usize = 5;
const REVIEW_THREAD_ARCHIVE_MINUTES: u16 = 1440;

#[derive(Clone, Debug)]
pub struct FeedbackEntry {
    pub session: FeedbackSession,
    pub guild: GuildProfile,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ImageOutcome {
    Saved(usize),
    TimedOut,
    SessionGone,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FinishReport {
    pub review: Review,
    pub summary: StepOutcome,
    pub thread: StepOutcome,
}

/// Drives the rating panel sent to a requester after their ticket is closed.
#[derive(Clone)]
pub struct FeedbackService {
    ctx: BotContext,
    sessions: Arc<SessionStore<FeedbackEntry>>,
    waiter: AttachmentWaiter,
}

impl FeedbackService {
    pub fn new(ctx: BotContext, waiter: AttachmentWaiter) -> Self {
        Self { ctx, sessions: Arc::new(SessionStore::new(FEEDBACK_SESSION_TTL)), waiter }
    }

    pub async fn start_session(&self, session: FeedbackSession, guild: GuildProfile) -> String {
        self.sessions.insert(FeedbackEntry { session, guild }).await
    }

    /// Drops a session whose panel could not be delivered.
    pub async fn discard(&self, session_id: &str) {
        self.sessions.remove(session_id).await;
    }

    pub async fn session(&self, session_id: &str) -> Option<FeedbackSession> {
        self.sessions.get(session_id).await.map(|entry| entry.session)
    }

    pub async fn purge_expired(&self) -> usize {
        self.sessions.purge_expired().await
    }

    async fn apply(&self, session_id: &str, event: FeedbackEvent) -> Option<FeedbackEntry> {
        let name = event.name();
        let outcome = self
            .sessions
            .update(session_id, |entry| entry.session.apply(event).map(|_| entry.clone()))
            .await;
        match outcome {
            Some(Ok(entry)) => Some(entry),
            Some(Err(error)) => {
                debug!(session_id, event = name, error = %error, "feedback event ignored");
                None
            }
            None => {
                debug!(session_id, event = name, "feedback session expired");
                None
            }
        }
    }

    fn panel(&self, session_id: &str, entry: &FeedbackEntry) -> crate::components::MessageTemplate {
        views::feedback_panel(session_id, &entry.session, &entry.guild, &self.ctx.emojis)
    }

    pub async fn rate(
        &self,
        event: &ComponentEvent,
        session_id: &str,
        value: u8,
    ) -> ServiceResult<bool> {
        let Some(entry) = self.apply(session_id, FeedbackEvent::RateService(value)).await else {
            return Ok(false);
        };
        self.ctx
            .api
            .respond(&event.interaction, InteractionReply::UpdateMessage(self.panel(session_id, &entry)))
            .await?;
        Ok(true)
    }

    pub async fn open_comment_form(
        &self,
        event: &ComponentEvent,
        session_id: &str,
    ) -> ServiceResult<bool> {
        let Some(entry) = self.sessions.get(session_id).await else {
            return Ok(false);
        };
        if entry.session.state != FeedbackState::Details {
            return Ok(false);
        }

        let form = views::comment_form(
            session_id,
            entry.session.comment.as_deref(),
            self.ctx.tickets.comment_max_chars,
        );
        self.ctx.api.respond(&event.interaction, InteractionReply::Modal(form)).await?;
        Ok(true)
    }

    pub async fn submit_comment(
        &self,
        event: &ModalSubmitEvent,
        session_id: &str,
    ) -> ServiceResult<bool> {
        let text = event.fields.get(COMMENT_INPUT).map(String::as_str).unwrap_or_default();
        let text = clip_comment(text, self.ctx.tickets.comment_max_chars);
        let Some(entry) = self.apply(session_id, FeedbackEvent::CommentSubmitted(text)).await else {
            return Ok(false);
        };

        self.ctx
            .api
            .respond(&event.interaction, InteractionReply::UpdateMessage(self.panel(session_id, &entry)))
            .await?;
        self.ctx.api.followup(&event.interaction, views::comment_saved(&self.ctx.emojis), true).await?;
        Ok(true)
    }

    /// Prompts for images and waits for them in the background.
    pub async fn request_images(
        &self,
        event: &ComponentEvent,
        session_id: &str,
    ) -> ServiceResult<Option<JoinHandle<ImageOutcome>>> {
        let Some(entry) = self.sessions.get(session_id).await else {
            return Ok(None);
        };
        if entry.session.state != FeedbackState::Details {
            return Ok(None);
        }

        let prompt = views::images_prompt(&self.ctx.emojis, self.ctx.tickets.image_wait_secs);
        self.ctx.api.respond(&event.interaction, InteractionReply::ephemeral(prompt)).await?;

        let service = self.clone();
        let event = event.clone();
        let session_id = session_id.to_owned();
        Ok(Some(tokio::spawn(async move { service.collect_images(event, session_id).await })))
    }

    async fn collect_images(&self, event: ComponentEvent, session_id: String) -> ImageOutcome {
        let wait = self.ctx.tickets.image_wait();
        let Some(urls) = self.waiter.wait(event.actor.user_id, event.channel_id, wait).await else {
            if let Err(error) = self
                .ctx
                .api
                .followup(&event.interaction, views::images_timed_out(&self.ctx.emojis), true)
                .await
            {
                warn!(session_id = %session_id, error = %error, "could not report image timeout");
            }
            return ImageOutcome::TimedOut;
        };

        let count = urls.len();
        let Some(entry) = self.apply(&session_id, FeedbackEvent::ImagesAttached(urls)).await else {
            return ImageOutcome::SessionGone;
        };

        if let Err(error) = self
            .ctx
            .api
            .edit_message(event.channel_id, event.message_id, self.panel(&session_id, &entry))
            .await
        {
            warn!(session_id = %session_id, error = %error, "could not refresh feedback panel");
        }
        if let Err(error) = self
            .ctx
            .api
            .followup(&event.interaction, views::images_saved(&self.ctx.emojis), true)
            .await
        {
            warn!(session_id = %session_id, error = %error, "could not confirm saved images");
        }
        ImageOutcome::Saved(count)
    }

    pub async fn finish(
        &self,
        event: &ComponentEvent,
        session_id: &str,
    ) -> ServiceResult<Option<FinishReport>> {
        // Moving to Submitted inside the store keeps a double click from storing twice.
        let Some(entry) = self.apply(session_id, FeedbackEvent::Finish).await else {
            return Ok(None);
        };
        if let Err(error) = self.ctx.api.respond(&event.interaction, InteractionReply::DeferUpdate).await {
            self.reopen(session_id).await;
            return Err(error.into());
        }

        let review = match self.store_review(&entry.session).await {
            Ok(review) => review,
            Err(error) => {
                warn!(session_id, error = %error, "review could not be stored; session reopened");
                self.reopen(session_id).await;
                return Err(error);
            }
        };
        self.sessions.remove(session_id).await;
        info!(
            event_name = "feedback.review_stored",
            review_id = %review.id,
            stars = review.stars.value(),
            reviewer_id = %review.reviewer_id,
            "review stored"
        );

        let settings = self.ctx.stores.settings.load().await?;
        let (summary, thread) = match settings.feedback_channel() {
            None => (
                StepOutcome::skipped("no feedback channel configured"),
                StepOutcome::skipped("no feedback channel configured"),
            ),
            Some(channel) => {
                let message = views::review_summary(
                    &review,
                    event.actor.avatar_url.clone(),
                    &entry.guild,
                    &self.ctx.emojis,
                );
                match self.ctx.api.send_message(channel, message).await {
                    Ok(message_id) => {
                        let thread = self
                            .ctx
                            .api
                            .create_thread(
                                channel,
                                message_id,
                                &views::review_thread_name(&review),
                                REVIEW_THREAD_ARCHIVE_MINUTES,
                            )
                            .await
                            .map(|_| ());
                        if let Err(error) = &thread {
                            warn!(review_id = %review.id, error = %error, "could not open review thread");
                        }
                        (StepOutcome::Done, StepOutcome::from(thread))
                    }
                    Err(error) => {
                        warn!(review_id = %review.id, error = %error, "could not post review summary");
                        (StepOutcome::failed(error), StepOutcome::skipped("summary not posted"))
                    }
                }
            }
        };

        self.ctx.api.edit_original(&event.interaction, views::review_thank_you(&self.ctx.emojis)).await?;
        Ok(Some(FinishReport { review, summary, thread }))
    }

    async fn reopen(&self, session_id: &str) {
        self.sessions.update(session_id, |entry| entry.session.reopen()).await;
    }

    async fn store_review(&self, session: &FeedbackSession) -> ServiceResult<Review> {
        for attempt in 1..=REVIEW_ID_ATTEMPTS {
            let review = session.to_review(ReviewId::generate(), Utc::now()).ok_or_else(|| {
                DomainError::InvariantViolation("finished feedback has no rating".to_owned())
            })?;
            match self.ctx.stores.reviews.insert(review.clone()).await {
                Ok(()) => return Ok(review),
                Err(RepositoryError::Conflict(_)) => {
                    debug!(attempt, review_id = %review.id, "review id taken; drawing another");
                }
                Err(error) => return Err(error.into()),
            }
        }
        Err(RepositoryError::Conflict("no free review id after retries".to_owned()).into())
    }

    /// Hands attachments to a pending image request; true when one was waiting.
    pub async fn accept_attachments(&self, event: &MessageCreateEvent) -> bool {
        self.waiter.offer(event.author_id, event.channel_id, event.attachments.clone()).await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use zen_core::domain::ids::{ChannelId, MessageId, UserId};
    use zen_core::domain::review::{RatingTone, Review, ReviewId};
    use zen_core::domain::settings::SettingKey;
    use zen_core::flows::feedback::{FeedbackSession, FeedbackState};
    use zen_db::repositories::{InMemoryReviewRepository, RepositoryError, ReviewRepository};
    use zen_db::Stores;

    use super::{FeedbackService, ImageOutcome};
    use crate::api::{GuildProfile, InteractionReply};
    use crate::components::Colour;
    use crate::custom_ids::COMMENT_INPUT;
    use crate::events::{MessageCreateEvent, ModalSubmitEvent};
    use crate::outcome::StepOutcome;
    use crate::testing::{self, ApiCall, RecordingDiscordApi, GUILD};
    use crate::waiter::AttachmentWaiter;

    const DM_CHANNEL: ChannelId = ChannelId(70);
    const PANEL_MESSAGE: MessageId = MessageId(71);
    const REVIEWER: u64 = 555;

    async fn service(api: std::sync::Arc<RecordingDiscordApi>, stores: Stores) -> FeedbackService {
        let dir = tempfile::tempdir().expect("tempdir");
        FeedbackService::new(
            testing::context(api, stores, testing::tickets_config(dir.path())),
            AttachmentWaiter::new(),
        )
    }

    async fn open_session(service: &FeedbackService) -> String {
        service
            .start_session(
                FeedbackSession::new(UserId(REVIEWER), "ana", "ticket-ana", "<@77>"),
                GuildProfile { id: GUILD, name: "Zen Studios".to_owned(), icon_url: None },
            )
            .await
    }

    fn click(interaction: u64, custom: &str) -> crate::events::ComponentEvent {
        let mut event = testing::component(
            interaction,
            DM_CHANNEL,
            PANEL_MESSAGE,
            testing::actor(REVIEWER, "ana"),
            custom,
        );
        event.guild_id = None;
        event
    }

    fn comment(interaction: u64, session: &str, text: &str) -> ModalSubmitEvent {
        ModalSubmitEvent {
            interaction: testing::interaction(interaction),
            guild_id: None,
            channel_id: DM_CHANNEL,
            message_id: Some(PANEL_MESSAGE),
            actor: testing::actor(REVIEWER, "ana"),
            custom_id: format!("feedback:{session}:comment_form"),
            fields: BTreeMap::from([(COMMENT_INPUT.to_owned(), text.to_owned())]),
        }
    }

    #[tokio::test]
    async fn four_stars_with_comment_is_stored_and_posted_with_neutral_colour() {
        let api = RecordingDiscordApi::new();
        let stores = Stores::in_memory();
        stores.settings.set(SettingKey::FeedbackChannelId, 60).await.expect("setting");
        let service = service(api.clone(), stores.clone()).await;
        let session = open_session(&service).await;

        assert!(service.rate(&click(1, "star"), &session, 4).await.expect("rate"));
        assert!(service.submit_comment(&comment(2, &session, "Great!"), &session).await.expect("comment"));
        let report =
            service.finish(&click(3, "finish"), &session).await.expect("finish").expect("report");

        assert_eq!(report.review.stars.value(), 4);
        assert_eq!(report.review.comment.as_deref(), Some("Great!"));
        assert!(report.review.id.is_well_formed());
        assert_eq!(report.summary, StepOutcome::Done);
        assert_eq!(report.thread, StepOutcome::Done);

        let stored = stores.reviews.find(&report.review.id).await.expect("find").expect("stored");
        assert_eq!(stored.staff, "<@77>");
        assert_eq!(stored.ticket, "ticket-ana");

        let summaries = api.sent_to(ChannelId(60));
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].embeds[0].colour, Some(Colour::for_tone(RatingTone::Neutral)));
        assert!(api.calls().iter().any(|call| matches!(
            call,
            ApiCall::CreateThread { name, .. } if *name == format!("Review {}", report.review.id)
        )));
        assert!(service.session(&session).await.is_none());
    }

    #[tokio::test]
    async fn finishing_twice_stores_a_single_review() {
        let api = RecordingDiscordApi::new();
        let stores = Stores::in_memory();
        let service = service(api.clone(), stores.clone()).await;
        let session = open_session(&service).await;

        service.rate(&click(1, "star"), &session, 5).await.expect("rate");
        let first = service.finish(&click(2, "finish"), &session).await.expect("finish");
        let second = service.finish(&click(3, "finish"), &session).await.expect("finish");

        let first = first.expect("first finish stores");
        assert!(second.is_none());
        assert_eq!(stores.reviews.list(10).await.expect("list").len(), 1);
        assert_eq!(first.summary, StepOutcome::skipped("no feedback channel configured"));
    }

    /// Review store whose first `conflicts` inserts collide.
    struct CollidingReviews {
        conflicts: AtomicUsize,
        inner: InMemoryReviewRepository,
    }

    #[async_trait::async_trait]
    impl ReviewRepository for CollidingReviews {
        async fn insert(&self, review: Review) -> Result<(), RepositoryError> {
            let remaining = self.conflicts.load(Ordering::SeqCst);
            if remaining > 0 {
                self.conflicts.store(remaining - 1, Ordering::SeqCst);
                return Err(RepositoryError::Conflict(review.id.to_string()));
            }
            self.inner.insert(review).await
        }

        async fn find(&self, id: &ReviewId) -> Result<Option<Review>, RepositoryError> {
            self.inner.find(id).await
        }

        async fn list(&self, limit: u32) -> Result<Vec<Review>, RepositoryError> {
            self.inner.list(limit).await
        }
    }

    #[tokio::test]
    async fn failed_store_keeps_the_session_for_another_finish() {
        let api = RecordingDiscordApi::new();
        let mut stores = Stores::in_memory();
        stores.reviews = Arc::new(CollidingReviews {
            conflicts: AtomicUsize::new(super::REVIEW_ID_ATTEMPTS),
            inner: InMemoryReviewRepository::default(),
        });
        let service = service(api.clone(), stores.clone()).await;
        let session = open_session(&service).await;
        service.rate(&click(1, "star"), &session, 5).await.expect("rate");

        service.finish(&click(2, "finish"), &session).await.expect_err("ids exhausted");

        let kept = service.session(&session).await.expect("session kept");
        assert_eq!(kept.state, FeedbackState::Details);
        assert_eq!(kept.stars.map(|stars| stars.value()), Some(5));

        let report =
            service.finish(&click(3, "finish"), &session).await.expect("finish").expect("report");
        assert_eq!(report.review.stars.value(), 5);
        assert_eq!(stores.reviews.list(10).await.expect("list").len(), 1);
    }

    #[tokio::test]
    async fn finish_survives_thread_creation_failure() {
        let api = RecordingDiscordApi::new();
        api.fail("create_thread");
        let stores = Stores::in_memory();
        stores.settings.set(SettingKey::FeedbackChannelId, 60).await.expect("setting");
        let service = service(api.clone(), stores.clone()).await;
        let session = open_session(&service).await;
        service.rate(&click(1, "star"), &session, 2).await.expect("rate");

        let report =
            service.finish(&click(2, "finish"), &session).await.expect("finish").expect("report");

        assert_eq!(report.summary, StepOutcome::Done);
        assert!(report.thread.is_failure());
        assert_eq!(api.sent_to(ChannelId(60)).len(), 1);
        assert!(api
            .calls()
            .iter()
            .any(|call| matches!(call, ApiCall::EditOriginal { interaction: 2, .. })));
        assert!(stores.reviews.find(&report.review.id).await.expect("find").is_some());
    }

    #[tokio::test]
    async fn finish_before_rating_is_ignored() {
        let api = RecordingDiscordApi::new();
        let service = service(api.clone(), Stores::in_memory()).await;
        let session = open_session(&service).await;

        let report = service.finish(&click(1, "finish"), &session).await.expect("finish");

        assert!(report.is_none());
        assert!(api.replies(1).is_empty());
        assert_eq!(service.session(&session).await.map(|s| s.state), Some(FeedbackState::Rating));
    }

    #[tokio::test]
    async fn comment_is_clipped_to_the_configured_limit() {
        let api = RecordingDiscordApi::new();
        let service = service(api.clone(), Stores::in_memory()).await;
        let session = open_session(&service).await;
        service.rate(&click(1, "star"), &session, 3).await.expect("rate");

        let long = "x".repeat(1500);
        service.submit_comment(&comment(2, &session, &long), &session).await.expect("comment");

        let stored = service.session(&session).await.expect("session");
        assert_eq!(stored.comment.map(|text| text.chars().count()), Some(500));
        assert!(matches!(api.replies(2).as_slice(), [InteractionReply::UpdateMessage(_)]));
    }

    #[tokio::test]
    async fn comment_form_requires_a_rating_first() {
        let api = RecordingDiscordApi::new();
        let service = service(api.clone(), Stores::in_memory()).await;
        let session = open_session(&service).await;

        assert!(!service.open_comment_form(&click(1, "comment"), &session).await.expect("form"));
        service.rate(&click(2, "star"), &session, 2).await.expect("rate");
        assert!(service.open_comment_form(&click(3, "comment"), &session).await.expect("form"));
        assert!(matches!(api.replies(3).as_slice(), [InteractionReply::Modal(_)]));
    }

    #[tokio::test]
    async fn images_sent_in_the_dm_are_attached_to_the_session() {
        let api = RecordingDiscordApi::new();
        let service = service(api.clone(), Stores::in_memory()).await;
        let session = open_session(&service).await;
        service.rate(&click(1, "star"), &session, 5).await.expect("rate");

        let task = service
            .request_images(&click(2, "images"), &session)
            .await
            .expect("request")
            .expect("task spawned");
        let message = MessageCreateEvent {
            channel_id: DM_CHANNEL,
            author_id: UserId(REVIEWER),
            author_is_bot: false,
            attachments: vec!["https://cdn.example/a.png".to_owned()],
        };
        let mut delivered = false;
        for _ in 0..50 {
            if service.accept_attachments(&message).await {
                delivered = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        assert!(delivered);
        assert_eq!(task.await.expect("join"), ImageOutcome::Saved(1));
        let stored = service.session(&session).await.expect("session");
        assert_eq!(stored.images, vec!["https://cdn.example/a.png".to_owned()]);
        assert!(api
            .calls()
            .iter()
            .any(|call| matches!(call, ApiCall::EditMessage { message_id, .. } if *message_id == PANEL_MESSAGE)));
    }

    #[tokio::test(start_paused = true)]
    async fn image_request_times_out_without_changing_the_session() {
        let api = RecordingDiscordApi::new();
        let service = service(api.clone(), Stores::in_memory()).await;
        let session = open_session(&service).await;
        service.rate(&click(1, "star"), &session, 5).await.expect("rate");

        let task = service
            .request_images(&click(2, "images"), &session)
            .await
            .expect("request")
            .expect("task spawned");

        assert_eq!(task.await.expect("join"), ImageOutcome::TimedOut);
        assert!(service.session(&session).await.expect("session").images.is_empty());
        let followups = api.followups(2);
        assert_eq!(followups.len(), 1);
        assert!(followups[0].0.content.as_deref().is_some_and(|text| text.contains("Time is up")));
    }

    #[tokio::test]
    async fn unknown_sessions_are_ignored() {
        let api = RecordingDiscordApi::new();
        let service = service(api.clone(), Stores::in_memory()).await;

        assert!(!service.rate(&click(1, "star"), "missing", 3).await.expect("rate"));
        assert!(service.request_images(&click(2, "images"), "missing").await.expect("images").is_none());
        assert!(api.calls().is_empty());
    }
}
