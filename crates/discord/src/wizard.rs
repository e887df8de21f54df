use tracing::{debug, info};

use zen_core::domain::ids::UserId;
use zen_core::flows::wizard::{self, WizardControl, WizardInput, WizardStep};

use crate::api::InteractionReply;
use crate::context::BotContext;
use crate::errors::ServiceResult;
use crate::events::{ComponentEvent, SlashCommandEvent};
use crate::sessions::SessionStore;
use crate::views;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WizardSession {
    pub step: WizardStep,
    pub started_by: UserId,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WizardOutcome {
    Advanced(WizardStep),
    Completed,
    Ignored,
}

/// Six-step setup wizard. Each answer is saved as soon as it is submitted.
pub struct WizardService {
    ctx: BotContext,
    sessions: SessionStore<WizardSession>,
}

impl WizardService {
    pub fn new(ctx: BotContext) -> Self {
        let ttl = ctx.tickets.wizard_timeout();
        Self { ctx, sessions: SessionStore::new(ttl) }
    }

    pub async fn start(&self, event: &SlashCommandEvent) -> ServiceResult<String> {
        let step = WizardStep::initial();
        let session_id =
            self.sessions.insert(WizardSession { step, started_by: event.actor.user_id }).await;
        self.ctx
            .api
            .respond(&event.interaction, InteractionReply::ephemeral(views::wizard_step(&session_id, step)))
            .await?;
        info!(
            event_name = "wizard.started",
            session_id = %session_id,
            user_id = %event.actor.user_id,
            "setup wizard started"
        );
        Ok(session_id)
    }

    /// Applies one step submission; stale or expired panels are ignored without a reply.
    pub async fn handle(
        &self,
        event: &ComponentEvent,
        session_id: &str,
        step_number: u8,
    ) -> ServiceResult<WizardOutcome> {
        let Some(session) = self.sessions.get(session_id).await else {
            debug!(session_id, "wizard session expired");
            return Ok(WizardOutcome::Ignored);
        };
        if session.step.number() != Some(step_number) || session.started_by != event.actor.user_id {
            debug!(session_id, step_number, "stale wizard submission");
            return Ok(WizardOutcome::Ignored);
        }
        let Some(input) = read_input(session.step, &event.values) else {
            debug!(session_id, step_number, "wizard submission without a usable value");
            return Ok(WizardOutcome::Ignored);
        };
        let transition = match wizard::transition(session.step, input) {
            Ok(transition) => transition,
            Err(error) => {
                debug!(session_id, error = %error, "wizard transition rejected");
                return Ok(WizardOutcome::Ignored);
            }
        };

        if let Some((key, value)) = transition.write {
            self.ctx.stores.settings.set(key, value).await?;
            info!(event_name = "wizard.setting_saved", key = key.as_str(), value, "setting saved");
        }
        self.sessions.update(session_id, |session| session.step = transition.to).await;

        self.ctx
            .api
            .respond(
                &event.interaction,
                InteractionReply::UpdateMessage(views::wizard_step(session_id, transition.to)),
            )
            .await?;

        if transition.to.is_complete() {
            self.sessions.remove(session_id).await;
            info!(event_name = "wizard.completed", session_id, "setup wizard completed");
            return Ok(WizardOutcome::Completed);
        }
        Ok(WizardOutcome::Advanced(transition.to))
    }

    pub async fn purge_expired(&self) -> usize {
        self.sessions.purge_expired().await
    }
}

fn read_input(step: WizardStep, values: &[String]) -> Option<WizardInput> {
    let first = values.first();
    match step.control()? {
        WizardControl::Continue => Some(WizardInput::Continue),
        WizardControl::RoleSelect => first?.parse().ok().map(WizardInput::Role),
        WizardControl::CategorySelect => first?.parse().ok().map(WizardInput::Category),
        WizardControl::ChannelSelect => first?.parse().ok().map(WizardInput::Channel),
    }
}
