use std::sync::Arc;

use zen_core::errors::InteractionError;

use crate::emojis::EmojiSetupService;
use crate::errors::ServiceResult;
use crate::events::SlashCommandEvent;
use crate::tickets::TicketService;
use crate::wizard::WizardService;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlashCommand {
    SetupEmojis,
    ConfigTicket,
    TicketPanel,
}

impl SlashCommand {
    pub const ALL: [SlashCommand; 3] =
        [SlashCommand::SetupEmojis, SlashCommand::ConfigTicket, SlashCommand::TicketPanel];

    pub fn name(self) -> &'static str {
        match self {
            Self::SetupEmojis => "setup_emojis",
            Self::ConfigTicket => "config_ticket",
            Self::TicketPanel => "ticket_panel",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::SetupEmojis => "Installs the visual assets (emojis) on the server.",
            Self::ConfigTicket => "Starts the support system setup wizard.",
            Self::TicketPanel => "Sends the support panel to the current channel.",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|command| command.name() == name)
    }
}

/// Registration payload for one slash command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CommandDefinition {
    pub name: &'static str,
    pub description: &'static str,
    pub admin_only: bool,
}

pub fn command_definitions() -> Vec<CommandDefinition> {
    SlashCommand::ALL
        .into_iter()
        .map(|command| CommandDefinition {
            name: command.name(),
            description: command.description(),
            admin_only: true,
        })
        .collect()
}

pub struct CommandRouter {
    tickets: Arc<TicketService>,
    wizard: Arc<WizardService>,
    emoji_setup: Arc<EmojiSetupService>,
}

impl CommandRouter {
    pub fn new(
        tickets: Arc<TicketService>,
        wizard: Arc<WizardService>,
        emoji_setup: Arc<EmojiSetupService>,
    ) -> Self {
        Self { tickets, wizard, emoji_setup }
    }

    /// Returns false for commands this bot does not own.
    pub async fn route(&self, event: &SlashCommandEvent) -> ServiceResult<bool> {
        let Some(command) = SlashCommand::parse(&event.command) else {
            return Ok(false);
        };
        if !event.actor.is_admin {
            return Err(InteractionError::Unauthorized(
                "Only administrators can use this command.".to_owned(),
            )
            .into());
        }

        match command {
            SlashCommand::SetupEmojis => self.emoji_setup.install(event).await.map(|_| true),
            SlashCommand::ConfigTicket => self.wizard.start(event).await.map(|_| true),
            SlashCommand::TicketPanel => self.tickets.post_panel(event).await.map(|_| true),
        }
    }
}
