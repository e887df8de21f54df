use std::sync::Arc;

use zen_core::transcript::{TranscriptError, TranscriptRenderer};

use crate::commands::CommandRouter;
use crate::context::BotContext;
use crate::emojis::EmojiSetupService;
use crate::events::{
    ComponentHandler, EventDispatcher, MessageCreateHandler, ModalSubmitHandler,
    SlashCommandHandler,
};
use crate::feedback::FeedbackService;
use crate::tickets::TicketService;
use crate::waiter::AttachmentWaiter;
use crate::wizard::WizardService;

/// All services of the bot, wired over one context.
pub struct Bot {
    pub context: BotContext,
    pub tickets: Arc<TicketService>,
    pub wizard: Arc<WizardService>,
    pub feedback: FeedbackService,
    pub emoji_setup: Arc<EmojiSetupService>,
}

impl Bot {
    pub fn new(context: BotContext) -> Result<Self, TranscriptError> {
        let feedback = FeedbackService::new(context.clone(), AttachmentWaiter::new());
        let tickets = Arc::new(TicketService::new(
            context.clone(),
            feedback.clone(),
            TranscriptRenderer::new()?,
        ));
        let wizard = Arc::new(WizardService::new(context.clone()));
        let emoji_setup = Arc::new(EmojiSetupService::new(context.clone()));
        Ok(Self { context, tickets, wizard, feedback, emoji_setup })
    }

    pub fn dispatcher(&self) -> EventDispatcher {
        let api = Arc::clone(&self.context.api);
        let router = CommandRouter::new(
            Arc::clone(&self.tickets),
            Arc::clone(&self.wizard),
            Arc::clone(&self.emoji_setup),
        );

        let mut dispatcher = EventDispatcher::new();
        dispatcher.register(SlashCommandHandler::new(router, Arc::clone(&api)));
        dispatcher.register(ComponentHandler::new(
            Arc::clone(&self.tickets),
            Arc::clone(&self.wizard),
            self.feedback.clone(),
            Arc::clone(&api),
        ));
        dispatcher.register(ModalSubmitHandler::new(self.feedback.clone(), api));
        dispatcher.register(MessageCreateHandler::new(self.feedback.clone()));
        dispatcher
    }

    /// Drops expired wizard and feedback sessions; returns how many went.
    pub async fn purge_expired_sessions(&self) -> usize {
        self.wizard.purge_expired().await + self.feedback.purge_expired().await
    }
}
