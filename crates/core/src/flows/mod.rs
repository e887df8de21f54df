//! Pure state machines behind the interactive flows.
//!
//! Each module exposes a transition function over an explicit state tag; the
//! interaction layer renders from `(state, accumulated data)` and persists the
//! writes a transition asks for.

pub mod feedback;
pub mod ticket;
pub mod wizard;

use thiserror::Error;

pub use feedback::{
    FeedbackAction, FeedbackEvent, FeedbackSession, FeedbackState, FeedbackTransition,
};
pub use ticket::{TicketEvent, TicketTransition};
pub use wizard::{WizardControl, WizardInput, WizardStep, WizardTransition};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FlowTransitionError {
    #[error("wizard step {step:?} expects a {expected:?} control")]
    WizardInputMismatch { step: WizardStep, expected: WizardControl },
    #[error("wizard is already complete")]
    WizardComplete,
    #[error("feedback event `{event}` is not accepted in state {state:?}")]
    InvalidFeedbackEvent { state: FeedbackState, event: &'static str },
    #[error("star rating must be between 1 and 5, got {0}")]
    RatingOutOfRange(u8),
    #[error("ticket has already been claimed")]
    AlreadyClaimed,
    #[error("ticket is already closed")]
    TicketClosed,
}
