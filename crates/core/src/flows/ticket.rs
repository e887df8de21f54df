use crate::domain::ticket::TicketStatus;
use crate::flows::FlowTransitionError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TicketEvent {
    Claim,
    Close,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TicketTransition {
    pub from: TicketStatus,
    pub to: TicketStatus,
    pub event: TicketEvent,
}

pub fn transition(
    status: TicketStatus,
    event: TicketEvent,
) -> Result<TicketTransition, FlowTransitionError> {
    use TicketEvent::{Claim, Close};
    use TicketStatus::{Claimed, Closed, Open};

    let to = match (status, event) {
        (Open, Claim) => Claimed,
        (Claimed, Claim) => return Err(FlowTransitionError::AlreadyClaimed),
        (Open, Close) | (Claimed, Close) => Closed,
        (Closed, _) => return Err(FlowTransitionError::TicketClosed),
    };

    Ok(TicketTransition { from: status, to, event })
}
