//! Component custom ids.
//!
//! Ticket buttons are persistent and carry fixed ids. Wizard and feedback
//! controls embed the session id so a restarted process (or an expired
//! session) can recognise and ignore stale panels.

pub const TICKET_OPEN: &str = "ticket.open.v1";
pub const TICKET_CLOSE: &str = "ticket.close.v1";
pub const TICKET_CLAIM: &str = "ticket.claim.v1";
pub const TICKET_INFO: &str = "ticket.info.v1";

/// Ids used by panels posted before the ticket buttons were versioned.
const LEGACY_TICKET_OPEN: &str = "ticket_open_btn";
const LEGACY_TICKET_CLOSE: &str = "close_btn";
const LEGACY_TICKET_CLAIM: &str = "claim_btn";
const LEGACY_TICKET_INFO: &str = "info_btn";

pub const COMMENT_INPUT: &str = "comment";

const WIZARD_PREFIX: &str = "wizard";
const FEEDBACK_PREFIX: &str = "feedback";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FeedbackControl {
    Star(u8),
    Comment,
    Images,
    Finish,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ComponentAction {
    OpenTicket,
    ClaimTicket,
    CloseTicket,
    TicketInfo,
    Wizard { session: String, step: u8 },
    Feedback { session: String, control: FeedbackControl },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ModalAction {
    FeedbackComment { session: String },
}

impl ComponentAction {
    pub fn parse(custom_id: &str) -> Option<Self> {
        match custom_id {
            TICKET_OPEN | LEGACY_TICKET_OPEN => return Some(Self::OpenTicket),
            TICKET_CLAIM | LEGACY_TICKET_CLAIM => return Some(Self::ClaimTicket),
            TICKET_CLOSE | LEGACY_TICKET_CLOSE => return Some(Self::CloseTicket),
            TICKET_INFO | LEGACY_TICKET_INFO => return Some(Self::TicketInfo),
            _ => {}
        }

        let mut parts = custom_id.split(':');
        let prefix = parts.next()?;
        let session = parts.next().filter(|session| !session.is_empty())?.to_owned();

        let action = match prefix {
            WIZARD_PREFIX => {
                let step = parts.next()?.parse::<u8>().ok()?;
                Self::Wizard { session, step }
            }
            FEEDBACK_PREFIX => {
                let control = match parts.next()? {
                    "star" => FeedbackControl::Star(parts.next()?.parse::<u8>().ok()?),
                    "comment" => FeedbackControl::Comment,
                    "images" => FeedbackControl::Images,
                    "finish" => FeedbackControl::Finish,
                    _ => return None,
                };
                Self::Feedback { session, control }
            }
            _ => return None,
        };

        parts.next().is_none().then_some(action)
    }

    pub fn custom_id(&self) -> String {
        match self {
            Self::OpenTicket => TICKET_OPEN.to_owned(),
            Self::ClaimTicket => TICKET_CLAIM.to_owned(),
            Self::CloseTicket => TICKET_CLOSE.to_owned(),
            Self::TicketInfo => TICKET_INFO.to_owned(),
            Self::Wizard { session, step } => format!("{WIZARD_PREFIX}:{session}:{step}"),
            Self::Feedback { session, control } => match control {
                FeedbackControl::Star(value) => format!("{FEEDBACK_PREFIX}:{session}:star:{value}"),
                FeedbackControl::Comment => format!("{FEEDBACK_PREFIX}:{session}:comment"),
                FeedbackControl::Images => format!("{FEEDBACK_PREFIX}:{session}:images"),
                FeedbackControl::Finish => format!("{FEEDBACK_PREFIX}:{session}:finish"),
            },
        }
    }
}

impl ModalAction {
    pub fn parse(custom_id: &str) -> Option<Self> {
        let mut parts = custom_id.split(':');
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(FEEDBACK_PREFIX), Some(session), Some("comment_form"), None)
                if !session.is_empty() =>
            {
                Some(Self::FeedbackComment { session: session.to_owned() })
            }
            _ => None,
        }
    }

    pub fn custom_id(&self) -> String {
        match self {
            Self::FeedbackComment { session } => format!("{FEEDBACK_PREFIX}:{session}:comment_form"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ComponentAction, FeedbackControl, ModalAction};

    #[test]
    fn ticket_buttons_accept_current_and_legacy_ids() {
        assert_eq!(ComponentAction::parse("ticket.claim.v1"), Some(ComponentAction::ClaimTicket));
        assert_eq!(ComponentAction::parse("claim_btn"), Some(ComponentAction::ClaimTicket));
        assert_eq!(ComponentAction::parse("ticket_open_btn"), Some(ComponentAction::OpenTicket));
        assert_eq!(ComponentAction::OpenTicket.custom_id(), "ticket.open.v1");
    }

    #[test]
    fn session_ids_survive_formatting() {
        let star = ComponentAction::Feedback {
            session: "abc123".to_owned(),
            control: FeedbackControl::Star(4),
        };
        assert_eq!(star.custom_id(), "feedback:abc123:star:4");
        assert_eq!(ComponentAction::parse(&star.custom_id()), Some(star));

        let wizard = ComponentAction::parse("wizard:s1:3").expect("wizard id");
        assert_eq!(wizard, ComponentAction::Wizard { session: "s1".to_owned(), step: 3 });
    }

    #[test]
    fn malformed_ids_are_rejected() {
        assert!(ComponentAction::parse("wizard::3").is_none());
        assert!(ComponentAction::parse("wizard:s1:x").is_none());
        assert!(ComponentAction::parse("feedback:s1:star").is_none());
        assert!(ComponentAction::parse("feedback:s1:finish:extra").is_none());
        assert!(ComponentAction::parse("something-else").is_none());
        assert!(ModalAction::parse("feedback:s1:comment").is_none());
        assert_eq!(
            ModalAction::parse("feedback:s1:comment_form"),
            Some(ModalAction::FeedbackComment { session: "s1".to_owned() })
        );
    }
}
