use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::ids::{ChannelId, MessageId, UserId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TicketNumber(pub u64);

impl fmt::Display for TicketNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Open,
    Claimed,
    Closed,
}

impl TicketStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Claimed => "claimed",
            Self::Closed => "closed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "open" => Some(Self::Open),
            "claimed" => Some(Self::Claimed),
            "closed" => Some(Self::Closed),
            _ => None,
        }
    }
}

/// Staff member recorded as the handler of a ticket.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffRef {
    pub user_id: UserId,
    pub name: String,
}

impl StaffRef {
    pub fn mention(&self) -> String {
        self.user_id.mention()
    }
}

/// Persisted state of one support ticket, keyed by the channel it owns.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    pub channel_id: ChannelId,
    pub channel_name: String,
    pub number: TicketNumber,
    pub owner_id: UserId,
    pub owner_name: String,
    pub category_id: Option<ChannelId>,
    pub status: TicketStatus,
    pub claimed_by: Option<StaffRef>,
    pub welcome_message_id: Option<MessageId>,
    pub opened_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl Ticket {
    pub fn is_active(&self) -> bool {
        self.status != TicketStatus::Closed
    }

    /// Display value used for "handled by" fields; staff claims show as a mention.
    pub fn handler_label(&self) -> String {
        self.claimed_by.as_ref().map(StaffRef::mention).unwrap_or_else(|| "Staff".to_owned())
    }

    pub fn topic(&self) -> String {
        channel_topic(self.number, self.owner_id)
    }
}

const TOPIC_OWNER_MARKER: &str = "Opened by: ";
/// Owner marker in topics written by earlier bot versions (`Ticket ID: #<n> | Aberto por: <id>`).
const LEGACY_TOPIC_OWNER_MARKER: &str = "Aberto por: ";

pub fn channel_topic(number: TicketNumber, owner: UserId) -> String {
    format!("Ticket {number} | {TOPIC_OWNER_MARKER}{owner}")
}

/// Channel name for a requester, restricted to the characters text channels accept.
pub fn channel_name(owner_name: &str) -> String {
    let slug: String = owner_name
        .chars()
        .filter_map(|ch| {
            if ch.is_alphanumeric() || ch == '-' || ch == '_' {
                Some(ch.to_ascii_lowercase())
            } else if ch.is_whitespace() || ch == '.' {
                Some('-')
            } else {
                None
            }
        })
        .collect();
    let slug = slug.trim_matches('-');
    if slug.is_empty() {
        "ticket".to_owned()
    } else {
        format!("ticket-{slug}")
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TopicInfo {
    pub number: Option<TicketNumber>,
    pub owner_id: UserId,
}

/// Recovers ticket identity from a channel topic written by [`channel_topic`].
///
/// Used only for channels that predate ticket records.
pub fn parse_topic(topic: &str) -> Option<TopicInfo> {
    let mut segments = topic.split(" | ");
    let head = segments.next()?;
    let owner_segment = segments.next()?;

    let owner_segment = owner_segment.trim();
    let owner_id = owner_segment
        .strip_prefix(TOPIC_OWNER_MARKER)
        .or_else(|| owner_segment.strip_prefix(LEGACY_TOPIC_OWNER_MARKER))?
        .parse::<UserId>()
        .ok()?;
    let number = head
        .trim()
        .rsplit_once('#')
        .and_then(|(_, digits)| digits.trim().parse::<u64>().ok())
        .map(TicketNumber);

    Some(TopicInfo { number, owner_id })
}

/// True when a channel topic embeds the given user as the ticket owner.
pub fn topic_mentions_owner(topic: &str, owner: UserId) -> bool {
    parse_topic(topic).map(|info| info.owner_id == owner).unwrap_or(false)
}
