use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::ids::{ChannelId, RoleId};
use crate::errors::InteractionError;

/// Names of the guild-level settings written by the configuration wizard.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettingKey {
    StaffRoleId,
    CategoryOpenId,
    CategoryClaimedId,
    TranscriptChannelId,
    FeedbackChannelId,
}

impl SettingKey {
    pub const ALL: [SettingKey; 5] = [
        SettingKey::StaffRoleId,
        SettingKey::CategoryOpenId,
        SettingKey::CategoryClaimedId,
        SettingKey::TranscriptChannelId,
        SettingKey::FeedbackChannelId,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::StaffRoleId => "staff_role_id",
            Self::CategoryOpenId => "category_open_id",
            Self::CategoryClaimedId => "category_claimed_id",
            Self::TranscriptChannelId => "transcript_channel_id",
            Self::FeedbackChannelId => "feedback_channel_id",
        }
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SettingKey {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|key| key.as_str() == value.trim())
            .ok_or_else(|| format!("unknown setting key `{value}`"))
    }
}

/// Snapshot of the guild configuration store.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildSettings {
    values: BTreeMap<SettingKey, u64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TicketPrerequisites {
    pub staff_role: RoleId,
    pub open_category: ChannelId,
}

impl GuildSettings {
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (SettingKey, u64)>,
    {
        Self { values: entries.into_iter().collect() }
    }

    pub fn get(&self, key: SettingKey) -> Option<u64> {
        self.values.get(&key).copied()
    }

    pub fn set(&mut self, key: SettingKey, value: u64) {
        self.values.insert(key, value);
    }

    pub fn entries(&self) -> impl Iterator<Item = (SettingKey, u64)> + '_ {
        self.values.iter().map(|(key, value)| (*key, *value))
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn staff_role(&self) -> Option<RoleId> {
        self.get(SettingKey::StaffRoleId).map(RoleId)
    }

    pub fn open_category(&self) -> Option<ChannelId> {
        self.get(SettingKey::CategoryOpenId).map(ChannelId)
    }

    pub fn claimed_category(&self) -> Option<ChannelId> {
        self.get(SettingKey::CategoryClaimedId).map(ChannelId)
    }

    pub fn transcript_channel(&self) -> Option<ChannelId> {
        self.get(SettingKey::TranscriptChannelId).map(ChannelId)
    }

    pub fn feedback_channel(&self) -> Option<ChannelId> {
        self.get(SettingKey::FeedbackChannelId).map(ChannelId)
    }

    /// Ticket creation needs both the staff role and the open category.
    pub fn ticket_prerequisites(&self) -> Result<TicketPrerequisites, InteractionError> {
        match (self.staff_role(), self.open_category()) {
            (Some(staff_role), Some(open_category)) => {
                Ok(TicketPrerequisites { staff_role, open_category })
            }
            _ => Err(InteractionError::ConfigurationIncomplete(
                "the ticket system has not been configured. Use `/config_ticket`.".to_owned(),
            )),
        }
    }
}
