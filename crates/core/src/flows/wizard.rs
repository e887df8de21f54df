use serde::{Deserialize, Serialize};

use crate::domain::ids::{ChannelId, RoleId};
use crate::domain::settings::SettingKey;
use crate::flows::FlowTransitionError;

pub const WIZARD_STEPS: u8 = 6;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    Welcome,
    StaffRole,
    OpenCategory,
    ClaimedCategory,
    TranscriptChannel,
    FeedbackChannel,
    Complete,
}

/// The single input control each step presents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardControl {
    Continue,
    RoleSelect,
    CategorySelect,
    ChannelSelect,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WizardInput {
    Continue,
    Role(RoleId),
    Category(ChannelId),
    Channel(ChannelId),
}

impl WizardInput {
    pub fn control(self) -> WizardControl {
        match self {
            Self::Continue => WizardControl::Continue,
            Self::Role(_) => WizardControl::RoleSelect,
            Self::Category(_) => WizardControl::CategorySelect,
            Self::Channel(_) => WizardControl::ChannelSelect,
        }
    }

    fn entity_id(self) -> Option<u64> {
        match self {
            Self::Continue => None,
            Self::Role(role) => Some(role.get()),
            Self::Category(channel) | Self::Channel(channel) => Some(channel.get()),
        }
    }
}

impl WizardStep {
    pub const fn initial() -> Self {
        Self::Welcome
    }

    /// 1-based position; `None` once the wizard is complete.
    pub fn number(self) -> Option<u8> {
        match self {
            Self::Welcome => Some(1),
            Self::StaffRole => Some(2),
            Self::OpenCategory => Some(3),
            Self::ClaimedCategory => Some(4),
            Self::TranscriptChannel => Some(5),
            Self::FeedbackChannel => Some(6),
            Self::Complete => None,
        }
    }

    pub fn from_number(number: u8) -> Option<Self> {
        match number {
            1 => Some(Self::Welcome),
            2 => Some(Self::StaffRole),
            3 => Some(Self::OpenCategory),
            4 => Some(Self::ClaimedCategory),
            5 => Some(Self::TranscriptChannel),
            6 => Some(Self::FeedbackChannel),
            _ => None,
        }
    }

    pub fn control(self) -> Option<WizardControl> {
        match self {
            Self::Welcome => Some(WizardControl::Continue),
            Self::StaffRole => Some(WizardControl::RoleSelect),
            Self::OpenCategory | Self::ClaimedCategory => Some(WizardControl::CategorySelect),
            Self::TranscriptChannel | Self::FeedbackChannel => Some(WizardControl::ChannelSelect),
            Self::Complete => None,
        }
    }

    /// Config key persisted by this step's submission.
    pub fn setting_key(self) -> Option<SettingKey> {
        match self {
            Self::StaffRole => Some(SettingKey::StaffRoleId),
            Self::OpenCategory => Some(SettingKey::CategoryOpenId),
            Self::ClaimedCategory => Some(SettingKey::CategoryClaimedId),
            Self::TranscriptChannel => Some(SettingKey::TranscriptChannelId),
            Self::FeedbackChannel => Some(SettingKey::FeedbackChannelId),
            Self::Welcome | Self::Complete => None,
        }
    }

    pub fn next(self) -> Self {
        match self {
            Self::Welcome => Self::StaffRole,
            Self::StaffRole => Self::OpenCategory,
            Self::OpenCategory => Self::ClaimedCategory,
            Self::ClaimedCategory => Self::TranscriptChannel,
            Self::TranscriptChannel => Self::FeedbackChannel,
            Self::FeedbackChannel | Self::Complete => Self::Complete,
        }
    }

    pub fn is_complete(self) -> bool {
        self == Self::Complete
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WizardTransition {
    pub from: WizardStep,
    pub to: WizardStep,
    /// Store write the caller must persist before rendering `to`.
    pub write: Option<(SettingKey, u64)>,
}

pub fn transition(
    step: WizardStep,
    input: WizardInput,
) -> Result<WizardTransition, FlowTransitionError> {
    let Some(expected) = step.control() else {
        return Err(FlowTransitionError::WizardComplete);
    };
    if input.control() != expected {
        return Err(FlowTransitionError::WizardInputMismatch { step, expected });
    }

    let write = match (step.setting_key(), input.entity_id()) {
        (Some(key), Some(id)) => Some((key, id)),
        _ => None,
    };

    Ok(WizardTransition { from: step, to: step.next(), write })
}

#[cfg(test)]
mod tests {
    use super::{transition, WizardControl, WizardInput, WizardStep, WIZARD_STEPS};
    use crate::domain::ids::{ChannelId, RoleId};
    use crate::domain::settings::SettingKey;
    use crate::flows::FlowTransitionError;

    fn input_for(step: WizardStep, id: u64) -> WizardInput {
        match step.control() {
            Some(WizardControl::Continue) => WizardInput::Continue,
            Some(WizardControl::RoleSelect) => WizardInput::Role(RoleId(id)),
            Some(WizardControl::CategorySelect) => WizardInput::Category(ChannelId(id)),
            Some(WizardControl::ChannelSelect) => WizardInput::Channel(ChannelId(id)),
            None => WizardInput::Continue,
        }
    }

    #[test]
    fn full_run_writes_each_key_exactly_once_in_order() {
        let mut step = WizardStep::initial();
        let mut writes = Vec::new();

        for number in 1..=WIZARD_STEPS {
            assert_eq!(step.number(), Some(number));
            let outcome = transition(step, input_for(step, 100 + u64::from(number)))
                .expect("valid input for step");
            writes.extend(outcome.write);
            step = outcome.to;
        }

        assert!(step.is_complete());
        assert_eq!(
            writes,
            vec![
                (SettingKey::StaffRoleId, 102),
                (SettingKey::CategoryOpenId, 103),
                (SettingKey::CategoryClaimedId, 104),
                (SettingKey::TranscriptChannelId, 105),
                (SettingKey::FeedbackChannelId, 106),
            ]
        );
    }

    #[test]
    fn welcome_step_writes_nothing() {
        let outcome = transition(WizardStep::Welcome, WizardInput::Continue).expect("continue");
        assert_eq!(outcome.to, WizardStep::StaffRole);
        assert_eq!(outcome.write, None);
    }

    #[test]
    fn complete_wizard_rejects_further_input() {
        let error = transition(WizardStep::Complete, WizardInput::Channel(ChannelId(1)))
            .expect_err("complete wizard must reject input");
        assert_eq!(error, FlowTransitionError::WizardComplete);
    }

    #[test]
    fn mismatched_control_does_not_advance() {
        let error = transition(WizardStep::StaffRole, WizardInput::Channel(ChannelId(9)))
            .expect_err("channel input on role step");
        assert_eq!(
            error,
            FlowTransitionError::WizardInputMismatch {
                step: WizardStep::StaffRole,
                expected: WizardControl::RoleSelect,
            }
        );
    }

    #[test]
    fn step_numbers_round_trip() {
        for number in 1..=WIZARD_STEPS {
            let step = WizardStep::from_number(number).expect("known step");
            assert_eq!(step.number(), Some(number));
        }
        assert_eq!(WizardStep::from_number(7), None);
        assert_eq!(WizardStep::from_number(0), None);
    }
}
