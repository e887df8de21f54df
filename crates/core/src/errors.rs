use thiserror::Error;

use crate::flows::FlowTransitionError;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error(transparent)]
    FlowTransition(#[from] FlowTransitionError),
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("integration failure: {0}")]
    Integration(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

/// Failures that end a single interaction and are shown to the invoking user.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InteractionError {
    #[error("configuration incomplete: {0}")]
    ConfigurationIncomplete(String),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("duplicate request: {0}")]
    DuplicateRequest(String),
    #[error("external failure: {0}")]
    External(String),
    #[error("timed out: {0}")]
    Timeout(String),
}

impl InteractionError {
    pub fn user_message(&self) -> String {
        match self {
            Self::ConfigurationIncomplete(detail) => format!("❌ Setup error: {detail}"),
            Self::Unauthorized(detail) => format!("❌ {detail}"),
            Self::DuplicateRequest(detail) => format!("⚠️ {detail}"),
            Self::External(_) => {
                "❌ Something went wrong while talking to Discord. Please try again shortly."
                    .to_owned()
            }
            Self::Timeout(detail) => format!("⏰ {detail}"),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::ConfigurationIncomplete(_) => "configuration_incomplete",
            Self::Unauthorized(_) => "unauthorized",
            Self::DuplicateRequest(_) => "duplicate_request",
            Self::External(_) => "external",
            Self::Timeout(_) => "timeout",
        }
    }
}

impl From<ApplicationError> for InteractionError {
    fn from(value: ApplicationError) -> Self {
        match value {
            ApplicationError::Domain(DomainError::FlowTransition(
                FlowTransitionError::AlreadyClaimed,
            )) => Self::DuplicateRequest("This ticket has already been claimed.".to_owned()),
            ApplicationError::Configuration(message) => Self::ConfigurationIncomplete(message),
            other => Self::External(other.to_string()),
        }
    }
}

impl From<DomainError> for InteractionError {
    fn from(value: DomainError) -> Self {
        ApplicationError::from(value).into()
    }
}
