use thiserror::Error;

use zen_core::errors::{DomainError, InteractionError};
use zen_db::repositories::RepositoryError;

use crate::api::ApiError;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// Ends the interaction with a message for the invoking user.
    #[error(transparent)]
    Rejected(#[from] InteractionError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<DomainError> for ServiceError {
    fn from(value: DomainError) -> Self {
        Self::Rejected(value.into())
    }
}

impl ServiceError {
    pub fn to_interaction_error(&self) -> InteractionError {
        match self {
            Self::Rejected(error) => error.clone(),
            Self::Api(error) => InteractionError::External(error.to_string()),
            Self::Repository(error) => InteractionError::External(error.to_string()),
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use zen_core::errors::{DomainError, InteractionError};
    use zen_core::flows::FlowTransitionError;

    use super::ServiceError;
    use crate::api::ApiError;

    #[test]
    fn duplicate_claims_stay_user_facing() {
        let error = ServiceError::from(DomainError::from(FlowTransitionError::AlreadyClaimed));
        assert!(matches!(
            error.to_interaction_error(),
            InteractionError::DuplicateRequest(_)
        ));
    }

    #[test]
    fn platform_failures_become_generic_external_errors() {
        let error = ServiceError::from(ApiError::Request("502".to_owned()));
        let interaction = error.to_interaction_error();
        assert_eq!(interaction.kind(), "external");
        assert!(!interaction.user_message().contains("502"));
    }
}
