//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into [`HearthError`]
//! via `From`. Simple absence (an unknown id on update or removal) is not an
//! error: stores signal it with `Option`/`bool`.

/// Top-level error crossing layer boundaries.
#[derive(Debug, thiserror::Error)]
pub enum HearthError {
    /// A domain invariant was violated by caller input.
    #[error("validation error")]
    Validation(#[from] ValidationError),

    /// A record requested by id does not exist.
    #[error("not found")]
    NotFound(#[from] NotFoundError),

    /// The underlying persistence layer failed.
    #[error("storage error")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Handing work to the agent boundary failed.
    #[error("delivery error")]
    Delivery(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Invalid input rejected before anything is persisted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("summary must not be empty")]
    EmptySummary,

    #[error("instruction must not be empty")]
    EmptyInstruction,

    #[error("a trigger is required")]
    MissingTrigger,

    #[error("invalid cron expression {expression:?}: {reason}")]
    InvalidCron { expression: String, reason: String },

    #[error("invalid schedule: hour {hour} / minute {minute} out of range")]
    InvalidTimeOfDay { hour: u32, minute: u32 },

    #[error("weekly schedule requires a day of week (0-6), got {0:?}")]
    InvalidDayOfWeek(Option<u32>),

    #[error("device id must not be empty")]
    EmptyDeviceId,

    #[error("state key must not be empty")]
    EmptyStateKey,

    #[error("numeric value must be finite")]
    NonFiniteNumber,

    #[error("reason must not be empty")]
    EmptyReason,

    #[error("malformed id {0:?}")]
    InvalidId(String),
}

/// A record looked up by id does not exist.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{entity} {id} not found")]
pub struct NotFoundError {
    pub entity: &'static str,
    pub id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_convert_validation_error_into_hearth_error() {
        let err: HearthError = ValidationError::EmptySummary.into();
        assert!(matches!(
            err,
            HearthError::Validation(ValidationError::EmptySummary)
        ));
    }

    #[test]
    fn should_display_not_found_with_entity_and_id() {
        let err = NotFoundError {
            entity: "Automation",
            id: "abc".to_string(),
        };
        assert_eq!(err.to_string(), "Automation abc not found");
    }

    #[test]
    fn should_display_invalid_cron_with_expression() {
        let err = ValidationError::InvalidCron {
            expression: "61 * * * *".to_string(),
            reason: "minute out of range".to_string(),
        };
        assert!(err.to_string().contains("61 * * * *"));
    }
}
