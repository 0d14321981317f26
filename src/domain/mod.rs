pub mod alert;
pub mod checkin;
pub mod user;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DomainError {
    #[error("invalid user id")]
    InvalidUser,
    #[error("{field} must be between {min} and {max}")]
    OutOfRange {
        field: &'static str,
        min: f64,
        max: f64,
    },
    #[error("{field} is required")]
    Required { field: &'static str },
    #[error("{field} must have at least {min} characters")]
    TooShort { field: &'static str, min: usize },
    #[error("{field} must have at most {max} characters")]
    TooLong { field: &'static str, max: usize },
    #[error("invalid email: {0}")]
    InvalidEmail(String),
    #[error("user must be between {min} and {max} years old")]
    InvalidAge { min: i32, max: i32 },
    #[error("invalid severity: {0} (use LOW, MEDIUM, HIGH or CRITICAL)")]
    InvalidSeverity(String),
    #[error("invalid alert status: {0} (use PENDING, IN_REVIEW, RESOLVED or CANCELLED)")]
    InvalidStatus(String),
    #[error("cannot move alert from {from} to {to}")]
    IllegalTransition {
        from: &'static str,
        to: &'static str,
    },
    #[error("user is already inactive")]
    AlreadyInactive,
    #[error("user is already active")]
    AlreadyActive,
    #[error("could not hash password")]
    PasswordHash,
}

impl DomainError {
    /// Transition errors describe a state conflict rather than bad input.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            DomainError::IllegalTransition { .. }
                | DomainError::AlreadyInactive
                | DomainError::AlreadyActive
        )
    }
}
