use std::fmt;

use thiserror::Error;

pub mod app;
pub mod game;
pub mod leaderboard;
pub mod player;
pub mod stats;
pub mod store;
pub mod util;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntityKind {
    Game,
    Player,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Game => write!(f, "game"),
            EntityKind::Player => write!(f, "player"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ServiceError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: String },

    #[error("invalid {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("invalid state transition: {0}")]
    InvalidStateTransition(String),

    #[error("conflict: {0}")]
    Conflict(String),
}

impl ServiceError {
    pub fn not_found<T, R>(kind: EntityKind, id: T) -> ServiceResult<R>
    where
        T: Into<String>,
    {
        Err(ServiceError::NotFound {
            kind,
            id: id.into(),
        })
    }

    pub fn invalid_input<F, T, R>(field: F, reason: T) -> ServiceResult<R>
    where
        F: Into<String>,
        T: Into<String>,
    {
        Err(ServiceError::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        })
    }

    pub fn invalid_state<T, R>(msg: T) -> ServiceResult<R>
    where
        T: Into<String>,
    {
        Err(ServiceError::InvalidStateTransition(msg.into()))
    }

    pub fn conflict<T, R>(msg: T) -> ServiceResult<R>
    where
        T: Into<String>,
    {
        Err(ServiceError::Conflict(msg.into()))
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = ServiceError::not_found::<_, ()>(EntityKind::Game, "abc").unwrap_err();
        assert_eq!(err.to_string(), "game not found: abc");

        let err = ServiceError::invalid_input::<_, _, ()>("row", "must be between 0 and 2")
            .unwrap_err();
        assert_eq!(err.to_string(), "invalid row: must be between 0 and 2");
        assert!(matches!(
            err,
            ServiceError::InvalidInput { ref field, .. } if field == "row"
        ));
    }
}
