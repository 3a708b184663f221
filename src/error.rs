use thiserror::Error;
use uuid::Uuid;

/// Why a socket event was dropped.
#[derive(Debug, Error)]
pub enum EventError {
    #[error("invalid payload: {0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("bad room secret")]
    Unauthorized,

    #[error("{participant} is not a member of room {room_id}")]
    NotMember { participant: String, room_id: Uuid },

    #[error("persistence failure: {0}")]
    Persistence(#[from] sqlx::Error),

    #[error("upload failure: {0}")]
    Upload(#[from] std::io::Error),

    #[error("secret check failed: {0}")]
    Secret(#[from] bcrypt::BcryptError),

    #[error("blocking task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl EventError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Reason shown to the sender in an ack. Rejections share one wording so
    /// a bad secret and a missing room look the same from outside.
    pub fn client_reason(&self) -> &'static str {
        match self {
            Self::Validation(_) => "invalid payload",
            Self::NotFound(_) | Self::Unauthorized | Self::NotMember { .. } => "rejected",
            Self::Persistence(_) | Self::Upload(_) | Self::Secret(_) | Self::Task(_) => "server error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejections_look_alike() {
        let missing = EventError::NotFound("room".to_owned());
        let locked = EventError::Unauthorized;
        assert_eq!(missing.client_reason(), locked.client_reason());
    }

    #[test]
    fn validation_message() {
        let err = EventError::validation("missing field `roomId`");
        assert_eq!(err.to_string(), "invalid payload: missing field `roomId`");
        assert_eq!(err.client_reason(), "invalid payload");
    }

    #[test]
    fn persistence_is_a_server_error() {
        let err: EventError = sqlx::Error::PoolTimedOut.into();
        assert_eq!(err.client_reason(), "server error");
    }
}
