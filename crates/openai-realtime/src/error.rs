use thiserror::Error;

pub type Result<T> = std::result::Result<T, RealtimeError>;

/// Errors raised by the realtime session adapter.
#[derive(Debug, Error)]
pub enum RealtimeError {
    #[error("Failed to connect to realtime endpoint: {0}")]
    Connection(String),
    #[error("Realtime transport error: {0}")]
    Transport(String),
    #[error("Session is not connected (state: {0})")]
    NotConnected(crate::session::SessionState),
    #[error("Session is already {0}")]
    AlreadyStarted(crate::session::SessionState),
    #[error("Failed to serialize realtime event: {0}")]
    Serialization(#[from] serde_json::Error),
}
