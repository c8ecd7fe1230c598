use thiserror::Error;

#[derive(Debug, Error)]
pub enum BrokerError {
    /// The session id is unknown or the session already resolved. Callers
    /// should treat this as "nothing left to do" and drop any stale UI.
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Maximum sessions reached (limit: {0})")]
    MaxSessionsReached(usize),

    /// The pipeline side dropped its wait handle, so the resolution could not
    /// be delivered. The session is gone either way.
    #[error("Execution gate for session {0} is gone")]
    GateDropped(String),

    /// The broker went away while the session was still pending.
    #[error("Broker closed before session {0} resolved")]
    ChannelClosed(String),
}

/// Result type alias for broker operations.
pub type Result<T> = std::result::Result<T, BrokerError>;
