use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Broker tuning knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerConfig {
    /// Seconds a pending session may wait for a human before it expires and
    /// the pipeline resumes with the last-known text. `0` disables expiry.
    #[serde(default = "default_session_timeout_secs")]
    pub session_timeout_secs: u64,

    /// Upper bound on concurrently pending sessions.
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,

    /// Capacity of the lifecycle event channel; slow observers past this
    /// many buffered events start losing the oldest ones.
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

fn default_session_timeout_secs() -> u64 {
    3600
}

fn default_max_sessions() -> usize {
    64
}

fn default_event_capacity() -> usize {
    128
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            session_timeout_secs: default_session_timeout_secs(),
            max_sessions: default_max_sessions(),
            event_capacity: default_event_capacity(),
        }
    }
}

impl BrokerConfig {
    /// Default deadline applied to new sessions, `None` when expiry is
    /// disabled.
    pub fn session_timeout(&self) -> Option<Duration> {
        match self.session_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}
