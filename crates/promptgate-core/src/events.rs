//! Broadcast notifications emitted by the broker.
//!
//! Variant names follow the wire protocol: a `prompt_edit_session` event
//! announces a newly opened session to connected editors, and
//! `prompt_edit_closed` announces that a session resolved and should be
//! dismissed.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::session::SessionStatus;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// A session opened and is waiting for an editor.
    #[serde(rename = "prompt_edit_session")]
    Opened {
        session_id: String,
        node_id: String,
        text: String,
    },

    /// A session resolved; editors should close any open dialog for it.
    #[serde(rename = "prompt_edit_closed")]
    Closed {
        session_id: String,
        outcome: SessionStatus,
    },
}

impl SessionEvent {
    pub fn session_id(&self) -> &str {
        match self {
            Self::Opened { session_id, .. } | Self::Closed { session_id, .. } => session_id,
        }
    }

    pub fn event_name(&self) -> &'static str {
        match self {
            Self::Opened { .. } => "prompt_edit_session",
            Self::Closed { .. } => "prompt_edit_closed",
        }
    }
}

/// Receiving end of the broker's event channel.
///
/// Slow consumers that fall behind the channel capacity miss events rather
/// than stalling the broker; a lag is logged and the stream keeps going.
pub struct EventStream {
    receiver: broadcast::Receiver<SessionEvent>,
}

impl EventStream {
    pub(crate) fn new(receiver: broadcast::Receiver<SessionEvent>) -> Self {
        Self { receiver }
    }

    pub async fn recv(&mut self) -> Option<SessionEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Closed) => return None,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!("Event stream lagged, missed {} events", n);
                    continue;
                }
            }
        }
    }

    pub fn try_recv(&mut self) -> Option<SessionEvent> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Closed) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    tracing::warn!("Event stream lagged, missed {} events", n);
                    continue;
                }
            }
        }
    }
}
