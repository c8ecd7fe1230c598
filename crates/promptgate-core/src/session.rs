//! Session types shared between the broker and its callers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::oneshot;

use crate::error::{BrokerError, Result};

/// Lifecycle state of an edit session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Waiting for an editor to confirm or cancel.
    Pending,
    /// Resolved by an explicit confirm.
    Confirmed,
    /// Resolved by an explicit cancel (or broker shutdown).
    Cancelled,
    /// Resolved by the session timeout.
    Expired,
}

/// Snapshot of a session as seen by observers.
///
/// `text` is the current working copy; `initial_text` is what the pipeline
/// originally handed over, kept so editors can offer a reset.
#[derive(Debug, Clone)]
pub struct SessionInfo {
    pub id: String,
    pub node_id: String,
    pub text: String,
    pub initial_text: String,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    pub deadline: Option<DateTime<Utc>>,
}

/// Parameters for opening a new edit session.
#[derive(Debug, Clone)]
pub struct EditRequest {
    pub node_id: String,
    pub text: String,
    pub prefill: Option<String>,
    pub timeout: Option<Duration>,
}

impl EditRequest {
    pub fn new(node_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            text: text.into(),
            prefill: None,
            timeout: None,
        }
    }

    /// Seed the editable working copy with `text` instead of the wired
    /// input. The creation event still carries the wired input.
    pub fn with_prefill(mut self, text: impl Into<String>) -> Self {
        self.prefill = Some(text.into());
        self
    }

    /// Override the broker-wide session timeout for this session.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Terminal outcome of a session, delivered to the waiting pipeline.
///
/// Every variant carries the last-known working text so the pipeline can
/// decide what to do with it. A cancelled session still hands the text back;
/// whether to resume with it or abort the run is the caller's call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Confirmed { text: String },
    Cancelled { text: String },
    Expired { text: String },
}

impl Resolution {
    /// The working text at the moment the session resolved.
    pub fn text(&self) -> &str {
        match self {
            Resolution::Confirmed { text }
            | Resolution::Cancelled { text }
            | Resolution::Expired { text } => text,
        }
    }

    pub fn status(&self) -> SessionStatus {
        match self {
            Resolution::Confirmed { .. } => SessionStatus::Confirmed,
            Resolution::Cancelled { .. } => SessionStatus::Cancelled,
            Resolution::Expired { .. } => SessionStatus::Expired,
        }
    }
}

/// Receiver half of an execution gate.
///
/// Returned by [`EditBroker::begin_session`](crate::EditBroker::begin_session);
/// the pipeline holds onto it and suspends until the session resolves.
#[derive(Debug)]
pub struct WaitHandle {
    session_id: String,
    rx: oneshot::Receiver<Resolution>,
}

impl WaitHandle {
    pub(crate) fn new(session_id: String, rx: oneshot::Receiver<Resolution>) -> Self {
        Self { session_id, rx }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Suspend until the session is confirmed, cancelled, or expired.
    ///
    /// Returns `ChannelClosed` if the broker shut down without resolving the
    /// session, which only happens if the broker itself was dropped.
    pub async fn block_until_resolved(self) -> Result<Resolution> {
        self.rx
            .await
            .map_err(|_| BrokerError::ChannelClosed(self.session_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edit_request_builder() {
        let request = EditRequest::new("node_7", "a cat in a hat")
            .with_prefill("a dog in a hat")
            .with_timeout(Duration::from_secs(30));
        assert_eq!(request.node_id, "node_7");
        assert_eq!(request.text, "a cat in a hat");
        assert_eq!(request.prefill.as_deref(), Some("a dog in a hat"));
        assert_eq!(request.timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_resolution_accessors() {
        let resolution = Resolution::Confirmed {
            text: "final".to_string(),
        };
        assert_eq!(resolution.text(), "final");
        assert_eq!(resolution.status(), SessionStatus::Confirmed);

        let resolution = Resolution::Expired {
            text: "stale".to_string(),
        };
        assert_eq!(resolution.status(), SessionStatus::Expired);
    }

    #[test]
    fn test_status_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&SessionStatus::Confirmed).unwrap(),
            "\"confirmed\""
        );
        assert_eq!(
            serde_json::to_string(&SessionStatus::Cancelled).unwrap(),
            "\"cancelled\""
        );
    }

    #[tokio::test]
    async fn test_wait_handle_resolves() {
        let (tx, rx) = oneshot::channel();
        let handle = WaitHandle::new("pg_ses_0".to_string(), rx);
        assert_eq!(handle.session_id(), "pg_ses_0");

        tx.send(Resolution::Confirmed {
            text: "done".to_string(),
        })
        .unwrap();

        let resolution = handle.block_until_resolved().await.unwrap();
        assert_eq!(resolution.text(), "done");
    }

    #[tokio::test]
    async fn test_wait_handle_reports_closed_channel() {
        let (tx, rx) = oneshot::channel::<Resolution>();
        let handle = WaitHandle::new("pg_ses_1".to_string(), rx);
        drop(tx);

        let err = handle.block_until_resolved().await.unwrap_err();
        assert!(matches!(err, BrokerError::ChannelClosed(id) if id == "pg_ses_1"));
    }
}
