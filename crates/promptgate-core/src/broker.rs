use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, oneshot, RwLock};
use tokio::task::JoinHandle;

use crate::config::BrokerConfig;
use crate::error::{BrokerError, Result};
use crate::events::{EventStream, SessionEvent};
use crate::session::{EditRequest, Resolution, SessionInfo, SessionStatus, WaitHandle};

struct PendingEdit {
    node_id: String,
    initial_text: String,
    text: String,
    created_at: DateTime<Utc>,
    deadline: Option<DateTime<Utc>>,
    resolve_tx: oneshot::Sender<Resolution>,
    expiry: Option<JoinHandle<()>>,
}

/// Brokers pause/resume edit sessions between a running pipeline and
/// interactive editors.
///
/// The pipeline opens a session and suspends on the returned [`WaitHandle`];
/// editors mutate the working text and finish the session with `confirm` or
/// `cancel`, or it expires on its deadline. A session is removed the moment
/// it resolves, so a second resolution attempt reports `SessionNotFound`.
pub struct EditBroker {
    sessions: Arc<RwLock<HashMap<String, PendingEdit>>>,
    events: broadcast::Sender<SessionEvent>,
    next_id: Arc<AtomicU64>,
    config: BrokerConfig,
}

impl EditBroker {
    pub fn new(config: BrokerConfig) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity);
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            events,
            next_id: Arc::new(AtomicU64::new(1)),
            config,
        }
    }

    /// Subscribe to session lifecycle events. Only events emitted after the
    /// call are observed.
    pub fn subscribe(&self) -> EventStream {
        EventStream::new(self.events.subscribe())
    }

    /// Open an edit session for a pipeline node. Returns the session ID and
    /// the handle the pipeline suspends on.
    ///
    /// An existing session for the same node is cancelled and replaced, so a
    /// re-queued node never strands an earlier gate. The session times out
    /// after the request's timeout, falling back to the broker-wide default.
    pub async fn begin_session(&self, request: EditRequest) -> Result<(String, WaitHandle)> {
        let created_at = Utc::now();
        let timeout = request.timeout.or_else(|| self.config.session_timeout());
        let deadline = timeout
            .and_then(|t| chrono::Duration::from_std(t).ok())
            .and_then(|t| created_at.checked_add_signed(t));
        // A timeout too large to land on a calendar date disables expiry.
        let timeout = timeout.filter(|_| deadline.is_some());

        let id = format!("pg_ses_{}", self.next_id.fetch_add(1, Ordering::Relaxed));
        let (resolve_tx, resolve_rx) = oneshot::channel();
        let working_text = request
            .prefill
            .clone()
            .unwrap_or_else(|| request.text.clone());

        let replaced = {
            let mut sessions = self.sessions.write().await;

            let existing = sessions
                .iter()
                .find(|(_, entry)| entry.node_id == request.node_id)
                .map(|(existing_id, _)| existing_id.clone());

            let occupied = sessions.len() - if existing.is_some() { 1 } else { 0 };
            if occupied >= self.config.max_sessions {
                return Err(BrokerError::MaxSessionsReached(self.config.max_sessions));
            }

            let replaced = existing.and_then(|existing_id| {
                sessions
                    .remove(&existing_id)
                    .map(|entry| (existing_id, entry))
            });

            sessions.insert(
                id.clone(),
                PendingEdit {
                    node_id: request.node_id.clone(),
                    initial_text: request.text.clone(),
                    text: working_text,
                    created_at,
                    deadline,
                    resolve_tx,
                    expiry: None,
                },
            );

            replaced
        };

        if let Some((old_id, old_entry)) = replaced {
            if let Some(handle) = old_entry.expiry {
                handle.abort();
            }
            tracing::info!(
                "Replacing session {} for node {} with {}",
                old_id,
                request.node_id,
                id
            );
            let cancelled = Resolution::Cancelled {
                text: old_entry.text,
            };
            if let Err(error) = deliver(&self.events, &old_id, cancelled, old_entry.resolve_tx) {
                tracing::debug!("Replaced session gate already dropped: {}", error);
            }
        }

        tracing::info!("Opened edit session {} for node {}", id, request.node_id);
        // The event always announces the wired input text; a prefill only
        // seeds the working copy.
        let _ = self.events.send(SessionEvent::Opened {
            session_id: id.clone(),
            node_id: request.node_id,
            text: request.text,
        });

        if let Some(timeout) = timeout {
            let handle = self.spawn_expiry(id.clone(), timeout);
            let mut sessions = self.sessions.write().await;
            match sessions.get_mut(&id) {
                Some(entry) => entry.expiry = Some(handle),
                // Already resolved; the timer has nothing left to watch.
                None => handle.abort(),
            }
        }

        Ok((id.clone(), WaitHandle::new(id, resolve_rx)))
    }

    /// Resolve a session and resume the pipeline. `final_text` overwrites the
    /// working text when given; otherwise the session resolves with whatever
    /// the last update left behind.
    pub async fn confirm(&self, session_id: &str, final_text: Option<String>) -> Result<()> {
        let mut entry = self.take(session_id).await?;
        if let Some(text) = final_text {
            entry.text = text;
        }
        tracing::info!("Session {} confirmed", session_id);
        let resolution = Resolution::Confirmed { text: entry.text };
        deliver(&self.events, session_id, resolution, entry.resolve_tx)
    }

    /// Resolve a session as cancelled. The pipeline still receives the
    /// last-known text and decides whether to resume or abort.
    pub async fn cancel(&self, session_id: &str) -> Result<()> {
        let entry = self.take(session_id).await?;
        tracing::info!("Session {} cancelled", session_id);
        let resolution = Resolution::Cancelled { text: entry.text };
        deliver(&self.events, session_id, resolution, entry.resolve_tx)
    }

    /// Overwrite the session's working text without resolving it.
    pub async fn update_text(&self, session_id: &str, text: String) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        let entry = sessions
            .get_mut(session_id)
            .ok_or_else(|| BrokerError::SessionNotFound(session_id.to_string()))?;
        tracing::debug!("Session {} text updated ({} chars)", session_id, text.len());
        entry.text = text;
        Ok(())
    }

    pub async fn get(&self, session_id: &str) -> Option<SessionInfo> {
        let sessions = self.sessions.read().await;
        sessions.get(session_id).map(|entry| snapshot(session_id, entry))
    }

    /// List all open sessions, ordered by ID.
    pub async fn list_sessions(&self) -> Vec<SessionInfo> {
        let sessions = self.sessions.read().await;
        let mut infos: Vec<SessionInfo> = sessions
            .iter()
            .map(|(id, entry)| snapshot(id, entry))
            .collect();
        infos.sort_by(|a, b| a.id.cmp(&b.id));
        infos
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn has_session(&self, session_id: &str) -> bool {
        self.sessions.read().await.contains_key(session_id)
    }

    /// Cancel every open session. Suspended pipelines resume with their
    /// last-known text marked cancelled.
    pub async fn shutdown(&self) {
        let drained: Vec<(String, PendingEdit)> = {
            let mut sessions = self.sessions.write().await;
            sessions.drain().collect()
        };

        if !drained.is_empty() {
            tracing::info!("Cancelling {} open sessions on shutdown", drained.len());
        }

        for (id, entry) in drained {
            if let Some(handle) = entry.expiry {
                handle.abort();
            }
            let cancelled = Resolution::Cancelled { text: entry.text };
            if let Err(error) = deliver(&self.events, &id, cancelled, entry.resolve_tx) {
                tracing::debug!("Session gate already dropped: {}", error);
            }
        }
    }

    async fn take(&self, session_id: &str) -> Result<PendingEdit> {
        let mut sessions = self.sessions.write().await;
        let entry = sessions
            .remove(session_id)
            .ok_or_else(|| BrokerError::SessionNotFound(session_id.to_string()))?;
        drop(sessions);

        if let Some(handle) = &entry.expiry {
            handle.abort();
        }
        Ok(entry)
    }

    fn spawn_expiry(&self, session_id: String, timeout: Duration) -> JoinHandle<()> {
        let sessions = Arc::clone(&self.sessions);
        let events = self.events.clone();
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;

            let removed = {
                let mut sessions = sessions.write().await;
                sessions.remove(&session_id)
            };

            if let Some(entry) = removed {
                tracing::warn!(
                    "Session {} expired after {:?}, resuming with last-known text",
                    session_id,
                    timeout
                );
                let expired = Resolution::Expired { text: entry.text };
                if let Err(error) = deliver(&events, &session_id, expired, entry.resolve_tx) {
                    tracing::debug!("Expired session gate already dropped: {}", error);
                }
            }
        })
    }
}

impl Default for EditBroker {
    fn default() -> Self {
        Self::new(BrokerConfig::default())
    }
}

fn snapshot(id: &str, entry: &PendingEdit) -> SessionInfo {
    SessionInfo {
        id: id.to_string(),
        node_id: entry.node_id.clone(),
        text: entry.text.clone(),
        initial_text: entry.initial_text.clone(),
        status: SessionStatus::Pending,
        created_at: entry.created_at,
        deadline: entry.deadline,
    }
}

/// Hand the resolution to the suspended pipeline and announce the close.
///
/// The closed event goes out even when the pipeline side already dropped its
/// handle, so editors still learn the session is gone.
fn deliver(
    events: &broadcast::Sender<SessionEvent>,
    session_id: &str,
    resolution: Resolution,
    resolve_tx: oneshot::Sender<Resolution>,
) -> Result<()> {
    let outcome = resolution.status();
    let delivered = resolve_tx.send(resolution).is_ok();
    let _ = events.send(SessionEvent::Closed {
        session_id: session_id.to_string(),
        outcome,
    });

    if delivered {
        Ok(())
    } else {
        Err(BrokerError::GateDropped(session_id.to_string()))
    }
}
