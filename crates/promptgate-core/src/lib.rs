//! Human-in-the-loop pause/resume session broker for generative pipelines.
//!
//! A pipeline run that reaches an edit node opens a session through
//! [`EditBroker::begin_session`] and suspends itself on the returned
//! [`WaitHandle`]. Remote editors update and resolve the session through the
//! broker's control operations (`update_text`, `confirm`, `cancel`), and any
//! number of observers can follow session lifecycle events via
//! [`EditBroker::subscribe`]. Sessions are ephemeral and in-memory; a session
//! id is never reused within the lifetime of the process.

mod broker;
mod config;
mod error;
mod events;
mod session;

pub use broker::EditBroker;
pub use config::BrokerConfig;
pub use error::{BrokerError, Result};
pub use events::{EventStream, SessionEvent};
pub use session::{EditRequest, Resolution, SessionInfo, SessionStatus, WaitHandle};
